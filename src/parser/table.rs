//! GFM tables, recognized at paragraph finalization: a header row, a
//! delimiter row, then body rows.

use crate::editor;
use crate::nodes::{Ast, AstNode, NodeTable, NodeValue, TableAlignment};
use crate::parser::Parser;
use crate::strings;

pub(crate) fn try_parse_table<'a, 'o>(
    parser: &mut Parser<'a, 'o>,
    node: &'a AstNode<'a>,
    ast: &mut Ast,
) {
    let content = ast.content.trim_end_matches('\n').to_string();
    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() < 2 {
        return;
    }

    // a table needs a pipe somewhere in its header row
    if !has_unescaped_pipe(lines[0]) {
        return;
    }

    let delim = editor::strip_caret(lines[1]);
    let aligns = match parse_delimiter_row(&delim) {
        Some(a) => a,
        None => return,
    };

    let header_cells = split_row(lines[0]);
    if header_cells.len() != aligns.len() {
        return;
    }

    ast.value = NodeValue::Table(NodeTable {
        aligns: aligns.clone(),
    });
    ast.content.clear();

    let head = parser.add_child_to(node, NodeValue::TableHead);
    let head_row = parser.add_child_to(head, NodeValue::TableRow);
    for (i, cell) in header_cells.iter().enumerate() {
        let c = parser.add_child_to(head_row, NodeValue::TableCell(aligns[i]));
        c.data.borrow_mut().content = cell.trim().to_string();
    }

    for line in &lines[2..] {
        if line.trim().is_empty() {
            continue;
        }
        let row = parser.add_child_to(node, NodeValue::TableRow);
        let cells = split_row(line);
        for (i, align) in aligns.iter().enumerate() {
            let c = parser.add_child_to(row, NodeValue::TableCell(*align));
            // short rows pad out, long rows truncate
            let text = cells.get(i).map(|s| s.trim()).unwrap_or("");
            c.data.borrow_mut().content = text.to_string();
        }
    }
}

fn has_unescaped_pipe(line: &str) -> bool {
    let b = line.as_bytes();
    (0..b.len()).any(|i| b[i] == b'|' && !strings::is_backslash_escaped(b, i))
}

/// `| :--- | :---: | ---: |` → the per-column alignments.
fn parse_delimiter_row(line: &str) -> Option<Vec<TableAlignment>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed
        .bytes()
        .all(|c| matches!(c, b'|' | b'-' | b':' | b' ' | b'\t'))
    {
        return None;
    }

    let cells = split_row(trimmed);
    let mut aligns = Vec::with_capacity(cells.len());
    for cell in cells {
        let c = cell.trim();
        if c.is_empty() {
            return None;
        }
        let left = c.starts_with(':');
        let right = c.ends_with(':');
        let dashes = c.trim_matches(':');
        if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
            return None;
        }
        aligns.push(match (left, right) {
            (true, true) => TableAlignment::Center,
            (true, false) => TableAlignment::Left,
            (false, true) => TableAlignment::Right,
            (false, false) => TableAlignment::None,
        });
    }
    Some(aligns)
}

/// Splits a row on unescaped pipes, dropping the outer empties produced
/// by leading/trailing pipes.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let pieces = strings::split_without_backslash_escape(trimmed.as_bytes(), b'|');
    let mut cells: Vec<String> = pieces
        .into_iter()
        .map(|p| String::from_utf8(p).unwrap_or_default())
        .collect();
    if cells.first().map_or(false, |c| c.trim().is_empty()) && trimmed.starts_with('|') {
        cells.remove(0);
    }
    if cells.last().map_or(false, |c| c.trim().is_empty()) && trimmed.ends_with('|') {
        cells.pop();
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_rows() {
        assert_eq!(
            parse_delimiter_row("| :-- | :-: | --: | --- |").unwrap(),
            vec![
                TableAlignment::Left,
                TableAlignment::Center,
                TableAlignment::Right,
                TableAlignment::None
            ]
        );
        assert!(parse_delimiter_row("| a |").is_none());
        assert!(parse_delimiter_row("| :: |").is_none());
    }

    #[test]
    fn row_splitting() {
        assert_eq!(split_row("| a | b |"), vec![" a ", " b "]);
        assert_eq!(split_row("a | b"), vec!["a ", " b"]);
        let cells = split_row(r"| a \| b | c |");
        assert_eq!(cells.len(), 2);
    }
}
