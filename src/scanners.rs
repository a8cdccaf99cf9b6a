//! Line scanners for block starts and inline constructs. Each returns the
//! number of bytes matched from the start of its input, so callers can
//! advance the cursor without re-scanning.

use crate::ctype::{isalnum, isalpha, isdigit, isspace};

pub enum SetextChar {
    Equals,
    Hyphen,
}

/// `#`{1..6} followed by space, tab or end of line.
pub fn atx_heading_start(line: &[u8]) -> Option<usize> {
    if line.is_empty() || line[0] != b'#' {
        return None;
    }
    let mut hashes = 0;
    while hashes < line.len() && line[hashes] == b'#' {
        hashes += 1;
    }
    if hashes > 6 {
        return None;
    }
    if hashes == line.len() || line[hashes] == b'\n' || line[hashes] == b'\r' {
        return Some(hashes);
    }
    if line[hashes] == b' ' || line[hashes] == b'\t' {
        return Some(hashes + 1);
    }
    None
}

/// Opening code fence: three or more backticks or tildes; a backtick
/// fence's info string may not contain a backtick.
pub fn open_code_fence(line: &[u8]) -> Option<usize> {
    if line.is_empty() || (line[0] != b'`' && line[0] != b'~') {
        return None;
    }
    let fence_char = line[0];
    let mut len = 0;
    while len < line.len() && line[len] == fence_char {
        len += 1;
    }
    if len < 3 {
        return None;
    }
    if fence_char == b'`' && line[len..].iter().any(|&c| c == b'`') {
        return None;
    }
    Some(len)
}

/// Closing code fence: at least three of the fence char, spaces only after.
pub fn close_code_fence(line: &[u8]) -> Option<usize> {
    if line.is_empty() || (line[0] != b'`' && line[0] != b'~') {
        return None;
    }
    let fence_char = line[0];
    let mut len = 0;
    while len < line.len() && line[len] == fence_char {
        len += 1;
    }
    if len < 3 {
        return None;
    }
    if line[len..]
        .iter()
        .any(|&c| !isspace(c))
    {
        return None;
    }
    Some(len)
}

/// `=` or `-` run with only trailing spaces.
pub fn setext_heading_line(line: &[u8]) -> Option<SetextChar> {
    if line.is_empty() || (line[0] != b'=' && line[0] != b'-') {
        return None;
    }
    let ch = line[0];
    let mut i = 0;
    while i < line.len() && line[i] == ch {
        i += 1;
    }
    while i < line.len() {
        if !isspace(line[i]) {
            return None;
        }
        i += 1;
    }
    if ch == b'=' {
        Some(SetextChar::Equals)
    } else {
        Some(SetextChar::Hyphen)
    }
}

fn ascii_istarts_with(line: &[u8], prefix: &[u8]) -> bool {
    line.len() >= prefix.len()
        && line
            .iter()
            .zip(prefix.iter())
            .all(|(a, b)| a.to_ascii_lowercase() == *b)
}

const BLOCK_TAG_NAMES: [&str; 62] = [
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "section", "source",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

fn scan_tag_name(line: &[u8]) -> Option<usize> {
    if line.is_empty() || !isalpha(line[0]) {
        return None;
    }
    let mut i = 1;
    while i < line.len() && (isalnum(line[i]) || line[i] == b'-') {
        i += 1;
    }
    Some(i)
}

/// Detects which of the seven HTML block kinds (1-6 here) `line` opens.
pub fn html_block_start(line: &[u8]) -> Option<u8> {
    if !line.starts_with(b"<") {
        return None;
    }

    for name in ["script", "pre", "style", "textarea"] {
        if ascii_istarts_with(&line[1..], name.as_bytes()) {
            let rest = &line[1 + name.len()..];
            if rest.is_empty() || matches!(rest[0], b' ' | b'\t' | b'\n' | b'>') {
                return Some(1);
            }
        }
    }
    if line.starts_with(b"<!--") {
        return Some(2);
    }
    if line.starts_with(b"<?") {
        return Some(3);
    }
    if line.len() > 2 && line[1] == b'!' && line[2].is_ascii_alphabetic() {
        return Some(4);
    }
    if line.starts_with(b"<![CDATA[") {
        return Some(5);
    }

    let rest = if line.len() > 1 && line[1] == b'/' {
        &line[2..]
    } else {
        &line[1..]
    };
    if let Some(name_len) = scan_tag_name(rest) {
        let name = std::str::from_utf8(&rest[..name_len]).ok()?;
        if BLOCK_TAG_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
            let after = &rest[name_len..];
            if after.is_empty()
                || after.starts_with(b">")
                || after.starts_with(b"/>")
                || matches!(after[0], b' ' | b'\t' | b'\n')
            {
                return Some(6);
            }
        }
    }
    None
}

/// Kind 7: a single complete open or close tag, nothing else on the line.
pub fn html_block_start_7(line: &[u8]) -> Option<u8> {
    let tag_len = html_tag(&line[1..])?;
    let rest = &line[1 + tag_len..];
    if crate::strings::is_blank(rest) || rest.is_empty() {
        // script/pre/style/textarea open tags are kind 1, not 7
        let inner = &line[1..];
        for name in ["script", "pre", "style", "textarea"] {
            if ascii_istarts_with(inner, name.as_bytes()) {
                return None;
            }
        }
        return Some(7);
    }
    None
}

pub fn html_block_end_1(line: &[u8]) -> bool {
    let lower: Vec<u8> = line.iter().map(|c| c.to_ascii_lowercase()).collect();
    [&b"</script>"[..], b"</pre>", b"</style>", b"</textarea>"]
        .iter()
        .any(|needle| lower.windows(needle.len()).any(|w| w == *needle))
}

pub fn html_block_end_2(line: &[u8]) -> bool {
    line.windows(3).any(|w| w == b"-->")
}

pub fn html_block_end_3(line: &[u8]) -> bool {
    line.windows(2).any(|w| w == b"?>")
}

pub fn html_block_end_4(line: &[u8]) -> bool {
    line.contains(&b'>')
}

pub fn html_block_end_5(line: &[u8]) -> bool {
    line.windows(3).any(|w| w == b"]]>")
}

/// Scans a complete inline HTML tag (open, close, comment, PI,
/// declaration or CDATA) starting just past the `<`. Returns the length
/// through the closing `>`.
pub fn html_tag(line: &[u8]) -> Option<usize> {
    if line.is_empty() {
        return None;
    }

    if line[0] == b'!' {
        if line[1..].starts_with(b"--") {
            let mut i = 3;
            while i + 2 < line.len() + 2 {
                if line[i..].starts_with(b"-->") {
                    return Some(i + 3);
                }
                if i >= line.len() {
                    return None;
                }
                i += 1;
            }
            return None;
        }
        if line[1..].starts_with(b"[CDATA[") {
            let mut i = 8;
            while i < line.len() {
                if line[i..].starts_with(b"]]>") {
                    return Some(i + 3);
                }
                i += 1;
            }
            return None;
        }
        // declaration
        let mut i = 1;
        if i >= line.len() || !isalpha(line[i]) {
            return None;
        }
        while i < line.len() && line[i] != b'>' {
            i += 1;
        }
        return if i < line.len() { Some(i + 1) } else { None };
    }

    if line[0] == b'?' {
        let mut i = 1;
        while i + 1 < line.len() {
            if line[i] == b'?' && line[i + 1] == b'>' {
                return Some(i + 2);
            }
            i += 1;
        }
        return None;
    }

    let closing = line[0] == b'/';
    let mut i = if closing { 1 } else { 0 };
    let name_len = scan_tag_name(&line[i..])?;
    i += name_len;

    if closing {
        while i < line.len() && isspace(line[i]) {
            i += 1;
        }
        return if i < line.len() && line[i] == b'>' {
            Some(i + 1)
        } else {
            None
        };
    }

    // attributes
    loop {
        let ws_start = i;
        while i < line.len() && isspace(line[i]) {
            i += 1;
        }
        if i >= line.len() {
            return None;
        }
        if line[i] == b'>' {
            return Some(i + 1);
        }
        if line[i] == b'/' {
            return if i + 1 < line.len() && line[i + 1] == b'>' {
                Some(i + 2)
            } else {
                None
            };
        }
        if ws_start == i {
            return None;
        }
        // attribute name
        if !isalpha(line[i]) && line[i] != b'_' && line[i] != b':' {
            return None;
        }
        i += 1;
        while i < line.len()
            && (isalnum(line[i]) || matches!(line[i], b'_' | b':' | b'.' | b'-'))
        {
            i += 1;
        }
        // optional value
        let mut j = i;
        while j < line.len() && isspace(line[j]) {
            j += 1;
        }
        if j < line.len() && line[j] == b'=' {
            j += 1;
            while j < line.len() && isspace(line[j]) {
                j += 1;
            }
            if j >= line.len() {
                return None;
            }
            match line[j] {
                b'"' | b'\'' => {
                    let quote = line[j];
                    j += 1;
                    while j < line.len() && line[j] != quote {
                        j += 1;
                    }
                    if j >= line.len() {
                        return None;
                    }
                    j += 1;
                }
                _ => {
                    let start = j;
                    while j < line.len()
                        && !isspace(line[j])
                        && !matches!(line[j], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
                    {
                        j += 1;
                    }
                    if start == j {
                        return None;
                    }
                }
            }
            i = j;
        }
    }
}

/// `<scheme:...>` autolink; returns length through the closing `>`.
pub fn autolink_uri(line: &[u8]) -> Option<usize> {
    if line.is_empty() || !isalpha(line[0]) {
        return None;
    }
    let mut i = 1;
    while i < line.len() && i < 32 && (isalnum(line[i]) || matches!(line[i], b'+' | b'.' | b'-')) {
        i += 1;
    }
    if i < 2 || i >= line.len() || line[i] != b':' {
        return None;
    }
    i += 1;
    while i < line.len() {
        match line[i] {
            b'>' => return Some(i + 1),
            b'<' | b' ' | b'\t' | b'\n' | 0..=0x1f | 0x7f => return None,
            _ => i += 1,
        }
    }
    None
}

/// `<name@host>` autolink; returns length through the closing `>`.
pub fn autolink_email(line: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < line.len()
        && (isalnum(line[i])
            || matches!(
                line[i],
                b'.' | b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'/' | b'='
                    | b'?' | b'^' | b'_' | b'`' | b'{' | b'|' | b'}' | b'~' | b'-'
            ))
    {
        i += 1;
    }
    if i == 0 || i >= line.len() || line[i] != b'@' {
        return None;
    }
    i += 1;

    let mut label_len = 0;
    let mut last_was_dash = false;
    let mut seen_label = false;
    while i < line.len() {
        match line[i] {
            c if isalnum(c) => {
                label_len += 1;
                last_was_dash = false;
                seen_label = true;
            }
            b'-' => {
                if label_len == 0 {
                    return None;
                }
                label_len += 1;
                last_was_dash = true;
            }
            b'.' => {
                if label_len == 0 || last_was_dash {
                    return None;
                }
                label_len = 0;
            }
            b'>' => {
                return if seen_label && !last_was_dash && label_len > 0 {
                    Some(i + 1)
                } else {
                    None
                };
            }
            _ => return None,
        }
        if label_len > 63 {
            return None;
        }
        i += 1;
    }
    None
}

/// Link title in any of the three quoting styles, honoring backslash
/// escapes; returns consumed length including the quotes.
pub fn link_title(line: &[u8]) -> Option<usize> {
    if line.is_empty() {
        return None;
    }
    let (open, close) = match line[0] {
        b'"' => (b'"', b'"'),
        b'\'' => (b'\'', b'\''),
        b'(' => (b'(', b')'),
        _ => return None,
    };
    let mut i = 1;
    while i < line.len() {
        let c = line[i];
        if c == b'\\' && i + 1 < line.len() {
            i += 2;
            continue;
        }
        if c == close {
            return Some(i + 1);
        }
        if open == b'(' && c == b'(' {
            return None;
        }
        i += 1;
    }
    None
}

/// `javascript:`, `vbscript:`, `file:` and non-image `data:` URLs are
/// rejected when sanitization is on.
pub fn dangerous_url(url: &[u8]) -> bool {
    let lower: Vec<u8> = url
        .iter()
        .take(16)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if lower.starts_with(b"javascript:") || lower.starts_with(b"vbscript:") || lower.starts_with(b"file:") {
        return true;
    }
    if lower.starts_with(b"data:") {
        return ![&b"data:image/png"[..], b"data:image/gif", b"data:image/jpeg", b"data:image/webp", b"data:image/svg"]
            .iter()
            .any(|p| lower.starts_with(p));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx() {
        assert_eq!(atx_heading_start(b"# x"), Some(2));
        assert_eq!(atx_heading_start(b"###\n"), Some(3));
        assert_eq!(atx_heading_start(b"####### x"), None);
        assert_eq!(atx_heading_start(b"#x"), None);
    }

    #[test]
    fn fences() {
        assert_eq!(open_code_fence(b"```js\n"), Some(3));
        assert_eq!(open_code_fence(b"``\n"), None);
        assert_eq!(open_code_fence(b"```a`b\n"), None);
        assert_eq!(close_code_fence(b"````   \n"), Some(4));
        assert_eq!(close_code_fence(b"``` x\n"), None);
    }

    #[test]
    fn html_kinds() {
        assert_eq!(html_block_start(b"<script src=x>"), Some(1));
        assert_eq!(html_block_start(b"<!-- c"), Some(2));
        assert_eq!(html_block_start(b"<!DOCTYPE html>"), Some(4));
        assert_eq!(html_block_start(b"<div class=x>"), Some(6));
        assert_eq!(html_block_start(b"<span>"), None);
        assert_eq!(html_block_start_7(b"<span>\n"), Some(7));
        assert_eq!(html_block_start_7(b"<span>text\n"), None);
    }

    #[test]
    fn autolinks() {
        assert_eq!(autolink_uri(b"https://ex.com/a?b=c>x"), Some(21));
        assert_eq!(autolink_uri(b"https://ex com>"), None);
        assert_eq!(autolink_email(b"a.b@ex-1.com>"), Some(13));
        assert_eq!(autolink_email(b"a@b..c>"), None);
    }

    #[test]
    fn titles_and_urls() {
        assert_eq!(link_title(br#""a\"b""#), Some(6));
        assert_eq!(link_title(b"(t)x"), Some(3));
        assert!(dangerous_url(b"JavaScript:alert(1)"));
        assert!(!dangerous_url(b"data:image/png;base64,x"));
        assert!(dangerous_url(b"data:text/html,x"));
    }
}
