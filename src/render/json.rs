//! Faithful AST serialization to JSON.

use serde::Serialize;

use crate::nodes::{AstNode, ListType, NodeValue, TableAlignment};

/// The serialized shape of one node.
#[derive(Serialize)]
pub struct JsonNode {
    #[serde(rename = "Type")]
    pub node_type: String,

    #[serde(rename = "ID", skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(rename = "Data", skip_serializing_if = "String::is_empty")]
    pub data: String,

    #[serde(rename = "HeadingLevel", skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,

    #[serde(rename = "ListData", skip_serializing_if = "Option::is_none")]
    pub list_data: Option<JsonListData>,

    #[serde(rename = "CodeBlockInfo", skip_serializing_if = "Option::is_none")]
    pub code_block_info: Option<String>,

    #[serde(rename = "TableAligns", skip_serializing_if = "Option::is_none")]
    pub table_aligns: Option<Vec<u8>>,

    #[serde(rename = "TaskListItemChecked", skip_serializing_if = "Option::is_none")]
    pub task_list_item_checked: Option<bool>,

    #[serde(rename = "TextMarkType", skip_serializing_if = "Option::is_none")]
    pub text_mark_type: Option<String>,

    #[serde(rename = "TextMarkTextContent", skip_serializing_if = "Option::is_none")]
    pub text_mark_text_content: Option<String>,

    #[serde(rename = "Properties", skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<(String, String)>,

    #[serde(rename = "Children", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<JsonNode>,
}

#[derive(Serialize)]
pub struct JsonListData {
    #[serde(rename = "Typ")]
    pub typ: u8,
    #[serde(rename = "Tight")]
    pub tight: bool,
    #[serde(rename = "BulletChar")]
    pub bullet_char: u8,
    #[serde(rename = "Start")]
    pub start: usize,
}

/// Converts a subtree into its serializable form.
pub fn json_node<'a>(node: &'a AstNode<'a>) -> JsonNode {
    let ast = node.data.borrow();

    let mut j = JsonNode {
        node_type: ast.kind().name().to_string(),
        id: ast.id().unwrap_or("").to_string(),
        data: ast.tokens.clone(),
        heading_level: None,
        list_data: None,
        code_block_info: None,
        table_aligns: None,
        task_list_item_checked: None,
        text_mark_type: None,
        text_mark_text_content: None,
        properties: ast.ial.clone(),
        children: Vec::new(),
    };

    match &ast.value {
        NodeValue::Heading(nh) => j.heading_level = Some(nh.level),
        NodeValue::List(nl) | NodeValue::ListItem(nl) => {
            j.list_data = Some(JsonListData {
                typ: match nl.list_type {
                    ListType::Bullet => 0,
                    ListType::Ordered => 1,
                    ListType::Task => 3,
                },
                tight: nl.tight,
                bullet_char: nl.bullet_char,
                start: nl.start,
            });
        }
        NodeValue::CodeBlock(ncb) => {
            if !ncb.info.is_empty() {
                j.code_block_info = Some(ncb.info.clone());
            }
        }
        NodeValue::Table(nt) => {
            j.table_aligns = Some(
                nt.aligns
                    .iter()
                    .map(|a| match a {
                        TableAlignment::None => 0,
                        TableAlignment::Left => 1,
                        TableAlignment::Center => 2,
                        TableAlignment::Right => 3,
                    })
                    .collect(),
            );
        }
        NodeValue::TaskListItemMarker { checked } => {
            j.task_list_item_checked = Some(*checked);
        }
        NodeValue::TextMark(tm) => {
            j.text_mark_type = Some(tm.sorted_types());
            j.text_mark_text_content = Some(tm.text_content.clone());
        }
        _ => {}
    }

    drop(ast);
    for child in node.children() {
        j.children.push(json_node(child));
    }
    j
}

/// Renders a tree as pretty JSON.
pub fn render_json<'a>(root: &'a AstNode<'a>) -> String {
    serde_json::to_string_pretty(&json_node(root)).unwrap_or_else(|_| "{}".to_string())
}
