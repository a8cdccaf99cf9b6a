use crate::Engine;

#[test]
fn json_carries_types_and_structure() {
    let json = Engine::new().render_json("# Title\n\npara *em*\n");
    assert!(json.contains("\"Type\": \"NodeDocument\""), "{json}");
    assert!(json.contains("\"Type\": \"NodeHeading\""));
    assert!(json.contains("\"HeadingLevel\": 1"));
    assert!(json.contains("\"Type\": \"NodeEmphasis\""));
    assert!(json.contains("\"Data\": \"em\""));
}

#[test]
fn json_lists_carry_list_data() {
    let json = Engine::new().render_json("1. a\n");
    assert!(json.contains("\"Typ\": 1"), "{json}");
    assert!(json.contains("\"Start\": 1"));
}

#[test]
fn json_tables_carry_aligns() {
    let json = Engine::new().render_json("| a |\n| :-: |\n| b |\n");
    assert!(json.contains("\"TableAligns\""), "{json}");
    assert!(json.contains('2'));
}

#[test]
fn json_is_valid() {
    let json = Engine::new().render_json("para\n\n* a\n* b\n\n```c\nx\n```\n");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(parsed["Type"], "NodeDocument");
    assert!(parsed["Children"].is_array());
}
