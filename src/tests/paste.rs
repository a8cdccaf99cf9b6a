use pretty_assertions::assert_eq;

use crate::Engine;

fn h2m(html: &str) -> String {
    Engine::new().html2markdown(html).expect("convertible html")
}

#[test]
fn paragraphs_and_inlines() {
    assert_eq!(h2m("<p>Hello <strong>x</strong></p>"), "Hello **x**\n");
    assert_eq!(h2m("<p>a <em>b</em> c</p>"), "a *b* c\n");
    assert_eq!(h2m("<p>s <del>gone</del></p>"), "s ~~gone~~\n");
}

#[test]
fn nested_inline_flattening() {
    // <strong><em> collapses to *** on the way out
    let md = h2m("<strong><span data-type=\"em\">x</span></strong>");
    assert_eq!(md, "***x***\n");
}

#[test]
fn headings_and_anchors() {
    assert_eq!(h2m("<h2>Title</h2>"), "## Title\n");
    // anchor artifacts inside headings are dropped
    let md = h2m("<h2><a href=\"#x\"></a>Title</h2>");
    assert_eq!(md, "## Title\n");
}

#[test]
fn fenced_code_from_pre() {
    let md = h2m("<pre><code class=\"language-js\">let a = 1;\n</code></pre>");
    assert_eq!(md, "```js\nlet a = 1;\n```\n");
}

#[test]
fn lists_from_html() {
    let md = h2m("<ul><li>one</li><li>two</li></ul>");
    assert!(md.contains("* one"), "{md}");
    assert!(md.contains("* two"));

    let md = h2m("<ol start=\"3\"><li>c</li></ol>");
    assert!(md.contains("3. c"), "{md}");
}

#[test]
fn task_items_from_checkboxes() {
    let md = h2m("<ul><li><input type=\"checkbox\" checked> done</li></ul>");
    assert!(md.contains("[X] done") || md.contains("[x] done"), "{md}");
}

#[test]
fn links_and_images() {
    assert_eq!(
        h2m("<a href=\"/u\" title=\"t\">text</a>"),
        "[text](/u \"t\")\n"
    );
    let md = h2m("<img src=\"/i.png\" alt=\"pic\">");
    assert_eq!(md, "![pic](/i.png)\n");
}

#[test]
fn tables_from_html() {
    let md = h2m(
        "<table><thead><tr><th>a</th><th>b</th></tr></thead><tbody><tr><td>c</td><td>d</td></tr></tbody></table>",
    );
    assert!(md.contains("| a | b |"), "{md}");
    assert!(md.contains("| c | d |"));
}

#[test]
fn code_in_table_becomes_spans() {
    let md = h2m(
        "<table><thead><tr><th>h</th></tr></thead><tbody><tr><td><pre>l1\nl2</pre></td></tr></tbody></table>",
    );
    assert!(md.contains("`l1`"), "{md}");
    assert!(md.contains("<br />"));
    assert!(md.contains("`l2`"));
}

#[test]
fn emoji_images_come_back_as_aliases() {
    let md = h2m("<p><img class=\"emoji\" src=\"/e/smile.png\" alt=\"smile\"></p>");
    assert!(md.contains(":smile:"), "{md}");
}

#[test]
fn blockquotes_nested() {
    let md = h2m("<blockquote><p>a</p><blockquote><p>b</p></blockquote></blockquote>");
    assert!(md.contains("> a"), "{md}");
    assert!(md.contains("> > b"));
}

#[test]
fn scripts_and_styles_are_dropped() {
    assert_eq!(h2m("<p>keep</p><script>alert(1)</script>"), "keep\n");
}

#[test]
fn empty_input() {
    assert_eq!(Engine::new().html2markdown("").unwrap(), "");
    assert_eq!(Engine::new().html2text("<p>a<br>b</p>"), "a\nb");
}

#[test]
fn comments_are_ignored() {
    assert_eq!(h2m("<p>a<!-- hidden -->b</p>"), "ab\n");
}
