use pretty_assertions::assert_eq;

use super::{assert_format_idempotent, format, html};

#[test]
fn paragraphs_and_emphasis() {
    assert_eq!(
        html("Hello **world** and *me*.\n"),
        "<p>Hello <strong>world</strong> and <em>me</em>.</p>\n"
    );
    assert_eq!(format("Hello **world**\n"), "Hello **world**\n");
    assert_format_idempotent("a *b* **c** ***d***\n");
}

#[test]
fn headings() {
    let out = html("# One\n\n## Two words\n");
    assert!(out.contains("<h1 id=\"one\">One</h1>"));
    assert!(out.contains("<h2 id=\"two-words\">Two words</h2>"));

    assert_eq!(format("#  One\n"), "# One\n");
    assert_eq!(format("Setext\n======\n"), "# Setext\n");
}

#[test]
fn atx_trailing_hashes_chopped() {
    assert_eq!(format("## Two ##\n"), "## Two\n");
}

#[test]
fn blockquotes() {
    assert_eq!(html("> quoted\n"), "<blockquote>\n<p>quoted</p>\n</blockquote>\n");
    assert_eq!(format("> a\n> b\n"), "> a\n> b\n");
    assert_format_idempotent("> outer\n>\n> > inner\n");
}

#[test]
fn lists() {
    let out = html("* one\n* two\n");
    assert!(out.contains("<ul>"));
    assert_eq!(out.matches("<li>").count(), 2);

    assert_eq!(format("- a\n- b\n"), "- a\n- b\n");
    assert_eq!(format("1. a\n2. b\n"), "1. a\n2. b\n");
    assert_format_idempotent("1. a\n\n2. b\n");
    assert_format_idempotent("* a\n  * b\n    * c\n");
}

#[test]
fn ordered_list_start() {
    let out = html("3. c\n4. d\n");
    assert!(out.contains("<ol start=\"3\">"));
}

#[test]
fn fenced_code_blocks() {
    let out = html("```js\nlet a = 1;\n```\n");
    assert!(out.contains("<pre><code class=\"language-js\">let a = 1;\n</code></pre>"));

    assert_eq!(format("```js\nlet a = 1;\n```\n"), "```js\nlet a = 1;\n```\n");
    assert_format_idempotent("````\ncode with ``` inside\n````\n");
}

#[test]
fn indented_code_blocks() {
    let out = html("    indented\n");
    assert!(out.contains("<pre><code>indented\n</code></pre>"));
}

#[test]
fn thematic_breaks() {
    assert!(html("***\n").contains("<hr />"));
    assert_eq!(format("***\n"), "---\n");
}

#[test]
fn code_spans() {
    assert_eq!(html("a `code` b\n"), "<p>a <code>code</code> b</p>\n");
    assert_format_idempotent("a `` x ` y `` b\n");
}

#[test]
fn inline_links() {
    assert_eq!(
        html("[text](/url \"title\")\n"),
        "<p><a href=\"/url\" title=\"title\">text</a></p>\n"
    );
    assert_eq!(format("[text](/url)\n"), "[text](/url)\n");
    assert_format_idempotent("[a **b**](/u \"t\")\n");
}

#[test]
fn reference_links_resolve() {
    let out = html("[Foo][x]\n\n[X]: /u \"t\"\n");
    assert!(out.contains("<a href=\"/u\" title=\"t\">Foo</a>"), "{out}");
}

#[test]
fn images() {
    let out = html("![alt text](/img.png \"t\")\n");
    assert!(out.contains("<img src=\"/img.png\" alt=\"alt text\" title=\"t\" />"));
}

#[test]
fn pointy_autolinks() {
    let out = html("<https://ex.com/a>\n");
    assert!(out.contains("<a href=\"https://ex.com/a\">https://ex.com/a</a>"));
    assert_eq!(format("<https://ex.com/a>\n"), "<https://ex.com/a>\n");
}

#[test]
fn bare_autolinks() {
    let out = html("see www.example.com ok\n");
    assert!(out.contains("<a href=\"http://www.example.com\">www.example.com</a>"), "{out}");
    let out = html("mail a.b@ex.com now\n");
    assert!(out.contains("href=\"mailto:a.b@ex.com\""));
}

#[test]
fn entities_kept_raw() {
    assert_eq!(html("a &amp; b\n"), "<p>a &amp; b</p>\n");
    assert_eq!(format("a &amp; b\n"), "a &amp; b\n");
}

#[test]
fn backslash_escapes() {
    assert_eq!(format("\\*not em\\*\n"), "\\*not em\\*\n");
    assert_eq!(html("\\*x\\*\n"), "<p>*x*</p>\n");
}

#[test]
fn hard_and_soft_breaks() {
    assert_format_idempotent("line one\\\nline two\n");
    // soft breaks harden in HTML by default
    assert!(html("a\nb\n").contains("<br />"));
}

#[test]
fn strikethrough_default_on() {
    assert_eq!(html("a ~~x~~ b\n"), "<p>a <del>x</del> b</p>\n");
    assert_eq!(format("~~x~~\n"), "~~x~~\n");
}

#[test]
fn tables() {
    let md = "| a | b |\n| --- | --- |\n| c | d |\n";
    assert_eq!(format(md), md);
    let out = html(md);
    assert!(out.contains("<table>"));
    assert!(out.contains("<th>a</th>"));
    assert!(out.contains("<td>d</td>"));
}

#[test]
fn table_alignment_round_trip() {
    let md = "| a | b | c |\n| :-- | :-: | --: |\n| 1 | 2 | 3 |\n";
    assert_eq!(format(md), md);
    let out = html(md);
    assert!(out.contains("<th align=\"left\">"));
    assert!(out.contains("<td align=\"center\">"));
    assert!(out.contains("<td align=\"right\">"));
}

#[test]
fn escaped_pipe_stays_in_cell() {
    let md = "| a \\| b |\n| --- |\n| c |\n";
    let out = html(md);
    assert_eq!(out.matches("<th").count(), 1, "{out}");
}

#[test]
fn task_lists() {
    let out = html("* [x] done\n* [ ] todo\n");
    assert!(out.contains("checked=\"\""));
    assert_eq!(out.matches("type=\"checkbox\"").count(), 2);
    assert_format_idempotent("* [X] done\n* [ ] todo\n");
}

#[test]
fn loose_vs_tight_lists() {
    let tight = html("* a\n* b\n");
    assert!(!tight.contains("<p>"));
    let loose = html("* a\n\n* b\n");
    assert!(loose.contains("<p>"));
}

#[test]
fn footnotes() {
    let out = html("Hi[^x].\n\n[^x]: A greeting.\n");
    assert!(out.contains("footnotes-ref"), "{out}");
    assert!(out.contains("A greeting."));
    assert!(out.contains("footnotes-def-x"));
}

#[test]
fn html_blocks_pass_through() {
    let out = html("<div class=\"x\">\nraw\n</div>\n");
    assert!(out.contains("<div class=\"x\">"));
    assert_format_idempotent("<div>\nraw\n</div>\n");
}

#[test]
fn inline_html_passes_through() {
    assert!(html("a <b>x</b> c\n").contains("<b>x</b>"));
}

#[test]
fn link_ref_defs_survive_format() {
    let md = "[Foo][x]\n\n[x]: /u \"t\"\n";
    let formatted = format(md);
    assert!(formatted.contains("[x]: /u \"t\""), "{formatted}");
    assert_format_idempotent(md);
}
