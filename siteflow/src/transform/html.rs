//! Tokenizing markup formatter.
//!
//! Markup is split into tags, comments, text and raw blocks (`pre`,
//! `textarea`, `script`, `style`). Raw blocks always pass through verbatim.

use super::MarkupFormatter;
use serde::{Deserialize, Serialize};

/// Elements whose content is never reformatted.
const RAW_ELEMENTS: [&str; 4] = ["pre", "textarea", "script", "style"];

/// Elements that have no closing tag.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Options for [`MarkupFormatter::beautify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeautifyOptions {
    /// Indent width per nesting level.
    pub indent_size: usize,
    /// Indent character.
    pub indent_char: char,
    /// Keep one blank line where the source had blank lines between tags.
    pub preserve_newlines: bool,
    /// Terminate the output with a newline.
    pub end_with_newline: bool,
}

impl Default for BeautifyOptions {
    fn default() -> Self {
        Self {
            indent_size: 2,
            indent_char: ' ',
            preserve_newlines: true,
            end_with_newline: true,
        }
    }
}

/// Options for [`MarkupFormatter::minify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinifyOptions {
    /// Drop `<!-- -->` comments.
    pub remove_comments: bool,
    /// Drop whitespace-only text between tags and collapse runs of whitespace.
    pub collapse_whitespace: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            remove_comments: true,
            collapse_whitespace: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node<'a> {
    Text(&'a str),
    Comment(&'a str),
    /// `<!DOCTYPE ...>` and other declarations.
    Declaration(&'a str),
    Open { name: String, markup: &'a str, self_closing: bool },
    Close { name: String, markup: &'a str },
    Raw(&'a str),
}

fn tag_name(markup: &str) -> String {
    markup
        .trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Offset of the `>` closing the tag at the start of `tail`. A `>` inside a
/// quoted attribute value does not count.
fn tag_end(tail: &str) -> Option<usize> {
    let mut quote = None;
    let mut after_eq = false;
    for (i, c) in tail.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '>' => return Some(i),
                '"' | '\'' if after_eq => quote = Some(c),
                _ => {}
            },
        }
        if !c.is_whitespace() {
            after_eq = quote.is_none() && c == '=';
        }
    }
    None
}

fn parse(html: &str) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    let mut pos = 0;

    while pos < html.len() {
        let rest = &html[pos..];
        let Some(lt) = rest.find('<') else {
            nodes.push(Node::Text(rest));
            break;
        };
        if lt > 0 {
            nodes.push(Node::Text(&rest[..lt]));
        }
        let start = pos + lt;
        let tail = &html[start..];

        if tail.starts_with("<!--") {
            let end = tail.find("-->").map_or(html.len(), |i| start + i + 3);
            nodes.push(Node::Comment(&html[start..end]));
            pos = end;
            continue;
        }

        let Some(gt) = tag_end(tail) else {
            nodes.push(Node::Text(tail));
            break;
        };
        let end = start + gt + 1;
        let markup = &html[start..end];

        if markup.starts_with("<!") || markup.starts_with("<?") {
            nodes.push(Node::Declaration(markup));
        } else if markup.starts_with("</") {
            nodes.push(Node::Close {
                name: tag_name(markup),
                markup,
            });
        } else {
            let name = tag_name(markup);
            let self_closing = markup.ends_with("/>") || VOID_ELEMENTS.contains(&name.as_str());
            if !self_closing && RAW_ELEMENTS.contains(&name.as_str()) {
                let closing = format!("</{name}");
                if let Some(close_at) = find_ci(&html[end..], &closing) {
                    let close_start = end + close_at;
                    let close_end = html[close_start..]
                        .find('>')
                        .map_or(html.len(), |i| close_start + i + 1);
                    nodes.push(Node::Raw(&html[start..close_end]));
                    pos = close_end;
                    continue;
                }
            }
            if name.is_empty() {
                nodes.push(Node::Text(markup));
            } else {
                nodes.push(Node::Open {
                    name,
                    markup,
                    self_closing,
                });
            }
        }
        pos = end;
    }
    nodes
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// The default [`MarkupFormatter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMarkupFormatter;

impl BasicMarkupFormatter {
    /// Creates a formatter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MarkupFormatter for BasicMarkupFormatter {
    fn beautify(&self, html: &str, options: &BeautifyOptions) -> String {
        let nodes = parse(html);
        let unit: String = std::iter::repeat(options.indent_char)
            .take(options.indent_size)
            .collect();
        let mut lines: Vec<String> = Vec::new();
        let mut level = 0usize;
        let indent = |level: usize| unit.repeat(level);

        let mut i = 0;
        while i < nodes.len() {
            match &nodes[i] {
                Node::Text(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        let blank_lines = text.matches('\n').count() >= 2;
                        if options.preserve_newlines
                            && blank_lines
                            && lines.last().is_some_and(|l| !l.is_empty())
                        {
                            lines.push(String::new());
                        }
                    } else {
                        lines.push(format!("{}{}", indent(level), collapse_whitespace(trimmed)));
                    }
                }
                Node::Comment(markup) | Node::Declaration(markup) | Node::Raw(markup) => {
                    lines.push(format!("{}{}", indent(level), markup.trim()));
                }
                Node::Open {
                    name,
                    markup,
                    self_closing,
                } => {
                    if *self_closing {
                        lines.push(format!("{}{markup}", indent(level)));
                        i += 1;
                        continue;
                    }
                    // Keep `<p>text</p>` and `<div></div>` on one line.
                    match (nodes.get(i + 1), nodes.get(i + 2)) {
                        (Some(Node::Close { name: close, markup: end }), _) if close == name => {
                            lines.push(format!("{}{markup}{end}", indent(level)));
                            i += 2;
                            continue;
                        }
                        (Some(Node::Text(text)), Some(Node::Close { name: close, markup: end }))
                            if close == name && !text.trim().is_empty() =>
                        {
                            lines.push(format!(
                                "{}{markup}{}{end}",
                                indent(level),
                                collapse_whitespace(text.trim())
                            ));
                            i += 3;
                            continue;
                        }
                        _ => {}
                    }
                    lines.push(format!("{}{markup}", indent(level)));
                    level += 1;
                }
                Node::Close { markup, .. } => {
                    level = level.saturating_sub(1);
                    lines.push(format!("{}{markup}", indent(level)));
                }
            }
            i += 1;
        }

        while lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        let mut out = lines.join("\n");
        if options.end_with_newline && !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn minify(&self, html: &str, options: &MinifyOptions) -> String {
        let mut out = String::with_capacity(html.len());
        for node in parse(html) {
            match node {
                Node::Comment(markup) => {
                    if !options.remove_comments {
                        out.push_str(markup);
                    }
                }
                Node::Text(text) => {
                    if !options.collapse_whitespace {
                        out.push_str(text);
                    } else if !text.trim().is_empty() {
                        out.push_str(&collapse_whitespace(text));
                    }
                }
                Node::Declaration(markup)
                | Node::Raw(markup)
                | Node::Open { markup, .. }
                | Node::Close { markup, .. } => out.push_str(markup),
            }
        }
        if options.collapse_whitespace {
            out.trim().to_string()
        } else {
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_minify_collapses_and_drops_comments() {
        let html = "<div>\n  <!-- note -->\n  <p>hi   there</p>\n</div>\n";
        let out = BasicMarkupFormatter::new().minify(html, &MinifyOptions::default());
        assert_eq!(out, "<div><p>hi there</p></div>");
    }

    #[test]
    fn test_minify_keeps_comments_when_asked() {
        let options = MinifyOptions {
            remove_comments: false,
            ..MinifyOptions::default()
        };
        let out = BasicMarkupFormatter::new().minify("<p>a</p> <!-- x -->", &options);
        assert_eq!(out, "<p>a</p><!-- x -->");
    }

    #[test]
    fn test_minify_single_paragraph_is_unchanged() {
        let out = BasicMarkupFormatter::new().minify("<p>hi</p>\n", &MinifyOptions::default());
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn test_beautify_indents_nested_tags() {
        let html = "<html><head><meta charset='utf-8'><title>T</title></head><body><div><p>hi</p><br></div></body></html>";
        let out = BasicMarkupFormatter::new().beautify(html, &BeautifyOptions::default());

        assert_eq!(
            out,
            "<html>\n  <head>\n    <meta charset='utf-8'>\n    <title>T</title>\n  </head>\n  <body>\n    <div>\n      <p>hi</p>\n      <br>\n    </div>\n  </body>\n</html>\n"
        );
    }

    #[test]
    fn test_beautify_respects_options() {
        let options = BeautifyOptions {
            indent_size: 1,
            indent_char: '\t',
            end_with_newline: false,
            ..BeautifyOptions::default()
        };
        let out = BasicMarkupFormatter::new().beautify("<ul><li>a</li></ul>", &options);
        assert_eq!(out, "<ul>\n\t<li>a</li>\n</ul>");
    }

    #[test]
    fn test_raw_blocks_pass_through() {
        let html = "<div><pre>  keep\n    this  </pre><script>if (a < b) {\n  go();\n}</script></div>";
        let formatter = BasicMarkupFormatter::new();

        let beautified = formatter.beautify(html, &BeautifyOptions::default());
        assert!(beautified.contains("<pre>  keep\n    this  </pre>"));
        assert!(beautified.contains("if (a < b) {\n  go();\n}"));

        let minified = formatter.minify(html, &MinifyOptions::default());
        assert!(minified.contains("<pre>  keep\n    this  </pre>"));
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let html = "<div><a title=\"a>b\" href='x>y'>go</a></div>";
        let formatter = BasicMarkupFormatter::new();

        assert_eq!(formatter.minify(html, &MinifyOptions::default()), html);
        assert_eq!(
            formatter.beautify(html, &BeautifyOptions::default()),
            "<div>\n  <a title=\"a>b\" href='x>y'>go</a>\n</div>\n"
        );
        assert_eq!(tag_end("<p class=x>don't</p>"), Some(10));
        assert_eq!(tag_end("<a title=\"open>"), None);
    }

    #[test]
    fn test_beautify_preserves_blank_line_between_blocks() {
        let out = BasicMarkupFormatter::new()
            .beautify("<p>a</p>\n\n\n<p>b</p>", &BeautifyOptions::default());
        assert_eq!(out, "<p>a</p>\n\n<p>b</p>\n");
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let beautify: BeautifyOptions = serde_json::from_str(r#"{"indent_size": 4}"#).unwrap();
        assert_eq!(beautify.indent_size, 4);
        assert!(beautify.end_with_newline);

        let minify: MinifyOptions =
            serde_json::from_str(r#"{"removeComments": false}"#).unwrap();
        assert!(!minify.remove_comments);
        assert!(minify.collapse_whitespace);
    }
}
