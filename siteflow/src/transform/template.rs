//! Mustache template rendering backed by the `mustache` crate.
//!
//! Partials come from memory rather than disk, so they are expanded in place
//! before compilation and share the caller's context and delimiters. Custom
//! delimiters are applied with a leading set-delimiter tag.

use super::{Delimiters, TemplateRenderer};
use crate::errors::TransformError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

/// Maximum partial nesting before rendering is aborted.
const MAX_PARTIAL_DEPTH: usize = 32;

/// The default [`TemplateRenderer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MustacheRenderer;

impl MustacheRenderer {
    /// Creates a renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn template_error(err: impl Display) -> TransformError {
    TransformError::Template(err.to_string())
}

fn partial_tag(tags: &Delimiters) -> Result<Regex, TransformError> {
    Regex::new(&format!(
        r"{}>\s*(\S+?)\s*{}",
        regex::escape(&tags.open),
        regex::escape(&tags.close)
    ))
    .map_err(template_error)
}

/// Replaces every partial tag with the partial's source. Unknown partials
/// render as nothing.
fn expand_partials(
    template: &str,
    pattern: &Regex,
    partials: &HashMap<String, String>,
    depth: usize,
) -> Result<String, TransformError> {
    if !pattern.is_match(template) {
        return Ok(template.to_string());
    }
    if depth >= MAX_PARTIAL_DEPTH {
        return Err(TransformError::Template(format!(
            "partials nested deeper than {MAX_PARTIAL_DEPTH} levels"
        )));
    }

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in pattern.captures_iter(template) {
        let (Some(tag), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..tag.start()]);
        if let Some(partial) = partials.get(name.as_str()) {
            out.push_str(&expand_partials(partial, pattern, partials, depth + 1)?);
        }
        last = tag.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn set_delimiters(tags: &Delimiters) -> Result<String, TransformError> {
    let usable = |tag: &str| !tag.is_empty() && !tag.contains(|c: char| c.is_whitespace() || c == '=');
    if !usable(&tags.open) || !usable(&tags.close) {
        return Err(TransformError::Template(format!(
            "unusable delimiters '{}' '{}'",
            tags.open, tags.close
        )));
    }
    Ok(format!("{{{{={} {}=}}}}", tags.open, tags.close))
}

impl TemplateRenderer for MustacheRenderer {
    fn render(
        &self,
        template: &str,
        vars: &Value,
        partials: &HashMap<String, String>,
        tags: &Delimiters,
    ) -> Result<String, TransformError> {
        let expanded = expand_partials(template, &partial_tag(tags)?, partials, 0)?;
        let source = if *tags == Delimiters::default() {
            expanded
        } else {
            set_delimiters(tags)? + &expanded
        };

        let compiled = mustache::compile_str(&source).map_err(template_error)?;
        let mut out = Vec::with_capacity(source.len());
        // mustache panics on some value and tag combinations, such as a
        // boolean in a variable tag.
        panic::catch_unwind(AssertUnwindSafe(|| compiled.render(&mut out, vars)))
            .map_err(|_| TransformError::Template("value does not fit the tag using it".into()))?
            .map_err(template_error)?;
        String::from_utf8(out).map_err(template_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(template: &str, vars: &Value) -> String {
        MustacheRenderer::new()
            .render(template, vars, &HashMap::new(), &Delimiters::default())
            .unwrap()
    }

    #[test]
    fn test_variables_and_escaping() {
        let vars = json!({"name": "<b>Ann & Bo</b>", "n": 3});
        assert_eq!(
            render("Hi {{ name }}!", &vars),
            "Hi &lt;b&gt;Ann &amp; Bo&lt;/b&gt;!"
        );
        assert_eq!(render("Hi {{{ name }}}!", &vars), "Hi <b>Ann & Bo</b>!");
        assert_eq!(render("Hi {{& name}}!", &vars), "Hi <b>Ann & Bo</b>!");
        assert_eq!(render("{{n}} [{{missing}}]", &vars), "3 []");
    }

    #[test]
    fn test_dotted_names_and_context_stack() {
        let vars = json!({
            "site": {"title": "Home"},
            "items": [{"name": "a"}, {"name": "b"}],
            "suffix": "!",
        });
        assert_eq!(render("{{site.title}}", &vars), "Home");
        assert_eq!(render("{{#items}}{{name}}{{suffix}}{{/items}}", &vars), "a!b!");
        assert_eq!(render("{{#site}}{{title}}{{/site}}", &vars), "Home");
    }

    #[test]
    fn test_sections_and_inverted() {
        let vars = json!({"empty": [], "list": ["x", "y"], "on": true, "off": false});
        assert_eq!(render("{{#empty}}no{{/empty}}{{^empty}}none{{/empty}}", &vars), "none");
        assert_eq!(render("{{^missing}}absent{{/missing}}", &vars), "absent");
        assert_eq!(render("{{#on}}yes{{/on}}{{#off}}no{{/off}}", &vars), "yes");
        assert_eq!(render("{{#list}}<{{.}}>{{/list}}", &vars), "<x><y>");
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(render("a{{! note\nmultiline }}b", &json!({})), "ab");
    }

    #[test]
    fn test_partials_share_context() {
        let mut partials = HashMap::new();
        partials.insert("content".to_string(), "<p>{{ greeting }}</p>".to_string());
        partials.insert("outer".to_string(), "[{{>content}}]".to_string());
        let out = MustacheRenderer::new()
            .render(
                "<main>{{> outer}}{{> missing}}</main>",
                &json!({"greeting": "hi"}),
                &partials,
                &Delimiters::default(),
            )
            .unwrap();

        assert_eq!(out, "<main>[<p>hi</p>]</main>");
    }

    #[test]
    fn test_recursive_partial_is_bounded() {
        let mut partials = HashMap::new();
        partials.insert("loop".to_string(), "{{> loop}}".to_string());
        let result = MustacheRenderer::new().render(
            "{{> loop}}",
            &json!({}),
            &partials,
            &Delimiters::default(),
        );

        assert!(matches!(result, Err(TransformError::Template(_))));
    }

    #[test]
    fn test_custom_delimiters() {
        let tags = Delimiters::new("<%", "%>");
        let partials = HashMap::from([("body".to_string(), "<p><%& html %></p>".to_string())]);
        let out = MustacheRenderer::new()
            .render(
                "<%name%> {{name}} <%> body%>",
                &json!({"name": "x", "html": "<i>"}),
                &partials,
                &tags,
            )
            .unwrap();
        assert_eq!(out, "x {{name}} <p><i></p>");
    }

    #[test]
    fn test_unusable_delimiters_are_rejected() {
        let result = MustacheRenderer::new().render(
            "x",
            &json!({}),
            &HashMap::new(),
            &Delimiters::new("<% ", "%>"),
        );
        assert!(matches!(result, Err(TransformError::Template(_))));
    }

    #[test]
    fn test_malformed_templates() {
        let r = MustacheRenderer::new();
        let tags = Delimiters::default();
        let vars = json!({});
        let none = HashMap::new();

        assert!(r.render("{{#a}}open", &vars, &none, &tags).is_err());
        assert!(r.render("{{/a}}", &vars, &none, &tags).is_err());
        assert!(r.render("{{#a}}{{/b}}", &vars, &none, &tags).is_err());
        assert!(r.render("{{name", &vars, &none, &tags).is_err());
    }
}
