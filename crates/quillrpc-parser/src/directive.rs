//! The directive mini-language read from method and service doc blocks.
//!
//! A directive is a doc-comment line of the form `quillrpc:<token> [text]`.
//! The token classifies the line once into one of three variants; everything
//! that matches none of them is silently ignored so future directives stay
//! backward compatible.

use std::sync::LazyLock;

use regex::Regex;
use syn::{Attribute, Expr, Lit, Meta};

/// Directive prefix inside doc comments.
pub const MAGIC_PREFIX: &str = "quillrpc:";

/// A doc line that is exactly this marks a struct as a service.
pub const MARKER_LINE: &str = "quillrpc";

/// One parsed directive line.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Argument(ArgDirective),
    /// Return description.
    Return(String),
    /// Documented error code and message.
    Error(i64, String),
}

/// Argument metadata: `name[(alias)][=default] [description]`.
///
/// The default may be backquoted to preserve interior whitespace. `:` is
/// accepted as a legacy spelling of `=`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgDirective {
    pub name: String,
    pub alias: Option<String>,
    pub default: Option<String>,
    pub description: String,
}

static RETURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^return(?:[ \t]+(.*))?$").expect("return pattern"));

static ERROR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)(?:[ \t]+(.*))?$").expect("error pattern"));

static ARGUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^\s*
        (?P<name>[A-Za-z_][A-Za-z0-9_]*)
        (?:\s*\(\s*(?P<alias>[A-Za-z_][A-Za-z0-9_]*)\s*\))?
        (?:\s*[=:]\s*(?:`(?P<quoted>[^`]*)`|(?P<plain>\S+)))?
        \s*(?P<description>.*?)\s*$
    ",
    )
    .expect("argument pattern")
});

/// Classify one directive body (the text after the magic prefix).
pub fn parse_directive(body: &str) -> Option<Directive> {
    let body = body.trim();

    if let Some(caps) = RETURN_RE.captures(body) {
        let description = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        return Some(Directive::Return(description.to_string()));
    }

    if let Some(caps) = ERROR_RE.captures(body) {
        // A code that overflows i64 is not a directive we understand.
        if let Ok(code) = caps[1].parse::<i64>() {
            let message = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            return Some(Directive::Error(code, message.to_string()));
        }
        return None;
    }

    let caps = ARGUMENT_RE.captures(body)?;
    Some(Directive::Argument(ArgDirective {
        name: caps["name"].to_string(),
        alias: caps.name("alias").map(|m| m.as_str().to_string()),
        default: caps
            .name("quoted")
            .or_else(|| caps.name("plain"))
            .map(|m| m.as_str().to_string()),
        description: caps["description"].to_string(),
    }))
}

/// One line of a doc block.
fn doc_line(attr: &Attribute) -> Option<String> {
    let Meta::NameValue(meta) = &attr.meta else {
        return None;
    };
    if !meta.path.is_ident("doc") {
        return None;
    }
    let Expr::Lit(lit) = &meta.value else {
        return None;
    };
    let Lit::Str(text) = &lit.lit else {
        return None;
    };

    Some(text.value().trim().to_string())
}

/// Split a doc block into its plain description (directive and marker lines
/// stripped) and the parsed directives.
pub fn parse_doc_block(attrs: &[Attribute]) -> (String, Vec<Directive>) {
    let mut description = String::new();
    let mut directives = Vec::new();

    for line in attrs.iter().filter_map(doc_line) {
        if line == MARKER_LINE {
            continue;
        }

        if let Some(body) = line.strip_prefix(MAGIC_PREFIX) {
            if let Some(directive) = parse_directive(body) {
                directives.push(directive);
            }
            continue;
        }

        if !description.is_empty() {
            description.push('\n');
        }
        description.push_str(&line);
    }

    (description, directives)
}

/// Whether the doc block carries the bare service marker line.
pub fn has_marker_line(attrs: &[Attribute]) -> bool {
    attrs.iter().filter_map(doc_line).any(|line| line == MARKER_LINE)
}
