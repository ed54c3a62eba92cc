//! String-case transforms for endpoint routing names.

/// Endpoint-case applied to method names when building routing names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointCase {
    /// Keep the source name untouched.
    None,
    /// Plain lowercasing.
    #[default]
    Lower,
    /// Word boundaries become `_`.
    Snake,
    /// Word boundaries become `-`.
    Url,
    /// Word boundaries become `.`.
    Dot,
}

impl EndpointCase {
    pub fn apply(&self, name: &str) -> String {
        match self {
            EndpointCase::None => name.to_string(),
            EndpointCase::Lower => name.to_lowercase(),
            EndpointCase::Snake => to_case_with_sep(name, '_'),
            EndpointCase::Url => to_case_with_sep(name, '-'),
            EndpointCase::Dot => to_case_with_sep(name, '.'),
        }
    }

    /// Separator character inserted by this transform, if any.
    pub fn separator(&self) -> Option<char> {
        match self {
            EndpointCase::None | EndpointCase::Lower => None,
            EndpointCase::Snake => Some('_'),
            EndpointCase::Url => Some('-'),
            EndpointCase::Dot => Some('.'),
        }
    }
}

/// Lowercase `name` inserting `sep` at word boundaries. A boundary is an
/// uppercase rune with a lowercase neighbour; runs of uppercase stay together
/// (`HTTPServer` → `http_server`, not `h_t_t_p_server`). Whitespace and
/// underscores become the separator.
pub fn to_case_with_sep(name: &str, sep: char) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_whitespace() || c == '_' {
            out.push(sep);
            continue;
        }

        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_lowercase();
            if i > 0 && !out.ends_with(sep) && (prev_lower || next_lower) {
                out.push(sep);
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// snake_case → lowerCamel, the default JSON spelling of argument names.
pub fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for c in name.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    out
}

/// snake_case → PascalCase, used for generated descriptor type names.
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;

    for c in name.chars() {
        if c == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    out
}
