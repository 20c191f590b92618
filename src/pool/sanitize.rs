//! Markdown fence stripping.
//!
//! Models routinely wrap file contents in a code fence even when asked not
//! to. Callers writing results straight to source files want that wrapper
//! gone, and nothing else touched.

/// Remove a single pair of enclosing triple-backtick fences, along with an
/// optional language tag on the opening fence and the trailing newline of
/// the body. Returns the input unchanged when it is not fenced. Inner
/// fences are never touched.
pub fn strip_markdown_fences(raw: &str) -> String {
    let text = raw.strip_suffix('\n').unwrap_or(raw);

    let Some(rest) = text.strip_prefix("```") else {
        return raw.to_string();
    };
    // Opening fence line: an optional language tag, then the newline that
    // starts the body. A backtick in the tag position means this is not a
    // fence (e.g. the whole output is ``````).
    let Some(newline) = rest.find('\n') else {
        return raw.to_string();
    };
    let tag = &rest[..newline];
    if tag.contains('`') {
        return raw.to_string();
    }

    let body_and_close = &rest[newline + 1..];
    let Some(body) = body_and_close.strip_suffix("```") else {
        return raw.to_string();
    };
    // The closing fence must sit on its own line.
    if !body.is_empty() && !body.ends_with('\n') {
        return raw.to_string();
    }

    body.strip_suffix('\n').unwrap_or(body).to_string()
}
