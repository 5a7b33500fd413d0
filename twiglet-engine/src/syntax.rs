//! Splits template source into text, `{{ output }}`, `{% tag %}` and
//! `{# comment #}` segments.

use crate::error::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// Expression source between `{{` and `}}`.
    Output { source: String, line: usize },
    /// Tag source between `{%` and `%}`, keyword included.
    Tag { source: String, line: usize },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Delim {
    Output,
    Tag,
    Comment,
}

/// Tokenize `source`, applying `-` whitespace control.
pub fn lex(template: &str, source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut trim_next = false;

    loop {
        let Some((start, delim)) = next_open(rest) else {
            push_text(&mut segments, rest, trim_next, false);
            break;
        };
        let text = &rest[..start];
        let after_open = &rest[start + 2..];
        let trim_before = after_open.starts_with('-');
        push_text(&mut segments, text, trim_next, trim_before);
        line += text.matches('\n').count();

        let body_start = usize::from(trim_before);
        let body = &after_open[body_start..];
        let end = find_close(body, delim).ok_or_else(|| TemplateError::Syntax {
            template: template.to_string(),
            line,
            message: match delim {
                Delim::Output => "unclosed `{{`".to_string(),
                Delim::Tag => "unclosed `{%`".to_string(),
                Delim::Comment => "unclosed `{#`".to_string(),
            },
        })?;
        let mut inner = &body[..end];
        trim_next = inner.ends_with('-');
        if trim_next {
            inner = &inner[..inner.len() - 1];
        }
        let segment_line = line;
        line += inner.matches('\n').count();
        match delim {
            Delim::Output => segments.push(Segment::Output {
                source: inner.trim().to_string(),
                line: segment_line,
            }),
            Delim::Tag => segments.push(Segment::Tag {
                source: inner.trim().to_string(),
                line: segment_line,
            }),
            Delim::Comment => {}
        }
        rest = &body[end + 2..];
    }
    Ok(segments)
}

fn push_text(segments: &mut Vec<Segment>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn next_open(source: &str) -> Option<(usize, Delim)> {
    let bytes = source.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' {
            match bytes[i + 1] {
                b'{' => return Some((i, Delim::Output)),
                b'%' => return Some((i, Delim::Tag)),
                b'#' => return Some((i, Delim::Comment)),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Byte offset of the closing delimiter, skipping quoted strings and
/// nested braces of map literals.
fn find_close(body: &str, delim: Delim) -> Option<usize> {
    let bytes = body.as_bytes();
    if delim == Delim::Comment {
        return body.find("#}");
    }
    let close = if delim == Delim::Output { b'}' } else { b'%' };
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' if depth > 0 => {
                    depth -= 1;
                }
                _ if b == close && depth == 0 && bytes.get(i + 1) == Some(&b'}') => {
                    return Some(i);
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}
