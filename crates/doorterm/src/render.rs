//! Markup translation: one linear pass, nesting depth carried on an explicit
//! format stack rather than by re-scanning.

use memchr::memchr3;

use crate::codes::{self, Category};

/// A syntactically valid tag at the head of the input.
struct Tag<'a> {
    name: &'a str,
    closing: bool,
    void: bool,
    consumed: usize,
}

/// Parse `<name>`, `</name>` or `<name/>` at the start of `s` (which begins
/// with `<`). Returns `None` for anything else; the caller then treats the
/// bracket as literal text.
fn parse_tag(s: &str) -> Option<Tag<'_>> {
    let rest = s.strip_prefix('<')?;
    let (closing, rest) = match rest.strip_prefix('/') {
        Some(r) => (true, r),
        None => (false, rest),
    };
    let name_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if name_len == 0 {
        return None;
    }
    let name = &rest[..name_len];
    let tail = &rest[name_len..];
    let prefix = 1 + usize::from(closing) + name_len;
    if tail.starts_with('>') {
        return Some(Tag {
            name,
            closing,
            void: false,
            consumed: prefix + 1,
        });
    }
    if tail.starts_with("/>") && !closing {
        return Some(Tag {
            name,
            closing: false,
            void: true,
            consumed: prefix + 2,
        });
    }
    None
}

/// Emit a reset, then re-apply every tag still open on the format stack,
/// innermost first. A color close suppresses still-open colors of the same
/// category so a stale outer color cannot overwrite the freshly reset one.
fn reset_and_restore(out: &mut String, stack: &[(&str, Category)], closed: Category) {
    out.push_str(codes::RESET);
    for (name, cat) in stack.iter().rev() {
        if closed.is_color() && *cat == closed {
            continue;
        }
        if let Some((code, _)) = codes::lookup(name) {
            out.push_str(code);
        }
    }
}

/// Translate a markup document into terminal control codes.
///
/// Raw newlines normalize to the `newline` code. Unrecognized tags are not
/// markup and pass through with their angle brackets intact. A closing tag
/// with nothing open degrades to a bare reset; one bad message never fails
/// the whole send.
pub fn translate(doc: &str) -> String {
    let mut out = String::with_capacity(doc.len() + 16);
    let mut stack: Vec<(&str, Category)> = Vec::new();

    let mut rest = doc;
    while !rest.is_empty() {
        let Some(i) = memchr3(b'<', b'\n', b'\r', rest.as_bytes()) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        match rest.as_bytes()[0] {
            b'\n' => {
                out.push_str(codes::NEWLINE);
                rest = &rest[1..];
            }
            b'\r' => {
                if rest.as_bytes().get(1) == Some(&b'\n') {
                    out.push_str(codes::NEWLINE);
                    rest = &rest[2..];
                } else {
                    out.push('\r');
                    rest = &rest[1..];
                }
            }
            _ => {
                let parsed = parse_tag(rest)
                    .and_then(|t| codes::lookup(t.name).map(|(code, cat)| (t, code, cat)));
                match parsed {
                    Some((tag, code, cat)) => {
                        if tag.closing {
                            reset_and_restore(&mut out, &stack, cat);
                            if codes::nests(tag.name) && stack.pop().is_some() {
                                reset_and_restore(&mut out, &stack, cat);
                            }
                        } else {
                            out.push_str(code);
                            if codes::nests(tag.name) && !tag.void {
                                stack.push((tag.name, cat));
                            }
                        }
                        rest = &rest[tag.consumed..];
                    }
                    None => {
                        out.push('<');
                        rest = &rest[1..];
                    }
                }
            }
        }
    }
    out
}
