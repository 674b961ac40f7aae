//! Word wrap over already-rendered text.
//!
//! Width is measured in visible terminal columns: CSI escape sequences are
//! zero, East Asian wide characters are two. Embedded `\n` is a hard break.

use unicode_width::UnicodeWidthChar;

/// Wrap `text` at `width` visible columns, breaking at whitespace where
/// possible and mid-word where a single word exceeds the width. A width of 0
/// disables wrapping.
pub fn wrap(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut col = 0usize;
    // Byte offset in `out` of the last space we could break at, and the
    // visible columns accumulated after it.
    let mut brk: Option<usize> = None;
    let mut since_brk = 0usize;

    let mut it = text.chars().peekable();
    while let Some(ch) = it.next() {
        if ch == '\x1b' {
            out.push(ch);
            if it.peek() == Some(&'[') {
                // Copy the CSI sequence through to its final byte.
                let mut first = true;
                while let Some(c) = it.next() {
                    out.push(c);
                    if !first && ('\x40'..='\x7e').contains(&c) {
                        break;
                    }
                    first = false;
                }
            }
            continue;
        }
        if ch == '\n' {
            out.push(ch);
            col = 0;
            brk = None;
            since_brk = 0;
            continue;
        }
        if ch == '\r' {
            out.push(ch);
            continue;
        }

        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if col + w > width {
            if ch == ' ' {
                // The overflowing character is itself a space: break here
                // and swallow it.
                out.push_str("\r\n");
                col = 0;
                brk = None;
                since_brk = 0;
                continue;
            }
            if let Some(at) = brk {
                out.replace_range(at..at + 1, "\r\n");
                col = since_brk;
            } else {
                // No whitespace on this line: hard-break mid-word.
                out.push_str("\r\n");
                col = 0;
            }
            brk = None;
            since_brk = 0;
        }
        if ch == ' ' {
            brk = Some(out.len());
            since_brk = 0;
        } else {
            since_brk += w;
        }
        out.push(ch);
        col += w;
    }
    out
}
