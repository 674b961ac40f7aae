use bytes::Bytes;
use memchr::memmem;

use crate::quirk::{self, QuirkAction};
use crate::telnet::IacFilter;

const DEFAULT_MAX_LINE_LEN: usize = 8 * 1024;

/// Incremental line decoder for one client connection.
///
/// Feed it raw socket chunks; it applies the quirk rules and IAC stripping,
/// accumulates a partial line, and hands back every completed line with the
/// trailing `\r\n` removed. Bytes past `max_line_len` are dropped silently
/// until the terminator shows up.
#[derive(Debug)]
pub struct LineDecoder {
    iac: IacFilter,
    buf: Vec<u8>,
    max_line_len: usize,
}

/// The result of feeding one chunk: completed lines plus any bytes owed back
/// to the client (erase echoes, negotiation refusals).
#[derive(Debug, Default)]
pub struct Decoded {
    pub lines: Vec<Bytes>,
    pub echo: Vec<u8>,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            iac: IacFilter::new(),
            buf: Vec::with_capacity(256),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    pub fn max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max.max(1);
        self
    }

    pub fn refuse_negotiation(mut self, on: bool) -> Self {
        self.iac = IacFilter::new().refuse_negotiation(on);
        self
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Decoded {
        let mut out = Decoded::default();

        for rule in quirk::CLIENT_QUIRKS {
            if rule.action == QuirkAction::DiscardChunk
                && memmem::find(chunk, rule.pattern).is_some()
            {
                return out;
            }
        }

        let data = self.iac.strip(chunk, &mut out.echo);
        for &b in &data {
            if erases(b) {
                if self.buf.is_empty() {
                    out.echo.push(b' ');
                } else {
                    self.pop_last_char();
                    out.echo.extend_from_slice(quirk::ERASE_COLUMN);
                }
                continue;
            }
            if b == b'\n' {
                out.lines.push(self.take_line());
                continue;
            }
            if self.buf.len() < self.max_line_len {
                self.buf.push(b);
            }
        }
        out
    }

    /// Take the buffered line, minus one trailing `\r`.
    fn take_line(&mut self) -> Bytes {
        let mut line = std::mem::take(&mut self.buf);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Bytes::from(line)
    }

    /// Drop the last buffered character, continuation bytes included.
    fn pop_last_char(&mut self) {
        while let Some(b) = self.buf.pop() {
            // Stop once a non-continuation byte has been removed.
            if b < 0x80 || b >= 0xc0 {
                break;
            }
        }
    }
}

/// Does byte `b` match an erase rule?
fn erases(b: u8) -> bool {
    quirk::CLIENT_QUIRKS
        .iter()
        .any(|r| r.action == QuirkAction::EraseBuffered && r.pattern == [b].as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_crlf_and_lf_lines() {
        let mut d = LineDecoder::new();
        let out = d.feed(b"hello\r\nworld\n");
        assert_eq!(out.lines.len(), 2);
        assert_eq!(&out.lines[0][..], b"hello");
        assert_eq!(&out.lines[1][..], b"world");
        assert!(out.echo.is_empty());
    }

    #[test]
    fn keeps_partial_lines_across_feeds() {
        let mut d = LineDecoder::new();
        assert!(d.feed(b"hel").lines.is_empty());
        let out = d.feed(b"lo\r\n");
        assert_eq!(out.lines.len(), 1);
        assert_eq!(&out.lines[0][..], b"hello");
    }

    #[test]
    fn delivers_empty_lines() {
        let mut d = LineDecoder::new();
        let out = d.feed(b"\r\n");
        assert_eq!(out.lines.len(), 1);
        assert!(out.lines[0].is_empty());
    }

    #[test]
    fn backspace_erases_and_echoes_once() {
        let mut d = LineDecoder::new();
        let out = d.feed(b"ab\x08c\n");
        assert_eq!(out.lines.len(), 1);
        assert_eq!(&out.lines[0][..], b"ac");
        assert_eq!(out.echo, b" \x08");
    }

    #[test]
    fn backspace_on_empty_buffer_echoes_space() {
        let mut d = LineDecoder::new();
        let out = d.feed(b"\x08hi\n");
        assert_eq!(out.echo, b" ");
        assert_eq!(&out.lines[0][..], b"hi");
    }

    #[test]
    fn backspace_erases_whole_utf8_char() {
        let mut d = LineDecoder::new();
        let out = d.feed("caf\u{e9}\x08e\n".as_bytes());
        assert_eq!(&out.lines[0][..], b"cafe");
        assert_eq!(out.echo, b" \x08");
    }

    #[test]
    fn discards_chunks_with_negotiation_noise() {
        let mut d = LineDecoder::new();
        let mut chunk = b"ignored".to_vec();
        chunk.extend_from_slice(&[0xff, 0xfb, 0x1f]);
        let out = d.feed(&chunk);
        assert!(out.lines.is_empty());
        assert!(out.echo.is_empty());

        // The buffer is untouched; later input still frames normally.
        let out = d.feed(b"ok\r\n");
        assert_eq!(&out.lines[0][..], b"ok");
    }

    #[test]
    fn strips_other_negotiation_inline() {
        let mut d = LineDecoder::new();
        let out = d.feed(&[255, 253, 1, b'h', b'i', b'\r', b'\n']);
        assert_eq!(&out.lines[0][..], b"hi");
    }

    #[test]
    fn forwards_refusal_replies_as_echo() {
        let mut d = LineDecoder::new().refuse_negotiation(true);
        let out = d.feed(&[255, 253, 1]);
        assert_eq!(out.echo, vec![255, 252, 1]);
    }

    #[test]
    fn caps_overlong_lines_silently() {
        let mut d = LineDecoder::new().max_line_len(4);
        let out = d.feed(b"abcdefgh\r\n");
        assert_eq!(out.lines.len(), 1);
        assert_eq!(&out.lines[0][..], b"abcd");

        // The cap applies per line, not per connection.
        let out = d.feed(b"xy\r\n");
        assert_eq!(&out.lines[0][..], b"xy");
    }
}
