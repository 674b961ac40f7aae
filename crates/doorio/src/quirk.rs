//! Client-dialect quirks.
//!
//! Some terminal clients volunteer negotiation bytes at connect, others ship
//! every backspace to the server instead of erasing locally. Each known quirk
//! is one `(pattern, action)` rule here; [`crate::decode::LineDecoder`]
//! evaluates the list per incoming chunk, in order.

/// Backspace as transmitted by clients that leave erasing to the server.
pub const BACKSPACE: u8 = 0x08;

/// Overwrites the just-erased column on the client's screen.
pub const ERASE_COLUMN: &[u8] = b" \x08";

/// `IAC WILL 0x1f`, sent spontaneously by some clients right after connect.
pub const NEGOTIATION_NOISE: &[u8] = &[0xff, 0xfb, 0x1f];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuirkAction {
    /// Drop the whole chunk the pattern appears in.
    DiscardChunk,
    /// Erase the last buffered character and echo [`ERASE_COLUMN`]; on an
    /// empty buffer echo a single space to keep the client cursor aligned.
    EraseBuffered,
}

#[derive(Debug)]
pub struct QuirkRule {
    pub pattern: &'static [u8],
    pub action: QuirkAction,
}

pub const CLIENT_QUIRKS: &[QuirkRule] = &[
    QuirkRule {
        pattern: NEGOTIATION_NOISE,
        action: QuirkAction::DiscardChunk,
    },
    QuirkRule {
        pattern: &[BACKSPACE],
        action: QuirkAction::EraseBuffered,
    },
];
