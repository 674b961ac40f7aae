//! Telnet IAC stripping.
//!
//! Removes `IAC <verb> <opt>` negotiations, `IAC SB ... IAC SE` blocks and
//! 2-byte IAC commands from the inbound stream, decoding the escaped
//! `IAC IAC` pair to a literal 0xff. With refusal enabled it answers
//! `IAC DO <opt>` with `IAC WONT <opt>` and `IAC WILL <opt>` with
//! `IAC DONT <opt>`; by default it answers nothing.

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    Text,
    /// Just saw an IAC byte.
    Command,
    /// Inside a 3-byte negotiation; holds the verb (DO/DONT/WILL/WONT).
    Option(u8),
    /// Inside a subnegotiation block, waiting for IAC SE.
    Subneg,
    /// Saw IAC inside a subnegotiation block.
    SubnegIac,
}

#[derive(Debug, Default)]
pub struct IacFilter {
    state: State,
    refuse: bool,
}

impl IacFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer DO/WILL with refusals instead of staying silent.
    pub fn refuse_negotiation(mut self, on: bool) -> Self {
        self.refuse = on;
        self
    }

    /// Strip IAC sequences from `chunk`, returning the remaining stream
    /// data. Refusal replies, if any, are appended to `replies`.
    ///
    /// Sequences split across chunks are handled; state carries over.
    pub fn strip(&mut self, chunk: &[u8], replies: &mut Vec<u8>) -> Vec<u8> {
        let mut data = Vec::with_capacity(chunk.len());
        for &b in chunk {
            self.state = match self.state {
                State::Text => {
                    if b == IAC {
                        State::Command
                    } else {
                        data.push(b);
                        State::Text
                    }
                }
                State::Command => match b {
                    // IAC IAC is an escaped literal 0xff.
                    IAC => {
                        data.push(IAC);
                        State::Text
                    }
                    DO | DONT | WILL | WONT => State::Option(b),
                    SB => State::Subneg,
                    // NOP, GA and the rest of the 2-byte commands.
                    _ => State::Text,
                },
                State::Option(verb) => {
                    if self.refuse {
                        match verb {
                            DO => replies.extend_from_slice(&[IAC, WONT, b]),
                            WILL => replies.extend_from_slice(&[IAC, DONT, b]),
                            _ => {}
                        }
                    }
                    State::Text
                }
                State::Subneg => {
                    if b == IAC {
                        State::SubnegIac
                    } else {
                        State::Subneg
                    }
                }
                State::SubnegIac => {
                    if b == SE {
                        State::Text
                    } else {
                        // IAC IAC inside SB is an escaped byte; either way the
                        // block payload is discarded.
                        State::Subneg
                    }
                }
            };
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(f: &mut IacFilter, chunk: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut replies = Vec::new();
        let data = f.strip(chunk, &mut replies);
        (data, replies)
    }

    #[test]
    fn passes_plain_text() {
        let mut f = IacFilter::new();
        let (d, r) = strip(&mut f, b"look north\r\n");
        assert_eq!(d, b"look north\r\n");
        assert!(r.is_empty());
    }

    #[test]
    fn decodes_escaped_iac() {
        let mut f = IacFilter::new();
        let (d, r) = strip(&mut f, &[255, 255, b'q']);
        assert_eq!(d, vec![255, b'q']);
        assert!(r.is_empty());
    }

    #[test]
    fn strips_negotiation_silently_by_default() {
        let mut f = IacFilter::new();
        let (d, r) = strip(&mut f, &[255, 253, 1, b'x', 255, 251, 3]);
        assert_eq!(d, vec![b'x']);
        assert!(r.is_empty());
    }

    #[test]
    fn refuses_do_and_will_when_enabled() {
        let mut f = IacFilter::new().refuse_negotiation(true);
        let (d, r) = strip(&mut f, &[255, 253, 1, 255, 251, 3, b'x']);
        assert_eq!(d, vec![b'x']);
        assert_eq!(r, vec![255, 252, 1, 255, 254, 3]);
    }

    #[test]
    fn carries_state_across_chunks() {
        let mut f = IacFilter::new().refuse_negotiation(true);
        let (d1, r1) = strip(&mut f, &[255, 253]);
        assert!(d1.is_empty());
        assert!(r1.is_empty());

        let (d2, r2) = strip(&mut f, &[7, b'z']);
        assert_eq!(d2, vec![b'z']);
        assert_eq!(r2, vec![255, 252, 7]);
    }

    #[test]
    fn discards_subnegotiation_blocks() {
        let mut f = IacFilter::new();
        let (d, r) = strip(&mut f, &[b'a', 255, 250, 24, b'v', b't', 255, 240, b'b']);
        assert_eq!(d, vec![b'a', b'b']);
        assert!(r.is_empty());
    }

    #[test]
    fn ignores_two_byte_commands() {
        let mut f = IacFilter::new();
        // IAC NOP (241), IAC GA (249)
        let (d, r) = strip(&mut f, &[255, 241, b'h', 255, 249, b'i']);
        assert_eq!(d, vec![b'h', b'i']);
        assert!(r.is_empty());
    }
}
