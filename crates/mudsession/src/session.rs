//! The session worker: one task per connection.

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use doorio::{Decoded, LineDecoder};

use crate::mode::{Mode, ModeStack};

const READ_BUF_LEN: usize = 4096;
const WRITE_QUEUE_DEPTH: usize = 128;

/// Random per-connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u128);

impl SessionId {
    pub fn random() -> Self {
        let mut b = [0u8; 16];
        getrandom::getrandom(&mut b).expect("getrandom");
        Self(u128::from_be_bytes(b))
    }

    /// Compact form for logs: XOR of the high and low halves.
    pub fn short(self) -> u64 {
        (self.0 as u64) ^ ((self.0 >> 64) as u64)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.short())
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Visible columns for outgoing word wrap.
    pub wrap_width: usize,
    /// Input line cap; bytes beyond it are dropped until the terminator.
    pub max_line_len: usize,
    /// Answer telnet negotiation with refusals instead of silence.
    pub refuse_negotiation: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wrap_width: doorterm::DEFAULT_WRAP_WIDTH,
            max_line_len: 8 * 1024,
            refuse_negotiation: false,
        }
    }
}

enum StackOp {
    Push(Box<dyn Mode>),
    Pop,
    Clear,
}

/// The session surface a [`Mode`] drives: send output, swap modes, close.
///
/// Stack transitions requested here are applied by the worker after the
/// current hook returns, so a mode never re-enters itself and a push or pop
/// mid-line never re-routes lines already dispatched.
pub struct SessionCtx {
    id: SessionId,
    peer: Option<SocketAddr>,
    wrap_width: usize,
    closed: bool,
    outbox: Vec<Bytes>,
    ops: VecDeque<StackOp>,
}

impl SessionCtx {
    fn new(id: SessionId, peer: SocketAddr, wrap_width: usize) -> Self {
        Self {
            id,
            peer: Some(peer),
            wrap_width,
            closed: false,
            outbox: Vec::new(),
            ops: VecDeque::new(),
        }
    }

    /// A context with no connection behind it, for driving Mode
    /// implementations in tests.
    pub fn detached(wrap_width: usize) -> Self {
        Self {
            id: SessionId::random(),
            peer: None,
            wrap_width,
            closed: false,
            outbox: Vec::new(),
            ops: VecDeque::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Render `markup` and queue it for the client. Fire and forget: after
    /// `close` this does nothing, and a dead peer downgrades to a close
    /// rather than an error.
    pub fn send(&mut self, markup: &str) {
        if self.closed {
            return;
        }
        self.outbox
            .push(Bytes::from(doorterm::render(markup, self.wrap_width)));
    }

    /// Queued rendered output, drained. Exposed so tests can observe what a
    /// detached context would have written.
    pub fn take_output(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.outbox)
    }

    pub fn push_mode(&mut self, mode: Box<dyn Mode>) {
        self.ops.push_back(StackOp::Push(mode));
    }

    pub fn pop_mode(&mut self) {
        self.ops.push_back(StackOp::Pop);
    }

    pub fn clear_modes(&mut self) {
        self.ops.push_back(StackOp::Clear);
    }

    /// Mark the session closed. Idempotent; the worker tears down after the
    /// current dispatch completes.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn next_op(&mut self) -> Option<StackOp> {
        self.ops.pop_front()
    }
}

/// Cloneable cross-task surface for one session: best-effort sends, close
/// requests, teardown sequencing. Everything game logic needs to reach a
/// session it does not own (broadcast, admin kicks).
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    peer: SocketAddr,
    wrap_width: usize,
    write_tx: mpsc::Sender<Bytes>,
    close_tx: Arc<watch::Sender<bool>>,
    done_rx: watch::Receiver<bool>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Render `markup` and queue it without blocking. Returns false when the
    /// session is gone or its write queue is full; a slow consumer loses
    /// output rather than stalling the caller.
    pub fn send(&self, markup: &str) -> bool {
        let bytes = Bytes::from(doorterm::render(markup, self.wrap_width));
        self.write_tx.try_send(bytes).is_ok()
    }

    /// Ask the session to close cleanly. Idempotent.
    pub fn close(&self) {
        let _ = self.close_tx.send(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.done_rx.borrow()
    }

    /// Resolves once the session worker has torn down.
    pub async fn closed(&self) {
        let mut rx = self.done_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Bind a fresh session to an open byte stream.
///
/// Spawns the worker and returns immediately. `initial` becomes the bottom of
/// the mode stack and is activated before the first read.
pub fn attach<S>(
    stream: S,
    peer: SocketAddr,
    initial: Box<dyn Mode>,
    cfg: SessionConfig,
) -> SessionHandle
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = SessionId::random();
    let (write_tx, write_rx) = mpsc::channel::<Bytes>(WRITE_QUEUE_DEPTH);
    let close_tx = Arc::new(watch::channel(false).0);
    let close_rx = close_tx.subscribe();
    let (done_tx, done_rx) = watch::channel(false);

    let handle = SessionHandle {
        id,
        peer,
        wrap_width: cfg.wrap_width,
        write_tx: write_tx.clone(),
        close_tx: Arc::clone(&close_tx),
        done_rx,
    };

    tokio::spawn(async move {
        run_session(
            stream, id, peer, initial, cfg, write_tx, write_rx, close_rx,
        )
        .await;
        // Keep the close channel alive for the session's whole life so
        // `changed()` below never sees a dead sender.
        drop(close_tx);
        let _ = done_tx.send(true);
    });

    handle
}

async fn run_session<S>(
    stream: S,
    id: SessionId,
    peer: SocketAddr,
    initial: Box<dyn Mode>,
    cfg: SessionConfig,
    write_tx: mpsc::Sender<Bytes>,
    mut write_rx: mpsc::Receiver<Bytes>,
    mut close_rx: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut rd, mut wr) = tokio::io::split(stream);

    // Sole writer and the one place the stream is shut down, so a double
    // `close()` cannot close the stream twice.
    let writer = tokio::spawn(async move {
        while let Some(b) = write_rx.recv().await {
            if wr.write_all(&b).await.is_err() {
                break;
            }
        }
        let _ = wr.shutdown().await;
    });

    info!(session = %id, peer = %peer, "session attached");

    let mut stack = ModeStack::new();
    let mut ctx = SessionCtx::new(id, peer, cfg.wrap_width);
    let mut dec = LineDecoder::new()
        .max_line_len(cfg.max_line_len)
        .refuse_negotiation(cfg.refuse_negotiation);

    stack.push(initial, &mut ctx);
    pump(&mut stack, &mut ctx, &write_tx).await;

    let mut buf = [0u8; READ_BUF_LEN];
    let mut hangup = false;
    while !ctx.is_closed() {
        let n = tokio::select! {
            res = rd.read(&mut buf) => match res {
                Ok(n) => n,
                Err(e) => {
                    debug!(session = %id, err = %e, "read failed");
                    0
                }
            },
            res = close_rx.changed() => {
                if res.is_ok() {
                    ctx.close();
                }
                continue;
            }
        };
        if n == 0 {
            hangup = true;
            break;
        }

        let Decoded { lines, echo } = dec.feed(&buf[..n]);
        if !echo.is_empty() && write_tx.send(Bytes::from(echo)).await.is_err() {
            ctx.close();
            break;
        }
        for line in lines {
            if ctx.is_closed() {
                break;
            }
            let text = String::from_utf8_lossy(&line);
            match stack.active() {
                Some(mode) => mode.handle_line(&mut ctx, &text),
                None => debug!(session = %id, "no active mode; input dropped"),
            }
            pump(&mut stack, &mut ctx, &write_tx).await;
        }
    }

    if hangup {
        // The peer vanished on us; a close() initiated teardown skips this.
        info!(session = %id, peer = %peer, "peer hung up");
        if let Some(mode) = stack.active() {
            mode.on_hangup(&mut ctx);
        }
        ctx.close();
    }
    stack.clear(&mut ctx);
    pump(&mut stack, &mut ctx, &write_tx).await;

    drop(write_tx);
    let _ = writer.await;
    info!(session = %id, peer = %peer, "session detached");
}

/// Apply the stack transitions a hook queued, then flush its output. Hooks
/// run here may queue further transitions; the loop drains them all before
/// the next read.
async fn pump(stack: &mut ModeStack, ctx: &mut SessionCtx, write_tx: &mpsc::Sender<Bytes>) {
    while let Some(op) = ctx.next_op() {
        match op {
            StackOp::Push(mode) => stack.push(mode, ctx),
            StackOp::Pop => stack.pop(ctx),
            StackOp::Clear => stack.clear(ctx),
        }
    }
    // Output queued before a close still flushes; sends after it were never
    // queued at all.
    for b in ctx.take_output() {
        if write_tx.send(b).await.is_err() {
            ctx.close();
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn peer() -> SocketAddr {
        "127.0.0.1:4000".parse().expect("addr")
    }

    /// Echoes every line back bracketed, records lifecycle events, and obeys
    /// a couple of magic inputs.
    struct Parrot {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Parrot {
        fn new(log: Arc<Mutex<Vec<String>>>) -> Box<Self> {
            Box::new(Self { log })
        }

        fn note(&self, s: impl Into<String>) {
            self.log.lock().expect("log").push(s.into());
        }
    }

    impl Mode for Parrot {
        fn on_activate(&mut self, _ctx: &mut SessionCtx) {
            self.note("activate");
        }
        fn on_deactivate(&mut self, _ctx: &mut SessionCtx) {
            self.note("deactivate");
        }
        fn handle_line(&mut self, ctx: &mut SessionCtx, line: &str) {
            self.note(format!("line:{line}"));
            if line == "quit" {
                ctx.send("bye");
                ctx.close();
                return;
            }
            ctx.send(&format!("[{line}]"));
        }
        fn on_hangup(&mut self, _ctx: &mut SessionCtx) {
            self.note("hangup");
        }
    }

    #[tokio::test]
    async fn dispatches_lines_and_replies() {
        let (client, server) = tokio::io::duplex(1024);
        let log = Arc::new(Mutex::new(Vec::new()));
        let _h = attach(server, peer(), Parrot::new(log.clone()), SessionConfig::default());

        let (mut crd, mut cwr) = tokio::io::split(client);
        cwr.write_all(b"look\r\n").await.expect("write");

        let mut got = [0u8; 6];
        crd.read_exact(&mut got).await.expect("read");
        assert_eq!(&got, b"[look]");
        assert!(log.lock().expect("log").contains(&"line:look".to_string()));
    }

    #[tokio::test]
    async fn backspace_quirk_erases_and_echoes() {
        let (client, server) = tokio::io::duplex(1024);
        let log = Arc::new(Mutex::new(Vec::new()));
        let _h = attach(server, peer(), Parrot::new(log.clone()), SessionConfig::default());

        let (mut crd, mut cwr) = tokio::io::split(client);
        cwr.write_all(b"ab\x08c\n").await.expect("write");

        // First the erase echo, then the mode's reply for the line "ac".
        let mut got = [0u8; 6];
        crd.read_exact(&mut got).await.expect("read");
        assert_eq!(&got, b" \x08[ac]");
    }

    #[tokio::test]
    async fn clean_close_flushes_farewell_and_skips_hangup() {
        let (client, server) = tokio::io::duplex(1024);
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = attach(server, peer(), Parrot::new(log.clone()), SessionConfig::default());

        let (mut crd, mut cwr) = tokio::io::split(client);
        cwr.write_all(b"quit\r\n").await.expect("write");

        let mut got = Vec::new();
        crd.read_to_end(&mut got).await.expect("read to eof");
        assert_eq!(&got, b"bye");

        h.closed().await;
        let entries = log.lock().expect("log").clone();
        assert!(!entries.contains(&"hangup".to_string()));
        assert_eq!(entries.last(), Some(&"deactivate".to_string()));
    }

    #[tokio::test]
    async fn peer_disconnect_notifies_active_mode_then_clears() {
        let (client, server) = tokio::io::duplex(1024);
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = attach(server, peer(), Parrot::new(log.clone()), SessionConfig::default());

        drop(client);
        h.closed().await;

        let entries = log.lock().expect("log").clone();
        let hangup = entries.iter().position(|e| e == "hangup").expect("hangup");
        let deact = entries
            .iter()
            .position(|e| e == "deactivate")
            .expect("deactivate");
        assert!(hangup < deact, "hangup must precede the teardown clear");
    }

    #[tokio::test]
    async fn handle_close_is_idempotent() {
        let (client, server) = tokio::io::duplex(1024);
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = attach(server, peer(), Parrot::new(log.clone()), SessionConfig::default());

        h.close();
        h.close();
        h.closed().await;
        assert!(h.is_closed());

        // Exactly one stream shutdown: the client side sees a clean EOF.
        let (mut crd, _cwr) = tokio::io::split(client);
        let mut rest = Vec::new();
        crd.read_to_end(&mut rest).await.expect("eof");
        assert!(rest.is_empty());

        let entries = log.lock().expect("log").clone();
        assert!(!entries.contains(&"hangup".to_string()));
    }

    #[tokio::test]
    async fn handle_send_reaches_the_client() {
        let (client, server) = tokio::io::duplex(1024);
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = attach(server, peer(), Parrot::new(log.clone()), SessionConfig::default());

        assert!(h.send("<green>ping</green>"));

        let (mut crd, _cwr) = tokio::io::split(client);
        let expected = doorterm::render("<green>ping</green>", doorterm::DEFAULT_WRAP_WIDTH);
        let mut got = vec![0u8; expected.len()];
        crd.read_exact(&mut got).await.expect("read");
        assert_eq!(got, expected.as_bytes());
    }

    #[tokio::test]
    async fn session_ctx_close_is_sticky() {
        let mut ctx = SessionCtx::detached(80);
        ctx.send("before");
        ctx.close();
        ctx.close();
        ctx.send("after");
        let out = ctx.take_output();
        assert_eq!(out.len(), 1);
        assert_eq!(&out[0][..], b"before");
        assert!(ctx.is_closed());
    }

    #[test]
    fn session_ids_are_distinct() {
        let a = SessionId::random();
        let b = SessionId::random();
        assert_ne!(a, b);
        assert_eq!(format!("{a}").len(), 16);
    }
}
