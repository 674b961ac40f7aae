//! Modes and the per-session mode stack.

use crate::session::SessionCtx;

/// A pluggable interpreter for a session's input lines.
///
/// Exactly one Mode is active per session: the top of the stack. Game logic
/// implements this trait for its behaviors (a login flow, the main loop, a
/// stat editor) and swaps them via [`SessionCtx::push_mode`] and friends; the
/// session layer never looks inside.
///
/// Lifecycle hooks default to doing nothing, mirroring behaviors that only
/// care about input.
pub trait Mode: Send {
    /// The mode became the active top — freshly pushed, or uncovered again
    /// by a pop.
    fn on_activate(&mut self, _ctx: &mut SessionCtx) {}

    /// The mode stopped being the active top — covered by a push, popped,
    /// or cleared.
    fn on_deactivate(&mut self, _ctx: &mut SessionCtx) {}

    /// One decoded input line, trailing CR/LF already stripped. No trimming
    /// or case-folding has been applied; that is this mode's business.
    fn handle_line(&mut self, ctx: &mut SessionCtx, line: &str);

    /// The peer vanished without a clean close. Only the active mode is
    /// notified, before the stack is cleared.
    fn on_hangup(&mut self, _ctx: &mut SessionCtx) {}
}

/// LIFO stack of Modes; only the top receives input.
#[derive(Default)]
pub struct ModeStack {
    modes: Vec<Box<dyn Mode>>,
}

impl ModeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deactivate the current top (if any), then push and activate `mode`.
    /// The outgoing mode finishes its cleanup before the incoming one runs.
    pub fn push(&mut self, mode: Box<dyn Mode>, ctx: &mut SessionCtx) {
        if let Some(top) = self.modes.last_mut() {
            top.on_deactivate(ctx);
        }
        self.modes.push(mode);
        if let Some(top) = self.modes.last_mut() {
            top.on_activate(ctx);
        }
    }

    /// Deactivate and remove the top; the uncovered mode, if any, is told it
    /// is active again so it can e.g. redraw its prompt.
    ///
    /// # Panics
    ///
    /// Popping an empty stack is a bug in the calling game logic and panics.
    pub fn pop(&mut self, ctx: &mut SessionCtx) {
        let mut top = self.modes.pop().expect("pop on empty mode stack");
        top.on_deactivate(ctx);
        if let Some(next) = self.modes.last_mut() {
            next.on_activate(ctx);
        }
    }

    /// Deactivate the top and discard the whole stack without reactivating
    /// anything beneath it. Used at teardown.
    pub fn clear(&mut self, ctx: &mut SessionCtx) {
        if let Some(top) = self.modes.last_mut() {
            top.on_deactivate(ctx);
        }
        self.modes.clear();
    }

    pub fn active(&mut self) -> Option<&mut (dyn Mode + '_)> {
        match self.modes.last_mut() {
            Some(m) => Some(&mut **m),
            None => None,
        }
    }

    pub fn depth(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}
