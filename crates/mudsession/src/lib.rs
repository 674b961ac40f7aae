//! `mudsession`: the session layer between a byte stream and game logic.
//!
//! One [`attach`] call per accepted connection spawns a worker that frames
//! input lines (via `doorio`), routes each line to the active [`Mode`] on the
//! session's stack, and renders outgoing markup (via `doorterm`). Game logic
//! supplies the Modes; this crate treats them opaquely.
//!
//! Concurrency model: everything for one session happens on its worker task,
//! so Modes are plain synchronous code and need no locks. Cross-task callers
//! hold a [`SessionHandle`].

pub mod mode;
pub mod session;

pub use mode::{Mode, ModeStack};
pub use session::{attach, SessionConfig, SessionCtx, SessionHandle, SessionId};
