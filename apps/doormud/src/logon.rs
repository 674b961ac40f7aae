//! The logon flow: the first mode on every fresh session.
//!
//! Name or "new", then a password; five bad answers and the connection goes
//! away. Passwords live in an in-memory roster — this is the mechanical text
//! exchange only, not an account system.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mudsession::{Mode, SessionCtx};

use crate::game::Game;
use crate::registry::Registry;

const MAX_ERRORS: u32 = 5;

/// name -> password for everyone who has signed up this run.
#[derive(Clone, Default)]
pub struct Roster {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl Roster {
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn check(&self, name: &str, pass: &str) -> bool {
        self.lock().get(name).is_some_and(|p| p == pass)
    }

    pub fn insert(&self, name: &str, pass: &str) {
        self.lock().insert(name.to_string(), pass.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.inner.lock().expect("roster mutex poisoned")
    }
}

enum State {
    AskName,
    AskNewName,
    AskNewPass { name: String },
    AskPass { name: String },
}

pub struct Logon {
    registry: Registry,
    roster: Roster,
    state: State,
    errors: u32,
}

impl Logon {
    pub fn new(registry: Registry, roster: Roster) -> Self {
        Self {
            registry,
            roster,
            state: State::AskName,
            errors: 0,
        }
    }

    fn reject(&mut self, ctx: &mut SessionCtx, msg: &str) {
        self.errors += 1;
        if self.errors >= MAX_ERRORS {
            ctx.send(
                "<red><bold>Too many incorrect responses, closing connection...</bold></red>\n",
            );
            ctx.close();
            return;
        }
        ctx.send(msg);
    }

    fn enter_realm(&mut self, ctx: &mut SessionCtx, name: String) {
        ctx.send("<green>Thank you! You are now entering the realm...</green>\n");
        self.registry.set_name(ctx.id(), &name);
        ctx.push_mode(Box::new(Game::new(self.registry.clone(), name)));
    }
}

impl Mode for Logon {
    fn on_activate(&mut self, ctx: &mut SessionCtx) {
        ctx.send(
            "<bold><red>Welcome to DoorMUD</red></bold>\n\
             <white>Please enter your name, or \"new\" if you are new: </white>",
        );
    }

    fn handle_line(&mut self, ctx: &mut SessionCtx, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match &self.state {
            State::AskName => {
                if line.eq_ignore_ascii_case("new") {
                    self.state = State::AskNewName;
                    ctx.send("<yellow>Please enter your desired name: </yellow>");
                } else if self.roster.contains(line) {
                    let name = line.to_string();
                    ctx.send(&format!(
                        "<green><bold>Welcome, <white>{name}</white>\n\
                         Please enter your password: </bold></green>"
                    ));
                    self.state = State::AskPass { name };
                } else {
                    self.reject(
                        ctx,
                        &format!(
                            "<red><bold>Sorry, the user '<white>{line}</white>' does not exist\n\
                             Please enter your name, or \"new\" if you are new: </bold></red>"
                        ),
                    );
                }
            }
            State::AskNewName => {
                if self.roster.contains(line) {
                    self.reject(
                        ctx,
                        &format!(
                            "<red><bold>Sorry, the name '<white>{line}</white>' has already been taken.\n\
                             <yellow>Please enter your desired name: </yellow></bold></red>"
                        ),
                    );
                } else if !acceptable_name(line) {
                    self.reject(
                        ctx,
                        &format!(
                            "<red><bold>Sorry, the name '<white>{line}</white>' is unacceptable.\n\
                             <yellow>Please enter your desired name: </yellow></bold></red>"
                        ),
                    );
                } else {
                    self.state = State::AskNewPass {
                        name: line.to_string(),
                    };
                    ctx.send("<green>Please enter your desired password: </green>");
                }
            }
            State::AskNewPass { name } => {
                if !acceptable_password(line) {
                    self.reject(
                        ctx,
                        "<bold><red>INVALID PASSWORD!</red>\n\
                         <green>Please enter your desired password: </green></bold>",
                    );
                } else {
                    let name = name.clone();
                    self.roster.insert(&name, line);
                    self.enter_realm(ctx, name);
                }
            }
            State::AskPass { name } => {
                if self.roster.check(name, line) {
                    let name = name.clone();
                    self.enter_realm(ctx, name);
                } else {
                    self.reject(
                        ctx,
                        "<bold><red>INVALID PASSWORD!</red>\n\
                         <green>Please enter your password: </green></bold>",
                    );
                }
            }
        }
    }
}

/// 3 to 16 ASCII alphanumerics, starting with a letter.
fn acceptable_name(name: &str) -> bool {
    (3..=16).contains(&name.len())
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// 4 to 32 characters, no whitespace.
fn acceptable_password(pass: &str) -> bool {
    (4..=32).contains(&pass.chars().count()) && !pass.chars().any(char::is_whitespace)
}
