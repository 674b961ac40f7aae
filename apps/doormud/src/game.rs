//! The realm loop: chat, who, training, quitting.

use mudsession::{Mode, SessionCtx};

use crate::registry::Registry;
use crate::train::Train;

pub struct Game {
    registry: Registry,
    name: String,
    announced: bool,
}

impl Game {
    pub fn new(registry: Registry, name: String) -> Self {
        Self {
            registry,
            name,
            announced: false,
        }
    }

    fn prompt(&self, ctx: &mut SessionCtx) {
        ctx.send("<white>> </white>");
    }
}

impl Mode for Game {
    fn on_activate(&mut self, ctx: &mut SessionCtx) {
        if !self.announced {
            self.announced = true;
            self.registry.broadcast(&format!(
                "<bold><green>{} has entered the realm.</green></bold>\n",
                self.name
            ));
            ctx.send("<white>Type \"help\" for a list of commands.</white>\n");
        } else {
            // Re-entry: a sub-mode above us popped.
            ctx.send("<green>You are back in the realm.</green>\n");
        }
        self.prompt(ctx);
    }

    fn handle_line(&mut self, ctx: &mut SessionCtx, line: &str) {
        let mut words = line.split_whitespace();
        let first = words.next().unwrap_or("");
        let rest = words.collect::<Vec<_>>().join(" ");

        match first {
            "" => {}
            "chat" | ":" => {
                if rest.is_empty() {
                    ctx.send("<red><bold>Chat what?</bold></red>\n");
                } else {
                    self.registry.broadcast(&format!(
                        "<white><bold>{} chats: {rest}</bold></white>\n",
                        self.name
                    ));
                }
            }
            "who" => {
                let mut out = String::from("<bold><cyan>Players online:</cyan></bold>\n");
                for name in self.registry.who() {
                    out.push_str(&format!(" - {name}\n"));
                }
                ctx.send(&out);
            }
            "help" => {
                ctx.send(
                    "<bold><cyan>Commands:</cyan></bold>\n\
                     <white> chat <mesg>  - sends a message to everyone in the realm\n\
                     \x20who          - lists everyone in the realm\n\
                     \x20train        - spend stat points\n\
                     \x20quit         - leave the realm</white>\n",
                );
            }
            "train" => {
                self.registry.broadcast(&format!(
                    "<red><bold>{} leaves to edit stats</bold></red>\n",
                    self.name
                ));
                ctx.push_mode(Box::new(Train::new(self.registry.clone(), self.name.clone())));
                return;
            }
            "quit" => {
                self.registry.broadcast(&format!(
                    "<red><bold>{} has left the realm.</bold></red>\n",
                    self.name
                ));
                ctx.close();
                return;
            }
            _ => {
                ctx.send("<red><bold>Huh? Type \"help\" for a list of commands.</bold></red>\n");
            }
        }
        self.prompt(ctx);
    }

    fn on_hangup(&mut self, _ctx: &mut SessionCtx) {
        self.registry.broadcast(&format!(
            "<red><bold>{} has suddenly disappeared from the realm.</bold></red>\n",
            self.name
        ));
    }
}
