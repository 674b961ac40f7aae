//! The code table: tag names and the control codes they emit.
//!
//! Process-wide and read-only; every session renders against the same table.

/// Clears all attributes and colors.
pub const RESET: &str = "\x1b[0m";

/// Line break plus reset, so formatting never bleeds across lines.
pub const NEWLINE: &str = "\r\n\x1b[0m";

/// What a tag styles. Used by the renderer's restoration step: a color being
/// closed suppresses re-emission of still-open colors in the same category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Foreground,
    Background,
    Attribute,
    Control,
}

impl Category {
    pub fn is_color(self) -> bool {
        matches!(self, Category::Foreground | Category::Background)
    }
}

/// Look up a tag name, yielding its control code and category.
pub fn lookup(name: &str) -> Option<(&'static str, Category)> {
    use Category::*;
    Some(match name {
        "reset" => (RESET, Control),
        "bold" => ("\x1b[1m", Attribute),
        "dim" => ("\x1b[2m", Attribute),
        "under" => ("\x1b[4m", Attribute),
        "reverse" => ("\x1b[7m", Attribute),
        "hide" => ("\x1b[8m", Attribute),

        "clearscreen" => ("\x1b[2J", Control),
        "clearline" => ("\x1b[2K", Control),
        "newline" => (NEWLINE, Control),

        "black" => ("\x1b[30m", Foreground),
        "red" => ("\x1b[31m", Foreground),
        "green" => ("\x1b[32m", Foreground),
        "yellow" => ("\x1b[33m", Foreground),
        "blue" => ("\x1b[34m", Foreground),
        "magenta" => ("\x1b[35m", Foreground),
        "cyan" => ("\x1b[36m", Foreground),
        "white" => ("\x1b[37m", Foreground),

        "bblack" => ("\x1b[40m", Background),
        "bred" => ("\x1b[41m", Background),
        "bgreen" => ("\x1b[42m", Background),
        "byellow" => ("\x1b[43m", Background),
        "bblue" => ("\x1b[44m", Background),
        "bmagenta" => ("\x1b[45m", Background),
        "bcyan" => ("\x1b[46m", Background),
        "bwhite" => ("\x1b[47m", Background),

        _ => return None,
    })
}

/// Tags whose close requires restoring the surrounding formatting. Everything
/// else simply resets on close.
pub fn nests(name: &str) -> bool {
    matches!(name, "bold")
}
