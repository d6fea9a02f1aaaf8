//! Round-robin color allocation for log streams

use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::Command;
use std::sync::{Mutex, PoisonError};

/// Colors handed out to log streams, in order
pub const PALETTE: [Color; 6] = [
    Color::DarkCyan,
    Color::DarkYellow,
    Color::DarkGreen,
    Color::DarkMagenta,
    Color::DarkBlue,
    Color::DarkRed,
];

/// Terminal escape sequence selecting a color
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorCode(String);

impl ColorCode {
    fn from_command(command: impl Command) -> Self {
        let mut code = String::new();
        // Writing into a String cannot fail.
        let _ = command.write_ansi(&mut code);
        Self(code)
    }

    /// Escape sequence for a foreground color
    pub fn foreground(color: Color) -> Self {
        Self::from_command(SetForegroundColor(color))
    }

    /// Escape sequence restoring the default colors
    pub fn reset() -> Self {
        Self::from_command(ResetColor)
    }
}

impl std::fmt::Display for ColorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out palette colors round-robin
///
/// Shared by every log forwarding task of one command invocation. The lock is
/// only held to read and advance the cursor.
#[derive(Debug)]
pub struct ColorPicker {
    colors: Vec<ColorCode>,
    cursor: Mutex<usize>,
}

impl Default for ColorPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorPicker {
    /// Create a picker over [`PALETTE`]
    pub fn new() -> Self {
        Self {
            colors: PALETTE.iter().map(|c| ColorCode::foreground(*c)).collect(),
            cursor: Mutex::new(0),
        }
    }

    /// Take the next color, wrapping around the palette
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> ColorCode {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let color = self.colors[*cursor % self.colors.len()].clone();
        *cursor += 1;
        color
    }

    /// Escape sequence ending a colored span
    pub fn reset(&self) -> ColorCode {
        ColorCode::reset()
    }
}
