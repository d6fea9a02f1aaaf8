//! Multiplexed, color-coded container logs

pub mod multiplexer;
pub mod palette;

pub use multiplexer::{drain, log_channel, LogMultiplexer};
pub use palette::{ColorCode, ColorPicker};
