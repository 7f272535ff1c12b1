//! Helpers shared by the engine, plugins and config layers

pub mod duration;
pub mod patterns;

pub use duration::{format_duration, parse_duration};
pub use patterns::{FileFilter, PatternError};
