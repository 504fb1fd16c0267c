//! Core launch model: mode selection, the launch plan, and its execution

mod launch;
mod mode;
mod plan;
mod redactor;

pub use launch::*;
pub use mode::*;
pub use plan::*;
