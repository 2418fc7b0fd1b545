//! CLI command implementations

pub mod budget;
pub mod completions;
pub mod derive;
pub mod mc;
pub mod resolve;
pub mod units;
