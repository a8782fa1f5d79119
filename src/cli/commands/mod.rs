//! CLI command implementations

pub mod completions;
pub mod config;
pub mod inspect;
pub mod resolve;

pub use completions::execute as completions;
pub use config::execute as config;
pub use inspect::execute as inspect;
pub use resolve::execute as resolve;
