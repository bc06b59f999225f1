pub mod commands;
pub mod config;
pub mod toolkit;

pub use commands::Cli;
pub use commands::Command;
pub use commands::Outcome;
pub use toolkit::Toolkit;
