pub mod cache;
pub mod cmd;
pub mod config;
pub mod dispatch;
mod error;
pub mod install;
pub mod paths;
pub mod probe;
pub mod prompt;
pub mod recipes;
pub mod runner;
pub mod shell;
pub mod toolkit;
pub mod tools;
pub mod workspace;

pub use error::{Result, ToolkitError};
