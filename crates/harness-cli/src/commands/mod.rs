//! Command implementations.
//!
//! - [`serve`] runs the harness server until a result arrives (with
//!   `--quit`), Ctrl+C is pressed, or startup fails
//! - [`exec`] runs the optional pre-start shell command

pub mod exec;
pub mod serve;

pub use serve::execute as serve_execute;
