//! Helpers for small command-line wrappers around external programs.
//!
//! Each wrapper parses a few options of its own, builds a command line for the
//! program it wraps, tweaks the environment and launches the program in one of
//! the [`subtask`] modes: exec, daemon, background, batch or task. Output can be
//! filtered line by line with regular expressions, and GUI/game launchers can
//! run inside a bubblewrap [`sandbox`].
//!
//! The main entry point is [`Dispatcher`], which runs the bundled wrappers by
//! name. The public modules expose command resolution ([`command`]), the
//! process environment ([`env`]) and the data/config helpers ([`config`],
//! [`file`]) for writing more wrappers.

pub mod command;
pub mod config;
mod dispatch;
pub mod env;
pub mod error;
pub mod external;
pub mod file;
pub mod logging;
pub mod sandbox;
pub mod subtask;
mod wrapper;
mod wrappers;

/// Just a convenient re-export of the wrapper dispatcher.
///
/// See [`Dispatcher`] for the high-level API.
pub use dispatch::{Dispatcher, PROGRAM};
pub use error::{EXIT_INTERRUPTED, WrapError};
pub use wrapper::{Runnable, WrapperFactory, ask, confirm};
