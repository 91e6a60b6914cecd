//! Script runner for the emulated Digital Test Board.
//!
//! Scripts drive a [`dtb_emulator::Testboard`] one command per line and
//! assert on queue sizes and decoded event counts.

use tracing_subscriber as _;

/// Structured script error types.
pub mod errors;
/// Line parser for the script language.
pub mod parser;
/// Script execution against a testboard.
pub mod runner;
