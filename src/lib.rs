//! W3LF - Warcraft III launcher for Eurobattle.Net
//!
//! Library crate for the launcher core, shared with the CLI binary.

pub mod paths;

pub mod config;
pub mod error;
pub mod gateways;
pub mod injector;
pub mod launcher;
pub mod logging;
pub mod options;
pub mod registry;
pub mod runtime_wrap;
