// blackout/src/lib.rs
//! # Blackout CLI
//!
//! Terminal front end for `blackout-core`: redact PDFs and plain text, scan
//! PDFs without changing them, and list the active detectors.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
