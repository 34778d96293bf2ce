//! Detector compilation.
//!
//! Turns the serialisable [`crate::config::DetectorConfig`] into the
//! immutable [`compiler::PatternRegistry`] that every scan borrows.

pub mod compiler;
