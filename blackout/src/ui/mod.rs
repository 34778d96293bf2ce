//! Terminal presentation: themes, status messages and summary tables.

pub mod output_format;
pub mod redaction_summary;
pub mod theme;
