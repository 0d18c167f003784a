//! Reporthive Archive - result-archive extraction and report parsing
//!
//! Everything in here is best-effort from the uploader's point of view: a
//! report tree that cannot be parsed yields zero tallies or a missing
//! duration, never a failed upload. Only extraction itself can reject an
//! upload, and then it cleans up after itself.

pub mod extract;
pub mod junit;

pub use extract::extract_zip;
pub use junit::{parse_html_duration, scan_junit_xml};
