//! Reporthive Core - Shared types, configuration, and error handling

pub mod branch;
pub mod config;
pub mod error;
pub mod meta;
pub mod tally;

pub use branch::{decode_branch, encode_branch};
pub use config::{JobConfig, JobFlavor, ServiceConfig};
pub use error::{Error, Result};
pub use meta::{parse_upload_meta, UploadMeta};
pub use tally::TestTally;
