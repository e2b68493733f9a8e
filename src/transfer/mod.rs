//! Transfer module for the media server
//!
//! Serves media files over HTTP with byte-range support, streaming the body
//! incrementally from disk.

pub mod file_ops;
pub mod modes;
pub mod range;
pub mod results;

pub use file_ops::RangeStreamer;
pub use modes::{MediaKind, MimePolicy};
pub use range::{RangeSpec, parse_range_header};
pub use results::StreamResponse;
