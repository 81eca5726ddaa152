//! imgblob Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the imgblob workspace.
//!
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Content types**: MIME type lookup from file extensions
//!
//! # Example
//!
//! ```
//! use imgblob_common::content_type::mime_type;
//!
//! assert_eq!(mime_type("photos/a.JPG"), "image/jpeg");
//! assert_eq!(mime_type("notes.unknown"), "application/octet-stream");
//! ```

pub mod content_type;
pub mod logging;

pub use content_type::{mime_type, FALLBACK_CONTENT_TYPE};
