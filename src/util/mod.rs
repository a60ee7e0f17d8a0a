//! Utility functions for common operations.
//!
//! - **Filesystem**: atomic temp-file-then-rename writes and mtime stamping
//! - **URL validation**: scheme checks for configured feed sources

mod fs;
mod url_validator;

pub use fs::{atomic_write, modified_time, set_modified_time};
pub use url_validator::{validate_url, UrlValidationError};
