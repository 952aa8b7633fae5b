//! Document storage for rendered reports using Apache OpenDAL.
//!
//! Supported backends:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3
//! - Local filesystem (development only)
//! - In-process memory (tests only)

mod error;
mod service;

pub use error::StorageError;
pub use service::{DocumentStorage, sanitize_key};
