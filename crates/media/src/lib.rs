//! Media storage: persist inbound payloads, hand back a stable reference.

pub mod error;
pub mod mime;
pub mod store;

pub use {
    error::{Error, Result},
    mime::{derive_file_name, media_type, sanitize_file_name},
    store::{FileMediaStore, MediaStore, MemoryMediaStore},
};
