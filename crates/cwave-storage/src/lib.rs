//! S3-compatible object store client.
//!
//! This crate provides:
//! - Byte and file upload/download against named buckets
//! - Existence checks and bucket bootstrap for local emulation
//! - Endpoint override so the same client talks to LocalStack or MinIO

pub mod client;
pub mod error;

pub use client::{ObjectStoreClient, ObjectStoreConfig};
pub use error::{StorageError, StorageResult};
