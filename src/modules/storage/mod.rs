//! Storage module for file management
//!
//! Provider-agnostic object storage: a `StorageProvider` trait, concrete
//! backends (MinIO, AWS S3, in-memory) selected by name through a factory,
//! and the object naming rules shared by every backend.

mod config;
mod error;
mod factory;
mod memory_provider;
mod minio_provider;
pub mod naming;
mod provider;
mod s3_compat;
mod s3_provider;

pub use config::StorageConfig;
pub use error::StorageError;
pub use factory::create_provider;
#[cfg(test)]
pub use memory_provider::MemoryProvider;
pub use naming::FileCategory;
pub use provider::{ObjectReader, ObjectStream, StorageProvider};
