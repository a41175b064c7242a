//! Collaborator contracts for the backup system.
//!
//! The core never talks to real services directly; it consumes the traits
//! defined here. Production implementations wrap the respective service
//! SDKs behind the shared [`RetryPolicy`]; this crate additionally ships a
//! filesystem-backed object store for local runs and in-memory doubles for
//! tests.

pub mod error;
pub mod fs;
pub mod memory;
pub mod retry;
pub mod traits;

pub use error::{ServiceError, ServiceResult};
pub use fs::FsObjectStore;
pub use retry::RetryPolicy;
pub use traits::*;
