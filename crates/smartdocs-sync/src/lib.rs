//! Keeps a client-side view of an object-store container in step with the
//! remote listing while uploads land in it.

pub mod engine;
pub mod error;
pub mod reconcile;

pub use engine::{Engine, EngineOptions, UploadReceipt};
pub use error::EngineError;
pub use reconcile::SnapshotDiff;
