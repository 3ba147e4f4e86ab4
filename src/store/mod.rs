//! Student data access.
//!
//! `StudentProvider` is the read seam the grade calculator depends on;
//! `StudentStore` is the file-backed implementation used by the CLI.

pub mod error;
pub mod memory;

use crate::models::StudentRecord;
use async_trait::async_trait;
use uuid::Uuid;

pub use error::StoreError;
pub use memory::StudentStore;

/// Source of students with their exam results eagerly loaded.
#[async_trait]
pub trait StudentProvider: Send + Sync {
    /// Fetch a student, each result paired with its exam. `None` if unknown.
    async fn fetch_student_with_results(&self, student_id: Uuid) -> Option<StudentRecord>;
}
