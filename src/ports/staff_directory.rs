use crate::domain::{Staff, StaffId};
use async_trait::async_trait;

use super::Result;

/// Staff directory port.
///
/// Staff records are read-only for circulation; they are only snapshotted
/// into borrowings.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn find_by_id(&self, staff_id: StaffId) -> Result<Option<Staff>>;
}
