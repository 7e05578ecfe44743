use serde::{Deserialize, Serialize};

use super::StaffId;

/// 職員
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub staff_id: StaffId,
    pub name: String,
    pub role: String,
}
