use serde::{Deserialize, Serialize};

use super::{BookId, CopyId};

/// コピーの貸出状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyStatus {
    Available,
    Borrowed,
    Maintenance,
    Lost,
}

/// コピーの状態（物理的なコンディション）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyCondition {
    Good,
    Fair,
    Poor,
    Damaged,
    Lost,
}

impl CopyCondition {
    /// 返却時に報告された状態から、コピーの次の貸出状態を決める
    ///
    /// - Damaged → Maintenance
    /// - Lost → Lost
    /// - それ以外 → Available
    pub fn status_after_return(self) -> CopyStatus {
        match self {
            CopyCondition::Damaged => CopyStatus::Maintenance,
            CopyCondition::Lost => CopyStatus::Lost,
            CopyCondition::Good | CopyCondition::Fair | CopyCondition::Poor => {
                CopyStatus::Available
            }
        }
    }
}

/// 物理的な1冊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCopy {
    pub copy_id: CopyId,
    pub status: CopyStatus,
    pub condition: CopyCondition,
}

impl BookCopy {
    pub fn new(copy_id: CopyId) -> Self {
        Self {
            copy_id,
            status: CopyStatus::Available,
            condition: CopyCondition::Good,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == CopyStatus::Available
    }
}

/// 書籍（タイトル）と、その所蔵コピー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub copies: Vec<BookCopy>,
}

impl Book {
    pub fn copy(&self, copy_id: &CopyId) -> Option<&BookCopy> {
        self.copies.iter().find(|c| &c.copy_id == copy_id)
    }

    pub(crate) fn copy_mut(&mut self, copy_id: &CopyId) -> Option<&mut BookCopy> {
        self.copies.iter_mut().find(|c| &c.copy_id == copy_id)
    }

    pub fn has_available_copy(&self) -> bool {
        self.copies.iter().any(BookCopy::is_available)
    }

    pub fn available_copies(&self) -> usize {
        self.copies.iter().filter(|c| c.is_available()).count()
    }
}
