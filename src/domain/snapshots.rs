//! 貸出・予約に埋め込む非正規化スナップショット
//!
//! 作成時点の値を複製したもので、元の会員・書籍・職員が後から変わっても
//! 再計算しない（読み取り専用）。

use serde::{Deserialize, Serialize};

use super::{Book, BookCopy, BookId, CopyCondition, CopyId, Member, MemberId, Staff, StaffId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub member_id: MemberId,
    pub name: String,
}

impl From<&Member> for MemberSnapshot {
    fn from(member: &Member) -> Self {
        Self {
            member_id: member.member_id,
            name: member.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

impl From<&Book> for BookSnapshot {
    fn from(book: &Book) -> Self {
        Self {
            book_id: book.book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
        }
    }
}

/// 貸し出したコピーのスナップショット（書籍情報 + 貸出時の状態）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopySnapshot {
    #[serde(flatten)]
    pub book: BookSnapshot,
    pub copy_id: CopyId,
    pub condition_at_borrow: CopyCondition,
}

impl CopySnapshot {
    pub fn new(book: &Book, copy: &BookCopy) -> Self {
        Self {
            book: BookSnapshot::from(book),
            copy_id: copy.copy_id.clone(),
            condition_at_borrow: copy.condition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSnapshot {
    pub staff_id: StaffId,
    pub name: String,
}

impl From<&Staff> for StaffSnapshot {
    fn from(staff: &Staff) -> Self {
        Self {
            staff_id: staff.staff_id,
            name: staff.name.clone(),
        }
    }
}
