use crate::domain::{BookId, Borrowing, BorrowingId, BorrowingStatus, CopyId, MemberId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use super::Result;
use super::pagination::{Page, PageRequest, SortField};

/// 貸出一覧の絞り込み条件
///
/// 指定された条件はすべてANDで評価する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorrowingFilter {
    pub member_id: Option<MemberId>,
    pub book_id: Option<BookId>,
    pub copy_id: Option<CopyId>,
    pub status: Option<BorrowingStatus>,
    /// 返却期限がこの日時より前のもの（延滞候補の抽出用）
    pub due_before: Option<DateTime<Utc>>,
}

impl BorrowingFilter {
    pub fn matches(&self, borrowing: &Borrowing) -> bool {
        self.member_id
            .is_none_or(|id| borrowing.member.member_id == id)
            && self
                .book_id
                .is_none_or(|id| borrowing.copy.book.book_id == id)
            && self
                .copy_id
                .as_ref()
                .is_none_or(|id| &borrowing.copy.copy_id == id)
            && self.status.is_none_or(|s| borrowing.status == s)
            && self.due_before.is_none_or(|t| borrowing.due_date < t)
    }
}

/// 貸出一覧のソートフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowingSortField {
    BorrowDate,
    DueDate,
    ReturnDate,
    Status,
    BorrowingId,
}

impl SortField for BorrowingSortField {
    const DEFAULT: Self = BorrowingSortField::BorrowDate;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "borrow_date" => Some(Self::BorrowDate),
            "due_date" => Some(Self::DueDate),
            "return_date" => Some(Self::ReturnDate),
            "status" => Some(Self::Status),
            "borrowing_id" => Some(Self::BorrowingId),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::BorrowDate => "borrow_date",
            Self::DueDate => "due_date",
            Self::ReturnDate => "return_date",
            Self::Status => "status",
            Self::BorrowingId => "borrowing_id",
        }
    }
}

impl BorrowingSortField {
    /// 昇順の比較
    ///
    /// 同じ値のものは貸出IDの連番順に並べる。ソート方向は連番にも適用される。
    pub fn compare(&self, a: &Borrowing, b: &Borrowing) -> Ordering {
        let primary = match self {
            Self::BorrowDate => a.borrow_date.cmp(&b.borrow_date),
            Self::DueDate => a.due_date.cmp(&b.due_date),
            Self::ReturnDate => a.return_date.cmp(&b.return_date),
            Self::Status => a.status.as_str().cmp(b.status.as_str()),
            Self::BorrowingId => Ordering::Equal,
        };
        primary.then_with(|| a.borrowing_id.cmp(&b.borrowing_id))
    }
}

/// 貸出リポジトリポート
#[async_trait]
pub trait BorrowingRepository: Send + Sync {
    /// IDで貸出を取得する
    async fn find_by_id(&self, borrowing_id: &BorrowingId) -> Result<Option<Borrowing>>;

    /// 最後に採番された貸出ID
    ///
    /// 次の連番IDの生成に使用する。
    async fn last_id(&self) -> Result<Option<BorrowingId>>;

    /// 条件に合う貸出をソート・ページングして取得する
    async fn find_page(
        &self,
        filter: &BorrowingFilter,
        request: &PageRequest<BorrowingSortField>,
    ) -> Result<Page<Borrowing>>;
}
