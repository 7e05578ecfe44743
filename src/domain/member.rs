use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BorrowError, BorrowingId, CopyId, MemberId, Money, ReservationError};

/// 会員1人あたりの同時貸出冊数の上限
pub const MAX_CURRENT_BORROWINGS: usize = 5;

/// 会員ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    Suspended,
    Inactive,
}

/// 会員が現在借りている資料（貸出記録への参照）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentBorrowing {
    pub borrowing_id: BorrowingId,
    pub book_id: BookId,
    pub copy_id: CopyId,
    pub title: String,
    pub due_date: DateTime<Utc>,
}

/// 延滞金の累計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineTotals {
    /// これまでに課された延滞金の合計
    pub total: Money,
    /// 未払い残高
    pub unpaid: Money,
}

/// 貸出履歴の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowingStats {
    pub total_borrowings: u32,
    pub overdue_returns: u32,
}

/// 会員
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub name: String,
    pub status: MemberStatus,
    pub card_expiry_date: DateTime<Utc>,
    pub fines: FineTotals,
    pub current_borrowings: Vec<CurrentBorrowing>,
    pub stats: BorrowingStats,
}

impl Member {
    /// 新規会員（有効・借用なし）
    pub fn new(member_id: MemberId, name: impl Into<String>, card_expiry_date: DateTime<Utc>) -> Self {
        Self {
            member_id,
            name: name.into(),
            status: MemberStatus::Active,
            card_expiry_date,
            fines: FineTotals::default(),
            current_borrowings: Vec::new(),
            stats: BorrowingStats::default(),
        }
    }

    pub fn is_card_expired(&self, now: DateTime<Utc>) -> bool {
        self.card_expiry_date < now
    }

    /// 貸出可能か確認する
    ///
    /// ビジネスルール：
    /// - 会員が有効であること
    /// - 会員証が期限切れでないこと
    /// - 未払いの延滞金がないこと
    /// - 現在の貸出が上限未満であること
    pub fn ensure_can_borrow(&self, now: DateTime<Utc>) -> Result<(), BorrowError> {
        if self.status != MemberStatus::Active {
            return Err(BorrowError::MemberNotActive);
        }
        if self.is_card_expired(now) {
            return Err(BorrowError::CardExpired(self.card_expiry_date));
        }
        if !self.fines.unpaid.is_zero() {
            return Err(BorrowError::UnpaidFines(self.fines.unpaid));
        }
        if self.current_borrowings.len() >= MAX_CURRENT_BORROWINGS {
            return Err(BorrowError::BorrowingLimitReached);
        }
        Ok(())
    }

    /// 予約可能か確認する（有効かつ会員証が期限内）
    pub fn ensure_can_reserve(&self, now: DateTime<Utc>) -> Result<(), ReservationError> {
        if self.status != MemberStatus::Active {
            return Err(ReservationError::MemberNotActive);
        }
        if self.is_card_expired(now) {
            return Err(ReservationError::CardExpired(self.card_expiry_date));
        }
        Ok(())
    }

    pub fn is_borrowing_title(&self, title: &str) -> bool {
        self.current_borrowings
            .iter()
            .any(|b| b.title.eq_ignore_ascii_case(title))
    }

    pub(crate) fn current_borrowing_mut(
        &mut self,
        borrowing_id: &BorrowingId,
    ) -> Option<&mut CurrentBorrowing> {
        self.current_borrowings
            .iter_mut()
            .find(|b| &b.borrowing_id == borrowing_id)
    }

    pub(crate) fn remove_current_borrowing(&mut self, borrowing_id: &BorrowingId) {
        self.current_borrowings
            .retain(|b| &b.borrowing_id != borrowing_id);
    }

    pub(crate) fn charge_fine(&mut self, amount: Money) {
        self.fines.total += amount;
        self.fines.unpaid += amount;
    }
}
