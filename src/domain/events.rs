use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BookId, BorrowingId, CopyCondition, CopyId, CopyStatus, FineId, MemberId, Money,
    ReservationId, ReservationStatus, StaffId,
};

/// イベント：コピーが貸し出された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookBorrowed {
    pub borrowing_id: BorrowingId,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub copy_id: CopyId,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub issued_by: StaffId,
    /// 自動的に受取済みとなった予約
    pub claimed_reservations: Vec<ReservationId>,
}

/// イベント：貸出が更新された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowingRenewed {
    pub borrowing_id: BorrowingId,
    pub old_due_date: DateTime<Utc>,
    pub new_due_date: DateTime<Utc>,
    pub renewed_at: DateTime<Utc>,
    pub renewal_count: u8,
}

/// イベント：コピーが返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookReturned {
    pub borrowing_id: BorrowingId,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub copy_id: CopyId,
    pub returned_at: DateTime<Utc>,
    pub received_by: StaffId,
    pub days_late: u32,
    pub fine_amount: Money,
    pub fine_id: Option<FineId>,
    pub condition: Option<CopyCondition>,
    pub copy_status: CopyStatus,
}

impl BookReturned {
    pub fn was_overdue(&self) -> bool {
        self.days_late > 0
    }
}

/// イベント：予約が登録された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookReserved {
    pub reservation_id: ReservationId,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub reserved_at: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

/// イベント：予約ステータスが変わった
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationStatusChanged {
    pub reservation_id: ReservationId,
    pub old_status: ReservationStatus,
    pub new_status: ReservationStatus,
    pub changed_at: DateTime<Utc>,
}

/// イベント：予約者に通知された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationNotified {
    pub reservation_id: ReservationId,
    pub member_id: MemberId,
    pub notified_at: DateTime<Utc>,
}
