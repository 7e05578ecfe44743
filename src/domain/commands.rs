use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BookId, BorrowingId, CopyCondition, CopyId, MemberId, Money, ReservationId, ReservationStatus,
    StaffId,
};

/// コマンド：コピーを貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBook {
    pub member_id: MemberId,
    pub book_id: BookId,
    pub copy_id: CopyId,
    pub staff_id: StaffId,
    pub borrowed_at: DateTime<Utc>,
    /// 省略時は貸出日 + 14日
    pub due_date: Option<DateTime<Utc>>,
}

/// 職員が手動で課す延滞金（破損・紛失など）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualFine {
    pub amount: Money,
    pub reason: String,
}

/// コマンド：返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub borrowing_id: BorrowingId,
    pub staff_id: StaffId,
    pub returned_at: DateTime<Utc>,
    /// 返却時に確認したコピーの状態
    pub condition: Option<CopyCondition>,
    pub manual_fine: Option<ManualFine>,
}

/// コマンド：貸出を更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewBorrowing {
    pub borrowing_id: BorrowingId,
    pub renewed_at: DateTime<Utc>,
    /// 省略時は現在の返却期限 + 14日
    pub due_date: Option<DateTime<Utc>>,
}

/// コマンド：予約する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveBook {
    pub member_id: MemberId,
    pub book_id: BookId,
    pub reserved_at: DateTime<Utc>,
}

/// コマンド：予約ステータスを変更する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReservationStatus {
    pub reservation_id: ReservationId,
    pub status: ReservationStatus,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// コマンド：予約者へ取り置き通知を送る
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReservationNotification {
    pub reservation_id: ReservationId,
    pub sent_at: DateTime<Utc>,
}
