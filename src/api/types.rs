use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ReturnReceipt;
use crate::domain::{
    BookId, BorrowBook, Borrowing, BorrowingId, BorrowingStatus, CopyCondition, CopyId, Fine,
    ManualFine, MemberId, Money, RenewBorrowing, ReservationId, ReservationStatus, ReserveBook,
    ReturnBook, StaffId, UpdateReservationStatus,
};
use crate::ports::{BorrowingFilter, ReservationFilter};

// ============================================================================
// Borrowings
// ============================================================================

/// POST /borrowings
#[derive(Debug, Deserialize)]
pub struct BorrowBookRequest {
    pub member_id: Uuid,
    pub book_id: Uuid,
    pub copy_id: String,
    pub staff_id: Uuid,
    /// 省略時は貸出日 + 14日
    pub due_date: Option<DateTime<Utc>>,
}

impl BorrowBookRequest {
    pub fn to_command(&self, now: DateTime<Utc>) -> BorrowBook {
        BorrowBook {
            member_id: MemberId::from_uuid(self.member_id),
            book_id: BookId::from_uuid(self.book_id),
            copy_id: CopyId::new(self.copy_id.clone()),
            staff_id: StaffId::from_uuid(self.staff_id),
            borrowed_at: now,
            due_date: self.due_date,
        }
    }
}

/// POST /borrowings/:id/return
#[derive(Debug, Deserialize)]
pub struct ReturnBookRequest {
    pub staff_id: Uuid,
    pub condition: Option<CopyCondition>,
    /// 手動で加算する延滞金
    pub fine_amount: Option<u64>,
    pub fine_reason: Option<String>,
}

impl ReturnBookRequest {
    pub fn to_command(&self, borrowing_id: BorrowingId, now: DateTime<Utc>) -> ReturnBook {
        let manual_fine = self
            .fine_amount
            .filter(|amount| *amount > 0)
            .map(|amount| ManualFine {
                amount: Money::new(amount),
                reason: self
                    .fine_reason
                    .clone()
                    .unwrap_or_else(|| "Manual fine".to_string()),
            });

        ReturnBook {
            borrowing_id,
            staff_id: StaffId::from_uuid(self.staff_id),
            returned_at: now,
            condition: self.condition,
            manual_fine,
        }
    }
}

/// POST /borrowings/:id/renew
#[derive(Debug, Default, Deserialize)]
pub struct RenewBorrowingRequest {
    /// 省略時は現在の期限 + 14日
    pub due_date: Option<DateTime<Utc>>,
}

impl RenewBorrowingRequest {
    pub fn to_command(&self, borrowing_id: BorrowingId, now: DateTime<Utc>) -> RenewBorrowing {
        RenewBorrowing {
            borrowing_id,
            renewed_at: now,
            due_date: self.due_date,
        }
    }
}

/// 返却レスポンス
#[derive(Debug, Serialize)]
pub struct ReturnResponse {
    pub borrowing: Borrowing,
    pub fine: Option<Fine>,
    pub days_late: u32,
}

impl From<ReturnReceipt> for ReturnResponse {
    fn from(receipt: ReturnReceipt) -> Self {
        Self {
            borrowing: receipt.borrowing,
            fine: receipt.fine,
            days_late: receipt.days_late,
        }
    }
}

/// GET /borrowings のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListBorrowingsQuery {
    pub member_id: Option<Uuid>,
    pub book_id: Option<Uuid>,
    pub copy_id: Option<String>,
    pub status: Option<String>,
    /// trueなら返却期限を過ぎた貸出中のもののみ
    pub overdue: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

impl ListBorrowingsQuery {
    pub fn to_filter(&self, now: DateTime<Utc>) -> Result<BorrowingFilter, String> {
        let mut status = self
            .status
            .as_deref()
            .map(str::parse::<BorrowingStatus>)
            .transpose()?;
        let mut due_before = None;
        if self.overdue == Some(true) {
            if status == Some(BorrowingStatus::Returned) {
                return Err("overdue=true cannot be combined with status=Returned".to_string());
            }
            status = Some(BorrowingStatus::Borrowed);
            due_before = Some(now);
        }

        Ok(BorrowingFilter {
            member_id: self.member_id.map(MemberId::from_uuid),
            book_id: self.book_id.map(BookId::from_uuid),
            copy_id: self.copy_id.clone().map(CopyId::new),
            status,
            due_before,
        })
    }
}

// ============================================================================
// Reservations
// ============================================================================

/// POST /reservations
#[derive(Debug, Deserialize)]
pub struct ReserveBookRequest {
    pub member_id: Uuid,
    pub book_id: Uuid,
}

impl ReserveBookRequest {
    pub fn to_command(&self, now: DateTime<Utc>) -> ReserveBook {
        ReserveBook {
            member_id: MemberId::from_uuid(self.member_id),
            book_id: BookId::from_uuid(self.book_id),
            reserved_at: now,
        }
    }
}

/// PATCH /reservations/:id/status
#[derive(Debug, Deserialize)]
pub struct UpdateReservationStatusRequest {
    pub status: ReservationStatus,
    pub note: Option<String>,
}

impl UpdateReservationStatusRequest {
    pub fn to_command(
        &self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> UpdateReservationStatus {
        UpdateReservationStatus {
            reservation_id,
            status: self.status,
            note: self.note.clone(),
            updated_at: now,
        }
    }
}

/// GET /reservations のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListReservationsQuery {
    pub member_id: Option<Uuid>,
    pub book_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

impl ListReservationsQuery {
    pub fn to_filter(&self) -> Result<ReservationFilter, String> {
        Ok(ReservationFilter {
            member_id: self.member_id.map(MemberId::from_uuid),
            book_id: self.book_id.map(BookId::from_uuid),
            status: self
                .status
                .as_deref()
                .map(str::parse::<ReservationStatus>)
                .transpose()?,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overdue_query_forces_borrowed_status() {
        let now = Utc::now();
        let query = ListBorrowingsQuery {
            overdue: Some(true),
            ..Default::default()
        };
        let filter = query.to_filter(now).unwrap();
        assert_eq!(filter.status, Some(BorrowingStatus::Borrowed));
        assert_eq!(filter.due_before, Some(now));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let query = ListReservationsQuery {
            status: Some("Lost".to_string()),
            ..Default::default()
        };
        assert!(query.to_filter().is_err());
    }

    #[test]
    fn test_manual_fine_defaults_reason() {
        let request = ReturnBookRequest {
            staff_id: Uuid::new_v4(),
            condition: None,
            fine_amount: Some(3000),
            fine_reason: None,
        };
        let cmd = request.to_command(BorrowingId::first(), Utc::now());
        let fine = cmd.manual_fine.unwrap();
        assert_eq!(fine.amount, Money::new(3000));
        assert_eq!(fine.reason, "Manual fine");
    }
}
