use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BorrowingId, FineId, ManualFine, MemberId, Money, StaffId};

/// 延滞1日あたりの延滞金
pub const DAILY_OVERDUE_FINE: Money = Money::new(5000);

/// 延滞金の支払い状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FineStatus {
    /// 延滞金なし
    NotCharged,
    Unpaid,
    Paid,
}

/// 延滞金台帳のレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fine {
    pub fine_id: FineId,
    pub member_id: MemberId,
    pub borrowing_id: BorrowingId,
    pub amount: Money,
    pub reason: String,
    pub status: FineStatus,
    pub issued_by: StaffId,
    pub issued_at: DateTime<Utc>,
}

/// 返却時の延滞金査定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineAssessment {
    pub days_late: u32,
    pub amount: Money,
    pub reason: Option<String>,
}

/// 返却期限を過ぎた日数
///
/// 1日未満の超過も1日として数える。期限内なら0。
pub fn days_late(due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> u32 {
    if returned_at <= due_date {
        return 0;
    }
    let late = returned_at - due_date;
    let whole_days = late.num_days();
    let partial = late - chrono::Duration::days(whole_days) > chrono::Duration::zero();
    let days = whole_days + i64::from(partial);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// 返却時の延滞金を査定する純粋関数
///
/// 延滞日数 × 日額に、職員が入力した手動の延滞金を加算する。
pub fn assess_fine(
    due_date: DateTime<Utc>,
    returned_at: DateTime<Utc>,
    manual_fine: Option<&ManualFine>,
) -> FineAssessment {
    let days_late = days_late(due_date, returned_at);
    let mut amount = DAILY_OVERDUE_FINE.times(u64::from(days_late));
    let mut reasons = Vec::new();

    if days_late > 0 {
        reasons.push(format!("Overdue by {} day(s)", days_late));
    }
    if let Some(manual) = manual_fine.filter(|m| !m.amount.is_zero()) {
        amount += manual.amount;
        reasons.push(manual.reason.clone());
    }

    FineAssessment {
        days_late,
        amount,
        reason: (!reasons.is_empty()).then(|| reasons.join("; ")),
    }
}
