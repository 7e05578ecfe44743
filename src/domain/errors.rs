use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{CopyId, CopyStatus, MAX_CURRENT_BORROWINGS, Money, ReservationStatus};

/// 貸出のエラー（ビジネスルール違反）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BorrowError {
    /// 会員が有効でない
    #[error("Member account is not active")]
    MemberNotActive,
    /// 会員証の有効期限切れ
    #[error("Member card expired on {0}")]
    CardExpired(DateTime<Utc>),
    /// 未払いの延滞金がある
    #[error("Member has unpaid fines ({0})")]
    UnpaidFines(Money),
    /// 同時貸出数の上限に達している
    #[error("Borrowing limit reached (max {} books)", MAX_CURRENT_BORROWINGS)]
    BorrowingLimitReached,
    /// 指定されたコピーが書籍に存在しない
    #[error("Copy {0} does not exist")]
    CopyNotFound(CopyId),
    /// コピーが貸出可能な状態でない
    #[error("Copy {copy_id} is not available ({status:?})")]
    CopyNotAvailable { copy_id: CopyId, status: CopyStatus },
    /// 返却期限が貸出日以前
    #[error("Due date must be after the borrow date")]
    InvalidDueDate,
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnError {
    /// 既に返却済み
    #[error("Borrowing has already been returned")]
    AlreadyReturned,
    /// 貸出記録のコピーが書籍に存在しない
    #[error("Copy {0} does not exist")]
    CopyNotFound(CopyId),
}

/// 更新（延長）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewError {
    /// 既に返却済み
    #[error("Borrowing has already been returned")]
    AlreadyReturned,
    /// 更新回数の上限を超えた
    #[error("Renewal limit reached")]
    RenewalLimitReached,
    /// 他の会員が予約待ちしている
    #[error("Book has a waiting reservation")]
    ReservedByAnotherMember,
    /// 新しい返却期限が現在の期限以前
    #[error("New due date must be after the current due date")]
    InvalidDueDate,
}

/// 予約のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// 会員が有効でない
    #[error("Member account is not active")]
    MemberNotActive,
    /// 会員証の有効期限切れ
    #[error("Member card expired on {0}")]
    CardExpired(DateTime<Utc>),
    /// 書籍にコピーが登録されていない
    #[error("Book has no copies")]
    NoCopies,
    /// 同じ書籍への有効な予約が既にある
    #[error("Member already has an active reservation for this book")]
    DuplicateReservation,
    /// 同じタイトルを既に借りている
    #[error("Member is already borrowing \"{0}\"")]
    AlreadyBorrowingTitle(String),
    /// 貸出可能なコピーがあるため予約不要
    #[error("A copy is available; reservation is not needed")]
    CopyAvailable,
    /// 通知は予約待ちの予約にのみ送れる
    #[error("Notification can only be sent for waiting reservations (current: {0:?})")]
    NotWaiting(ReservationStatus),
}
