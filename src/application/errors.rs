use thiserror::Error;

use crate::domain::{
    BookId, BorrowError, BorrowingId, MemberId, RenewError, ReservationError, ReservationId,
    ReturnError, StaffId,
};
use crate::ports::{CommitError, PortError};

/// 貸出・予約アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CirculationError {
    /// 会員が存在しない
    #[error("Member {0} not found")]
    MemberNotFound(MemberId),

    /// 書籍が存在しない
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    /// 職員が存在しない
    #[error("Staff {0} not found")]
    StaffNotFound(StaffId),

    /// 貸出が存在しない
    #[error("Borrowing {0} not found")]
    BorrowingNotFound(BorrowingId),

    /// 予約が存在しない
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),

    /// 貸出のビジネスルール違反
    #[error(transparent)]
    Borrow(#[from] BorrowError),

    /// 返却のビジネスルール違反
    #[error(transparent)]
    Return(#[from] ReturnError),

    /// 更新のビジネスルール違反
    #[error(transparent)]
    Renew(#[from] RenewError),

    /// 予約のビジネスルール違反
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    /// 読み込んだドキュメントがコミット前に他の操作で変更された
    #[error("{kind} {id} was changed by another operation")]
    Conflict { kind: &'static str, id: String },

    /// ストアのエラー
    #[error("Store error")]
    StoreError(#[source] PortError),

    /// 通知サービスのエラー
    #[error("Notification service error")]
    NotificationError(#[source] PortError),
}

impl From<CommitError> for CirculationError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Conflict { kind, id } => CirculationError::Conflict { kind, id },
            CommitError::Store(source) => CirculationError::StoreError(source),
        }
    }
}

/// エラーの分類
///
/// API層はこの分類だけを見てステータスコードを決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 対象が存在しない
    NotFound,
    /// 状態がその操作を許さない
    InvalidState,
    /// ストア・通知先の障害
    Internal,
}

impl CirculationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CirculationError::MemberNotFound(_)
            | CirculationError::BookNotFound(_)
            | CirculationError::StaffNotFound(_)
            | CirculationError::BorrowingNotFound(_)
            | CirculationError::ReservationNotFound(_)
            | CirculationError::Borrow(BorrowError::CopyNotFound(_))
            | CirculationError::Return(ReturnError::CopyNotFound(_)) => ErrorKind::NotFound,
            CirculationError::Borrow(_)
            | CirculationError::Return(_)
            | CirculationError::Renew(_)
            | CirculationError::Reservation(_)
            | CirculationError::Conflict { .. } => ErrorKind::InvalidState,
            CirculationError::StoreError(_) | CirculationError::NotificationError(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_invalid_state(&self) -> bool {
        self.kind() == ErrorKind::InvalidState
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CirculationError::Conflict { .. })
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CirculationError>;
