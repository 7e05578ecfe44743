use crate::application::{CirculationError, ErrorKind};
use crate::ports::PaginationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーと、リクエストの検証エラーをまとめる。
#[derive(Debug)]
pub enum ApiError {
    Application(CirculationError),
    BadRequest(String),
}

impl From<CirculationError> for ApiError {
    fn from(err: CirculationError) -> Self {
        ApiError::Application(err)
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// クライアントに返すエラーコード
fn error_code(err: &CirculationError) -> &'static str {
    match err {
        CirculationError::MemberNotFound(_) => "MEMBER_NOT_FOUND",
        CirculationError::BookNotFound(_) => "BOOK_NOT_FOUND",
        CirculationError::StaffNotFound(_) => "STAFF_NOT_FOUND",
        CirculationError::BorrowingNotFound(_) => "BORROWING_NOT_FOUND",
        CirculationError::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
        CirculationError::Borrow(_) => "BORROW_REJECTED",
        CirculationError::Return(_) => "RETURN_REJECTED",
        CirculationError::Renew(_) => "RENEW_REJECTED",
        CirculationError::Reservation(_) => "RESERVATION_REJECTED",
        CirculationError::Conflict { .. } => "CONCURRENT_UPDATE",
        CirculationError::StoreError(_) => "STORE_ERROR",
        CirculationError::NotificationError(_) => "NOTIFICATION_ERROR",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", message),
            ),
            ApiError::Application(err) => {
                let code = error_code(&err);
                match err.kind() {
                    // 404 Not Found - リクエストされたリソースが存在しない
                    ErrorKind::NotFound => (
                        StatusCode::NOT_FOUND,
                        ErrorResponse::new(code, err.to_string()),
                    ),
                    // 422 Unprocessable Entity - ビジネスルール違反
                    ErrorKind::InvalidState => {
                        tracing::warn!(error = %err, "Operation rejected");
                        (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            ErrorResponse::new(code, err.to_string()),
                        )
                    }
                    // 500 Internal Server Error - システム障害
                    // 詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                    ErrorKind::Internal => {
                        let cause = std::error::Error::source(&err)
                            .map(ToString::to_string)
                            .unwrap_or_default();
                        tracing::error!(error = %err, cause, "Internal error");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ErrorResponse::new(code, "An unexpected error occurred"),
                        )
                    }
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
