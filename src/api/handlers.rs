use crate::application::{
    ServiceDependencies, borrow_book, expire_reservations, fines_for_member, get_borrowing,
    get_reservation, list_borrowings, list_reservations, renew_borrowing, reserve_book,
    return_book, send_reservation_notification, update_reservation_status,
};
use crate::domain::{
    Borrowing, BorrowingId, Fine, MemberId, Reservation, ReservationId,
    SendReservationNotification,
};
use crate::ports::{Page, PageRequest};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BorrowBookRequest, ListBorrowingsQuery, ListReservationsQuery, RenewBorrowingRequest,
        ReserveBookRequest, ReturnBookRequest, ReturnResponse, UpdateReservationStatusRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

/// パスの貸出ID（"BR000001"形式）をパースする
fn parse_borrowing_id(raw: &str) -> Result<BorrowingId, ApiError> {
    raw.parse::<BorrowingId>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// パスのUUID（会員ID・予約ID）をパースする
fn parse_uuid(kind: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} id: {}", kind, raw)))
}

// ============================================================================
// Borrowings
// ============================================================================

/// POST /borrowings - コピーを貸し出す
pub async fn create_borrowing(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowBookRequest>,
) -> Result<(StatusCode, Json<Borrowing>), ApiError> {
    let borrowing = borrow_book(&state.service_deps, req.to_command(Utc::now())).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// GET /borrowings - 絞り込み・ソート・ページング付きの貸出一覧
pub async fn list_borrowings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBorrowingsQuery>,
) -> Result<Json<Page<Borrowing>>, ApiError> {
    let filter = query.to_filter(Utc::now()).map_err(ApiError::BadRequest)?;
    let request = PageRequest::new(query.page, query.limit, query.sort.as_deref())?;

    let page = list_borrowings(&state.service_deps, &filter, &request).await?;
    Ok(Json(page))
}

/// GET /borrowings/:id - 貸出詳細
pub async fn get_borrowing_handler(
    State(state): State<Arc<AppState>>,
    Path(borrowing_id): Path<String>,
) -> Result<Json<Borrowing>, ApiError> {
    let borrowing_id = parse_borrowing_id(&borrowing_id)?;
    let borrowing = get_borrowing(&state.service_deps, &borrowing_id).await?;
    Ok(Json(borrowing))
}

/// POST /borrowings/:id/return - 返却
///
/// 延滞していれば延滞金を課し、レスポンスに台帳レコードを含める。
pub async fn return_borrowing(
    State(state): State<Arc<AppState>>,
    Path(borrowing_id): Path<String>,
    Json(req): Json<ReturnBookRequest>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let borrowing_id = parse_borrowing_id(&borrowing_id)?;
    let receipt = return_book(&state.service_deps, req.to_command(borrowing_id, Utc::now())).await?;
    Ok(Json(ReturnResponse::from(receipt)))
}

/// POST /borrowings/:id/renew - 貸出の更新
pub async fn renew_borrowing_handler(
    State(state): State<Arc<AppState>>,
    Path(borrowing_id): Path<String>,
    Json(req): Json<RenewBorrowingRequest>,
) -> Result<Json<Borrowing>, ApiError> {
    let borrowing_id = parse_borrowing_id(&borrowing_id)?;
    let borrowing =
        renew_borrowing(&state.service_deps, req.to_command(borrowing_id, Utc::now())).await?;
    Ok(Json(borrowing))
}

/// GET /members/:id/fines - 会員の延滞金台帳
pub async fn list_member_fines(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<String>,
) -> Result<Json<Vec<Fine>>, ApiError> {
    let member_id = MemberId::from_uuid(parse_uuid("member", &member_id)?);
    let fines = fines_for_member(&state.service_deps, member_id).await?;
    Ok(Json(fines))
}

// ============================================================================
// Reservations
// ============================================================================

/// POST /reservations - 予約
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReserveBookRequest>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    let reservation = reserve_book(&state.service_deps, req.to_command(Utc::now())).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /reservations - 絞り込み・ソート・ページング付きの予約一覧
pub async fn list_reservations_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListReservationsQuery>,
) -> Result<Json<Page<Reservation>>, ApiError> {
    let filter = query.to_filter().map_err(ApiError::BadRequest)?;
    let request = PageRequest::new(query.page, query.limit, query.sort.as_deref())?;

    let page = list_reservations(&state.service_deps, &filter, &request).await?;
    Ok(Json(page))
}

/// GET /reservations/:id - 予約詳細
pub async fn get_reservation_handler(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation_id = ReservationId::from_uuid(parse_uuid("reservation", &reservation_id)?);
    let reservation = get_reservation(&state.service_deps, reservation_id).await?;
    Ok(Json(reservation))
}

/// PATCH /reservations/:id/status - 予約ステータスの変更
pub async fn update_reservation_status_handler(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
    Json(req): Json<UpdateReservationStatusRequest>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation_id = ReservationId::from_uuid(parse_uuid("reservation", &reservation_id)?);
    let cmd = req.to_command(reservation_id, Utc::now());
    let reservation = update_reservation_status(&state.service_deps, cmd).await?;
    Ok(Json(reservation))
}

/// POST /reservations/:id/notify - 予約者への取り置き通知
pub async fn notify_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
) -> Result<Json<Reservation>, ApiError> {
    let cmd = SendReservationNotification {
        reservation_id: ReservationId::from_uuid(parse_uuid("reservation", &reservation_id)?),
        sent_at: Utc::now(),
    };
    let reservation = send_reservation_notification(&state.service_deps, cmd).await?;
    Ok(Json(reservation))
}

#[derive(Debug, Serialize)]
pub struct ExpiredReservationsResponse {
    pub expired: usize,
}

/// POST /reservations/expire - 取り置き期限切れの一括処理
pub async fn expire_reservations_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExpiredReservationsResponse>, ApiError> {
    let expired = expire_reservations(&state.service_deps, Utc::now()).await?;
    Ok(Json(ExpiredReservationsResponse { expired }))
}
