use crate::domain::{Reservation, ReservationId};
use crate::ports::{Page, PageRequest, ReservationFilter, ReservationSortField};

use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{CirculationError, Result};
use crate::application::lookups::load_reservation;

/// 予約一覧（絞り込み・ソート・ページング）
pub async fn list_reservations(
    deps: &ServiceDependencies,
    filter: &ReservationFilter,
    request: &PageRequest<ReservationSortField>,
) -> Result<Page<Reservation>> {
    deps.reservations
        .find_page(filter, request)
        .await
        .map_err(CirculationError::StoreError)
}

pub async fn get_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    load_reservation(deps, reservation_id).await
}
