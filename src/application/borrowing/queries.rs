use crate::domain::{Borrowing, BorrowingId, Fine, MemberId};
use crate::ports::{BorrowingFilter, BorrowingSortField, Page, PageRequest};

use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{CirculationError, Result};
use crate::application::lookups::{load_borrowing, load_member};

/// 貸出一覧（絞り込み・ソート・ページング）
pub async fn list_borrowings(
    deps: &ServiceDependencies,
    filter: &BorrowingFilter,
    request: &PageRequest<BorrowingSortField>,
) -> Result<Page<Borrowing>> {
    deps.borrowings
        .find_page(filter, request)
        .await
        .map_err(CirculationError::StoreError)
}

pub async fn get_borrowing(deps: &ServiceDependencies, borrowing_id: &BorrowingId) -> Result<Borrowing> {
    load_borrowing(deps, borrowing_id).await
}

/// 会員の延滞金台帳（新しい順）
pub async fn fines_for_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<Vec<Fine>> {
    load_member(deps, member_id).await?;
    deps.fines
        .find_by_member(member_id)
        .await
        .map_err(CirculationError::StoreError)
}
