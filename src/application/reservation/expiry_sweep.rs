use chrono::{DateTime, Utc};

use crate::domain::{self, ReservationStatus};
use crate::ports::ChangeSet;

use crate::application::dependencies::ServiceDependencies;
use crate::application::errors::{CirculationError, Result};
use crate::application::retry::retry_on_conflict;

const EXPIRY_NOTE: &str = "Hold period elapsed";

/// 取り置き期限切れ検出バッチ
///
/// 定期的に実行され、取り置き期限を過ぎた予約待ちを Expired にする。
///
/// ビジネスルール：
/// - 予約待ち（Waiting）で、取り置き期限が`now`より前のものが対象
/// - Claimed / Cancelled / Expired は処理しない
///
/// 対象はすべて1つの ChangeSet でコミットする。
/// 途中で他の操作が予約を変更した場合は、対象の検索からやり直す。
///
/// # 戻り値
/// Expired にした予約の件数
pub async fn expire_reservations(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<usize> {
    retry_on_conflict("expire_reservations", || try_expire_reservations(deps, now)).await
}

async fn try_expire_reservations(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<usize> {
    let candidates = deps
        .reservations
        .find_expired_waiting(now)
        .await
        .map_err(CirculationError::StoreError)?;

    let expired: Vec<_> = candidates
        .iter()
        .filter(|r| r.is_expired(now))
        .map(|r| {
            domain::reservation::change_status(
                r,
                ReservationStatus::Expired,
                Some(EXPIRY_NOTE.to_string()),
                now,
            )
            .0
        })
        .collect();

    let count = expired.len();
    if count == 0 {
        tracing::debug!("No expired reservations");
        return Ok(0);
    }

    deps.unit_of_work
        .commit(ChangeSet::new().update_reservations(&candidates, expired))
        .await?;

    tracing::info!(count, "Expired reservations");

    Ok(count)
}
