use std::future::Future;

use crate::application::errors::Result;

/// コミット競合時の最大試行回数
pub(crate) const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// 競合したら読み込みからやり直す
///
/// `attempt`は毎回ドキュメントを読み直してコミットまで行うこと。
/// 競合以外のエラーと、最後の試行の結果はそのまま返す。
pub(crate) async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(err) if err.is_conflict() && tries < MAX_COMMIT_ATTEMPTS => {
                tracing::debug!(operation, tries, error = %err, "Commit conflict, retrying");
                tries += 1;
            }
            result => return result,
        }
    }
}
