use crate::domain::{Fine, MemberId};
use async_trait::async_trait;

use super::Result;

/// 延滞金台帳ポート（参照用）
///
/// 台帳レコードの追加は返却処理の`ChangeSet`に含めてコミットする。
#[async_trait]
pub trait FineLedger: Send + Sync {
    /// 会員の延滞金レコードを発行日時の新しい順に取得する
    async fn find_by_member(&self, member_id: MemberId) -> Result<Vec<Fine>>;
}
