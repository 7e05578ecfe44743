use crate::domain::{Member, MemberId};
use async_trait::async_trait;

use super::Result;

/// 会員リポジトリポート
///
/// 会員の登録・変更は会員管理側の責務。貸出側は参照のみ行い、
/// 書き込みは`UnitOfWork`経由で貸出・予約と一緒にコミットする。
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// IDで会員を取得する
    async fn find_by_id(&self, member_id: MemberId) -> Result<Option<Member>>;
}
