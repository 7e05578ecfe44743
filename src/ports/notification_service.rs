use crate::domain::MemberId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// 通知サービスポート
///
/// 会員への通知配信メカニズムを抽象化する。
/// 実装はメール、SMS、プッシュ通知などが考えられる。
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// 予約資料の取り置き通知を会員に送信する
    ///
    /// 予約待ちの予約に対して職員が通知を送るときに呼ばれる。
    async fn send_reservation_ready(
        &self,
        member_id: MemberId,
        book_title: &str,
        hold_until: DateTime<Utc>,
    ) -> Result<()>;
}
