use crate::domain::{BookId, MemberId, Reservation, ReservationId, ReservationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use super::Result;
use super::pagination::{Page, PageRequest, SortField};

/// 予約一覧の絞り込み条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub member_id: Option<MemberId>,
    pub book_id: Option<BookId>,
    pub status: Option<ReservationStatus>,
}

impl ReservationFilter {
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.member_id
            .is_none_or(|id| reservation.member.member_id == id)
            && self
                .book_id
                .is_none_or(|id| reservation.book.book_id == id)
            && self.status.is_none_or(|s| reservation.status == s)
    }
}

/// 予約一覧のソートフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationSortField {
    ReservationDate,
    ExpiryDate,
    Status,
}

impl SortField for ReservationSortField {
    const DEFAULT: Self = ReservationSortField::ReservationDate;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "reservation_date" => Some(Self::ReservationDate),
            "expiry_date" => Some(Self::ExpiryDate),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::ReservationDate => "reservation_date",
            Self::ExpiryDate => "expiry_date",
            Self::Status => "status",
        }
    }
}

impl ReservationSortField {
    /// 昇順の比較
    ///
    /// 同じ値のものは予約ID（UUIDのバイト順）で並べる。
    pub fn compare(&self, a: &Reservation, b: &Reservation) -> Ordering {
        let primary = match self {
            Self::ReservationDate => a.reservation_date.cmp(&b.reservation_date),
            Self::ExpiryDate => a.expiry_date.cmp(&b.expiry_date),
            Self::Status => a.status.as_str().cmp(b.status.as_str()),
        };
        primary.then_with(|| a.reservation_id.value().cmp(&b.reservation_id.value()))
    }
}

/// 予約リポジトリポート
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>>;

    /// 会員が書籍に対して持つ有効な予約（Waiting / Claimed）
    ///
    /// 重複予約の判定と、貸出時の自動受取に使用される。
    async fn find_open(&self, member_id: MemberId, book_id: BookId) -> Result<Vec<Reservation>>;

    /// 書籍に予約待ち（Waiting）があるか
    ///
    /// ビジネスルール: 予約待ちがある書籍の貸出は更新できない。
    async fn has_waiting(&self, book_id: BookId) -> Result<bool>;

    /// 取り置き期限を過ぎた予約待ちを取得する
    async fn find_expired_waiting(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>>;

    /// 条件に合う予約をソート・ページングして取得する
    async fn find_page(
        &self,
        filter: &ReservationFilter,
        request: &PageRequest<ReservationSortField>,
    ) -> Result<Page<Reservation>>;
}
