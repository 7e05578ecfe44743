use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Book, BookReserved, BookSnapshot, BorrowingId, Member, MemberSnapshot, ReservationError,
    ReservationId, ReservationNotified, ReservationStatusChanged,
};

/// 予約の取り置き期限（日数）
pub const RESERVATION_HOLD_DAYS: i64 = 7;

/// 予約ステータス
///
/// 遷移表は定めていない。どのステータスからどのステータスへも変更できる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Waiting,
    Claimed,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Waiting => "Waiting",
            ReservationStatus::Claimed => "Claimed",
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::Expired => "Expired",
        }
    }

    pub fn is_waiting(&self) -> bool {
        *self == ReservationStatus::Waiting
    }

    /// 会員・書籍ごとの重複判定に使う「有効な」予約か
    pub fn is_open(&self) -> bool {
        matches!(self, ReservationStatus::Waiting | ReservationStatus::Claimed)
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Waiting" | "waiting" => Ok(ReservationStatus::Waiting),
            "Claimed" | "claimed" => Ok(ReservationStatus::Claimed),
            "Cancelled" | "cancelled" => Ok(ReservationStatus::Cancelled),
            "Expired" | "expired" => Ok(ReservationStatus::Expired),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

/// ステータス変更時に追記されるメモ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationNote {
    pub recorded_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub text: String,
}

/// 予約
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub member: MemberSnapshot,
    pub book: BookSnapshot,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub notification_sent: bool,
    pub notified_at: Option<DateTime<Utc>>,
    pub notes: Vec<ReservationNote>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// 予約待ちのまま取り置き期限を過ぎているか
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status.is_waiting() && self.expiry_date < now
    }
}

/// 純粋関数：書籍を予約する
///
/// ビジネスルール：
/// - 会員が有効で、会員証が期限内であること
/// - 書籍にコピーが1冊以上登録されていること
/// - 同じ書籍への予約待ち・受取待ちの予約がないこと
/// - 同じタイトルを借りていないこと
/// - 貸出可能なコピーが1冊もないこと
///
/// 取り置き期限は予約日 + 7日。
pub fn reserve_book(
    reservation_id: ReservationId,
    member: &Member,
    book: &Book,
    has_open_reservation: bool,
    reserved_at: DateTime<Utc>,
) -> Result<(Reservation, BookReserved), ReservationError> {
    member.ensure_can_reserve(reserved_at)?;

    if book.copies.is_empty() {
        return Err(ReservationError::NoCopies);
    }
    if has_open_reservation {
        return Err(ReservationError::DuplicateReservation);
    }
    if member.is_borrowing_title(&book.title) {
        return Err(ReservationError::AlreadyBorrowingTitle(book.title.clone()));
    }
    if book.has_available_copy() {
        return Err(ReservationError::CopyAvailable);
    }

    let expiry_date = reserved_at + Duration::days(RESERVATION_HOLD_DAYS);
    let reservation = Reservation {
        reservation_id,
        member: MemberSnapshot::from(member),
        book: BookSnapshot::from(book),
        reservation_date: reserved_at,
        expiry_date,
        status: ReservationStatus::Waiting,
        notification_sent: false,
        notified_at: None,
        notes: Vec::new(),
        updated_at: reserved_at,
    };

    let event = BookReserved {
        reservation_id,
        member_id: member.member_id,
        book_id: book.book_id,
        reserved_at,
        expiry_date,
    };

    Ok((reservation, event))
}

/// 純粋関数：予約ステータスを変更する
///
/// 遷移の制約はない。メモがあれば追記する。
pub fn change_status(
    reservation: &Reservation,
    status: ReservationStatus,
    note: Option<String>,
    changed_at: DateTime<Utc>,
) -> (Reservation, ReservationStatusChanged) {
    let mut notes = reservation.notes.clone();
    if let Some(text) = note.filter(|n| !n.trim().is_empty()) {
        notes.push(ReservationNote {
            recorded_at: changed_at,
            status,
            text,
        });
    }

    let updated = Reservation {
        status,
        notes,
        updated_at: changed_at,
        ..reservation.clone()
    };

    let event = ReservationStatusChanged {
        reservation_id: reservation.reservation_id,
        old_status: reservation.status,
        new_status: status,
        changed_at,
    };

    (updated, event)
}

/// 貸出時に予約を受取済みにする
pub fn claim_reservation(
    reservation: &Reservation,
    borrowing_id: &BorrowingId,
    claimed_at: DateTime<Utc>,
) -> Reservation {
    let note = format!("Claimed by borrowing {}", borrowing_id);
    change_status(reservation, ReservationStatus::Claimed, Some(note), claimed_at).0
}

/// 純粋関数：予約者への通知を記録する
///
/// 予約待ち（Waiting）の予約にのみ送れる。
pub fn mark_notified(
    reservation: &Reservation,
    notified_at: DateTime<Utc>,
) -> Result<(Reservation, ReservationNotified), ReservationError> {
    if !reservation.status.is_waiting() {
        return Err(ReservationError::NotWaiting(reservation.status));
    }

    let updated = Reservation {
        notification_sent: true,
        notified_at: Some(notified_at),
        updated_at: notified_at,
        ..reservation.clone()
    };

    let event = ReservationNotified {
        reservation_id: reservation.reservation_id,
        member_id: reservation.member.member_id,
        notified_at,
    };

    Ok((updated, event))
}
