use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Book, BookBorrowed, BookReturned, BorrowBook, BorrowError, BorrowingId, BorrowingRenewed,
    CopyCondition, CopySnapshot, CopyStatus, CurrentBorrowing, Fine, FineId, FineStatus, Member,
    MemberSnapshot, Money, RenewBorrowing, RenewError, RenewalCount, Reservation, ReturnBook,
    ReturnError, Staff, StaffSnapshot, assess_fine, claim_reservation,
};

/// 貸出期間（日数）。更新時も同じ日数だけ延びる。
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// 貸出ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorrowingStatus {
    Borrowed,
    Returned,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Borrowed => "Borrowed",
            BorrowingStatus::Returned => "Returned",
        }
    }
}

impl std::str::FromStr for BorrowingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Borrowed" | "borrowed" => Ok(BorrowingStatus::Borrowed),
            "Returned" | "returned" => Ok(BorrowingStatus::Returned),
            _ => Err(format!("Invalid borrowing status: {}", s)),
        }
    }
}

/// 貸出記録に埋め込まれる延滞金
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowingFine {
    pub amount: Money,
    pub reason: Option<String>,
    pub status: FineStatus,
}

impl BorrowingFine {
    pub fn none() -> Self {
        Self {
            amount: Money::ZERO,
            reason: None,
            status: FineStatus::NotCharged,
        }
    }
}

/// 貸出記録 - 1冊のコピーの1回の貸出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrowing {
    pub borrowing_id: BorrowingId,

    // 作成時点のスナップショット
    pub member: MemberSnapshot,
    pub copy: CopySnapshot,
    pub issued_by: StaffSnapshot,

    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub received_by: Option<StaffSnapshot>,
    pub return_condition: Option<CopyCondition>,
    pub status: BorrowingStatus,
    pub renewal_count: RenewalCount,
    pub fine: BorrowingFine,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Borrowing {
    pub fn is_returned(&self) -> bool {
        self.status == BorrowingStatus::Returned
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_returned() && now > self.due_date
    }
}

/// 貸出処理の結果：書き込むべき全ドキュメント
#[derive(Debug, Clone)]
pub struct Checkout {
    pub borrowing: Borrowing,
    pub member: Member,
    pub book: Book,
    pub claimed_reservations: Vec<Reservation>,
    pub event: BookBorrowed,
}

/// 純粋関数：コピーを貸し出す
///
/// ビジネスルール：
/// - 会員が貸出可能であること（有効・期限内・未払いなし・5冊未満）
/// - コピーが存在し、Availableであること
/// - 返却期限は指定がなければ貸出日 + 14日
///
/// 会員が同じ書籍に予約待ちしていれば、その予約は受取済みになる。
/// 副作用なし。更新後の各ドキュメントとイベントを返す。
pub fn borrow_copy(
    borrowing_id: BorrowingId,
    member: &Member,
    book: &Book,
    staff: &Staff,
    waiting_reservations: &[Reservation],
    cmd: &BorrowBook,
) -> Result<Checkout, BorrowError> {
    member.ensure_can_borrow(cmd.borrowed_at)?;

    let copy = book
        .copy(&cmd.copy_id)
        .ok_or_else(|| BorrowError::CopyNotFound(cmd.copy_id.clone()))?;
    if !copy.is_available() {
        return Err(BorrowError::CopyNotAvailable {
            copy_id: copy.copy_id.clone(),
            status: copy.status,
        });
    }

    let due_date = match cmd.due_date {
        Some(due) if due <= cmd.borrowed_at => return Err(BorrowError::InvalidDueDate),
        Some(due) => due,
        None => cmd.borrowed_at + Duration::days(LOAN_PERIOD_DAYS),
    };

    let borrowing = Borrowing {
        borrowing_id: borrowing_id.clone(),
        member: MemberSnapshot::from(member),
        copy: CopySnapshot::new(book, copy),
        issued_by: StaffSnapshot::from(staff),
        borrow_date: cmd.borrowed_at,
        due_date,
        return_date: None,
        received_by: None,
        return_condition: None,
        status: BorrowingStatus::Borrowed,
        renewal_count: RenewalCount::new(),
        fine: BorrowingFine::none(),
        created_at: cmd.borrowed_at,
        updated_at: cmd.borrowed_at,
    };

    let mut book = book.clone();
    if let Some(copy) = book.copy_mut(&cmd.copy_id) {
        copy.status = CopyStatus::Borrowed;
    }

    let mut member = member.clone();
    member.current_borrowings.push(CurrentBorrowing {
        borrowing_id: borrowing_id.clone(),
        book_id: book.book_id,
        copy_id: cmd.copy_id.clone(),
        title: book.title.clone(),
        due_date,
    });
    member.stats.total_borrowings += 1;

    let claimed_reservations: Vec<Reservation> = waiting_reservations
        .iter()
        .filter(|r| r.member.member_id == member.member_id && r.book.book_id == book.book_id)
        .filter(|r| r.status.is_waiting())
        .map(|r| claim_reservation(r, &borrowing_id, cmd.borrowed_at))
        .collect();

    let event = BookBorrowed {
        borrowing_id,
        member_id: member.member_id,
        book_id: book.book_id,
        copy_id: cmd.copy_id.clone(),
        borrowed_at: cmd.borrowed_at,
        due_date,
        issued_by: staff.staff_id,
        claimed_reservations: claimed_reservations
            .iter()
            .map(|r| r.reservation_id)
            .collect(),
    };

    Ok(Checkout {
        borrowing,
        member,
        book,
        claimed_reservations,
        event,
    })
}

/// 返却処理の結果
#[derive(Debug, Clone)]
pub struct Checkin {
    pub borrowing: Borrowing,
    pub member: Member,
    pub book: Book,
    pub fine: Option<Fine>,
    pub event: BookReturned,
}

/// 純粋関数：コピーを返却する
///
/// ビジネスルール：
/// - 返却済みの貸出は返却できない
/// - 延滞金 = 延滞日数 × 5000 + 手動の延滞金
/// - 延滞金があれば台帳レコードを作り、会員の累計と未払い残高に加算する
/// - コピーの状態は報告されたコンディションで決まる
///   （Damaged → Maintenance, Lost → Lost, それ以外 → Available）
/// - 延滞していれば会員の延滞回数を加算する
pub fn return_copy(
    borrowing: &Borrowing,
    member: &Member,
    book: &Book,
    staff: &Staff,
    fine_id: FineId,
    cmd: &ReturnBook,
) -> Result<Checkin, ReturnError> {
    if borrowing.is_returned() {
        return Err(ReturnError::AlreadyReturned);
    }

    let copy_id = &borrowing.copy.copy_id;
    let mut book = book.clone();
    let copy = book
        .copy_mut(copy_id)
        .ok_or_else(|| ReturnError::CopyNotFound(copy_id.clone()))?;
    let copy_status = cmd
        .condition
        .map(CopyCondition::status_after_return)
        .unwrap_or(CopyStatus::Available);
    copy.status = copy_status;
    if let Some(condition) = cmd.condition {
        copy.condition = condition;
    }

    let assessment = assess_fine(
        borrowing.due_date,
        cmd.returned_at,
        cmd.manual_fine.as_ref(),
    );
    let charged = !assessment.amount.is_zero();

    let returned = Borrowing {
        return_date: Some(cmd.returned_at),
        received_by: Some(StaffSnapshot::from(staff)),
        return_condition: cmd.condition,
        status: BorrowingStatus::Returned,
        fine: BorrowingFine {
            amount: assessment.amount,
            reason: assessment.reason.clone(),
            status: if charged {
                FineStatus::Unpaid
            } else {
                FineStatus::NotCharged
            },
        },
        updated_at: cmd.returned_at,
        ..borrowing.clone()
    };

    let mut member = member.clone();
    member.remove_current_borrowing(&borrowing.borrowing_id);
    if assessment.days_late > 0 {
        member.stats.overdue_returns += 1;
    }

    let fine = charged.then(|| {
        member.charge_fine(assessment.amount);
        Fine {
            fine_id,
            member_id: member.member_id,
            borrowing_id: borrowing.borrowing_id.clone(),
            amount: assessment.amount,
            reason: assessment.reason.clone().unwrap_or_default(),
            status: FineStatus::Unpaid,
            issued_by: staff.staff_id,
            issued_at: cmd.returned_at,
        }
    });

    let event = BookReturned {
        borrowing_id: borrowing.borrowing_id.clone(),
        member_id: member.member_id,
        book_id: book.book_id,
        copy_id: copy_id.clone(),
        returned_at: cmd.returned_at,
        received_by: staff.staff_id,
        days_late: assessment.days_late,
        fine_amount: assessment.amount,
        fine_id: fine.as_ref().map(|f| f.fine_id),
        condition: cmd.condition,
        copy_status,
    };

    Ok(Checkin {
        borrowing: returned,
        member,
        book,
        fine,
        event,
    })
}

/// 更新処理の結果
#[derive(Debug, Clone)]
pub struct Renewal {
    pub borrowing: Borrowing,
    pub member: Member,
    pub event: BorrowingRenewed,
}

/// 純粋関数：貸出を更新する
///
/// ビジネスルール：
/// - 返却済みは更新不可
/// - 更新は2回まで
/// - その書籍に予約待ちがあれば更新不可
/// - 新しい返却期限は指定がなければ現在の期限 + 14日
pub fn renew_borrowing(
    borrowing: &Borrowing,
    member: &Member,
    has_waiting_reservation: bool,
    cmd: &RenewBorrowing,
) -> Result<Renewal, RenewError> {
    if borrowing.is_returned() {
        return Err(RenewError::AlreadyReturned);
    }

    let renewal_count = borrowing
        .renewal_count
        .increment()
        .map_err(|_| RenewError::RenewalLimitReached)?;

    if has_waiting_reservation {
        return Err(RenewError::ReservedByAnotherMember);
    }

    let old_due_date = borrowing.due_date;
    let new_due_date = match cmd.due_date {
        Some(due) if due <= old_due_date => return Err(RenewError::InvalidDueDate),
        Some(due) => due,
        None => old_due_date + Duration::days(LOAN_PERIOD_DAYS),
    };

    let renewed = Borrowing {
        due_date: new_due_date,
        renewal_count,
        updated_at: cmd.renewed_at,
        ..borrowing.clone()
    };

    let mut member = member.clone();
    if let Some(entry) = member.current_borrowing_mut(&borrowing.borrowing_id) {
        entry.due_date = new_due_date;
    }

    let event = BorrowingRenewed {
        borrowing_id: borrowing.borrowing_id.clone(),
        old_due_date,
        new_due_date,
        renewed_at: cmd.renewed_at,
        renewal_count: renewal_count.value(),
    };

    Ok(Renewal {
        borrowing: renewed,
        member,
        event,
    })
}
