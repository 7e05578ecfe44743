use crate::domain::{
    Book, BookId, Borrowing, BorrowingId, Fine, Member, MemberId, Reservation, ReservationId,
    Staff, StaffId,
};
use crate::ports::{
    BookRepository, BorrowingFilter, BorrowingRepository, BorrowingSortField, ChangeSet,
    CommitError, Document, DocumentWrite, FineLedger, MemberRepository, Page, PageRequest,
    PortError, ReservationFilter, ReservationRepository, ReservationSortField, Result,
    StaffDirectory, UnitOfWork, paginate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct LibraryState {
    members: HashMap<MemberId, Member>,
    books: HashMap<BookId, Book>,
    staff: HashMap<StaffId, Staff>,
    borrowings: BTreeMap<BorrowingId, Borrowing>,
    reservations: HashMap<ReservationId, Reservation>,
    fines: Vec<Fine>,
}

/// メモリ上のドキュメントストア
///
/// すべてのポートを1つのロックの下で実装する。
/// `commit`はロックを1回だけ取得して ChangeSet 全体を適用するため、
/// 他のリクエストから途中の状態が見えることはない。
///
/// DATABASE_URL が未設定のときの実行環境と、テストで使用する。
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    state: Mutex<LibraryState>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, LibraryState>> {
        self.state
            .lock()
            .map_err(|e| PortError::from(format!("library store lock poisoned: {}", e)))
    }

    /// 会員を登録する（初期データ投入用）
    pub fn add_member(&self, member: Member) -> Result<()> {
        self.state()?.members.insert(member.member_id, member);
        Ok(())
    }

    /// 書籍を登録する（初期データ投入用）
    pub fn add_book(&self, book: Book) -> Result<()> {
        self.state()?.books.insert(book.book_id, book);
        Ok(())
    }

    /// 職員を登録する（初期データ投入用）
    pub fn add_staff(&self, staff: Staff) -> Result<()> {
        self.state()?.staff.insert(staff.staff_id, staff);
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for InMemoryLibrary {
    async fn find_by_id(&self, member_id: MemberId) -> Result<Option<Member>> {
        Ok(self.state()?.members.get(&member_id).cloned())
    }
}

#[async_trait]
impl BookRepository for InMemoryLibrary {
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.state()?.books.get(&book_id).cloned())
    }
}

#[async_trait]
impl StaffDirectory for InMemoryLibrary {
    async fn find_by_id(&self, staff_id: StaffId) -> Result<Option<Staff>> {
        Ok(self.state()?.staff.get(&staff_id).cloned())
    }
}

#[async_trait]
impl BorrowingRepository for InMemoryLibrary {
    async fn find_by_id(&self, borrowing_id: &BorrowingId) -> Result<Option<Borrowing>> {
        Ok(self.state()?.borrowings.get(borrowing_id).cloned())
    }

    async fn last_id(&self) -> Result<Option<BorrowingId>> {
        Ok(self.state()?.borrowings.keys().next_back().cloned())
    }

    async fn find_page(
        &self,
        filter: &BorrowingFilter,
        request: &PageRequest<BorrowingSortField>,
    ) -> Result<Page<Borrowing>> {
        let matching: Vec<Borrowing> = self
            .state()?
            .borrowings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();

        Ok(paginate(matching, request, |field, a, b| field.compare(a, b)))
    }
}

#[async_trait]
impl ReservationRepository for InMemoryLibrary {
    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.state()?.reservations.get(&reservation_id).cloned())
    }

    async fn find_open(&self, member_id: MemberId, book_id: BookId) -> Result<Vec<Reservation>> {
        Ok(self
            .state()?
            .reservations
            .values()
            .filter(|r| r.member.member_id == member_id && r.book.book_id == book_id)
            .filter(|r| r.status.is_open())
            .cloned()
            .collect())
    }

    async fn has_waiting(&self, book_id: BookId) -> Result<bool> {
        Ok(self
            .state()?
            .reservations
            .values()
            .any(|r| r.book.book_id == book_id && r.status.is_waiting()))
    }

    async fn find_expired_waiting(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        Ok(self
            .state()?
            .reservations
            .values()
            .filter(|r| r.is_expired(now))
            .cloned()
            .collect())
    }

    async fn find_page(
        &self,
        filter: &ReservationFilter,
        request: &PageRequest<ReservationSortField>,
    ) -> Result<Page<Reservation>> {
        let matching: Vec<Reservation> = self
            .state()?
            .reservations
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        Ok(paginate(matching, request, |field, a, b| field.compare(a, b)))
    }
}

#[async_trait]
impl FineLedger for InMemoryLibrary {
    async fn find_by_member(&self, member_id: MemberId) -> Result<Vec<Fine>> {
        let mut fines: Vec<Fine> = self
            .state()?
            .fines
            .iter()
            .filter(|f| f.member_id == member_id)
            .cloned()
            .collect();
        fines.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(fines)
    }
}

/// ストア上の状態が、各書き込みの読み込み時の状態と同じか確かめる
fn ensure_unchanged<'a, T: Document + 'a>(
    writes: &[DocumentWrite<T>],
    stored: impl Fn(&T) -> Option<&'a T>,
) -> std::result::Result<(), CommitError> {
    match writes.iter().find(|w| !w.matches_stored(stored(&w.document))) {
        Some(write) => Err(write.conflict()),
        None => Ok(()),
    }
}

#[async_trait]
impl UnitOfWork for InMemoryLibrary {
    /// 全ドキュメントを検証してから適用する
    ///
    /// 1件でも競合すれば何も書き込まない。
    async fn commit(&self, changes: ChangeSet) -> std::result::Result<(), CommitError> {
        let mut state = self.state()?;

        ensure_unchanged(&changes.members, |m| state.members.get(&m.member_id))?;
        ensure_unchanged(&changes.books, |b| state.books.get(&b.book_id))?;
        ensure_unchanged(&changes.borrowings, |b| state.borrowings.get(&b.borrowing_id))?;
        ensure_unchanged(&changes.reservations, |r| {
            state.reservations.get(&r.reservation_id)
        })?;
        ensure_unchanged(&changes.fines, |f| {
            state.fines.iter().find(|stored| stored.fine_id == f.fine_id)
        })?;

        for write in changes.members {
            state.members.insert(write.document.member_id, write.document);
        }
        for write in changes.books {
            state.books.insert(write.document.book_id, write.document);
        }
        for write in changes.borrowings {
            state
                .borrowings
                .insert(write.document.borrowing_id.clone(), write.document);
        }
        for write in changes.reservations {
            state
                .reservations
                .insert(write.document.reservation_id, write.document);
        }
        for write in changes.fines {
            state.fines.push(write.document);
        }

        Ok(())
    }
}
