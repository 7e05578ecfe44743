use crate::domain::{Book, Borrowing, Fine, Member, Reservation};
use async_trait::async_trait;
use thiserror::Error;

use super::PortError;

/// ChangeSet に含められるドキュメント
pub trait Document: Clone + PartialEq {
    /// 競合エラーに載せる種別名
    const KIND: &'static str;

    fn document_id(&self) -> String;
}

impl Document for Member {
    const KIND: &'static str = "Member";

    fn document_id(&self) -> String {
        self.member_id.to_string()
    }
}

impl Document for Book {
    const KIND: &'static str = "Book";

    fn document_id(&self) -> String {
        self.book_id.to_string()
    }
}

impl Document for Borrowing {
    const KIND: &'static str = "Borrowing";

    fn document_id(&self) -> String {
        self.borrowing_id.to_string()
    }
}

impl Document for Reservation {
    const KIND: &'static str = "Reservation";

    fn document_id(&self) -> String {
        self.reservation_id.to_string()
    }
}

impl Document for Fine {
    const KIND: &'static str = "Fine";

    fn document_id(&self) -> String {
        self.fine_id.to_string()
    }
}

/// ドキュメント1件の書き込み
///
/// `expected`は操作の開始時に読み込んだ状態。ストア上の状態がこれと
/// 一致するときだけ`document`で置き換える（楽観的排他制御）。
/// `expected`が None なら新規作成で、同じIDが既にあれば競合になる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentWrite<T> {
    pub expected: Option<T>,
    pub document: T,
}

impl<T: Document> DocumentWrite<T> {
    pub fn insert(document: T) -> Self {
        Self {
            expected: None,
            document,
        }
    }

    pub fn update(expected: T, document: T) -> Self {
        Self {
            expected: Some(expected),
            document,
        }
    }

    /// ストア上の現在の状態が、読み込んだときと同じか
    pub fn matches_stored(&self, stored: Option<&T>) -> bool {
        self.expected.as_ref() == stored
    }

    pub fn conflict(&self) -> CommitError {
        CommitError::Conflict {
            kind: T::KIND,
            id: self.document.document_id(),
        }
    }
}

/// 1回の操作で書き込むドキュメントの集合
///
/// 各ドキュメントは完全な状態で保存する。部分更新は行わない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub members: Vec<DocumentWrite<Member>>,
    pub books: Vec<DocumentWrite<Book>>,
    pub borrowings: Vec<DocumentWrite<Borrowing>>,
    pub reservations: Vec<DocumentWrite<Reservation>>,
    pub fines: Vec<DocumentWrite<Fine>>,
}

/// 読み込んだドキュメントと更新後のドキュメントをIDで対応付ける
fn pair_with<'a, T: Document + 'a>(
    expected: &'a [T],
    updated: impl IntoIterator<Item = T, IntoIter: 'a>,
) -> impl Iterator<Item = DocumentWrite<T>> + 'a {
    updated.into_iter().map(move |document| {
        let id = document.document_id();
        match expected.iter().find(|e| e.document_id() == id) {
            Some(before) => DocumentWrite::update(before.clone(), document),
            None => DocumentWrite::insert(document),
        }
    })
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_member(mut self, expected: &Member, member: Member) -> Self {
        self.members.push(DocumentWrite::update(expected.clone(), member));
        self
    }

    pub fn update_book(mut self, expected: &Book, book: Book) -> Self {
        self.books.push(DocumentWrite::update(expected.clone(), book));
        self
    }

    pub fn insert_borrowing(mut self, borrowing: Borrowing) -> Self {
        self.borrowings.push(DocumentWrite::insert(borrowing));
        self
    }

    pub fn update_borrowing(mut self, expected: &Borrowing, borrowing: Borrowing) -> Self {
        self.borrowings.push(DocumentWrite::update(expected.clone(), borrowing));
        self
    }

    pub fn insert_reservation(mut self, reservation: Reservation) -> Self {
        self.reservations.push(DocumentWrite::insert(reservation));
        self
    }

    pub fn update_reservation(mut self, expected: &Reservation, reservation: Reservation) -> Self {
        self.reservations.push(DocumentWrite::update(expected.clone(), reservation));
        self
    }

    /// `expected`は読み込んだ予約。IDが一致しないものは新規作成として扱う
    pub fn update_reservations(
        mut self,
        expected: &[Reservation],
        reservations: impl IntoIterator<Item = Reservation>,
    ) -> Self {
        self.reservations.extend(pair_with(expected, reservations));
        self
    }

    pub fn insert_fines(mut self, fines: impl IntoIterator<Item = Fine>) -> Self {
        self.fines.extend(fines.into_iter().map(DocumentWrite::insert));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
            && self.books.is_empty()
            && self.borrowings.is_empty()
            && self.reservations.is_empty()
            && self.fines.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.members.len()
            + self.books.len()
            + self.borrowings.len()
            + self.reservations.len()
            + self.fines.len()
    }
}

/// コミットのエラー
#[derive(Debug, Error)]
pub enum CommitError {
    /// 読み込んでからコミットするまでに、他の操作がドキュメントを変更した
    #[error("{kind} {id} was changed by another operation")]
    Conflict { kind: &'static str, id: String },

    /// ストアの障害
    #[error("Store error: {0}")]
    Store(#[from] PortError),
}

impl CommitError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommitError::Conflict { .. })
    }
}

/// ユニットオブワークポート
///
/// 1回の操作（貸出・返却・更新・予約）で変更された全ドキュメントを
/// アトミックにコミットする。途中で失敗した場合、または1件でも競合した場合は
/// 何も書き込まれない。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn commit(&self, changes: ChangeSet) -> Result<(), CommitError>;
}
