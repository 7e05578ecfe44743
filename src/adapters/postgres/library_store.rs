use crate::domain::{
    Book, BookId, Borrowing, BorrowingId, Fine, Member, MemberId, Reservation, ReservationId,
    ReservationStatus, Staff, StaffId,
};
use crate::ports::{
    BookRepository, BorrowingFilter, BorrowingRepository, BorrowingSortField, ChangeSet,
    CommitError, Document, DocumentWrite, FineLedger, MemberRepository, Page, PageRequest,
    PortError, ReservationFilter, ReservationRepository, ReservationSortField, Result,
    SortDirection, SortField, StaffDirectory, UnitOfWork,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};

/// `doc`列のJSONをドキュメントに復元する
fn decode_doc<T: DeserializeOwned>(row: &PgRow) -> Result<T> {
    let doc: serde_json::Value = row.try_get("doc")?;
    Ok(serde_json::from_value(doc)?)
}

/// ORDER BY句を組み立てる
///
/// NULLはメモリ上の比較（None < Some）と同じく、昇順で先頭・降順で末尾に並べる。
fn order_by(column: &str, direction: SortDirection, tiebreaker: &str) -> String {
    let (dir, nulls) = match direction {
        SortDirection::Ascending => ("ASC", "FIRST"),
        SortDirection::Descending => ("DESC", "LAST"),
    };
    format!(" ORDER BY {column} {dir} NULLS {nulls}, {tiebreaker} {dir}")
}

fn push_limit_offset<F: SortField>(builder: &mut QueryBuilder<'_, Postgres>, request: &PageRequest<F>) {
    builder
        .push(" LIMIT ")
        .push_bind(i64::from(request.limit))
        .push(" OFFSET ")
        .push_bind(i64::try_from(request.skip()).unwrap_or(i64::MAX));
}

fn push_borrowing_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BorrowingFilter) {
    builder.push(" WHERE TRUE");
    if let Some(member_id) = filter.member_id {
        builder.push(" AND member_id = ").push_bind(member_id.value());
    }
    if let Some(book_id) = filter.book_id {
        builder.push(" AND book_id = ").push_bind(book_id.value());
    }
    if let Some(copy_id) = &filter.copy_id {
        builder
            .push(" AND copy_id = ")
            .push_bind(copy_id.as_str().to_string());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(due_before) = filter.due_before {
        builder.push(" AND due_date < ").push_bind(due_before);
    }
}

fn borrowing_sort_column(field: BorrowingSortField) -> &'static str {
    match field {
        BorrowingSortField::BorrowDate => "borrow_date",
        BorrowingSortField::DueDate => "due_date",
        BorrowingSortField::ReturnDate => "return_date",
        BorrowingSortField::Status => r#"status COLLATE "C""#,
        BorrowingSortField::BorrowingId => "seq",
    }
}

fn push_reservation_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ReservationFilter) {
    builder.push(" WHERE TRUE");
    if let Some(member_id) = filter.member_id {
        builder.push(" AND member_id = ").push_bind(member_id.value());
    }
    if let Some(book_id) = filter.book_id {
        builder.push(" AND book_id = ").push_bind(book_id.value());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}

fn reservation_sort_column(field: ReservationSortField) -> &'static str {
    match field {
        ReservationSortField::ReservationDate => "reservation_date",
        ReservationSortField::ExpiryDate => "expiry_date",
        ReservationSortField::Status => r#"status COLLATE "C""#,
    }
}

type CommitResult = std::result::Result<(), CommitError>;

fn to_doc<T: Serialize>(document: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(document)?)
}

/// INSERTの一意制約違反は、同じIDが先に作成されたことを意味する
fn insert_error<T: Document>(write: &DocumentWrite<T>, err: sqlx::Error) -> CommitError {
    let unique_violation = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique_violation {
        write.conflict()
    } else {
        CommitError::Store(err.into())
    }
}

/// 条件付きUPDATEが0件なら、読み込んだ後に他の操作が書き換えている
fn ensure_updated<T: Document>(write: &DocumentWrite<T>, result: PgQueryResult) -> CommitResult {
    if result.rows_affected() == 0 {
        return Err(write.conflict());
    }
    Ok(())
}

async fn upsert_member(conn: &mut PgConnection, member: &Member) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO members (member_id, doc, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (member_id)
        DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
        "#,
    )
    .bind(member.member_id.value())
    .bind(to_doc(member)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_book(conn: &mut PgConnection, book: &Book) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO books (book_id, doc, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (book_id)
        DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
        "#,
    )
    .bind(book.book_id.value())
    .bind(to_doc(book)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// 会員ドキュメントを、読み込んだときの内容と一致する場合だけ書き換える
async fn write_member(conn: &mut PgConnection, write: &DocumentWrite<Member>) -> CommitResult {
    let Some(expected) = &write.expected else {
        return sqlx::query(
            r#"
            INSERT INTO members (member_id, doc, updated_at)
            VALUES ($1, $2, NOW())
            "#,
        )
        .bind(write.document.member_id.value())
        .bind(to_doc(&write.document)?)
        .execute(&mut *conn)
        .await
        .map(|_| ())
        .map_err(|e| insert_error(write, e));
    };

    let result = sqlx::query(
        r#"
        UPDATE members
        SET doc = $2, updated_at = NOW()
        WHERE member_id = $1 AND doc = $3
        "#,
    )
    .bind(write.document.member_id.value())
    .bind(to_doc(&write.document)?)
    .bind(to_doc(expected)?)
    .execute(&mut *conn)
    .await
    .map_err(PortError::from)?;

    ensure_updated(write, result)
}

/// 書籍ドキュメントを、読み込んだときの内容と一致する場合だけ書き換える
///
/// 同じ書籍の別のコピーを同時に貸し出した場合も、後からコミットした側が競合になる。
async fn write_book(conn: &mut PgConnection, write: &DocumentWrite<Book>) -> CommitResult {
    let Some(expected) = &write.expected else {
        return sqlx::query(
            r#"
            INSERT INTO books (book_id, doc, updated_at)
            VALUES ($1, $2, NOW())
            "#,
        )
        .bind(write.document.book_id.value())
        .bind(to_doc(&write.document)?)
        .execute(&mut *conn)
        .await
        .map(|_| ())
        .map_err(|e| insert_error(write, e));
    };

    let result = sqlx::query(
        r#"
        UPDATE books
        SET doc = $2, updated_at = NOW()
        WHERE book_id = $1 AND doc = $3
        "#,
    )
    .bind(write.document.book_id.value())
    .bind(to_doc(&write.document)?)
    .bind(to_doc(expected)?)
    .execute(&mut *conn)
    .await
    .map_err(PortError::from)?;

    ensure_updated(write, result)
}

/// 新しい貸出はON CONFLICTなしでINSERTする
///
/// borrowing_id（主キー）と seq（UNIQUE）のどちらかが重複すれば競合になる。
async fn write_borrowing(
    conn: &mut PgConnection,
    write: &DocumentWrite<Borrowing>,
) -> CommitResult {
    let borrowing = &write.document;

    let Some(expected) = &write.expected else {
        return sqlx::query(
            r#"
            INSERT INTO borrowings (
                borrowing_id,
                seq,
                member_id,
                book_id,
                copy_id,
                status,
                borrow_date,
                due_date,
                return_date,
                doc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(borrowing.borrowing_id.to_string())
        .bind(i32::try_from(borrowing.borrowing_id.sequence()).map_err(PortError::from)?)
        .bind(borrowing.member.member_id.value())
        .bind(borrowing.copy.book.book_id.value())
        .bind(borrowing.copy.copy_id.as_str())
        .bind(borrowing.status.as_str())
        .bind(borrowing.borrow_date)
        .bind(borrowing.due_date)
        .bind(borrowing.return_date)
        .bind(to_doc(borrowing)?)
        .execute(&mut *conn)
        .await
        .map(|_| ())
        .map_err(|e| insert_error(write, e));
    };

    let result = sqlx::query(
        r#"
        UPDATE borrowings
        SET status = $2, due_date = $3, return_date = $4, doc = $5
        WHERE borrowing_id = $1 AND doc = $6
        "#,
    )
    .bind(borrowing.borrowing_id.to_string())
    .bind(borrowing.status.as_str())
    .bind(borrowing.due_date)
    .bind(borrowing.return_date)
    .bind(to_doc(borrowing)?)
    .bind(to_doc(expected)?)
    .execute(&mut *conn)
    .await
    .map_err(PortError::from)?;

    ensure_updated(write, result)
}

async fn write_reservation(
    conn: &mut PgConnection,
    write: &DocumentWrite<Reservation>,
) -> CommitResult {
    let reservation = &write.document;

    let Some(expected) = &write.expected else {
        return sqlx::query(
            r#"
            INSERT INTO reservations (
                reservation_id,
                member_id,
                book_id,
                status,
                reservation_date,
                expiry_date,
                doc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.member.member_id.value())
        .bind(reservation.book.book_id.value())
        .bind(reservation.status.as_str())
        .bind(reservation.reservation_date)
        .bind(reservation.expiry_date)
        .bind(to_doc(reservation)?)
        .execute(&mut *conn)
        .await
        .map(|_| ())
        .map_err(|e| insert_error(write, e));
    };

    let result = sqlx::query(
        r#"
        UPDATE reservations
        SET status = $2, expiry_date = $3, doc = $4
        WHERE reservation_id = $1 AND doc = $5
        "#,
    )
    .bind(reservation.reservation_id.value())
    .bind(reservation.status.as_str())
    .bind(reservation.expiry_date)
    .bind(to_doc(reservation)?)
    .bind(to_doc(expected)?)
    .execute(&mut *conn)
    .await
    .map_err(PortError::from)?;

    ensure_updated(write, result)
}

/// 延滞金の台帳レコードは追記のみ
async fn insert_fine(conn: &mut PgConnection, write: &DocumentWrite<Fine>) -> CommitResult {
    let fine = &write.document;
    sqlx::query(
        r#"
        INSERT INTO fines (fine_id, member_id, borrowing_id, issued_at, doc)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(fine.fine_id.value())
    .bind(fine.member_id.value())
    .bind(fine.borrowing_id.to_string())
    .bind(fine.issued_at)
    .bind(to_doc(fine)?)
    .execute(&mut *conn)
    .await
    .map(|_| ())
    .map_err(|e| insert_error(write, e))
}

/// PostgreSQL上のドキュメントストア
///
/// 各ドキュメントは`doc`列（JSONB）に完全な状態で保存し、
/// 絞り込み・ソートに使う値だけを通常の列として複製する。
/// `commit`は1つのトランザクションで ChangeSet 全体を書き込む。
pub struct PostgresLibrary {
    pool: PgPool,
}

impl PostgresLibrary {
    /// PostgreSQLコネクションプールから新しいストアを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 会員を登録・更新する（初期データ投入用）
    pub async fn save_member(&self, member: &Member) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_member(&mut conn, member).await
    }

    /// 書籍を登録・更新する（初期データ投入用）
    pub async fn save_book(&self, book: &Book) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_book(&mut conn, book).await
    }

    /// 職員を登録・更新する
    pub async fn save_staff(&self, staff: &Staff) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO staff (staff_id, doc)
            VALUES ($1, $2)
            ON CONFLICT (staff_id)
            DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(staff.staff_id.value())
        .bind(to_doc(staff)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for PostgresLibrary {
    async fn find_by_id(&self, member_id: MemberId) -> Result<Option<Member>> {
        let row = sqlx::query("SELECT doc FROM members WHERE member_id = $1")
            .bind(member_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_doc).transpose()
    }
}

#[async_trait]
impl BookRepository for PostgresLibrary {
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query("SELECT doc FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_doc).transpose()
    }
}

#[async_trait]
impl StaffDirectory for PostgresLibrary {
    async fn find_by_id(&self, staff_id: StaffId) -> Result<Option<Staff>> {
        let row = sqlx::query("SELECT doc FROM staff WHERE staff_id = $1")
            .bind(staff_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_doc).transpose()
    }
}

#[async_trait]
impl BorrowingRepository for PostgresLibrary {
    async fn find_by_id(&self, borrowing_id: &BorrowingId) -> Result<Option<Borrowing>> {
        let row = sqlx::query("SELECT doc FROM borrowings WHERE borrowing_id = $1")
            .bind(borrowing_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_doc).transpose()
    }

    async fn last_id(&self) -> Result<Option<BorrowingId>> {
        let last: Option<String> =
            sqlx::query_scalar("SELECT borrowing_id FROM borrowings ORDER BY seq DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        match last {
            Some(id) => Ok(Some(id.parse::<BorrowingId>()?)),
            None => Ok(None),
        }
    }

    /// 件数と1ページ分の行を別々のクエリで取得する
    async fn find_page(
        &self,
        filter: &BorrowingFilter,
        request: &PageRequest<BorrowingSortField>,
    ) -> Result<Page<Borrowing>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM borrowings");
        push_borrowing_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT doc FROM borrowings");
        push_borrowing_filter(&mut select, filter);
        select.push(order_by(
            borrowing_sort_column(request.sort.field),
            request.sort.direction,
            "seq",
        ));
        push_limit_offset(&mut select, request);
        let rows = select.build().fetch_all(&self.pool).await?;

        let items = rows.iter().map(decode_doc).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, u64::try_from(total)?, request))
    }
}

#[async_trait]
impl ReservationRepository for PostgresLibrary {
    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query("SELECT doc FROM reservations WHERE reservation_id = $1")
            .bind(reservation_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_doc).transpose()
    }

    async fn find_open(&self, member_id: MemberId, book_id: BookId) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM reservations
            WHERE member_id = $1 AND book_id = $2 AND status IN ($3, $4)
            ORDER BY reservation_date ASC
            "#,
        )
        .bind(member_id.value())
        .bind(book_id.value())
        .bind(ReservationStatus::Waiting.as_str())
        .bind(ReservationStatus::Claimed.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_doc).collect()
    }

    async fn has_waiting(&self, book_id: BookId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reservations WHERE book_id = $1 AND status = $2)",
        )
        .bind(book_id.value())
        .bind(ReservationStatus::Waiting.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// (expiry_date) WHERE status = 'Waiting' の部分インデックスを使用
    async fn find_expired_waiting(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM reservations
            WHERE status = 'Waiting' AND expiry_date < $1
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_doc).collect()
    }

    async fn find_page(
        &self,
        filter: &ReservationFilter,
        request: &PageRequest<ReservationSortField>,
    ) -> Result<Page<Reservation>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reservations");
        push_reservation_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT doc FROM reservations");
        push_reservation_filter(&mut select, filter);
        select.push(order_by(
            reservation_sort_column(request.sort.field),
            request.sort.direction,
            "reservation_id",
        ));
        push_limit_offset(&mut select, request);
        let rows = select.build().fetch_all(&self.pool).await?;

        let items = rows.iter().map(decode_doc).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, u64::try_from(total)?, request))
    }
}

#[async_trait]
impl FineLedger for PostgresLibrary {
    async fn find_by_member(&self, member_id: MemberId) -> Result<Vec<Fine>> {
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM fines
            WHERE member_id = $1
            ORDER BY issued_at DESC
            "#,
        )
        .bind(member_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_doc).collect()
    }
}

#[async_trait]
impl UnitOfWork for PostgresLibrary {
    /// ChangeSet を1つのトランザクションで書き込む
    ///
    /// 更新は読み込んだときの`doc`と一致する行だけを対象にする。
    /// 競合やエラーが起きるとトランザクションは commit されずにドロップされ、
    /// ロールバックされる。
    async fn commit(&self, changes: ChangeSet) -> CommitResult {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(PortError::from)?;

        for write in &changes.members {
            write_member(&mut tx, write).await?;
        }
        for write in &changes.books {
            write_book(&mut tx, write).await?;
        }
        for write in &changes.borrowings {
            write_borrowing(&mut tx, write).await?;
        }
        for write in &changes.reservations {
            write_reservation(&mut tx, write).await?;
        }
        for write in &changes.fines {
            insert_fine(&mut tx, write).await?;
        }

        tx.commit().await.map_err(PortError::from)?;

        tracing::debug!(documents = changes.document_count(), "Change set committed");
        Ok(())
    }
}
