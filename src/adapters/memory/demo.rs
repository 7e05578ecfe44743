use crate::domain::{Book, BookCopy, BookId, CopyId, Member, MemberId, Staff, StaffId};
use crate::ports::Result;
use chrono::{Duration, Utc};

use super::InMemoryLibrary;

/// メモリ上のストアで起動したときの初期データ
///
/// 職員1名・会員1名・書籍2タイトルを登録し、IDをログに出す。
pub fn seed_demo_data(library: &InMemoryLibrary) -> Result<()> {
    let staff = Staff {
        staff_id: StaffId::new(),
        name: "Front Desk".to_string(),
        role: "circulation".to_string(),
    };
    let member = Member::new(MemberId::new(), "Demo Member", Utc::now() + Duration::days(365));

    let books = [
        ("Domain Modeling Made Functional", "Scott Wlaschin", 2),
        ("The Rust Programming Language", "Steve Klabnik, Carol Nichols", 1),
    ]
    .into_iter()
    .map(|(title, author, copies)| Book {
        book_id: BookId::new(),
        title: title.to_string(),
        author: author.to_string(),
        isbn: None,
        copies: (1..=copies)
            .map(|n| BookCopy::new(CopyId::new(format!("C{}", n))))
            .collect(),
    });

    tracing::info!(staff_id = %staff.staff_id, "Demo staff");
    tracing::info!(member_id = %member.member_id, "Demo member");
    library.add_staff(staff)?;
    library.add_member(member)?;
    for book in books {
        tracing::info!(book_id = %book.book_id, title = %book.title, "Demo book");
        library.add_book(book)?;
    }

    Ok(())
}
