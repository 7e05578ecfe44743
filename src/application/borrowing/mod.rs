mod borrowing_service;
mod queries;

pub use borrowing_service::{ReturnReceipt, borrow_book, renew_borrowing, return_book};
pub use queries::{fines_for_member, get_borrowing, list_borrowings};
