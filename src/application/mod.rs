pub mod borrowing;
mod dependencies;
mod errors;
mod lookups;
mod retry;
pub mod reservation;

pub use borrowing::{
    ReturnReceipt, borrow_book, fines_for_member, get_borrowing, list_borrowings, renew_borrowing,
    return_book,
};
pub use dependencies::ServiceDependencies;
pub use errors::{CirculationError, ErrorKind, Result};
pub use reservation::{
    expire_reservations, get_reservation, list_reservations, reserve_book,
    send_reservation_notification, update_reservation_status,
};
