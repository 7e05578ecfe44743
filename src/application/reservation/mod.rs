mod expiry_sweep;
mod queries;
mod reservation_service;

pub use expiry_sweep::expire_reservations;
pub use queries::{get_reservation, list_reservations};
pub use reservation_service::{
    reserve_book, send_reservation_notification, update_reservation_status,
};
