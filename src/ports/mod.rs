pub mod book_repository;
pub mod borrowing_repository;
pub mod fine_ledger;
pub mod member_repository;
pub mod notification_service;
pub mod pagination;
pub mod reservation_repository;
pub mod staff_directory;
pub mod unit_of_work;

pub use book_repository::*;
pub use borrowing_repository::*;
pub use fine_ledger::*;
pub use member_repository::*;
pub use notification_service::*;
pub use pagination::*;
pub use reservation_repository::*;
pub use staff_directory::*;
pub use unit_of_work::*;

/// ポート実装が返すエラー（ストア・通知先の障害）
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, PortError>;
