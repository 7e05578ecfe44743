mod demo;
mod library_store;
mod notification_service;

pub use demo::seed_demo_data;
pub use library_store::InMemoryLibrary;
pub use notification_service::{LoggingNotificationService, SentNotification};

use crate::application::ServiceDependencies;
use crate::ports::NotificationService;
use std::sync::Arc;

/// メモリ上のストアだけで動く依存関係を組み立てる
pub fn in_memory_dependencies(
    library: Arc<InMemoryLibrary>,
    notifications: Arc<dyn NotificationService>,
) -> ServiceDependencies {
    ServiceDependencies {
        members: library.clone(),
        books: library.clone(),
        staff: library.clone(),
        borrowings: library.clone(),
        reservations: library.clone(),
        fines: library.clone(),
        unit_of_work: library,
        notifications,
    }
}
