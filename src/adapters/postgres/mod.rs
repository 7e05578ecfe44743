mod library_store;

pub use library_store::PostgresLibrary;

use crate::application::ServiceDependencies;
use crate::ports::NotificationService;
use std::sync::Arc;

/// PostgreSQLのストアを使う依存関係を組み立てる
pub fn postgres_dependencies(
    library: Arc<PostgresLibrary>,
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
