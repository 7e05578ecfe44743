use crate::domain::MemberId;
use crate::ports::{NotificationService, PortError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// A notification handed to [`LoggingNotificationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub member_id: MemberId,
    pub book_title: String,
    pub hold_until: DateTime<Utc>,
}

/// NotificationService that writes to the log instead of delivering.
///
/// Every call is recorded so callers can inspect what would have been sent.
#[derive(Debug, Default)]
pub struct LoggingNotificationService {
    sent: Mutex<Vec<SentNotification>>,
}

impl LoggingNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications recorded so far, oldest first.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationService for LoggingNotificationService {
    async fn send_reservation_ready(
        &self,
        member_id: MemberId,
        book_title: &str,
        hold_until: DateTime<Utc>,
    ) -> Result<()> {
        tracing::info!(
            member_id = %member_id,
            book_title,
            hold_until = %hold_until,
            "Reservation ready notification"
        );

        self.sent
            .lock()
            .map_err(|e| PortError::from(format!("notification log lock poisoned: {}", e)))?
            .push(SentNotification {
                member_id,
                book_title: book_title.to_string(),
                hold_until,
            });

        Ok(())
    }
}
