//! Attendance endpoints and per-client statistics

use crate::gateway::{Gateway, page_query, path_segment};
use gymdesk_core::Result;
use gymdesk_core::types::{Attendance, CheckinReceipt, ClientStats, Page, Pagination};
use reqwest::Method;
use tracing::debug;

/// Upper bound on check-ins fetched when counting a client's attendance
pub const ATTENDANCE_COUNT_LIMIT: u32 = 1000;

impl Gateway {
    /// `GET /attendance/`, newest first, optionally for one client
    pub async fn list_attendance(
        &self,
        client_id: Option<&str>,
        page: Pagination,
    ) -> Result<Page<Attendance>> {
        let mut query = page_query(page);
        if let Some(client_id) = client_id {
            query.push(("client_id", path_segment(client_id)?.to_string()));
        }
        self.get_page("attendance/", &query).await
    }

    /// Register a check-in for `client_id`
    pub async fn check_in(&self, client_id: &str) -> Result<CheckinReceipt> {
        let query = [("client_id", path_segment(client_id)?.to_string())];
        self.send_json::<(), _>(Method::POST, "attendance/", &query, None)
            .await
    }

    /// Last payment and attendance count, fetched concurrently
    pub async fn client_stats(&self, client_id: &str) -> Result<ClientStats> {
        let (payments, attendance) = futures::try_join!(
            self.list_payments(Some(client_id), Pagination::new(1, 0)),
            self.list_attendance(
                Some(client_id),
                Pagination::new(ATTENDANCE_COUNT_LIMIT, 0)
            ),
        )?;

        debug!(
            client_id,
            attendance_total = attendance.total,
            "Fetched client stats"
        );

        Ok(ClientStats {
            last_payment: payments.items.into_iter().next(),
            attendance_count: attendance.total,
        })
    }
}
