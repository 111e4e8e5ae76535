//! Payment endpoints

use crate::gateway::{Gateway, page_query, path_segment};
use gymdesk_core::types::{Page, Pagination, Payment, PaymentCreate};
use gymdesk_core::{Result, validate};
use reqwest::Method;

impl Gateway {
    /// `GET /payments/`, newest first, optionally for one client
    pub async fn list_payments(
        &self,
        client_id: Option<&str>,
        page: Pagination,
    ) -> Result<Page<Payment>> {
        let mut query = page_query(page);
        if let Some(client_id) = client_id {
            query.push(("client_id", path_segment(client_id)?.to_string()));
        }
        self.get_page("payments/", &query).await
    }

    pub async fn get_payment(&self, id: &str) -> Result<Payment> {
        let id = path_segment(id)?;
        self.get_json(&format!("payments/{}", id), &[]).await
    }

    /// Record a payment; a duplicate period surfaces as `Backend { status: 409 }`
    pub async fn create_payment(&self, input: &PaymentCreate) -> Result<Payment> {
        let input = validate::payment_create(input)?;
        self.send_json(Method::POST, "payments/", &[], Some(&input))
            .await
    }

    pub async fn delete_payment(&self, id: &str) -> Result<()> {
        let id = path_segment(id)?;
        self.delete(&format!("payments/{}", id)).await
    }
}
