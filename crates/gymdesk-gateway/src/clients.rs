//! Client (gym member) endpoints

use crate::gateway::{Gateway, page_query, path_segment};
use gymdesk_core::types::{Client, ClientCreate, ClientStatus, ClientUpdate, Page, Pagination};
use gymdesk_core::{Result, validate};
use reqwest::Method;

impl Gateway {
    /// `GET /clients/`, optionally filtered by a free-text query
    pub async fn list_clients(&self, search: Option<&str>, page: Pagination) -> Result<Page<Client>> {
        let mut query = page_query(page);
        if let Some(q) = search.map(str::trim).filter(|q| !q.is_empty()) {
            query.push(("q", q.to_string()));
        }
        self.get_page("clients/", &query).await
    }

    pub async fn get_client(&self, id: &str) -> Result<Client> {
        let id = path_segment(id)?;
        self.get_json(&format!("clients/{}", id), &[]).await
    }

    pub async fn create_client(&self, input: &ClientCreate) -> Result<Client> {
        let input = validate::client_create(input)?;
        self.send_json(Method::POST, "clients/", &[], Some(&input))
            .await
    }

    pub async fn update_client(&self, id: &str, input: &ClientUpdate) -> Result<Client> {
        let id = path_segment(id)?;
        let input = validate::client_update(input)?;
        self.send_json(Method::PATCH, &format!("clients/{}", id), &[], Some(&input))
            .await
    }

    pub async fn delete_client(&self, id: &str) -> Result<()> {
        let id = path_segment(id)?;
        self.delete(&format!("clients/{}", id)).await
    }

    /// Whether the client has paid for the current month
    pub async fn client_status(&self, id: &str) -> Result<ClientStatus> {
        let id = path_segment(id)?;
        self.get_json(&format!("clients/{}/status", id), &[]).await
    }
}
