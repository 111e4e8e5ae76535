//! Where search results and per-client statistics come from

use async_trait::async_trait;
use gymdesk_core::Result;
use gymdesk_core::types::{Client, ClientStats, Page, Pagination};
use gymdesk_gateway::Gateway;

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Clients matching `query`, at most `limit` of them
    async fn search(&self, query: &str, limit: u32) -> Result<Page<Client>>;

    /// Secondary statistics for one client
    async fn stats(&self, client_id: &str) -> Result<ClientStats>;
}

#[async_trait]
impl SearchBackend for Gateway {
    async fn search(&self, query: &str, limit: u32) -> Result<Page<Client>> {
        self.list_clients(Some(query), Pagination::new(limit, 0))
            .await
    }

    async fn stats(&self, client_id: &str) -> Result<ClientStats> {
        self.client_stats(client_id).await
    }
}
