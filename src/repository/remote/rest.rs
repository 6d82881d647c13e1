//! REST Table Client
//!
//! Talks to a PostgREST-style endpoint (`<base>/rest/v1/<table>`) as exposed
//! by hosted backend-as-a-service projects.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use super::client::TableClient;
use crate::repository::error::{PersistenceError, PersistenceResult};

#[derive(Debug, Clone)]
pub struct RestTableClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestTableClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

fn id_filter(id: &str) -> [(&'static str, String); 1] {
    [("id", format!("eq.{}", id))]
}

#[async_trait]
impl TableClient for RestTableClient {
    async fn select_all(&self, table: &str, order_by: &str) -> PersistenceResult<Vec<Value>> {
        let order = format!("{}.asc", order_by);
        let rows = self
            .request(Method::GET, table)
            .query(&[("select", "*"), ("order", order.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Value>>()
            .await?;
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> PersistenceResult<Value> {
        let mut stored = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Value>>()
            .await?;

        if stored.is_empty() {
            return Err(PersistenceError::remote(table, "insert returned no rows"));
        }
        Ok(stored.swap_remove(0))
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> PersistenceResult<()> {
        self.request(Method::PATCH, table)
            .query(&id_filter(id))
            .json(&patch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> PersistenceResult<()> {
        self.request(Method::DELETE, table)
            .query(&id_filter(id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_all(&self, table: &str) -> PersistenceResult<()> {
        // the service refuses unfiltered deletes
        self.request(Method::DELETE, table)
            .query(&[("id", "not.is.null")])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>) -> PersistenceResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.request(Method::POST, table)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&rows)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
