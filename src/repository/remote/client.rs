//! Table Service Client
//!
//! Opaque CRUD + query interface of the hosted table service. Rows travel as
//! JSON objects keyed by column name; every table has an `id` column.

use async_trait::async_trait;
use serde_json::Value;

use crate::repository::error::PersistenceResult;

#[async_trait]
pub trait TableClient: Send + Sync {
    /// Fetch every row, ascending by `order_by`
    async fn select_all(&self, table: &str, order_by: &str) -> PersistenceResult<Vec<Value>>;

    /// Insert one row and return it as stored (with server-assigned columns)
    async fn insert(&self, table: &str, row: Value) -> PersistenceResult<Value>;

    /// Patch the row with the given id
    async fn update(&self, table: &str, id: &str, patch: Value) -> PersistenceResult<()>;

    /// Delete the row with the given id
    async fn delete(&self, table: &str, id: &str) -> PersistenceResult<()>;

    /// Delete every row of the table
    async fn delete_all(&self, table: &str) -> PersistenceResult<()>;

    /// Insert rows, merging into existing rows with the same id
    async fn upsert(&self, table: &str, rows: Vec<Value>) -> PersistenceResult<()>;
}
