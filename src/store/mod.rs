//! Destination table access
//!
//! - `TableStore`: the three backend calls the pipeline needs
//! - `dynamo`: DynamoDB backend
//! - `memory`: in-process backend for dry runs
//!
//! `ensure_table` and `put_record` are the schema guarantor and upserter
//! built on top of any backend.

pub mod dynamo;
pub mod memory;

use std::future::Future;

use tracing::{debug, info};

use crate::error::{ProvisionError, StoreError, WriteError};
use crate::models::{AssetRecord, Item};

/// Partition key attribute of the destination table.
pub const KEY_ATTRIBUTE: &str = "id";

/// Fixed key schema and throughput for the asset table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Single string hash key.
    pub hash_key: &'static str,
    pub read_capacity: i64,
    pub write_capacity: i64,
}

impl TableSpec {
    pub const ASSETS: TableSpec = TableSpec {
        hash_key: KEY_ATTRIBUTE,
        read_capacity: 1,
        write_capacity: 1,
    };
}

pub trait TableStore {
    fn list_tables(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    fn create_table(
        &self,
        name: &str,
        spec: &TableSpec,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Unconditional put: creates the row or replaces it whole.
    fn put_item(&self, table: &str, item: Item) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Existed,
    Created,
}

/// Makes sure `name` exists, creating it with `TableSpec::ASSETS` if not.
/// Safe to call every cycle.
pub async fn ensure_table<S: TableStore>(store: &S, name: &str) -> Result<Provisioned, ProvisionError> {
    let tables = store.list_tables().await.map_err(ProvisionError::List)?;

    if tables.iter().any(|t| t == name) {
        debug!("Table {} already exists", name);
        return Ok(Provisioned::Existed);
    }

    store
        .create_table(name, &TableSpec::ASSETS)
        .await
        .map_err(|source| ProvisionError::Create {
            table: name.to_string(),
            source,
        })?;

    info!("🗄️ Created table {} (hash key '{}')", name, KEY_ATTRIBUTE);
    Ok(Provisioned::Created)
}

/// Writes one asset under its id, replacing any previous row.
pub async fn put_record<S: TableStore>(store: &S, record: &AssetRecord, table: &str) -> Result<(), WriteError> {
    store
        .put_item(table, record.to_item())
        .await
        .map_err(|source| WriteError {
            id: record.id.clone(),
            source,
        })
}
