use std::collections::HashMap;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType, TableStatus,
};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::models::Item;
use crate::store::{TableSpec, TableStore};

const ACTIVE_POLL: Duration = Duration::from_secs(2);

fn backend_err(e: impl std::error::Error) -> StoreError {
    StoreError::Backend(DisplayErrorContext(e).to_string())
}

pub struct DynamoStore {
    client: Client,
    /// How long a freshly created table may stay in CREATING before we give up.
    active_timeout: Duration,
}

impl DynamoStore {
    pub fn new(client: Client, active_timeout: Duration) -> Self {
        Self { client, active_timeout }
    }

    /// Builds a client from the default AWS credential chain with the
    /// configured region (and endpoint override, e.g. DynamoDB Local).
    pub async fn connect(cfg: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));
        if let Some(endpoint) = &cfg.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        info!(
            "🔌 DynamoDB client ready (region: {}, endpoint: {})",
            cfg.region,
            cfg.endpoint_url.as_deref().unwrap_or("default")
        );

        Self::new(Client::new(&sdk_config), Duration::from_secs(cfg.active_timeout_secs))
    }

    /// Writes to a CREATING table are rejected, so block until it is ACTIVE.
    async fn wait_until_active(&self, name: &str) -> Result<(), StoreError> {
        let deadline = Instant::now() + self.active_timeout;
        loop {
            let out = self
                .client
                .describe_table()
                .table_name(name)
                .send()
                .await
                .map_err(backend_err)?;

            let status = out.table().and_then(|t| t.table_status());
            debug!("Table {} status: {:?}", name, status);
            if status == Some(&TableStatus::Active) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StoreError::NotActive(name.to_string()));
            }
            sleep(ACTIVE_POLL).await;
        }
    }
}

impl TableStore for DynamoStore {
    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;

        // ListTables pages at 100 names.
        loop {
            let out = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(backend_err)?;

            names.extend(out.table_names().iter().cloned());

            match out.last_evaluated_table_name() {
                Some(last) => start = Some(last.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn create_table(&self, name: &str, spec: &TableSpec) -> Result<(), StoreError> {
        let attribute = AttributeDefinition::builder()
            .attribute_name(spec.hash_key)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(backend_err)?;

        let key = KeySchemaElement::builder()
            .attribute_name(spec.hash_key)
            .key_type(KeyType::Hash)
            .build()
            .map_err(backend_err)?;

        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(spec.read_capacity)
            .write_capacity_units(spec.write_capacity)
            .build()
            .map_err(backend_err)?;

        self.client
            .create_table()
            .table_name(name)
            .attribute_definitions(attribute)
            .key_schema(key)
            .provisioned_throughput(throughput)
            .send()
            .await
            .map_err(backend_err)?;

        self.wait_until_active(name).await
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let attributes: HashMap<String, AttributeValue> =
            item.into_iter().map(|(k, v)| (k, AttributeValue::S(v))).collect();

        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(attributes))
            .send()
            .await
            .map_err(backend_err)?;

        Ok(())
    }
}
