use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::StoreError;
use crate::models::Item;
use crate::store::{KEY_ATTRIBUTE, TableSpec, TableStore};

struct Table {
    spec: TableSpec,
    rows: HashMap<String, Item>,
}

/// Tables held in process memory. Contents vanish on exit.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    create_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of create-table requests received, successful or not.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn table_spec(&self, table: &str) -> Option<TableSpec> {
        self.lock().ok()?.get(table).map(|t| t.spec.clone())
    }

    pub fn get(&self, table: &str, id: &str) -> Option<Item> {
        self.lock().ok()?.get(table)?.rows.get(id).cloned()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.rows.len()))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Table>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl TableStore for MemoryStore {
    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.lock()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_table(&self, name: &str, spec: &TableSpec) -> Result<(), StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.lock()?;
        if tables.contains_key(name) {
            return Err(StoreError::Backend(format!("table {} already exists", name)));
        }
        tables.insert(
            name.to_string(),
            Table {
                spec: spec.clone(),
                rows: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let key = item
            .get(target.spec.hash_key)
            .filter(|k| !k.is_empty())
            .cloned()
            .ok_or_else(|| StoreError::Backend(format!("item is missing key attribute '{}'", KEY_ATTRIBUTE)))?;

        target.rows.insert(key, item);
        Ok(())
    }
}
