//! Document store backed by the embedded redb database
//!
//! Every collection is one redb table. Keys are store-assigned document ids,
//! values are JSON objects. The store does not know the shape of the records
//! it holds; strict typing happens in [`Document::into_record`].

use std::sync::Arc;

use async_trait::async_trait;
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::query::{self, Filter};

const TABLE_PROPERTIES: TableDefinition<&str, &str> = TableDefinition::new("properties_v1");
const TABLE_BUILDERS: TableDefinition<&str, &str> = TableDefinition::new("builders_v1");
const TABLE_BROKERS: TableDefinition<&str, &str> = TableDefinition::new("brokers_v1");
const TABLE_LEADS: TableDefinition<&str, &str> = TableDefinition::new("leads_v1");
const TABLE_TICKETS: TableDefinition<&str, &str> = TableDefinition::new("tickets_v1");

/// Length of generated document ids.
const ID_LEN: usize = 20;

/// Named document collections. All tenants share a collection; records are
/// scoped by their owner id field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Properties,
    Builders,
    Brokers,
    Leads,
    Tickets,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Properties,
        Collection::Builders,
        Collection::Brokers,
        Collection::Leads,
        Collection::Tickets,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Properties => "properties",
            Collection::Builders => "builders",
            Collection::Brokers => "brokers",
            Collection::Leads => "leads",
            Collection::Tickets => "tickets",
        }
    }

    fn table(self) -> TableDefinition<'static, &'static str, &'static str> {
        match self {
            Collection::Properties => TABLE_PROPERTIES,
            Collection::Builders => TABLE_BUILDERS,
            Collection::Brokers => TABLE_BROKERS,
            Collection::Leads => TABLE_LEADS,
            Collection::Tickets => TABLE_TICKETS,
        }
    }
}

/// A stored JSON object together with its store-assigned identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Decodes the document into a strict record type, tagging it with the
    /// store-assigned id under the `id` key.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let mut data = self.data;
        if let Value::Object(map) = &mut data {
            map.insert("id".to_string(), Value::String(self.id));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Read/write access to the document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every document in `collection` matching all `filters`.
    ///
    /// Membership filters must carry between 1 and
    /// [`MAX_IN_VALUES`](crate::query::MAX_IN_VALUES) values.
    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Stores `data` under a freshly generated id and returns the new document.
    async fn insert(&self, collection: Collection, data: Value) -> Result<Document, StoreError>;

    /// Replaces an existing document. Fails with `NotFound` if `id` is absent.
    async fn put(&self, collection: Collection, id: &str, data: Value) -> Result<(), StoreError>;

    /// Removes a document, returning whether it existed.
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;
}

/// Initializes the embedded database and creates every collection table.
pub fn init_db(db_path: &str) -> Result<Database, StoreError> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    for collection in Collection::ALL {
        write_txn.open_table(collection.table())?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// [`DocumentStore`] over a redb database. Transactions run on the blocking
/// pool so concurrent queries do not stall the async runtime.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Ok(Self::new(init_db(db_path)?))
    }
}

fn generate_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// The stored JSON never carries the id; it lives in the key.
fn strip_id(mut data: Value) -> Value {
    if let Value::Object(map) = &mut data {
        map.remove("id");
    }
    data
}

#[async_trait]
impl DocumentStore for RedbStore {
    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        query::validate(filters).map_err(|reason| StoreError::InvalidQuery { reason })?;

        let db = self.db.clone();
        let filter_count = filters.len();
        let filters = filters.to_vec();

        let docs = tokio::task::spawn_blocking(move || -> Result<Vec<Document>, StoreError> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(collection.table())?;

            let mut docs = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let data: Value = serde_json::from_str(value.value())?;
                let id = key.value();
                if filters.iter().all(|f| f.matches(id, &data)) {
                    docs.push(Document {
                        id: id.to_string(),
                        data,
                    });
                }
            }
            Ok(docs)
        })
        .await??;

        debug!(
            collection = collection.name(),
            filters = filter_count,
            matched = docs.len(),
            "query finished"
        );
        Ok(docs)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let db = self.db.clone();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<Document>, StoreError> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(collection.table())?;

            match table.get(id.as_str())? {
                Some(value) => Ok(Some(Document {
                    id: id.clone(),
                    data: serde_json::from_str(value.value())?,
                })),
                None => Ok(None),
            }
        })
        .await?
    }

    async fn insert(&self, collection: Collection, data: Value) -> Result<Document, StoreError> {
        let db = self.db.clone();
        let data = strip_id(data);

        tokio::task::spawn_blocking(move || -> Result<Document, StoreError> {
            let json = serde_json::to_string(&data)?;

            let write_txn = db.begin_write()?;
            let id = {
                let mut table = write_txn.open_table(collection.table())?;
                // Regenerate on the (unlikely) event of a key collision
                let mut id = generate_id();
                while table.get(id.as_str())?.is_some() {
                    id = generate_id();
                }
                table.insert(id.as_str(), json.as_str())?;
                id
            };
            write_txn.commit()?;

            Ok(Document { id, data })
        })
        .await?
    }

    async fn put(&self, collection: Collection, id: &str, data: Value) -> Result<(), StoreError> {
        let db = self.db.clone();
        let id = id.to_string();
        let data = strip_id(data);

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let json = serde_json::to_string(&data)?;

            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(collection.table())?;
                if table.get(id.as_str())?.is_none() {
                    return Err(StoreError::NotFound {
                        collection: collection.name(),
                        id,
                    });
                }
                table.insert(id.as_str(), json.as_str())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await?
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let db = self.db.clone();
        let id = id.to_string();

        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let write_txn = db.begin_write()?;
            let existed = {
                let mut table = write_txn.open_table(collection.table())?;
                let removed = table.remove(id.as_str())?;
                removed.is_some()
            };
            write_txn.commit()?;
            Ok(existed)
        })
        .await?
    }
}

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    /// Dashboard token; `None` disables the check
    pub auth_token: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = (!token.is_empty()).then_some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::NamedTempFile;

    #[derive(Deserialize)]
    struct Named {
        id: String,
        name: String,
    }

    fn open_store() -> (RedbStore, NamedTempFile) {
        let temp_db = NamedTempFile::new().unwrap();
        let store = RedbStore::open(temp_db.path().to_str().unwrap()).unwrap();
        (store, temp_db)
    }

    #[test]
    fn into_record_tags_store_identity() {
        let doc = Document {
            id: "abc".to_string(),
            data: json!({ "name": "Sol" }),
        };
        let named: Named = doc.into_record().unwrap();
        assert_eq!(named.id, "abc");
        assert_eq!(named.name, "Sol");
    }

    #[tokio::test]
    async fn insert_strips_id_and_get_returns_document() {
        let (store, _temp_db) = open_store();

        let doc = store
            .insert(Collection::Builders, json!({ "id": "ignored", "name": "Sol" }))
            .await
            .unwrap();
        assert_eq!(doc.id.len(), ID_LEN);
        assert_ne!(doc.id, "ignored");

        let fetched = store.get(Collection::Builders, &doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.data, json!({ "name": "Sol" }));

        // Collections are separate tables
        assert!(store.get(Collection::Brokers, &doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_requires_existing_document() {
        let (store, _temp_db) = open_store();

        let result = store.put(Collection::Leads, "missing", json!({})).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        assert!(!store.delete(Collection::Leads, "missing").await.unwrap());
    }
}
