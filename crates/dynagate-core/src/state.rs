//! In-memory table state.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dynagate_json::Document;
use dynagate_model::error::DynamoDBError;
use dynagate_model::types::{
    AttributeDefinition, KeySchemaElement, ScalarAttributeType, TableDescription, TableStatus,
};
use parking_lot::RwLock;

/// All tables keyed by name.
#[derive(Debug, Default)]
pub struct DynagateState {
    tables: DashMap<String, Arc<Table>>,
}

impl DynagateState {
    /// Create a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a table or return `ResourceNotFoundException`.
    pub fn require_table(&self, name: &str) -> Result<Arc<Table>, DynamoDBError> {
        self.tables
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| table_not_found(name))
    }

    /// Insert a new table. Returns `ResourceInUseException` if the name is taken.
    pub fn create_table(&self, table: Table) -> Result<Arc<Table>, DynamoDBError> {
        match self.tables.entry(table.name.clone()) {
            Entry::Occupied(e) => Err(DynamoDBError::resource_in_use(format!(
                "Table already exists: {}",
                e.key()
            ))),
            Entry::Vacant(e) => Ok(Arc::clone(e.insert(Arc::new(table)).value())),
        }
    }

    /// Remove a table by name.
    pub fn delete_table(&self, name: &str) -> Result<Arc<Table>, DynamoDBError> {
        self.tables
            .remove(name)
            .map(|(_, t)| t)
            .ok_or_else(|| table_not_found(name))
    }

    /// All table names, sorted.
    #[must_use]
    pub fn list_table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }
}

fn table_not_found(name: &str) -> DynamoDBError {
    DynamoDBError::resource_not_found(format!(
        "Requested resource not found: Table: {name} not found"
    ))
}

/// One key attribute with its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    /// Attribute name.
    pub name: String,
    /// `S`, `N` or `B`.
    pub attr_type: ScalarAttributeType,
}

/// Partition key plus optional sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// The `HASH` attribute.
    pub partition_key: KeyAttribute,
    /// The `RANGE` attribute, if any.
    pub sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    /// Key attributes in schema order.
    pub fn attributes(&self) -> impl Iterator<Item = &KeyAttribute> {
        std::iter::once(&self.partition_key).chain(self.sort_key.as_ref())
    }
}

#[derive(Debug)]
struct StoredItem {
    item: Arc<Document>,
    size: usize,
}

/// A table and its items.
#[derive(Debug)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Key schema as sent by the client.
    pub key_schema_elements: Vec<KeySchemaElement>,
    /// Resolved key schema.
    pub key_schema: KeySchema,
    /// Attribute definitions as sent by the client.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Table ARN.
    pub arn: String,
    /// Table id (UUID v4).
    pub table_id: String,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    items: RwLock<HashMap<String, StoredItem>>,
}

impl Table {
    /// Create an empty table.
    #[must_use]
    pub fn new(
        name: String,
        key_schema_elements: Vec<KeySchemaElement>,
        key_schema: KeySchema,
        attribute_definitions: Vec<AttributeDefinition>,
        region: &str,
    ) -> Self {
        Self {
            arn: format!("arn:aws:dynamodb:{region}:000000000000:table/{name}"),
            name,
            key_schema_elements,
            key_schema,
            attribute_definitions,
            table_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now(),
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Store `item` under `key`, returning the item it replaced.
    pub fn put_item(&self, key: String, item: Arc<Document>, size: usize) -> Option<Arc<Document>> {
        self.items
            .write()
            .insert(key, StoredItem { item, size })
            .map(|old| old.item)
    }

    /// Look up the item stored under `key`.
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<Arc<Document>> {
        self.items.read().get(key).map(|s| Arc::clone(&s.item))
    }

    /// Remove the item stored under `key`.
    pub fn delete_item(&self, key: &str) -> Option<Arc<Document>> {
        self.items.write().remove(key).map(|s| s.item)
    }

    /// Number of stored items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.read().len()
    }

    /// Sum of the encoded sizes of all stored items.
    #[must_use]
    pub fn total_size_bytes(&self) -> usize {
        self.items.read().values().map(|s| s.size).sum()
    }

    /// Build a `TableDescription` in the given status.
    #[must_use]
    pub fn to_description(&self, status: TableStatus) -> TableDescription {
        #[allow(clippy::cast_precision_loss)] // DynamoDB returns epoch seconds as f64
        let creation_time = self.created_at.timestamp_millis() as f64 / 1000.0;
        TableDescription {
            table_name: Some(self.name.clone()),
            table_status: Some(status),
            key_schema: self.key_schema_elements.clone(),
            attribute_definitions: self.attribute_definitions.clone(),
            creation_date_time: Some(creation_time),
            item_count: Some(i64::try_from(self.item_count()).unwrap_or(i64::MAX)),
            table_size_bytes: Some(i64::try_from(self.total_size_bytes()).unwrap_or(i64::MAX)),
            table_arn: Some(self.arn.clone()),
            table_id: Some(self.table_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use dynagate_model::error::DynamoDBErrorCode;
    use dynagate_model::types::KeyType;

    use super::*;

    fn users() -> Table {
        let key_schema = KeySchema {
            partition_key: KeyAttribute {
                name: "id".to_owned(),
                attr_type: ScalarAttributeType::S,
            },
            sort_key: None,
        };
        Table::new(
            "users".to_owned(),
            vec![KeySchemaElement {
                attribute_name: "id".to_owned(),
                key_type: KeyType::Hash,
            }],
            key_schema,
            vec![AttributeDefinition {
                attribute_name: "id".to_owned(),
                attribute_type: ScalarAttributeType::S,
            }],
            "us-east-1",
        )
    }

    #[test]
    fn test_should_reject_duplicate_table() {
        let state = DynagateState::new();
        state.create_table(users()).unwrap();
        let err = state.create_table(users()).unwrap_err();
        assert_eq!(err.code, DynamoDBErrorCode::ResourceInUseException);
    }

    #[test]
    fn test_should_report_missing_table() {
        let state = DynagateState::new();
        let err = state.require_table("nope").unwrap_err();
        assert_eq!(err.code, DynamoDBErrorCode::ResourceNotFoundException);
        assert!(state.delete_table("nope").is_err());
    }

    #[test]
    fn test_should_list_tables_sorted() {
        let state = DynagateState::new();
        for name in ["zeta", "alpha", "mid"] {
            let mut table = users();
            table.name = name.to_owned();
            state.create_table(table).unwrap();
        }
        assert_eq!(state.list_table_names(), ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_should_replace_and_track_items() {
        let table = users();
        let first = Arc::new(Document::from("first"));
        assert!(table.put_item("k".to_owned(), Arc::clone(&first), 10).is_none());
        let old = table.put_item("k".to_owned(), Arc::new(Document::from("second")), 12);

        assert_eq!(old.as_deref(), Some(&*first));
        assert_eq!(table.item_count(), 1);
        assert_eq!(table.total_size_bytes(), 12);
        assert!(table.delete_item("k").is_some());
        assert!(table.get_item("k").is_none());
    }

    #[test]
    fn test_should_describe_table() {
        let table = users();
        let desc = table.to_description(TableStatus::Active);
        assert_eq!(desc.table_name.as_deref(), Some("users"));
        assert_eq!(
            desc.table_arn.as_deref(),
            Some("arn:aws:dynamodb:us-east-1:000000000000:table/users")
        );
        assert_eq!(desc.item_count, Some(0));
    }
}
