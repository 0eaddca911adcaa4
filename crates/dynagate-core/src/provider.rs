//! Business logic for the operations Dynagate serves.
//!
//! Table operations take typed inputs decoded with serde. Item operations
//! take the parsed request [`Document`] directly: only the key attributes are
//! inspected, and everything else is stored exactly as it arrived.

use std::collections::HashSet;
use std::sync::Arc;

use dynagate_json::Document;
use dynagate_model::error::DynamoDBError;
use dynagate_model::input::{CreateTableInput, DeleteTableInput, DescribeTableInput, ListTablesInput};
use dynagate_model::output::{
    CreateTableOutput, DeleteTableOutput, DescribeEndpointsOutput, DescribeTableOutput,
    ListTablesOutput,
};
use dynagate_model::types::{
    AttributeDefinition, Endpoint, KeySchemaElement, KeyType, ReturnValue, ScalarAttributeType,
    TableStatus,
};
use tracing::debug;

use crate::config::DynagateConfig;
use crate::state::{DynagateState, KeyAttribute, KeySchema, Table};

/// How long clients may cache a `DescribeEndpoints` answer.
pub const ENDPOINT_CACHE_PERIOD_MINUTES: i64 = 1440;

/// In-memory DynamoDB provider.
#[derive(Debug)]
pub struct DynagateProvider {
    state: DynagateState,
    region: String,
    endpoint_address: Option<String>,
}

impl DynagateProvider {
    /// Create a provider with no tables.
    #[must_use]
    pub fn new(config: &DynagateConfig) -> Self {
        Self {
            state: DynagateState::new(),
            region: config.default_region.clone(),
            endpoint_address: config.endpoint_address.clone(),
        }
    }

    /// Handle `DescribeEndpoints`.
    ///
    /// Advertises the configured address, or else the `Host` the client used.
    pub fn handle_describe_endpoints(
        &self,
        host: Option<&str>,
    ) -> Result<DescribeEndpointsOutput, DynamoDBError> {
        let address = self
            .endpoint_address
            .as_deref()
            .or(host)
            .ok_or_else(|| {
                DynamoDBError::validation("DescribeEndpoints needs a 'Host:' header in request")
            })?;
        Ok(DescribeEndpointsOutput {
            endpoints: vec![Endpoint {
                address: address.to_owned(),
                cache_period_in_minutes: ENDPOINT_CACHE_PERIOD_MINUTES,
            }],
        })
    }

    /// Handle `CreateTable`.
    pub fn handle_create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<CreateTableOutput, DynamoDBError> {
        validate_table_name(&input.table_name)?;
        validate_attribute_definitions(&input.attribute_definitions)?;
        validate_key_schema_structure(&input.key_schema)?;
        let key_schema = parse_key_schema(&input.key_schema, &input.attribute_definitions)?;

        let table = self.state.create_table(Table::new(
            input.table_name,
            input.key_schema,
            key_schema,
            input.attribute_definitions,
            &self.region,
        ))?;
        debug!(table = %table.name, "created table");

        Ok(CreateTableOutput {
            table_description: Some(table.to_description(TableStatus::Active)),
        })
    }

    /// Handle `DeleteTable`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn handle_delete_table(
        &self,
        input: DeleteTableInput,
    ) -> Result<DeleteTableOutput, DynamoDBError> {
        let table = self.state.delete_table(&input.table_name)?;
        debug!(table = %table.name, "deleted table");
        Ok(DeleteTableOutput {
            table_description: Some(table.to_description(TableStatus::Deleting)),
        })
    }

    /// Handle `DescribeTable`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn handle_describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError> {
        let table = self.state.require_table(&input.table_name)?;
        Ok(DescribeTableOutput {
            table: Some(table.to_description(TableStatus::Active)),
        })
    }

    /// Handle `ListTables`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn handle_list_tables(
        &self,
        input: ListTablesInput,
    ) -> Result<ListTablesOutput, DynamoDBError> {
        if let Some(limit) = input.limit {
            if !(1..=100).contains(&limit) {
                return Err(DynamoDBError::validation(format!(
                    "1 validation error detected: Value '{limit}' at 'limit' failed to satisfy \
                     constraint: Member must have value less than or equal to 100"
                )));
            }
        }
        let limit = input
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(100);

        let mut names = self.state.list_table_names();
        if let Some(ref start) = input.exclusive_start_table_name {
            names.retain(|n| n.as_str() > start.as_str());
        }

        let last_evaluated_table_name = (names.len() > limit).then(|| names[limit - 1].clone());
        names.truncate(limit);

        Ok(ListTablesOutput {
            table_names: names,
            last_evaluated_table_name,
        })
    }

    /// Handle `PutItem`. Returns the replaced item when `ReturnValues` is
    /// `ALL_OLD`.
    pub fn handle_put_item(
        &self,
        mut request: Document,
    ) -> Result<Option<Arc<Document>>, DynamoDBError> {
        let table = self.state.require_table(required_table_name(&request)?)?;
        let return_values = return_values(&request)?;

        let item = request
            .take_member("Item")
            .ok_or_else(|| missing_parameter("item"))?;
        validate_item(&item)?;
        let key = encode_key(&table.key_schema, &item, KeyMatch::Contains)?;

        let size = item.encoded_len();
        let old = table.put_item(key, Arc::new(item), size);
        Ok(old.filter(|_| return_values == ReturnValue::AllOld))
    }

    /// Handle `GetItem`.
    pub fn handle_get_item(&self, request: &Document) -> Result<Option<Arc<Document>>, DynamoDBError> {
        let table = self.state.require_table(required_table_name(request)?)?;
        let key = request_key(&table.key_schema, request)?;
        Ok(table.get_item(&key))
    }

    /// Handle `DeleteItem`. Returns the removed item when `ReturnValues` is
    /// `ALL_OLD`.
    pub fn handle_delete_item(
        &self,
        request: &Document,
    ) -> Result<Option<Arc<Document>>, DynamoDBError> {
        let table = self.state.require_table(required_table_name(request)?)?;
        let return_values = return_values(request)?;
        let key = request_key(&table.key_schema, request)?;

        let old = table.delete_item(&key);
        Ok(old.filter(|_| return_values == ReturnValue::AllOld))
    }
}

// ---------------------------------------------------------------------------
// Table validation
// ---------------------------------------------------------------------------

fn validate_table_name(name: &str) -> Result<(), DynamoDBError> {
    if name.len() < 3 || name.len() > 255 {
        return Err(DynamoDBError::validation(format!(
            "TableName must be at least 3 characters long and at most 255 characters long, \
             but was {} characters",
            name.len()
        )));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
    {
        return Err(DynamoDBError::validation(format!(
            "1 validation error detected: Value '{name}' at 'tableName' failed to satisfy \
             constraint: Member must satisfy regular expression pattern: [a-zA-Z0-9_.-]+"
        )));
    }
    Ok(())
}

fn validate_attribute_definitions(definitions: &[AttributeDefinition]) -> Result<(), DynamoDBError> {
    if definitions.is_empty() {
        return Err(DynamoDBError::validation(
            "One or more parameter values were invalid: \
             AttributeDefinitions must be provided for all key attributes",
        ));
    }
    let mut seen = HashSet::new();
    for def in definitions {
        if !seen.insert(&def.attribute_name) {
            return Err(DynamoDBError::validation(format!(
                "Duplicate AttributeName in AttributeDefinitions: {}",
                def.attribute_name,
            )));
        }
    }
    Ok(())
}

fn validate_key_schema_structure(elements: &[KeySchemaElement]) -> Result<(), DynamoDBError> {
    if elements.len() > 2 {
        return Err(DynamoDBError::validation(
            "Too many KeySchema elements; expected at most 2",
        ));
    }
    match elements {
        [first] | [first, _] if first.key_type != KeyType::Hash => Err(DynamoDBError::validation(
            "Invalid KeySchema: The first KeySchemaElement is not a HASH key type",
        )),
        [_, second] if second.key_type != KeyType::Range => Err(DynamoDBError::validation(
            "Invalid KeySchema: The second KeySchemaElement is not a RANGE key type",
        )),
        [_, second] if second.attribute_name == elements[0].attribute_name => {
            Err(DynamoDBError::validation(
                "Both the Hash Key and the Range Key element in the KeySchema have the same name",
            ))
        }
        [] => Err(DynamoDBError::validation(
            "Invalid KeySchema: Some index key schema element is not valid",
        )),
        _ => Ok(()),
    }
}

fn parse_key_schema(
    elements: &[KeySchemaElement],
    definitions: &[AttributeDefinition],
) -> Result<KeySchema, DynamoDBError> {
    let mut attributes = elements
        .iter()
        .map(|elem| key_attribute(&elem.attribute_name, definitions));
    let partition_key = attributes.next().ok_or_else(|| {
        DynamoDBError::validation("Key schema must contain a HASH key element")
    })??;
    let sort_key = attributes.next().transpose()?;
    Ok(KeySchema {
        partition_key,
        sort_key,
    })
}

fn key_attribute(
    name: &str,
    definitions: &[AttributeDefinition],
) -> Result<KeyAttribute, DynamoDBError> {
    let attr_type = definitions
        .iter()
        .find(|d| d.attribute_name == name)
        .map(|d| d.attribute_type.clone())
        .ok_or_else(|| {
            DynamoDBError::validation(format!(
                "One or more parameter values were invalid: Some index key schema elements are \
                 not valid. The following index key schema element does not have a matching \
                 AttributeDefinition: {name}"
            ))
        })?;
    if !attr_type.is_valid_key_type() {
        return Err(DynamoDBError::validation(format!(
            "Member must satisfy enum value set: [S, N, B], got '{attr_type}'"
        )));
    }
    Ok(KeyAttribute {
        name: name.to_owned(),
        attr_type,
    })
}

// ---------------------------------------------------------------------------
// Item request fields
// ---------------------------------------------------------------------------

fn missing_parameter(field: &str) -> DynamoDBError {
    DynamoDBError::validation(format!(
        "1 validation error detected: Value null at '{field}' failed to satisfy constraint: \
         Member must not be null"
    ))
}

fn required_table_name(request: &Document) -> Result<&str, DynamoDBError> {
    let name = match request.get("TableName") {
        None | Some(Document::Null) => return Err(missing_parameter("tableName")),
        Some(value) => value.as_str().ok_or_else(|| {
            DynamoDBError::serialization_exception(format!(
                "TableName must be a string, got {}",
                value.type_name()
            ))
        })?,
    };
    validate_table_name(name)?;
    Ok(name)
}

/// Read `ReturnValues`. Only `NONE` and `ALL_OLD` apply to puts and deletes.
fn return_values(request: &Document) -> Result<ReturnValue, DynamoDBError> {
    let Some(raw) = request.get("ReturnValues").filter(|v| !v.is_null()) else {
        return Ok(ReturnValue::None);
    };
    let raw = raw.as_str().ok_or_else(|| {
        DynamoDBError::serialization_exception("ReturnValues must be a string")
    })?;
    match ReturnValue::from_wire(raw) {
        Some(rv @ (ReturnValue::None | ReturnValue::AllOld)) => Ok(rv),
        Some(rv) => Err(DynamoDBError::validation(format!(
            "Return values set to invalid value for this operation: {rv}"
        ))),
        None => Err(DynamoDBError::validation(format!(
            "1 validation error detected: Value '{raw}' at 'returnValues' failed to satisfy \
             constraint: Member must satisfy enum value set: \
             [ALL_NEW, UPDATED_OLD, ALL_OLD, NONE, UPDATED_NEW]"
        ))),
    }
}

/// Every attribute of an item must be an attribute value object. Nested
/// contents are not inspected.
fn validate_item(item: &Document) -> Result<(), DynamoDBError> {
    let members = item.as_object().ok_or_else(|| {
        DynamoDBError::serialization_exception(format!(
            "Item must be an object, got {}",
            item.type_name()
        ))
    })?;
    for (name, value) in members {
        match value.as_object() {
            Some([]) => {
                return Err(DynamoDBError::validation(format!(
                    "Supplied AttributeValue is empty, must contain exactly one of the \
                     supported datatypes for attribute {name}"
                )));
            }
            Some(_) => {}
            None => {
                return Err(DynamoDBError::serialization_exception(format!(
                    "Attribute {name} must be an attribute value object, got {}",
                    value.type_name()
                )));
            }
        }
    }
    Ok(())
}

fn request_key(schema: &KeySchema, request: &Document) -> Result<String, DynamoDBError> {
    let key = request.get("Key").ok_or_else(|| missing_parameter("key"))?;
    if key.as_object().is_none() {
        return Err(DynamoDBError::serialization_exception(format!(
            "Key must be an object, got {}",
            key.type_name()
        )));
    }
    encode_key(schema, key, KeyMatch::Exact)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyMatch {
    /// An item: the key attributes plus any others.
    Contains,
    /// A `Key` parameter: exactly the key attributes.
    Exact,
}

/// Check the key attributes of `attrs` against `schema` and encode them as
/// the storage key: the compact JSON of each key value, in schema order.
fn encode_key(schema: &KeySchema, attrs: &Document, mode: KeyMatch) -> Result<String, DynamoDBError> {
    let schema_mismatch =
        || DynamoDBError::validation("The provided key element does not match the schema");

    if mode == KeyMatch::Exact {
        let count = attrs.as_object().map_or(0, <[_]>::len);
        if count != schema.attributes().count() {
            return Err(schema_mismatch());
        }
    }

    let mut encoded = String::from("[");
    for (i, attr) in schema.attributes().enumerate() {
        let value = match (attrs.get(&attr.name), mode) {
            (Some(value), _) => value,
            (None, KeyMatch::Contains) => {
                return Err(DynamoDBError::validation(format!(
                    "One or more parameter values were invalid: Missing the key {} in the item",
                    attr.name
                )));
            }
            (None, KeyMatch::Exact) => return Err(schema_mismatch()),
        };
        validate_key_value(attr, value)?;
        if i > 0 {
            encoded.push(',');
        }
        value.write_compact(&mut encoded);
    }
    encoded.push(']');
    Ok(encoded)
}

fn validate_key_value(attr: &KeyAttribute, value: &Document) -> Result<(), DynamoDBError> {
    let expected = attr.attr_type.as_str();
    let (actual, scalar) = match value.as_object() {
        Some([(actual, scalar)]) => (actual.as_str(), scalar),
        _ => {
            return Err(DynamoDBError::validation(format!(
                "One or more parameter values were invalid: Type mismatch for key {} \
                 expected: {expected} actual: {}",
                attr.name,
                value.type_name()
            )));
        }
    };
    if actual != expected {
        return Err(DynamoDBError::validation(format!(
            "One or more parameter values were invalid: Type mismatch for key {} \
             expected: {expected} actual: {actual}",
            attr.name
        )));
    }
    let text = scalar.as_str().ok_or_else(|| {
        DynamoDBError::serialization_exception(format!(
            "Key attribute {} must hold a string, got {}",
            attr.name,
            scalar.type_name()
        ))
    })?;
    if text.is_empty() {
        let kind = if attr.attr_type == ScalarAttributeType::N {
            "numeric"
        } else {
            "empty string"
        };
        return Err(DynamoDBError::validation(format!(
            "One or more parameter values are not valid. The AttributeValue for a key \
             attribute cannot contain an {kind} value. Key: {}",
            attr.name
        )));
    }
    // Number keys are compared as text: `1` and `1.0` are different keys.
    if attr.attr_type == ScalarAttributeType::N && !is_number(text) {
        return Err(DynamoDBError::validation(format!(
            "The parameter cannot be converted to a numeric value: {text}"
        )));
    }
    Ok(())
}

/// `[+-]? (digits [. digits*] | . digits) ([eE] [+-]? digits)?`
fn is_number(text: &str) -> bool {
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => (&unsigned[..i], Some(&unsigned[i + 1..])),
        None => (unsigned, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mantissa_ok = !(int.is_empty() && frac.is_empty()) && all_digits(int) && all_digits(frac);
    let exponent_ok = exponent.is_none_or(|e| {
        let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
        !digits.is_empty() && all_digits(digits)
    });
    mantissa_ok && exponent_ok
}
