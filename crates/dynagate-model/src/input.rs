//! DynamoDB input types for table management.
//!
//! These requests are shallow, so they are decoded with serde after the body
//! has been parsed. Item operations carry attribute values of any depth and
//! are read straight from the parsed document instead.

use serde::{Deserialize, Serialize};

use crate::types::{AttributeDefinition, KeySchemaElement};

/// Input for the `CreateTable` operation.
///
/// Billing, throughput, index and stream settings are accepted and ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableInput {
    /// The name of the table to create.
    pub table_name: String,

    /// The key schema for the table (partition key and optional sort key).
    pub key_schema: Vec<KeySchemaElement>,

    /// The attribute definitions for the key schema attributes.
    pub attribute_definitions: Vec<AttributeDefinition>,
}

/// Input for the `DeleteTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableInput {
    /// The name of the table to delete.
    pub table_name: String,
}

/// Input for the `DescribeTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTableInput {
    /// The name of the table to describe.
    pub table_name: String,
}

/// Input for the `ListTables` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTablesInput {
    /// The name of the table that starts the list. Use the value returned in
    /// `LastEvaluatedTableName` from a previous request to continue pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_table_name: Option<String>,

    /// The maximum number of table names to return (1--100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}
