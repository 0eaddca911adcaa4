//! DynamoDB output types.
//!
//! All output structs use `PascalCase` JSON field naming to match the DynamoDB
//! wire protocol (`awsJson1_0`). Optional fields are omitted when `None`.
//! Item-bearing outputs (`GetItem`, `PutItem`, `DeleteItem`) are written
//! directly from stored documents and have no struct here.

use serde::{Deserialize, Serialize};

use crate::types::{Endpoint, TableDescription};

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Output for the `DescribeEndpoints` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeEndpointsOutput {
    /// Always exactly one endpoint.
    pub endpoints: Vec<Endpoint>,
}

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

/// Output for the `CreateTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableOutput {
    /// The properties of the newly created table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

/// Output for the `DeleteTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableOutput {
    /// The properties of the table that was deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

/// Output for the `DescribeTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTableOutput {
    /// The properties of the table.
    #[serde(rename = "Table", skip_serializing_if = "Option::is_none")]
    pub table: Option<TableDescription>,
}

/// Output for the `ListTables` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTablesOutput {
    /// The names of the tables, in lexicographic order.
    #[serde(default)]
    pub table_names: Vec<String>,

    /// The name of the last table in the current page of results. Use this
    /// value as `ExclusiveStartTableName` in a subsequent request to continue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_table_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_describe_endpoints_output() {
        let output = DescribeEndpointsOutput {
            endpoints: vec![Endpoint {
                address: "dynagate:8000".to_owned(),
                cache_period_in_minutes: 1440,
            }],
        };
        let json = serde_json::to_string(&output).expect("serialize");
        assert_eq!(
            json,
            r#"{"Endpoints":[{"Address":"dynagate:8000","CachePeriodInMinutes":1440}]}"#
        );
    }

    #[test]
    fn test_should_always_write_table_names() {
        let json = serde_json::to_string(&ListTablesOutput::default()).expect("serialize");
        assert_eq!(json, r#"{"TableNames":[]}"#);
    }
}
