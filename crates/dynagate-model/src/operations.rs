//! DynamoDB operation enum.

use std::fmt;

/// All operations Dynagate routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamoDBOperation {
    // Discovery
    /// Return the endpoint clients should use.
    DescribeEndpoints,

    // Table management
    /// Create a new table.
    CreateTable,
    /// Delete a table.
    DeleteTable,
    /// Describe a table.
    DescribeTable,
    /// List all tables.
    ListTables,

    // Item CRUD
    /// Put (insert or replace) an item.
    PutItem,
    /// Get an item by primary key.
    GetItem,
    /// Delete an item by primary key.
    DeleteItem,
}

impl DynamoDBOperation {
    /// Every routed operation.
    pub const ALL: [Self; 8] = [
        Self::DescribeEndpoints,
        Self::CreateTable,
        Self::DeleteTable,
        Self::DescribeTable,
        Self::ListTables,
        Self::PutItem,
        Self::GetItem,
        Self::DeleteItem,
    ];

    /// Returns the AWS operation name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DescribeEndpoints => "DescribeEndpoints",
            Self::CreateTable => "CreateTable",
            Self::DeleteTable => "DeleteTable",
            Self::DescribeTable => "DescribeTable",
            Self::ListTables => "ListTables",
            Self::PutItem => "PutItem",
            Self::GetItem => "GetItem",
            Self::DeleteItem => "DeleteItem",
        }
    }

    /// Parse an operation name string into a `DynamoDBOperation`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DescribeEndpoints" => Some(Self::DescribeEndpoints),
            "CreateTable" => Some(Self::CreateTable),
            "DeleteTable" => Some(Self::DeleteTable),
            "DescribeTable" => Some(Self::DescribeTable),
            "ListTables" => Some(Self::ListTables),
            "PutItem" => Some(Self::PutItem),
            "GetItem" => Some(Self::GetItem),
            "DeleteItem" => Some(Self::DeleteItem),
            _ => None,
        }
    }
}

impl fmt::Display for DynamoDBOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_every_operation_name() {
        for op in DynamoDBOperation::ALL {
            assert_eq!(DynamoDBOperation::from_name(op.as_str()), Some(op));
        }
    }

    #[test]
    fn test_should_not_recognize_unsupported_operation() {
        assert_eq!(DynamoDBOperation::from_name("Scan"), None);
        assert_eq!(DynamoDBOperation::from_name("getitem"), None);
    }
}
