//! Item round trips through the AWS SDK.

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::error::ProvideErrorMetadata;
    use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};

    use crate::{cleanup_table, create_test_table, dynamodb_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_put_get_and_delete_item() {
        let client = dynamodb_client();
        let table = create_test_table(&client, "items").await;

        let nested = AttributeValue::M(
            [(
                "inner".to_owned(),
                AttributeValue::L(vec![AttributeValue::N("1.50".to_owned())]),
            )]
            .into(),
        );
        client
            .put_item()
            .table_name(&table)
            .item("p", AttributeValue::S("x".to_owned()))
            .item("c", AttributeValue::S("y".to_owned()))
            .item("nested", nested.clone())
            .send()
            .await
            .unwrap();

        let got = client
            .get_item()
            .table_name(&table)
            .key("p", AttributeValue::S("x".to_owned()))
            .key("c", AttributeValue::S("y".to_owned()))
            .send()
            .await
            .unwrap();
        assert_eq!(got.item().and_then(|i| i.get("nested")), Some(&nested));

        let deleted = client
            .delete_item()
            .table_name(&table)
            .key("p", AttributeValue::S("x".to_owned()))
            .key("c", AttributeValue::S("y".to_owned()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .unwrap();
        assert!(deleted.attributes().is_some());

        let missing = client
            .get_item()
            .table_name(&table)
            .key("p", AttributeValue::S("x".to_owned()))
            .key("c", AttributeValue::S("y".to_owned()))
            .send()
            .await
            .unwrap();
        assert!(missing.item().is_none());

        cleanup_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_missing_table() {
        let client = dynamodb_client();
        let err = client
            .get_item()
            .table_name("no-such-table")
            .key("p", AttributeValue::S("x".to_owned()))
            .send()
            .await
            .unwrap_err()
            .into_service_error();
        assert_eq!(err.code(), Some("ResourceNotFoundException"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_and_describe_created_table() {
        let client = dynamodb_client();
        let table = create_test_table(&client, "describe").await;

        let listed = client.list_tables().send().await.unwrap();
        assert!(listed.table_names().contains(&table));

        let described = client
            .describe_table()
            .table_name(&table)
            .send()
            .await
            .unwrap();
        assert_eq!(
            described.table().and_then(|t| t.table_name()),
            Some(table.as_str())
        );

        cleanup_table(&client, &table).await;
    }
}
