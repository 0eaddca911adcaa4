//! Deeply nested and oversized request bodies.

#[cfg(test)]
mod tests {
    use crate::{cleanup_table, create_test_table, dynamodb_client, gen_json, signed_post};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_round_trip_deeply_nested_item() {
        let client = dynamodb_client();
        let table = create_test_table(&client, "deep").await;

        let big_json = gen_json(50_000);
        let item = format!(r#"{{"p":{{"S":"x"}},"c":{{"S":"x"}},"attribute":{big_json}}}"#);
        let (status, body) = signed_post(
            "PutItem",
            format!(r#"{{"TableName":"{table}","Item":{item}}}"#),
        )
        .await
        .unwrap();
        assert_eq!(status, http::StatusCode::OK, "{body}");

        let (status, body) = signed_post(
            "GetItem",
            format!(r#"{{"TableName":"{table}","Key":{{"p":{{"S":"x"}},"c":{{"S":"x"}}}}}}"#),
        )
        .await
        .unwrap();
        assert_eq!(status, http::StatusCode::OK);
        // Compared as text: the response is too deep for serde_json.
        assert_eq!(body, format!(r#"{{"Item":{item}}}"#));

        cleanup_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_truncated_json() {
        let (status, body) = signed_post("ListTables", r#"{"Limit":"#.to_owned())
            .await
            .unwrap();
        assert_eq!(status, http::StatusCode::BAD_REQUEST);

        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            body["__type"],
            "com.amazonaws.dynamodb.v20120810#SerializationException"
        );
        assert!(body["message"].as_str().unwrap().contains("offset 9"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_json_deeper_than_limit() {
        let (status, body) = signed_post("PutItem", gen_json(600_000)).await.unwrap();
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert!(body.contains("SerializationException"), "{body}");
        assert!(body.contains("depth"), "{body}");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_body_over_size_limit() {
        let body = " ".repeat(17 * 1024 * 1024);
        let (status, _) = signed_post("PutItem", body).await.unwrap();
        assert_eq!(status, http::StatusCode::PAYLOAD_TOO_LARGE);
    }
}
