//! Signature verification tests against a running Dynagate server.

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::error::ProvideErrorMetadata;

    use crate::{
        ACCESS_KEY_ID, SECRET_ACCESS_KEY, dynamodb_client, dynamodb_client_with, endpoint_url,
        https_endpoint_url, signed_post_at,
    };

    const UNRECOGNIZED_CLIENT: &str = "UnrecognizedClientException";

    async fn list_tables_error(client: &aws_sdk_dynamodb::Client) -> (String, String) {
        let err = client
            .list_tables()
            .send()
            .await
            .expect_err("request should be rejected")
            .into_service_error();
        (
            err.code().unwrap_or_default().to_owned(),
            err.message().unwrap_or_default().to_owned(),
        )
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_accept_correct_credentials() {
        let client = dynamodb_client();
        client.list_tables().send().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_wrong_secret_key() {
        let client = dynamodb_client_with(&endpoint_url(), ACCESS_KEY_ID, "wrong_key");
        let (code, _) = list_tables_error(&client).await;
        assert_eq!(code, UNRECOGNIZED_CLIENT);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unknown_access_key_like_wrong_secret() {
        let unknown = dynamodb_client_with(&endpoint_url(), "whatever", SECRET_ACCESS_KEY);
        let wrong = dynamodb_client_with(&endpoint_url(), ACCESS_KEY_ID, "wrong_key");

        let unknown = list_tables_error(&unknown).await;
        let wrong = list_tables_error(&wrong).await;
        assert_eq!(unknown.0, UNRECOGNIZED_CLIENT);
        assert_eq!(unknown, wrong);
    }

    #[tokio::test]
    #[ignore = "requires running server with HTTPS and a trusted certificate"]
    async fn test_should_reject_unknown_access_key_over_https() {
        let client = dynamodb_client_with(&https_endpoint_url(), "whatever", SECRET_ACCESS_KEY);

        let err = client
            .list_tables()
            .send()
            .await
            .expect_err("unknown access key was accepted");
        let service_err = err
            .as_service_error()
            .unwrap_or_else(|| panic!("request never reached the gateway: {err:?}"));
        assert_eq!(service_err.code(), Some(UNRECOGNIZED_CLIENT));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_require_authorization_header() {
        let response = reqwest::Client::new()
            .post(endpoint_url())
            .header("content-type", "application/x-amz-json-1.0")
            .header("x-amz-target", "DynamoDB_20120810.ListTables")
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(
            body["__type"],
            "com.amazonaws.dynamodb.v20120810#MissingAuthenticationTokenException"
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_request_outside_clock_skew() {
        let stale = chrono::Utc::now() - chrono::Duration::hours(2);
        let (status, body) = signed_post_at("ListTables", "{}".to_owned(), stale)
            .await
            .unwrap();
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert!(body.contains(UNRECOGNIZED_CLIENT), "{body}");
    }
}
