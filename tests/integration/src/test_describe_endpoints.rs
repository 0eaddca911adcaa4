//! `DescribeEndpoints` tests against a running Dynagate server.

#[cfg(test)]
mod tests {
    use crate::{dynamodb_client, signed_post};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_describe_single_endpoint() {
        let client = dynamodb_client();
        let resp = client.describe_endpoints().send().await.unwrap();

        let endpoints = resp.endpoints();
        assert_eq!(endpoints.len(), 1);
        assert!(!endpoints[0].address().is_empty());
        assert_eq!(endpoints[0].cache_period_in_minutes(), 1440);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_describe_endpoints_over_raw_request() {
        let (status, body) = signed_post("DescribeEndpoints", "{}".to_owned())
            .await
            .unwrap();
        assert_eq!(status, http::StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        let endpoints = body["Endpoints"].as_array().unwrap();
        assert_eq!(endpoints.len(), 1);
        assert!(endpoints[0]["Address"].is_string());
        assert_eq!(endpoints[0]["CachePeriodInMinutes"], 1440);
    }
}
