//! Integration tests for Dynagate server.
//!
//! These tests require a running Dynagate server at `localhost:8000` that
//! accepts the credential `alternator:secret_pass`:
//!
//! ```text
//! DYNAGATE_CREDENTIALS=alternator:secret_pass dynagate-server
//! ```
//!
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//! Run them with:
//! ```text
//! cargo test -p dynagate-integration -- --ignored
//! ```

use std::sync::Once;

use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_dynamodb::types::{AttributeDefinition, KeySchemaElement, KeyType, ScalarAttributeType};
use dynagate_auth::{SigningParams, sign_request};

static INIT: Once = Once::new();

/// Access key the server under test is configured with.
pub const ACCESS_KEY_ID: &str = "alternator";
/// Secret for [`ACCESS_KEY_ID`].
pub const SECRET_ACCESS_KEY: &str = "secret_pass";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("DYNAGATE_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8000".to_owned())
}

/// HTTPS endpoint URL for the server.
///
/// The server's certificate must be trusted by the client, for example by
/// adding `apps/dynagate-server/fixtures/tls/ca.pem` to the system store.
#[must_use]
pub fn https_endpoint_url() -> String {
    std::env::var("DYNAGATE_HTTPS_ENDPOINT_URL")
        .unwrap_or_else(|_| "https://localhost:8043".to_owned())
}

/// Create a DynamoDB client for `endpoint` signing with the given credential.
#[must_use]
pub fn dynamodb_client_with(
    endpoint: &str,
    access_key_id: &str,
    secret_access_key: &str,
) -> aws_sdk_dynamodb::Client {
    init_tracing();

    let creds = Credentials::new(
        access_key_id,
        secret_access_key,
        None,
        None,
        "integration-test",
    );

    let config = aws_sdk_dynamodb::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint)
        .build();

    aws_sdk_dynamodb::Client::from_conf(config)
}

/// Create a DynamoDB client with valid credentials.
#[must_use]
pub fn dynamodb_client() -> aws_sdk_dynamodb::Client {
    dynamodb_client_with(&endpoint_url(), ACCESS_KEY_ID, SECRET_ACCESS_KEY)
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a table keyed by `p` (HASH, S) and `c` (RANGE, S). Caller is
/// responsible for cleanup.
pub async fn create_test_table(client: &aws_sdk_dynamodb::Client, prefix: &str) -> String {
    let name = test_table_name(prefix);
    client
        .create_table()
        .table_name(&name)
        .key_schema(key_element("p", KeyType::Hash))
        .key_schema(key_element("c", KeyType::Range))
        .attribute_definitions(string_attribute("p"))
        .attribute_definitions(string_attribute("c"))
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create table {name}: {e}"));
    name
}

/// Delete a table, ignoring errors.
pub async fn cleanup_table(client: &aws_sdk_dynamodb::Client, name: &str) {
    let _ = client.delete_table().table_name(name).send().await;
}

fn key_element(name: &str, key_type: KeyType) -> KeySchemaElement {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .unwrap()
}

fn string_attribute(name: &str) -> AttributeDefinition {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .unwrap()
}

/// `{"":{"":...{}...}}` nested `n` levels around an empty object.
#[must_use]
pub fn gen_json(n: usize) -> String {
    format!("{}{{}}{}", r#"{"":"#.repeat(n), "}".repeat(n))
}

/// Send a raw `awsJson1_0` request signed at `time`, returning the status and
/// the body text.
pub async fn signed_post_at(
    target: &str,
    body: String,
    time: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<(http::StatusCode, String)> {
    let endpoint = endpoint_url();
    let (mut parts, ()) = http::Request::builder()
        .method("POST")
        .uri(&endpoint)
        .header("content-type", "application/x-amz-json-1.0")
        .header("x-amz-target", format!("DynamoDB_20120810.{target}"))
        .body(())?
        .into_parts();
    sign_request(
        &mut parts,
        body.as_bytes(),
        &SigningParams {
            access_key_id: ACCESS_KEY_ID.to_owned(),
            secret_key: SECRET_ACCESS_KEY.to_owned(),
            region: "us-east-1".to_owned(),
            service: "dynamodb".to_owned(),
            time,
        },
    )?;

    let response = reqwest::Client::new()
        .post(&endpoint)
        .headers(parts.headers)
        .body(body)
        .send()
        .await?;
    let status = response.status();
    Ok((status, response.text().await?))
}

/// Send a raw `awsJson1_0` request signed now.
pub async fn signed_post(target: &str, body: String) -> anyhow::Result<(http::StatusCode, String)> {
    signed_post_at(target, body, chrono::Utc::now()).await
}

mod test_authorization;
mod test_describe_endpoints;
mod test_items;
mod test_large_requests;
