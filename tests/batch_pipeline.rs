//! Batched RESTlet lookups: many callers, one wire request per flush.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::{json, Value};

use netsuite_client::batch::{BatchConfig, RequestBatcher};
use netsuite_client::{
    ClientConfig, Method, NetSuiteClient, OAuthConfig, RequestOptions, RestletParams,
};

fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig::new(OAuthConfig::new("ck", "cs", "tk", "ts", "123456"), "123456")
        .with_base_url(base_url)
}

/// Batcher whose processor posts the collected ids to a lookup RESTlet and
/// fans the response object back out by key.
fn lookup_batcher(client: Arc<NetSuiteClient>, max_batch_size: usize) -> RequestBatcher<Value> {
    let config = BatchConfig::new()
        .with_max_batch_size(max_batch_size)
        .with_flush_delay(Duration::from_millis(20));
    RequestBatcher::new(config, move |keys| {
        let client = Arc::clone(&client);
        Box::pin(async move {
            let response = client
                .restlet_with(
                    RestletParams::new("201", "1"),
                    RequestOptions::default()
                        .with_method(Method::POST)
                        .with_body(json!({ "ids": keys })),
                )
                .await?;
            let map = response.data.as_object().cloned().unwrap_or_default();
            Ok(map.into_iter().collect::<HashMap<String, Value>>())
        })
    })
}

#[tokio::test]
async fn test_two_lookups_share_one_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/app/site/hosting/restlet.nl")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("script".into(), "201".into()),
            Matcher::UrlEncoded("deploy".into(), "1".into()),
        ]))
        .match_body(Matcher::Json(json!({"ids": ["7", "8"]})))
        .with_status(200)
        .with_body(r#"{"7":{"name":"Alice"},"8":{"name":"Bob"}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = Arc::new(NetSuiteClient::new(test_config(&server.url())).unwrap());
    let batcher = lookup_batcher(client, 2);

    let (ra, rb) = tokio::join!(batcher.add("7"), batcher.add("8"));

    mock.assert_async().await;
    assert_eq!(ra.unwrap(), json!({"name": "Alice"}));
    assert_eq!(rb.unwrap(), json!({"name": "Bob"}));
}

#[tokio::test]
async fn test_server_failure_rejects_every_waiter() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/app/site/hosting/restlet.nl")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body(r#"{"error":"maintenance"}"#)
        .expect(1)
        .create_async()
        .await;

    // No retries so the single 503 is the whole story.
    let client = Arc::new(NetSuiteClient::new(test_config(&server.url()).with_retries(0)).unwrap());
    let batcher = lookup_batcher(client, 2);

    let (ra, rb) = tokio::join!(batcher.add("7"), batcher.add("8"));

    mock.assert_async().await;
    for result in [ra, rb] {
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }
}
