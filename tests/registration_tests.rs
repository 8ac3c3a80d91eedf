use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use serde_json::Value;
use syncstage::{ci_fixture_plugin, HttpRegistryClient, RegisterPluginUseCase};
use tokio::sync::Mutex;

/// Starts a registry stub answering every registration with `status` and
/// returns its base URL and the bodies it received.
async fn spawn_registry(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let app = axum::Router::new().route(
        "/plugins/register",
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().await.push(body);
                status
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind registry stub");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("registry stub");
    });

    (format!("http://{}", addr), received)
}

#[tokio::test]
async fn test_registration_posts_plugin_descriptor() {
    let (endpoint, received) = spawn_registry(StatusCode::OK).await;
    let plugin = ci_fixture_plugin().expect("plugin");

    let use_case = RegisterPluginUseCase::new(Arc::new(HttpRegistryClient::new(&endpoint)));
    let payload = use_case.execute(&plugin).await.expect("registration");
    assert_eq!(payload.name, "ci");

    let bodies = received.lock().await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["name"], "ci");
    assert_eq!(body["subtask_metas"].as_array().unwrap().len(), 6);
    assert_eq!(body["subtask_metas"][0]["name"], "collectCiPipelines");
    assert_eq!(body["api_endpoints"][0]["handler"], "test_connection");
    assert!(body["connection_schema"]["properties"]["source_dir"].is_object());
    assert!(body["generated_api_schema"]["paths"]
        .get("/plugins/ci/connections")
        .is_some());
}

#[tokio::test]
async fn test_registration_failure_is_a_transport_error() {
    let (endpoint, received) = spawn_registry(StatusCode::INTERNAL_SERVER_ERROR).await;
    let plugin = ci_fixture_plugin().expect("plugin");

    let use_case = RegisterPluginUseCase::new(Arc::new(HttpRegistryClient::new(endpoint)));
    let err = use_case.execute(&plugin).await.unwrap_err();
    assert!(err.is_transport_error());

    // One attempt, no retry.
    assert_eq!(received.lock().await.len(), 1);
}

#[tokio::test]
async fn test_unreachable_registry_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let use_case =
        RegisterPluginUseCase::new(Arc::new(HttpRegistryClient::new(format!("http://{}/", addr))));
    let err = use_case
        .execute(&ci_fixture_plugin().unwrap())
        .await
        .unwrap_err();
    assert!(err.is_transport_error());
}

#[test]
fn test_registry_url_joins_endpoint() {
    let client = HttpRegistryClient::new("http://localhost:8080/");
    assert_eq!(client.url(), "http://localhost:8080/plugins/register");
}
