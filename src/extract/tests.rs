use super::*;
use crate::credentials::{Credential, FileTokenStore};
use mockito::{Matcher, Server};
use tempfile::TempDir;

const TWO_ITEMS: &str = r#"{
    "items": [
        {
            "played_at": "2024-01-01T23:30:00.000000Z",
            "track": {"name": "Song A", "artists": [{"name": "A"}, {"name": "B"}]},
            "context": null
        },
        {
            "played_at": "2024-01-01T22:00:00.000000Z",
            "track": {"name": "Song B", "artists": [{"name": "C", "id": "xyz"}]}
        }
    ],
    "next": null
}"#;

fn stored_token(dir: &TempDir, token: &str) -> Arc<dyn TokenStore> {
    let store = FileTokenStore::new(dir.path().join("token.json"));
    store.put(&Credential::new(token.to_string())).unwrap();
    Arc::new(store)
}

fn extractor_for(store: Arc<dyn TokenStore>, endpoint: String) -> Extractor {
    Extractor::new(store, endpoint, Duration::from_secs(5)).unwrap()
}

fn endpoint(server: &Server) -> String {
    format!("{}/v1/me/player/recently-played", server.url())
}

#[tokio::test]
async fn test_fetch_sends_bearer_and_limit() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/me/player/recently-played")
        .match_query(Matcher::UrlEncoded("limit".into(), "50".into()))
        .match_header("authorization", "Bearer BQC-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TWO_ITEMS)
        .create_async()
        .await;

    let extractor = extractor_for(stored_token(&dir, "BQC-token"), endpoint(&server));
    let events = extractor.fetch(50).await.unwrap();

    mock.assert_async().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].played_at, "2024-01-01T23:30:00.000000Z");
    assert_eq!(events[0].track.artists.len(), 2);
    assert_eq!(events[1].track.name, "Song B");
}

#[tokio::test]
async fn test_fetch_clamps_limit() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/me/player/recently-played")
        .match_query(Matcher::UrlEncoded("limit".into(), "50".into()))
        .with_status(200)
        .with_body(r#"{"items": []}"#)
        .create_async()
        .await;

    let extractor = extractor_for(stored_token(&dir, "t"), endpoint(&server));
    assert!(extractor.fetch(500).await.unwrap().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_without_credential_fails() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(dir.path().join("missing")));

    let extractor = extractor_for(store, "http://127.0.0.1:1/unused".to_string());
    assert!(matches!(extractor.fetch(50).await, Err(EtlError::NoCredential(_))));
}

#[tokio::test]
async fn test_unauthorized_is_soft_failure() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me/player/recently-played")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"error": {"status": 401, "message": "The access token expired"}}"#)
        .create_async()
        .await;

    let extractor = extractor_for(stored_token(&dir, "expired"), endpoint(&server));
    assert!(extractor.fetch(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_is_soft_failure() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me/player/recently-played")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let extractor = extractor_for(stored_token(&dir, "t"), endpoint(&server));
    assert!(extractor.fetch(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_soft_failure() {
    let dir = TempDir::new().unwrap();
    let extractor = extractor_for(
        stored_token(&dir, "t"),
        "http://127.0.0.1:1/v1/me/player/recently-played".to_string(),
    );
    assert!(extractor.fetch(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_items_is_soft_failure() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me/player/recently-played")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"cursors": null}"#)
        .create_async()
        .await;

    let extractor = extractor_for(stored_token(&dir, "t"), endpoint(&server));
    assert!(extractor.fetch(50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stalled_endpoint_times_out_to_empty_batch() {
    // accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let dir = TempDir::new().unwrap();
    let extractor = Extractor::new(
        stored_token(&dir, "t"),
        format!("http://{}/v1/me/player/recently-played", addr),
        Duration::from_millis(200),
    )
    .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(10), extractor.fetch_outcome(50))
        .await
        .expect("fetch must not hang")
        .unwrap();
    assert!(outcome.events.is_empty());
    assert_eq!(outcome.upstream_error.as_deref(), Some("request timed out"));
}

#[tokio::test]
async fn test_outcome_reports_upstream_reason() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me/player/recently-played")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let extractor = extractor_for(stored_token(&dir, "t"), endpoint(&server));
    let outcome = extractor.fetch_outcome(50).await.unwrap();

    assert!(outcome.events.is_empty());
    assert!(outcome.upstream_error.unwrap().contains("500"));
}

#[tokio::test]
async fn test_outcome_empty_history_has_no_upstream_error() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me/player/recently-played")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"items": []}"#)
        .create_async()
        .await;

    let extractor = extractor_for(stored_token(&dir, "t"), endpoint(&server));
    let outcome = extractor.fetch_outcome(50).await.unwrap();

    assert!(outcome.events.is_empty());
    assert!(outcome.upstream_error.is_none());
}

#[test]
fn test_parse_rejects_item_without_track() {
    let body = r#"{"items": [{"played_at": "2024-01-01T23:30:00.000000Z"}]}"#;
    assert!(parse_recently_played(body).is_err());
}
