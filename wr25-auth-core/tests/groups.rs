//! Group membership lookups against a mocked verify endpoint

use async_trait::async_trait;
use http::{header::COOKIE, HeaderMap, HeaderValue};
use serde_json::json;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};
use wr25_auth_core::{
    config::Endpoints, session::USER_KEY, Error, MemoryStore, ProviderConfig, SessionRecord,
    SessionStore, User, UserData, Wr25Provider,
};

fn provider(server: &MockServer) -> Wr25Provider {
    let config = ProviderConfig::new("id", "secret", "http://localhost/cb", ["publicData"])
        .with_endpoints(Endpoints::with_base(&server.uri()));
    Wr25Provider::new(reqwest::Client::new(), config).unwrap()
}

fn user(token: &str) -> User {
    User {
        provider: "authwr25".to_string(),
        user_id: "12345".to_string(),
        nick_name: "Jane Doe".to_string(),
        access_token: token.to_string(),
        ..User::default()
    }
}

async fn mount_groups(server: &MockServer, token: &str, groups: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/oauth/verify"))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CharacterID": 12345,
            "groups": groups,
        })))
        .mount(server)
        .await;
}

/// A store whose backend is down.
struct UnreachableStore;

#[async_trait]
impl SessionStore for UnreachableStore {
    async fn load(&self, _id: &str) -> wr25_auth_core::Result<Option<SessionRecord>> {
        Err(Error::Store("connection refused".to_string()))
    }

    async fn save(&self, _id: &str, _record: SessionRecord) -> wr25_auth_core::Result<()> {
        Err(Error::Store("connection refused".to_string()))
    }

    async fn remove(&self, _id: &str) -> wr25_auth_core::Result<Option<SessionRecord>> {
        Err(Error::Store("connection refused".to_string()))
    }
}

fn cookie_headers(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_static(value));
    headers
}

#[tokio::test]
async fn groups_are_returned_in_order() {
    let server = MockServer::start().await;
    mount_groups(&server, "token-a", &["alpha", "beta"]).await;

    let data = UserData::new(&provider(&server), user("token-a"));
    assert_eq!(data.groups().await.unwrap(), vec!["alpha", "beta"]);
}

#[tokio::test]
async fn user_in_matches_exactly() {
    let server = MockServer::start().await;
    mount_groups(&server, "token-a", &["alpha", "beta"]).await;
    mount_groups(&server, "token-b", &["beta", "gamma", "Alpha", "alphabet"]).await;

    let provider = provider(&server);
    let member = UserData::new(&provider, user("token-a"));
    let outsider = UserData::new(&provider, user("token-b"));

    assert!(member.user_in("alpha").await.unwrap());
    assert!(!outsider.user_in("alpha").await.unwrap());
}

#[tokio::test]
async fn missing_groups_field_means_no_groups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "CharacterID": 1 })))
        .mount(&server)
        .await;

    let data = UserData::new(&provider(&server), user("t"));
    assert!(data.groups().await.unwrap().is_empty());
    assert!(!data.user_in("alpha").await.unwrap());
}

#[tokio::test]
async fn expired_token_is_reported_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/verify"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let data = UserData::new(&provider(&server), user("expired"));
    let err = data.groups().await.unwrap_err();
    assert!(err.is_token_expired());
    assert!(err.to_string().contains("timed out"));

    let err = data.user_in("alpha").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
}

#[tokio::test]
async fn other_failures_are_not_token_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/verify"))
        .and(header("Authorization", "Bearer broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth/verify"))
        .and(header("Authorization", "Bearer garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"groups\": 7}"))
        .mount(&server)
        .await;

    let provider = provider(&server);

    let err = UserData::new(&provider, user("broken"))
        .user_in("alpha")
        .await
        .unwrap_err();
    assert!(!err.is_token_expired());
    assert_eq!(err.status(), Some(500));

    let err = UserData::new(&provider, user("garbled"))
        .groups()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn load_user_from_session_cookie() {
    let server = MockServer::start().await;
    mount_groups(&server, "stored-token", &["alpha"]).await;

    let store = MemoryStore::new();
    let mut record = SessionRecord::new();
    record.set_user(user("stored-token"));
    store.save("sid-1", record).await.unwrap();

    let provider = provider(&server);
    let data = UserData::load(&provider, &store, &cookie_headers("user=sid-1"))
        .await
        .unwrap();

    assert_eq!(data.user().nick_name, "Jane Doe");
    assert!(data.user_in("alpha").await.unwrap());
}

#[tokio::test]
async fn load_distinguishes_session_failures() {
    let server = MockServer::start().await;
    let provider = provider(&server);
    let store = MemoryStore::new();

    let err = UserData::load(&provider, &store, &HeaderMap::new()).await.unwrap_err();
    assert!(matches!(err, Error::NoSession));

    let err = UserData::load(&provider, &store, &cookie_headers("user=unknown"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoSession));

    store.save("empty", SessionRecord::new()).await.unwrap();
    let err = UserData::load(&provider, &store, &cookie_headers("user=empty"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoUserInSession));

    let mut record = SessionRecord::new();
    record.insert(USER_KEY, json!({ "name": "not a user" }));
    store.save("wrong", record).await.unwrap();
    let err = UserData::load(&provider, &store, &cookie_headers("user=wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedSessionValue { found: "json", .. }));
}

#[tokio::test]
async fn load_propagates_store_failure() {
    let server = MockServer::start().await;
    let provider = provider(&server);

    let err = UserData::load(&provider, &UnreachableStore, &cookie_headers("user=sid-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn groups_transport_failure() {
    let config = ProviderConfig::new("id", "secret", "http://localhost/cb", ["publicData"])
        .with_endpoints(Endpoints::with_base("http://127.0.0.1:1"));
    let provider = Wr25Provider::new(reqwest::Client::new(), config).unwrap();

    let err = UserData::new(&provider, user("t")).groups().await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert!(!err.is_token_expired());
}
