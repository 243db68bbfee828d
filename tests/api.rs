use std::sync::Arc;

use dalabio::{
    app::build_app,
    auth::token::Token,
    state::AppState,
    store::{
        memory::{MemoryTokenStore, MemoryUserStore},
        TokenStore,
    },
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use uuid::Uuid;

struct TestServer {
    base_url: String,
    tokens: Arc<MemoryTokenStore>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let tokens = Arc::new(MemoryTokenStore::new());
        let users = Arc::new(MemoryUserStore::with_tokens(tokens.clone()));
        let state = AppState::fake_with(users, tokens.clone());

        let app = build_app(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            tokens,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/users"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
                "first_name": "Test",
            }))
            .send()
            .await
            .unwrap()
    }

    async fn authenticate(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/users/authenticate"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    /// Registers a user and returns `(user_id, token)`.
    async fn login_as(&self, username: &str, email: &str) -> (String, String) {
        let res = self.register(username, email, "s3cretpass").await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = self.authenticate(email, "s3cretpass").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn error_message(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn register_authenticate_and_fetch_profile() {
    let srv = TestServer::spawn().await;

    let res = srv.register("alice", "Alice@Example.com", "s3cretpass").await;
    assert_eq!(res.status(), StatusCode::OK);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert!(user.get("password_hash").is_none());
    assert!(user.get("password").is_none());
    let user_id = user["id"].as_str().unwrap().to_string();

    let before = OffsetDateTime::now_utc();
    let res = srv.authenticate("alice@example.com", "s3cretpass").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert!(body["user"]["last_login"].is_string());

    let expires_at =
        OffsetDateTime::parse(body["expires_at"].as_str().unwrap(), &Rfc3339).unwrap();
    let ttl = expires_at - before;
    assert!(ttl > Duration::hours(24) - Duration::minutes(1));
    assert!(ttl <= Duration::hours(24) + Duration::minutes(1));

    let res = srv
        .client
        .get(srv.url(&format!("/users/{user_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["username"], "alice");

    let res = srv
        .client
        .get(srv.url(&format!("/users/{user_id}")))
        .bearer_auth("wrongtoken")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(res).await, "Invalid or expired token");
}

#[tokio::test]
async fn every_login_issues_a_fresh_token() {
    let srv = TestServer::spawn().await;
    srv.register("bob", "bob@example.com", "s3cretpass").await;

    let first: Value = srv
        .authenticate("bob@example.com", "s3cretpass")
        .await
        .json()
        .await
        .unwrap();
    let second: Value = srv
        .authenticate("bob@example.com", "s3cretpass")
        .await
        .json()
        .await
        .unwrap();
    assert_ne!(first["token"], second["token"]);
    assert_eq!(srv.tokens.len(), 2);
}

#[tokio::test]
async fn duplicate_email_or_username_conflicts() {
    let srv = TestServer::spawn().await;
    let res = srv.register("alice", "alice@example.com", "s3cretpass").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.register("alice2", "ALICE@example.com", "s3cretpass").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(error_message(res).await, "user already exists");

    let res = srv.register("alice", "other@example.com", "s3cretpass").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_validates_input() {
    let srv = TestServer::spawn().await;

    let res = srv.register("carol", "not-an-email", "s3cretpass").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.register("carol", "carol@example.com", "short").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(!error_message(res).await.is_empty());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let srv = TestServer::spawn().await;
    srv.register("dave", "dave@example.com", "s3cretpass").await;

    let wrong = srv.authenticate("dave@example.com", "nottherightone").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong = error_message(wrong).await;

    let unknown = srv.authenticate("nobody@example.com", "s3cretpass").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown = error_message(unknown).await;

    assert_eq!(wrong, unknown);
    assert_eq!(wrong, "invalid email or password");
    assert!(srv.tokens.is_empty());
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let srv = TestServer::spawn().await;

    for path in ["/users", "/courses", "/spaces", "/meetings", "/payments"] {
        let res = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "GET {path}");
        assert_eq!(error_message(res).await, "Authorization token required");
    }

    let res = srv
        .client
        .post(srv.url("/courses"))
        .json(&json!({ "title": "Rust", "duration": "3 weeks" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_authorization_headers_are_rejected() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.login_as("erin", "erin@example.com").await;

    for header in [
        token.clone(),
        format!("Token {token}"),
        format!("Bearer {token} extra"),
        "Bearer ".to_string(),
        format!("bearer {token}"),
    ] {
        let res = srv
            .client
            .get(srv.url("/users"))
            .header("authorization", &header)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "header {header:?}");
        assert_eq!(
            error_message(res).await,
            "Authorization format must be Bearer <token>"
        );
    }
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let (user_id, _) = srv.login_as("frank", "frank@example.com").await;

    let issued = OffsetDateTime::now_utc() - Duration::hours(25);
    let stale = Token::issue(user_id.parse().unwrap(), Duration::hours(24), issued);
    srv.tokens.insert(&stale).await.unwrap();

    let res = srv
        .client
        .get(srv.url("/users"))
        .bearer_auth(&stale.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(res).await, "Token expired");
}

#[tokio::test]
async fn invalid_ids_and_bodies_on_protected_routes_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.login_as("grace", "grace@example.com").await;

    let res = srv
        .client
        .get(srv.url("/courses/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "Invalid course ID");

    let res = srv
        .client
        .delete(srv.url("/payments/42"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "Invalid payment ID");

    let res = srv
        .client
        .post(srv.url("/meetings"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body(r#"{"title": "#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/payments"))
        .bearer_auth(&token)
        .json(&json!({
            "amount": 0,
            "currency": "USD",
            "payment_method": "card",
            "status": "pending",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "amount must be greater than zero");
}

#[tokio::test]
async fn user_lifecycle_through_the_api() {
    let srv = TestServer::spawn().await;
    let (alice_id, token) = srv.login_as("alice", "alice@example.com").await;
    let (_, bob_token) = srv.login_as("bob", "bob@example.com").await;

    let res = srv
        .client
        .get(srv.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["users"].as_array().unwrap().len(), 2);

    let res = srv
        .client
        .put(srv.url(&format!("/users/{alice_id}")))
        .bearer_auth(&token)
        .json(&json!({ "last_name": "Liddell" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User updated successfully");
    assert_eq!(body["user"]["last_name"], "Liddell");
    assert_eq!(body["user"]["username"], "alice");

    let res = srv
        .client
        .put(srv.url(&format!("/users/{alice_id}")))
        .bearer_auth(&token)
        .json(&json!({ "username": "bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(error_message(res).await, "user conflicts with an existing record");

    let missing = Uuid::new_v4();
    let res = srv
        .client
        .get(srv.url(&format!("/users/{missing}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(res).await, "user not found");

    let res = srv
        .client
        .delete(srv.url(&format!("/users/{alice_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User deleted successfully");

    let res = srv
        .client
        .get(srv.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(res).await, "Invalid or expired token");

    let res = srv
        .client
        .delete(srv.url(&format!("/users/{alice_id}")))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(srv.tokens.len(), 1);
}

#[tokio::test]
async fn deactivated_users_cannot_log_in() {
    let srv = TestServer::spawn().await;
    let (_, admin_token) = srv.login_as("admin", "admin@example.com").await;
    let (carol_id, _) = srv.login_as("carol", "carol@example.com").await;

    let res = srv
        .client
        .put(srv.url(&format!("/users/{carol_id}")))
        .bearer_auth(&admin_token)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.authenticate("carol@example.com", "s3cretpass").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(res).await, "invalid email or password");
}
