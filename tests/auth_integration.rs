use baro_auth::auth::{AuthService, PasswordHasher};
use baro_auth::configuration::JwtSettings;
use baro_auth::startup::run;
use baro_auth::store::{CredentialStore, InMemoryCredentialStore, InMemoryRevocationLedger};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub address: String,
    pub store: InMemoryCredentialStore,
    pub ledger: InMemoryRevocationLedger,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn signup(&self, username: &str, password: &str, nickname: &str) -> reqwest::Response {
        self.post(
            "/auth/signup",
            &json!({"username": username, "password": password, "nickname": nickname}),
        )
        .await
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.post("/auth/login", &json!({"username": username, "password": password}))
            .await
    }

    /// Signs up and logs in the canonical test user, returning (access, refresh).
    async fn logged_in_user(&self) -> (String, String) {
        self.signup("testuser", "testpass123", "TestUser").await;
        let body: Value = self
            .login("testuser", "testpass123")
            .await
            .json()
            .await
            .expect("Failed to parse response");
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    async fn logout(&self, access_token: Option<&str>, refresh_token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.post(&format!("{}/auth/logout", &self.address));
        if let Some(access_token) = access_token {
            request = request.bearer_auth(access_token);
        }
        if let Some(refresh_token) = refresh_token {
            request = request.header("X-Refresh-Token", refresh_token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post("/auth/refresh", &json!({"refresh_token": refresh_token}))
            .await
    }
}

fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-at-least-32-chars".to_string(),
        access_token_expiry: 300,
        refresh_token_expiry: 86400,
        issuer: "baro-test".to_string(),
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(jwt_settings()).await
}

async fn spawn_app_with(jwt: JwtSettings) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = InMemoryCredentialStore::new();
    let ledger = InMemoryRevocationLedger::new();
    let service = AuthService::new(
        Arc::new(store.clone()),
        Arc::new(ledger.clone()),
        PasswordHasher::new(4),
        &jwt,
        Duration::from_secs(2),
    );

    let server = run(listener, service).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        ledger,
        client: reqwest::Client::new(),
    }
}

// --- Signup Tests ---

#[tokio::test]
async fn signup_returns_201_with_public_fields() {
    let app = spawn_app().await;

    let response = app.signup("testuser", "testpass123", "TestUser").await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({"username": "testuser", "nickname": "TestUser"}));
    assert!(app.store.username_exists("testuser").await.unwrap());
}

#[tokio::test]
async fn signup_twice_returns_400_user_already_exists() {
    let app = spawn_app().await;

    assert_eq!(201, app.signup("testuser", "testpass123", "TestUser").await.status().as_u16());
    let response = app.signup("testuser", "testpass123", "TestUser").await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"]["code"], "USER_ALREADY_EXISTS");
    assert!(!body["error"]["message"].as_str().unwrap().is_empty());
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn signup_with_taken_nickname_is_rejected_with_same_code() {
    let app = spawn_app().await;
    app.signup("testuser", "testpass123", "TestUser").await;

    let by_username: Value = app
        .signup("testuser", "otherpass123", "Other")
        .await
        .json()
        .await
        .unwrap();
    let by_nickname: Value = app
        .signup("otheruser", "otherpass123", "TestUser")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(by_username, by_nickname);
    assert_eq!(by_nickname["error"]["code"], "USER_ALREADY_EXISTS");
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn signup_returns_400_naming_every_invalid_field() {
    let app = spawn_app().await;

    let response = app.signup("t", "123", "").await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    for field in ["username", "password", "nickname"] {
        assert!(
            body["error"]["fields"].get(field).is_some(),
            "Missing field error for {}",
            field
        );
    }
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn signup_returns_400_for_missing_fields() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({"password": "testpass123", "nickname": "TestUser"}), "username"),
        (json!({"username": "testuser", "nickname": "TestUser"}), "password"),
        (json!({"username": "testuser", "password": "testpass123"}), "nickname"),
    ];

    for (body, missing) in test_cases {
        let response = app.post("/auth/signup", &body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject missing {}", missing);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"]["fields"].get(missing).is_some());
    }
}

#[tokio::test]
async fn signup_returns_400_for_malformed_json() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/auth/signup", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_with_token_pair() {
    let app = spawn_app().await;
    app.signup("testuser", "testpass123", "TestUser").await;

    let response = app.login("testuser", "testpass123").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(!body["access_token"].as_str().unwrap().is_empty());
    assert!(!body["refresh_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_failures_are_identical_for_wrong_password_and_unknown_user() {
    let app = spawn_app().await;
    app.signup("testuser", "testpass123", "TestUser").await;

    let wrong_password = app.login("testuser", "wrongpassword").await;
    let unknown_user = app.login("nonexistent", "password123").await;

    assert_eq!(400, wrong_password.status().as_u16());
    assert_eq!(400, unknown_user.status().as_u16());

    let wrong_password: Value = wrong_password.json().await.unwrap();
    let unknown_user: Value = unknown_user.json().await.unwrap();
    assert_eq!(wrong_password["error"]["code"], "INVALID_CREDENTIALS");
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn login_returns_400_naming_empty_fields() {
    let app = spawn_app().await;

    let response = app.login("", "").await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]["fields"].get("username").is_some());
    assert!(body["error"]["fields"].get("password").is_some());
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_blacklists_refresh_token_but_not_access_token() {
    let app = spawn_app().await;
    let (access_token, refresh_token) = app.logged_in_user().await;

    let response = app.logout(Some(&access_token), Some(&refresh_token)).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
    assert_eq!(app.ledger.len(), 1);

    // The revoked refresh token can no longer mint access tokens
    let response = app.refresh(&refresh_token).await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "token_not_valid");
    assert!(body["detail"].is_string());

    // The paired access token still authenticates
    let second: Value = app.login("testuser", "testpass123").await.json().await.unwrap();
    let response = app
        .logout(Some(&access_token), second["refresh_token"].as_str())
        .await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn logout_requires_bearer_access_token() {
    let app = spawn_app().await;
    let (_, refresh_token) = app.logged_in_user().await;

    let cases = vec![
        (None, "TOKEN_NOT_FOUND"),
        (Some("invalid.token.here".to_string()), "INVALID_TOKEN"),
        // a refresh token is not an access credential
        (Some(refresh_token.clone()), "INVALID_TOKEN"),
    ];

    for (bearer, code) in cases {
        let response = app.logout(bearer.as_deref(), Some(&refresh_token)).await;
        assert_eq!(401, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], code);
    }

    // none of the rejected calls revoked anything
    assert!(app.ledger.is_empty());
    assert_eq!(200, app.refresh(&refresh_token).await.status().as_u16());
}

#[tokio::test]
async fn logout_without_refresh_header_returns_400() {
    let app = spawn_app().await;
    let (access_token, _) = app.logged_in_user().await;

    let response = app.logout(Some(&access_token), None).await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "REFRESH_TOKEN_REQUIRED");
}

#[tokio::test]
async fn logout_with_bad_refresh_token_returns_logout_failed() {
    let app = spawn_app().await;
    let (access_token, refresh_token) = app.logged_in_user().await;

    for bad in ["garbage", access_token.as_str()] {
        let response = app.logout(Some(&access_token), Some(bad)).await;
        assert_eq!(400, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "LOGOUT_FAILED");
    }

    // Logging out twice with the same refresh token fails the second time
    assert_eq!(200, app.logout(Some(&access_token), Some(&refresh_token)).await.status().as_u16());
    let response = app.logout(Some(&access_token), Some(&refresh_token)).await;
    assert_eq!(400, response.status().as_u16());
}

// --- Token Refresh Tests ---

#[tokio::test]
async fn refresh_returns_new_access_token_without_rotating() {
    let app = spawn_app().await;
    let (access_token, refresh_token) = app.logged_in_user().await;

    let response = app.refresh(&refresh_token).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let new_access = body["access_token"].as_str().unwrap().to_string();
    assert_ne!(new_access, access_token);
    assert!(body.get("refresh_token").is_none());

    // Same refresh token is still usable, and the new access token authenticates
    assert_eq!(200, app.refresh(&refresh_token).await.status().as_u16());
    let response = app.logout(Some(&new_access), Some(&refresh_token)).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_for_malformed_or_missing_token() {
    let app = spawn_app().await;

    for body in [
        json!({"refresh_token": "definitely_not_a_valid_token"}),
        json!({"refresh_token": ""}),
        json!({}),
    ] {
        let response = app.post("/auth/refresh", &body).await;
        assert_eq!(401, response.status().as_u16(), "Should reject {}", body);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "token_not_valid");
    }
}

#[tokio::test]
async fn refresh_returns_401_for_expired_token() {
    let mut jwt = jwt_settings();
    jwt.refresh_token_expiry = -5;
    let app = spawn_app_with(jwt).await;
    let (_, refresh_token) = app.logged_in_user().await;

    let response = app.refresh(&refresh_token).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Token is expired");
    assert_eq!(body["code"], "token_not_valid");
}

#[tokio::test]
async fn logout_with_undecodable_refresh_header_returns_logout_failed() {
    let app = spawn_app().await;
    let (access_token, _) = app.logged_in_user().await;

    let response = app
        .client
        .post(&format!("{}/auth/logout", &app.address))
        .bearer_auth(&access_token)
        .header(
            "X-Refresh-Token",
            reqwest::header::HeaderValue::from_bytes(b"tok\xe9n").unwrap(),
        )
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "LOGOUT_FAILED");
    assert!(app.ledger.is_empty());
}
