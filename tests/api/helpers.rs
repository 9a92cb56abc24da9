use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use dashboard::auth::Claims;
use dashboard::configuration::{get_configuration, SessionBackend};
use dashboard::startup::{get_connection_pool, Application};
use dashboard::telemetry::{get_subscriber, init_subscriber};
use once_cell::sync::Lazy;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter = "info".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(default_filter, std::io::stdout));
    } else {
        init_subscriber(get_subscriber(default_filter, std::io::sink));
    }
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db_pool: SqlitePool,
    pub signing_key: Secret<String>,
    pub session_cookie: String,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub fn signed_jwt(&self, user_id: &str) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .checked_add(Duration::from_secs(3600))
            .unwrap()
            .as_secs();
        self.jwt(user_id, exp)
    }

    pub fn expired_jwt(&self, user_id: &str) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .checked_sub(Duration::from_secs(3600))
            .unwrap()
            .as_secs();
        self.jwt(user_id, exp)
    }

    fn jwt(&self, user_id: &str, exp: u64) -> String {
        let claims = Claims {
            user_id: user_id.to_string(),
            username: format!("{user_id}-name"),
            exp,
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.signing_key.expose_secret().as_ref()),
        )
        .expect("token encoded")
    }

    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .api_client
            .request(method, format!("{}{}", self.address, path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        self.request(Method::GET, path, token)
            .send()
            .await
            .expect("request sent")
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        self.request(Method::POST, path, token)
            .json(body)
            .send()
            .await
            .expect("request sent")
    }

    pub async fn post_raw(&self, path: &str, token: Option<&str>, body: &'static str) -> Response {
        self.request(Method::POST, path, token)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("request sent")
    }

    pub async fn put_json(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        self.request(Method::PUT, path, token)
            .json(body)
            .send()
            .await
            .expect("request sent")
    }

    pub async fn put_raw(&self, path: &str, token: Option<&str>, body: &'static str) -> Response {
        self.request(Method::PUT, path, token)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("request sent")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Response {
        self.request(Method::DELETE, path, token)
            .send()
            .await
            .expect("request sent")
    }

    /// Creates a button for `token`'s user and returns the response body.
    pub async fn create_button(&self, token: &str, label: &str) -> Value {
        let response = self
            .post_json(
                "/api/custom-buttons",
                Some(token),
                &serde_json::json!({ "label": label, "url": "https://example.com" }),
            )
            .await;
        assert_eq!(response.status(), 201);
        response.json().await.expect("json body")
    }

    pub async fn row_count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.db_pool)
            .await
            .expect("rows counted")
    }

    /// Inserts a user with a stored session and returns the session token.
    pub async fn add_session(&self, user_id: &str, expires_at: DateTime<Utc>) -> String {
        sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(format!("{user_id}-name"))
            .bind(format!("{user_id}@example.com"))
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await
            .expect("test user created");

        let token = Uuid::new_v4().simple().to_string();
        sqlx::query(
            "INSERT INTO sessions (id, token, user_id, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(token.as_str())
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await
        .expect("test session created");

        token
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(SessionBackend::Jwt).await
}

pub async fn spawn_app_with(session_backend: SessionBackend) -> TestApp {
    // Only initialize tracer once instead of every test
    Lazy::force(&TRACING);

    let settings = {
        let mut c = get_configuration().expect("configuration fetched");
        c.database.filename = std::env::temp_dir()
            .join(format!("dashboard-{}.db", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();
        c.database.create_if_missing = true;
        c.application.port = 0;
        c.application.session_backend = session_backend;
        c
    };

    let application = Application::build(settings.clone())
        .await
        .expect("application built");
    let application_port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        db_pool: get_connection_pool(&settings.database),
        signing_key: settings.application.signing_key,
        session_cookie: settings.application.session_cookie,
        api_client: reqwest::Client::new(),
    }
}
