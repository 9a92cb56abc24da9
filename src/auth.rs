use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, TokenData, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::{FromRow, SqlitePool};

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub exp: u64,
    pub user_id: String,
    pub username: String,
}

/// The identity a request is authenticated as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("no session credentials on request")]
    MissingCredentials,
    #[error("invalid session token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("unknown session")]
    UnknownSession,
    #[error("session expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("session lookup failed")]
    Storage(#[from] sqlx::Error),
}

/// Resolves request credentials to a [`User`].
#[async_trait]
pub trait SessionGuard: Send + Sync {
    async fn resolve_identity(&self, headers: &HeaderMap) -> Result<User, GuardError>;
}

/// The bearer token if present, otherwise the value of the session cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Accepts HS256 tokens signed with the application signing key.
pub struct JwtSessionGuard {
    signing_key: Secret<String>,
    cookie_name: String,
}

impl JwtSessionGuard {
    pub fn new(signing_key: Secret<String>, cookie_name: String) -> Self {
        Self {
            signing_key,
            cookie_name,
        }
    }
}

#[async_trait]
impl SessionGuard for JwtSessionGuard {
    async fn resolve_identity(&self, headers: &HeaderMap) -> Result<User, GuardError> {
        let token_string =
            session_token(headers, &self.cookie_name).ok_or(GuardError::MissingCredentials)?;

        let token = decode_jwt(&token_string, &self.signing_key).map_err(GuardError::InvalidToken)?;

        Ok(User {
            id: token.claims.user_id,
            username: token.claims.username,
        })
    }
}

fn decode_jwt(
    token: &str,
    signing_key: &Secret<String>,
) -> jsonwebtoken::errors::Result<TokenData<Claims>> {
    decode(
        token,
        &DecodingKey::from_secret(signing_key.expose_secret().as_ref()),
        &Validation::new(jsonwebtoken::Algorithm::HS256),
    )
}

/// Accepts opaque tokens stored in the `sessions` table.
pub struct DatabaseSessionGuard {
    pool: SqlitePool,
    cookie_name: String,
}

#[derive(FromRow)]
struct SessionRow {
    user_id: String,
    username: String,
    expires_at: DateTime<Utc>,
}

impl DatabaseSessionGuard {
    pub fn new(pool: SqlitePool, cookie_name: String) -> Self {
        Self { pool, cookie_name }
    }
}

#[async_trait]
impl SessionGuard for DatabaseSessionGuard {
    async fn resolve_identity(&self, headers: &HeaderMap) -> Result<User, GuardError> {
        let token =
            session_token(headers, &self.cookie_name).ok_or(GuardError::MissingCredentials)?;

        let session = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT sessions.user_id, users.name AS username, sessions.expires_at
            FROM sessions
            JOIN users ON users.id = sessions.user_id
            WHERE sessions.token = ?
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GuardError::UnknownSession)?;

        if session.expires_at <= Utc::now() {
            return Err(GuardError::Expired(session.expires_at));
        }

        Ok(User {
            id: session.user_id,
            username: session.username,
        })
    }
}

pub async fn auth_middleware(
    State(guard): State<Arc<dyn SessionGuard>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = guard
        .resolve_identity(req.headers())
        .await
        .map_err(|error| match error {
            GuardError::Storage(error) => {
                tracing::error!(?error, "session lookup failed");
                ApiError::UnexpectedError("Failed to resolve session".to_string())
            }
            rejection => {
                tracing::debug!(%rejection, "request rejected by session guard");
                ApiError::Unauthorized
            }
        })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
