//! Collection handlers shared by every [`OwnedResource`].
//!
//! All routes sit behind [`crate::auth::auth_middleware`], so the caller's
//! [`User`] is resolved before any handler touches storage.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    auth::User,
    error::{ApiError, StoreError},
    startup::ApplicationState,
    store::{OwnedResource, Record, Store},
};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Deleted {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: User,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|error| ApiError::InvalidBody(error.to_string()))
}

fn unexpected(message: String) -> impl FnOnce(StoreError) -> ApiError {
    move |error| {
        tracing::error!(?error, "{}", message);
        ApiError::UnexpectedError(message)
    }
}

#[tracing::instrument(name = "list", skip_all, fields(kind = R::PLURAL, user = %user.id))]
pub async fn list<R: OwnedResource>(
    State(state): State<Arc<ApplicationState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<R>>, ApiError> {
    let resources = Store::<R>::new(state.pool.clone())
        .list_by_owner(&user.id)
        .await
        .map_err(unexpected(format!("Failed to fetch {}", R::PLURAL)))?;

    Ok(Json(resources))
}

#[tracing::instrument(name = "create", skip_all, fields(kind = R::SINGULAR, user = %user.id))]
pub async fn create<R: OwnedResource>(
    State(state): State<Arc<ApplicationState>>,
    Extension(user): Extension<User>,
    body: Bytes,
) -> Result<(StatusCode, Json<R>), ApiError> {
    let draft: R::Draft = parse_body(&body)?;
    let resource = R::from_draft(draft, Record::new(&user.id))?;

    let resource = Store::<R>::new(state.pool.clone())
        .create(resource)
        .await
        .map_err(unexpected(format!("Failed to create {}", R::SINGULAR)))?;

    tracing::info!(id = %resource.record().id, "created");
    Ok((StatusCode::CREATED, Json(resource)))
}

#[tracing::instrument(name = "read", skip_all, fields(kind = R::SINGULAR, user = %user.id, %id))]
pub async fn read<R: OwnedResource>(
    State(state): State<Arc<ApplicationState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<R>, ApiError> {
    let resource = Store::<R>::new(state.pool.clone())
        .get_by_id_for_owner(&id, &user.id)
        .await
        .map_err(unexpected(format!("Failed to fetch {}", R::SINGULAR)))?
        .ok_or(ApiError::NotFound(R::NOT_FOUND))?;

    Ok(Json(resource))
}

#[tracing::instrument(name = "update", skip_all, fields(kind = R::SINGULAR, user = %user.id, %id))]
pub async fn update<R: OwnedResource>(
    State(state): State<Arc<ApplicationState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<R>, ApiError> {
    let store = Store::<R>::new(state.pool.clone());
    let failed = || unexpected(format!("Failed to update {}", R::SINGULAR));

    store
        .get_by_id_for_owner(&id, &user.id)
        .await
        .map_err(failed())?
        .ok_or(ApiError::NotFound(R::NOT_FOUND))?;

    let patch: R::Patch = parse_body(&body)?;
    R::validate_patch(&patch)?;

    let merged = store
        .merge_update(&id, &user.id, patch)
        .await
        .map_err(failed())?
        .ok_or(ApiError::NotFound(R::NOT_FOUND))?;

    Ok(Json(merged))
}

#[tracing::instrument(name = "delete", skip_all, fields(kind = R::SINGULAR, user = %user.id, %id))]
pub async fn delete<R: OwnedResource>(
    State(state): State<Arc<ApplicationState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let store = Store::<R>::new(state.pool.clone());
    let failed = || unexpected(format!("Failed to delete {}", R::SINGULAR));

    store
        .get_by_id_for_owner(&id, &user.id)
        .await
        .map_err(failed())?
        .ok_or(ApiError::NotFound(R::NOT_FOUND))?;

    if !store
        .delete_by_id_for_owner(&id, &user.id)
        .await
        .map_err(failed())?
    {
        return Err(ApiError::NotFound(R::NOT_FOUND));
    }

    tracing::info!("deleted");
    Ok(Json(Deleted { success: true }))
}

pub async fn session(Extension(user): Extension<User>) -> Json<SessionInfo> {
    Json(SessionInfo { user })
}
