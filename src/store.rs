use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    FromRow, Sqlite, SqlitePool,
};
use uuid::Uuid;

use crate::error::{ApiError, StoreError};

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Columns every owned resource carries. None of them are ever taken from
/// client input.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(owner_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A row type stored in its own table and scoped by `user_id`.
pub trait OwnedResource:
    for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Sync + Unpin + 'static
{
    /// Body accepted on create.
    type Draft: DeserializeOwned + Send + 'static;
    /// Body accepted on update. Absent fields leave the stored value alone.
    type Patch: DeserializeOwned + Send + 'static;

    const TABLE: &'static str;
    /// Resource-specific columns, in the order `bind_fields` binds them.
    const FIELDS: &'static [&'static str];
    /// Singular name used in error messages, e.g. "custom button".
    const SINGULAR: &'static str;
    const PLURAL: &'static str;
    const NOT_FOUND: &'static str;

    fn record(&self) -> &Record;
    fn record_mut(&mut self) -> &mut Record;

    /// Validates a create body and builds the resource around `record`.
    fn from_draft(draft: Self::Draft, record: Record) -> Result<Self, ApiError>;
    fn validate_patch(patch: &Self::Patch) -> Result<(), ApiError>;
    fn merge(&mut self, patch: Self::Patch);
    fn bind_fields<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

/// Deserializes a field that is present, including an explicit `null`, as
/// `Some`. Pair with `#[serde(default)]` so an absent field stays `None`.
pub fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

pub struct Store<R> {
    pool: SqlitePool,
    kind: PhantomData<fn() -> R>,
}

impl<R: OwnedResource> Store<R> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            kind: PhantomData,
        }
    }

    #[tracing::instrument(name = "list resources", skip(self), fields(table = R::TABLE))]
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<R>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE user_id = ? ORDER BY rowid", R::TABLE);
        let resources = sqlx::query_as::<_, R>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(resources)
    }

    #[tracing::instrument(name = "get resource", skip(self), fields(table = R::TABLE))]
    pub async fn get_by_id_for_owner(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<R>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE id = ? AND user_id = ?", R::TABLE);
        let resource = sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(resource)
    }

    #[tracing::instrument(name = "create resource", skip_all, fields(table = R::TABLE, id = %resource.record().id))]
    pub async fn create(&self, resource: R) -> Result<R, StoreError> {
        let sql = format!(
            "INSERT INTO {} (id, user_id, {}, created_at, updated_at) VALUES ({})",
            R::TABLE,
            R::FIELDS.join(", "),
            vec!["?"; R::FIELDS.len() + 4].join(", "),
        );

        let record = resource.record();
        let query = sqlx::query(&sql)
            .bind(record.id.clone())
            .bind(record.user_id.clone());
        let query = resource
            .bind_fields(query)
            .bind(record.created_at)
            .bind(record.updated_at);

        query.execute(&self.pool).await.map_err(|error| match error {
            sqlx::Error::Database(ref e) if e.is_unique_violation() => {
                StoreError::Duplicate(record.id.clone())
            }
            other => StoreError::Database(other),
        })?;

        Ok(resource)
    }

    /// Applies `patch` over the owner's resource. `None` when the resource
    /// does not exist for this owner, in which case nothing is written.
    ///
    /// The lookup and the write are separate statements; a concurrent
    /// update in between is overwritten (last write wins).
    #[tracing::instrument(name = "merge resource", skip(self, patch), fields(table = R::TABLE))]
    pub async fn merge_update(
        &self,
        id: &str,
        owner_id: &str,
        patch: R::Patch,
    ) -> Result<Option<R>, StoreError> {
        let Some(mut resource) = self.get_by_id_for_owner(id, owner_id).await? else {
            return Ok(None);
        };

        resource.merge(patch);
        resource.record_mut().updated_at = Utc::now();

        let assignments = R::FIELDS
            .iter()
            .map(|field| format!("{field} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {}, updated_at = ? WHERE id = ? AND user_id = ?",
            R::TABLE,
            assignments
        );

        let result = resource
            .bind_fields(sqlx::query(&sql))
            .bind(resource.record().updated_at)
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("resource disappeared between lookup and update");
            return Ok(None);
        }

        Ok(Some(resource))
    }

    /// `false` when the resource does not exist for this owner.
    #[tracing::instrument(name = "delete resource", skip(self), fields(table = R::TABLE))]
    pub async fn delete_by_id_for_owner(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        if self.get_by_id_for_owner(id, owner_id).await?.is_none() {
            return Ok(false);
        }

        let sql = format!("DELETE FROM {} WHERE id = ? AND user_id = ?", R::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
