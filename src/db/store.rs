//! Content store over the `kv_store` table.
//!
//! Each `(namespace, key)` row holds one whole collection or scalar as JSON.
//! Writes replace the row in a single upsert together with the revision bump,
//! so readers never observe a partial write. Read-modify-write cycles are
//! serialized by a process-wide write lock.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::sync::Mutex;

use super::keys::{Collection, Namespace, Scalar, StoreEntity, StoreKey};
use super::legacy::LEGACY_VERSION;
use crate::errors::AppError;
use crate::models::{
    builtin_catalog, Announcement, AnnouncementDismissal, ContentSnapshot, Game, GameRatings,
    ImportSummary, LegacyImportRequest, NewsItem, Review, RevisionInfo, Theme, TokenSnapshot,
    UserStats,
};

/// Client namespace used when a request carries no client identity.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Owner of the database pool. Hands out namespaced [`ContentStore`] views.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store for content shared by the admin panel and every client.
    pub fn shared(&self) -> ContentStore {
        self.namespaced(Namespace::Shared)
    }

    /// Store for one client's private values.
    pub fn client(&self, client_id: &str) -> ContentStore {
        self.namespaced(Namespace::Client(client_id.to_string()))
    }

    fn namespaced(&self, namespace: Namespace) -> ContentStore {
        ContentStore {
            pool: self.pool.clone(),
            write_lock: self.write_lock.clone(),
            namespace,
        }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// All shared content at the current revision.
    pub async fn snapshot(&self) -> Result<ContentSnapshot, AppError> {
        let meta =
            sqlx::query("SELECT schema_version, revision_id, generated_at FROM meta WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        let shared = self.shared();
        Ok(ContentSnapshot {
            schema_version: meta.get("schema_version"),
            revision_id: meta.get("revision_id"),
            generated_at: meta.get("generated_at"),
            announcements: shared.get::<Announcement>().await?,
            news: shared.get::<NewsItem>().await?,
            games: shared.get::<Game>().await?,
            token_data: shared.get_scalar::<TokenSnapshot>().await?,
            reviews: shared.get::<Review>().await?,
        })
    }

    /// Import a dump of the browser storage.
    ///
    /// Every entry is upgraded from the unversioned layout and decoded into its
    /// typed record before anything is written. Either all entries are stored
    /// or none are.
    pub async fn import_legacy(
        &self,
        request: &LegacyImportRequest,
    ) -> Result<ImportSummary, AppError> {
        let client_id = request
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(ANONYMOUS_CLIENT);

        let mut converted = Vec::with_capacity(request.entries.len());
        for (name, raw) in &request.entries {
            let key = StoreKey::parse(name)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown storage key '{}'", name)))?;
            // Browser storage keeps plain strings such as `dark` unquoted
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            let namespace = match key.namespace_kind() {
                super::NamespaceKind::Shared => Namespace::Shared,
                super::NamespaceKind::Client => Namespace::Client(client_id.to_string()),
            };
            converted.push((namespace, key, reencode_legacy(key, value)?));
        }

        let _guard = self.write_lock.lock().await;
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for (namespace, key, json) in &converted {
            upsert(&mut tx, &namespace.column_value(), key.as_str(), 1, json, &now).await?;
        }
        bump_revision(&mut tx, &now).await?;
        tx.commit().await?;

        let imported_keys: Vec<String> = converted
            .iter()
            .map(|(_, key, _)| key.as_str().to_string())
            .collect();
        tracing::info!("Imported {} legacy storage keys", imported_keys.len());

        Ok(ImportSummary { imported_keys })
    }
}

/// A view of the store bound to one namespace.
#[derive(Clone)]
pub struct ContentStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
    namespace: Namespace,
}

impl ContentStore {
    /// Read a collection. A missing key reads as an empty sequence.
    pub async fn get<T: Collection>(&self) -> Result<Vec<T>, AppError> {
        match self.read_raw(T::KEY).await? {
            Some((version, raw)) => decode_collection(version, parse_raw(T::KEY, &raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace a whole collection.
    pub async fn set<T: Collection>(&self, records: &[T]) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        self.write_entity::<T, _>(records).await
    }

    /// Read a scalar. A missing key reads as `None`.
    pub async fn get_scalar<T: Scalar>(&self) -> Result<Option<T>, AppError> {
        match self.read_raw(T::KEY).await? {
            Some((version, raw)) => decode_scalar(version, parse_raw(T::KEY, &raw)?).map(Some),
            None => Ok(None),
        }
    }

    /// Overwrite a scalar.
    pub async fn set_scalar<T: Scalar>(&self, value: &T) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        self.write_entity::<T, _>(value).await
    }

    /// Read-modify-write a collection. Nothing is written when `f` fails.
    pub async fn update<T, R, F>(&self, f: F) -> Result<R, AppError>
    where
        T: Collection,
        R: Send,
        F: FnOnce(&mut Vec<T>) -> Result<R, AppError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.get::<T>().await?;
        let result = f(&mut records)?;
        self.write_entity::<T, _>(&records).await?;
        Ok(result)
    }

    /// Read-modify-write a scalar, starting from its default when absent.
    pub async fn update_scalar<T, R, F>(&self, f: F) -> Result<R, AppError>
    where
        T: Scalar + Default,
        R: Send,
        F: FnOnce(&mut T) -> Result<R, AppError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut value = self.get_scalar::<T>().await?.unwrap_or_default();
        let result = f(&mut value)?;
        self.write_entity::<T, _>(&value).await?;
        Ok(result)
    }

    /// Read-modify-write a collection of this namespace together with a scalar
    /// of `other`. Both values are committed in one transaction, or neither is
    /// when a read, `f` or the write fails.
    pub async fn update_with<T, S, R, F>(&self, other: &ContentStore, f: F) -> Result<R, AppError>
    where
        T: Collection,
        S: Scalar + Default,
        R: Send,
        F: FnOnce(&mut Vec<T>, &mut S) -> Result<R, AppError> + Send,
    {
        self.check_same_storage(other)?;
        let _guard = self.write_lock.lock().await;
        let mut records = self.get::<T>().await?;
        let mut value = other.get_scalar::<S>().await?.unwrap_or_default();
        let result = f(&mut records, &mut value)?;

        let writes = vec![
            self.stage::<T, _>(&records)?,
            other.stage::<S, _>(&value)?,
        ];
        commit(&self.pool, writes).await?;
        Ok(result)
    }

    /// Read-modify-write two scalars of this namespace in one transaction.
    pub async fn update_scalars<A, B, R, F>(&self, f: F) -> Result<R, AppError>
    where
        A: Scalar + Default,
        B: Scalar + Default,
        R: Send,
        F: FnOnce(&mut A, &mut B) -> Result<R, AppError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut first = self.get_scalar::<A>().await?.unwrap_or_default();
        let mut second = self.get_scalar::<B>().await?.unwrap_or_default();
        let result = f(&mut first, &mut second)?;

        let writes = vec![self.stage::<A, _>(&first)?, self.stage::<B, _>(&second)?];
        commit(&self.pool, writes).await?;
        Ok(result)
    }

    /// The games shown in the catalog: the custom collection, or the built-in
    /// catalog while no custom game is stored. The fallback is never persisted.
    pub async fn games(&self) -> Result<Vec<Game>, AppError> {
        let custom = self.get::<Game>().await?;
        if custom.is_empty() {
            Ok(builtin_catalog())
        } else {
            Ok(custom)
        }
    }

    fn check_namespace(&self, key: StoreKey) -> Result<(), AppError> {
        if key.namespace_kind() != self.namespace.kind() {
            return Err(AppError::Internal(format!(
                "Key '{}' is not stored in namespace '{}'",
                key.as_str(),
                self.namespace.column_value()
            )));
        }
        Ok(())
    }

    async fn read_raw(&self, key: StoreKey) -> Result<Option<(i64, String)>, AppError> {
        self.check_namespace(key)?;

        let row =
            sqlx::query("SELECT schema_version, value FROM kv_store WHERE namespace = ? AND key = ?")
                .bind(self.namespace.column_value())
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|r| (r.get("schema_version"), r.get("value"))))
    }

    /// Callers must hold the write lock.
    async fn write_entity<T: StoreEntity, V: serde::Serialize + ?Sized>(
        &self,
        value: &V,
    ) -> Result<(), AppError> {
        commit(&self.pool, vec![self.stage::<T, V>(value)?]).await
    }

    fn stage<T: StoreEntity, V: serde::Serialize + ?Sized>(
        &self,
        value: &V,
    ) -> Result<PendingWrite, AppError> {
        self.check_namespace(T::KEY)?;
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", T::KEY.as_str(), e)))?;

        Ok(PendingWrite {
            namespace: self.namespace.column_value(),
            key: T::KEY,
            schema_version: T::SCHEMA_VERSION,
            json,
        })
    }

    fn check_same_storage(&self, other: &ContentStore) -> Result<(), AppError> {
        if !Arc::ptr_eq(&self.write_lock, &other.write_lock) {
            return Err(AppError::Internal(
                "Cannot update values of different storages together".to_string(),
            ));
        }
        Ok(())
    }
}

/// An encoded value waiting for its transaction.
struct PendingWrite {
    namespace: String,
    key: StoreKey,
    schema_version: i64,
    json: String,
}

/// Upsert every value and bump the revision once, all in one transaction.
async fn commit(pool: &SqlitePool, writes: Vec<PendingWrite>) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();

    let mut tx = pool.begin().await?;
    for write in &writes {
        upsert(
            &mut tx,
            &write.namespace,
            write.key.as_str(),
            write.schema_version,
            &write.json,
            &now,
        )
        .await?;
    }
    bump_revision(&mut tx, &now).await?;
    tx.commit().await?;

    for write in &writes {
        tracing::debug!(
            namespace = %write.namespace,
            key = write.key.as_str(),
            bytes = write.json.len(),
            "Stored value"
        );
    }
    Ok(())
}

async fn upsert(
    conn: &mut SqliteConnection,
    namespace: &str,
    key: &str,
    schema_version: i64,
    value: &str,
    now: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO kv_store (namespace, key, schema_version, value, updated_at)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(namespace, key) DO UPDATE SET
               schema_version = excluded.schema_version,
               value = excluded.value,
               updated_at = excluded.updated_at"#,
    )
    .bind(namespace)
    .bind(key)
    .bind(schema_version)
    .bind(value)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

async fn bump_revision(conn: &mut SqliteConnection, now: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}

fn parse_error(key: StoreKey, message: impl std::fmt::Display) -> AppError {
    tracing::warn!("Corrupted value under '{}': {}", key.as_str(), message);
    AppError::Parse {
        key: key.as_str().to_string(),
        message: message.to_string(),
    }
}

fn parse_raw(key: StoreKey, raw: &str) -> Result<Value, AppError> {
    serde_json::from_str(raw).map_err(|e| parse_error(key, e))
}

fn decode_collection<T: Collection>(version: i64, value: Value) -> Result<Vec<T>, AppError> {
    let value = if version == T::SCHEMA_VERSION {
        value
    } else if version < T::SCHEMA_VERSION {
        let Value::Array(items) = value else {
            return Err(parse_error(T::KEY, "expected an array"));
        };
        let upgraded = items
            .into_iter()
            .map(|item| T::upgrade(item, version))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| parse_error(T::KEY, e))?;
        Value::Array(upgraded)
    } else {
        return Err(parse_error(
            T::KEY,
            format!("unsupported schema version {}", version),
        ));
    };

    serde_json::from_value(value).map_err(|e| parse_error(T::KEY, e))
}

fn decode_scalar<T: Scalar>(version: i64, value: Value) -> Result<T, AppError> {
    let value = if version == T::SCHEMA_VERSION {
        value
    } else if version < T::SCHEMA_VERSION {
        T::upgrade(value, version).map_err(|e| parse_error(T::KEY, e))?
    } else {
        return Err(parse_error(
            T::KEY,
            format!("unsupported schema version {}", version),
        ));
    };

    serde_json::from_value(value).map_err(|e| parse_error(T::KEY, e))
}

fn reencode_collection<T: Collection>(value: Value) -> Result<String, AppError> {
    let records: Vec<T> = decode_collection(LEGACY_VERSION, value)?;
    serde_json::to_string(&records).map_err(AppError::from)
}

fn reencode_scalar<T: Scalar>(value: Value) -> Result<String, AppError> {
    let record: T = decode_scalar(LEGACY_VERSION, value)?;
    serde_json::to_string(&record).map_err(AppError::from)
}

fn reencode_legacy(key: StoreKey, value: Value) -> Result<String, AppError> {
    match key {
        StoreKey::Announcements => reencode_collection::<Announcement>(value),
        StoreKey::News => reencode_collection::<NewsItem>(value),
        StoreKey::Games => reencode_collection::<Game>(value),
        StoreKey::UserReviews => reencode_collection::<Review>(value),
        StoreKey::TokenData => reencode_scalar::<TokenSnapshot>(value),
        StoreKey::GameRatings => reencode_scalar::<GameRatings>(value),
        StoreKey::UserStats => reencode_scalar::<UserStats>(value),
        StoreKey::Theme => reencode_scalar::<Theme>(value),
        StoreKey::AnnouncementClosed => reencode_scalar::<AnnouncementDismissal>(value),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, TimeZone};
    use tempfile::TempDir;

    use super::*;
    use crate::db::init_database;
    use crate::models::{AnnouncementKind, NewsKind};

    async fn storage() -> (Storage, SqlitePool, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("store.sqlite"))
            .await
            .expect("Failed to init DB");
        (Storage::new(pool.clone()), pool, temp_dir)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn announcement(id: &str) -> Announcement {
        Announcement {
            id: id.to_string(),
            text: format!("Announcement {}", id),
            kind: AnnouncementKind::Warning,
            active: true,
            created_at: at(1_700_000_000),
        }
    }

    fn game(id: &str) -> Game {
        Game {
            id: id.to_string(),
            name: format!("Game {}", id),
            tag: Some("NEW".to_string()),
            description: "Fun".to_string(),
            image: "https://cdn.example.com/g.png".to_string(),
            url: "https://t.me/g_bot".to_string(),
        }
    }

    async fn insert_raw(pool: &SqlitePool, namespace: &str, key: &str, version: i64, value: &str) {
        sqlx::query(
            "INSERT INTO kv_store (namespace, key, schema_version, value, updated_at) VALUES (?, ?, ?, ?, datetime('now'))",
        )
        .bind(namespace)
        .bind(key)
        .bind(version)
        .bind(value)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_missing_keys_read_empty() {
        let (storage, _pool, _dir) = storage().await;

        assert!(storage.shared().get::<Announcement>().await.unwrap().is_empty());
        assert!(storage
            .shared()
            .get_scalar::<TokenSnapshot>()
            .await
            .unwrap()
            .is_none());
        assert!(storage
            .client("1")
            .get_scalar::<UserStats>()
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_round_trip_every_entity_kind() {
        let (storage, _pool, _dir) = storage().await;
        let shared = storage.shared();
        let client = storage.client("42");

        let announcements = vec![announcement("a1")];
        let news = vec![NewsItem {
            id: "n1".to_string(),
            title: "Season 2".to_string(),
            content: "New levels".to_string(),
            kind: NewsKind::Event,
            date: at(1_700_000_500),
        }];
        let games = vec![game("g1")];
        let token = TokenSnapshot {
            usd_price: 0.00001234,
            change_24h: -3.5,
            usd_to_rub_rate: 95.2,
            last_updated: Utc::now(),
        };
        let reviews = vec![Review {
            id: "r1".to_string(),
            game_id: "g1".to_string(),
            rating: 4,
            text: "Great fun for everyone".to_string(),
            author: "Ivan".to_string(),
            timestamp: Utc::now(),
            user_id: Some("42".to_string()),
        }];
        let mut ratings = GameRatings::default();
        ratings.set("g1", 5);
        let stats = UserStats {
            ratings_given: 1,
            reviews_written: 2,
            games_played: 3,
        };

        shared.set(&announcements).await.unwrap();
        shared.set(&news).await.unwrap();
        shared.set(&games).await.unwrap();
        shared.set_scalar(&token).await.unwrap();
        shared.set(&reviews).await.unwrap();
        client.set_scalar(&ratings).await.unwrap();
        client.set_scalar(&stats).await.unwrap();
        client.set_scalar(&Theme::Dark).await.unwrap();
        client
            .set_scalar(&AnnouncementDismissal(true))
            .await
            .unwrap();

        assert_eq!(shared.get::<Announcement>().await.unwrap(), announcements);
        assert_eq!(shared.get::<NewsItem>().await.unwrap(), news);
        assert_eq!(shared.get::<Game>().await.unwrap(), games);
        assert_eq!(shared.get_scalar::<TokenSnapshot>().await.unwrap(), Some(token));
        assert_eq!(shared.get::<Review>().await.unwrap(), reviews);
        assert_eq!(client.get_scalar::<GameRatings>().await.unwrap(), Some(ratings));
        assert_eq!(client.get_scalar::<UserStats>().await.unwrap(), Some(stats));
        assert_eq!(client.get_scalar::<Theme>().await.unwrap(), Some(Theme::Dark));
        assert_eq!(
            client.get_scalar::<AnnouncementDismissal>().await.unwrap(),
            Some(AnnouncementDismissal(true))
        );
    }

    #[tokio::test]
    async fn test_client_namespaces_are_isolated() {
        let (storage, _pool, _dir) = storage().await;

        storage.client("a").set_scalar(&Theme::Dark).await.unwrap();

        assert_eq!(
            storage.client("b").get_scalar::<Theme>().await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_wrong_namespace_is_rejected() {
        let (storage, _pool, _dir) = storage().await;

        let err = storage.shared().get_scalar::<Theme>().await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let err = storage.client("a").set(&[game("g1")]).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_games_fallback_is_not_persisted() {
        let (storage, _pool, _dir) = storage().await;
        let shared = storage.shared();

        let games = shared.games().await.unwrap();
        assert_eq!(games, builtin_catalog());
        assert!(shared.get::<Game>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_games_replace_defaults() {
        let (storage, _pool, _dir) = storage().await;
        let shared = storage.shared();

        shared.set(&[game("g1"), game("g2")]).await.unwrap();
        assert_eq!(shared.games().await.unwrap().len(), 2);

        shared
            .update::<Game, _, _>(|games| {
                games.retain(|g| g.id != "g2");
                Ok(())
            })
            .await
            .unwrap();
        let games = shared.games().await.unwrap();
        assert_eq!(games, vec![game("g1")]);
        assert!(games.iter().all(|g| !g.is_builtin()));

        shared.set::<Game>(&[]).await.unwrap();
        assert_eq!(shared.games().await.unwrap(), builtin_catalog());
    }

    #[tokio::test]
    async fn test_failed_update_writes_nothing() {
        let (storage, _pool, _dir) = storage().await;
        let shared = storage.shared();
        shared.set(&[announcement("a1")]).await.unwrap();
        let revision = storage.get_revision_id().await.unwrap();

        let result = shared
            .update::<Announcement, (), _>(|list| {
                list.clear();
                Err(AppError::NotFound("nope".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(shared.get::<Announcement>().await.unwrap().len(), 1);
        assert_eq!(storage.get_revision_id().await.unwrap(), revision);
    }

    #[tokio::test]
    async fn test_paired_update_commits_together() {
        let (storage, _pool, _dir) = storage().await;
        let client = storage.client("c1");
        let revision = storage.get_revision_id().await.unwrap();

        storage
            .shared()
            .update_with::<Announcement, UserStats, _, _>(&client, |list, stats| {
                list.push(announcement("a1"));
                stats.record_review();
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(storage.shared().get::<Announcement>().await.unwrap().len(), 1);
        let stats = client.get_scalar::<UserStats>().await.unwrap().unwrap();
        assert_eq!(stats.reviews_written, 1);
        assert_eq!(storage.get_revision_id().await.unwrap(), revision + 1);
    }

    #[tokio::test]
    async fn test_paired_update_with_corrupt_scalar_writes_nothing() {
        let (storage, pool, _dir) = storage().await;
        insert_raw(&pool, "client:c1", "user_stats", 1, "{broken").await;
        let revision = storage.get_revision_id().await.unwrap();

        let err = storage
            .shared()
            .update_with::<Announcement, UserStats, _, _>(&storage.client("c1"), |list, stats| {
                list.push(announcement("a1"));
                stats.record_review();
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Parse { .. }));
        assert!(storage.shared().get::<Announcement>().await.unwrap().is_empty());
        assert_eq!(storage.get_revision_id().await.unwrap(), revision);
    }

    #[tokio::test]
    async fn test_paired_update_rejects_foreign_storage() {
        let (storage, _pool, _dir) = storage().await;
        let (other, _other_pool, _other_dir) = self::storage().await;

        let err = storage
            .shared()
            .update_with::<Announcement, UserStats, _, _>(&other.client("c1"), |_, _| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_scalar_pair_update_with_corrupt_value_writes_nothing() {
        let (storage, pool, _dir) = storage().await;
        insert_raw(&pool, "client:c1", "user_stats", 1, "[1, 2").await;
        let client = storage.client("c1");

        let result = client
            .update_scalars::<GameRatings, UserStats, _, _>(|ratings, stats| {
                ratings.set("g1", 4);
                stats.record_rating();
                Ok(())
            })
            .await;

        assert!(result.is_err());
        assert!(client.get_scalar::<GameRatings>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writes_bump_revision() {
        let (storage, _pool, _dir) = storage().await;
        let before = storage.get_revision_id().await.unwrap();

        storage.shared().set(&[announcement("a1")]).await.unwrap();
        storage.client("x").set_scalar(&Theme::Dark).await.unwrap();

        assert_eq!(storage.get_revision_id().await.unwrap(), before + 2);
    }

    #[tokio::test]
    async fn test_corrupted_value_fails_with_parse_error() {
        let (storage, pool, _dir) = storage().await;
        insert_raw(&pool, "shared", "news", 1, "{not json").await;

        let err = storage.shared().get::<NewsItem>().await.unwrap_err();
        match err {
            AppError::Parse { key, .. } => assert_eq!(key, "news"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_shape_fails_with_parse_error() {
        let (storage, pool, _dir) = storage().await;
        insert_raw(&pool, "shared", "tokenData", 1, r#"{"usdPrice":"abc"}"#).await;

        let err = storage
            .shared()
            .get_scalar::<TokenSnapshot>()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_legacy_rows_are_upgraded_on_read() {
        let (storage, pool, _dir) = storage().await;
        insert_raw(
            &pool,
            "shared",
            "announcements",
            0,
            r#"[{"id": 1700000000000, "text": "Legacy", "type": "success", "active": false, "createdAt": 1700000000000}]"#,
        )
        .await;

        let list = storage.shared().get::<Announcement>().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "1700000000000");
        assert_eq!(list[0].kind, AnnouncementKind::Success);
        assert!(!list[0].active);
    }

    #[tokio::test]
    async fn test_future_schema_version_is_rejected() {
        let (storage, pool, _dir) = storage().await;
        insert_raw(&pool, "shared", "games", 9, "[]").await;

        let err = storage.shared().get::<Game>().await.unwrap_err();
        assert!(err.message().contains("unsupported schema version 9"));
    }

    #[tokio::test]
    async fn test_import_legacy_dump() {
        let (storage, _pool, _dir) = storage().await;
        let mut entries = BTreeMap::new();
        entries.insert(
            "games".to_string(),
            r#"[{"id": 1, "name": "Old", "tag": "", "description": "d", "image": "https://x/i.png", "url": "https://x"}]"#
                .to_string(),
        );
        entries.insert("theme".to_string(), "dark".to_string());
        entries.insert("announcement_closed".to_string(), "true".to_string());

        let summary = storage
            .import_legacy(&LegacyImportRequest {
                entries,
                client_id: Some("77".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(summary.imported_keys.len(), 3);
        let games = storage.shared().get::<Game>().await.unwrap();
        assert_eq!(games[0].id, "1");
        assert_eq!(games[0].tag, None);
        let client = storage.client("77");
        assert_eq!(client.get_scalar::<Theme>().await.unwrap(), Some(Theme::Dark));
        assert_eq!(
            client.get_scalar::<AnnouncementDismissal>().await.unwrap(),
            Some(AnnouncementDismissal(true))
        );
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let (storage, _pool, _dir) = storage().await;
        let mut entries = BTreeMap::new();
        entries.insert(
            "announcements".to_string(),
            r#"[{"id": 1, "text": "ok", "createdAt": 1700000000000}]"#.to_string(),
        );
        entries.insert("news".to_string(), "not json at all".to_string());

        let result = storage
            .import_legacy(&LegacyImportRequest {
                entries,
                client_id: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Parse { .. })));
        assert!(storage.shared().get::<Announcement>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_rejects_unknown_keys() {
        let (storage, _pool, _dir) = storage().await;
        let mut entries = BTreeMap::new();
        entries.insert("cart".to_string(), "[]".to_string());

        let result = storage
            .import_legacy(&LegacyImportRequest {
                entries,
                client_id: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
