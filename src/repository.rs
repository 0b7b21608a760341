use crate::models::{DeleteResult, InsertResult, UpdateResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction, types::Json};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A document body: a JSON object without its identifier.
pub type DocumentBody = Map<String, Value>;

/// Top-level field equality filter. An empty filter matches every document.
pub type Filter = Map<String, Value>;

/// StoreResult
pub type StoreResult<T> = Result<T, StoreError>;

/// StoreError
///
/// Failures raised by the persistence layer. The accessor and handler layers do not
/// recover from `Database`; it surfaces as a 500 for that request.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique business key (e.g. a user's email) is already taken.
    #[error("duplicate value for unique key `{0}`")]
    DuplicateKey(String),
}

/// Collection
///
/// The four document collections. Each maps to one table whose name is fixed here,
/// never taken from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Packages,
    Bookings,
    Testimonials,
    Users,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Packages => "tools_package",
            Collection::Bookings => "bookings",
            Collection::Testimonials => "testimonials",
            Collection::Users => "users",
        }
    }

    /// The field the store keeps unique within this collection, if any.
    pub fn unique_field(self) -> Option<&'static str> {
        match self {
            Collection::Users => Some("email"),
            _ => None,
        }
    }
}

/// Selector
///
/// Picks the single document an update applies to: by identifier, or the first
/// document (in insertion order) matching a field filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Id(Uuid),
    Fields(Filter),
}

impl Selector {
    /// The document an upsert creates when nothing matched: the selector's equality
    /// fields overlaid with the patch.
    fn seed(&self, patch: &DocumentBody) -> (Uuid, DocumentBody) {
        match self {
            Selector::Id(id) => (*id, patch.clone()),
            Selector::Fields(filter) => {
                let mut doc = filter.clone();
                doc.extend(patch.clone());
                (Uuid::new_v4(), doc)
            }
        }
    }
}

/// Document
///
/// A stored document: the store-generated identifier plus its JSON body.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub doc: Json<DocumentBody>,
}

impl Document {
    pub fn new(id: Uuid, body: DocumentBody) -> Self {
        Self { id, doc: Json(body) }
    }

    pub fn body(&self) -> &DocumentBody {
        &self.doc.0
    }

    pub fn matches(&self, filter: &Filter) -> bool {
        filter
            .iter()
            .all(|(field, expected)| self.body().get(field) == Some(expected))
    }
}

/// Applies `$set`-style semantics: top-level fields in `patch` replace those in `doc`.
/// Returns whether anything changed.
fn apply_patch(doc: &mut DocumentBody, patch: &DocumentBody) -> bool {
    let mut modified = false;
    for (field, value) in patch {
        if doc.get(field) != Some(value) {
            doc.insert(field.clone(), value.clone());
            modified = true;
        }
    }
    modified
}

/// Repository Trait
///
/// The abstract document-store contract. Handlers never see the concrete backend,
/// so the Postgres store and the in-memory store are interchangeable behind
/// `Arc<dyn Repository>`.
#[async_trait]
pub trait Repository: Send + Sync {
    /// All documents matching `filter`, in insertion order.
    async fn find(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// First document (in insertion order) matching `filter`.
    async fn find_one(&self, collection: Collection, filter: &Filter)
    -> StoreResult<Option<Document>>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<Option<Document>>;

    /// Stores `body` verbatim under a freshly generated identifier.
    async fn insert(&self, collection: Collection, body: DocumentBody) -> StoreResult<InsertResult>;

    /// Sets the patch's top-level fields on the selected document. With `upsert`, a
    /// missing document is created from the selector plus the patch.
    async fn update_one(
        &self,
        collection: Collection,
        selector: &Selector,
        patch: &DocumentBody,
        upsert: bool,
    ) -> StoreResult<UpdateResult>;

    /// Removing an id that does not exist reports `deleted_count == 0`, not an error.
    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<DeleteResult>;

    /// Releases the underlying connections. Called once, after the server has drained.
    async fn close(&self);
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

/// PostgresRepository
///
/// Document store backed by PostgreSQL: one table per collection with a UUID primary
/// key and a JSONB body (see `migrations/`). A field filter compares each listed
/// top-level field for JSONB equality, matching `Document::matches`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attempts made by an upsert before giving up on a unique-key race.
    const UPSERT_ATTEMPTS: usize = 2;

    async fn try_update_one(
        &self,
        collection: Collection,
        selector: &Selector,
        patch: &DocumentBody,
        upsert: bool,
    ) -> StoreResult<UpdateResult> {
        let table = collection.table();
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        // Lock the target row so a concurrent update cannot interleave with the merge.
        let target = match selector {
            Selector::Id(id) => {
                sqlx::query_as::<_, Document>(&format!(
                    "SELECT id, doc FROM {table} WHERE id = $1 FOR UPDATE"
                ))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
            }
            Selector::Fields(filter) => {
                let mut query = select_matching(table, filter);
                query.push(" LIMIT 1 FOR UPDATE");
                query
                    .build_query_as::<Document>()
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };

        let result = match target {
            Some(mut document) => {
                let modified = apply_patch(&mut document.doc.0, patch);
                if modified {
                    sqlx::query(&format!("UPDATE {table} SET doc = $2 WHERE id = $1"))
                        .bind(document.id)
                        .bind(&document.doc)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_unique_violation(e, collection))?;
                }
                UpdateResult::matched(modified)
            }
            None if upsert => {
                let (id, body) = selector.seed(patch);
                sqlx::query(&format!("INSERT INTO {table} (id, doc) VALUES ($1, $2)"))
                    .bind(id)
                    .bind(Json(&body))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_unique_violation(e, collection))?;
                UpdateResult::upserted(id)
            }
            None => UpdateResult::unmatched(),
        };

        tx.commit().await?;
        Ok(result)
    }
}

/// `SELECT id, doc FROM <table> WHERE <field equality...> ORDER BY created_at, id`.
/// An empty filter selects every row.
fn select_matching<'a>(table: &str, filter: &'a Filter) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT id, doc FROM {table} WHERE TRUE"));
    for (field, value) in filter {
        query
            .push(" AND doc -> ")
            .push_bind(field.as_str())
            .push(" = ")
            .push_bind(Json(value));
    }
    query.push(" ORDER BY created_at, id");
    query
}

/// Translates a unique-constraint violation into `StoreError::DuplicateKey`.
fn map_unique_violation(err: sqlx::Error, collection: Collection) -> StoreError {
    let is_unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);

    if is_unique {
        StoreError::DuplicateKey(collection.unique_field().unwrap_or("_id").to_string())
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>> {
        let documents = select_matching(collection.table(), filter)
            .build_query_as::<Document>()
            .fetch_all(&self.pool)
            .await?;
        Ok(documents)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let mut query = select_matching(collection.table(), filter);
        query.push(" LIMIT 1");
        let document = query
            .build_query_as::<Document>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<Option<Document>> {
        let sql = format!("SELECT id, doc FROM {} WHERE id = $1", collection.table());
        let document = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    async fn insert(&self, collection: Collection, body: DocumentBody) -> StoreResult<InsertResult> {
        let id = Uuid::new_v4();
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", collection.table());
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(&body))
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, collection))?;

        tracing::debug!(collection = collection.table(), %id, "document inserted");
        Ok(InsertResult::new(id))
    }

    /// update_one
    ///
    /// Runs select-merge-write in one transaction. When two first-registrations race,
    /// the loser's INSERT hits the unique index; it is retried once and then finds and
    /// updates the winner's document instead of creating a duplicate.
    async fn update_one(
        &self,
        collection: Collection,
        selector: &Selector,
        patch: &DocumentBody,
        upsert: bool,
    ) -> StoreResult<UpdateResult> {
        let mut attempt = 1;
        loop {
            match self.try_update_one(collection, selector, patch, upsert).await {
                Err(StoreError::DuplicateKey(key)) if upsert && attempt < Self::UPSERT_ATTEMPTS => {
                    tracing::warn!(
                        collection = collection.table(),
                        key = %key,
                        "upsert lost a unique-key race, retrying"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<DeleteResult> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: result.rows_affected(),
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// --- In-memory ---

/// MemoryRepository
///
/// An in-process implementation of `Repository` with the same semantics as the
/// Postgres store, including the unique email on users. Backs the test suites and
/// local runs without `DATABASE_URL`. Every operation holds the lock for its whole
/// duration, so each one is atomic.
#[derive(Default)]
pub struct MemoryRepository {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn violates_unique(
        documents: &[Document],
        collection: Collection,
        body: &DocumentBody,
        except: Option<Uuid>,
    ) -> Option<String> {
        let field = collection.unique_field()?;
        let value = body.get(field)?;
        documents
            .iter()
            .filter(|doc| Some(doc.id) != except)
            .any(|doc| doc.body().get(field) == Some(value))
            .then(|| field.to_string())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| doc.matches(filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| doc.matches(filter)).cloned()))
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned()))
    }

    async fn insert(&self, collection: Collection, body: DocumentBody) -> StoreResult<InsertResult> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();

        if let Some(field) = Self::violates_unique(documents, collection, &body, None) {
            return Err(StoreError::DuplicateKey(field));
        }

        let id = Uuid::new_v4();
        documents.push(Document::new(id, body));
        Ok(InsertResult::new(id))
    }

    async fn update_one(
        &self,
        collection: Collection,
        selector: &Selector,
        patch: &DocumentBody,
        upsert: bool,
    ) -> StoreResult<UpdateResult> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();

        let position = match selector {
            Selector::Id(id) => documents.iter().position(|doc| doc.id == *id),
            Selector::Fields(filter) => documents.iter().position(|doc| doc.matches(filter)),
        };

        match position {
            Some(index) => {
                let mut merged = documents[index].body().clone();
                let modified = apply_patch(&mut merged, patch);
                let id = documents[index].id;
                if let Some(field) = Self::violates_unique(documents, collection, &merged, Some(id))
                {
                    return Err(StoreError::DuplicateKey(field));
                }
                documents[index] = Document::new(id, merged);
                Ok(UpdateResult::matched(modified))
            }
            None if upsert => {
                let (id, body) = selector.seed(patch);
                if let Some(field) = Self::violates_unique(documents, collection, &body, None) {
                    return Err(StoreError::DuplicateKey(field));
                }
                documents.push(Document::new(id, body));
                Ok(UpdateResult::upserted(id))
            }
            None => Ok(UpdateResult::unmatched()),
        }
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> StoreResult<DeleteResult> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();

        let before = documents.len();
        documents.retain(|doc| doc.id != id);

        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: (before - documents.len()) as u64,
        })
    }

    async fn close(&self) {
        // Nothing to release.
    }
}
