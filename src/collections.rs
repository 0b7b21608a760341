use std::marker::PhantomData;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{DeleteResult, Entity, InsertResult, Stored, UpdateResult},
    repository::{Document, DocumentBody, Filter, RepositoryState, Selector},
};

/// Key the store generates for every document. A submitted value is never written.
const ID_FIELD: &str = "_id";

/// CollectionHandle
///
/// A handle onto one collection. Every method is a single delegation to the
/// repository; the handle only adds id parsing and the `_id` wrapping of results.
/// Documents go in and come out exactly as submitted.
pub struct CollectionHandle<T> {
    repo: RepositoryState,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> CollectionHandle<T> {
    pub fn new(repo: RepositoryState) -> Self {
        Self {
            repo,
            _entity: PhantomData,
        }
    }

    pub async fn list_all(&self) -> ApiResult<Vec<Stored>> {
        self.list_by_filter(Filter::new()).await
    }

    pub async fn list_by_filter(&self, filter: Filter) -> ApiResult<Vec<Stored>> {
        let documents = self.repo.find(T::COLLECTION, &filter).await?;
        Ok(documents.into_iter().map(into_stored).collect())
    }

    pub async fn find_one(&self, filter: Filter) -> ApiResult<Option<Stored>> {
        let document = self.repo.find_one(T::COLLECTION, &filter).await?;
        Ok(document.map(into_stored))
    }

    /// get_by_id
    ///
    /// A malformed id is an `InvalidId` error; a well-formed id with no document is `Ok(None)`.
    pub async fn get_by_id(&self, id: &str) -> ApiResult<Option<Stored>> {
        let id = parse_id(id)?;
        let document = self.repo.find_by_id(T::COLLECTION, id).await?;
        Ok(document.map(into_stored))
    }

    /// Stores `body` verbatim under a fresh identifier.
    pub async fn insert(&self, mut body: DocumentBody) -> ApiResult<InsertResult> {
        body.remove(ID_FIELD);
        Ok(self.repo.insert(T::COLLECTION, body).await?)
    }

    /// Sets `patch` on the selected document, creating it when nothing matches.
    pub async fn upsert(&self, selector: Selector, mut patch: DocumentBody) -> ApiResult<UpdateResult> {
        patch.remove(ID_FIELD);
        Ok(self
            .repo
            .update_one(T::COLLECTION, &selector, &patch, true)
            .await?)
    }

    /// Sets `patch` on the selected document; a miss reports `matched_count == 0`.
    pub async fn update(&self, selector: Selector, mut patch: DocumentBody) -> ApiResult<UpdateResult> {
        patch.remove(ID_FIELD);
        Ok(self
            .repo
            .update_one(T::COLLECTION, &selector, &patch, false)
            .await?)
    }

    pub async fn delete_by_id(&self, id: &str) -> ApiResult<DeleteResult> {
        let id = parse_id(id)?;
        Ok(self.repo.delete_by_id(T::COLLECTION, id).await?)
    }
}

/// Parses a path parameter into the store's identifier type.
pub fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidId(id.to_string()))
}

fn into_stored(document: Document) -> Stored {
    let Document { id, doc } = document;
    Stored { id, doc: doc.0 }
}
