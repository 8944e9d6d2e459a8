//! Single saved object lifecycle - load, save and delete by id

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::saved_object::{SavedObjectRecord, SavedObjectType};
use crate::domain::store::{DocumentStore, Hit};
use crate::domain::DomainError;

/// Handle on one saved object of type `T` in the index
pub struct SavedObject<T> {
    store: Arc<dyn DocumentStore>,
    index: String,
    id: Option<String>,
    _type: PhantomData<fn() -> T>,
}

impl<T: SavedObjectType> SavedObject<T> {
    /// Creates a handle; without an id (or with an empty one) the object
    /// is new and unsaved
    pub fn new(store: Arc<dyn DocumentStore>, index: impl Into<String>, id: Option<String>) -> Self {
        Self {
            store,
            index: index.into(),
            id: id.filter(|id| !id.is_empty()),
            _type: PhantomData,
        }
    }

    /// Loads the object from the index
    ///
    /// A handle without an id yields a fresh record with default
    /// attributes and a generated id.
    pub async fn init(&self) -> Result<SavedObjectRecord<T>, DomainError> {
        let Some(id) = &self.id else {
            return Ok(SavedObjectRecord::new(Uuid::new_v4().to_string(), T::default()));
        };

        let hit = self
            .store
            .get(&self.index, T::TYPE, id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!("Could not locate that {} (id: {})", T::TYPE, id))
            })?;

        Ok(record_from_hit(&hit))
    }

    /// Persists a document source, returning the id it was stored under
    pub async fn save(&self, source: &Map<String, Value>) -> Result<String, DomainError> {
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let source = Value::Object(source.clone());
        self.store.index(&self.index, T::TYPE, &id, &source).await?;
        Ok(id)
    }

    /// Removes the object from the index
    pub async fn delete(&self) -> Result<(), DomainError> {
        let id = self.id.as_deref().ok_or_else(|| {
            DomainError::validation(format!("Cannot delete an unsaved {}", T::TYPE))
        })?;

        self.store.delete(&self.index, T::TYPE, id).await
    }
}

/// Builds a record from a raw hit: the source as stored plus `id` and `url`
pub fn record_from_hit<T: SavedObjectType>(hit: &Hit) -> SavedObjectRecord<T> {
    let source = match &hit.source {
        Value::Object(source) => source.clone(),
        Value::Null => Map::new(),
        other => {
            tracing::warn!(
                object_type = T::TYPE,
                id = %hit.id,
                source = %other,
                "Document source is not an object"
            );
            Map::new()
        }
    };

    SavedObjectRecord::from_source(hit.id.clone(), source)
}
