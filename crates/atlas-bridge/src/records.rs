//! Rich-content records attached to outline elements.

use crate::api::{ApiError, ApiResult, Record, StructureApi};
use atlas_core::{Element, ElementId};
use std::sync::Arc;

/// Record calls addressed by editor element rather than backend id.
#[derive(Clone)]
pub struct RecordClient {
    api: Arc<dyn StructureApi>,
}

impl RecordClient {
    pub fn new(api: Arc<dyn StructureApi>) -> Self {
        Self { api }
    }

    /// Create a record for `element`. Unconfirmed local elements have no
    /// backend counterpart yet and are rejected.
    pub async fn attach(&self, element: &Element, body: serde_json::Value) -> ApiResult<Record> {
        let id = persisted(element)?;
        let record = self.api.create_record(id, body).await?;
        log::debug!("attached record {} to element {id}", record.id);
        Ok(record)
    }

    pub async fn load(&self, element: &Element) -> ApiResult<Vec<Record>> {
        self.api.records_by_element(persisted(element)?).await
    }

    /// Update the element's attached record, if it has one.
    pub async fn update(&self, element: &Element, body: serde_json::Value) -> ApiResult<Option<Record>> {
        match &element.refs.record_id {
            Some(record_id) => self.api.update_record(record_id, body).await.map(Some),
            None => Ok(None),
        }
    }

    /// Delete the element's attached record. Returns whether one existed.
    pub async fn detach(&self, element: &Element) -> ApiResult<bool> {
        let Some(record_id) = &element.refs.record_id else {
            return Ok(false);
        };
        self.api.delete_record(record_id).await?;
        log::debug!("detached record {record_id} from element {}", element.id);
        Ok(true)
    }
}

fn persisted(element: &Element) -> ApiResult<ElementId> {
    let id = element.persisted_id();
    if id.is_local() {
        return Err(ApiError::UnknownElement(id));
    }
    Ok(id)
}
