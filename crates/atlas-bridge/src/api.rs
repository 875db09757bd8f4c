//! Backend API contract consumed by the bridge.
//!
//! The embedding application implements `StructureApi` over its HTTP client;
//! the bridge only depends on this trait.

use atlas_core::{ElementId, StructurePayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("backend rejected the request ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("element {0} has no persisted counterpart")]
    UnknownElement(ElementId),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Element as returned by create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    pub id: ElementId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<ElementId>,
}

/// Partial update for `update_element`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ElementId>,
}

/// One edge change for `reparent_elements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReparentRequest {
    pub source_element_id: ElementId,
    /// `None` moves the element to the top level of the structure.
    pub target_element_id: Option<ElementId>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Edge as confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub element_id: ElementId,
    pub parent_id: Option<ElementId>,
}

/// Rich-content record attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub element_id: ElementId,
    #[serde(default)]
    pub body: serde_json::Value,
}

#[async_trait]
pub trait StructureApi: Send + Sync {
    async fn fetch_structure(&self, structure_id: &str) -> ApiResult<StructurePayload>;

    async fn create_element(
        &self,
        structure_id: &str,
        parent_id: Option<ElementId>,
        name: &str,
    ) -> ApiResult<ElementRecord>;

    async fn update_element(&self, id: ElementId, data: ElementUpdate) -> ApiResult<ElementRecord>;

    async fn delete_element(&self, id: ElementId) -> ApiResult<()>;

    async fn reparent_elements(&self, edges: Vec<ReparentRequest>) -> ApiResult<Vec<Edge>>;

    async fn create_record(&self, element_id: ElementId, body: serde_json::Value) -> ApiResult<Record>;

    async fn update_record(&self, record_id: &str, body: serde_json::Value) -> ApiResult<Record>;

    async fn delete_record(&self, record_id: &str) -> ApiResult<()>;

    async fn records_by_element(&self, element_id: ElementId) -> ApiResult<Vec<Record>>;
}
