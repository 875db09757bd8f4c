//! Persistence bridge: ordered, cancellable backend sync.
//!
//! The editor never awaits the backend. It commits a mutation locally, then
//! submits the matching `MutationIntent` here and keeps going. A single
//! worker task runs intents strictly in submission order (an element must
//! exist before it can be moved), translating locally minted ids to the ids
//! the backend handed out, and reports each outcome as a `BridgeEvent`.
//!
//! Shutting the handle down (or dropping it) cancels the worker. Calls
//! already in flight are abandoned and their responses dropped; nothing is
//! reconciled after the editor has gone away.

use crate::api::{ApiError, ApiResult, ElementUpdate, ReparentRequest, StructureApi};
use atlas_core::{ElementId, MutationIntent, OpId, StructurePayload, synthetic_root_id};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Re-fetch the structure after a successful commit once the queue is
    /// drained, so server-derived fields (ordering) win. Default: **true**.
    pub refetch_after_commit: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            refetch_after_commit: true,
        }
    }
}

/// Outcome of a submitted operation, delivered to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// The backend accepted the operation. `created` maps a local element id
    /// to the id the backend assigned.
    Confirmed {
        op: OpId,
        created: Option<(ElementId, ElementId)>,
    },
    /// The backend rejected the operation or could not be reached.
    Failed { op: OpId, error: ApiError },
    /// Canonical structure fetched after commits settled.
    Refreshed { structure: StructurePayload },
}

enum Job {
    Commit(OpId, MutationIntent),
    Refresh,
}

/// Editor-side handle to a running bridge worker.
pub struct BridgeHandle {
    jobs: mpsc::UnboundedSender<Job>,
    cancel: CancellationToken,
}

impl BridgeHandle {
    /// Queue an intent. Never blocks. Returns false once the worker is gone.
    pub fn submit(&self, op: OpId, intent: MutationIntent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        log::debug!("bridge: queued {op} ({intent})");
        self.jobs.send(Job::Commit(op, intent)).is_ok()
    }

    /// Ask for a canonical re-fetch of the structure.
    pub fn refresh(&self) -> bool {
        !self.cancel.is_cancelled() && self.jobs.send(Job::Refresh).is_ok()
    }

    /// Stop the worker. Pending and in-flight operations are abandoned.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct PersistenceBridge {
    api: Arc<dyn StructureApi>,
    structure_id: String,
    config: BridgeConfig,
    /// Local id → backend id, filled as creates are confirmed.
    persisted: HashMap<ElementId, ElementId>,
    events: mpsc::UnboundedSender<BridgeEvent>,
}

impl PersistenceBridge {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(
        api: Arc<dyn StructureApi>,
        structure_id: impl Into<String>,
        config: BridgeConfig,
    ) -> (BridgeHandle, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let bridge = PersistenceBridge {
            api,
            structure_id: structure_id.into(),
            config,
            persisted: HashMap::new(),
            events: event_tx,
        };
        tokio::spawn(bridge.run(job_rx, cancel.clone()));
        (
            BridgeHandle {
                jobs: job_tx,
                cancel,
            },
            event_rx,
        )
    }

    async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<Job>, cancel: CancellationToken) {
        loop {
            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            match job {
                Job::Commit(op, intent) => {
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            log::debug!("bridge: dropping response for {op}, editor closed");
                            break;
                        }
                        result = self.execute(&intent) => result,
                    };
                    let confirmed = result.is_ok();
                    let event = match result {
                        Ok(created) => {
                            log::debug!("bridge: {op} confirmed");
                            BridgeEvent::Confirmed { op, created }
                        }
                        Err(error) => {
                            log::warn!("bridge: {op} ({intent}) failed: {error}");
                            BridgeEvent::Failed { op, error }
                        }
                    };
                    if self.events.send(event).is_err() {
                        break;
                    }
                    if confirmed && self.config.refetch_after_commit && jobs.is_empty() {
                        self.refresh(&cancel).await;
                    }
                }
                Job::Refresh => self.refresh(&cancel).await,
            }
        }
        log::debug!("bridge: worker for structure {} stopped", self.structure_id);
    }

    async fn refresh(&self, cancel: &CancellationToken) {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            fetched = self.api.fetch_structure(&self.structure_id) => fetched,
        };
        match fetched {
            Ok(structure) => {
                let _ = self.events.send(BridgeEvent::Refreshed { structure });
            }
            Err(err) => log::warn!("bridge: refresh of {} failed: {err}", self.structure_id),
        }
    }

    async fn execute(&mut self, intent: &MutationIntent) -> ApiResult<Option<(ElementId, ElementId)>> {
        match intent {
            MutationIntent::Create {
                id,
                parent,
                content,
            } => {
                let parent = self.resolve_parent(*parent)?;
                let record = self
                    .api
                    .create_element(&self.structure_id, parent, content)
                    .await?;
                self.persisted.insert(*id, record.id);
                Ok(Some((*id, record.id)))
            }
            MutationIntent::Update { id, content } => {
                let id = self.resolve(*id)?;
                let update = ElementUpdate {
                    name: Some(content.clone()),
                    ..Default::default()
                };
                self.api.update_element(id, update).await?;
                Ok(None)
            }
            MutationIntent::Delete { id } => {
                let id = self.resolve(*id)?;
                self.api.delete_element(id).await?;
                Ok(None)
            }
            MutationIntent::Reparent { moved, new_parent } => {
                let request = ReparentRequest {
                    source_element_id: self.resolve(*moved)?,
                    target_element_id: self.resolve_parent(*new_parent)?,
                    attributes: serde_json::Map::new(),
                };
                self.api.reparent_elements(vec![request]).await?;
                Ok(None)
            }
        }
    }

    /// Backend id for `id`. Local ids resolve only after their create was
    /// confirmed.
    fn resolve(&self, id: ElementId) -> ApiResult<ElementId> {
        if !id.is_local() {
            return Ok(id);
        }
        self.persisted
            .get(&id)
            .copied()
            .ok_or(ApiError::UnknownElement(id))
    }

    /// Like `resolve`, but the synthetic structure root maps to "top level".
    fn resolve_parent(&self, id: ElementId) -> ApiResult<Option<ElementId>> {
        if id == synthetic_root_id(&self.structure_id) {
            return Ok(None);
        }
        self.resolve(id).map(Some)
    }
}
