use async_trait::async_trait;
use atlas_bridge::{
    ApiError, ApiResult, BridgeConfig, BridgeEvent, Edge, ElementRecord, ElementUpdate,
    PersistenceBridge, Record, RecordClient, ReparentRequest, StructureApi,
};
use atlas_core::{Element, ElementId, MutationIntent, OpId, StructurePayload, synthetic_root_id};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

fn id(s: &str) -> ElementId {
    ElementId::intern(s)
}

/// In-memory backend that records every call it receives.
#[derive(Default)]
struct MockApi {
    calls: Mutex<Vec<String>>,
    next_id: AtomicU32,
    fail_updates: bool,
    /// When set, `create_element` parks until notified.
    gate: Option<Arc<Notify>>,
}

impl MockApi {
    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn show(id: Option<ElementId>) -> String {
    id.map_or_else(|| "top".to_string(), |id| id.to_string())
}

#[async_trait]
impl StructureApi for MockApi {
    async fn fetch_structure(&self, structure_id: &str) -> ApiResult<StructurePayload> {
        self.log(format!("fetch {structure_id}"));
        Ok(StructurePayload {
            id: structure_id.to_string(),
            name: "Fetched".into(),
            ..Default::default()
        })
    }

    async fn create_element(
        &self,
        structure_id: &str,
        parent_id: Option<ElementId>,
        name: &str,
    ) -> ApiResult<ElementRecord> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.log(format!("create {structure_id} {} {name}", show(parent_id)));
        Ok(ElementRecord {
            id: id(&format!("srv_{n}")),
            name: name.to_string(),
            parent_id,
        })
    }

    async fn update_element(&self, id: ElementId, data: ElementUpdate) -> ApiResult<ElementRecord> {
        if self.fail_updates {
            return Err(ApiError::Backend {
                status: 500,
                message: "boom".into(),
            });
        }
        let name = data.name.unwrap_or_default();
        self.log(format!("update {id} {name}"));
        Ok(ElementRecord {
            id,
            name,
            parent_id: None,
        })
    }

    async fn delete_element(&self, id: ElementId) -> ApiResult<()> {
        self.log(format!("delete {id}"));
        Ok(())
    }

    async fn reparent_elements(&self, edges: Vec<ReparentRequest>) -> ApiResult<Vec<Edge>> {
        for edge in &edges {
            self.log(format!(
                "reparent {} {}",
                edge.source_element_id,
                show(edge.target_element_id)
            ));
        }
        Ok(edges
            .into_iter()
            .map(|e| Edge {
                element_id: e.source_element_id,
                parent_id: e.target_element_id,
            })
            .collect())
    }

    async fn create_record(&self, element_id: ElementId, body: serde_json::Value) -> ApiResult<Record> {
        self.log(format!("create_record {element_id}"));
        Ok(Record {
            id: "rec_1".into(),
            element_id,
            body,
        })
    }

    async fn update_record(&self, record_id: &str, body: serde_json::Value) -> ApiResult<Record> {
        self.log(format!("update_record {record_id}"));
        Ok(Record {
            id: record_id.to_string(),
            element_id: id("srv_1"),
            body,
        })
    }

    async fn delete_record(&self, record_id: &str) -> ApiResult<()> {
        self.log(format!("delete_record {record_id}"));
        Ok(())
    }

    async fn records_by_element(&self, element_id: ElementId) -> ApiResult<Vec<Record>> {
        self.log(format!("records {element_id}"));
        Ok(Vec::new())
    }
}

fn no_refetch() -> BridgeConfig {
    BridgeConfig {
        refetch_after_commit: false,
    }
}

#[tokio::test]
async fn intents_run_in_order_with_local_ids_translated() {
    let api = Arc::new(MockApi::default());
    let (handle, mut events) = PersistenceBridge::spawn(api.clone(), "42", BridgeConfig::default());

    let parent = ElementId::local();
    let child = ElementId::local();
    let (op1, op2, op3) = (OpId::next(), OpId::next(), OpId::next());
    assert!(handle.submit(
        op1,
        MutationIntent::Create {
            id: parent,
            parent: id("b_root"),
            content: "Design".into(),
        }
    ));
    assert!(handle.submit(
        op2,
        MutationIntent::Create {
            id: child,
            parent,
            content: "Wireframes".into(),
        }
    ));
    assert!(handle.submit(
        op3,
        MutationIntent::Reparent {
            moved: child,
            new_parent: id("b_root"),
        }
    ));

    assert_eq!(
        events.recv().await,
        Some(BridgeEvent::Confirmed {
            op: op1,
            created: Some((parent, id("srv_1"))),
        })
    );
    assert_eq!(
        events.recv().await,
        Some(BridgeEvent::Confirmed {
            op: op2,
            created: Some((child, id("srv_2"))),
        })
    );
    assert_eq!(
        events.recv().await,
        Some(BridgeEvent::Confirmed {
            op: op3,
            created: None,
        })
    );
    let Some(BridgeEvent::Refreshed { structure }) = events.recv().await else {
        panic!("expected a refresh once the queue drained");
    };
    assert_eq!(structure.id, "42");

    assert_eq!(
        api.calls(),
        vec![
            "create 42 b_root Design",
            "create 42 srv_1 Wireframes",
            "reparent srv_2 b_root",
            "fetch 42",
        ]
    );
}

#[tokio::test]
async fn synthetic_root_maps_to_top_level() {
    let api = Arc::new(MockApi::default());
    let (handle, mut events) = PersistenceBridge::spawn(api.clone(), "9", no_refetch());

    let op = OpId::next();
    handle.submit(
        op,
        MutationIntent::Reparent {
            moved: id("b_leaf"),
            new_parent: synthetic_root_id("9"),
        },
    );
    assert_eq!(
        events.recv().await,
        Some(BridgeEvent::Confirmed { op, created: None })
    );
    assert_eq!(api.calls(), vec!["reparent b_leaf top"]);
}

#[tokio::test]
async fn backend_failure_is_reported_and_later_intents_still_run() {
    let api = Arc::new(MockApi {
        fail_updates: true,
        ..Default::default()
    });
    let (handle, mut events) = PersistenceBridge::spawn(api.clone(), "1", BridgeConfig::default());

    let (op1, op2) = (OpId::next(), OpId::next());
    handle.submit(
        op1,
        MutationIntent::Update {
            id: id("b_a"),
            content: "Renamed".into(),
        },
    );
    handle.submit(op2, MutationIntent::Delete { id: id("b_b") });

    assert_eq!(
        events.recv().await,
        Some(BridgeEvent::Failed {
            op: op1,
            error: ApiError::Backend {
                status: 500,
                message: "boom".into(),
            },
        })
    );
    assert_eq!(
        events.recv().await,
        Some(BridgeEvent::Confirmed {
            op: op2,
            created: None,
        })
    );
    assert!(matches!(
        events.recv().await,
        Some(BridgeEvent::Refreshed { .. })
    ));
    assert_eq!(api.calls(), vec!["delete b_b", "fetch 1"]);
}

#[tokio::test]
async fn unconfirmed_local_id_fails_without_calling_backend() {
    let api = Arc::new(MockApi::default());
    let (handle, mut events) = PersistenceBridge::spawn(api.clone(), "1", no_refetch());

    let ghost = ElementId::local();
    let op = OpId::next();
    handle.submit(op, MutationIntent::Delete { id: ghost });

    assert_eq!(
        events.recv().await,
        Some(BridgeEvent::Failed {
            op,
            error: ApiError::UnknownElement(ghost),
        })
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn shutdown_drops_in_flight_response() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(MockApi {
        gate: Some(gate.clone()),
        ..Default::default()
    });
    let (handle, mut events) = PersistenceBridge::spawn(api.clone(), "1", BridgeConfig::default());

    handle.submit(
        OpId::next(),
        MutationIntent::Create {
            id: ElementId::local(),
            parent: id("b_root"),
            content: "Late".into(),
        },
    );
    // Let the worker reach the parked backend call.
    tokio::task::yield_now().await;
    handle.shutdown();
    gate.notify_one();

    assert_eq!(events.recv().await, None);
    assert!(handle.is_shut_down());
    assert!(!handle.submit(OpId::next(), MutationIntent::Delete { id: id("b_x") }));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn dropping_the_handle_stops_the_worker() {
    let api = Arc::new(MockApi::default());
    let (handle, mut events) = PersistenceBridge::spawn(api, "1", BridgeConfig::default());
    drop(handle);
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn record_client_uses_persisted_ids() {
    let api = Arc::new(MockApi::default());
    let records = RecordClient::new(api.clone());

    let mut element = Element::new(id("b_el"), "Spec");
    let record = records
        .attach(&element, serde_json::json!({"text": "hello"}))
        .await
        .unwrap();
    assert_eq!(record.element_id, id("b_el"));

    assert!(!records.detach(&element).await.unwrap());
    element.refs.record_id = Some(record.id.clone());
    assert!(records.update(&element, serde_json::json!({})).await.unwrap().is_some());
    assert!(records.detach(&element).await.unwrap());

    let pending = Element::local("Draft");
    assert!(matches!(
        records.load(&pending).await,
        Err(ApiError::UnknownElement(_))
    ));

    assert_eq!(
        api.calls(),
        vec!["create_record b_el", "update_record rec_1", "delete_record rec_1"]
    );
}
