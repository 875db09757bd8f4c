pub mod api;
pub mod bridge;
pub mod records;

pub use api::{
    ApiError, ApiResult, Edge, ElementRecord, ElementUpdate, Record, ReparentRequest, StructureApi,
};
pub use bridge::{BridgeConfig, BridgeEvent, BridgeHandle, PersistenceBridge};
pub use records::RecordClient;
