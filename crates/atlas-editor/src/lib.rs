pub mod config;
pub mod history;
pub mod input;
pub mod interaction;
pub mod search;
pub mod session;
pub mod view_state;

pub use config::EditorConfig;
pub use history::History;
pub use input::InputEvent;
pub use interaction::{Gesture, InteractionConfig, InteractionController, ViewCommand, valid_drop};
pub use search::{LevelSearch, SearchView};
pub use session::{Commit, EditorSession, Notice, Rendered, SessionOutput, SyncStatus};
pub use view_state::{LocalStore, MemoryStore, ViewState};
