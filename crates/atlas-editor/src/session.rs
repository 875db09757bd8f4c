//! Editor session: the single owner of an open structure.
//!
//! Holds the undo history of outline snapshots, the last tree the backend
//! confirmed, the intents still in flight, and the view state. Mutations
//! apply optimistically and return the intent the host hands to the
//! persistence bridge; bridge events come back through `reconcile`.
//!
//! Undo, redo and raw JSON replacement stay local. While they leave the
//! present tree apart from what the backend holds, the session is
//! diverged and server refreshes are recorded but not shown.

use crate::config::EditorConfig;
use crate::history::History;
use crate::input::InputEvent;
use crate::interaction::{Commands, InteractionController, ViewCommand};
use crate::search::{LevelSearch, SearchView};
use crate::view_state::{LocalStore, ViewState};
use atlas_bridge::{ApiError, BridgeEvent};
use atlas_core::{
    Element, ElementId, MutationIntent, OpId, RootPolicy, StructurePayload, StructureTree,
    TreeError, hydrate, hydrate_with, parse_raw_tree,
};
use atlas_render::{Palette, RenderLayout, RenderNode, assign_colors, project};
use std::fmt;
use std::time::Instant;

/// A locally applied mutation awaiting persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub op: OpId,
    pub intent: MutationIntent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Matches what the backend last confirmed.
    Confirmed,
    /// Changed locally, backend call outstanding.
    Pending,
}

/// User-visible message raised by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A local edit was refused.
    Rejected(TreeError),
    /// The backend refused an edit; the tree was rolled back.
    SyncFailed { op: OpId, error: ApiError },
    /// The raw JSON editor content did not parse.
    InvalidRawJson(TreeError),
    /// The backend copy changed while local undo or raw edits keep the
    /// view apart from it.
    OutOfSync,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Rejected(err) => write!(f, "{err}"),
            Notice::SyncFailed { error, .. } => write!(f, "could not save change: {error}"),
            Notice::InvalidRawJson(err) => write!(f, "invalid outline JSON: {err}"),
            Notice::OutOfSync => f.write_str("the saved outline differs from this view"),
        }
    }
}

/// Everything one input event produced.
#[derive(Debug, Default)]
pub struct SessionOutput {
    /// Commands for the rendering collaborator.
    pub view: Commands,
    /// Intents to submit to the persistence bridge.
    pub commits: Vec<Commit>,
    pub notices: Vec<Notice>,
    /// The tree or its view state changed; re-render.
    pub redraw: bool,
}

/// What the map shows right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Tree(RenderNode),
    NoResults,
    NoData,
}

pub struct EditorSession<S: LocalStore> {
    structure_id: String,
    history: History<StructureTree>,
    confirmed: StructureTree,
    pending: Vec<Commit>,
    /// Present tree is not `confirmed` plus `pending`.
    diverged: bool,
    view: ViewState,
    store: S,
    interaction: InteractionController,
    search: LevelSearch,
    palette: Palette,
    config: EditorConfig,
}

impl<S: LocalStore> EditorSession<S> {
    pub fn open(payload: &StructurePayload, store: S, config: EditorConfig) -> Result<Self, TreeError> {
        let tree = hydrate(payload)?;
        let view = ViewState::load(&store, &payload.id, payload.markmap_show_wbs);
        log::debug!(
            "opened structure {} ({} elements, {} collapsed)",
            payload.id,
            tree.len(),
            view.collapsed.len()
        );
        Ok(Self {
            structure_id: payload.id.clone(),
            history: History::with_max_depth(tree.clone(), config.history_depth),
            confirmed: tree,
            pending: Vec::new(),
            diverged: false,
            view,
            store,
            interaction: InteractionController::new(config.interaction()),
            search: LevelSearch::new(config.search_debounce()),
            palette: config.palette(),
            config,
        })
    }

    pub fn structure_id(&self) -> &str {
        &self.structure_id
    }

    pub fn tree(&self) -> &StructureTree {
        self.history.present()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Project the current tree, honoring colors, collapse flags, the WBS
    /// toggle and the active level search.
    pub fn render(&self) -> Rendered {
        let decorated = assign_colors(self.tree(), &self.palette).with_collapsed(&self.view.collapsed);
        let source = match SearchView::resolve(&decorated, self.search.active()) {
            SearchView::All => decorated,
            SearchView::Filtered(filtered) => filtered,
            SearchView::NoResults => return Rendered::NoResults,
            SearchView::NoData => return Rendered::NoData,
        };
        match project(&source, self.view.show_wbs, &self.config.projection) {
            Some(node) => Rendered::Tree(node),
            None => Rendered::NoData,
        }
    }

    /// Feed one input event through the interaction controller and carry
    /// out what it asks of the session.
    pub fn handle_input(&mut self, event: &InputEvent, layout: &RenderLayout) -> SessionOutput {
        let commands = self.interaction.handle(event, layout, self.history.present());
        let mut out = SessionOutput::default();
        for command in commands {
            match command {
                ViewCommand::ToggleCollapse { id } => {
                    self.toggle_collapsed(id);
                    out.redraw = true;
                }
                ViewCommand::Reparent { moved, new_parent } => {
                    match self.reparent_element(moved, new_parent) {
                        Ok(commit) => {
                            out.commits.push(commit);
                            out.redraw = true;
                        }
                        Err(err) => {
                            if let Some(node) = layout.get(moved) {
                                out.view.push(ViewCommand::Restore {
                                    id: moved,
                                    transform: node.transform,
                                });
                            }
                            out.notices.push(Notice::Rejected(err));
                        }
                    }
                }
                other => out.view.push(other),
            }
        }
        out
    }

    // ─── Document edits ──────────────────────────────────────────────────

    /// Add a new element as the last child of `parent`.
    pub fn add_element(&mut self, parent: ElementId, name: &str) -> Result<Commit, TreeError> {
        let element = Element::local(name.trim());
        self.commit(MutationIntent::Create {
            id: element.id,
            parent,
            content: element.content,
        })
    }

    pub fn rename_element(&mut self, id: ElementId, name: &str) -> Result<Commit, TreeError> {
        self.commit(MutationIntent::Update {
            id,
            content: name.trim().to_string(),
        })
    }

    pub fn delete_element(&mut self, id: ElementId) -> Result<Commit, TreeError> {
        if !self.tree().contains(id) {
            return Err(TreeError::NotFound(id));
        }
        self.commit(MutationIntent::Delete { id })
    }

    pub fn reparent_element(&mut self, moved: ElementId, new_parent: ElementId) -> Result<Commit, TreeError> {
        self.commit(MutationIntent::Reparent { moved, new_parent })
    }

    fn commit(&mut self, intent: MutationIntent) -> Result<Commit, TreeError> {
        let next = intent.apply(self.tree()).inspect_err(|err| {
            log::debug!("rejected {intent}: {err}");
        })?;
        self.history.set(next);
        let commit = Commit {
            op: OpId::next(),
            intent,
        };
        log::debug!("{}: {}", commit.op, commit.intent);
        self.pending.push(commit.clone());
        if self.diverged {
            self.check_divergence();
        }
        Ok(commit)
    }

    /// Step back. Local only: nothing is sent to the backend.
    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        if moved {
            self.check_divergence();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        if moved {
            self.check_divergence();
        }
        moved
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Replace the whole outline from the raw JSON editor. A parse error
    /// leaves the tree untouched and comes back as a notice.
    pub fn apply_raw_json(&mut self, text: &str) -> Option<Notice> {
        match parse_raw_tree(text) {
            Ok(tree) => {
                let old = self.history.present().clone();
                self.history.set(tree);
                self.follow_view(&old);
                self.check_divergence();
                None
            }
            Err(err) => {
                log::warn!("raw outline rejected: {err}");
                Some(Notice::InvalidRawJson(err))
            }
        }
    }

    // ─── View state ──────────────────────────────────────────────────────

    /// Flip and persist one node's collapse flag. Returns the new value.
    pub fn toggle_collapsed(&mut self, id: ElementId) -> bool {
        let collapsed = self.view.toggle_collapsed(id);
        self.view.prune(self.history.present());
        self.view.persist_collapsed(&mut self.store, &self.structure_id);
        collapsed
    }

    pub fn set_show_wbs(&mut self, show: bool) {
        if self.view.show_wbs != show {
            self.view.show_wbs = show;
            self.view.persist_show_wbs(&mut self.store, &self.structure_id);
        }
    }

    // ─── Search ──────────────────────────────────────────────────────────

    /// Record search box input. Takes effect on a later `poll_search`.
    pub fn search_level(&mut self, text: &str, now: Instant) {
        self.search.input_text(text, now);
    }

    /// Apply settled search input. Returns true if the view must redraw.
    pub fn poll_search(&mut self, now: Instant) -> bool {
        self.search.poll(now).is_some()
    }

    pub fn search_view(&self) -> SearchView {
        SearchView::resolve(self.tree(), self.search.active())
    }

    pub fn export_html(&self) -> Result<String, TreeError> {
        let mut export = self.config.export.clone();
        export.show_wbs = self.view.show_wbs;
        atlas_core::export_html(self.tree(), &export)
    }

    // ─── Backend reconciliation ──────────────────────────────────────────

    pub fn sync_status(&self, id: ElementId) -> SyncStatus {
        if self.pending.iter().any(|c| c.intent.touched().contains(&id)) {
            SyncStatus::Pending
        } else {
            SyncStatus::Confirmed
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True while undo, redo or a raw JSON edit keep the present tree apart
    /// from the backend copy.
    pub fn is_diverged(&self) -> bool {
        self.diverged
    }

    /// Drop local-only changes and show the backend copy with the pending
    /// intents re-applied. Undoable like any other step.
    pub fn discard_local_changes(&mut self) {
        if !self.diverged {
            return;
        }
        let old = self.history.present().clone();
        let rebuilt = self.replay_pending();
        self.history.set(rebuilt);
        self.follow_view(&old);
        self.diverged = false;
    }

    /// Fold a bridge event into the session.
    pub fn reconcile(&mut self, event: BridgeEvent) -> Option<Notice> {
        match event {
            BridgeEvent::Confirmed { op, created } => {
                let commit = self.take_pending(op)?;
                match commit.intent.apply(&self.confirmed) {
                    Ok(next) => self.confirmed = next,
                    Err(err) => log::warn!("confirmed {op} does not apply to confirmed tree: {err}"),
                }
                if let Some((local, server)) = created {
                    self.record_server_id(local, server);
                }
                None
            }
            BridgeEvent::Failed { op, error } => {
                self.take_pending(op)?;
                log::warn!("{op} failed, rolling back: {error}");
                let old = self.history.present().clone();
                let rebuilt = self.replay_pending();
                self.history.replace_present(rebuilt);
                self.follow_view(&old);
                self.diverged = false;
                Some(Notice::SyncFailed { op, error })
            }
            BridgeEvent::Refreshed { structure } => {
                if !self.pending.is_empty() {
                    log::debug!("ignoring refresh, {} ops still pending", self.pending.len());
                    return None;
                }
                let policy = RootPolicy::keeping(&self.confirmed, &self.structure_id);
                let tree = match hydrate_with(&structure, policy) {
                    Ok(tree) => tree,
                    Err(err) => {
                        log::warn!("could not hydrate refreshed structure: {err}");
                        return None;
                    }
                };
                let changed = tree != self.confirmed;
                self.confirmed = tree;
                if self.diverged {
                    log::info!("keeping local view, backend copy differs");
                    return changed.then_some(Notice::OutOfSync);
                }
                if self.tree() != &self.confirmed {
                    log::debug!("server structure differs, adopting it");
                    let old = self.history.present().clone();
                    self.history.replace_present(self.confirmed.clone());
                    self.follow_view(&old);
                }
                None
            }
        }
    }

    fn take_pending(&mut self, op: OpId) -> Option<Commit> {
        let Some(pos) = self.pending.iter().position(|c| c.op == op) else {
            log::debug!("no pending op {op}, ignoring");
            return None;
        };
        Some(self.pending.remove(pos))
    }

    /// Last confirmed tree with the still-pending intents re-applied.
    fn replay_pending(&self) -> StructureTree {
        let mut tree = self.confirmed.clone();
        for commit in &self.pending {
            match commit.intent.apply(&tree) {
                Ok(next) => tree = next,
                Err(err) => log::debug!("{} no longer applies: {err}", commit.op),
            }
        }
        tree
    }

    fn check_divergence(&mut self) {
        self.diverged = self.history.present() != &self.replay_pending();
        if self.diverged {
            log::debug!("local view differs from backend copy");
        }
    }

    /// Re-key collapse flags after the present tree was swapped out.
    fn follow_view(&mut self, old: &StructureTree) {
        if self.view.follow(old, self.history.present()) {
            self.view.persist_collapsed(&mut self.store, &self.structure_id);
        }
    }

    fn record_server_id(&mut self, local: ElementId, server: ElementId) {
        let stamp = |tree: &StructureTree| {
            if tree.contains(local) {
                tree.set_element_id(local, server).unwrap_or_else(|_| tree.clone())
            } else {
                tree.clone()
            }
        };
        self.confirmed = stamp(&self.confirmed);
        self.history.map_all(stamp);
    }
}
