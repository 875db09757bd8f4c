//! Pointer interaction on rendered nodes.
//!
//! A small state machine turns raw input into view commands for the
//! rendering collaborator and reparent requests for the session:
//!
//! ```text
//! Idle ──down(body)──▶ Pressed ──move > threshold──▶ Dragging
//!  ▲                     │ up                          │ up / cancel
//!  └──── OpenActionModal ┘          Reparent | Restore ┘
//! ```
//!
//! A press on a collapse toggle never starts a gesture. The controller
//! holds no tree; every decision that needs structure reads the tree the
//! session passes in.

use crate::input::InputEvent;
use atlas_core::{ElementId, StructureTree};
use atlas_render::RenderLayout;
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Instruction for the rendering collaborator (or, for `Reparent`, the
/// session).
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand {
    /// Show the per-node action modal next to the clicked node.
    OpenActionModal { id: ElementId, anchor: Point },
    ToggleCollapse { id: ElementId },
    /// Move the dragged node's group to `transform`.
    Translate { id: ElementId, transform: Affine },
    Highlight { id: ElementId },
    ClearHighlight { id: ElementId },
    /// Put the dragged node back where it started.
    Restore { id: ElementId, transform: Affine },
    Reparent { moved: ElementId, new_parent: ElementId },
}

pub type Commands = SmallVec<[ViewCommand; 2]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Pointer travel (screen units) that turns a press into a drag.
    /// Default: **4.0**.
    pub drag_threshold: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Pressed {
        id: ElementId,
        origin: Point,
        /// Transform captured at press time.
        restore: Affine,
    },
    Dragging {
        id: ElementId,
        origin: Point,
        restore: Affine,
        /// Currently highlighted drop target.
        target: Option<ElementId>,
    },
}

#[derive(Debug, Default)]
pub struct InteractionController {
    config: InteractionConfig,
    gesture: Gesture,
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            gesture: Gesture::Idle,
        }
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    pub fn handle(
        &mut self,
        event: &InputEvent,
        layout: &RenderLayout,
        tree: &StructureTree,
    ) -> Commands {
        if event.is_cancel() {
            return self.cancel();
        }
        match (event, self.gesture) {
            (InputEvent::PointerDown { .. }, Gesture::Idle) => {
                let Some(point) = event.position() else {
                    return smallvec![];
                };
                if let Some(id) = layout.hit_toggle(point) {
                    return smallvec![ViewCommand::ToggleCollapse { id }];
                }
                if let Some(node) = layout.hit_test(point).and_then(|id| layout.get(id)) {
                    self.gesture = Gesture::Pressed {
                        id: node.id,
                        origin: point,
                        restore: node.transform,
                    };
                }
                smallvec![]
            }
            (InputEvent::PointerMove { .. }, Gesture::Pressed { id, origin, restore }) => {
                let Some(point) = event.position() else {
                    return smallvec![];
                };
                if (point - origin).hypot() <= self.config.drag_threshold {
                    return smallvec![];
                }
                log::trace!("drag start on {id}");
                self.gesture = Gesture::Dragging {
                    id,
                    origin,
                    restore,
                    target: None,
                };
                self.drag_to(point, layout)
            }
            (InputEvent::PointerMove { .. }, Gesture::Dragging { .. }) => match event.position() {
                Some(point) => self.drag_to(point, layout),
                None => smallvec![],
            },
            (InputEvent::PointerUp { .. }, Gesture::Pressed { id, .. }) => {
                self.gesture = Gesture::Idle;
                let anchor = layout
                    .get(id)
                    .map(|n| n.body.origin())
                    .or(event.position())
                    .unwrap_or(Point::ORIGIN);
                smallvec![ViewCommand::OpenActionModal { id, anchor }]
            }
            (
                InputEvent::PointerUp { .. },
                Gesture::Dragging {
                    id,
                    restore,
                    target,
                    ..
                },
            ) => {
                self.gesture = Gesture::Idle;
                let mut out = Commands::new();
                if let Some(t) = target {
                    out.push(ViewCommand::ClearHighlight { id: t });
                }
                match target.filter(|t| valid_drop(tree, id, *t)) {
                    Some(new_parent) => {
                        log::debug!("drop {id} onto {new_parent}");
                        out.push(ViewCommand::Reparent {
                            moved: id,
                            new_parent,
                        });
                    }
                    None => {
                        log::debug!("invalid drop of {id}, restoring");
                        out.push(ViewCommand::Restore {
                            id,
                            transform: restore,
                        });
                    }
                }
                out
            }
            _ => smallvec![],
        }
    }

    /// Abort the current gesture. A drag snaps back to its restore point.
    pub fn cancel(&mut self) -> Commands {
        let gesture = std::mem::take(&mut self.gesture);
        match gesture {
            Gesture::Dragging {
                id,
                restore,
                target,
                ..
            } => {
                let mut out = Commands::new();
                if let Some(t) = target {
                    out.push(ViewCommand::ClearHighlight { id: t });
                }
                out.push(ViewCommand::Restore {
                    id,
                    transform: restore,
                });
                out
            }
            Gesture::Idle | Gesture::Pressed { .. } => smallvec![],
        }
    }

    fn drag_to(&mut self, point: Point, layout: &RenderLayout) -> Commands {
        let Gesture::Dragging {
            id,
            origin,
            restore,
            target,
        } = self.gesture
        else {
            return smallvec![];
        };
        let delta: Vec2 = point - origin;
        let mut out: Commands = smallvec![ViewCommand::Translate {
            id,
            transform: Affine::translate(delta) * restore,
        }];

        let next = layout.drop_target(point, id);
        if next != target {
            if let Some(prev) = target {
                out.push(ViewCommand::ClearHighlight { id: prev });
            }
            if let Some(t) = next {
                out.push(ViewCommand::Highlight { id: t });
            }
        }
        self.gesture = Gesture::Dragging {
            id,
            origin,
            restore,
            target: next,
        };
        out
    }
}

/// A drop is valid when the target is another live node outside the
/// dragged subtree and the dragged node is not the root.
pub fn valid_drop(tree: &StructureTree, dragged: ElementId, target: ElementId) -> bool {
    target != dragged
        && tree.contains(target)
        && tree.contains(dragged)
        && tree.root() != Some(dragged)
        && !tree.is_descendant(dragged, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::Element;
    use atlas_render::NodeGeometry;
    use kurbo::Rect;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    fn tree() -> StructureTree {
        StructureTree::with_root(Element::new(id("i_root"), "Root"))
            .insert_under(id("i_root"), Element::new(id("i_a"), "A"))
            .unwrap()
            .insert_under(id("i_root"), Element::new(id("i_b"), "B"))
            .unwrap()
    }

    fn layout() -> RenderLayout {
        RenderLayout::new(vec![
            NodeGeometry::new(id("i_root"), Rect::new(0.0, 0.0, 80.0, 20.0))
                .with_toggle(Rect::new(80.0, 5.0, 90.0, 15.0)),
            NodeGeometry::new(id("i_a"), Rect::new(120.0, 0.0, 200.0, 20.0)),
            NodeGeometry::new(id("i_b"), Rect::new(120.0, 40.0, 200.0, 60.0)),
        ])
    }

    #[test]
    fn click_without_travel_opens_modal() {
        let mut c = InteractionController::default();
        let (l, t) = (layout(), tree());
        assert!(c.handle(&InputEvent::down(130.0, 10.0), &l, &t).is_empty());
        assert!(c.handle(&InputEvent::moved(132.0, 11.0), &l, &t).is_empty());
        let out = c.handle(&InputEvent::up(132.0, 11.0), &l, &t);
        assert_eq!(
            out.as_slice(),
            &[ViewCommand::OpenActionModal {
                id: id("i_a"),
                anchor: Point::new(120.0, 0.0),
            }]
        );
        assert_eq!(c.gesture(), Gesture::Idle);
    }

    #[test]
    fn toggle_press_does_not_start_gesture() {
        let mut c = InteractionController::default();
        let out = c.handle(&InputEvent::down(85.0, 10.0), &layout(), &tree());
        assert_eq!(out.as_slice(), &[ViewCommand::ToggleCollapse { id: id("i_root") }]);
        assert_eq!(c.gesture(), Gesture::Idle);
    }

    #[test]
    fn press_on_empty_space_is_ignored() {
        let mut c = InteractionController::default();
        assert!(c.handle(&InputEvent::down(500.0, 500.0), &layout(), &tree()).is_empty());
        assert_eq!(c.gesture(), Gesture::Idle);
    }

    #[test]
    fn highlight_follows_the_pointer() {
        let mut c = InteractionController::default();
        let (l, t) = (layout(), tree());
        c.handle(&InputEvent::down(130.0, 10.0), &l, &t);
        let out = c.handle(&InputEvent::moved(130.0, 50.0), &l, &t);
        assert_eq!(
            out.as_slice(),
            &[
                ViewCommand::Translate {
                    id: id("i_a"),
                    transform: Affine::translate((120.0, 40.0)),
                },
                ViewCommand::Highlight { id: id("i_b") },
            ]
        );
        let out = c.handle(&InputEvent::moved(10.0, 10.0), &l, &t);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], ViewCommand::ClearHighlight { id: id("i_b") });
        assert_eq!(out[2], ViewCommand::Highlight { id: id("i_root") });
    }

    #[test]
    fn escape_restores_dragged_node() {
        let mut c = InteractionController::default();
        let (l, t) = (layout(), tree());
        c.handle(&InputEvent::down(130.0, 10.0), &l, &t);
        c.handle(&InputEvent::moved(130.0, 50.0), &l, &t);
        let out = c.handle(&InputEvent::key("Escape"), &l, &t);
        assert_eq!(
            out.as_slice(),
            &[
                ViewCommand::ClearHighlight { id: id("i_b") },
                ViewCommand::Restore {
                    id: id("i_a"),
                    transform: Affine::translate((120.0, 0.0)),
                },
            ]
        );
        assert!(!c.is_dragging());
    }

    #[test]
    fn drop_on_nothing_restores() {
        let mut c = InteractionController::default();
        let (l, t) = (layout(), tree());
        c.handle(&InputEvent::down(130.0, 10.0), &l, &t);
        c.handle(&InputEvent::moved(400.0, 300.0), &l, &t);
        let out = c.handle(&InputEvent::up(400.0, 300.0), &l, &t);
        assert!(matches!(out.as_slice(), [ViewCommand::Restore { .. }]));
    }

    #[test]
    fn root_is_never_a_valid_drag_source() {
        let t = tree();
        assert!(!valid_drop(&t, id("i_root"), id("i_a")));
        assert!(!valid_drop(&t, id("i_a"), id("i_a")));
        assert!(!valid_drop(&t, id("i_a"), id("i_gone")));
        assert!(valid_drop(&t, id("i_a"), id("i_b")));
    }
}
