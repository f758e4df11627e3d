use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    DropBounds, DropPosition, FolderId, Forest, TreeConfig, assign_order, check_drop,
    classify_with,
};

/// The single move a finished drag asks the persistence side to perform.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveCommand {
    pub folder_id: FolderId,
    pub new_parent_id: Option<FolderId>,
    /// `None` requests an order assigned by the store (used for `inside` drops).
    pub new_order: Option<f64>,
}

/// What the renderer should highlight while dragging.
#[derive(Clone, Debug, PartialEq)]
pub struct DropIndicator {
    pub target_id: FolderId,
    pub position: DropPosition,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
    pub active_id: FolderId,
    pub target_id: Option<FolderId>,
    pub position: Option<DropPosition>,
    pub pointer_y: Option<f32>,
    active_reach: usize,
}

impl DragSession {
    pub fn indicator(&self) -> Option<DropIndicator> {
        Some(DropIndicator {
            target_id: self.target_id.clone()?,
            position: self.position?,
        })
    }

    fn clear_target(&mut self) {
        self.target_id = None;
        self.position = None;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StartDragError {
    #[error("a drag of `{0}` is already in progress")]
    AlreadyDragging(FolderId),
    #[error("folder `{0}` is not in the tree")]
    UnknownFolder(FolderId),
}

/// Drives one drag gesture at a time over an immutable tree snapshot.
///
/// `Idle -> Dragging` on [`start`](Self::start), back to `Idle` on [`finish`](Self::finish)
/// or [`cancel`](Self::cancel). Nothing here touches the network: `finish` hands back a
/// [`MoveCommand`] and the caller commits it once the session is already over.
#[derive(Clone, Debug)]
pub struct DragController {
    forest: Arc<Forest>,
    config: TreeConfig,
    state: DragState,
}

impl DragController {
    pub fn new(forest: impl Into<Arc<Forest>>, config: TreeConfig) -> Self {
        Self {
            forest: forest.into(),
            config,
            state: DragState::Idle,
        }
    }

    pub fn forest(&self) -> &Arc<Forest> {
        &self.forest
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging(session) => Some(session),
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn active_id(&self) -> Option<&FolderId> {
        self.session().map(|session| &session.active_id)
    }

    pub fn indicator(&self) -> Option<DropIndicator> {
        self.session().and_then(DragSession::indicator)
    }

    /// Swap in a freshly fetched tree.
    ///
    /// A session survives only if its dragged folder still exists; its pending target is
    /// dropped either way and gets reclassified on the next pointer move.
    pub fn replace_forest(&mut self, forest: impl Into<Arc<Forest>>) {
        self.forest = forest.into();
        let active_reach = match &self.state {
            DragState::Idle => return,
            DragState::Dragging(session) => {
                if !self.forest.contains(session.active_id.as_str()) {
                    debug!(active = %session.active_id, "dragged folder vanished after refresh");
                    self.state = DragState::Idle;
                    return;
                }
                self.forest.max_descendant_depth(session.active_id.as_str())
            }
        };
        if let DragState::Dragging(session) = &mut self.state {
            session.active_reach = active_reach;
            session.clear_target();
        }
    }

    pub fn start(&mut self, active_id: &str) -> Result<(), StartDragError> {
        if let DragState::Dragging(session) = &self.state {
            return Err(StartDragError::AlreadyDragging(session.active_id.clone()));
        }
        let Some(folder) = self.forest.find_by_id(active_id) else {
            warn!(active = active_id, "drag started on a folder missing from the tree");
            return Err(StartDragError::UnknownFolder(active_id.into()));
        };

        debug!(active = %folder.id, "drag started");
        self.state = DragState::Dragging(DragSession {
            active_id: folder.id.clone(),
            target_id: None,
            position: None,
            pointer_y: None,
            active_reach: self.forest.max_descendant_depth(active_id),
        });
        Ok(())
    }

    /// Report the pointer over `target` (or over nothing) and return the indicator to draw.
    pub fn hover(
        &mut self,
        pointer_y: f32,
        target: Option<(&str, DropBounds)>,
    ) -> Option<DropIndicator> {
        let DragState::Dragging(session) = &mut self.state else {
            return None;
        };
        session.pointer_y = Some(pointer_y);

        let Some((target_id, bounds)) = target else {
            session.clear_target();
            return None;
        };
        if let Err(rejection) = check_drop(&self.forest, session.active_id.as_str(), target_id) {
            debug!(target_id, ?rejection, "drop target rejected");
            session.clear_target();
            return None;
        }
        let Some(target) = self.forest.find_by_id(target_id) else {
            session.clear_target();
            return None;
        };
        let Some(target_depth) = self.forest.depth_of(target_id) else {
            session.clear_target();
            return None;
        };

        let position = classify_with(
            &self.config,
            pointer_y,
            bounds,
            target_depth,
            session.active_reach,
        );
        session.target_id = Some(target.id.clone());
        session.position = Some(position);
        session.indicator()
    }

    /// End the gesture. Returns the move to persist when a valid indicator was pending.
    pub fn finish(&mut self) -> Option<MoveCommand> {
        let DragState::Dragging(session) = std::mem::take(&mut self.state) else {
            return None;
        };
        let Some(indicator) = session.indicator() else {
            debug!(active = %session.active_id, "drag ended without a target");
            return None;
        };
        if check_drop(
            &self.forest,
            session.active_id.as_str(),
            indicator.target_id.as_str(),
        )
        .is_err()
        {
            return None;
        }

        match assign_order(
            &self.forest,
            session.active_id.as_str(),
            indicator.position,
            indicator.target_id.as_str(),
        ) {
            Ok(placement) => {
                debug!(
                    active = %session.active_id,
                    target_id = %indicator.target_id,
                    position = ?indicator.position,
                    order = ?placement.order,
                    "drag finished"
                );
                Some(MoveCommand {
                    folder_id: session.active_id,
                    new_parent_id: placement.parent_id,
                    new_order: placement.order,
                })
            }
            Err(err) => {
                warn!(active = %session.active_id, "dropping move: {err}");
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        if let DragState::Dragging(session) = std::mem::take(&mut self.state) {
            debug!(active = %session.active_id, "drag cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FolderNode;

    const ROW: DropBounds = DropBounds {
        top: 0.0,
        height: 20.0,
    };

    fn controller(nodes: Vec<FolderNode>) -> DragController {
        DragController::new(Forest::from_nodes(nodes).unwrap(), TreeConfig::default())
    }

    #[test]
    fn hover_without_start_is_ignored() {
        let mut ctl = controller(vec![FolderNode::new("A", "A", 1.0)]);
        assert_eq!(ctl.hover(10.0, Some(("A", ROW))), None);
        assert_eq!(ctl.finish(), None);
        assert_eq!(ctl.state(), &DragState::Idle);
    }

    #[test]
    fn second_start_is_refused() {
        let mut ctl = controller(vec![
            FolderNode::new("A", "A", 1.0),
            FolderNode::new("B", "B", 2.0),
        ]);
        ctl.start("A").unwrap();
        assert_eq!(
            ctl.start("B"),
            Err(StartDragError::AlreadyDragging("A".into()))
        );
        assert_eq!(ctl.active_id(), Some(&FolderId::from("A")));
    }

    #[test]
    fn unknown_folder_cannot_start() {
        let mut ctl = controller(vec![FolderNode::new("A", "A", 1.0)]);
        assert_eq!(
            ctl.start("ghost"),
            Err(StartDragError::UnknownFolder("ghost".into()))
        );
        assert!(!ctl.is_dragging());
    }

    #[test]
    fn leaving_targets_clears_indicator() {
        let mut ctl = controller(vec![
            FolderNode::new("A", "A", 1.0),
            FolderNode::new("B", "B", 2.0),
        ]);
        ctl.start("A").unwrap();
        assert!(ctl.hover(10.0, Some(("B", ROW))).is_some());
        assert_eq!(ctl.hover(10.0, None), None);
        assert_eq!(ctl.indicator(), None);
        assert_eq!(ctl.session().and_then(|s| s.pointer_y), Some(10.0));
    }

    #[test]
    fn invalid_target_replaces_previous_indicator() {
        let mut ctl = controller(vec![
            FolderNode::new("A", "A", 1.0).child(FolderNode::new("A1", "A1", 1.0)),
            FolderNode::new("B", "B", 2.0),
        ]);
        ctl.start("A").unwrap();
        ctl.hover(10.0, Some(("B", ROW)));
        assert_eq!(ctl.hover(10.0, Some(("A1", ROW))), None);
        assert_eq!(ctl.finish(), None);
    }

    #[test]
    fn cancel_discards_pending_drop() {
        let mut ctl = controller(vec![
            FolderNode::new("A", "A", 1.0),
            FolderNode::new("B", "B", 2.0),
        ]);
        ctl.start("A").unwrap();
        ctl.hover(19.0, Some(("B", ROW)));
        ctl.cancel();
        assert_eq!(ctl.state(), &DragState::Idle);
        assert_eq!(ctl.finish(), None);
    }

    #[test]
    fn inside_drop_requests_server_order() {
        let mut ctl = controller(vec![
            FolderNode::new("A", "A", 1.0),
            FolderNode::new("B", "B", 2.0),
        ]);
        ctl.start("A").unwrap();
        let indicator = ctl.hover(10.0, Some(("B", ROW))).unwrap();
        assert_eq!(indicator.position, DropPosition::Inside);
        assert_eq!(
            ctl.finish(),
            Some(MoveCommand {
                folder_id: "A".into(),
                new_parent_id: Some("B".into()),
                new_order: None,
            })
        );
        assert!(!ctl.is_dragging());
    }

    #[test]
    fn replacing_forest_keeps_session_but_drops_target() {
        let nodes = vec![FolderNode::new("A", "A", 1.0), FolderNode::new("B", "B", 2.0)];
        let mut ctl = controller(nodes.clone());
        ctl.start("A").unwrap();
        ctl.hover(10.0, Some(("B", ROW)));

        ctl.replace_forest(Forest::from_nodes(nodes).unwrap());
        assert!(ctl.is_dragging());
        assert_eq!(ctl.indicator(), None);

        ctl.replace_forest(Forest::from_nodes(vec![FolderNode::new("B", "B", 2.0)]).unwrap());
        assert!(!ctl.is_dragging());
    }
}
