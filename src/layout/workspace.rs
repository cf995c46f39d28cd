//! A workspace: one frame tree plus its focus and output assignment.

use crate::layout::frame::{FrameId, FrameTree};
use crate::ports::{OutputId, ViewId};

#[derive(Debug)]
pub struct Workspace {
    /// 1-indexed workspace number, shown in the bar.
    number: u32,
    tree: FrameTree,
    /// Always a leaf of `tree`.
    active_frame: FrameId,
    assigned_output: Option<OutputId>,
    visible: bool,
}

impl Workspace {
    pub fn new(number: u32) -> Self {
        let tree = FrameTree::new();
        let active_frame = tree.root();
        Self {
            number,
            tree,
            active_frame,
            assigned_output: None,
            visible: false,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn tree(&self) -> &FrameTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut FrameTree {
        &mut self.tree
    }

    pub fn active_frame(&self) -> FrameId {
        self.active_frame
    }

    /// Focuses a leaf and records it along the `last_focused` path.
    pub fn set_active_frame(&mut self, frame: FrameId) {
        self.active_frame = frame;
        self.tree.set_active_path(frame);
    }

    pub fn active_view(&self) -> Option<ViewId> {
        self.tree.leaf(self.active_frame).active_view
    }

    pub fn assigned_output(&self) -> Option<OutputId> {
        self.assigned_output
    }

    pub fn set_assigned_output(&mut self, output: Option<OutputId>) {
        self.assigned_output = output;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn verify_invariants(&self) {
        self.tree.verify_invariants();
        assert!(
            self.tree.is_leaf(self.active_frame),
            "active frame of workspace {} is not a leaf",
            self.number
        );
        if self.visible {
            assert!(
                self.assigned_output.is_some(),
                "visible workspace {} has no assigned output",
                self.number
            );
        }
    }
}
