//! The layout manager: outputs, workspaces and event routing.
//!
//! Owns the set of outputs and workspaces, routes host-compositor events to
//! the right frame tree, runs the tiling engine over mutated leaves and
//! pushes the resulting geometries, visibility masks and border decorations
//! out through the ports. All methods run on the compositor's event thread;
//! the manager is the single writer of layout state.

use std::sync::Arc;

use tracing::debug;
use wavy_config::{Config, CycleDirection, Direction, Position, SplitSide, TileLayout};

use crate::border::{Decorations, LeafDecor};
use crate::ports::{Canvas, Compositor, OutputId, ViewId};
use crate::utils::{Rect, Size};

pub mod frame;
pub mod tiling;
pub mod workspace;


use frame::FrameId;
use workspace::Workspace;

/// Workspaces created at startup.
pub const INITIAL_WORKSPACES: usize = 9;

/// A connected physical output.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub id: OutputId,
    /// Full resolution in pixels, including the statusbar strip.
    pub size: Size,
}

/// State of one workspace cell in the statusbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkspaceIndicator {
    pub number: u32,
    /// Whether this workspace is the one visible on the bar's output.
    pub active: bool,
}

pub struct LayoutManager<C: Compositor, K: Canvas> {
    comp: Arc<C>,
    config: Arc<Config>,
    decorations: Decorations<K>,
    outputs: Vec<Output>,
    workspaces: Vec<Workspace>,
    active_output: Option<OutputId>,
}

impl<C: Compositor, K: Canvas> LayoutManager<C, K> {
    pub fn new(comp: Arc<C>, canvas: Arc<K>, config: Arc<Config>) -> Self {
        let workspaces = (1..=INITIAL_WORKSPACES as u32)
            .map(Workspace::new)
            .collect();
        Self {
            comp,
            config,
            decorations: Decorations::new(canvas),
            outputs: Vec::new(),
            workspaces,
            active_output: None,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn workspace(&self, idx: usize) -> &Workspace {
        &self.workspaces[idx]
    }

    pub fn active_output(&self) -> Option<OutputId> {
        self.active_output
    }

    fn output_index(&self, id: OutputId) -> Option<usize> {
        self.outputs.iter().position(|o| o.id == id)
    }

    /// Index of the workspace visible on the given output.
    pub fn visible_workspace_of(&self, output: OutputId) -> Option<usize> {
        self.workspaces
            .iter()
            .position(|ws| ws.is_visible() && ws.assigned_output() == Some(output))
    }

    /// Index of the workspace visible on the active output.
    pub fn active_workspace_index(&self) -> Option<usize> {
        self.visible_workspace_of(self.active_output?)
    }

    pub fn active_view(&self) -> Option<ViewId> {
        let ws = &self.workspaces[self.active_workspace_index()?];
        ws.active_view()
    }

    /// Title of the focused view, for statusbar widgets.
    pub fn active_view_title(&self) -> Option<String> {
        self.comp.view_title(self.active_view()?)
    }

    /// The leaf hosting `view` on any workspace.
    fn find_view_global(&self, view: ViewId) -> Option<(usize, FrameId)> {
        self.workspaces
            .iter()
            .enumerate()
            .find_map(|(idx, ws)| ws.tree().find_view(view).map(|fr| (idx, fr)))
    }

    fn tile_mode(&self, tile: usize) -> TileLayout {
        self.config.tile_layouts[tile % self.config.tile_layouts.len()]
    }

    /// The output rectangle available to frames, i.e. minus the statusbar
    /// strip.
    fn workarea(&self, size: Size) -> Rect {
        let bar = self.config.statusbar_height.min(size.h);
        let y = match self.config.statusbar_position {
            Position::Top => bar,
            Position::Bottom => 0,
        };
        Rect::new(0, y, size.w, size.h - bar)
    }

    pub fn workspace_indicators(&self, output: OutputId) -> Vec<WorkspaceIndicator> {
        self.workspaces
            .iter()
            .map(|ws| WorkspaceIndicator {
                number: ws.number(),
                active: ws.is_visible() && ws.assigned_output() == Some(output),
            })
            .collect()
    }

    pub fn indicator_rows(&self) -> Vec<(OutputId, Vec<WorkspaceIndicator>)> {
        self.outputs
            .iter()
            .map(|o| (o.id, self.workspace_indicators(o.id)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Tiling application
    // ------------------------------------------------------------------

    /// Re-tiles every leaf of a visible workspace: runs the tiling engine,
    /// pushes geometries and masks to the compositor and repaints border
    /// buffers. Idempotent, so ops simply call it after mutating.
    fn apply_workspace(&mut self, ws_idx: usize) {
        let ws = &self.workspaces[ws_idx];
        if !ws.is_visible() {
            return;
        }

        let ws_number = ws.number();
        let active_frame = ws.active_frame();
        let frame_border = self.config.frame_border_size;
        let view_border = self.config.view_border_size;
        let leaves = ws.tree().leaves();

        for &leaf_id in &leaves {
            let tree = self.workspaces[ws_idx].tree();
            let rect = tree.geometry_with_gaps(leaf_id);
            let leaf = tree.leaf(leaf_id);
            let is_active = leaf_id == active_frame;
            let is_empty = leaf.views.is_empty();

            let inner = rect.inset(frame_border);
            let placements = tiling::tile(
                self.tile_mode(leaf.tile),
                inner,
                &leaf.views,
                leaf.active_view,
            );

            let mut view_boxes = Vec::with_capacity(placements.len());
            for p in &placements {
                self.comp.view_set_mask(p.view, p.visible);
                if p.visible {
                    self.comp.view_set_geometry(p.view, p.rect.inset(view_border));
                    let view_active = is_active && leaf.active_view == Some(p.view);
                    view_boxes.push((p.rect, view_active));
                }
            }

            let decor = LeafDecor {
                frame: leaf_id,
                rect,
                is_active,
                is_empty,
                views: view_boxes,
            };
            self.decorations.repaint_leaf(ws_number, &decor, &self.config);
        }

        self.decorations.prune(ws_number, &leaves);
    }

    fn hide_workspace(&mut self, ws_idx: usize) {
        for view in self.workspaces[ws_idx].tree().all_views() {
            self.comp.view_set_mask(view, false);
        }
    }

    fn focus_active(&self) {
        self.comp.view_focus(self.active_view());
    }

    fn schedule_render_active(&self) {
        if let Some(id) = self.active_output {
            self.comp.output_schedule_render(id);
        }
    }

    /// Blits the border buffers of the output's visible workspace; called
    /// from the render callback.
    pub fn render_decorations(&self, output: OutputId) {
        let Some(ws_idx) = self.visible_workspace_of(output) else {
            return;
        };
        let ws = &self.workspaces[ws_idx];
        for leaf in ws.tree().leaves() {
            let rect = ws.tree().geometry_with_gaps(leaf);
            self.decorations.blit_leaf(ws.number(), leaf, rect, output);
        }
    }

    // ------------------------------------------------------------------
    // Output lifecycle
    // ------------------------------------------------------------------

    /// A new output appeared. It grabs the lowest-numbered invisible
    /// workspace (allocating a fresh one when none is left) and becomes the
    /// active output.
    pub fn output_added(&mut self, id: OutputId, size: Size) -> bool {
        if self.output_index(id).is_some() {
            debug!("output {id:?} is already known, ignoring");
            return false;
        }

        let ws_idx = match self.workspaces.iter().position(|ws| !ws.is_visible()) {
            Some(idx) => idx,
            None => {
                let number = self.workspaces.len() as u32 + 1;
                self.workspaces.push(Workspace::new(number));
                self.workspaces.len() - 1
            }
        };

        self.outputs.push(Output { id, size });
        self.active_output = Some(id);

        let area = self.workarea(size);
        let gaps = self.config.frame_gaps_size;
        {
            let ws = &mut self.workspaces[ws_idx];
            ws.set_visible(true);
            ws.set_assigned_output(Some(id));
            let root = ws.tree().root();
            ws.tree_mut().recalc(root, area, gaps);
        }

        self.apply_workspace(ws_idx);
        self.focus_active();
        self.comp.output_schedule_render(id);

        debug!(
            "{}x{} output added, workspace {}",
            size.w,
            size.h,
            self.workspaces[ws_idx].number()
        );
        true
    }

    /// An output disconnected. Its workspaces become invisible and lose the
    /// assignment; the first remaining output (if any) becomes active.
    pub fn output_removed(&mut self, id: OutputId) -> bool {
        let Some(idx) = self.output_index(id) else {
            debug!("removal of unknown output {id:?}, ignoring");
            return false;
        };

        for ws in &mut self.workspaces {
            if ws.assigned_output() == Some(id) {
                ws.set_visible(false);
                ws.set_assigned_output(None);
            }
        }

        self.outputs.remove(idx);
        self.active_output = self.outputs.first().map(|o| o.id);

        debug!("output {id:?} removed");
        true
    }

    /// Resolution change: every workspace assigned to the output is
    /// recomputed, even invisible ones.
    pub fn output_resolution(&mut self, id: OutputId, size: Size) -> bool {
        let Some(idx) = self.output_index(id) else {
            debug!("resolution change for unknown output {id:?}, ignoring");
            return false;
        };

        debug!("output {id:?} resized to {}x{}", size.w, size.h);
        self.outputs[idx].size = size;
        let area = self.workarea(size);
        let gaps = self.config.frame_gaps_size;

        let mut visible = None;
        for (ws_idx, ws) in self.workspaces.iter_mut().enumerate() {
            if ws.assigned_output() == Some(id) {
                let root = ws.tree().root();
                ws.tree_mut().recalc(root, area, gaps);
                if ws.is_visible() {
                    visible = Some(ws_idx);
                }
            }
        }

        if let Some(ws_idx) = visible {
            self.apply_workspace(ws_idx);
        }
        self.comp.output_schedule_render(id);
        true
    }

    // ------------------------------------------------------------------
    // View lifecycle
    // ------------------------------------------------------------------

    /// A managed view appeared: it lands in the active leaf right after the
    /// current active view and takes over focus.
    pub fn view_created(&mut self, view: ViewId) -> bool {
        let Some(ws_idx) = self.active_workspace_index() else {
            debug!("view {view:?} created with no active output, ignoring");
            return false;
        };
        if self.find_view_global(view).is_some() {
            debug!("view {view:?} is already managed, ignoring");
            return false;
        }

        let ws = &mut self.workspaces[ws_idx];
        let leaf = ws.active_frame();
        ws.tree_mut().leaf_mut(leaf).insert_after_active(view);

        self.apply_workspace(ws_idx);
        self.comp.view_focus(Some(view));
        self.schedule_render_active();
        true
    }

    /// A view disappeared. If it was focused, its predecessor in the leaf
    /// (else the follower) takes over; a view dying on a background
    /// workspace keeps focus where it is.
    pub fn view_destroyed(&mut self, view: ViewId) -> bool {
        if self.active_view() == Some(view) {
            let ws_idx = self.active_workspace_index().unwrap();
            let ws = &mut self.workspaces[ws_idx];
            let leaf_id = ws.active_frame();
            let leaf = ws.tree_mut().leaf_mut(leaf_id);
            let next = leaf.successor_of(view);
            leaf.remove_view(view);
            leaf.active_view = next;

            self.apply_workspace(ws_idx);
            self.comp.view_focus(next);
            self.schedule_render_active();
            return true;
        }

        let Some((ws_idx, leaf_id)) = self.find_view_global(view) else {
            debug!("destruction of unknown view {view:?}, ignoring");
            return false;
        };

        let leaf = self.workspaces[ws_idx].tree_mut().leaf_mut(leaf_id);
        let next = leaf.successor_of(view);
        if leaf.active_view == Some(view) {
            leaf.active_view = next;
        }
        leaf.remove_view(view);
        self.apply_workspace(ws_idx);
        true
    }

    /// Pointer-driven focus of a specific (visible) view.
    pub fn focus_view(&mut self, view: ViewId) -> bool {
        if self.active_view() == Some(view) {
            return false;
        }
        let Some((ws_idx, leaf_id)) = self.find_view_global(view) else {
            debug!("focus request for unknown view {view:?}, ignoring");
            return false;
        };
        if !self.workspaces[ws_idx].is_visible() {
            return false;
        }

        self.active_output = self.workspaces[ws_idx].assigned_output();
        let ws = &mut self.workspaces[ws_idx];
        ws.set_active_frame(leaf_id);
        ws.tree_mut().leaf_mut(leaf_id).active_view = Some(view);

        self.apply_workspace(ws_idx);
        self.comp.view_focus(Some(view));
        self.schedule_render_active();
        true
    }

    /// Tiled views don't get to pick their own geometry.
    pub fn request_geometry(&self, view: ViewId, geometry: Rect) {
        debug!("ignoring geometry request {geometry} of tiled view {view:?}");
    }

    // ------------------------------------------------------------------
    // Directional focus and movement
    // ------------------------------------------------------------------

    /// Moves focus towards `dir`: first to a neighbor view inside the leaf
    /// if its tiling mode admits one, otherwise to the adjacent frame.
    pub fn focus_direction(&mut self, dir: Direction) -> bool {
        let Some(ws_idx) = self.active_workspace_index() else {
            return false;
        };
        let frame = self.workspaces[ws_idx].active_frame();

        let leaf = self.workspaces[ws_idx].tree().leaf(frame);
        let adj = tiling::adjacent_view(
            self.tile_mode(leaf.tile),
            &leaf.views,
            leaf.active_view,
            dir,
        );
        if let Some(adj) = adj {
            self.workspaces[ws_idx]
                .tree_mut()
                .leaf_mut(frame)
                .active_view = Some(adj);
            self.apply_workspace(ws_idx);
            self.comp.view_focus(Some(adj));
            self.schedule_render_active();
            return true;
        }

        let Some(adj_frame) = self.workspaces[ws_idx].tree().find_adjacent_frame(frame, dir)
        else {
            return false;
        };
        self.workspaces[ws_idx].set_active_frame(adj_frame);
        self.apply_workspace(ws_idx);
        self.focus_active();
        self.schedule_render_active();
        true
    }

    /// Moves the active view towards `dir`: swapped with its neighbor
    /// inside the leaf when there is one, otherwise re-homed into the
    /// adjacent frame.
    pub fn move_direction(&mut self, dir: Direction) -> bool {
        let Some(ws_idx) = self.active_workspace_index() else {
            return false;
        };
        let frame = self.workspaces[ws_idx].active_frame();

        let leaf = self.workspaces[ws_idx].tree().leaf(frame);
        let Some(active) = leaf.active_view else {
            return false;
        };

        let adj = tiling::adjacent_view(
            self.tile_mode(leaf.tile),
            &leaf.views,
            leaf.active_view,
            dir,
        );
        if let Some(adj) = adj {
            let leaf = self.workspaces[ws_idx].tree_mut().leaf_mut(frame);
            let a = leaf.index_of(active).unwrap();
            let b = leaf.index_of(adj).unwrap();
            leaf.views.swap(a, b);
            self.apply_workspace(ws_idx);
            self.comp.view_focus(Some(active));
            self.schedule_render_active();
            return true;
        }

        let Some(adj_frame) = self.workspaces[ws_idx].tree().find_adjacent_frame(frame, dir)
        else {
            return false;
        };

        {
            let ws = &mut self.workspaces[ws_idx];
            let leaf = ws.tree_mut().leaf_mut(frame);
            let next = leaf.successor_of(active);
            leaf.remove_view(active);
            leaf.active_view = next;
            ws.set_active_frame(adj_frame);
            ws.tree_mut().leaf_mut(adj_frame).insert_after_active(active);
        }

        self.apply_workspace(ws_idx);
        self.comp.view_focus(Some(active));
        self.schedule_render_active();
        true
    }

    /// Cycles the active view of the active leaf, wrapping around.
    pub fn cycle_view(&mut self, dir: CycleDirection) -> bool {
        let Some(ws_idx) = self.active_workspace_index() else {
            return false;
        };
        let frame = self.workspaces[ws_idx].active_frame();
        {
            let leaf = self.workspaces[ws_idx].tree_mut().leaf_mut(frame);
            if leaf.views.is_empty() {
                return false;
            }
            leaf.cycle_active(dir == CycleDirection::Next);
        }
        self.apply_workspace(ws_idx);
        self.focus_active();
        self.schedule_render_active();
        true
    }

    // ------------------------------------------------------------------
    // Frame operations
    // ------------------------------------------------------------------

    /// Splits the active frame; focus stays with the populated child.
    pub fn new_frame(&mut self, side: SplitSide) -> bool {
        let Some(ws_idx) = self.active_workspace_index() else {
            return false;
        };
        let gaps = self.config.frame_gaps_size;
        {
            let ws = &mut self.workspaces[ws_idx];
            let frame = ws.active_frame();
            let near = ws.tree_mut().split(frame, side);
            ws.tree_mut().recalc_in_place(frame, gaps);
            ws.set_active_frame(near);
        }
        self.apply_workspace(ws_idx);
        self.schedule_render_active();
        true
    }

    /// Deletes the active frame, folding its views into the leaf selected
    /// by the sibling's `last_focused` chain. Root deletion is a no-op.
    pub fn delete_frame(&mut self) -> bool {
        let Some(ws_idx) = self.active_workspace_index() else {
            return false;
        };
        let gaps = self.config.frame_gaps_size;
        {
            let ws = &mut self.workspaces[ws_idx];
            let frame = ws.active_frame();
            let Some(result) = ws.tree_mut().delete(frame) else {
                return false;
            };
            ws.tree_mut().recalc_in_place(result.replacement, gaps);
            ws.set_active_frame(result.absorber);
        }
        self.apply_workspace(ws_idx);
        self.focus_active();
        self.schedule_render_active();
        true
    }

    /// Shifts the matching ancestor's split point by `delta`.
    pub fn resize(&mut self, dir: Direction, delta: f64) -> bool {
        let Some(ws_idx) = self.active_workspace_index() else {
            return false;
        };
        let gaps = self.config.frame_gaps_size;
        {
            let ws = &mut self.workspaces[ws_idx];
            let frame = ws.active_frame();
            let Some(ancestor) = ws.tree_mut().resize(frame, dir, delta) else {
                return false;
            };
            ws.tree_mut().recalc_in_place(ancestor, gaps);
        }
        self.apply_workspace(ws_idx);
        self.schedule_render_active();
        true
    }

    /// Cycles the active leaf through the configured tiling modes.
    pub fn cycle_tiling_mode(&mut self) -> bool {
        let Some(ws_idx) = self.active_workspace_index() else {
            return false;
        };
        let modes = self.config.tile_layouts.len();
        let frame = self.workspaces[ws_idx].active_frame();
        {
            let leaf = self.workspaces[ws_idx].tree_mut().leaf_mut(frame);
            leaf.tile = (leaf.tile + 1) % modes;
        }
        self.apply_workspace(ws_idx);
        self.schedule_render_active();
        true
    }

    // ------------------------------------------------------------------
    // Workspaces
    // ------------------------------------------------------------------

    /// Brings workspace `target` (0-based index) up on the active output.
    /// Switching to the already-visible workspace is a no-op; a workspace
    /// visible on a different output stays there.
    pub fn switch_to(&mut self, target: usize) -> bool {
        let Some(out_id) = self.active_output else {
            return false;
        };
        let Some(cur_idx) = self.visible_workspace_of(out_id) else {
            return false;
        };
        if target >= self.workspaces.len() || target == cur_idx {
            return false;
        }
        if self.workspaces[target].is_visible() {
            debug!(
                "workspace {} is visible on another output, not switching",
                self.workspaces[target].number()
            );
            return false;
        }

        debug!("switching to workspace {}", self.workspaces[target].number());

        self.hide_workspace(cur_idx);
        self.workspaces[cur_idx].set_visible(false);

        let size = self.outputs[self.output_index(out_id).unwrap()].size;
        let area = self.workarea(size);
        let gaps = self.config.frame_gaps_size;
        {
            let ws = &mut self.workspaces[target];
            let reassigned = ws.assigned_output() != Some(out_id);
            ws.set_assigned_output(Some(out_id));
            ws.set_visible(true);
            if reassigned {
                let root = ws.tree().root();
                ws.tree_mut().recalc(root, area, gaps);
            }
        }

        self.apply_workspace(target);
        self.focus_active();
        self.comp.output_schedule_render(out_id);
        true
    }

    /// Steps to the neighboring workspace, saturating at both ends.
    pub fn cycle_workspace(&mut self, dir: CycleDirection) -> bool {
        let Some(cur_idx) = self.active_workspace_index() else {
            return false;
        };
        let target = match dir {
            CycleDirection::Next => {
                if cur_idx + 1 >= self.workspaces.len() {
                    return false;
                }
                cur_idx + 1
            }
            CycleDirection::Previous => {
                let Some(t) = cur_idx.checked_sub(1) else {
                    return false;
                };
                t
            }
        };
        self.switch_to(target)
    }

    /// Sends the active view to workspace `target` (0-based index), where
    /// it is appended to the active leaf and becomes active.
    pub fn move_to_workspace(&mut self, target: usize) -> bool {
        let Some(cur_idx) = self.active_workspace_index() else {
            return false;
        };
        if target >= self.workspaces.len() || target == cur_idx {
            return false;
        }

        let frame = self.workspaces[cur_idx].active_frame();
        let (view, next) = {
            let leaf = self.workspaces[cur_idx].tree_mut().leaf_mut(frame);
            let Some(view) = leaf.active_view else {
                return false;
            };
            let next = leaf.successor_of(view);
            leaf.remove_view(view);
            leaf.active_view = next;
            (view, next)
        };

        {
            let target_ws = &mut self.workspaces[target];
            let target_leaf = target_ws.active_frame();
            let leaf = target_ws.tree_mut().leaf_mut(target_leaf);
            leaf.views.push(view);
            leaf.active_view = Some(view);
        }

        if self.workspaces[target].is_visible() {
            self.apply_workspace(target);
        } else {
            self.comp.view_set_mask(view, false);
        }

        self.apply_workspace(cur_idx);
        self.comp.view_focus(next);
        self.schedule_render_active();
        true
    }

    /// Appends a fresh workspace without switching to it.
    pub fn add_workspace(&mut self) -> bool {
        let number = self.workspaces.len() as u32 + 1;
        self.workspaces.push(Workspace::new(number));
        self.schedule_render_active();
        true
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Checks the cross-workspace invariants; tests run this after every
    /// operation.
    pub fn verify_invariants(&self) {
        for ws in &self.workspaces {
            ws.verify_invariants();
        }

        // Every managed view lives in exactly one leaf across workspaces.
        let mut seen = Vec::new();
        for ws in &self.workspaces {
            for view in ws.tree().all_views() {
                assert!(
                    !seen.contains(&view),
                    "view {view:?} appears in more than one leaf"
                );
                seen.push(view);
            }
        }

        // At most one visible workspace per output, and it must point back.
        for out in &self.outputs {
            let visible: Vec<_> = self
                .workspaces
                .iter()
                .filter(|ws| ws.is_visible() && ws.assigned_output() == Some(out.id))
                .collect();
            assert!(
                visible.len() <= 1,
                "output {:?} shows more than one workspace",
                out.id
            );
        }
        for ws in &self.workspaces {
            if ws.is_visible() {
                let out = ws.assigned_output().expect("visible workspace unassigned");
                assert!(
                    self.output_index(out).is_some(),
                    "visible workspace {} assigned to a dead output",
                    ws.number()
                );
            }
        }

        if let Some(active) = self.active_output {
            assert!(
                self.output_index(active).is_some(),
                "active output is not connected"
            );
        }
    }
}
