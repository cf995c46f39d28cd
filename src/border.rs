//! Frame and view border painting.
//!
//! Every leaf of a visible workspace owns a canvas buffer sized to its
//! gapped rectangle. The frame border is drawn as four filled strips along
//! the buffer edges, and each placed view gets its own strip rectangle
//! inside the buffer. The render callback blits these buffers before the
//! statusbar.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use wavy_config::{Color, Config};

use crate::layout::frame::FrameId;
use crate::ports::{Canvas, OutputId};
use crate::utils::Rect;

/// Buffer key: workspace number plus frame id. Workspaces are never
/// destroyed and frame ids are stable, so stale entries are pruned by
/// comparing against the live leaf set.
type DecorKey = (u32, FrameId);

struct DecorBuffer<B> {
    size: (u32, u32),
    buffer: B,
}

/// How one leaf should be decorated.
pub struct LeafDecor {
    pub frame: FrameId,
    /// The leaf's gapped rectangle in output coordinates.
    pub rect: Rect,
    pub is_active: bool,
    pub is_empty: bool,
    /// Per-view border boxes in output coordinates, with the flag telling
    /// whether the view border uses the active color.
    pub views: Vec<(Rect, bool)>,
}

pub struct Decorations<K: Canvas> {
    canvas: Arc<K>,
    buffers: HashMap<DecorKey, DecorBuffer<K::Buffer>>,
}

/// Paints the four edge strips of `rect` into a buffer, offset so that
/// `origin` maps to the buffer's top-left corner.
fn paint_border_strips<K: Canvas>(
    canvas: &K,
    buffer: &mut K::Buffer,
    rect: Rect,
    origin: (u32, u32),
    thickness: u32,
    color: Color,
) {
    if thickness == 0 || rect.is_empty() {
        return;
    }

    let x = rect.x - origin.0;
    let y = rect.y - origin.1;
    let t = thickness.min(rect.w).min(rect.h);

    canvas.paint_rect(buffer, Rect::new(x, y, t, rect.h), color);
    canvas.paint_rect(buffer, Rect::new(x + rect.w - t, y, t, rect.h), color);
    canvas.paint_rect(buffer, Rect::new(x, y, rect.w, t), color);
    canvas.paint_rect(buffer, Rect::new(x, y + rect.h - t, rect.w, t), color);
}

impl<K: Canvas> Decorations<K> {
    pub fn new(canvas: Arc<K>) -> Self {
        Self {
            canvas,
            buffers: HashMap::new(),
        }
    }

    /// Repaints the border buffer of one leaf, reallocating it when the
    /// leaf's rectangle changed size. On allocation failure the old buffer
    /// (if any) is kept and the leaf is skipped for this update.
    pub fn repaint_leaf(&mut self, ws: u32, decor: &LeafDecor, config: &Config) {
        if decor.rect.is_empty() {
            return;
        }

        let key = (ws, decor.frame);
        let size = (decor.rect.w, decor.rect.h);

        if self.buffers.get(&key).map(|b| b.size) != Some(size) {
            match self.canvas.create_buffer(decor.rect.size()) {
                Ok(buffer) => {
                    self.buffers.insert(key, DecorBuffer { size, buffer });
                }
                Err(err) => {
                    warn!("failed to allocate border buffer for frame {:?}: {err:#}", decor.frame);
                    return;
                }
            }
        }

        let entry = self.buffers.get_mut(&key).unwrap();
        let buffer = &mut entry.buffer;

        // Clear to transparent, then draw the frame border along the edges.
        let local = Rect::new(0, 0, decor.rect.w, decor.rect.h);
        self.canvas.paint_rect(buffer, local, Color::TRANSPARENT);

        let (thickness, color) = match (decor.is_empty, decor.is_active) {
            (true, true) => (
                config.frame_border_empty_size,
                config.frame_border_empty_active_color,
            ),
            (true, false) => (
                config.frame_border_empty_size,
                config.frame_border_empty_inactive_color,
            ),
            (false, true) => (config.frame_border_size, config.frame_border_active_color),
            (false, false) => (
                config.frame_border_size,
                config.frame_border_inactive_color,
            ),
        };
        paint_border_strips(
            &*self.canvas,
            buffer,
            local,
            (0, 0),
            thickness,
            color,
        );

        for &(view_rect, view_active) in &decor.views {
            let color = if view_active {
                config.view_border_active_color
            } else {
                config.view_border_inactive_color
            };
            paint_border_strips(
                &*self.canvas,
                buffer,
                view_rect,
                (decor.rect.x, decor.rect.y),
                config.view_border_size,
                color,
            );
        }
    }

    /// Drops buffers of leaves that no longer exist in the workspace.
    pub fn prune(&mut self, ws: u32, live: &[FrameId]) {
        self.buffers
            .retain(|(key_ws, frame), _| *key_ws != ws || live.contains(frame));
    }

    /// Blits one leaf's buffer onto its output.
    pub fn blit_leaf(&self, ws: u32, frame: FrameId, rect: Rect, output: OutputId) {
        if let Some(entry) = self.buffers.get(&(ws, frame)) {
            self.canvas.blit_to_output(output, rect, &entry.buffer);
        }
    }
}
