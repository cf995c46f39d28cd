//! The built-in tiling policies.
//!
//! A policy maps the inner rectangle of a leaf frame, its ordered view list
//! and the active view to one rectangle per view plus a visibility flag.
//! The mode set is fixed by configuration, so the policies are a closed sum
//! dispatched by [`tile`] rather than a trait.

use wavy_config::{Direction, TileLayout};

use crate::ports::ViewId;
use crate::utils::Rect;

/// Where one view of a leaf goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub view: ViewId,
    pub rect: Rect,
    pub visible: bool,
}

/// Computes placements for `views` inside `inner` under `layout`.
///
/// Vertical, horizontal and grid cover `inner` exactly, the trailing
/// view/row/column absorbing the integer-division remainder. Fullscreen
/// places only the active view; fibonacci halves the remaining space
/// clockwise (right, down, left, up), the last view taking what is left.
pub fn tile(
    layout: TileLayout,
    inner: Rect,
    views: &[ViewId],
    active_view: Option<ViewId>,
) -> Vec<Placement> {
    if views.is_empty() {
        return Vec::new();
    }

    match layout {
        TileLayout::Vertical => tile_vertical(inner, views),
        TileLayout::Horizontal => tile_horizontal(inner, views),
        TileLayout::Grid => tile_grid(inner, views),
        TileLayout::Fullscreen => tile_fullscreen(inner, views, active_view),
        TileLayout::Fibonacci => tile_fibonacci(inner, views),
    }
}

fn tile_vertical(inner: Rect, views: &[ViewId]) -> Vec<Placement> {
    let n = views.len() as u32;
    let div = inner.h / n;
    views
        .iter()
        .enumerate()
        .map(|(i, &view)| {
            let i = i as u32;
            let h = if i + 1 == n { inner.h - i * div } else { div };
            Placement {
                view,
                rect: Rect::new(inner.x, inner.y + i * div, inner.w, h),
                visible: true,
            }
        })
        .collect()
}

fn tile_horizontal(inner: Rect, views: &[ViewId]) -> Vec<Placement> {
    let n = views.len() as u32;
    let div = inner.w / n;
    views
        .iter()
        .enumerate()
        .map(|(i, &view)| {
            let i = i as u32;
            let w = if i + 1 == n { inner.w - i * div } else { div };
            Placement {
                view,
                rect: Rect::new(inner.x + i * div, inner.y, w, inner.h),
                visible: true,
            }
        })
        .collect()
}

/// Number of grid columns for `n` views.
pub fn grid_cols(n: usize) -> u32 {
    (n as f64).sqrt().ceil() as u32
}

fn tile_grid(inner: Rect, views: &[ViewId]) -> Vec<Placement> {
    let len = views.len() as u32;
    let cols = grid_cols(views.len());
    let rows = len / cols + if len % cols != 0 { 1 } else { 0 };
    let div_w = inner.w / cols;
    let div_h = inner.h / rows;

    let mut placements = Vec::with_capacity(views.len());
    for (c, &view) in views.iter().enumerate() {
        let c = c as u32;
        let (i, j) = (c / cols, c % cols);
        let h = if i == rows - 1 {
            inner.h - i * div_h
        } else {
            div_h
        };
        // The last view absorbs the rest of its row; otherwise the last
        // column absorbs the horizontal remainder.
        let w = if c == len - 1 {
            inner.w - j * div_w
        } else if j + 1 == cols {
            inner.w - (cols - 1) * div_w
        } else {
            div_w
        };
        placements.push(Placement {
            view,
            rect: Rect::new(inner.x + j * div_w, inner.y + i * div_h, w, h),
            visible: true,
        });
    }
    placements
}

fn tile_fullscreen(inner: Rect, views: &[ViewId], active_view: Option<ViewId>) -> Vec<Placement> {
    let active = active_view.unwrap_or(views[0]);
    views
        .iter()
        .map(|&view| Placement {
            view,
            rect: inner,
            visible: view == active,
        })
        .collect()
}

fn tile_fibonacci(inner: Rect, views: &[ViewId]) -> Vec<Placement> {
    let mut placements = Vec::with_capacity(views.len());
    let mut rest = inner;
    let n = views.len();

    for (i, &view) in views.iter().enumerate() {
        let rect = if i + 1 == n {
            rest
        } else if i % 2 == 0 {
            let half = rest.w / 2;
            let rect = Rect::new(rest.x, rest.y, half, rest.h);
            rest.x += half;
            rest.w -= half;
            rect
        } else {
            let half = rest.h / 2;
            let rect = Rect::new(rest.x, rest.y, rest.w, half);
            rest.y += half;
            rest.h -= half;
            rect
        };
        placements.push(Placement {
            view,
            rect,
            visible: true,
        });
    }
    placements
}

/// View-local directional adjacency: the neighbor of the active view inside
/// the leaf's own view list, where the tiling mode admits one. Fullscreen
/// and fibonacci never do; grid clamps a step down out of a partial last row
/// to the final view.
pub fn adjacent_view(
    layout: TileLayout,
    views: &[ViewId],
    active_view: Option<ViewId>,
    dir: Direction,
) -> Option<ViewId> {
    let active = active_view?;
    let i = views.iter().position(|v| *v == active)?;
    let len = views.len();

    match layout {
        TileLayout::Vertical => match dir {
            Direction::Up if i > 0 => Some(views[i - 1]),
            Direction::Down if i + 1 < len => Some(views[i + 1]),
            _ => None,
        },
        TileLayout::Horizontal => match dir {
            Direction::Left if i > 0 => Some(views[i - 1]),
            Direction::Right if i + 1 < len => Some(views[i + 1]),
            _ => None,
        },
        TileLayout::Grid => {
            let cols = grid_cols(len) as usize;
            match dir {
                Direction::Up if i >= cols => Some(views[i - cols]),
                Direction::Down if i + cols < len => Some(views[i + cols]),
                Direction::Down if i + cols >= len && i <= len.saturating_sub(cols) => {
                    Some(views[len - 1])
                }
                Direction::Left if i % cols > 0 => Some(views[i - 1]),
                Direction::Right if i % cols + 1 < cols && i + 1 < len => Some(views[i + 1]),
                _ => None,
            }
        }
        TileLayout::Fullscreen | TileLayout::Fibonacci => None,
    }
}
