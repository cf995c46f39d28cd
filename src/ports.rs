//! The named interfaces to the core's external collaborators.
//!
//! The host compositor delivers inbound events by calling methods on
//! [`crate::Core`]; outbound requests travel through the [`Compositor`]
//! trait. Pixel work goes through [`Canvas`], and user callbacks registered
//! by the config source are invoked through [`ScriptHost`] behind the
//! reentrant [`ScriptHandle`] lock.

use std::sync::Arc;

use parking_lot::ReentrantMutex;
use wavy_config::{Color, ScriptRef};

use crate::utils::{Rect, Size};

/// Opaque handle of a client surface owned by the host compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

/// Opaque handle of a physical output owned by the host compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub u64);

/// Pressed/released state of a key or pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Outbound requests to the host compositor.
///
/// Implementations must be callable from the bar hook threads as well as the
/// event loop; every operation is a fire-and-forget request.
pub trait Compositor: Send + Sync {
    /// Shows or hides a view. The core only ever uses full visibility, so
    /// the compositor-side mask is collapsed to a boolean here.
    fn view_set_mask(&self, view: ViewId, visible: bool);

    fn view_set_geometry(&self, view: ViewId, geometry: Rect);

    /// Moves keyboard focus. `None` clears focus.
    fn view_focus(&self, view: Option<ViewId>);

    fn view_close(&self, view: ViewId);

    /// Current title of a view, if the client set one.
    fn view_title(&self, view: ViewId) -> Option<String>;

    fn output_schedule_render(&self, output: OutputId);

    /// Asks the compositor to shut down the event loop.
    fn terminate(&self);
}

/// 2D drawing port used for frame borders and the statusbar.
///
/// Buffers release their backing storage on drop; there is no explicit
/// destroy operation.
pub trait Canvas: Send + Sync {
    type Buffer: Send;

    fn create_buffer(&self, size: Size) -> anyhow::Result<Self::Buffer>;

    /// Fills a rectangle, in buffer-local coordinates.
    fn paint_rect(&self, buffer: &mut Self::Buffer, rect: Rect, color: Color);

    /// Draws `text` centered inside `rect`.
    fn draw_text(&self, buffer: &mut Self::Buffer, rect: Rect, font: &str, text: &str, color: Color);

    /// Size of `text` when rendered in `font`. The bar layout needs this
    /// before it can place a widget's box.
    fn measure_text(&self, font: &str, text: &str) -> Size;

    /// Copies a buffer onto an output at the given output-local geometry.
    fn blit_to_output(&self, output: OutputId, geometry: Rect, buffer: &Self::Buffer);
}

/// Result of evaluating a statusbar widget callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidgetOutput {
    pub bg: Color,
    pub fg: Color,
    pub text: String,
}

/// The embedded scripting state. Callback handles come from the config
/// source's registry; resolving them is entirely the host's business.
pub trait ScriptHost: Send {
    /// Runs a widget callback and returns its `(bg, fg, text)` triple.
    fn call_widget(&self, callback: ScriptRef) -> anyhow::Result<WidgetOutput>;

    /// Runs a plain callback bound to a key.
    fn call(&self, callback: ScriptRef) -> anyhow::Result<()>;
}

/// Shared handle to the script state.
///
/// The only observable operation is "take the lock and run f". The lock is
/// reentrant because a widget callback may trigger further hooks, which take
/// it again on the same thread; recursion from other threads still blocks.
pub struct ScriptHandle<S> {
    inner: Arc<ReentrantMutex<S>>,
}

impl<S> Clone for ScriptHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: ScriptHost> ScriptHandle<S> {
    pub fn new(host: S) -> Self {
        Self {
            inner: Arc::new(ReentrantMutex::new(host)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.inner.lock();
        f(&guard)
    }
}
