//! Fake port implementations shared by the test modules.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use wavy_config::{Color, ScriptRef};

use crate::ports::{Canvas, Compositor, OutputId, ScriptHost, ViewId, WidgetOutput};
use crate::utils::{Rect, Size};

#[derive(Debug, Default)]
pub struct CompositorState {
    pub masks: HashMap<ViewId, bool>,
    pub geometries: HashMap<ViewId, Rect>,
    pub focused: Option<ViewId>,
    pub closed: Vec<ViewId>,
    pub renders_scheduled: usize,
    pub terminated: bool,
}

/// Records every outbound compositor request for assertions.
#[derive(Debug, Default, Clone)]
pub struct TestCompositor(Arc<Mutex<CompositorState>>);

impl TestCompositor {
    pub fn state(&self) -> MutexGuard<'_, CompositorState> {
        self.0.lock()
    }

    pub fn geometry(&self, view: ViewId) -> Option<Rect> {
        self.0.lock().geometries.get(&view).copied()
    }

    pub fn mask(&self, view: ViewId) -> Option<bool> {
        self.0.lock().masks.get(&view).copied()
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.0.lock().focused
    }

    pub fn renders_scheduled(&self) -> usize {
        self.0.lock().renders_scheduled
    }
}

impl Compositor for TestCompositor {
    fn view_set_mask(&self, view: ViewId, visible: bool) {
        self.0.lock().masks.insert(view, visible);
    }

    fn view_set_geometry(&self, view: ViewId, geometry: Rect) {
        self.0.lock().geometries.insert(view, geometry);
    }

    fn view_focus(&self, view: Option<ViewId>) {
        self.0.lock().focused = view;
    }

    fn view_close(&self, view: ViewId) {
        self.0.lock().closed.push(view);
    }

    fn view_title(&self, view: ViewId) -> Option<String> {
        Some(format!("view {}", view.0))
    }

    fn output_schedule_render(&self, _output: OutputId) {
        self.0.lock().renders_scheduled += 1;
    }

    fn terminate(&self) {
        self.0.lock().terminated = true;
    }
}

#[derive(Debug, Default)]
pub struct CanvasState {
    pub buffers_created: usize,
    pub rects_painted: usize,
    pub texts_drawn: usize,
    pub blits: usize,
    pub fail_alloc: bool,
}

/// Counts drawing operations; text measures as 8 px per character.
#[derive(Debug, Default, Clone)]
pub struct TestCanvas(Arc<Mutex<CanvasState>>);

#[derive(Debug)]
pub struct TestBuffer {
    pub size: Size,
}

impl TestCanvas {
    pub fn state(&self) -> MutexGuard<'_, CanvasState> {
        self.0.lock()
    }

    pub fn set_fail_alloc(&self, fail: bool) {
        self.0.lock().fail_alloc = fail;
    }
}

impl Canvas for TestCanvas {
    type Buffer = TestBuffer;

    fn create_buffer(&self, size: Size) -> anyhow::Result<TestBuffer> {
        let mut state = self.0.lock();
        if state.fail_alloc {
            anyhow::bail!("buffer allocation refused");
        }
        state.buffers_created += 1;
        Ok(TestBuffer { size })
    }

    fn paint_rect(&self, _buffer: &mut TestBuffer, _rect: Rect, _color: Color) {
        self.0.lock().rects_painted += 1;
    }

    fn draw_text(
        &self,
        _buffer: &mut TestBuffer,
        _rect: Rect,
        _font: &str,
        _text: &str,
        _color: Color,
    ) {
        self.0.lock().texts_drawn += 1;
    }

    fn measure_text(&self, _font: &str, text: &str) -> Size {
        Size::new(text.chars().count() as u32 * 8, 12)
    }

    fn blit_to_output(&self, _output: OutputId, _geometry: Rect, _buffer: &TestBuffer) {
        self.0.lock().blits += 1;
    }
}

#[derive(Debug, Default)]
pub struct ScriptState {
    pub widget_outputs: HashMap<ScriptRef, WidgetOutput>,
    pub failing: Vec<ScriptRef>,
    pub widget_calls: Vec<ScriptRef>,
    pub calls: Vec<ScriptRef>,
}

/// Script host returning canned widget outputs.
#[derive(Debug, Default, Clone)]
pub struct TestScript(Arc<Mutex<ScriptState>>);

impl TestScript {
    pub fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.0.lock()
    }

    pub fn set_widget_output(&self, callback: ScriptRef, text: &str) {
        self.0.lock().widget_outputs.insert(
            callback,
            WidgetOutput {
                bg: Color(0x282828ff),
                fg: Color(0xffffffff),
                text: text.to_string(),
            },
        );
    }

    pub fn set_failing(&self, callback: ScriptRef, failing: bool) {
        let mut state = self.0.lock();
        state.failing.retain(|r| *r != callback);
        if failing {
            state.failing.push(callback);
        }
    }
}

impl ScriptHost for TestScript {
    fn call_widget(&self, callback: ScriptRef) -> anyhow::Result<WidgetOutput> {
        let mut state = self.0.lock();
        state.widget_calls.push(callback);
        if state.failing.contains(&callback) {
            anyhow::bail!("widget callback raised an error");
        }
        Ok(state
            .widget_outputs
            .get(&callback)
            .cloned()
            .unwrap_or(WidgetOutput {
                bg: Color::TRANSPARENT,
                fg: Color(0xffffffff),
                text: format!("w{}", callback.0),
            }))
    }

    fn call(&self, callback: ScriptRef) -> anyhow::Result<()> {
        self.0.lock().calls.push(callback);
        Ok(())
    }
}
