//! The statusbar driver.
//!
//! Each output owns a double-buffered bar: widget callbacks repaint the back
//! buffer, then front and back are swapped under the output's draw lock, so
//! the render path always blits a complete frame. Widget evaluation is
//! serialized by the reentrant script lock; two background threads fire the
//! periodic hooks and a short-lived thread runs the initial sweep.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};
use wavy_config::{Color, Config, Hook, Position, Side, WidgetSpec};

use crate::layout::WorkspaceIndicator;
use crate::ports::{Canvas, Compositor, OutputId, ScriptHandle, ScriptHost};
use crate::utils::{Rect, Size};

/// Width of one workspace indicator cell at the left edge of the bar.
pub const WS_CELL_WIDTH: u32 = 20;

pub const FAST_HOOK_PERIOD: Duration = Duration::from_secs(1);
pub const SLOW_HOOK_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct Widget {
    spec: WidgetSpec,
    bg: Color,
    fg: Color,
    text: String,
}

/// Cloned widget state used while painting, so no lock is held across
/// canvas calls.
#[derive(Debug, Clone, Hash)]
struct WidgetSnapshot {
    side: Side,
    bg: Color,
    fg: Color,
    text: String,
}

struct OutputBar<B> {
    output_size: Size,
    geometry: Rect,
    front: B,
    back: B,
    /// Buffers must be reallocated before the next paint (resolution
    /// change).
    dirty: bool,
    workspaces: Vec<WorkspaceIndicator>,
    /// Hash of the last painted content; repaints with an unchanged
    /// fingerprint are skipped.
    fingerprint: Option<u64>,
}

pub struct BarDriver<C: Compositor, K: Canvas, S: ScriptHost> {
    config: Arc<Config>,
    comp: Arc<C>,
    canvas: Arc<K>,
    script: ScriptHandle<S>,
    widgets: Mutex<Vec<Widget>>,
    bars: Mutex<HashMap<OutputId, Arc<Mutex<OutputBar<K::Buffer>>>>>,
}

/// Handles of the periodic hook threads. Dropping the senders wakes the
/// threads at their next sleep boundary; no in-flight callback is
/// interrupted.
pub struct BarThreads {
    shutdown: Vec<mpsc::Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl BarThreads {
    pub fn stop(self) {
        drop(self.shutdown);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

impl<C, K, S> BarDriver<C, K, S>
where
    C: Compositor,
    K: Canvas,
    S: ScriptHost,
{
    pub fn new(config: Arc<Config>, comp: Arc<C>, canvas: Arc<K>, script: ScriptHandle<S>) -> Self {
        let widgets = config
            .bar_widgets
            .iter()
            .map(|&spec| Widget {
                spec,
                bg: Color::TRANSPARENT,
                fg: Color::TRANSPARENT,
                text: String::new(),
            })
            .collect();

        Self {
            config,
            comp,
            canvas,
            script,
            widgets: Mutex::new(widgets),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_geometry(&self, output_size: Size) -> Rect {
        let h = self.config.statusbar_height.min(output_size.h);
        let y = match self.config.statusbar_position {
            Position::Top => 0,
            Position::Bottom => output_size.h - h,
        };
        Rect::new(0, y, output_size.w, h)
    }

    /// Allocates the double buffer for a newly connected output.
    pub fn add_output(&self, output: OutputId, output_size: Size) -> anyhow::Result<()> {
        let geometry = self.bar_geometry(output_size);
        let front = self.canvas.create_buffer(geometry.size())?;
        let back = self.canvas.create_buffer(geometry.size())?;

        let bar = OutputBar {
            output_size,
            geometry,
            front,
            back,
            dirty: false,
            workspaces: Vec::new(),
            fingerprint: None,
        };
        self.bars.lock().insert(output, Arc::new(Mutex::new(bar)));
        debug!("bar allocated for output {output:?}");
        Ok(())
    }

    pub fn remove_output(&self, output: OutputId) {
        self.bars.lock().remove(&output);
    }

    /// Marks the bar for reallocation at the new size.
    pub fn resize_output(&self, output: OutputId, output_size: Size) {
        let Some(bar) = self.bar(output) else {
            return;
        };
        let mut bar = bar.lock();
        bar.output_size = output_size;
        bar.geometry = self.bar_geometry(output_size);
        bar.dirty = true;
    }

    fn bar(&self, output: OutputId) -> Option<Arc<Mutex<OutputBar<K::Buffer>>>> {
        self.bars.lock().get(&output).cloned()
    }

    /// Publishes fresh workspace indicator rows; hook threads paint from
    /// this snapshot and never touch the frame trees.
    pub fn sync_workspaces(&self, rows: Vec<(OutputId, Vec<WorkspaceIndicator>)>) {
        for (output, row) in rows {
            if let Some(bar) = self.bar(output) {
                bar.lock().workspaces = row;
            }
        }
    }

    /// Fires one hook class: re-evaluates every subscribed widget under the
    /// script lock, then repaints and swaps every bar. A faulting callback
    /// keeps its previous text for this tick.
    pub fn trigger_hook(&self, hook: Hook) {
        let jobs: Vec<(usize, WidgetSpec)> = {
            let widgets = self.widgets.lock();
            widgets
                .iter()
                .enumerate()
                .filter(|(_, w)| w.spec.hook == hook)
                .map(|(i, w)| (i, w.spec))
                .collect()
        };

        if !jobs.is_empty() {
            self.script.with(|host| {
                for (idx, spec) in jobs {
                    match host.call_widget(spec.callback) {
                        Ok(out) => {
                            let mut widgets = self.widgets.lock();
                            let w = &mut widgets[idx];
                            w.bg = out.bg;
                            w.fg = out.fg;
                            w.text = out.text;
                        }
                        Err(err) => {
                            warn!("widget callback {:?} failed, keeping previous text: {err:#}", spec.callback);
                        }
                    }
                }
            });
        }

        self.update_all();
    }

    /// Repaints every bar and schedules renders.
    pub fn update_all(&self) {
        let bars: Vec<(OutputId, Arc<Mutex<OutputBar<K::Buffer>>>)> = self
            .bars
            .lock()
            .iter()
            .map(|(id, bar)| (*id, bar.clone()))
            .collect();

        for (output, bar) in bars {
            self.repaint(&bar);
            self.comp.output_schedule_render(output);
        }
    }

    fn widget_snapshots(&self) -> Vec<WidgetSnapshot> {
        self.widgets
            .lock()
            .iter()
            .map(|w| WidgetSnapshot {
                side: w.spec.side,
                bg: w.bg,
                fg: w.fg,
                text: w.text.clone(),
            })
            .collect()
    }

    fn repaint(&self, bar: &Mutex<OutputBar<K::Buffer>>) {
        let widgets = self.widget_snapshots();
        let mut bar = bar.lock();

        let mut hasher = DefaultHasher::new();
        bar.geometry.hash(&mut hasher);
        bar.workspaces.hash(&mut hasher);
        widgets.hash(&mut hasher);
        let fingerprint = hasher.finish();

        if !bar.dirty && bar.fingerprint == Some(fingerprint) {
            return;
        }

        if bar.dirty {
            let size = bar.geometry.size();
            match (self.canvas.create_buffer(size), self.canvas.create_buffer(size)) {
                (Ok(front), Ok(back)) => {
                    bar.front = front;
                    bar.back = back;
                    bar.dirty = false;
                }
                _ => {
                    warn!("failed to reallocate bar buffers, keeping previous contents");
                    return;
                }
            }
        }

        self.paint_back(&mut bar, &widgets);
        let OutputBar { front, back, .. } = &mut *bar;
        std::mem::swap(front, back);
        bar.fingerprint = Some(fingerprint);
    }

    fn paint_back(&self, bar: &mut OutputBar<K::Buffer>, widgets: &[WidgetSnapshot]) {
        let config = &self.config;
        let canvas = &*self.canvas;
        let width = bar.geometry.w;
        let height = bar.geometry.h;
        let font = &config.statusbar_font;

        canvas.paint_rect(
            &mut bar.back,
            Rect::new(0, 0, width, height),
            config.statusbar_bg_color,
        );

        // Workspace indicator cells along the left edge.
        for (i, ws) in bar.workspaces.iter().enumerate() {
            let x = i as u32 * WS_CELL_WIDTH;
            if x + WS_CELL_WIDTH > width {
                break;
            }
            let (cell_color, font_color) = if ws.active {
                (
                    config.statusbar_active_ws_color,
                    config.statusbar_active_ws_font_color,
                )
            } else {
                (
                    config.statusbar_inactive_ws_color,
                    config.statusbar_inactive_ws_font_color,
                )
            };
            let cell = Rect::new(x, 0, WS_CELL_WIDTH, height);
            canvas.paint_rect(&mut bar.back, cell, cell_color);
            canvas.draw_text(&mut bar.back, cell, font, &ws.number.to_string(), font_color);
        }

        // Widgets: right side from the right edge inward, left side from
        // the indicator edge outward. Drawing stops when the cursors meet.
        let gap = config.statusbar_gap;
        let padding = config.statusbar_padding;
        let separator_width = config.statusbar_separator_width;
        let mut right_cursor = width + gap;
        let mut left_cursor = bar.workspaces.len() as u32 * WS_CELL_WIDTH + gap;
        let mut first_right = true;
        let mut first_left = true;

        for widget in widgets {
            if widget.text.is_empty() {
                continue;
            }
            if left_cursor > right_cursor {
                break;
            }

            let text_size = canvas.measure_text(font, &widget.text);
            let box_width = text_size.w + 2 * padding;

            let x = match widget.side {
                Side::Right => {
                    if right_cursor < box_width + gap {
                        break;
                    }
                    let x = right_cursor - box_width - gap;
                    if config.statusbar_separator_enabled && !first_right {
                        let sep_x = x + box_width + (gap.saturating_sub(separator_width)) / 2;
                        canvas.paint_rect(
                            &mut bar.back,
                            Rect::new(sep_x, 0, separator_width, height),
                            config.statusbar_separator_color,
                        );
                    }
                    right_cursor = x;
                    first_right = false;
                    x
                }
                Side::Left => {
                    let x = left_cursor;
                    if config.statusbar_separator_enabled && !first_left && x >= gap {
                        let sep_x = x - gap + (gap.saturating_sub(separator_width)) / 2;
                        canvas.paint_rect(
                            &mut bar.back,
                            Rect::new(sep_x, 0, separator_width, height),
                            config.statusbar_separator_color,
                        );
                    }
                    left_cursor = x + box_width + gap;
                    first_left = false;
                    x
                }
            };

            let widget_box = Rect::new(x, 0, box_width, height);
            canvas.paint_rect(&mut bar.back, widget_box, widget.bg);
            canvas.draw_text(&mut bar.back, widget_box, font, &widget.text, widget.fg);
        }
    }

    /// Blits the front buffer; called from the render callback under the
    /// same draw lock the painters use.
    pub fn render(&self, output: OutputId) {
        let Some(bar) = self.bar(output) else {
            return;
        };
        let bar = bar.lock();
        self.canvas.blit_to_output(output, bar.geometry, &bar.front);
    }
}

impl<C, K, S> BarDriver<C, K, S>
where
    C: Compositor + 'static,
    K: Canvas + 'static,
    S: ScriptHost + 'static,
{
    /// Spawns the periodic hook threads plus a one-shot thread that fires
    /// every hook once, so startup isn't blocked by a slow script.
    pub fn spawn_hook_threads(self: &Arc<Self>) -> BarThreads {
        let mut shutdown = Vec::new();
        let mut handles = Vec::new();

        for (hook, period) in [
            (Hook::PeriodicFast, FAST_HOOK_PERIOD),
            (Hook::PeriodicSlow, SLOW_HOOK_PERIOD),
        ] {
            let (tx, rx) = mpsc::channel::<()>();
            shutdown.push(tx);
            let driver = self.clone();
            handles.push(thread::spawn(move || loop {
                driver.trigger_hook(hook);
                match rx.recv_timeout(period) {
                    Err(mpsc::RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            }));
        }

        let driver = self.clone();
        handles.push(thread::spawn(move || {
            for hook in Hook::ALL {
                driver.trigger_hook(hook);
            }
        }));

        BarThreads { shutdown, handles }
    }
}

#[cfg(test)]
mod tests {
    use wavy_config::ScriptRef;

    use super::*;
    use crate::layout::WorkspaceIndicator;
    use crate::test_support::{TestCanvas, TestCompositor, TestScript};

    type TestDriver = BarDriver<TestCompositor, TestCanvas, TestScript>;

    const OUT: OutputId = OutputId(1);

    fn widget(hook: Hook, side: Side, callback: u32) -> WidgetSpec {
        WidgetSpec {
            side,
            hook,
            callback: ScriptRef(callback),
        }
    }

    fn make_driver(config: Config) -> (Arc<TestDriver>, TestCanvas, TestScript) {
        let canvas = TestCanvas::default();
        let script = TestScript::default();
        let driver = Arc::new(BarDriver::new(
            Arc::new(config),
            Arc::new(TestCompositor::default()),
            Arc::new(canvas.clone()),
            crate::ports::ScriptHandle::new(script.clone()),
        ));
        (driver, canvas, script)
    }

    #[test]
    fn hooks_reevaluate_only_subscribed_widgets() {
        let config = Config {
            bar_widgets: vec![
                widget(Hook::PeriodicFast, Side::Right, 1),
                widget(Hook::User, Side::Right, 2),
            ],
            ..Default::default()
        };
        let (driver, _, script) = make_driver(config);
        script.set_widget_output(ScriptRef(1), "cpu 42");

        driver.trigger_hook(Hook::PeriodicFast);

        assert_eq!(script.state().widget_calls, vec![ScriptRef(1)]);
        let widgets = driver.widgets.lock();
        assert_eq!(widgets[0].text, "cpu 42");
        assert!(widgets[1].text.is_empty());
    }

    #[test]
    fn faulting_widget_keeps_its_previous_text() {
        let config = Config {
            bar_widgets: vec![widget(Hook::PeriodicSlow, Side::Left, 3)],
            ..Default::default()
        };
        let (driver, _, script) = make_driver(config);
        script.set_widget_output(ScriptRef(3), "mail: 2");

        driver.trigger_hook(Hook::PeriodicSlow);
        assert_eq!(driver.widgets.lock()[0].text, "mail: 2");

        script.set_failing(ScriptRef(3), true);
        driver.trigger_hook(Hook::PeriodicSlow);
        assert_eq!(driver.widgets.lock()[0].text, "mail: 2");
        assert_eq!(script.state().widget_calls.len(), 2);
    }

    #[test]
    fn unchanged_content_skips_the_repaint() {
        let (driver, canvas, _) = make_driver(Config::default());
        driver.add_output(OUT, Size::new(800, 600)).unwrap();
        driver.sync_workspaces(vec![(
            OUT,
            vec![WorkspaceIndicator {
                number: 1,
                active: true,
            }],
        )]);

        driver.trigger_hook(Hook::User);
        let painted = canvas.state().rects_painted;
        assert!(painted > 0);

        driver.trigger_hook(Hook::User);
        assert_eq!(canvas.state().rects_painted, painted);

        // A workspace state change invalidates the fingerprint.
        driver.sync_workspaces(vec![(
            OUT,
            vec![WorkspaceIndicator {
                number: 1,
                active: false,
            }],
        )]);
        driver.trigger_hook(Hook::User);
        assert!(canvas.state().rects_painted > painted);
    }

    #[test]
    fn resolution_changes_reallocate_the_double_buffer() {
        let (driver, canvas, _) = make_driver(Config::default());
        driver.add_output(OUT, Size::new(800, 600)).unwrap();
        assert_eq!(canvas.state().buffers_created, 2);

        driver.resize_output(OUT, Size::new(1024, 768));
        driver.trigger_hook(Hook::User);
        assert_eq!(canvas.state().buffers_created, 4);
    }

    #[test]
    fn failed_reallocation_keeps_the_old_buffers() {
        let (driver, canvas, _) = make_driver(Config::default());
        driver.add_output(OUT, Size::new(800, 600)).unwrap();

        driver.resize_output(OUT, Size::new(1024, 768));
        canvas.set_fail_alloc(true);
        driver.trigger_hook(Hook::User);
        assert_eq!(canvas.state().buffers_created, 2);

        // The stale front buffer still renders.
        driver.render(OUT);
        assert_eq!(canvas.state().blits, 1);

        canvas.set_fail_alloc(false);
        driver.trigger_hook(Hook::User);
        assert_eq!(canvas.state().buffers_created, 4);
    }

    #[test]
    fn separators_appear_between_widgets_on_the_same_side() {
        let config = Config {
            statusbar_separator_enabled: true,
            bar_widgets: vec![
                widget(Hook::User, Side::Right, 1),
                widget(Hook::User, Side::Right, 2),
            ],
            ..Default::default()
        };
        let (driver, canvas, script) = make_driver(config);
        script.set_widget_output(ScriptRef(1), "aa");
        script.set_widget_output(ScriptRef(2), "bb");
        driver.add_output(OUT, Size::new(800, 600)).unwrap();
        driver.trigger_hook(Hook::User);

        // Force one more repaint with a changed widget and count its
        // operations: background, two widget boxes and one separator.
        script.set_widget_output(ScriptRef(1), "cc");
        let rects = canvas.state().rects_painted;
        let texts = canvas.state().texts_drawn;
        driver.trigger_hook(Hook::User);
        assert_eq!(canvas.state().rects_painted - rects, 4);
        assert_eq!(canvas.state().texts_drawn - texts, 2);
    }
}

