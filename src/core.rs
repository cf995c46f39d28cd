//! The core record: all compositor-wide state behind one value.
//!
//! The host compositor constructs a [`Core`] at startup and forwards its
//! callbacks to the inbound event methods; everything the core wants from
//! the outside world goes back out through the port traits. All event
//! methods run on the host's event thread.

use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::Context as _;
use tracing::{debug, info, warn};
use wavy_config::{Action, Config, Hook, Keysym, Modifiers};

use crate::bar::{BarDriver, BarThreads};
use crate::input::Bindings;
use crate::layout::LayoutManager;
use crate::ports::{
    ButtonState, Canvas, Compositor, OutputId, ScriptHandle, ScriptHost, ViewId,
};
use crate::utils::{Point, Rect, Size};

pub struct Core<C: Compositor, K: Canvas, S: ScriptHost> {
    config: Arc<Config>,
    comp: Arc<C>,
    layout: LayoutManager<C, K>,
    bar: Arc<BarDriver<C, K, S>>,
    bindings: Bindings,
    script: ScriptHandle<S>,
    threads: Option<BarThreads>,
}

impl<C: Compositor, K: Canvas, S: ScriptHost> Core<C, K, S> {
    /// Builds the core from a validated config and the three port
    /// implementations. An invalid config aborts initialization.
    pub fn new(config: Config, comp: C, canvas: K, script: S) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;

        let config = Arc::new(config);
        let comp = Arc::new(comp);
        let canvas = Arc::new(canvas);
        let script = ScriptHandle::new(script);

        let layout = LayoutManager::new(comp.clone(), canvas.clone(), config.clone());
        let bar = Arc::new(BarDriver::new(
            config.clone(),
            comp.clone(),
            canvas,
            script.clone(),
        ));
        let bindings = Bindings::new(&config.keys);

        Ok(Self {
            config,
            comp,
            layout,
            bar,
            bindings,
            script,
            threads: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &LayoutManager<C, K> {
        &self.layout
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Shared handle to the bar driver, e.g. for a script host that wants
    /// to fire the user hook.
    pub fn bar(&self) -> &Arc<BarDriver<C, K, S>> {
        &self.bar
    }

    /// Pushes fresh workspace snapshots to the bars and fires the
    /// view-update hook; called after every layout mutation.
    fn after_mutation(&self) {
        self.bar.sync_workspaces(self.layout.indicator_rows());
        self.bar.trigger_hook(Hook::ViewUpdate);
    }

    // ------------------------------------------------------------------
    // Inbound events
    // ------------------------------------------------------------------

    pub fn output_added(&mut self, output: OutputId, w: u32, h: u32) {
        let size = Size::new(w, h);
        if !self.layout.output_added(output, size) {
            return;
        }
        if let Err(err) = self.bar.add_output(output, size) {
            warn!("no statusbar for output {output:?}: {err:#}");
        }
        self.after_mutation();
    }

    pub fn output_removed(&mut self, output: OutputId) {
        if !self.layout.output_removed(output) {
            return;
        }
        self.bar.remove_output(output);
        self.after_mutation();
    }

    pub fn output_resolution(&mut self, output: OutputId, w: u32, h: u32) {
        let size = Size::new(w, h);
        if !self.layout.output_resolution(output, size) {
            return;
        }
        self.bar.resize_output(output, size);
        self.after_mutation();
    }

    /// Returns whether the view was adopted into the layout.
    pub fn view_created(&mut self, view: ViewId) -> bool {
        let managed = self.layout.view_created(view);
        if managed {
            self.after_mutation();
        }
        managed
    }

    pub fn view_destroyed(&mut self, view: ViewId) {
        if self.layout.view_destroyed(view) {
            self.after_mutation();
        }
    }

    pub fn view_properties_updated(&self, view: ViewId) {
        debug!("properties of view {view:?} updated");
        self.bar.trigger_hook(Hook::ViewUpdate);
    }

    /// Dispatches a key press; returns whether the key was consumed.
    pub fn key(&mut self, modifiers: Modifiers, keysym: Keysym, state: ButtonState) -> bool {
        if state != ButtonState::Pressed {
            return false;
        }
        debug!("keypress: keysym = {:#x}, modifiers = {:?}", keysym.0, modifiers);

        let Some(action) = self.bindings.lookup(modifiers, keysym).cloned() else {
            return false;
        };
        self.run_action(&action)
    }

    pub fn pointer_button(&mut self, view: Option<ViewId>, point: Point, state: ButtonState) {
        debug!("pointer button on {view:?} at ({}, {})", point.x, point.y);
        if state != ButtonState::Pressed {
            return;
        }
        if let Some(view) = view {
            if self.layout.focus_view(view) {
                self.after_mutation();
            }
        }
    }

    pub fn request_geometry(&self, view: ViewId, geometry: Rect) {
        self.layout.request_geometry(view, geometry);
    }

    /// Blits frame borders and the bar front buffer for one output; called
    /// right before the compositor composes the output.
    pub fn render_pre(&self, output: OutputId) {
        self.layout.render_decorations(output);
        self.bar.render(output);
    }

    /// Spawns the configured autostart command lines.
    pub fn compositor_ready(&self) {
        for argv in &self.config.autostart {
            spawn_command(argv);
        }
    }

    /// Fires the user hook; exposed so a script host can forward a
    /// `trigger_hook` call from user code.
    pub fn trigger_user_hook(&self) {
        self.bar.trigger_hook(Hook::User);
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Executes one bound action. Always reports the key as consumed.
    fn run_action(&mut self, action: &Action) -> bool {
        let changed = match action {
            Action::Spawn(argv) => {
                spawn_command(argv);
                false
            }
            Action::ScriptCall(callback) => {
                let result = self.script.with(|host| host.call(*callback));
                if let Err(err) = result {
                    warn!("script keybinding {callback:?} failed: {err:#}");
                }
                false
            }
            Action::Exit => {
                info!("terminating on user request");
                self.comp.terminate();
                false
            }
            Action::CloseView => {
                if let Some(view) = self.layout.active_view() {
                    self.comp.view_close(view);
                }
                false
            }
            Action::CycleTilingMode => self.layout.cycle_tiling_mode(),
            Action::CycleView(dir) => self.layout.cycle_view(*dir),
            Action::Select(dir) => self.layout.focus_direction(*dir),
            Action::Move(dir) => self.layout.move_direction(*dir),
            Action::NewFrame(side) => self.layout.new_frame(*side),
            Action::DeleteFrame => self.layout.delete_frame(),
            Action::Resize(dir, fraction) => self.layout.resize(*dir, *fraction),
            Action::CycleWorkspace(dir) => self.layout.cycle_workspace(*dir),
            Action::SelectWorkspace(n) => {
                self.layout.switch_to((*n).saturating_sub(1) as usize)
            }
            Action::MoveToWorkspace(n) => {
                self.layout.move_to_workspace((*n).saturating_sub(1) as usize)
            }
            Action::AddWorkspace => self.layout.add_workspace(),
        };

        if changed {
            self.after_mutation();
        }
        true
    }

    /// Checks every cross-component invariant; tests call this after each
    /// simulated event.
    pub fn verify_invariants(&self) {
        self.layout.verify_invariants();
    }
}

impl<C, K, S> Core<C, K, S>
where
    C: Compositor + 'static,
    K: Canvas + 'static,
    S: ScriptHost + 'static,
{
    /// Starts the periodic bar hook threads and the initial hook sweep.
    pub fn start_bar_hooks(&mut self) {
        if self.threads.is_none() {
            self.threads = Some(self.bar.spawn_hook_threads());
        }
    }

    /// Stops the hook threads at their next sleep boundary. In-flight
    /// callbacks finish undisturbed.
    pub fn shutdown(&mut self) {
        if let Some(threads) = self.threads.take() {
            threads.stop();
        }
    }
}

/// Runs a command line through the shell, detached from the compositor.
fn spawn_command(argv: &[String]) {
    if argv.is_empty() {
        return;
    }

    let cmd = argv.join(" ");
    debug!("spawning \"{cmd}\"");

    let mut command = Command::new("/bin/sh");
    command
        .arg("-c")
        .arg(&cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt as _;
        command.process_group(0);
    }

    match command.spawn() {
        Ok(child) => drop(child),
        Err(err) => warn!("failed to spawn \"{cmd}\": {err}"),
    }
}

#[cfg(test)]
mod tests {
    use wavy_config::{Bind, Binds, Direction, Key, ScriptRef, Side, WidgetSpec};

    use super::*;
    use crate::test_support::{TestCanvas, TestCompositor, TestScript};

    const OUT: OutputId = OutputId(1);
    const KEY_K: Keysym = Keysym(0x6b);
    const KEY_Q: Keysym = Keysym(0x71);

    fn bind(modifiers: Modifiers, keysym: Keysym, action: Action) -> Bind {
        Bind {
            key: Key { modifiers, keysym },
            action,
        }
    }

    fn make_core() -> (
        Core<TestCompositor, TestCanvas, TestScript>,
        TestCompositor,
        TestCanvas,
        TestScript,
    ) {
        let config = Config {
            frame_border_size: 0,
            frame_border_empty_size: 0,
            view_border_size: 0,
            keys: Binds(vec![
                bind(Modifiers::SUPER, KEY_K, Action::Select(Direction::Up)),
                bind(Modifiers::SUPER, KEY_Q, Action::Exit),
            ]),
            bar_widgets: vec![WidgetSpec {
                side: Side::Right,
                hook: Hook::ViewUpdate,
                callback: ScriptRef(7),
            }],
            ..Default::default()
        };

        let comp = TestCompositor::default();
        let canvas = TestCanvas::default();
        let script = TestScript::default();
        let core = Core::new(config, comp.clone(), canvas.clone(), script.clone()).unwrap();
        (core, comp, canvas, script)
    }

    #[test]
    fn keys_dispatch_to_bound_actions() {
        let (mut core, comp, _, _) = make_core();
        core.output_added(OUT, 800, 600);
        assert!(core.view_created(ViewId(1)));
        assert!(core.view_created(ViewId(2)));
        core.verify_invariants();

        assert!(core.key(Modifiers::SUPER, KEY_K, ButtonState::Pressed));
        assert_eq!(comp.focused(), Some(ViewId(1)));

        // Releases, wrong modifiers and unbound keys are not consumed.
        assert!(!core.key(Modifiers::SUPER, KEY_K, ButtonState::Released));
        assert!(!core.key(Modifiers::SHIFT, KEY_K, ButtonState::Pressed));
        assert!(!core.key(Modifiers::SUPER, Keysym(0xff0d), ButtonState::Pressed));

        assert!(core.key(Modifiers::SUPER, KEY_Q, ButtonState::Pressed));
        assert!(comp.state().terminated);
    }

    #[test]
    fn layout_mutations_fire_the_view_update_hook() {
        let (mut core, _, _, script) = make_core();
        core.output_added(OUT, 800, 600);
        let calls = script.state().widget_calls.len();
        assert!(calls > 0);

        core.view_created(ViewId(1));
        assert!(script.state().widget_calls.len() > calls);
        assert!(script
            .state()
            .widget_calls
            .iter()
            .all(|r| *r == ScriptRef(7)));
    }

    #[test]
    fn render_pre_blits_borders_and_the_bar() {
        let (mut core, _, canvas, _) = make_core();
        core.output_added(OUT, 800, 600);
        core.view_created(ViewId(1));

        // One leaf border buffer plus the bar front buffer.
        let blits = canvas.state().blits;
        core.render_pre(OUT);
        assert_eq!(canvas.state().blits - blits, 2);
    }

    #[test]
    fn pointer_clicks_focus_the_view_under_them() {
        let (mut core, comp, _, _) = make_core();
        core.output_added(OUT, 800, 600);
        core.view_created(ViewId(1));
        core.view_created(ViewId(2));

        core.pointer_button(Some(ViewId(1)), Point::new(10, 30), ButtonState::Pressed);
        assert_eq!(comp.focused(), Some(ViewId(1)));

        // Releases don't refocus.
        core.pointer_button(Some(ViewId(2)), Point::new(10, 30), ButtonState::Released);
        assert_eq!(comp.focused(), Some(ViewId(1)));
    }

    #[test]
    fn invalid_config_aborts_initialization() {
        let config = Config {
            tile_layouts: Vec::new(),
            ..Default::default()
        };
        let result = Core::new(
            config,
            TestCompositor::default(),
            TestCanvas::default(),
            TestScript::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn hook_threads_start_and_stop_cleanly() {
        let (mut core, _, _, script) = make_core();
        core.output_added(OUT, 800, 600);

        core.start_bar_hooks();
        core.shutdown();
        // The initial sweep fired every hook class at least once.
        assert!(!script.state().widget_calls.is_empty());
    }
}
