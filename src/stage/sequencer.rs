//! Stage sequencer.
//!
//! Holds the queue of steps and, on every sequencer tick, dispatches the
//! head step once every group is ready. A dead actuator discovered while
//! polling readiness halts the stage for good.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use heapless::FnvIndexMap;

use crate::diagnostics::{DiagnosticsSink, Level};
use crate::error::{Error, Result, StageError};
use crate::group::{ActuatorGroup, Command, GroupId};
use crate::scheduler::Ticker;

use super::builder::StageBuilder;
use super::pattern::load_pattern;
use super::recipe::{GridPos, PatternLibrary, Recipe};
use super::step::{Step, MAX_GROUPS};

/// Carriage coordinates of the cookie slots.
///
/// Slot `(gx, gy)` starts at `(x_shift + gx * x_spacing, y_shift + gy * y_spacing)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageLayout {
    /// X coordinate of slot (0, 0).
    pub x_shift: f64,
    /// Distance between columns.
    pub x_spacing: f64,
    /// Y coordinate of slot (0, 0).
    pub y_shift: f64,
    /// Distance between rows.
    pub y_spacing: f64,
}

impl StageLayout {
    /// Carriage offset for a slot.
    pub fn offset(&self, pos: GridPos) -> (f64, f64) {
        (
            self.x_shift + f64::from(pos.gx) * self.x_spacing,
            self.y_shift + f64::from(pos.gy) * self.y_spacing,
        )
    }
}

impl Default for StageLayout {
    fn default() -> Self {
        Self {
            x_shift: 0.0,
            x_spacing: 10.0,
            y_shift: 0.0,
            y_spacing: 10.0,
        }
    }
}

/// What a sequencer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The stage is not live.
    Halted,
    /// Nothing queued.
    Idle,
    /// Some group is still busy.
    Waiting,
    /// The head step went out to this many groups.
    Dispatched(usize),
}

pub(crate) struct StageCore {
    groups: FnvIndexMap<GroupId, Box<dyn ActuatorGroup>, MAX_GROUPS>,
    steps: VecDeque<Step>,
    live: bool,
    layout: StageLayout,
    patterns: PatternLibrary,
    loaded: usize,
    dispatched: usize,
    sink: Arc<dyn DiagnosticsSink>,
}

impl StageCore {
    pub(crate) fn new(
        groups: FnvIndexMap<GroupId, Box<dyn ActuatorGroup>, MAX_GROUPS>,
        layout: StageLayout,
        patterns: PatternLibrary,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            groups,
            steps: VecDeque::new(),
            live: true,
            layout,
            patterns,
            loaded: 0,
            dispatched: 0,
            sink,
        }
    }

    fn tick(&mut self) -> TickOutcome {
        if !self.live {
            return TickOutcome::Halted;
        }
        if self.steps.is_empty() {
            return TickOutcome::Idle;
        }

        match self.all_ready() {
            Ok(true) => {}
            Ok(false) => return TickOutcome::Waiting,
            Err(error) => {
                self.halt(&error);
                return TickOutcome::Halted;
            }
        }

        let Some(step) = self.steps.pop_front() else {
            return TickOutcome::Idle;
        };

        match self.dispatch(&step) {
            Ok(()) => {
                self.dispatched += 1;
                self.sink.record(
                    Level::Debug,
                    &format!("dispatched step {} of {}", self.dispatched, self.loaded),
                );
                TickOutcome::Dispatched(step.len())
            }
            Err(error) => {
                self.halt(&error);
                TickOutcome::Halted
            }
        }
    }

    /// Pause every listed group, send to each, then unpause them together.
    ///
    /// When a send fails the listed groups are killed instead of unpaused,
    /// so a group that already accepted its part of the step never runs it.
    fn dispatch(&mut self, step: &Step) -> Result<()> {
        for group in step.groups() {
            if let Some(g) = self.groups.get(&group) {
                g.pause();
            }
        }

        let mut outcome = Ok(());
        for (group, command) in step.iter() {
            outcome = self.send(group, command);
            if outcome.is_err() {
                break;
            }
        }

        for group in step.groups() {
            if let Some(g) = self.groups.get(&group) {
                if outcome.is_ok() {
                    g.unpause();
                } else {
                    g.kill();
                }
            }
        }
        outcome
    }

    fn send(&mut self, group: GroupId, command: &Command) -> Result<()> {
        match self.groups.get_mut(&group) {
            Some(g) => g.send(command),
            None => Err(Error::Stage(StageError::MissingGroup(group.id()))),
        }
    }

    fn all_ready(&self) -> Result<bool> {
        let mut ready = true;
        for (_, group) in self.groups.iter() {
            ready &= group.ready()?;
        }
        Ok(ready)
    }

    fn halt(&mut self, error: &Error) {
        self.live = false;
        self.sink.record(
            Level::Error,
            &format!("{}; stage is no longer live", error),
        );
    }

    fn ensure_live(&self) -> Result<()> {
        if self.live {
            Ok(())
        } else {
            Err(Error::Stage(StageError::NotLive))
        }
    }

    fn check_groups(&self, step: &Step) -> Result<()> {
        match step.groups().find(|group| !self.groups.contains_key(group)) {
            Some(missing) => Err(Error::Stage(StageError::MissingGroup(missing.id()))),
            None => Ok(()),
        }
    }

    fn replace_steps(&mut self, steps: VecDeque<Step>) {
        self.loaded = steps.len();
        self.dispatched = 0;
        self.steps = steps;
    }

    fn recipe_steps(&self, recipe: &Recipe) -> Result<VecDeque<Step>> {
        let mut steps = VecDeque::new();

        steps.push_back(
            Step::new()
                .with(GroupId::Platform, Command::Switch(true))
                .with(GroupId::Nozzle, Command::Switch(false))
                .with(GroupId::Carriage, Command::Move { x: 0.0, y: 0.0 }),
        );

        for (pos, cookie) in recipe.iter() {
            let path = self.patterns.path(cookie.icing);
            let (dx, dy) = self.layout.offset(pos);
            for frame in load_pattern(&path)? {
                steps.push_back(frame.offset(dx, dy));
            }
        }

        steps.push_back(
            Step::new()
                .with(GroupId::Platform, Command::Switch(false))
                .with(GroupId::Nozzle, Command::Switch(false))
                .with(GroupId::Carriage, Command::Move { x: 0.0, y: 0.0 }),
        );

        for step in &steps {
            self.check_groups(step)?;
        }
        Ok(steps)
    }

    fn recipe_done(&self) -> bool {
        self.steps.is_empty() && matches!(self.all_ready(), Ok(true))
    }

    fn set_paused(&self, paused: bool) {
        for (_, group) in self.groups.iter() {
            if paused {
                group.pause();
            } else {
                group.unpause();
            }
        }
    }
}

fn lock(core: &Mutex<StageCore>) -> MutexGuard<'_, StageCore> {
    match core.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            let mut guard = poisoned.into_inner();
            if guard.live {
                guard.live = false;
                guard
                    .sink
                    .record(Level::Error, "sequencer tick panicked; stage is no longer live");
            }
            guard
        }
    }
}

/// The icing stage: groups, a step queue and the sequencer ticker.
///
/// The sequencer ticker is created stopped; call [`start`](Self::start)
/// to run a loaded recipe, or drive it by hand with [`tick`](Self::tick).
///
/// # Example
///
/// ```rust,ignore
/// let config = load_config("stage.toml")?;
/// let stage = Stage::from_config(&config, |_| Box::new(SimulatedDriver::new()), default_sink())?;
///
/// let mut recipe = Recipe::new();
/// recipe.add_cookie(CookieSpec::new(Pattern::Square), (0, 0));
/// stage.load_recipe(&recipe)?;
/// stage.start();
///
/// while stage.is_live() && !stage.recipe_done() {
///     std::thread::sleep(Duration::from_millis(100));
/// }
/// stage.shutdown();
/// ```
pub struct Stage {
    core: Arc<Mutex<StageCore>>,
    ticker: Ticker,
    sink: Arc<dyn DiagnosticsSink>,
}

impl Stage {
    /// Start building a stage.
    pub fn builder() -> StageBuilder {
        StageBuilder::new()
    }

    pub(crate) fn spawn(
        core: StageCore,
        interval: std::time::Duration,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self> {
        let core = Arc::new(Mutex::new(core));
        let tick_core = Arc::clone(&core);
        let ticker = Ticker::spawn("stage", interval, false, move || {
            lock(&tick_core).tick();
        })?;

        Ok(Self { core, ticker, sink })
    }

    fn core(&self) -> MutexGuard<'_, StageCore> {
        lock(&self.core)
    }

    /// Run one sequencer evaluation on the calling thread.
    pub fn tick(&self) -> TickOutcome {
        self.core().tick()
    }

    /// Replace the queue with the steps for `recipe`.
    ///
    /// The queue becomes: a prep step (platform up, nozzle off, carriage to
    /// origin), every cookie's pattern frames shifted to its slot, and a
    /// finish step (platform down, nozzle off, carriage to origin).
    ///
    /// Returns the number of steps queued.
    ///
    /// # Errors
    ///
    /// - `StageError::NotLive` if the stage has halted
    /// - `RecipeError` if a pattern file is missing or malformed; the queue
    ///   is left as it was
    pub fn load_recipe(&self, recipe: &Recipe) -> Result<usize> {
        let mut core = self.core();
        core.ensure_live()?;

        let steps = core.recipe_steps(recipe)?;
        let count = steps.len();
        core.replace_steps(steps);
        core.sink.record(
            Level::Info,
            &format!("loaded recipe with {} cookies as {} steps", recipe.len(), count),
        );
        Ok(count)
    }

    /// Append one step to the queue.
    ///
    /// # Errors
    ///
    /// `StageError::NotLive` if the stage has halted, `StageError::MissingGroup`
    /// if the step names a group the stage does not have.
    pub fn enqueue(&self, step: Step) -> Result<()> {
        let mut core = self.core();
        core.ensure_live()?;
        core.check_groups(&step)?;
        core.steps.push_back(step);
        core.loaded += 1;
        Ok(())
    }

    /// Run the sequencer and unpause every group.
    pub fn start(&self) {
        {
            let core = self.core();
            if !core.live {
                return;
            }
            core.set_paused(false);
        }
        self.sink.record(Level::Info, "starting stage");
        self.ticker.restart();
    }

    /// Stop the sequencer and pause every group. The queue is kept.
    pub fn stop(&self) {
        self.ticker.stop();
        self.core().set_paused(true);
        self.sink.record(Level::Info, "stopping stage");
    }

    /// Whether the sequencer ticker is running.
    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Drop every queued step.
    pub fn clear_steps(&self) {
        let mut core = self.core();
        core.replace_steps(VecDeque::new());
    }

    /// Halt for good: clear the queue and kill every actuator.
    ///
    /// Idempotent. A stage cannot be revived after shutdown.
    pub fn shutdown(&self) {
        self.ticker.shutdown();

        let mut core = self.core();
        core.live = false;
        core.steps.clear();
        for (_, group) in core.groups.iter() {
            group.kill();
        }
        core.sink.record(Level::Info, "stage shut down");
    }

    /// Whether the stage can still dispatch steps.
    pub fn is_live(&self) -> bool {
        self.core().live
    }

    /// Whether the queue is empty and every group is ready.
    pub fn recipe_done(&self) -> bool {
        self.core().recipe_done()
    }

    /// Steps still queued.
    pub fn steps_remaining(&self) -> usize {
        self.core().steps.len()
    }

    /// Steps queued since the last load or clear.
    pub fn steps_loaded(&self) -> usize {
        self.core().loaded
    }

    /// Fraction of the loaded steps already dispatched; 1.0 when nothing is loaded.
    pub fn progress(&self) -> f64 {
        let core = self.core();
        if core.loaded == 0 {
            1.0
        } else {
            core.dispatched as f64 / core.loaded as f64
        }
    }

    /// The queued steps, head first.
    pub fn steps(&self) -> Vec<Step> {
        self.core().steps.iter().cloned().collect()
    }

    /// Groups installed on this stage.
    pub fn groups(&self) -> Vec<GroupId> {
        self.core().groups.keys().copied().collect()
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::error::ExecutionError;
    use crate::stage::{CookieSpec, Pattern};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records what it was sent; readiness and death are set from the test.
    struct MockGroup {
        name: &'static str,
        log: Arc<Mutex<Vec<(String, Command)>>>,
        ready: Arc<AtomicBool>,
        dead: Arc<AtomicBool>,
        fail_send: bool,
    }

    impl ActuatorGroup for MockGroup {
        fn name(&self) -> &str {
            self.name
        }

        fn send(&mut self, command: &Command) -> Result<()> {
            if self.fail_send {
                return Err(crate::error::CommandError::WrongCommand {
                    group: crate::error::bounded(self.name),
                    expected: "nothing",
                }
                .into());
            }
            self.log.lock().unwrap().push((format!("send {}", self.name), *command));
            Ok(())
        }

        fn ready(&self) -> Result<bool> {
            if self.dead.load(Ordering::SeqCst) {
                return Err(ExecutionError::ActuatorDead(crate::error::bounded(self.name)).into());
            }
            Ok(self.ready.load(Ordering::SeqCst))
        }

        fn pause(&self) {
            self.log
                .lock()
                .unwrap()
                .push((format!("pause {}", self.name), Command::Switch(false)));
        }

        fn unpause(&self) {
            self.log
                .lock()
                .unwrap()
                .push((format!("unpause {}", self.name), Command::Switch(false)));
        }

        fn kill(&self) {
            self.dead.store(true, Ordering::SeqCst);
            self.log
                .lock()
                .unwrap()
                .push((format!("kill {}", self.name), Command::Switch(false)));
        }
    }

    struct Harness {
        stage: Stage,
        log: Arc<Mutex<Vec<(String, Command)>>>,
        ready: Arc<AtomicBool>,
        dead: Arc<AtomicBool>,
        sink: Arc<MemorySink>,
    }

    fn harness(fail_nozzle: bool) -> Harness {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ready = Arc::new(AtomicBool::new(true));
        let dead = Arc::new(AtomicBool::new(false));
        let sink = Arc::new(MemorySink::new());

        let mut builder = Stage::builder().sink(sink.clone());
        for (id, name) in [
            (GroupId::Carriage, "carriage"),
            (GroupId::Platform, "platform"),
            (GroupId::Nozzle, "nozzle"),
        ] {
            builder = builder.group(
                id,
                MockGroup {
                    name,
                    log: Arc::clone(&log),
                    ready: Arc::clone(&ready),
                    // Only the carriage can die in these tests
                    dead: if id == GroupId::Carriage {
                        Arc::clone(&dead)
                    } else {
                        Arc::new(AtomicBool::new(false))
                    },
                    fail_send: fail_nozzle && id == GroupId::Nozzle,
                },
            );
        }

        Harness {
            stage: builder.build().unwrap(),
            log,
            ready,
            dead,
            sink,
        }
    }

    fn names(log: &Arc<Mutex<Vec<(String, Command)>>>) -> Vec<String> {
        log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    #[test]
    fn test_empty_queue_is_idle() {
        let h = harness(false);
        assert_eq!(h.stage.tick(), TickOutcome::Idle);
        assert!(h.stage.recipe_done());
        assert_eq!(h.stage.progress(), 1.0);
    }

    #[test]
    fn test_dispatch_pauses_sends_then_unpauses() {
        let h = harness(false);
        h.stage
            .enqueue(
                Step::new()
                    .with(GroupId::Carriage, Command::Move { x: 1.0, y: 2.0 })
                    .with(GroupId::Nozzle, Command::Switch(true)),
            )
            .unwrap();

        assert_eq!(h.stage.tick(), TickOutcome::Dispatched(2));
        assert_eq!(
            names(&h.log),
            vec![
                "pause carriage",
                "pause nozzle",
                "send carriage",
                "send nozzle",
                "unpause carriage",
                "unpause nozzle",
            ]
        );
        assert_eq!(h.stage.progress(), 1.0);
    }

    #[test]
    fn test_waits_for_every_group() {
        let h = harness(false);
        h.stage
            .enqueue(Step::new().with(GroupId::Nozzle, Command::Switch(true)))
            .unwrap();
        h.ready.store(false, Ordering::SeqCst);

        assert_eq!(h.stage.tick(), TickOutcome::Waiting);
        assert_eq!(h.stage.steps_remaining(), 1);
        assert!(!h.stage.recipe_done());

        h.ready.store(true, Ordering::SeqCst);
        assert_eq!(h.stage.tick(), TickOutcome::Dispatched(1));
    }

    #[test]
    fn test_dead_group_halts_stage() {
        let h = harness(false);
        for _ in 0..3 {
            h.stage
                .enqueue(Step::new().with(GroupId::Platform, Command::Switch(true)))
                .unwrap();
        }
        assert_eq!(h.stage.tick(), TickOutcome::Dispatched(1));

        h.dead.store(true, Ordering::SeqCst);
        assert_eq!(h.stage.tick(), TickOutcome::Halted);
        assert!(!h.stage.is_live());

        // Even with the fault gone nothing more is dispatched
        h.dead.store(false, Ordering::SeqCst);
        assert_eq!(h.stage.tick(), TickOutcome::Halted);
        assert_eq!(h.stage.steps_remaining(), 2);
        assert!(h.sink.contains(Level::Error, "stage is no longer live"));

        assert!(matches!(
            h.stage.load_recipe(&Recipe::new()),
            Err(Error::Stage(StageError::NotLive))
        ));
    }

    #[test]
    fn test_send_failure_kills_listed_groups() {
        let h = harness(true);
        h.stage
            .enqueue(
                Step::new()
                    .with(GroupId::Carriage, Command::Move { x: 0.0, y: 0.0 })
                    .with(GroupId::Nozzle, Command::Switch(true)),
            )
            .unwrap();

        assert_eq!(h.stage.tick(), TickOutcome::Halted);
        assert!(!h.stage.is_live());

        // The carriage accepted its move but must never run it
        let log = names(&h.log);
        assert!(log.ends_with(&["kill carriage".to_owned(), "kill nozzle".to_owned()]));
        assert!(!log.iter().any(|entry| entry.starts_with("unpause")));
        assert!(!log.contains(&"kill platform".to_owned()));
        assert!(h.dead.load(Ordering::SeqCst));
    }

    #[test]
    fn test_empty_recipe_is_prep_and_finish() {
        let h = harness(false);
        assert_eq!(h.stage.load_recipe(&Recipe::new()).unwrap(), 2);

        let steps = h.stage.steps();
        assert_eq!(steps[0].get(GroupId::Platform), Some(&Command::Switch(true)));
        assert_eq!(steps[1].get(GroupId::Platform), Some(&Command::Switch(false)));
        assert_eq!(steps[1].get(GroupId::Carriage), Some(&Command::Move { x: 0.0, y: 0.0 }));
    }

    #[test]
    fn test_missing_pattern_keeps_queue() {
        let h = harness(false);
        h.stage
            .enqueue(Step::new().with(GroupId::Nozzle, Command::Switch(true)))
            .unwrap();

        let mut recipe = Recipe::new();
        recipe.add_cookie(CookieSpec::new(Pattern::Square), (0, 0));
        // Default pattern dir does not exist here
        assert!(matches!(
            h.stage.load_recipe(&recipe),
            Err(Error::Recipe(crate::error::RecipeError::Io { .. }))
        ));
        assert_eq!(h.stage.steps_remaining(), 1);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let h = harness(false);
        h.stage
            .enqueue(Step::new().with(GroupId::Nozzle, Command::Switch(true)))
            .unwrap();

        h.stage.shutdown();
        h.stage.shutdown();
        assert!(!h.stage.is_live());
        assert_eq!(h.stage.steps_remaining(), 0);
        assert!(h.dead.load(Ordering::SeqCst));

        h.stage.start();
        assert!(!h.stage.is_running());
        assert!(h.stage.enqueue(Step::new()).is_err());
    }

    #[test]
    fn test_clear_steps() {
        let h = harness(false);
        h.stage.load_recipe(&Recipe::new()).unwrap();
        h.stage.clear_steps();
        assert_eq!(h.stage.steps_remaining(), 0);
        assert_eq!(h.stage.steps_loaded(), 0);
        assert!(h.stage.is_live());
    }

    #[test]
    fn test_layout_offset() {
        let layout = StageLayout {
            x_shift: 1.0,
            x_spacing: 4.0,
            y_shift: -2.0,
            y_spacing: 3.0,
        };
        assert_eq!(layout.offset(GridPos::new(2, 1)), (9.0, 1.0));
    }
}
