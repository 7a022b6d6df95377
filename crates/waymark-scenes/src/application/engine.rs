//! The scene engine: one explicit handle owning the registry, the progress
//! store and the active run.
//!
//! All mutation goes through `&mut SceneEngine`, so there is exactly one
//! logical context touching progress and interpreter state. Host adapters
//! (presenter, command handler, progress gateway, anchor registry) are
//! injected through [`EngineDependencies`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;
use waymark_anchors::AnchorRegistry;
use waymark_core::clock::Clock;
use waymark_core::command::CommandHandler;
use waymark_core::error::DomainError;
use waymark_core::event::EventMetadata;
use waymark_core::gateway::ProgressGateway;
use waymark_core::progress::{Namespace, RuntimeProgress};

use super::matcher::{eligible_scenes, select_scene};
use super::registry::SceneRegistry;
use crate::domain::events::{
    CommandDispatched, CommandFailed, FlagChanged, ProgressChanged, SceneEnded, SceneEvent,
    SceneEventKind, SceneStarted,
};
use crate::domain::execution::{EndReason, ExternalWait, RunTicket, RunnerState};
use crate::domain::interpreter::{Effect, SceneRun};
use crate::domain::scene::SceneDefinition;
use crate::domain::snapshot::{PresentationSnapshot, Presenter};
use crate::domain::trigger::TriggerEvent;

/// Host adapters the engine talks to.
#[derive(Clone)]
pub struct EngineDependencies {
    /// Where progress is loaded from and saved to.
    pub gateway: Arc<dyn ProgressGateway>,
    /// Time source for `lastSeenAt` and event metadata.
    pub clock: Arc<dyn Clock>,
    /// Executes navigation, battle and reward commands.
    pub commands: Arc<dyn CommandHandler>,
    /// Renders presentation snapshots.
    pub presenter: Arc<dyn Presenter>,
    /// Measures highlight anchors.
    pub anchors: AnchorRegistry,
}

/// The scene engine handle.
pub struct SceneEngine {
    deps: EngineDependencies,
    registry: SceneRegistry,
    progress: RuntimeProgress,
    namespace: Namespace,
    dirty: bool,
    run: Option<SceneRun>,
    pending_geometry: Vec<(RunTicket, String)>,
    uncommitted_events: Vec<SceneEvent>,
    sequence: i64,
    session_id: Uuid,
}

impl SceneEngine {
    /// Creates an engine with empty progress in the anonymous namespace.
    #[must_use]
    pub fn new(deps: EngineDependencies) -> Self {
        Self {
            deps,
            registry: SceneRegistry::new(),
            progress: RuntimeProgress::default(),
            namespace: Namespace::anonymous(),
            dirty: false,
            run: None,
            pending_geometry: Vec::new(),
            uncommitted_events: Vec::new(),
            sequence: 0,
            session_id: Uuid::new_v4(),
        }
    }

    // --- Persistence ---

    /// Switches to `namespace` and loads its progress. The active scene, if
    /// any, is interrupted first. Missing or unreadable records start empty.
    pub async fn load(&mut self, namespace: Namespace) {
        self.stop();
        self.progress = match self.deps.gateway.load(&namespace).await {
            Ok(Some(progress)) => progress,
            Ok(None) => RuntimeProgress::default(),
            Err(error) => {
                warn!(%namespace, %error, "progress load failed, starting empty");
                RuntimeProgress::default()
            }
        };
        info!(
            %namespace,
            completed = self.progress.completed_scenes.len(),
            "progress loaded"
        );
        self.namespace = namespace;
        self.dirty = false;
    }

    /// Saves progress if anything changed since the last successful save.
    /// Returns `false` if a save was attempted and failed; the changes stay
    /// pending and the next flush retries them.
    pub async fn flush(&mut self) -> bool {
        if !self.dirty {
            return true;
        }
        match self.deps.gateway.save(&self.namespace, &self.progress).await {
            Ok(()) => {
                debug!(namespace = %self.namespace, "progress saved");
                self.dirty = false;
                true
            }
            Err(error) => {
                warn!(namespace = %self.namespace, %error, "progress save failed, keeping in memory");
                false
            }
        }
    }

    /// Measures anchors requested by highlight steps and hands the geometry
    /// to the run that asked for it. Results for a run that has since moved
    /// on are dropped.
    pub async fn resolve_geometry(&mut self) {
        for (ticket, anchor_id) in std::mem::take(&mut self.pending_geometry) {
            let rect = self.deps.anchors.get_rect(&anchor_id).await;
            if rect.is_none() {
                debug!(%anchor_id, "highlight anchor not measurable");
            }
            let Some(run) = self.run.as_mut() else {
                continue;
            };
            if run.run_id() != ticket.run_id {
                continue;
            }
            if let Some(snapshot) = run.apply_geometry(ticket, rect) {
                self.deps.presenter.present(&snapshot);
            }
        }
    }

    /// Resolves pending geometry, then flushes progress. Returns the flush
    /// result.
    pub async fn settle(&mut self) -> bool {
        self.resolve_geometry().await;
        self.flush().await
    }

    // --- Scene registration ---

    /// Registers or replaces a scene. A running scene keeps executing the
    /// definition it started with. Returns `true` if a scene was replaced.
    pub fn register_scene(&mut self, scene: SceneDefinition) -> bool {
        debug!(scene_id = %scene.id, priority = scene.priority, "scene registered");
        self.registry.upsert(scene)
    }

    /// Removes a scene. A running instance of it keeps executing. Returns
    /// `true` if the scene was registered.
    pub fn unregister_scene(&mut self, scene_id: &str) -> bool {
        self.registry.remove(scene_id)
    }

    /// The registered scenes.
    #[must_use]
    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    /// The anchor registry highlight steps measure against.
    #[must_use]
    pub fn anchors(&self) -> &AnchorRegistry {
        &self.deps.anchors
    }

    // --- Starting and stopping ---

    /// Evaluates `event` and starts the best eligible scene, interrupting
    /// the active one first. Returns the id of the started scene.
    pub fn check_triggers(&mut self, event: &TriggerEvent) -> Option<String> {
        let selected = select_scene(
            &self.registry,
            event,
            &self.progress,
            self.active_scene_id(),
        );
        let Some(scene) = selected else {
            debug!(event = event.kind(), "no scene eligible");
            return None;
        };
        let scene_id = scene.id.clone();
        debug!(event = event.kind(), %scene_id, "trigger matched");
        self.begin(scene);
        Some(scene_id)
    }

    /// Lists the ids of the scenes `event` would start, best first, without
    /// starting anything.
    #[must_use]
    pub fn peek_triggers(&self, event: &TriggerEvent) -> Vec<String> {
        eligible_scenes(&self.registry, event, &self.progress, self.active_scene_id())
            .iter()
            .map(|scene| scene.id.clone())
            .collect()
    }

    /// Starts a registered scene directly, bypassing triggers, conditions
    /// and completion.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SceneNotFound` if no scene has that id.
    pub fn start_scene(&mut self, scene_id: &str) -> Result<(), DomainError> {
        let scene = self
            .registry
            .get(scene_id)
            .cloned()
            .ok_or_else(|| DomainError::SceneNotFound(scene_id.to_owned()))?;
        self.begin(scene);
        Ok(())
    }

    /// Interrupts the active scene. Returns `false` if none was active.
    pub fn stop(&mut self) -> bool {
        let effects = match self.run.as_mut() {
            Some(run) if run.state().is_active() => run.interrupt(&self.progress),
            _ => return false,
        };
        self.apply(effects);
        true
    }

    fn begin(&mut self, scene: Arc<SceneDefinition>) {
        self.stop();
        let mut run = SceneRun::start(scene, &self.progress);
        let scene_id = run.scene_id().to_owned();
        let run_id = run.run_id();
        info!(%scene_id, %run_id, version = run.scene().version, "scene started");
        self.progress.touch(&scene_id, self.deps.clock.now_millis());
        self.dirty = true;
        self.record(
            run_id,
            SceneEventKind::SceneStarted(SceneStarted {
                scene_id,
                version: run.scene().version,
                run_id,
            }),
        );
        let effects = run.advance(&mut self.progress);
        self.run = Some(run);
        self.apply(effects);
    }

    // --- Resuming ---

    /// Selects an option of the pending choice.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no choice is pending or the
    /// index is out of range.
    pub fn choose(&mut self, option: usize) -> Result<(), DomainError> {
        let run = self
            .run
            .as_mut()
            .ok_or_else(|| DomainError::Validation("no scene is active".to_owned()))?;
        let effects = run.choose(option, &mut self.progress)?;
        self.apply(effects);
        Ok(())
    }

    /// Acknowledges the pending dialogue line or masked highlight. Returns
    /// `false` if nothing awaited an acknowledgement.
    pub fn acknowledge(&mut self) -> bool {
        let Some(effects) = self
            .run
            .as_mut()
            .and_then(|run| run.acknowledge(&mut self.progress))
        else {
            return false;
        };
        self.apply(effects);
        true
    }

    /// Resumes a `wait` step. Returns `false` for a stale ticket.
    pub fn resume_wait(&mut self, ticket: RunTicket) -> bool {
        let Some(effects) = self
            .run
            .as_mut()
            .and_then(|run| run.resume_timer(ticket, &mut self.progress))
        else {
            debug!(run_id = %ticket.run_id, step = ticket.step_index, "stale wait resume ignored");
            return false;
        };
        self.apply(effects);
        true
    }

    /// The timer the host should arm for the current `wait` step.
    #[must_use]
    pub fn pending_timer(&self) -> Option<(RunTicket, Duration)> {
        let run = self.run.as_ref()?;
        match run.state() {
            RunnerState::WaitingForExternal {
                wait: ExternalWait::Timer { ms },
            } => Some((run.current_ticket()?, Duration::from_millis(*ms))),
            _ => None,
        }
    }

    // --- Progress ---

    /// Writes a flag, then resumes a `waitForFlag` step it satisfies.
    pub fn set_flag(&mut self, flag: &str, value: bool) {
        let old = self.progress.set_flag(flag, value);
        self.dirty = true;
        let correlation_id = self.correlation_id();
        self.record(
            correlation_id,
            SceneEventKind::FlagChanged(FlagChanged {
                flag: flag.to_owned(),
                old,
                new: value,
            }),
        );
        if let Some(effects) = self
            .run
            .as_mut()
            .and_then(|run| run.notify_flag(&mut self.progress))
        {
            self.apply(effects);
        }
    }

    /// Writes a progress counter.
    pub fn set_progress(&mut self, key: &str, value: i64) {
        let old = self.progress.set_counter(key, value);
        self.dirty = true;
        let correlation_id = self.correlation_id();
        self.record(
            correlation_id,
            SceneEventKind::ProgressChanged(ProgressChanged {
                key: key.to_owned(),
                old,
                new: value,
            }),
        );
    }

    // --- Queries ---

    /// The in-memory progress store, always current.
    #[must_use]
    pub fn progress(&self) -> &RuntimeProgress {
        &self.progress
    }

    /// The namespace progress is saved under.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns whether progress has unsaved changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The state of the current or most recent run.
    #[must_use]
    pub fn state(&self) -> RunnerState {
        self.run
            .as_ref()
            .map_or(RunnerState::Idle, |run| run.state().clone())
    }

    /// The presentation state of the current or most recent run.
    #[must_use]
    pub fn snapshot(&self) -> PresentationSnapshot {
        self.run
            .as_ref()
            .map(|run| run.snapshot().clone())
            .unwrap_or_default()
    }

    /// The id of the running or suspended scene.
    #[must_use]
    pub fn active_scene_id(&self) -> Option<&str> {
        self.run
            .as_ref()
            .filter(|run| run.state().is_active())
            .map(SceneRun::scene_id)
    }

    /// The ticket identifying the current suspension.
    #[must_use]
    pub fn current_ticket(&self) -> Option<RunTicket> {
        self.run.as_ref().and_then(SceneRun::current_ticket)
    }

    /// Drains the recorded domain events.
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }

    // --- Internals ---

    fn correlation_id(&self) -> Uuid {
        self.run
            .as_ref()
            .filter(|run| run.state().is_active())
            .map_or(self.session_id, SceneRun::run_id)
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        let Some((scene_id, run_id)) = self
            .run
            .as_ref()
            .map(|run| (run.scene_id().to_owned(), run.run_id()))
        else {
            return;
        };
        for effect in effects {
            match effect {
                Effect::FlagChanged { flag, old, new } => {
                    self.dirty = true;
                    self.record(
                        run_id,
                        SceneEventKind::FlagChanged(FlagChanged { flag, old, new }),
                    );
                }
                Effect::ProgressChanged { key, old, new } => {
                    self.dirty = true;
                    self.record(
                        run_id,
                        SceneEventKind::ProgressChanged(ProgressChanged { key, old, new }),
                    );
                }
                Effect::Dispatch(command) => match self.deps.commands.dispatch(&command) {
                    Ok(()) => {
                        debug!(%scene_id, command = command.command_type(), "host command dispatched");
                        self.record(
                            run_id,
                            SceneEventKind::CommandDispatched(CommandDispatched {
                                scene_id: scene_id.clone(),
                                command,
                            }),
                        );
                    }
                    Err(error) => {
                        warn!(%scene_id, command = command.command_type(), %error, "host command failed");
                        self.record(
                            run_id,
                            SceneEventKind::CommandFailed(CommandFailed {
                                scene_id: scene_id.clone(),
                                command,
                                error: error.to_string(),
                            }),
                        );
                    }
                },
                Effect::MeasureAnchor { ticket, anchor_id } => {
                    self.pending_geometry.push((ticket, anchor_id));
                }
                Effect::Present(snapshot) => self.deps.presenter.present(&snapshot),
                Effect::Ended {
                    reason,
                    diagnostic,
                    changed_flags,
                    changed_progress,
                } => {
                    self.pending_geometry
                        .retain(|(ticket, _)| ticket.run_id != run_id);
                    if reason == EndReason::Completed {
                        self.progress
                            .mark_completed(&scene_id, self.deps.clock.now_millis());
                        self.dirty = true;
                    }
                    info!(%scene_id, %run_id, ?reason, "scene ended");
                    self.record(
                        run_id,
                        SceneEventKind::SceneEnded(SceneEnded {
                            scene_id: scene_id.clone(),
                            run_id,
                            reason,
                            diagnostic,
                            changed_flags,
                            changed_progress,
                        }),
                    );
                }
            }
        }
    }

    fn record(&mut self, correlation_id: Uuid, kind: SceneEventKind) {
        self.sequence += 1;
        self.uncommitted_events.push(SceneEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                correlation_id,
                sequence_number: self.sequence,
                occurred_at: self.deps.clock.now(),
            },
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use waymark_core::command::HostCommand;
    use waymark_core::geometry::Rect;
    use waymark_core::progress::Namespace;
    use waymark_test_support::{
        EmptyGateway, FailingCommandHandler, FailingGateway, FixedClock, RecordingCommandHandler,
        RecordingGateway, ScriptedMeasure, fixed_now,
    };

    use super::*;
    use crate::domain::step::{Dialogue, Step};
    use crate::domain::trigger::Trigger;

    #[derive(Default)]
    struct RecordingPresenter {
        snapshots: Mutex<Vec<PresentationSnapshot>>,
    }

    impl RecordingPresenter {
        fn snapshots(&self) -> Vec<PresentationSnapshot> {
            self.snapshots.lock().unwrap().clone()
        }
    }

    impl Presenter for RecordingPresenter {
        fn present(&self, snapshot: &PresentationSnapshot) {
            self.snapshots.lock().unwrap().push(snapshot.clone());
        }
    }

    fn deps(gateway: Arc<dyn ProgressGateway>, commands: Arc<dyn CommandHandler>) -> EngineDependencies {
        EngineDependencies {
            gateway,
            clock: Arc::new(FixedClock::default()),
            commands,
            presenter: Arc::new(crate::domain::snapshot::NullPresenter),
            anchors: AnchorRegistry::new(),
        }
    }

    fn engine() -> SceneEngine {
        SceneEngine::new(deps(
            Arc::new(EmptyGateway),
            Arc::new(RecordingCommandHandler::new()),
        ))
    }

    fn say(text: &str) -> Step {
        Step::Say(Dialogue {
            speaker: Some("guide".to_owned()),
            text: text.to_owned(),
            portrait: None,
        })
    }

    fn on_screen(id: &str, screen: &str, priority: i32, steps: Vec<Step>) -> SceneDefinition {
        SceneDefinition::new(id, steps)
            .with_trigger(Trigger::EnterScreen {
                screen: screen.to_owned(),
            })
            .with_priority(priority)
    }

    fn entered(screen: &str) -> TriggerEvent {
        TriggerEvent::EnterScreen {
            screen: screen.to_owned(),
        }
    }

    fn event_types(events: &[SceneEvent]) -> Vec<&'static str> {
        events.iter().map(|event| event.kind.event_type()).collect()
    }

    #[test]
    fn test_completed_scene_is_never_restarted() {
        // Arrange
        let mut engine = engine();
        engine.register_scene(on_screen("home-intro", "home", 72, vec![Step::End]));

        // Act
        let first = engine.check_triggers(&entered("home"));
        let second = engine.check_triggers(&entered("home"));

        // Assert
        assert_eq!(first.as_deref(), Some("home-intro"));
        assert_eq!(second, None);
        assert!(engine.progress().is_completed("home-intro"));
        assert_eq!(
            engine.progress().last_seen_at.get("home-intro"),
            Some(&fixed_now().timestamp_millis())
        );
        assert!(engine.is_dirty());
    }

    #[test]
    fn test_higher_priority_scene_starts() {
        let mut engine = engine();
        engine.register_scene(on_screen("low", "home", 10, vec![say("low")]));
        engine.register_scene(on_screen("high", "home", 90, vec![say("high")]));

        let started = engine.check_triggers(&entered("home"));

        assert_eq!(started.as_deref(), Some("high"));
        assert_eq!(engine.active_scene_id(), Some("high"));
    }

    #[test]
    fn test_new_scene_interrupts_active_scene_first() {
        // Arrange
        let mut engine = engine();
        engine.register_scene(on_screen("a", "home", 0, vec![say("a")]));
        engine.register_scene(on_screen("b", "shop", 0, vec![say("b")]));
        engine.check_triggers(&entered("home"));
        engine.take_events();

        // Act
        engine.check_triggers(&entered("shop"));

        // Assert
        let events = engine.take_events();
        assert_eq!(
            event_types(&events),
            vec!["scenes.scene_ended", "scenes.scene_started"]
        );
        match &events[0].kind {
            SceneEventKind::SceneEnded(ended) => {
                assert_eq!(ended.scene_id, "a");
                assert_eq!(ended.reason, EndReason::Interrupted);
            }
            other => panic!("expected SceneEnded, got {other:?}"),
        }
        assert!(events[0].metadata.sequence_number < events[1].metadata.sequence_number);
        assert_eq!(engine.active_scene_id(), Some("b"));
        assert!(!engine.progress().is_completed("a"));
    }

    #[test]
    fn test_active_scene_does_not_restart_itself() {
        let mut engine = engine();
        engine.register_scene(on_screen("a", "home", 0, vec![say("a")]));
        engine.check_triggers(&entered("home"));
        let ticket = engine.current_ticket();

        assert_eq!(engine.check_triggers(&entered("home")), None);
        assert!(engine.peek_triggers(&entered("home")).is_empty());
        assert_eq!(engine.current_ticket(), ticket);
    }

    #[test]
    fn test_failing_command_handler_does_not_stop_scene() {
        // Arrange
        let commands = Arc::new(FailingCommandHandler::default());
        let mut engine = SceneEngine::new(deps(Arc::new(EmptyGateway), commands.clone()));
        engine.register_scene(on_screen(
            "reward",
            "home",
            0,
            vec![
                Step::TriggerReward {
                    kind: "pack".to_owned(),
                    payload: serde_json::json!({"tier": "gold"}),
                },
                Step::SetFlag {
                    flag: "rewarded".to_owned(),
                    value: true,
                },
                Step::End,
            ],
        ));

        // Act
        engine.check_triggers(&entered("home"));

        // Assert
        assert_eq!(commands.attempted().len(), 1);
        assert!(engine.progress().flag("rewarded"));
        assert!(engine.progress().is_completed("reward"));
        let events = engine.take_events();
        assert!(event_types(&events).contains(&"scenes.command_failed"));
    }

    #[test]
    fn test_successful_dispatch_is_recorded() {
        let commands = Arc::new(RecordingCommandHandler::new());
        let mut engine = SceneEngine::new(deps(Arc::new(EmptyGateway), commands.clone()));
        engine.register_scene(on_screen(
            "to-shop",
            "home",
            0,
            vec![Step::NavigateTo {
                screen: "shop".to_owned(),
                params: std::collections::BTreeMap::new(),
            }],
        ));

        engine.check_triggers(&entered("home"));

        assert_eq!(
            commands.dispatched(),
            vec![HostCommand::NavigateTo {
                screen: "shop".to_owned(),
                params: std::collections::BTreeMap::new(),
            }]
        );
        assert!(event_types(&engine.take_events()).contains(&"scenes.command_dispatched"));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_changes_pending() {
        // Arrange
        let gateway = Arc::new(FailingGateway::default());
        let mut engine = SceneEngine::new(deps(
            gateway.clone(),
            Arc::new(RecordingCommandHandler::new()),
        ));
        engine.set_flag("seen_shop", true);

        // Act
        let first = engine.flush().await;
        let second = engine.flush().await;

        // Assert
        assert!(!first);
        assert!(!second);
        assert_eq!(gateway.save_attempts(), 2);
        assert!(engine.is_dirty());
        assert!(engine.progress().flag("seen_shop"));
    }

    #[tokio::test]
    async fn test_flush_saves_once_until_changed_again() {
        let gateway = Arc::new(RecordingGateway::new(None));
        let mut engine = SceneEngine::new(deps(
            gateway.clone(),
            Arc::new(RecordingCommandHandler::new()),
        ));
        engine.load(Namespace::user("player-7")).await;
        engine.set_progress("water_realm_progress", 2);

        assert!(engine.flush().await);
        assert!(engine.flush().await);

        let saved = gateway.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, Namespace::user("player-7"));
        assert_eq!(saved[0].1.counter("water_realm_progress"), 2);
        assert!(!engine.is_dirty());
    }

    #[tokio::test]
    async fn test_load_failure_starts_empty() {
        let mut engine = SceneEngine::new(deps(
            Arc::new(FailingGateway::default()),
            Arc::new(RecordingCommandHandler::new()),
        ));
        engine.set_flag("stale", true);

        engine.load(Namespace::anonymous()).await;

        assert_eq!(engine.progress(), &RuntimeProgress::default());
        assert!(!engine.is_dirty());
    }

    #[tokio::test]
    async fn test_load_interrupts_active_scene() {
        let mut stored = RuntimeProgress::default();
        stored.mark_completed("home-intro", 1);
        let mut engine = SceneEngine::new(deps(
            Arc::new(RecordingGateway::new(Some(stored.clone()))),
            Arc::new(RecordingCommandHandler::new()),
        ));
        engine.register_scene(on_screen("a", "home", 0, vec![say("a")]));
        engine.check_triggers(&entered("home"));

        engine.load(Namespace::user("u1")).await;

        assert_eq!(engine.active_scene_id(), None);
        assert_eq!(engine.progress(), &stored);
    }

    #[test]
    fn test_set_flag_resumes_wait_for_flag() {
        let mut engine = engine();
        engine.register_scene(on_screen(
            "pack-tip",
            "shop",
            0,
            vec![
                Step::WaitForFlag {
                    flag: "opened_pack".to_owned(),
                    value: true,
                },
                say("nice pack"),
            ],
        ));
        engine.check_triggers(&entered("shop"));
        assert!(engine.snapshot().dialogue.is_none());

        engine.set_flag("opened_pack", true);

        assert_eq!(
            engine.snapshot().dialogue.map(|line| line.text),
            Some("nice pack".to_owned())
        );
    }

    #[test]
    fn test_choose_without_active_scene_is_rejected() {
        let mut engine = engine();

        assert!(matches!(engine.choose(0), Err(DomainError::Validation(_))));
        assert!(!engine.acknowledge());
        assert!(!engine.stop());
    }

    #[test]
    fn test_stale_wait_ticket_does_not_resume_newer_scene() {
        // Arrange
        let mut engine = engine();
        engine.register_scene(on_screen("a", "home", 0, vec![Step::Wait { ms: 300 }, Step::End]));
        engine.register_scene(on_screen("b", "shop", 0, vec![Step::Wait { ms: 300 }, Step::End]));
        engine.check_triggers(&entered("home"));
        let (stale, delay) = engine.pending_timer().unwrap();
        assert_eq!(delay, Duration::from_millis(300));
        engine.check_triggers(&entered("shop"));

        // Act
        let resumed = engine.resume_wait(stale);

        // Assert
        assert!(!resumed);
        assert_eq!(engine.active_scene_id(), Some("b"));
        let (current, _) = engine.pending_timer().unwrap();
        assert!(engine.resume_wait(current));
        assert!(engine.progress().is_completed("b"));
    }

    #[test]
    fn test_start_scene_unknown_id() {
        let mut engine = engine();

        assert!(matches!(
            engine.start_scene("nope"),
            Err(DomainError::SceneNotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_highlight_geometry_is_resolved_and_presented() {
        // Arrange
        let presenter = Arc::new(RecordingPresenter::default());
        let anchors = AnchorRegistry::new();
        let rect = Rect::new(4.0, 8.0, 120.0, 48.0);
        anchors.register("home.play", Arc::new(ScriptedMeasure::ready(rect)));
        let mut engine = SceneEngine::new(EngineDependencies {
            gateway: Arc::new(EmptyGateway),
            clock: Arc::new(FixedClock::default()),
            commands: Arc::new(RecordingCommandHandler::new()),
            presenter: presenter.clone(),
            anchors,
        });
        engine.register_scene(on_screen(
            "play-tip",
            "home",
            0,
            vec![Step::Highlight {
                anchor_id: "home.play".to_owned(),
                mask_input: true,
            }],
        ));
        engine.check_triggers(&entered("home"));
        let before = presenter.snapshots().len();

        // Act
        engine.settle().await;

        // Assert
        let snapshots = presenter.snapshots();
        assert_eq!(snapshots.len(), before + 1);
        let highlight = snapshots.last().unwrap().highlight.clone().unwrap();
        assert_eq!(highlight.rect, Some(rect));
        assert!(highlight.mask_input);
    }

    #[tokio::test]
    async fn test_geometry_for_interrupted_run_is_dropped() {
        let presenter = Arc::new(RecordingPresenter::default());
        let anchors = AnchorRegistry::new();
        anchors.register(
            "home.play",
            Arc::new(ScriptedMeasure::ready(Rect::new(0.0, 0.0, 10.0, 10.0))),
        );
        let mut engine = SceneEngine::new(EngineDependencies {
            gateway: Arc::new(EmptyGateway),
            clock: Arc::new(FixedClock::default()),
            commands: Arc::new(RecordingCommandHandler::new()),
            presenter: presenter.clone(),
            anchors,
        });
        engine.register_scene(on_screen(
            "play-tip",
            "home",
            0,
            vec![Step::Highlight {
                anchor_id: "home.play".to_owned(),
                mask_input: true,
            }],
        ));
        engine.check_triggers(&entered("home"));
        engine.stop();
        let before = presenter.snapshots().len();

        engine.resolve_geometry().await;

        assert_eq!(presenter.snapshots().len(), before);
    }

    #[test]
    fn test_ended_run_releases_pending_geometry() {
        // Arrange
        let mut engine = engine();
        engine.register_scene(on_screen(
            "play-tip",
            "home",
            0,
            vec![Step::Highlight {
                anchor_id: "home.play".to_owned(),
                mask_input: true,
            }],
        ));

        // Act
        for _ in 0..3 {
            engine.start_scene("play-tip").unwrap();
        }
        let while_running = engine.pending_geometry.len();
        engine.stop();

        // Assert
        assert_eq!(while_running, 1);
        assert!(engine.pending_geometry.is_empty());
    }
}
