//! The step interpreter.
//!
//! A [`SceneRun`] executes one scene's flat step list against the shared
//! progress store. It is synchronous and owns no clock, timer or I/O: every
//! side effect the host must perform is returned as an [`Effect`], in the
//! order it happened, for the engine to apply.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;
use waymark_core::command::HostCommand;
use waymark_core::error::DomainError;
use waymark_core::geometry::Rect;
use waymark_core::progress::RuntimeProgress;

use super::execution::{EndReason, ExternalWait, RunTicket, RunnerState};
use super::scene::SceneDefinition;
use super::snapshot::{ChoicePrompt, HighlightTarget, HintView, PortraitView, PresentationSnapshot};
use super::step::Step;

/// Steps one `advance` may execute without reaching a suspension point.
/// Exceeding it means the script loops on itself.
pub const STEP_BUDGET: usize = 10_000;

/// A side effect produced while executing steps.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A flag was written.
    FlagChanged {
        /// Flag name.
        flag: String,
        /// Previous value.
        old: bool,
        /// New value.
        new: bool,
    },
    /// A counter was written.
    ProgressChanged {
        /// Counter name.
        key: String,
        /// Previous value.
        old: i64,
        /// New value.
        new: i64,
    },
    /// A command for the host.
    Dispatch(HostCommand),
    /// Anchor geometry to measure; hand the result back through
    /// [`SceneRun::apply_geometry`] with the same ticket.
    MeasureAnchor {
        /// The highlight step awaiting geometry.
        ticket: RunTicket,
        /// Anchor to measure.
        anchor_id: String,
    },
    /// The presentation state changed.
    Present(PresentationSnapshot),
    /// The run ended.
    Ended {
        /// How it ended.
        reason: EndReason,
        /// Authoring diagnostic for aborted runs.
        diagnostic: Option<String>,
        /// Flags whose value differs from the start of the run.
        changed_flags: BTreeMap<String, bool>,
        /// Counters whose value differs from the start of the run.
        changed_progress: BTreeMap<String, i64>,
    },
}

enum Flow<'s> {
    Next,
    Jump(&'s str),
    Suspend(RunnerState),
    Finish,
    Abort(String),
}

/// One execution of one scene.
#[derive(Debug)]
pub struct SceneRun {
    scene: Arc<SceneDefinition>,
    run_id: Uuid,
    index: usize,
    labels: HashMap<String, usize>,
    start_flags: BTreeMap<String, bool>,
    start_progress: BTreeMap<String, i64>,
    state: RunnerState,
    snapshot: PresentationSnapshot,
    presented: Option<PresentationSnapshot>,
    highlight_ticket: Option<RunTicket>,
    tickets_issued: u64,
}

impl SceneRun {
    /// Prepares a run: builds the label table, snapshots flags and counters, enters
    /// `Running` at step 0. No step executes until [`SceneRun::advance`].
    #[must_use]
    pub fn start(scene: Arc<SceneDefinition>, progress: &RuntimeProgress) -> Self {
        let run_id = Uuid::new_v4();
        let mut labels = HashMap::new();
        for (index, step) in scene.steps.iter().enumerate() {
            if let Step::Label { name } = step {
                match labels.entry(name.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                    Entry::Occupied(first) => {
                        warn!(
                            scene_id = %scene.id,
                            label = %name,
                            first = *first.get(),
                            duplicate = index,
                            "duplicate label ignored"
                        );
                    }
                }
            }
        }
        let snapshot = PresentationSnapshot {
            scene_id: Some(scene.id.clone()),
            run_id: Some(run_id),
            state: RunnerState::Running,
            ..PresentationSnapshot::default()
        };

        Self {
            run_id,
            index: 0,
            labels,
            start_flags: progress.flags.clone(),
            start_progress: progress.progress.clone(),
            state: RunnerState::Running,
            snapshot,
            presented: None,
            highlight_ticket: None,
            tickets_issued: 0,
            scene,
        }
    }

    /// The scene being run.
    #[must_use]
    pub fn scene(&self) -> &Arc<SceneDefinition> {
        &self.scene
    }

    /// The scene id.
    #[must_use]
    pub fn scene_id(&self) -> &str {
        &self.scene.id
    }

    /// The run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    /// The current presentation state.
    #[must_use]
    pub fn snapshot(&self) -> &PresentationSnapshot {
        &self.snapshot
    }

    /// The ticket identifying the current suspension, if suspended.
    #[must_use]
    pub fn current_ticket(&self) -> Option<RunTicket> {
        self.snapshot.resume_ticket
    }

    /// Executes steps until the run suspends or ends. Does nothing unless
    /// the run is `Running`.
    pub fn advance(&mut self, progress: &mut RuntimeProgress) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.run(progress, &mut effects);
        effects
    }

    /// Selects option `option` of the pending choice: applies its flag
    /// writes, then jumps to its target or falls through.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no choice is pending or the
    /// option index is out of range. The run is left untouched.
    pub fn choose(
        &mut self,
        option: usize,
        progress: &mut RuntimeProgress,
    ) -> Result<Vec<Effect>, DomainError> {
        if self.state != RunnerState::WaitingForChoice {
            return Err(DomainError::Validation("no choice is pending".to_owned()));
        }
        let scene = Arc::clone(&self.scene);
        let Some(Step::Choice { options, .. }) = scene.steps.get(self.index) else {
            return Err(DomainError::Validation("no choice is pending".to_owned()));
        };
        let Some(selected) = options.get(option) else {
            return Err(DomainError::Validation(format!(
                "choice option {option} is out of range ({} options)",
                options.len()
            )));
        };

        let mut effects = Vec::new();
        for (flag, value) in &selected.set_flags {
            let old = progress.set_flag(flag, *value);
            effects.push(Effect::FlagChanged {
                flag: flag.clone(),
                old,
                new: *value,
            });
        }
        self.snapshot.choice = None;
        self.resume();
        match selected.goto.as_deref() {
            Some(label) => self.jump(label, progress, &mut effects),
            None => self.index += 1,
        }
        self.run(progress, &mut effects);
        Ok(effects)
    }

    /// Acknowledges the pending dialogue line or masked highlight. Returns
    /// `None` if the run is not waiting for an acknowledgement.
    pub fn acknowledge(&mut self, progress: &mut RuntimeProgress) -> Option<Vec<Effect>> {
        if !self.is_waiting_for(&ExternalWait::Acknowledgement) {
            return None;
        }
        self.snapshot.dialogue = None;
        if matches!(
            self.scene.steps.get(self.index),
            Some(Step::Highlight {
                mask_input: true,
                ..
            })
        ) {
            self.snapshot.highlight = None;
            self.snapshot.input_masked = false;
            self.highlight_ticket = None;
        }
        Some(self.continue_after_suspension(progress))
    }

    /// Resumes a `wait` step. Returns `None` if `ticket` does not identify
    /// the current timer suspension.
    pub fn resume_timer(
        &mut self,
        ticket: RunTicket,
        progress: &mut RuntimeProgress,
    ) -> Option<Vec<Effect>> {
        let waiting = matches!(
            self.state,
            RunnerState::WaitingForExternal {
                wait: ExternalWait::Timer { .. }
            }
        );
        if !waiting || self.current_ticket() != Some(ticket) {
            return None;
        }
        Some(self.continue_after_suspension(progress))
    }

    /// Resumes a `waitForFlag` step if the watched flag now has the awaited
    /// value. Returns `None` otherwise.
    pub fn notify_flag(&mut self, progress: &mut RuntimeProgress) -> Option<Vec<Effect>> {
        let satisfied = matches!(
            &self.state,
            RunnerState::WaitingForExternal {
                wait: ExternalWait::Flag { flag, value }
            } if progress.flag(flag) == *value
        );
        if !satisfied {
            return None;
        }
        Some(self.continue_after_suspension(progress))
    }

    /// Forces an active run to `Ended(Interrupted)`. Does nothing if the run
    /// already ended.
    pub fn interrupt(&mut self, progress: &RuntimeProgress) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.state.is_active() {
            self.finish(EndReason::Interrupted, None, progress, &mut effects);
            self.present_if_changed(&mut effects);
        }
        effects
    }

    /// Records measured geometry for the highlight identified by `ticket`.
    /// Returns the updated snapshot, or `None` if the highlight is gone or
    /// the geometry did not change anything.
    pub fn apply_geometry(
        &mut self,
        ticket: RunTicket,
        rect: Option<Rect>,
    ) -> Option<PresentationSnapshot> {
        if self.highlight_ticket != Some(ticket) {
            return None;
        }
        self.snapshot.highlight.as_mut()?.rect = rect;
        let mut effects = Vec::new();
        self.present_if_changed(&mut effects);
        effects.into_iter().find_map(|effect| match effect {
            Effect::Present(snapshot) => Some(snapshot),
            _ => None,
        })
    }

    fn next_ticket(&mut self) -> RunTicket {
        self.tickets_issued += 1;
        RunTicket {
            run_id: self.run_id,
            step_index: self.index,
            seq: self.tickets_issued,
        }
    }

    fn is_waiting_for(&self, wait: &ExternalWait) -> bool {
        matches!(&self.state, RunnerState::WaitingForExternal { wait: current } if current == wait)
    }

    fn resume(&mut self) {
        self.state = RunnerState::Running;
        self.snapshot.resume_ticket = None;
    }

    fn continue_after_suspension(&mut self, progress: &mut RuntimeProgress) -> Vec<Effect> {
        self.resume();
        self.index += 1;
        self.advance(progress)
    }

    fn run(&mut self, progress: &mut RuntimeProgress, effects: &mut Vec<Effect>) {
        let scene = Arc::clone(&self.scene);
        let mut executed = 0;
        while self.state == RunnerState::Running {
            if executed == STEP_BUDGET {
                let message = format!("executed {STEP_BUDGET} steps without suspending");
                self.abort(message, progress, effects);
                break;
            }
            executed += 1;
            self.snapshot.sound = None;

            let Some(step) = scene.steps.get(self.index) else {
                self.finish(EndReason::Completed, None, progress, effects);
                break;
            };
            debug!(
                scene_id = %scene.id,
                run_id = %self.run_id,
                index = self.index,
                step = step.kind(),
                "executing step"
            );
            match self.execute(step, progress, effects) {
                Flow::Next => self.index += 1,
                Flow::Jump(label) => self.jump(label, progress, effects),
                Flow::Suspend(state) => {
                    self.state = state;
                    self.snapshot.resume_ticket = Some(self.next_ticket());
                }
                Flow::Finish => self.finish(EndReason::Completed, None, progress, effects),
                Flow::Abort(message) => self.abort(message, progress, effects),
            }
            self.present_if_changed(effects);
        }
        self.present_if_changed(effects);
    }

    #[allow(clippy::too_many_lines)]
    fn execute<'s>(
        &mut self,
        step: &'s Step,
        progress: &mut RuntimeProgress,
        effects: &mut Vec<Effect>,
    ) -> Flow<'s> {
        match step {
            Step::Label { .. } => Flow::Next,
            Step::Goto { label } => Flow::Jump(label),
            Step::If {
                flag,
                then,
                otherwise,
            } => {
                let branch = if progress.flag(flag) { then } else { otherwise };
                branch.as_deref().map_or(Flow::Next, Flow::Jump)
            }
            Step::CheckProgress {
                key,
                min,
                max,
                then,
                otherwise,
            } => {
                let value = progress.counter(key);
                let in_range =
                    min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max);
                let branch = if in_range { then } else { otherwise };
                branch.as_deref().map_or(Flow::Next, Flow::Jump)
            }
            Step::End => Flow::Finish,
            Step::Say(dialogue) => {
                self.snapshot.dialogue = Some(dialogue.clone());
                Flow::Suspend(RunnerState::WaitingForExternal {
                    wait: ExternalWait::Acknowledgement,
                })
            }
            Step::Choice { prompt, options } => {
                if options.is_empty() {
                    return Flow::Abort(format!("choice at step {} has no options", self.index));
                }
                self.snapshot.choice = Some(ChoicePrompt {
                    prompt: prompt.clone(),
                    options: options.iter().map(|option| option.label.clone()).collect(),
                });
                Flow::Suspend(RunnerState::WaitingForChoice)
            }
            Step::Wait { ms } => Flow::Suspend(RunnerState::WaitingForExternal {
                wait: ExternalWait::Timer { ms: *ms },
            }),
            Step::WaitForFlag { flag, value } => {
                if progress.flag(flag) == *value {
                    Flow::Next
                } else {
                    Flow::Suspend(RunnerState::WaitingForExternal {
                        wait: ExternalWait::Flag {
                            flag: flag.clone(),
                            value: *value,
                        },
                    })
                }
            }
            Step::Highlight {
                anchor_id,
                mask_input,
            } => {
                let ticket = self.next_ticket();
                self.highlight_ticket = Some(ticket);
                self.snapshot.highlight = Some(HighlightTarget {
                    anchor_id: anchor_id.clone(),
                    mask_input: *mask_input,
                    rect: None,
                });
                effects.push(Effect::MeasureAnchor {
                    ticket,
                    anchor_id: anchor_id.clone(),
                });
                if *mask_input {
                    self.snapshot.input_masked = true;
                    Flow::Suspend(RunnerState::WaitingForExternal {
                        wait: ExternalWait::Acknowledgement,
                    })
                } else {
                    Flow::Next
                }
            }
            Step::ClearHighlight => {
                self.snapshot.highlight = None;
                self.highlight_ticket = None;
                Flow::Next
            }
            Step::ToggleInputMask { enabled } => {
                self.snapshot.input_masked = enabled.unwrap_or(!self.snapshot.input_masked);
                Flow::Next
            }
            Step::Hint { text, anchor_id } => {
                self.snapshot.hint = Some(HintView {
                    text: text.clone(),
                    anchor_id: anchor_id.clone(),
                });
                Flow::Next
            }
            Step::SetFlag { flag, value } => {
                let old = progress.set_flag(flag, *value);
                effects.push(Effect::FlagChanged {
                    flag: flag.clone(),
                    old,
                    new: *value,
                });
                Flow::Next
            }
            Step::SetProgress { key, value } => {
                let old = progress.set_counter(key, *value);
                effects.push(Effect::ProgressChanged {
                    key: key.clone(),
                    old,
                    new: *value,
                });
                Flow::Next
            }
            Step::IncrementProgress { key, by } => {
                let new = progress.counter(key).saturating_add(*by);
                let old = progress.set_counter(key, new);
                effects.push(Effect::ProgressChanged {
                    key: key.clone(),
                    old,
                    new,
                });
                Flow::Next
            }
            Step::Background { asset } => {
                self.snapshot.background = Some(asset.clone());
                Flow::Next
            }
            Step::Portrait {
                character,
                expression,
                position,
            } => {
                self.snapshot.portraits.insert(
                    character.clone(),
                    PortraitView {
                        expression: expression.clone(),
                        position: position.clone(),
                    },
                );
                Flow::Next
            }
            Step::ClearPortrait { character } => {
                self.snapshot.portraits.remove(character);
                Flow::Next
            }
            Step::Overlay { asset } => {
                self.snapshot.overlay.clone_from(asset);
                Flow::Next
            }
            Step::PlayMusic { track } => {
                self.snapshot.music = Some(track.clone());
                Flow::Next
            }
            Step::StopMusic => {
                self.snapshot.music = None;
                Flow::Next
            }
            Step::PlaySound { sound } => {
                self.snapshot.sound = Some(sound.clone());
                Flow::Next
            }
            Step::NavigateTo { .. } | Step::TriggerBattle { .. } | Step::TriggerReward { .. } => {
                if let Some(command) = step.host_command() {
                    effects.push(Effect::Dispatch(command));
                }
                Flow::Next
            }
        }
    }

    fn jump(&mut self, label: &str, progress: &RuntimeProgress, effects: &mut Vec<Effect>) {
        match self.labels.get(label) {
            Some(&target) => self.index = target,
            None => self.abort(
                format!("step {} jumps to undefined label `{label}`", self.index),
                progress,
                effects,
            ),
        }
    }

    fn abort(&mut self, message: String, progress: &RuntimeProgress, effects: &mut Vec<Effect>) {
        let error = DomainError::authoring(self.scene.id.clone(), message.clone());
        warn!(run_id = %self.run_id, %error, "scene aborted");
        self.finish(EndReason::Interrupted, Some(message), progress, effects);
    }

    fn finish(
        &mut self,
        reason: EndReason,
        diagnostic: Option<String>,
        progress: &RuntimeProgress,
        effects: &mut Vec<Effect>,
    ) {
        let changed_flags = progress
            .flags
            .iter()
            .filter(|(flag, value)| self.start_flags.get(*flag).copied().unwrap_or(false) != **value)
            .map(|(flag, value)| (flag.clone(), *value))
            .collect();
        let changed_progress = progress
            .progress
            .iter()
            .filter(|(key, value)| self.start_progress.get(*key).copied().unwrap_or(0) != **value)
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        self.state = RunnerState::Ended { reason };
        self.highlight_ticket = None;
        self.snapshot = PresentationSnapshot {
            scene_id: Some(self.scene.id.clone()),
            run_id: Some(self.run_id),
            ..PresentationSnapshot::default()
        };
        effects.push(Effect::Ended {
            reason,
            diagnostic,
            changed_flags,
            changed_progress,
        });
    }

    fn present_if_changed(&mut self, effects: &mut Vec<Effect>) {
        self.snapshot.state = self.state.clone();
        if self.presented.as_ref() != Some(&self.snapshot) {
            self.presented = Some(self.snapshot.clone());
            effects.push(Effect::Present(self.snapshot.clone()));
        }
    }
}
