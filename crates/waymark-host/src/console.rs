//! The request loop.
//!
//! Everything the engine hands to the host (snapshots, commands) goes into
//! one unbounded channel and is written out after each request together
//! with the engine events that request produced. Timers for `wait` steps
//! and anchor polls run as tokio tasks and report back through their own
//! channels; the loop is the only place the engine is touched.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use waymark_anchors::{AnchorPoller, AnchorRegistry, PollHandle, PollOptions};
use waymark_core::clock::Clock;
use waymark_core::command::{CommandHandler, HostCommand};
use waymark_core::error::DomainError;
use waymark_core::gateway::ProgressGateway;
use waymark_core::progress::Namespace;
use waymark_scenes::domain::execution::RunTicket;
use waymark_scenes::domain::snapshot::{PresentationSnapshot, Presenter};
use waymark_scenes::{EngineDependencies, SceneDefinition, SceneEngine};

use crate::error::HostError;
use crate::protocol::{ConsoleOutput, ConsoleRequest};

/// Forwards snapshots to the output channel.
struct ChannelPresenter {
    outputs: UnboundedSender<ConsoleOutput>,
}

impl Presenter for ChannelPresenter {
    fn present(&self, snapshot: &PresentationSnapshot) {
        let _ = self.outputs.send(ConsoleOutput::Snapshot {
            snapshot: snapshot.clone(),
        });
    }
}

/// Forwards host commands to the output channel.
struct ChannelCommandHandler {
    outputs: UnboundedSender<ConsoleOutput>,
}

impl CommandHandler for ChannelCommandHandler {
    fn dispatch(&self, command: &HostCommand) -> Result<(), DomainError> {
        self.outputs
            .send(ConsoleOutput::Command {
                command: command.clone(),
            })
            .map_err(|_| DomainError::Dispatch("console output closed".to_owned()))
    }
}

/// Engine state plus the senders background tasks report through.
struct Session {
    engine: SceneEngine,
    poller: AnchorPoller,
    polls: Vec<PollHandle>,
    armed_timer: Option<RunTicket>,
    outputs: UnboundedSender<ConsoleOutput>,
    timers: UnboundedSender<RunTicket>,
    ready: UnboundedSender<Vec<String>>,
}

/// A console host around one scene engine.
pub struct Console {
    session: Session,
    outputs: UnboundedReceiver<ConsoleOutput>,
    timers: UnboundedReceiver<RunTicket>,
    ready: UnboundedReceiver<Vec<String>>,
}

impl Console {
    /// Creates a console whose engine persists through `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<dyn ProgressGateway>, clock: Arc<dyn Clock>) -> Self {
        let (outputs_tx, outputs_rx) = mpsc::unbounded_channel();
        let (timers_tx, timers_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let anchors = AnchorRegistry::new();
        let engine = SceneEngine::new(EngineDependencies {
            gateway,
            clock,
            commands: Arc::new(ChannelCommandHandler {
                outputs: outputs_tx.clone(),
            }),
            presenter: Arc::new(ChannelPresenter {
                outputs: outputs_tx.clone(),
            }),
            anchors: anchors.clone(),
        });

        Self {
            session: Session {
                engine,
                poller: AnchorPoller::new(anchors),
                polls: Vec::new(),
                armed_timer: None,
                outputs: outputs_tx,
                timers: timers_tx,
                ready: ready_tx,
            },
            outputs: outputs_rx,
            timers: timers_rx,
            ready: ready_rx,
        }
    }

    /// Loads progress for `namespace`.
    pub async fn load(&mut self, namespace: Namespace) {
        self.session.engine.load(namespace).await;
    }

    /// Registers catalog scenes.
    pub fn register_scenes(&mut self, scenes: impl IntoIterator<Item = SceneDefinition>) {
        for scene in scenes {
            self.session.engine.register_scene(scene);
        }
    }

    /// Serves requests from `input` until it closes, writing output lines to
    /// `output`. Progress is flushed after every request and once more at
    /// the end.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Io` if reading input or writing output fails.
    pub async fn run<R, W>(self, input: R, mut output: W) -> Result<(), HostError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Self {
            mut session,
            mut outputs,
            mut timers,
            mut ready,
        } = self;
        let mut lines = input.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => session.handle_line(&line),
                    None => break,
                },
                Some(ticket) = timers.recv() => {
                    if session.armed_timer == Some(ticket) {
                        session.armed_timer = None;
                    }
                    if !session.engine.resume_wait(ticket) {
                        debug!(?ticket, "stale wait timer ignored");
                    }
                }
                Some(anchor_ids) = ready.recv() => {
                    let _ = session.outputs.send(ConsoleOutput::AnchorsReady { anchor_ids });
                }
            }
            session.settle().await;
            drain(&mut session, &mut outputs, &mut output).await?;
        }

        session.polls.clear();
        session.engine.flush().await;
        drain(&mut session, &mut outputs, &mut output).await?;
        info!("input closed, console stopped");
        Ok(())
    }
}

impl Session {
    fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<ConsoleRequest>(line) {
            Ok(request) => {
                if let Err(error) = self.handle(request) {
                    self.report(error.to_string());
                }
            }
            Err(error) => self.report(format!("invalid request: {error}")),
        }
    }

    fn handle(&mut self, request: ConsoleRequest) -> Result<(), DomainError> {
        debug!(?request, "console request");
        match request {
            ConsoleRequest::Event { event } => {
                self.engine.check_triggers(&event);
            }
            ConsoleRequest::Peek { event } => {
                let scene_ids = self.engine.peek_triggers(&event);
                let _ = self.outputs.send(ConsoleOutput::Eligible { scene_ids });
            }
            ConsoleRequest::Start { scene_id } => self.engine.start_scene(&scene_id)?,
            ConsoleRequest::Choose { index } => self.engine.choose(index)?,
            ConsoleRequest::Ack => {
                if !self.engine.acknowledge() {
                    return Err(DomainError::Validation(
                        "nothing awaits an acknowledgement".to_owned(),
                    ));
                }
            }
            ConsoleRequest::Resume { ticket } => {
                let ticket = ticket
                    .or_else(|| self.engine.pending_timer().map(|(ticket, _)| ticket))
                    .ok_or_else(|| DomainError::Validation("no wait is pending".to_owned()))?;
                if !self.engine.resume_wait(ticket) {
                    return Err(DomainError::Validation("stale resume ticket".to_owned()));
                }
            }
            ConsoleRequest::SetFlag { flag, value } => self.engine.set_flag(&flag, value),
            ConsoleRequest::SetProgress { key, value } => self.engine.set_progress(&key, value),
            ConsoleRequest::Stop => {
                self.engine.stop();
            }
            ConsoleRequest::RegisterAnchor { anchor_id, rect } => {
                self.engine
                    .anchors()
                    .register_fn(anchor_id, move || async move { rect });
            }
            ConsoleRequest::UnregisterAnchor { anchor_id } => {
                self.engine.anchors().unregister(&anchor_id);
            }
            ConsoleRequest::WaitForAnchors {
                anchor_ids,
                initial_delay_ms,
                interval_ms,
                max_attempts,
            } => self.wait_for_anchors(anchor_ids, initial_delay_ms, interval_ms, max_attempts),
        }
        Ok(())
    }

    fn wait_for_anchors(
        &mut self,
        anchor_ids: Vec<String>,
        initial_delay_ms: Option<u64>,
        interval_ms: Option<u64>,
        max_attempts: Option<u32>,
    ) {
        let defaults = PollOptions::default();
        let options = PollOptions {
            initial_delay: initial_delay_ms.map_or(defaults.initial_delay, Duration::from_millis),
            interval: interval_ms.map_or(defaults.interval, Duration::from_millis),
            max_attempts: max_attempts.unwrap_or(defaults.max_attempts),
        };
        let ready = self.ready.clone();
        let reported = anchor_ids.clone();
        let handle = self.poller.poll(
            anchor_ids,
            move || {
                let _ = ready.send(reported);
            },
            options,
        );
        self.polls.retain(|poll| !poll.is_finished());
        self.polls.push(handle);
    }

    /// Resolves geometry, flushes progress and arms the timer for a new
    /// `wait` step.
    async fn settle(&mut self) {
        self.engine.settle().await;
        let Some((ticket, delay)) = self.engine.pending_timer() else {
            return;
        };
        if self.armed_timer == Some(ticket) {
            return;
        }
        self.armed_timer = Some(ticket);
        let timers = self.timers.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = timers.send(ticket);
        });
    }

    fn report(&self, message: String) {
        warn!(%message, "console request failed");
        let _ = self.outputs.send(ConsoleOutput::Error { message });
    }
}

/// Writes queued outputs, then the engine events recorded since the last
/// drain.
async fn drain<W>(
    session: &mut Session,
    outputs: &mut UnboundedReceiver<ConsoleOutput>,
    writer: &mut W,
) -> Result<(), HostError>
where
    W: AsyncWrite + Unpin,
{
    while let Ok(item) = outputs.try_recv() {
        write_line(writer, &item).await?;
    }
    for event in session.engine.take_events() {
        write_line(writer, &ConsoleOutput::from(&event)).await?;
    }
    writer.flush().await?;
    Ok(())
}

async fn write_line<W>(writer: &mut W, item: &ConsoleOutput) -> Result<(), HostError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(item)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    Ok(())
}
