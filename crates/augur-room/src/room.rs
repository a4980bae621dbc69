//! Room actor: one Tokio task per room.
//!
//! The actor owns the [`Room`], its [`PhaseTimer`], and a gateway
//! reference. Every mutation arrives as a [`RoomCommand`] on a bounded
//! channel, including timer expiries, so a room never sees two operations
//! at once. Outside code talks to it through a cloneable [`RoomHandle`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use augur_protocol::{
    GuessOutcome, ParticipantId, Phase, RoomId, RoomSummary, RoomView, ServerEvent, Stroke,
};
use augur_timer::{PhaseTimer, TimerToken};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::engine::{self, TimerSpec, Transition};
use crate::roster::{Departure, Registration};
use crate::{Gateway, Pact, Participant, Room, RoomError, WordBank, view};

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Register {
        participant: Participant,
        reply: Reply<Registration>,
    },
    Deregister {
        participant_id: ParticipantId,
        reply: Reply<Departure>,
    },
    Start {
        reply: Reply<()>,
    },
    SealWord {
        participant_id: ParticipantId,
        word: String,
        reply: Reply<()>,
    },
    Stroke {
        participant_id: ParticipantId,
        strokes: Vec<Stroke>,
        reply: Reply<()>,
    },
    Clear {
        participant_id: ParticipantId,
        reply: Reply<()>,
    },
    Guess {
        participant_id: ParticipantId,
        text: String,
        reply: Reply<GuessReceipt>,
    },
    View {
        participant_id: ParticipantId,
        reply: Reply<RoomView>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    /// Sent by the phase timer. Ignored unless `token` is still current.
    TimerFired {
        token: TimerToken,
        phase: Phase,
    },
    Shutdown,
}

/// What the guesser is told about their guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuessReceipt {
    pub outcome: GuessOutcome,
    pub points: u32,
}

/// Room metadata, without game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: Phase,
    pub occupancy: usize,
    pub max_occupancy: usize,
    pub round: u32,
    pub round_limit: u32,
    /// A phase deadline is pending.
    pub timer_armed: bool,
}

impl RoomInfo {
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            phase: self.phase,
            occupancy: self.occupancy,
            max_occupancy: self.max_occupancy,
            round: self.round,
            round_limit: self.round_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Cheap to clone.
///
/// Once the actor has stopped (disposed, dissolved, or shut down) every
/// call fails with [`RoomError::RoomNotFound`].
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    occupancy: Arc<AtomicUsize>,
    max_occupancy: usize,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Last occupancy reported by the actor.
    pub fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Open and not full, as far as the handle can tell without asking.
    pub fn has_capacity(&self) -> bool {
        !self.is_closed() && self.occupancy() < self.max_occupancy
    }

    fn gone(&self) -> RoomError {
        RoomError::RoomNotFound(self.room_id.clone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.gone())?;
        reply_rx.await.map_err(|_| self.gone())
    }

    /// Seats a participant (or refreshes a returning one).
    pub async fn register(&self, participant: Participant) -> Result<Registration, RoomError> {
        self.request(|reply| RoomCommand::Register { participant, reply })
            .await?
    }

    /// Removes a participant. The room stops if the roster empties.
    pub async fn deregister(&self, participant_id: ParticipantId) -> Result<Departure, RoomError> {
        self.request(|reply| RoomCommand::Deregister {
            participant_id,
            reply,
        })
        .await?
    }

    pub async fn start(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { reply }).await?
    }

    pub async fn seal_word(&self, participant_id: ParticipantId, word: String) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SealWord {
            participant_id,
            word,
            reply,
        })
        .await?
    }

    pub async fn stroke(&self, participant_id: ParticipantId, strokes: Vec<Stroke>) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Stroke {
            participant_id,
            strokes,
            reply,
        })
        .await?
    }

    pub async fn clear(&self, participant_id: ParticipantId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Clear {
            participant_id,
            reply,
        })
        .await?
    }

    pub async fn guess(&self, participant_id: ParticipantId, text: String) -> Result<GuessReceipt, RoomError> {
        self.request(|reply| RoomCommand::Guess {
            participant_id,
            text,
            reply,
        })
        .await?
    }

    /// The room as `participant_id` may see it.
    pub async fn view(&self, participant_id: ParticipantId) -> Result<RoomView, RoomError> {
        self.request(|reply| RoomCommand::View {
            participant_id,
            reply,
        })
        .await?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Stops the actor without notifying anyone.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.gone())
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct RoomActor {
    room: Room,
    timer: PhaseTimer,
    gateway: Arc<dyn Gateway>,
    words: Arc<WordBank>,
    rng: StdRng,
    occupancy: Arc<AtomicUsize>,
    inbox: mpsc::Receiver<RoomCommand>,
    /// Weak so that pending timers do not keep the actor alive.
    mailbox: mpsc::WeakSender<RoomCommand>,
    stopping: bool,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.id(), "room actor started");

        while let Some(command) = self.inbox.recv().await {
            self.handle(command);
            if self.stopping {
                break;
            }
        }

        self.timer.cancel();
        self.occupancy.store(0, Ordering::Relaxed);
        self.gateway.close_room(self.room.id());
        tracing::info!(
            room_id = %self.room.id(),
            phase = %self.room.phase(),
            timers = ?self.timer.stats(),
            "room actor stopped"
        );
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Register { participant, reply } => {
                let result = self.register(participant);
                self.answer("register", reply, result);
            }
            RoomCommand::Deregister {
                participant_id,
                reply,
            } => {
                let result = self.deregister(&participant_id);
                self.answer("deregister", reply, result);
            }
            RoomCommand::Start { reply } => {
                let result = self.start();
                self.answer("start", reply, result);
            }
            RoomCommand::SealWord {
                participant_id,
                word,
                reply,
            } => {
                let result = engine::seal(&self.room, &participant_id, &word).map(|t| self.advance(t));
                self.answer("seal_word", reply, result);
            }
            RoomCommand::Stroke {
                participant_id,
                strokes,
                reply,
            } => {
                let result = self.stroke(&participant_id, strokes);
                self.answer("stroke", reply, result);
            }
            RoomCommand::Clear {
                participant_id,
                reply,
            } => {
                let result = self.clear(&participant_id);
                self.answer("clear", reply, result);
            }
            RoomCommand::Guess {
                participant_id,
                text,
                reply,
            } => {
                let result = self.guess(&participant_id, text);
                self.answer("guess", reply, result);
            }
            RoomCommand::View {
                participant_id,
                reply,
            } => {
                let result = if self.room.contains(&participant_id) {
                    Ok(view::view_for(&self.room, &participant_id, Instant::now()))
                } else {
                    Err(RoomError::ParticipantNotFound(
                        participant_id,
                        self.room.id().clone(),
                    ))
                };
                self.answer("view", reply, result);
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::TimerFired { token, phase } => self.on_timer(token, phase),
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room.id(), "room shutting down");
                self.stopping = true;
            }
        }
    }

    /// Sends a reply, logging rejections.
    fn answer<T>(&self, command: &'static str, reply: Reply<T>, result: Result<T, RoomError>) {
        match &result {
            Err(err @ RoomError::Internal(_)) => {
                tracing::error!(room_id = %self.room.id(), command, %err, "internal fault");
            }
            Err(err) => {
                tracing::debug!(room_id = %self.room.id(), command, %err, "command rejected");
            }
            Ok(_) => {}
        }
        let _ = reply.send(result);
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room.id().clone(),
            phase: self.room.phase(),
            occupancy: self.room.occupancy(),
            max_occupancy: self.room.pact().max_occupancy,
            round: self.room.round(),
            round_limit: self.room.pact().round_limit,
            timer_armed: self.timer.is_armed(),
        }
    }

    // -- roster --------------------------------------------------------------

    fn register(&mut self, participant: Participant) -> Result<Registration, RoomError> {
        let registration = self.room.register(participant)?;
        self.occupancy
            .store(registration.occupancy, Ordering::Relaxed);

        let participant_id = &registration.participant.id;
        tracing::info!(
            room_id = %self.room.id(),
            %participant_id,
            occupancy = registration.occupancy,
            reconnected = registration.reconnected,
            "participant registered"
        );

        self.gateway.to_room(self.room.id(), view::sync(&self.room));
        self.gateway.to_participant(
            participant_id,
            ServerEvent::Snapshot(view::view_for(&self.room, participant_id, Instant::now())),
        );

        if registration.quorum_reached && self.room.pact().auto_start {
            if let Err(err) = self.start() {
                tracing::debug!(room_id = %self.room.id(), %err, "auto start skipped");
            }
        }
        Ok(registration)
    }

    fn deregister(&mut self, participant_id: &ParticipantId) -> Result<Departure, RoomError> {
        let (departure, transition) =
            engine::depart(&mut self.room, participant_id, &mut self.rng, &self.words)?;
        self.occupancy.store(self.room.occupancy(), Ordering::Relaxed);
        self.gateway.remove_member(self.room.id(), participant_id);

        tracing::info!(
            room_id = %self.room.id(),
            %participant_id,
            occupancy = self.room.occupancy(),
            was_judge = departure.was_judge,
            "participant deregistered"
        );

        if departure.room_disposed {
            tracing::info!(room_id = %self.room.id(), "room empty, disposing");
            self.stopping = true;
            return Ok(departure);
        }

        self.gateway.to_room(self.room.id(), view::sync(&self.room));
        if departure.was_judge {
            self.gateway.to_room(
                self.room.id(),
                ServerEvent::Notice {
                    room_id: self.room.id().clone(),
                    text: format!("{} (judge) has disconnected.", departure.removed.display_name),
                },
            );
        }
        if let Some(transition) = transition {
            self.advance(transition);
        }
        Ok(departure)
    }

    // -- round ---------------------------------------------------------------

    fn start(&mut self) -> Result<(), RoomError> {
        let transition = engine::begin(&self.room, &mut self.rng, &self.words)?;
        self.advance(transition);
        Ok(())
    }

    fn stroke(&mut self, participant_id: &ParticipantId, strokes: Vec<Stroke>) -> Result<(), RoomError> {
        engine::append_strokes(&mut self.room, participant_id, &strokes)?;
        self.gateway.to_room_except(
            self.room.id(),
            participant_id,
            ServerEvent::Stroke {
                room_id: self.room.id().clone(),
                strokes,
            },
        );
        Ok(())
    }

    fn clear(&mut self, participant_id: &ParticipantId) -> Result<(), RoomError> {
        engine::clear_strokes(&mut self.room, participant_id)?;
        self.gateway.to_room(
            self.room.id(),
            ServerEvent::Clear {
                room_id: self.room.id().clone(),
            },
        );
        Ok(())
    }

    fn guess(&mut self, participant_id: &ParticipantId, text: String) -> Result<GuessReceipt, RoomError> {
        let verdict = engine::guess(&mut self.room, participant_id, &text, Instant::now())?;
        let room_id = self.room.id().clone();
        let display_name = self
            .room
            .participant(participant_id)
            .map(|p| p.display_name.clone())
            .unwrap_or_default();

        match verdict.outcome {
            GuessOutcome::Solved => {
                tracing::info!(%room_id, %participant_id, points = verdict.points, "secret solved");
                self.gateway.to_room(
                    &room_id,
                    ServerEvent::Solved {
                        room_id: room_id.clone(),
                        participant_id: participant_id.clone(),
                        display_name,
                        points: verdict.points,
                    },
                );
                self.gateway.to_room(&room_id, view::sync(&self.room));
            }
            GuessOutcome::CloseHint => self.gateway.to_room(
                &room_id,
                ServerEvent::Close {
                    room_id: room_id.clone(),
                    participant_id: participant_id.clone(),
                    display_name,
                },
            ),
            GuessOutcome::Miss => self.gateway.to_room(
                &room_id,
                ServerEvent::Miss {
                    room_id: room_id.clone(),
                    participant_id: participant_id.clone(),
                    display_name,
                    text,
                },
            ),
            GuessOutcome::Suppressed => {}
        }

        if let Some(transition) = verdict.transition {
            self.advance(transition);
        }
        Ok(GuessReceipt {
            outcome: verdict.outcome,
            points: verdict.points,
        })
    }

    fn on_timer(&mut self, token: TimerToken, phase: Phase) {
        if !self.timer.settle(token) {
            tracing::debug!(room_id = %self.room.id(), %token, %phase, "stale timer ignored");
            return;
        }
        match engine::expire(&self.room, phase, &mut self.rng, &self.words) {
            Ok(Some(transition)) => self.advance(transition),
            Ok(None) => {
                tracing::debug!(
                    room_id = %self.room.id(),
                    %token,
                    timer_phase = %phase,
                    phase = %self.room.phase(),
                    "timer outlived its phase"
                );
            }
            Err(err) => {
                tracing::error!(room_id = %self.room.id(), %phase, %err, "phase expiry failed, back to lobby");
                self.advance(Transition::LobbyReentered);
            }
        }
    }

    /// Applies a transition, re-arms the timer, and announces the phase.
    fn advance(&mut self, transition: Transition) {
        let from = self.room.phase();
        let now = Instant::now();
        match engine::apply(&mut self.room, transition, now) {
            Some(spec) => self.arm(spec),
            None => {
                self.timer.cancel();
            }
        }

        tracing::info!(
            room_id = %self.room.id(),
            %from,
            phase = %self.room.phase(),
            round = self.room.round(),
            "phase entered"
        );
        for (recipient, event) in view::announce(&self.room, now) {
            self.gateway.deliver(self.room.id(), recipient, event);
        }

        if self.room.phase().is_terminal() {
            tracing::info!(room_id = %self.room.id(), "round limit reached, dissolving");
            self.stopping = true;
        }
    }

    fn arm(&mut self, spec: TimerSpec) {
        let mailbox = self.mailbox.clone();
        let phase = spec.phase;
        self.timer.arm(spec.after, move |token| async move {
            if let Some(mailbox) = mailbox.upgrade() {
                let _ = mailbox.send(RoomCommand::TimerFired { token, phase }).await;
            }
        });
    }
}

/// Spawns a room actor in the lobby and returns its handle.
///
/// `channel_size` bounds the command inbox; senders wait when it is full.
pub(crate) fn spawn_room(
    room_id: RoomId,
    pact: Pact,
    gateway: Arc<dyn Gateway>,
    words: Arc<WordBank>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let occupancy = Arc::new(AtomicUsize::new(0));
    let max_occupancy = pact.max_occupancy;

    let actor = RoomActor {
        room: Room::new(room_id.clone(), pact, Instant::now()),
        timer: PhaseTimer::new(),
        gateway,
        words,
        rng: StdRng::from_os_rng(),
        occupancy: Arc::clone(&occupancy),
        inbox: rx,
        mailbox: tx.downgrade(),
        stopping: false,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        occupancy,
        max_occupancy,
    }
}
