use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bite::EdgeTracker;
use crate::config::EngineConfig;
use crate::connection::{self, SocketEvent};
use crate::dispatch::{self, PlayerIntent};
use crate::error::EngineError;
use crate::event::EngineEvent;
use crate::pending::PendingCommands;
use crate::protocol::{ClientAction, RodId, ServerFrame, SessionId, StateSnapshot};
use crate::rest::StatusApi;
use crate::router;
use crate::store::{CaughtInfo, SessionStore};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug)]
enum Command {
    Intent(PlayerIntent),
    SetActive(Option<SessionId>),
    SetCaught(Option<CaughtInfo>),
    RemoveSession(SessionId),
    Reset,
    Shutdown,
}

/// Handle to a running sync engine. All mutation funnels through the
/// engine loop task, which is the sole owner of the store; callers
/// observe state through the watch channel and one-shot happenings
/// through the event receiver returned by [`FishingClient::start`].
pub struct FishingClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SessionStore>,
    connected: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    engine_task: JoinHandle<()>,
    socket_task: JoinHandle<()>,
}

impl FishingClient {
    pub fn start(config: EngineConfig) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(SessionStore::new());
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (sock_tx, sock_rx) = mpsc::unbounded_channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(false));

        let socket_task = connection::spawn(
            config.socket_url(),
            config.reconnect_base,
            config.reconnect_max,
            config.connect_timeout,
            Arc::clone(&stopped),
            out_rx,
            sock_tx,
        );

        let engine = EngineLoop {
            rest: StatusApi::new(&config.api_url, &config.token),
            store: SessionStore::new(),
            bites: EdgeTracker::new(),
            nibbles: EdgeTracker::new(),
            pending: PendingCommands::new(config.command_timeout),
            out_tx,
            event_tx,
            state_tx,
            connected: Arc::clone(&connected),
            poll_interval: config.status_poll_interval,
        };
        let engine_task = tokio::spawn(engine.run(cmd_rx, sock_rx));

        (
            Self {
                cmd_tx,
                state_rx,
                connected,
                stopped,
                engine_task,
                socket_task,
            },
            event_rx,
        )
    }

    pub fn cast(&self, rod_id: RodId, x: f32, y: f32) -> Result<(), EngineError> {
        self.intent(PlayerIntent::Cast { rod_id, x, y })
    }

    pub fn strike(&self, session_id: SessionId) -> Result<(), EngineError> {
        self.intent(PlayerIntent::Strike { session_id })
    }

    pub fn reel_in(&self, session_id: SessionId) -> Result<(), EngineError> {
        self.intent(PlayerIntent::ReelIn { session_id })
    }

    pub fn pull(&self, session_id: SessionId) -> Result<(), EngineError> {
        self.intent(PlayerIntent::Pull { session_id })
    }

    pub fn keep(&self, session_id: SessionId) -> Result<(), EngineError> {
        self.intent(PlayerIntent::Keep { session_id })
    }

    pub fn release(&self, session_id: SessionId) -> Result<(), EngineError> {
        self.intent(PlayerIntent::Release { session_id })
    }

    pub fn retrieve(&self, session_id: SessionId) -> Result<(), EngineError> {
        self.intent(PlayerIntent::Retrieve { session_id })
    }

    pub fn update_retrieve(
        &self,
        session_id: SessionId,
        is_retrieving: bool,
    ) -> Result<(), EngineError> {
        self.intent(PlayerIntent::UpdateRetrieve {
            session_id,
            is_retrieving,
        })
    }

    pub fn change_bait(&self, session_id: SessionId, bait_id: i64) -> Result<(), EngineError> {
        self.intent(PlayerIntent::ChangeBait {
            session_id,
            bait_id,
        })
    }

    pub fn set_active_session(&self, id: Option<SessionId>) -> Result<(), EngineError> {
        self.send(Command::SetActive(id))
    }

    pub fn set_caught(&self, info: Option<CaughtInfo>) -> Result<(), EngineError> {
        self.send(Command::SetCaught(info))
    }

    pub fn remove_session(&self, id: SessionId) -> Result<(), EngineError> {
        self.send(Command::RemoveSession(id))
    }

    pub fn reset(&self) -> Result<(), EngineError> {
        self.send(Command::Reset)
    }

    /// Subscribe to immutable store snapshots; changed() resolves on
    /// every published mutation.
    pub fn state(&self) -> watch::Receiver<SessionStore> {
        self.state_rx.clone()
    }

    pub fn snapshot(&self) -> SessionStore {
        self.state_rx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub async fn shutdown(mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.cmd_tx.send(Command::Shutdown);
        let _ = self.engine_task.await;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.socket_task)
            .await
            .is_err()
        {
            self.socket_task.abort();
        }
    }

    fn intent(&self, intent: PlayerIntent) -> Result<(), EngineError> {
        self.send(Command::Intent(intent))
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.cmd_tx
            .send(command)
            .map_err(|_| EngineError::Stopped)
    }
}

struct EngineLoop {
    rest: StatusApi,
    store: SessionStore,
    bites: EdgeTracker,
    nibbles: EdgeTracker,
    pending: PendingCommands,
    out_tx: mpsc::UnboundedSender<ClientAction>,
    event_tx: mpsc::Sender<EngineEvent>,
    state_tx: watch::Sender<SessionStore>,
    connected: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl EngineLoop {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut sock_rx: mpsc::UnboundedReceiver<SocketEvent>,
    ) {
        // REST bootstrap runs off-loop so a slow endpoint cannot hold
        // up socket frames; the socket sends its own snapshot on open
        // and overwrites this shortly after.
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        self.spawn_status_fetch(status_tx.clone());

        let mut poll = tokio::time::interval_at(
            tokio::time::Instant::now() + self.poll_interval,
            self.poll_interval,
        );
        let mut sweep = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                command = cmd_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                socket_event = sock_rx.recv() => match socket_event {
                    Some(event) => self.handle_socket(event),
                    None => break,
                },
                snapshot = status_rx.recv() => {
                    if let Some(snapshot) = snapshot {
                        self.handle_frame(ServerFrame::State(snapshot));
                    }
                }
                _ = poll.tick() => {
                    if !self.connected.load(Ordering::SeqCst) {
                        self.spawn_status_fetch(status_tx.clone());
                    }
                }
                _ = sweep.tick() => self.sweep_pending(),
            }
        }
        log::debug!("engine loop stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Intent(intent) => match dispatch::prepare(intent, &mut self.store) {
                Ok(action) => {
                    if self.connected.load(Ordering::SeqCst) {
                        self.pending.record(&action);
                    }
                    // If the link is down the socket task drops this.
                    let _ = self.out_tx.send(action);
                }
                Err(err) => self.emit(EngineEvent::CommandRejected {
                    message: err.to_string(),
                }),
            },
            Command::SetActive(id) => self.store.set_active_session(id),
            Command::SetCaught(info) => self.store.set_caught(info),
            Command::RemoveSession(id) => self.store.remove_session(id),
            Command::Reset => {
                self.store.reset();
                self.bites.clear();
                self.nibbles.clear();
                self.pending.clear();
            }
            Command::Shutdown => {}
        }
        self.publish();
    }

    fn handle_socket(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Opened => {
                self.connected.store(true, Ordering::SeqCst);
                self.emit(EngineEvent::Connected);
            }
            SocketEvent::Closed => {
                self.connected.store(false, Ordering::SeqCst);
                self.emit(EngineEvent::Disconnected);
            }
            SocketEvent::Frame(raw) => {
                if let Some(frame) = router::decode(&raw) {
                    self.handle_frame(frame);
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: ServerFrame) {
        self.pending.acknowledge(&frame);
        let events = router::route(frame, &mut self.store, &mut self.bites, &mut self.nibbles);
        for event in events {
            self.emit(event);
        }
        self.publish();
    }

    fn spawn_status_fetch(&self, tx: mpsc::UnboundedSender<StateSnapshot>) {
        let rest = self.rest.clone();
        tokio::spawn(async move {
            match rest.status().await {
                Ok(snapshot) => {
                    let _ = tx.send(snapshot);
                }
                Err(err) => log::debug!("status fetch failed: {}", err),
            }
        });
    }

    fn sweep_pending(&mut self) {
        for key in self.pending.sweep(Instant::now()) {
            log::warn!("command {:?} got no answer", key.kind);
            self.emit(EngineEvent::CommandTimedOut {
                kind: key.kind,
                session_id: key.session_id,
            });
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::warn!("event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    fn publish(&mut self) {
        let _ = self.state_tx.send(self.store.clone());
    }
}
