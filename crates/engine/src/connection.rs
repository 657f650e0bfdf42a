use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::protocol::ClientAction;

/// What the socket task reports back to the engine loop.
#[derive(Debug)]
pub(crate) enum SocketEvent {
    Opened,
    Closed,
    Frame(String),
}

/// Reconnect delay schedule: starts at `base`, doubles per consecutive
/// failure up to `max`, resets to `base` after any successful open.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

enum Drive {
    Closed,
    Stopped,
    EngineGone,
}

enum Dial {
    Open(WebSocketStream<MaybeTlsStream<TcpStream>>),
    Failed,
    EngineGone,
}

pub(crate) fn spawn(
    url: String,
    base: Duration,
    max: Duration,
    connect_timeout: Duration,
    stopped: Arc<AtomicBool>,
    outgoing: mpsc::UnboundedReceiver<ClientAction>,
    inbound: mpsc::UnboundedSender<SocketEvent>,
) -> JoinHandle<()> {
    tokio::spawn(run(
        url,
        Backoff::new(base, max),
        connect_timeout,
        stopped,
        outgoing,
        inbound,
    ))
}

async fn run(
    url: String,
    mut backoff: Backoff,
    connect_timeout: Duration,
    stopped: Arc<AtomicBool>,
    mut outgoing: mpsc::UnboundedReceiver<ClientAction>,
    inbound: mpsc::UnboundedSender<SocketEvent>,
) {
    while !stopped.load(Ordering::SeqCst) {
        match dial(&url, connect_timeout, &mut outgoing).await {
            Dial::Open(socket) => {
                log::info!("fishing socket open");
                backoff.reset();
                if inbound.send(SocketEvent::Opened).is_err() {
                    return;
                }
                let reason = drive_socket(socket, &mut outgoing, &inbound, &stopped).await;
                let _ = inbound.send(SocketEvent::Closed);
                match reason {
                    Drive::Closed => log::info!("fishing socket closed"),
                    Drive::Stopped | Drive::EngineGone => return,
                }
            }
            Dial::Failed => {}
            Dial::EngineGone => return,
        }

        if stopped.load(Ordering::SeqCst) {
            return;
        }
        let delay = backoff.next_delay();
        log::info!("reconnecting in {:?}", delay);
        if !wait_and_drop(delay, &mut outgoing).await {
            return;
        }
    }
}

/// Connect attempt that keeps draining the command channel: anything
/// issued before the socket is open is dropped, never queued for the
/// next connection.
async fn dial(
    url: &str,
    connect_timeout: Duration,
    outgoing: &mut mpsc::UnboundedReceiver<ClientAction>,
) -> Dial {
    let connect = tokio::time::timeout(connect_timeout, connect_async(url));
    tokio::pin!(connect);
    loop {
        tokio::select! {
            result = &mut connect => {
                return match result {
                    Ok(Ok((socket, _))) => Dial::Open(socket),
                    Ok(Err(err)) => {
                        log::debug!("connect failed: {}", err);
                        Dial::Failed
                    }
                    Err(_) => {
                        log::debug!("connect attempt timed out");
                        Dial::Failed
                    }
                };
            }
            action = outgoing.recv() => match action {
                Some(action) => {
                    log::debug!("dropping {:?} while disconnected", action.kind());
                }
                None => return Dial::EngineGone,
            },
        }
    }
}

async fn drive_socket<S>(
    socket: WebSocketStream<S>,
    outgoing: &mut mpsc::UnboundedReceiver<ClientAction>,
    inbound: &mpsc::UnboundedSender<SocketEvent>,
    stopped: &AtomicBool,
) -> Drive
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = socket.split();
    loop {
        if stopped.load(Ordering::SeqCst) {
            let _ = sink.send(Message::Close(None)).await;
            return Drive::Stopped;
        }
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if inbound
                        .send(SocketEvent::Frame(text.as_str().to_string()))
                        .is_err()
                    {
                        return Drive::EngineGone;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Drive::Closed,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    log::debug!("socket read error: {}", err);
                    return Drive::Closed;
                }
            },
            action = outgoing.recv() => match action {
                Some(action) => match serde_json::to_string(&action) {
                    Ok(json) => {
                        if let Err(err) = sink.send(Message::text(json)).await {
                            log::debug!("send failed: {}", err);
                            return Drive::Closed;
                        }
                    }
                    Err(err) => log::error!("failed to encode {:?}: {}", action.kind(), err),
                },
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Drive::EngineGone;
                }
            },
        }
    }
}

/// Backoff sleep. Commands issued while disconnected are drained and
/// dropped here, never queued. Returns false once the engine is gone.
async fn wait_and_drop(
    delay: Duration,
    outgoing: &mut mpsc::UnboundedReceiver<ClientAction>,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            action = outgoing.recv() => match action {
                Some(action) => {
                    log::debug!("dropping {:?} while disconnected", action.kind());
                }
                None => return false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(3), Duration::from_secs(30));
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![3, 6, 12, 24, 30, 30]);
    }

    #[test]
    fn test_backoff_resets_after_success() {
        let mut backoff = Backoff::new(Duration::from_secs(3), Duration::from_secs(30));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
    }
}
