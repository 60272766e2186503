//! TCP serial bridge.
//!
//! Exposes the engine's serial link on a TCP port so a host controller
//! (or a developer with netcat) can speak the line protocol. One client
//! at a time; outbound data while nobody is connected is dropped, which
//! is what a UART does when nothing is listening.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use visor_engine::{SerialLink, TransportError};

/// Channel depth between the bridge tasks and the engine thread.
const CHANNEL_CAPACITY: usize = 256;

/// A [`SerialLink`] backed by a TCP listener.
///
/// The listener and connection handling run on a private tokio runtime;
/// the engine side is fully synchronous and never blocks: `try_read`
/// drains a channel and `write_all` drops data rather than wait on a
/// slow or absent peer.
pub struct TcpSerialLink {
    port: u16,
    rx_receiver: mpsc::Receiver<Vec<u8>>,
    tx_sender: mpsc::Sender<Vec<u8>>,
    client_connected: Arc<AtomicBool>,
    /// Keeps the listener task alive for the lifetime of the link.
    _runtime: tokio::runtime::Runtime,
}

impl TcpSerialLink {
    /// Bind the bridge to a TCP port. Port 0 picks an ephemeral port;
    /// use [`TcpSerialLink::port`] to discover it.
    pub fn bind(port: u16) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let (tx_sender, tx_receiver) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);
        let (rx_sender, rx_receiver) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);
        let client_connected = Arc::new(AtomicBool::new(false));

        let listener = runtime.block_on(TcpListener::bind(("0.0.0.0", port)))?;
        let port = listener.local_addr()?.port();
        info!("serial link listening on port {}", port);

        let connected = Arc::clone(&client_connected);
        runtime.spawn(run_listener(listener, tx_receiver, rx_sender, connected));

        Ok(TcpSerialLink {
            port,
            rx_receiver,
            tx_sender,
            client_connected,
            _runtime: runtime,
        })
    }

    /// The bound TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether a host is currently connected.
    pub fn is_client_connected(&self) -> bool {
        self.client_connected.load(Ordering::Relaxed)
    }
}

impl SerialLink for TcpSerialLink {
    fn try_read(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut data = Vec::new();
        loop {
            match self.rx_receiver.try_recv() {
                Ok(chunk) => data.extend_from_slice(&chunk),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    return Err(TransportError::Closed)
                }
            }
        }
        Ok(data)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        // Nobody listening: drop, as a UART would.
        if !self.client_connected.load(Ordering::Relaxed) {
            return Ok(());
        }
        match self.tx_sender.try_send(data.to_vec()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("TX buffer full, dropping {} bytes (slow host)", data.len());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TransportError::Closed),
        }
    }
}

/// Accept one client at a time and shuttle bytes between the socket and
/// the engine channels.
async fn run_listener(
    listener: TcpListener,
    mut tx_receiver: mpsc::Receiver<Vec<u8>>,
    rx_sender: mpsc::Sender<Vec<u8>>,
    connected: Arc<AtomicBool>,
) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        info!("host connected from {}", peer_addr);
        connected.store(true, Ordering::Relaxed);

        if let Err(e) = handle_connection(stream, &mut tx_receiver, &rx_sender).await {
            warn!("link connection error: {}", e);
        }

        connected.store(false, Ordering::Relaxed);
        info!("host disconnected");
    }
}

/// Shuttle bytes for a single connection until it closes.
async fn handle_connection(
    mut stream: TcpStream,
    tx_receiver: &mut mpsc::Receiver<Vec<u8>>,
    rx_sender: &mpsc::Sender<Vec<u8>>,
) -> io::Result<()> {
    let (mut reader, mut writer) = stream.split();
    let mut read_buf = [0u8; 1024];

    loop {
        tokio::select! {
            // Socket -> engine RX.
            result = reader.read(&mut read_buf) => {
                match result {
                    Ok(0) => return Ok(()),
                    Ok(n) => {
                        if rx_sender.send(read_buf[..n].to_vec()).await.is_err() {
                            // Engine side is gone.
                            return Ok(());
                        }
                    }
                    Err(e) => return Err(e),
                }
            }

            // Engine TX -> socket.
            Some(data) = tx_receiver.recv() => {
                writer.write_all(&data).await?;
                writer.flush().await?;
            }
        }
    }
}
