//! Provides the TCP link to a running EmoEngine. It includes a `LinkConfig`
//! struct for tuning connection and polling waits, and the `RemoteEngine`
//! gateway the shell drives.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use emotiv_servos::device::LinkConfig;
//! use emotiv_servos::engine::{EngineGateway, HandleScope};
//! use emotiv_servos::state::{CONTROL_PANEL_PORT, ENGINE_HOST};
//!
//! fn main() -> emotiv_servos::Result<()> {
//!     let mut engine = LinkConfig::default()
//!         .with_poll_window(Duration::from_millis(250))
//!         .build()?;
//!
//!     if engine.connect(ENGINE_HOST, CONTROL_PANEL_PORT).is_ok() {
//!         let mut scope = HandleScope::new(&mut engine);
//!         println!("next event: {}", scope.next_event());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Only building the link can fail with an [`Error`](crate::Error). Once
//! built, every engine call reports its outcome as a
//! [`ResultCode`](crate::engine::ResultCode) and logs the underlying cause.
//!
//! A successful `connect` only means the peer accepted the TCP connection;
//! no handshake is exchanged. Events must arrive framed as described in
//! [`comm`](crate::comm), which is this crate's own format and not the
//! vendor EmoEngine protocol.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::comm::FrameDecoder;
use crate::engine::{
    EmoState, EngineEvent, EngineGateway, EventHandle, HandleTable, ResultCode, StateHandle,
};
use crate::{Error, Result};

/// Bytes requested from the socket per poll.
const READ_CHUNK: usize = 512;

/// Configuration for the link to the EmoEngine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// How long a connection attempt may take. Default: 3 s.
    pub connect_timeout: Duration,
    /// How long a single event poll waits for bytes. Default: 100 ms.
    pub poll_window: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            poll_window: Duration::from_millis(100),
        }
    }
}

impl LinkConfig {
    /// Updates the connection timeout.
    ///
    /// # Arguments
    ///
    /// * `connect_timeout` - Longest wait for the engine to accept.
    ///
    /// # Returns
    ///
    /// * `Self` - The updated configuration.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Updates the poll window.
    /// A poll that sees no complete event within the window reports
    /// `NO_EVENT`.
    ///
    /// # Arguments
    ///
    /// * `poll_window` - Longest wait for event bytes per poll.
    ///
    /// # Returns
    ///
    /// * `Self` - The updated configuration.
    pub fn with_poll_window(mut self, poll_window: Duration) -> Self {
        self.poll_window = poll_window;
        self
    }

    /// Builds a disconnected [`RemoteEngine`] with this configuration.
    ///
    /// # Errors
    ///
    /// This function will return an error if the runtime backing the link
    /// cannot be created.
    pub fn build(self) -> Result<RemoteEngine> {
        RemoteEngine::new(self)
    }
}

/// EmoEngine reached over TCP.
///
/// The async socket is driven from blocking calls through a private
/// current-thread runtime, so every method returns only once the engine
/// answered or the configured wait elapsed.
pub struct RemoteEngine {
    // Dropped before the runtime that owns its registration.
    stream: Option<TcpStream>,
    decoder: FrameDecoder,
    handles: HandleTable,
    config: LinkConfig,
    runtime: Runtime,
}

impl RemoteEngine {
    pub fn new(config: LinkConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        Ok(Self {
            stream: None,
            decoder: FrameDecoder::new(),
            handles: HandleTable::new(),
            config,
            runtime,
        })
    }

    pub fn is_linked(&self) -> bool {
        self.stream.is_some()
    }

    /// Number of event and state handles not yet released.
    pub fn outstanding_handles(&self) -> usize {
        self.handles.outstanding()
    }

    fn drop_link(&mut self) {
        self.stream = None;
        self.decoder = FrameDecoder::new();
    }
}

/// Opens a TCP connection to `addr`, giving up after `limit`.
async fn open_link(addr: &str, limit: Duration) -> Result<TcpStream> {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(stream) => {
            let stream = stream?;
            stream.set_nodelay(true)?;
            Ok(stream)
        }
        Err(_) => Err(Error::ConnectTimeout {
            addr: addr.to_string(),
            ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

impl EngineGateway for RemoteEngine {
    fn connect(&mut self, host: &str, port: u16) -> ResultCode {
        let addr = format!("{host}:{port}");
        match self
            .runtime
            .block_on(open_link(&addr, self.config.connect_timeout))
        {
            Ok(stream) => {
                info!(%addr, "engine link established");
                self.drop_link();
                self.stream = Some(stream);
                ResultCode::OK
            }
            Err(err) => {
                warn!(%addr, error = %err, "engine connection failed");
                ResultCode::PROXY_ERROR
            }
        }
    }

    fn disconnect(&mut self) -> ResultCode {
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = self.runtime.block_on(stream.shutdown()) {
                // The socket is closed on drop either way.
                debug!(error = %err, "engine link shutdown was not clean");
            }
            info!("engine link closed");
        }
        self.drop_link();
        ResultCode::OK
    }

    fn create_event(&mut self) -> EventHandle {
        self.handles.create_event()
    }

    fn create_state(&mut self) -> StateHandle {
        self.handles.create_state()
    }

    fn next_event(&mut self, event: EventHandle) -> ResultCode {
        if let Some(ready) = self.decoder.next_event() {
            return fill(&mut self.handles, event, ready);
        }

        let Some(stream) = self.stream.as_mut() else {
            return ResultCode::ENGINE_UNINITIALIZED;
        };

        let mut chunk = [0u8; READ_CHUNK];
        let window = self.config.poll_window;
        match self
            .runtime
            .block_on(async { timeout(window, stream.read(&mut chunk)).await })
        {
            Err(_) => ResultCode::NO_EVENT,
            Ok(Ok(0)) => {
                warn!("engine closed the link");
                self.drop_link();
                ResultCode::ENGINE_DISCONNECTED
            }
            Ok(Ok(n)) => {
                self.decoder.push(&chunk[..n]);
                match self.decoder.next_event() {
                    Some(ready) => fill(&mut self.handles, event, ready),
                    None => ResultCode::NO_EVENT,
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "engine link read failed");
                self.drop_link();
                ResultCode::ENGINE_DISCONNECTED
            }
        }
    }

    fn event_to_state(&mut self, event: EventHandle, state: StateHandle) -> ResultCode {
        self.handles.extract_state(event, state)
    }

    fn emo_state(&self, state: StateHandle) -> Option<&EmoState> {
        self.handles.state(state)
    }

    fn release_event(&mut self, event: EventHandle) {
        self.handles.release_event(event);
    }

    fn release_state(&mut self, state: StateHandle) {
        self.handles.release_state(state);
    }
}

fn fill(handles: &mut HandleTable, handle: EventHandle, event: EngineEvent) -> ResultCode {
    debug!(kind = ?event.kind, bytes = event.payload.len(), "engine event received");
    if handles.fill_event(handle, event) {
        ResultCode::OK
    } else {
        ResultCode::INVALID_PARAMETER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use crate::comm::encode_event;
    use crate::engine::{EventKind, HandleScope};

    fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// Accepts one client, sends `bytes`, then waits for the client to hang up.
    fn serve_once(listener: TcpListener, bytes: Vec<u8>) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket.write_all(&bytes).unwrap();
            let mut sink = Vec::new();
            let _ = socket.read_to_end(&mut sink);
        })
    }

    #[test]
    fn polls_without_link_report_uninitialized() {
        let mut engine = LinkConfig::default().build().unwrap();
        let mut scope = HandleScope::new(&mut engine);
        assert_eq!(scope.next_event(), ResultCode::ENGINE_UNINITIALIZED);
        assert_eq!(scope.extract_state(), ResultCode::INVALID_PARAMETER);
    }

    #[test]
    fn receives_emo_state_over_loopback() {
        let (listener, port) = listener();
        let frame = encode_event(&EngineEvent {
            kind: EventKind::EmoStateUpdated,
            payload: vec![0x10, 0x20],
        })
        .unwrap();
        let server = serve_once(listener, frame);

        let mut engine = LinkConfig::default()
            .with_poll_window(Duration::from_secs(2))
            .build()
            .unwrap();
        assert_eq!(engine.connect("127.0.0.1", port), ResultCode::OK);
        assert!(engine.is_linked());

        {
            let mut scope = HandleScope::new(&mut engine);
            assert_eq!(scope.next_event(), ResultCode::OK);
            assert_eq!(scope.extract_state(), ResultCode::OK);
            assert_eq!(
                scope.emo_state().map(|s| s.raw.clone()),
                Some(vec![0x10, 0x20])
            );
        }
        assert_eq!(engine.outstanding_handles(), 0);

        assert_eq!(engine.disconnect(), ResultCode::OK);
        assert!(!engine.is_linked());
        server.join().unwrap();
    }

    #[test]
    fn quiet_engine_yields_no_event() {
        let (listener, port) = listener();
        let server = serve_once(listener, Vec::new());

        let mut engine = LinkConfig::default()
            .with_poll_window(Duration::from_millis(50))
            .build()
            .unwrap();
        assert_eq!(engine.connect("127.0.0.1", port), ResultCode::OK);
        {
            let mut scope = HandleScope::new(&mut engine);
            assert_eq!(scope.next_event(), ResultCode::NO_EVENT);
        }
        engine.disconnect();
        server.join().unwrap();
    }

    #[test]
    fn peer_hangup_drops_link() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            drop(socket);
        });

        let mut engine = LinkConfig::default()
            .with_poll_window(Duration::from_secs(2))
            .build()
            .unwrap();
        assert_eq!(engine.connect("127.0.0.1", port), ResultCode::OK);
        server.join().unwrap();
        {
            let mut scope = HandleScope::new(&mut engine);
            assert_eq!(scope.next_event(), ResultCode::ENGINE_DISCONNECTED);
        }
        assert!(!engine.is_linked());
    }

    #[test]
    fn refused_connection_fails() {
        let (listener, port) = listener();
        drop(listener);

        let mut engine = LinkConfig::default().build().unwrap();
        assert_eq!(engine.connect("127.0.0.1", port), ResultCode::PROXY_ERROR);
        assert!(!engine.is_linked());
        // Nothing to close, still fine.
        assert_eq!(engine.disconnect(), ResultCode::OK);
    }
}
