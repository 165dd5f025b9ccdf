//! emotiv-servos is an interactive shell for an Emotiv EPOC headset session.
//! It connects to the EmoEngine served by the Control Panel or the
//! EmoComposer, polls the events the engine has queued, and carries the
//! servo interface of a six-servo prosthetic forearm.

pub mod comm;
pub mod command;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod fake;
pub mod servo;
pub mod state;

pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use crate::comm::encode_event;
    use crate::engine::{EngineEvent, EngineGateway, EventKind};

    /// Doing an all-in-one session against a loopback engine: connect,
    /// read one EmoState, exit. The engine side sends a single
    /// `EmoStateUpdated` frame and waits for the shell to hang up.
    #[test]
    fn test_session_against_loopback_engine() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind engine");
        let port = listener.local_addr().unwrap().port();
        let engine_side = thread::spawn(move || {
            let (mut socket, _) = listener.accept().expect("No shell connected");
            let frame = encode_event(&EngineEvent {
                kind: EventKind::EmoStateUpdated,
                payload: vec![1, 2, 3],
            })
            .unwrap();
            socket.write_all(&frame).unwrap();
            let mut rest = Vec::new();
            let _ = socket.read_to_end(&mut rest);
        });

        let mut engine = device::LinkConfig::default()
            .with_poll_window(Duration::from_secs(2))
            .build()
            .expect("Failed to build engine link");
        assert!(engine.connect(state::ENGINE_HOST, port).is_ok());

        let mut shell = dispatcher::Dispatcher::new(engine, "ler\nexit\n".as_bytes(), Vec::new());
        shell.run().expect("Shell failed");

        let out = String::from_utf8(shell.output().clone()).unwrap();
        println!("{out}");
        assert!(out.contains("0 0 0 0 0 0 0 0 0 0\n0 0 0 0 0 0 0 0 0 0\n"));
        assert!(!shell.gateway().is_linked());
        assert_eq!(shell.gateway().outstanding_handles(), 0);
        engine_side.join().unwrap();
    }
}
