//! Error type shared by every module of the crate.
//!
//! Engine call failures are not represented here: the gateway reports them
//! as [`ResultCode`](crate::engine::ResultCode) values and the shell prints
//! them to the user. This enum covers the failures that stop the shell or
//! reject a value before it reaches hardware.

use std::io;

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Terminal or socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The private runtime backing the engine link could not be built.
    #[error("failed to start the engine link runtime: {0}")]
    Runtime(#[source] io::Error),

    /// The engine did not accept the connection in time.
    #[error("connection to {addr} timed out after {ms} ms")]
    ConnectTimeout { addr: String, ms: u64 },

    /// Servo channels are numbered 1 to 6.
    #[error("servo channel {0} does not exist (expected 1..=6)")]
    InvalidServoChannel(u8),

    /// Servo positions are angles in degrees.
    #[error("servo position {0} is out of range (expected 0..=180)")]
    ServoPositionOutOfRange(u16),

    /// Settings could not be assembled from file, environment and flags.
    #[error("invalid settings: {0}")]
    Config(#[from] Box<figment::Error>),
}
