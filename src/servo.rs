//! Output side of the forearm: six servos reached over a serial link.
//!
//! Nothing in the shell drives the servos yet. This module fixes the shape
//! of a servo command and the two seams a driver plugs into: [`ServoLink`]
//! for transmission and [`StateMapper`] for turning an EmoState into
//! commands.

use tracing::debug;

use crate::engine::EmoState;
use crate::{Error, Result};

/// Number of servos on the forearm.
pub const SERVO_COUNT: u8 = 6;

/// Largest servo angle, in degrees.
pub const MAX_POSITION: u16 = 180;

/// A servo channel, 1 to 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServoChannel(u8);

impl ServoChannel {
    pub fn new(channel: u8) -> Result<Self> {
        if (1..=SERVO_COUNT).contains(&channel) {
            Ok(Self(channel))
        } else {
            Err(Error::InvalidServoChannel(channel))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All six channels in order.
    pub fn all() -> impl Iterator<Item = ServoChannel> {
        (1..=SERVO_COUNT).map(ServoChannel)
    }
}

impl TryFrom<u8> for ServoChannel {
    type Error = Error;

    fn try_from(channel: u8) -> Result<Self> {
        Self::new(channel)
    }
}

/// Move one servo to an angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCommand {
    pub channel: ServoChannel,
    /// Degrees, 0 to 180.
    pub position: u16,
}

impl ServoCommand {
    pub fn new(channel: u8, position: u16) -> Result<Self> {
        if position > MAX_POSITION {
            return Err(Error::ServoPositionOutOfRange(position));
        }
        Ok(Self {
            channel: ServoChannel::new(channel)?,
            position,
        })
    }
}

/// Transmits servo commands to the forearm controller.
pub trait ServoLink {
    fn send_servo_command(&mut self, command: ServoCommand) -> Result<()>;
}

/// Turns an extracted EmoState into servo commands.
pub trait StateMapper {
    fn map_state(&self, state: &EmoState) -> Vec<ServoCommand>;
}

/// Link that accepts every command and only logs it.
#[derive(Debug, Default)]
pub struct NullServoLink {
    sent: usize,
}

impl NullServoLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl ServoLink for NullServoLink {
    fn send_servo_command(&mut self, command: ServoCommand) -> Result<()> {
        debug!(
            channel = command.channel.get(),
            position = command.position,
            "servo command discarded"
        );
        self.sent += 1;
        Ok(())
    }
}
