//! Session bookkeeping for the shell: whether an engine link is up and which
//! of the two well-known endpoints it is bound to.

use std::fmt;

/// Loopback address both engine applications listen on.
pub const ENGINE_HOST: &str = "127.0.0.1";

/// Port of the EmoEngine hosted by the Control Panel.
pub const CONTROL_PANEL_PORT: u16 = 3008;

/// Port of the EmoComposer emulator.
pub const EMO_COMPOSER_PORT: u16 = 1726;

/// The two applications an engine session can be opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Control Panel, port 3008. Menu index 0.
    ControlPanel,
    /// EmoComposer, port 1726. Menu index 1.
    Composer,
}

impl Endpoint {
    /// Menu order presented by the `conectar` command.
    pub const ALL: [Endpoint; 2] = [Endpoint::ControlPanel, Endpoint::Composer];

    pub fn port(self) -> u16 {
        match self {
            Endpoint::ControlPanel => CONTROL_PANEL_PORT,
            Endpoint::Composer => EMO_COMPOSER_PORT,
        }
    }

    /// Human-readable application name.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::ControlPanel => "Control Panel",
            Endpoint::Composer => "Emo Composer",
        }
    }

    /// Maps a menu selection to an endpoint. Anything but 0 or 1 is `None`.
    pub fn from_selection(selection: i64) -> Option<Endpoint> {
        usize::try_from(selection)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name(), ENGINE_HOST, self.port())
    }
}

/// Whether a session is active and where it points.
///
/// Holding the endpoint as an `Option` means "disconnected" and "no
/// endpoint" cannot disagree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    endpoint: Option<Endpoint>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the session as bound to `endpoint`. Overwrites any previous
    /// binding; the dispatcher checks [`is_connected`](Self::is_connected)
    /// first.
    pub fn connect(&mut self, endpoint: Endpoint) {
        self.endpoint = Some(endpoint);
    }

    /// Clears the session regardless of its prior state.
    pub fn disconnect(&mut self) {
        self.endpoint = None;
    }

    pub fn is_connected(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.endpoint
    }
}
