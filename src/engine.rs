//! The boundary between the shell and the EmoEngine.
//!
//! [`EngineGateway`] is the contract every engine backend implements: the
//! TCP link in [`device`](crate::device) for real sessions and the
//! [`ScriptedEngine`](crate::fake::ScriptedEngine) for tests. Calls report
//! their outcome as a [`ResultCode`] the way the engine itself does; only
//! `OK` counts as success.
//!
//! Event and state handles are allocated by the engine. Use a
//! [`HandleScope`] to hold them so they are released on every path.

use std::collections::HashMap;
use std::fmt;

/// Numeric status returned by every engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub u32);

impl ResultCode {
    pub const OK: ResultCode = ResultCode(0x0000);
    pub const UNKNOWN_ERROR: ResultCode = ResultCode(0x0001);
    pub const INVALID_PARAMETER: ResultCode = ResultCode(0x0302);
    pub const ENGINE_UNINITIALIZED: ResultCode = ResultCode(0x0500);
    pub const ENGINE_DISCONNECTED: ResultCode = ResultCode(0x0501);
    pub const PROXY_ERROR: ResultCode = ResultCode(0x0502);
    pub const NO_EVENT: ResultCode = ResultCode(0x0600);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of event published by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    EmulatorError,
    UserAdded,
    UserRemoved,
    /// A new EmoState is attached to the event.
    EmoStateUpdated,
    ProfileEvent,
    CognitivEvent,
    ExpressivEvent,
    InternalStateChanged,
    /// Reserved or unrecognised kind.
    Unknown,
}

impl From<u16> for EventKind {
    fn from(value: u16) -> Self {
        match value {
            0x0001 => EventKind::EmulatorError,
            0x0010 => EventKind::UserAdded,
            0x0020 => EventKind::UserRemoved,
            0x0040 => EventKind::EmoStateUpdated,
            0x0080 => EventKind::ProfileEvent,
            0x0100 => EventKind::CognitivEvent,
            0x0200 => EventKind::ExpressivEvent,
            0x0400 => EventKind::InternalStateChanged,
            _ => EventKind::Unknown,
        }
    }
}

impl From<EventKind> for u16 {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::EmulatorError => 0x0001,
            EventKind::UserAdded => 0x0010,
            EventKind::UserRemoved => 0x0020,
            EventKind::EmoStateUpdated => 0x0040,
            EventKind::ProfileEvent => 0x0080,
            EventKind::CognitivEvent => 0x0100,
            EventKind::ExpressivEvent => 0x0200,
            EventKind::InternalStateChanged => 0x0400,
            EventKind::Unknown => 0x0000,
        }
    }
}

/// One event pulled off the engine queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub kind: EventKind,
    /// Bytes following the kind; the EmoState for `EmoStateUpdated`.
    pub payload: Vec<u8>,
}

/// Brain state snapshot extracted from an `EmoStateUpdated` event.
///
/// The shell does not decode it; the bytes are kept as the engine sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmoState {
    pub raw: Vec<u8>,
}

/// Engine-allocated event buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(pub u32);

/// Engine-allocated state buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHandle(pub u32);

/// Operations the shell needs from the EmoEngine. All calls block.
pub trait EngineGateway {
    /// Opens a session with the engine listening on `host:port`.
    fn connect(&mut self, host: &str, port: u16) -> ResultCode;

    /// Closes the current session, if any.
    fn disconnect(&mut self) -> ResultCode;

    fn create_event(&mut self) -> EventHandle;

    fn create_state(&mut self) -> StateHandle;

    /// Pulls the next pending event into `event`, polling once.
    fn next_event(&mut self, event: EventHandle) -> ResultCode;

    /// Copies the EmoState carried by `event` into `state`.
    fn event_to_state(&mut self, event: EventHandle, state: StateHandle) -> ResultCode;

    /// Contents of a state buffer, if it holds one.
    fn emo_state(&self, state: StateHandle) -> Option<&EmoState>;

    fn release_event(&mut self, event: EventHandle);

    fn release_state(&mut self, state: StateHandle);
}

/// Buffers behind the handles a gateway has handed out.
#[derive(Debug, Default)]
pub struct HandleTable {
    next_id: u32,
    events: HashMap<EventHandle, Option<EngineEvent>>,
    states: HashMap<StateHandle, Option<EmoState>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    pub fn create_event(&mut self) -> EventHandle {
        let handle = EventHandle(self.allocate_id());
        self.events.insert(handle, None);
        handle
    }

    pub fn create_state(&mut self) -> StateHandle {
        let handle = StateHandle(self.allocate_id());
        self.states.insert(handle, None);
        handle
    }

    /// Stores `event` behind `handle`. Returns false for unknown handles.
    pub fn fill_event(&mut self, handle: EventHandle, event: EngineEvent) -> bool {
        match self.events.get_mut(&handle) {
            Some(slot) => {
                *slot = Some(event);
                true
            }
            None => false,
        }
    }

    /// Copies the EmoState of an `EmoStateUpdated` event into `state`.
    pub fn extract_state(&mut self, event: EventHandle, state: StateHandle) -> ResultCode {
        let raw = match self.events.get(&event) {
            Some(Some(EngineEvent {
                kind: EventKind::EmoStateUpdated,
                payload,
            })) => payload.clone(),
            _ => return ResultCode::INVALID_PARAMETER,
        };
        match self.states.get_mut(&state) {
            Some(slot) => {
                *slot = Some(EmoState { raw });
                ResultCode::OK
            }
            None => ResultCode::INVALID_PARAMETER,
        }
    }

    pub fn state(&self, handle: StateHandle) -> Option<&EmoState> {
        self.states.get(&handle).and_then(Option::as_ref)
    }

    pub fn release_event(&mut self, handle: EventHandle) {
        self.events.remove(&handle);
    }

    pub fn release_state(&mut self, handle: StateHandle) {
        self.states.remove(&handle);
    }

    /// Number of handles not yet released.
    pub fn outstanding(&self) -> usize {
        self.events.len() + self.states.len()
    }
}

/// Holds one event handle and one state handle for the duration of a read
/// and releases both when dropped.
pub struct HandleScope<'g, G: EngineGateway + ?Sized> {
    gateway: &'g mut G,
    event: EventHandle,
    state: StateHandle,
}

impl<'g, G: EngineGateway + ?Sized> HandleScope<'g, G> {
    pub fn new(gateway: &'g mut G) -> Self {
        let event = gateway.create_event();
        let state = gateway.create_state();
        Self {
            gateway,
            event,
            state,
        }
    }

    pub fn next_event(&mut self) -> ResultCode {
        self.gateway.next_event(self.event)
    }

    pub fn extract_state(&mut self) -> ResultCode {
        self.gateway.event_to_state(self.event, self.state)
    }

    pub fn emo_state(&self) -> Option<&EmoState> {
        self.gateway.emo_state(self.state)
    }
}

impl<G: EngineGateway + ?Sized> Drop for HandleScope<'_, G> {
    fn drop(&mut self) {
        self.gateway.release_state(self.state);
        self.gateway.release_event(self.event);
    }
}
