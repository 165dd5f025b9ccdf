//! In-memory [`EngineGateway`] for driving the shell without an engine.
//!
//! Result codes and events are queued up front with the `with_*` builders;
//! every call is recorded so tests can assert on what the shell asked for.

use std::collections::VecDeque;

use crate::engine::{
    EmoState, EngineEvent, EngineGateway, EventHandle, HandleTable, ResultCode, StateHandle,
};

/// A call received by [`ScriptedEngine`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Connect { host: String, port: u16 },
    Disconnect,
    NextEvent,
    EventToState,
}

/// Deterministic engine used in tests to script result codes and events.
///
/// Unscripted calls succeed, except `next_event`, which reports `NO_EVENT`,
/// and `event_to_state`, which extracts whatever the event handle holds.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    connect_codes: VecDeque<ResultCode>,
    disconnect_codes: VecDeque<ResultCode>,
    events: VecDeque<(ResultCode, Option<EngineEvent>)>,
    state_codes: VecDeque<ResultCode>,
    calls: Vec<EngineCall>,
    handles: HandleTable,
    created: usize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the code returned by the next `connect`.
    pub fn with_connect(mut self, code: ResultCode) -> Self {
        self.connect_codes.push_back(code);
        self
    }

    /// Queues the code returned by the next `disconnect`.
    pub fn with_disconnect(mut self, code: ResultCode) -> Self {
        self.disconnect_codes.push_back(code);
        self
    }

    /// Queues a `next_event` result that leaves the event handle untouched.
    pub fn with_next_event(mut self, code: ResultCode) -> Self {
        self.events.push_back((code, None));
        self
    }

    /// Queues an event delivered with `OK` by the next `next_event`.
    pub fn with_event(mut self, event: EngineEvent) -> Self {
        self.events.push_back((ResultCode::OK, Some(event)));
        self
    }

    /// Queues the code returned by the next `event_to_state`.
    pub fn with_event_to_state(mut self, code: ResultCode) -> Self {
        self.state_codes.push_back(code);
        self
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Number of disconnect calls received so far.
    pub fn disconnects(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| **call == EngineCall::Disconnect)
            .count()
    }

    /// Handles handed out and not yet released.
    pub fn outstanding_handles(&self) -> usize {
        self.handles.outstanding()
    }

    /// Handles handed out over the engine's lifetime.
    pub fn handles_created(&self) -> usize {
        self.created
    }
}

impl EngineGateway for ScriptedEngine {
    fn connect(&mut self, host: &str, port: u16) -> ResultCode {
        self.calls.push(EngineCall::Connect {
            host: host.to_string(),
            port,
        });
        self.connect_codes.pop_front().unwrap_or(ResultCode::OK)
    }

    fn disconnect(&mut self) -> ResultCode {
        self.calls.push(EngineCall::Disconnect);
        self.disconnect_codes.pop_front().unwrap_or(ResultCode::OK)
    }

    fn create_event(&mut self) -> EventHandle {
        self.created += 1;
        self.handles.create_event()
    }

    fn create_state(&mut self) -> StateHandle {
        self.created += 1;
        self.handles.create_state()
    }

    fn next_event(&mut self, event: EventHandle) -> ResultCode {
        self.calls.push(EngineCall::NextEvent);
        match self.events.pop_front() {
            Some((code, Some(delivered))) => {
                if self.handles.fill_event(event, delivered) {
                    code
                } else {
                    ResultCode::INVALID_PARAMETER
                }
            }
            Some((code, None)) => code,
            None => ResultCode::NO_EVENT,
        }
    }

    fn event_to_state(&mut self, event: EventHandle, state: StateHandle) -> ResultCode {
        self.calls.push(EngineCall::EventToState);
        match self.state_codes.pop_front() {
            Some(code) => code,
            None => self.handles.extract_state(event, state),
        }
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
