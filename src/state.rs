use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::error::FaultRecord;
use crate::laps::LapEvent;
use crate::sim_loop::LoopState;
use crate::vehicle::types::{ControlInput, ShiftRequest, VehicleState};

/// Lifecycle requests queued by clients, applied by the loop owner between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
}

/// Server → client messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage<'a> {
    Welcome { client_id: Uuid, vehicle: &'a str },
    Snapshot { state: &'a VehicleState, #[serde(rename = "loop")] loop_state: LoopState },
    Lap(&'a LapEvent),
    Fault(&'a FaultRecord),
    Pong,
}

impl ServerMessage<'_> {
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

pub struct SharedSession {
    pub vehicle: String,
    pub clients: HashMap<Uuid, UnboundedSender<String>>,
    input: ControlInput,
    pending: VecDeque<Command>,
}

impl SharedSession {
    pub fn new(vehicle: impl Into<String>) -> Self {
        Self {
            vehicle: vehicle.into(),
            clients: HashMap::new(),
            input: ControlInput::default(),
            pending: VecDeque::new(),
        }
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.insert(id, tx);
        id
    }

    pub fn remove_client(&mut self, id: &Uuid) {
        self.clients.remove(id);
        // a driver who leaves lets go of the pedals
        if self.clients.is_empty() {
            self.input = ControlInput::default();
        }
    }

    /// Latest sample wins; an unconsumed shift request survives until taken.
    pub fn update_input(&mut self, input: ControlInput) {
        let shift = match input.shift {
            ShiftRequest::None => self.input.shift,
            s => s,
        };
        self.input = ControlInput { shift, ..input };
    }

    /// Input for the next poll. The shift request is handed out once.
    pub fn take_input(&mut self) -> ControlInput {
        let input = self.input;
        self.input.shift = ShiftRequest::None;
        input
    }

    pub fn push_command(&mut self, cmd: Command) {
        self.pending.push_back(cmd);
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        self.pending.drain(..).collect()
    }

    /// Send a serialized message to every connected client.
    pub fn broadcast(&self, json: &str) {
        for tx in self.clients.values() {
            let _ = tx.send(json.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_shift_is_handed_out_once() {
        let mut s = SharedSession::new("gt86");
        s.update_input(ControlInput { shift: ShiftRequest::Up, ..ControlInput::new(0.5, 0.0, 0.0) });
        // a later sample without a request must not swallow it
        s.update_input(ControlInput::new(0.7, 0.0, 0.1));

        let first = s.take_input();
        assert_eq!(first.shift, ShiftRequest::Up);
        assert_eq!(first.throttle, 0.7);
        assert_eq!(s.take_input().shift, ShiftRequest::None);
    }

    #[test]
    fn test_broadcast_reaches_all_clients() {
        let mut s = SharedSession::new("gt86");
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = s.register_client(tx_a);
        s.register_client(tx_b);

        s.broadcast("{\"type\":\"pong\"}");
        assert_eq!(rx_a.try_recv().unwrap(), "{\"type\":\"pong\"}");
        assert_eq!(rx_b.try_recv().unwrap(), "{\"type\":\"pong\"}");

        s.remove_client(&a);
        assert_eq!(s.clients.len(), 1);
    }

    #[test]
    fn test_commands_drain_in_order() {
        let mut s = SharedSession::new("gt86");
        s.push_command(Command::Pause);
        s.push_command(Command::Resume);
        assert_eq!(s.drain_commands(), vec![Command::Pause, Command::Resume]);
        assert!(s.drain_commands().is_empty());
    }

    #[test]
    fn test_server_message_shape() {
        let json = ServerMessage::Pong.to_json().unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);

        let ev = LapEvent { lap: 1, lap_time: 3.0, best: true };
        let v: serde_json::Value =
            serde_json::from_str(&ServerMessage::Lap(&ev).to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "lap");
        assert_eq!(v["lap"], 1);
    }
}
