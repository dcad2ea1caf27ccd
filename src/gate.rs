//! Logic gates over signal channels.
//!
//! A gate listens on its input channels. On any edge from one of them it
//! recomputes its function over the *current* values of all inputs and writes
//! the result to its output channel. The bus's edge filter keeps unchanged
//! outputs silent, so chains of gates settle within the triggering write.
//!
//! ```
//! use multimouse::gate::{Gate, GateKind};
//! use multimouse::signal::SignalBus;
//!
//! let mut bus = SignalBus::default();
//! let _and = Gate::new(GateKind::And, vec![1, 2], 3).attach(&mut bus);
//!
//! bus.set(1, true);
//! assert!(!bus.get(3));
//! bus.set(2, true);
//! assert!(bus.get(3));
//! ```

use crate::signal::{ChannelId, ListenerId, SignalBus, SignalListener};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Boolean function of a gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    /// True when every input is true.
    And,
    /// True when any input is true.
    Or,
    /// True when an odd number of inputs are true.
    Xor,
}

/// Serializable gate description (level files, config).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateSpec {
    pub kind: GateKind,
    #[serde(default)]
    pub inverted: bool,
    pub inputs: Vec<ChannelId>,
    pub output: ChannelId,
}

pub struct Gate {
    kind: GateKind,
    inverted: bool,
    inputs: SmallVec<[ChannelId; 4]>,
    output: ChannelId,
    registrations: RefCell<Vec<(ChannelId, ListenerId)>>,
}

impl Gate {
    pub fn new(kind: GateKind, inputs: impl IntoIterator<Item = ChannelId>, output: ChannelId) -> Self {
        Self {
            kind,
            inverted: false,
            inputs: inputs.into_iter().collect(),
            output,
            registrations: RefCell::new(Vec::new()),
        }
    }

    /// Negate the output (NAND, NOR, XNOR).
    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn from_spec(spec: &GateSpec) -> Self {
        Self::new(spec.kind, spec.inputs.iter().copied(), spec.output).inverted(spec.inverted)
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    pub fn inputs(&self) -> &[ChannelId] {
        &self.inputs
    }

    pub fn output(&self) -> ChannelId {
        self.output
    }

    /// Register on every input channel. Duplicate inputs register once.
    pub fn attach(self, bus: &mut SignalBus) -> Rc<Gate> {
        let gate = Rc::new(self);
        let mut seen: SmallVec<[ChannelId; 4]> = SmallVec::new();
        for &input in gate.inputs.iter() {
            if seen.contains(&input) {
                continue;
            }
            seen.push(input);
            if let Some(id) = bus.add_listener(input, gate.clone()) {
                gate.registrations.borrow_mut().push((input, id));
            }
        }
        debug!(gate = %gate.label(), "gate attached");
        gate
    }

    /// Unregister from every input channel.
    pub fn detach(&self, bus: &mut SignalBus) {
        for (channel, id) in self.registrations.borrow_mut().drain(..) {
            bus.remove_listener(channel, id);
        }
    }

    /// Gate function over the bus's current input values.
    pub fn evaluate(&self, bus: &SignalBus) -> bool {
        let mut values = self.inputs.iter().map(|&c| bus.get(c));
        let result = match self.kind {
            GateKind::And => values.all(|v| v),
            GateKind::Or => values.any(|v| v),
            GateKind::Xor => values.fold(false, |acc, v| acc ^ v),
        };
        result ^ self.inverted
    }

    /// Descriptive name, e.g. `NandGate_1-2_3` or `XnorGate_4_5`.
    pub fn label(&self) -> String {
        let base = match (self.kind, self.inverted) {
            (GateKind::And, false) => "And",
            (GateKind::Or, false) => "Or",
            (GateKind::Xor, false) => "Xor",
            (GateKind::And, true) => "Nand",
            (GateKind::Or, true) => "Nor",
            (GateKind::Xor, true) => "Xnor",
        };
        let inputs: Vec<String> = self.inputs.iter().map(|c| c.to_string()).collect();
        format!("{base}Gate_{}_{}", inputs.join("-"), self.output)
    }
}

impl SignalListener for Gate {
    fn on_signal(&self, bus: &mut SignalBus, channel: ChannelId) {
        if !self.inputs.contains(&channel) {
            return;
        }
        let result = self.evaluate(bus);
        bus.set(self.output, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(Gate::new(GateKind::And, [1, 2], 3).label(), "AndGate_1-2_3");
        assert_eq!(
            Gate::new(GateKind::And, [1, 2], 3).inverted(true).label(),
            "NandGate_1-2_3"
        );
        assert_eq!(
            Gate::new(GateKind::Xor, [4], 5).inverted(true).label(),
            "XnorGate_4_5"
        );
        assert_eq!(Gate::new(GateKind::Or, [0, 9], 7).inverted(true).label(), "NorGate_0-9_7");
    }

    #[test]
    fn xor_counts_true_inputs() {
        let mut bus = SignalBus::default();
        let gate = Gate::new(GateKind::Xor, [1, 2, 3], 10);
        bus.set(1, true);
        bus.set(2, true);
        assert!(!gate.evaluate(&bus));
        bus.set(3, true);
        assert!(gate.evaluate(&bus));
    }

    #[test]
    fn duplicate_inputs_register_once() {
        let mut bus = SignalBus::default();
        let gate = Gate::new(GateKind::Or, [1, 1, 2], 3).attach(&mut bus);
        assert_eq!(bus.listener_count(1), 1);
        assert_eq!(bus.listener_count(2), 1);
        gate.detach(&mut bus);
        assert_eq!(bus.listener_count(1), 0);
        assert_eq!(bus.listener_count(2), 0);
    }
}
