//! Runtime configuration.
//!
//! A [`Config`] gathers the hub, bus, session and backend tunables plus the
//! level's gate network. It loads from TOML or JSON (picked by file
//! extension); every section is optional and falls back to defaults.
//!
//! ```toml
//! [hub]
//! slot_count = 2
//! controller_scale = 10.0
//!
//! [signals]
//! max_cascade_depth = 64
//!
//! [[gates]]
//! kind = "And"
//! inputs = [1, 2]
//! output = 3
//! ```

use crate::error::ConfigError;
use crate::gate::{Gate, GateSpec};
use crate::hub::HubSettings;
use crate::signal::{SignalBus, SignalSettings, CHANNEL_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tracing::info;

/// Which input backends to start, and how.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Windows Raw Input mice.
    pub rawinput: bool,
    /// Windows XInput pads.
    pub xinput: bool,
    /// gilrs gamepads (`gamepad` feature).
    pub gamepad: bool,
    /// Poll period for polled devices.
    pub poll_interval_ms: u64,
    /// Stick deflection treated as zero.
    pub stick_deadzone: f32,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            rawinput: true,
            xinput: true,
            gamepad: false,
            poll_interval_ms: 8,
            stick_deadzone: 0.15,
        }
    }
}

impl BackendSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Cursor interaction tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Radius of the click overlap query.
    pub interaction_range: f32,
    /// Cap on the motion a cursor can bank between two consumer reads.
    pub max_pending_motion: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            interaction_range: 1.5,
            max_pending_motion: 400.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hub: HubSettings,
    pub signals: SignalSettings,
    pub session: SessionSettings,
    pub backends: BackendSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gates: Vec<GateSpec>,
}

impl Config {
    /// Load from a `.toml` or `.json` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config = match ext.as_str() {
            "toml" => Self::from_toml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            other => return Err(ConfigError::UnknownFormat(other.to_string())),
        };
        info!(path = %path.display(), gates = config.gates.len(), "config loaded");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.slot_count == 0 {
            return Err(ConfigError::Invalid("hub.slot_count must be at least 1".into()));
        }
        for (name, scale) in [
            ("hub.pointer_scale", self.hub.pointer_scale),
            ("hub.controller_scale", self.hub.controller_scale),
        ] {
            if !scale.is_finite() || scale < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite non-negative number, got {scale}"
                )));
            }
        }
        let deadzone = self.backends.stick_deadzone;
        if !(0.0..1.0).contains(&deadzone) {
            return Err(ConfigError::Invalid(format!(
                "backends.stick_deadzone must be in [0, 1), got {deadzone}"
            )));
        }
        if self.signals.max_cascade_depth == Some(0) {
            return Err(ConfigError::Invalid(
                "signals.max_cascade_depth must be at least 1".into(),
            ));
        }
        for (i, gate) in self.gates.iter().enumerate() {
            if gate.inputs.is_empty() {
                return Err(ConfigError::Invalid(format!("gates[{i}] has no inputs")));
            }
            if let Some(&bad) = gate
                .inputs
                .iter()
                .chain(std::iter::once(&gate.output))
                .find(|&&c| c >= CHANNEL_COUNT)
            {
                return Err(ConfigError::Invalid(format!(
                    "gates[{i}] uses channel {bad}, bus has {CHANNEL_COUNT}"
                )));
            }
        }
        Ok(())
    }

    /// Attach every configured gate to `bus`.
    pub fn build_gates(&self, bus: &mut SignalBus) -> Vec<Rc<Gate>> {
        self.gates
            .iter()
            .map(|spec| Gate::from_spec(spec).attach(bus))
            .collect()
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateKind;

    #[test]
    fn empty_toml_is_default() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [hub]
            slot_count = 2

            [signals]
            max_cascade_depth = 32

            [[gates]]
            kind = "Xor"
            inverted = true
            inputs = [4, 5]
            output = 6
            "#,
        )
        .expect("parse");
        assert_eq!(config.hub.slot_count, 2);
        assert_eq!(config.hub.pointer_scale, 1.0);
        assert_eq!(config.signals.max_cascade_depth, Some(32));
        assert_eq!(config.gates.len(), 1);
        assert_eq!(config.gates[0].kind, GateKind::Xor);
        assert!(config.gates[0].inverted);
    }

    #[test]
    fn json_gates() {
        let config = Config::from_json_str(
            r#"{ "gates": [ { "kind": "And", "inputs": [1, 2], "output": 3 } ] }"#,
        )
        .expect("parse");
        assert!(!config.gates[0].inverted);

        let mut bus = SignalBus::default();
        let gates = config.build_gates(&mut bus);
        assert_eq!(gates.len(), 1);
        bus.set(1, true);
        bus.set(2, true);
        assert!(bus.get(3));
    }

    #[test]
    fn rejects_out_of_range_channels() {
        let err = Config::from_toml_str(
            r#"
            [[gates]]
            kind = "Or"
            inputs = [1, 200]
            output = 3
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_deadzone_and_scales() {
        for text in [
            "[backends]\nstick_deadzone = 1.0",
            "[backends]\nstick_deadzone = -0.1",
            "[backends]\nstick_deadzone = nan",
            "[hub]\npointer_scale = -2.0",
            "[hub]\ncontroller_scale = inf",
        ] {
            let err = Config::from_toml_str(text).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{text}");
        }
        let config = Config::from_toml_str("[backends]\nstick_deadzone = 0.0").expect("parse");
        assert_eq!(config.backends.stick_deadzone, 0.0);
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = Config::default().to_toml_string().expect("serialize");
        assert_eq!(Config::from_toml_str(&text).expect("parse"), Config::default());
    }
}
