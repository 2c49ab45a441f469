//! Bridge configuration.
//!
//! Read once at startup from YAML. Since YAML is a superset of JSON, the
//! older `configuration.json` files (`ArduinoPort`, `InputNumber`, ...) load
//! unchanged through the field aliases below.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::debounce::{Timing, DEFAULT_DEBOUNCE, DEFAULT_LONG_PRESS};
use crate::dispatcher::DEFAULT_DEADZONE;
use crate::error::ConfigError;
use crate::panel::{ButtonPolarity, FrameLayout, MAX_BUTTONS};
use crate::profile::Profile;

pub const DEFAULT_CONFIG_PATH: &str = "configuration.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(alias = "ArduinoPort")]
    pub port: String,
    #[serde(default = "default_input_number", alias = "InputNumber")]
    pub input_number: usize,
    #[serde(default, alias = "LogLevel")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(alias = "AHKExecutablePath")]
    pub macro_executable: PathBuf,
    #[serde(default)]
    pub profile_buttons: bool,
    #[serde(default)]
    pub button_polarity: ButtonPolarity,
    #[serde(default)]
    pub volume_command: Option<Vec<String>>,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(alias = "Profiles")]
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub debounce_ms: u64,
    pub long_press_ms: u64,
    pub deadzone: u8,
    pub poll_hz: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            long_press_ms: DEFAULT_LONG_PRESS.as_millis() as u64,
            deadzone: DEFAULT_DEADZONE,
            poll_hz: 20,
        }
    }
}

impl TimingConfig {
    pub fn button_timing(&self) -> Timing {
        Timing {
            debounce: Duration::from_millis(self.debounce_ms),
            long_press: Duration::from_millis(self.long_press_ms),
        }
    }

    /// Period of the potentiometer apply tick.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(1) / self.poll_hz.max(1)
    }
}

fn default_input_number() -> usize {
    MAX_BUTTONS
}

/// Non-fatal problems found in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigViolation {
    TooManyInputs { configured: usize },
    NoInputs,
    TooManyBindings { profile: String, bound: usize, inputs: usize },
    EmptyBinding { profile: String, button: usize },
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigViolation::TooManyInputs { configured } => write!(
                f,
                "input_number {configured} exceeds the {MAX_BUTTONS} buttons supported by hardware, using {MAX_BUTTONS}"
            ),
            ConfigViolation::NoInputs => write!(f, "input_number is 0, macro buttons are disabled"),
            ConfigViolation::TooManyBindings {
                profile,
                bound,
                inputs,
            } => write!(
                f,
                "profile \"{profile}\" binds {bound} buttons but only {inputs} inputs exist, extra bindings are ignored"
            ),
            ConfigViolation::EmptyBinding { profile, button } => write!(
                f,
                "profile \"{profile}\" button {button} has both actions unassigned"
            ),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        if config.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }
        Ok(config)
    }

    /// Number of macro buttons actually tracked.
    pub fn inputs(&self) -> usize {
        self.input_number.min(MAX_BUTTONS)
    }

    pub fn frame_layout(&self) -> FrameLayout {
        FrameLayout::from_profile_buttons(self.profile_buttons)
    }

    pub fn violations(&self) -> Vec<ConfigViolation> {
        let mut found = Vec::new();
        if self.input_number > MAX_BUTTONS {
            found.push(ConfigViolation::TooManyInputs {
                configured: self.input_number,
            });
        }
        if self.input_number == 0 {
            found.push(ConfigViolation::NoInputs);
        }
        for profile in &self.profiles {
            if profile.buttons.len() > self.inputs() {
                found.push(ConfigViolation::TooManyBindings {
                    profile: profile.name.clone(),
                    bound: profile.buttons.len(),
                    inputs: self.inputs(),
                });
            }
            for (button, binding) in profile.buttons.iter().enumerate() {
                if binding.is_empty() {
                    found.push(ConfigViolation::EmptyBinding {
                        profile: profile.name.clone(),
                        button,
                    });
                }
            }
        }
        found
    }
}
