use std::time::{Duration, Instant};

use crate::profile::Binding;

/// Minimum spacing between two accepted press edges on one button.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);
/// Holds at or above this duration count as long presses.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(300);

/// Timing parameters shared by every button in a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub debounce: Duration,
    pub long_press: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            long_press: DEFAULT_LONG_PRESS,
        }
    }
}

/// Classification of a completed press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Short,
    Long,
}

impl PressKind {
    pub fn classify(held: Duration, long_press: Duration) -> Self {
        if held < long_press {
            PressKind::Short
        } else {
            PressKind::Long
        }
    }
}

/// Emitted when a pressed button is let go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonRelease {
    pub index: usize,
    pub kind: PressKind,
    pub held: Duration,
    /// Binding active at release time, if any.
    pub binding: Option<Binding>,
}

/// Debounce state of one physical button.
///
/// Idle while `previous_signal` is low, Pressed while it is high. A press is
/// only acted on when it is released, so the hold duration can be classified.
#[derive(Debug, Clone, Default)]
pub struct ButtonState {
    pub previous_signal: bool,
    pub last_debounce: Option<Instant>,
    pub pressed_at: Option<Instant>,
    pub released_at: Option<Instant>,
    pub binding: Option<Binding>,
}

impl ButtonState {
    /// Feed one raw sample. Returns the hold duration when a press completes.
    pub fn step(&mut self, raw: bool, now: Instant, timing: &Timing) -> Option<Duration> {
        match (self.previous_signal, raw) {
            (false, true) => {
                let settled = self
                    .last_debounce
                    .map_or(true, |last| now.saturating_duration_since(last) >= timing.debounce);
                if settled {
                    self.last_debounce = Some(now);
                    self.pressed_at = Some(now);
                    self.previous_signal = true;
                }
                None
            }
            (true, false) => {
                self.released_at = Some(now);
                self.previous_signal = false;
                let pressed_at = self.pressed_at.unwrap_or(now);
                Some(now.saturating_duration_since(pressed_at))
            }
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn is_pressed(&self) -> bool {
        self.previous_signal
    }
}

/// A fixed set of buttons sharing one timing configuration.
#[derive(Debug, Clone)]
pub struct ButtonBank {
    timing: Timing,
    states: Vec<ButtonState>,
}

impl ButtonBank {
    pub fn new(len: usize, timing: Timing) -> Self {
        Self {
            timing,
            states: vec![ButtonState::default(); len],
        }
    }

    #[cfg(test)]
    pub fn state(&self, index: usize) -> Option<&ButtonState> {
        self.states.get(index)
    }

    /// Replace every button's binding with the one at the same index in
    /// `bindings`. Buttons past the end of `bindings` become unbound.
    /// Press timing is left untouched.
    pub fn rebind(&mut self, bindings: &[Binding]) {
        for (i, state) in self.states.iter_mut().enumerate() {
            state.binding = bindings.get(i).cloned();
        }
    }

    /// Feed one sample per button; samples beyond the bank size are ignored.
    pub fn update(&mut self, raw: &[bool], now: Instant) -> Vec<ButtonRelease> {
        let timing = self.timing;
        self.states
            .iter_mut()
            .zip(raw)
            .enumerate()
            .filter_map(|(index, (state, &bit))| {
                let held = state.step(bit, now, &timing)?;
                Some(ButtonRelease {
                    index,
                    kind: PressKind::classify(held, timing.long_press),
                    held,
                    binding: state.binding.clone(),
                })
            })
            .collect()
    }
}
