use std::time::Instant;

use tracing::{error, info};

use crate::actions::{MacroRunner, VolumeControl};
use crate::debounce::{ButtonBank, ButtonRelease, PressKind, Timing};
use crate::panel::PanelState;
use crate::presenter::Presenter;
use crate::profile::{Direction, ProfileRegistry};

/// Potentiometer changes must exceed this many points to be applied.
pub const DEFAULT_DEADZONE: u8 = 1;

const PROFILE_BUTTONS: [Direction; 2] = [Direction::Prev, Direction::Next];

/// Turns decoded panel frames into host side effects.
///
/// Owns every piece of mutable input state: both button banks, the profile
/// registry and the last applied potentiometer level. It is meant to live on
/// a single consumer thread.
pub struct InputDispatcher {
    registry: ProfileRegistry,
    macro_buttons: ButtonBank,
    profile_buttons: ButtonBank,
    deadzone: u8,
    last_applied_level: Option<u8>,
    volume: Box<dyn VolumeControl>,
    macros: Box<dyn MacroRunner>,
    presenter: Box<dyn Presenter>,
}

impl InputDispatcher {
    pub fn new(
        registry: ProfileRegistry,
        inputs: usize,
        timing: Timing,
        deadzone: u8,
        volume: Box<dyn VolumeControl>,
        macros: Box<dyn MacroRunner>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let mut macro_buttons = ButtonBank::new(inputs, timing);
        macro_buttons.rebind(&registry.current().buttons);
        Self {
            registry,
            macro_buttons,
            profile_buttons: ButtonBank::new(PROFILE_BUTTONS.len(), timing),
            deadzone,
            last_applied_level: None,
            volume,
            macros,
            presenter,
        }
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub fn last_applied_level(&self) -> Option<u8> {
        self.last_applied_level
    }

    /// Announce the starting profile to the presenter.
    pub fn announce(&mut self) {
        let profile = self.registry.current();
        self.presenter
            .profile_changed(self.registry.current_index(), &profile.name);
    }

    /// Run both debounce banks over one decoded frame.
    ///
    /// The potentiometer is not touched here; it is applied on the poll tick.
    pub fn handle_frame(&mut self, state: &PanelState, now: Instant) {
        for release in self.macro_buttons.update(&state.buttons, now) {
            self.run_macro(release);
        }

        if let Some(bits) = state.profile_buttons {
            for release in self.profile_buttons.update(&bits, now) {
                let direction = PROFILE_BUTTONS[release.index];
                info!(?direction, held_ms = release.held.as_millis() as u64, "profile button released");
                self.switch_relative(direction);
            }
        }
    }

    /// Apply `level` as the system volume unless it is within the deadzone of
    /// the last applied level. Returns whether a volume change was attempted.
    pub fn apply_potentiometer(&mut self, level: u8) -> bool {
        if let Some(last) = self.last_applied_level {
            if level.abs_diff(last) <= self.deadzone {
                return false;
            }
        }

        match self.volume.set_volume(level) {
            Ok(()) => {
                info!("set volume to {}%", level);
                self.presenter.volume_changed(level);
            }
            Err(err) => error!("failed to set volume to {}%: {}", level, err),
        }
        self.last_applied_level = Some(level);
        true
    }

    /// Activate profile `index`. Out of range indices are ignored.
    pub fn switch_to_index(&mut self, index: usize) -> bool {
        let switched = self.registry.switch_to_index(index);
        if switched {
            self.profile_switched();
        }
        switched
    }

    /// Step to the previous or next profile, clamped at both ends.
    pub fn switch_relative(&mut self, direction: Direction) -> bool {
        let switched = self.registry.switch_relative(direction);
        if switched {
            self.profile_switched();
        }
        switched
    }

    fn profile_switched(&mut self) {
        let index = self.registry.current_index();
        let profile = self.registry.current();
        self.macro_buttons.rebind(&profile.buttons);
        info!("switched to profile {} ({})", index, profile.name);
        self.presenter.profile_changed(index, &profile.name);
    }

    fn run_macro(&mut self, release: ButtonRelease) {
        let kind = match release.kind {
            PressKind::Short => "short",
            PressKind::Long => "long",
        };
        info!(
            held_ms = release.held.as_millis() as u64,
            "button {} {} pressed", release.index, kind
        );

        let Some(binding) = release.binding else {
            info!("button {} has no binding in the active profile", release.index);
            return;
        };
        let action = match release.kind {
            PressKind::Short => binding.short_press,
            PressKind::Long => binding.long_press,
        };
        if action.is_empty() {
            info!("button {} has no {} press action", release.index, kind);
            return;
        }

        if let Err(err) = self.macros.run_action(&action) {
            error!("failed to run action \"{}\": {}", action, err);
            return;
        }
        self.presenter.button_fired(release.index, release.kind, &action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use crate::profile::{Binding, Profile};
    use std::{cell::RefCell, io, rc::Rc, time::Duration};

    #[derive(Default)]
    struct Recorder {
        volumes: Vec<u8>,
        actions: Vec<String>,
        profiles: Vec<usize>,
        fail_volume: bool,
        fail_macros: bool,
    }

    #[derive(Clone, Default)]
    struct Fake(Rc<RefCell<Recorder>>);

    impl VolumeControl for Fake {
        fn set_volume(&mut self, percent: u8) -> Result<(), CapabilityError> {
            let mut rec = self.0.borrow_mut();
            rec.volumes.push(percent);
            if rec.fail_volume {
                return Err(CapabilityError::NoVolumeCommand);
            }
            Ok(())
        }
    }

    impl MacroRunner for Fake {
        fn run_action(&mut self, action: &str) -> Result<(), CapabilityError> {
            let mut rec = self.0.borrow_mut();
            if rec.fail_macros {
                return Err(CapabilityError::Spawn {
                    program: "macro".into(),
                    source: io::ErrorKind::NotFound.into(),
                });
            }
            rec.actions.push(action.to_string());
            Ok(())
        }
    }

    impl Presenter for Fake {
        fn volume_changed(&mut self, _level: u8) {}
        fn profile_changed(&mut self, index: usize, _name: &str) {
            self.0.borrow_mut().profiles.push(index);
        }
        fn button_fired(&mut self, _button: usize, _kind: PressKind, _action: &str) {}
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn dispatcher(fake: &Fake) -> InputDispatcher {
        let registry = ProfileRegistry::new(vec![
            Profile {
                name: "Desktop".into(),
                buttons: vec![Binding::new("mute", "deafen"), Binding::new("play", "")],
            },
            Profile {
                name: "Gaming".into(),
                buttons: vec![Binding::new("push", "pull")],
            },
        ])
        .unwrap();
        InputDispatcher::new(
            registry,
            8,
            Timing::default(),
            DEFAULT_DEADZONE,
            Box::new(fake.clone()),
            Box::new(fake.clone()),
            Box::new(fake.clone()),
        )
    }

    fn frame(buttons: &[usize], profile_buttons: Option<[bool; 2]>) -> PanelState {
        let mut state = PanelState {
            profile_buttons,
            ..PanelState::default()
        };
        for &b in buttons {
            state.buttons[b] = true;
        }
        state
    }

    #[test]
    fn deadzone_is_strict() {
        let fake = Fake::default();
        let mut d = dispatcher(&fake);

        assert!(d.apply_potentiometer(40));
        assert!(!d.apply_potentiometer(40));
        assert!(!d.apply_potentiometer(41));
        assert!(!d.apply_potentiometer(39));
        assert!(d.apply_potentiometer(42));
        assert_eq!(fake.0.borrow().volumes, [40, 42]);
        assert_eq!(d.last_applied_level(), Some(42));
    }

    #[test]
    fn volume_failure_is_not_fatal() {
        let fake = Fake::default();
        fake.0.borrow_mut().fail_volume = true;
        let mut d = dispatcher(&fake);

        assert!(d.apply_potentiometer(10));
        assert!(d.apply_potentiometer(50));
        assert_eq!(fake.0.borrow().volumes, [10, 50]);
    }

    #[test]
    fn short_and_long_presses_run_bound_actions() {
        let fake = Fake::default();
        let mut d = dispatcher(&fake);
        let t0 = Instant::now();

        d.handle_frame(&frame(&[0], None), t0);
        d.handle_frame(&frame(&[], None), t0 + ms(100));
        d.handle_frame(&frame(&[0], None), t0 + ms(200));
        d.handle_frame(&frame(&[], None), t0 + ms(600));

        assert_eq!(fake.0.borrow().actions, ["mute", "deafen"]);
    }

    #[test]
    fn empty_and_unbound_actions_are_skipped() {
        let fake = Fake::default();
        let mut d = dispatcher(&fake);
        let t0 = Instant::now();

        // Button 1 has no long press action, button 5 no binding at all.
        d.handle_frame(&frame(&[1, 5], None), t0);
        d.handle_frame(&frame(&[], None), t0 + ms(500));

        assert!(fake.0.borrow().actions.is_empty());
    }

    #[test]
    fn macro_failure_does_not_stop_processing() {
        let fake = Fake::default();
        fake.0.borrow_mut().fail_macros = true;
        let mut d = dispatcher(&fake);
        let t0 = Instant::now();

        d.handle_frame(&frame(&[0], None), t0);
        d.handle_frame(&frame(&[], None), t0 + ms(100));
        fake.0.borrow_mut().fail_macros = false;
        d.handle_frame(&frame(&[0], None), t0 + ms(200));
        d.handle_frame(&frame(&[], None), t0 + ms(250));

        assert_eq!(fake.0.borrow().actions, ["mute"]);
    }

    #[test]
    fn profile_buttons_cycle_and_rebind() {
        let fake = Fake::default();
        let mut d = dispatcher(&fake);
        let t0 = Instant::now();

        // Next pressed and released.
        d.handle_frame(&frame(&[], Some([false, true])), t0);
        d.handle_frame(&frame(&[], Some([false, false])), t0 + ms(80));
        assert_eq!(d.registry().current_index(), 1);

        // Next again at the last profile: clamped, no notification.
        d.handle_frame(&frame(&[], Some([false, true])), t0 + ms(200));
        d.handle_frame(&frame(&[], Some([false, false])), t0 + ms(280));
        assert_eq!(d.registry().current_index(), 1);
        assert_eq!(fake.0.borrow().profiles, [1]);

        d.handle_frame(&frame(&[0], Some([false, false])), t0 + ms(300));
        d.handle_frame(&frame(&[], Some([false, false])), t0 + ms(350));
        assert_eq!(fake.0.borrow().actions, ["push"]);

        // Button 1 is unbound in "Gaming".
        d.handle_frame(&frame(&[1], Some([false, false])), t0 + ms(400));
        d.handle_frame(&frame(&[], Some([false, false])), t0 + ms(450));
        assert_eq!(fake.0.borrow().actions, ["push"]);

        d.handle_frame(&frame(&[], Some([true, false])), t0 + ms(500));
        d.handle_frame(&frame(&[], Some([false, false])), t0 + ms(550));
        assert_eq!(d.registry().current_index(), 0);
    }

    #[test]
    fn in_flight_press_fires_binding_active_at_release() {
        let fake = Fake::default();
        let mut d = dispatcher(&fake);
        let t0 = Instant::now();

        d.handle_frame(&frame(&[0], None), t0);
        assert!(d.switch_to_index(1));
        d.handle_frame(&frame(&[], None), t0 + ms(100));

        assert_eq!(fake.0.borrow().actions, ["push"]);
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let fake = Fake::default();
        let mut d = dispatcher(&fake);
        assert!(!d.switch_to_index(7));
        assert_eq!(d.registry().current_index(), 0);
        assert!(fake.0.borrow().profiles.is_empty());
    }
}
