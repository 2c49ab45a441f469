use serde::Deserialize;

/// Actions run by a macro button on short and long presses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Binding {
    #[serde(default, alias = "shortPressAction")]
    pub short_press: String,
    #[serde(default, alias = "longPressAction")]
    pub long_press: String,
}

impl Binding {
    #[cfg(test)]
    pub fn new(short_press: impl Into<String>, long_press: impl Into<String>) -> Self {
        Self {
            short_press: short_press.into(),
            long_press: long_press.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.short_press.is_empty() && self.long_press.is_empty()
    }
}

/// A named set of button bindings, indexed by button number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Buttons")]
    pub buttons: Vec<Binding>,
}

/// Direction for relative profile switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Ordered profiles plus the active one.
///
/// Never empty: construction fails on an empty list. Switching clamps at both
/// ends instead of wrapping around.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<Profile>,
    current: usize,
}

impl ProfileRegistry {
    pub fn new(profiles: Vec<Profile>) -> Option<Self> {
        if profiles.is_empty() {
            return None;
        }
        Some(Self {
            profiles,
            current: 0,
        })
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Profile {
        &self.profiles[self.current]
    }

    /// Activate profile `index`. Returns `false` (and changes nothing) when
    /// the index is out of range.
    pub fn switch_to_index(&mut self, index: usize) -> bool {
        if index >= self.profiles.len() {
            return false;
        }
        self.current = index;
        true
    }

    /// Step to the neighbouring profile. Returns `false` at either end.
    pub fn switch_relative(&mut self, direction: Direction) -> bool {
        let target = match direction {
            Direction::Prev => self.current.checked_sub(1),
            Direction::Next => Some(self.current + 1).filter(|&i| i < self.profiles.len()),
        };
        match target {
            Some(index) => self.switch_to_index(index),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(names: &[&str]) -> ProfileRegistry {
        ProfileRegistry::new(
            names
                .iter()
                .map(|name| Profile {
                    name: name.to_string(),
                    buttons: vec![],
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_profile_list() {
        assert!(ProfileRegistry::new(vec![]).is_none());
    }

    #[test]
    fn switches_by_index() {
        let mut reg = registry(&["a", "b", "c"]);
        assert!(reg.switch_to_index(2));
        assert_eq!(reg.current().name, "c");
        assert!(!reg.switch_to_index(3));
        assert_eq!(reg.current_index(), 2);
    }

    #[test]
    fn relative_switch_clamps_at_ends() {
        let mut reg = registry(&["a", "b"]);
        assert!(!reg.switch_relative(Direction::Prev));
        assert_eq!(reg.current_index(), 0);

        assert!(reg.switch_relative(Direction::Next));
        assert_eq!(reg.current_index(), 1);
        assert!(!reg.switch_relative(Direction::Next));
        assert_eq!(reg.current_index(), 1);

        assert!(reg.switch_relative(Direction::Prev));
        assert_eq!(reg.current().name, "a");
    }

    #[test]
    fn single_profile_never_moves() {
        let mut reg = registry(&["only"]);
        assert!(!reg.switch_relative(Direction::Next));
        assert!(!reg.switch_relative(Direction::Prev));
        assert_eq!(reg.profile_count(), 1);
    }
}
