use crate::debounce::PressKind;

/// Presentation side of the bridge: a terminal, a tray icon, a window.
///
/// Notifications are best-effort and must not block.
pub trait Presenter {
    fn volume_changed(&mut self, level: u8);
    fn profile_changed(&mut self, index: usize, name: &str);
    fn button_fired(&mut self, button: usize, kind: PressKind, action: &str);
}

/// Writes a one-line status to stdout for every notification.
#[derive(Debug, Clone)]
pub struct ConsolePresenter {
    bar_width: usize,
}

impl ConsolePresenter {
    pub fn new(bar_width: usize) -> Self {
        Self { bar_width }
    }
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new(40)
    }
}

impl Presenter for ConsolePresenter {
    fn volume_changed(&mut self, level: u8) {
        println!("Volume [{}] {:>3}%", volume_bar(level, self.bar_width, '='), level);
    }

    fn profile_changed(&mut self, index: usize, name: &str) {
        println!("Profile -> [{}] {}", index, name);
    }

    fn button_fired(&mut self, button: usize, kind: PressKind, action: &str) {
        let kind = match kind {
            PressKind::Short => "short",
            PressKind::Long => "long",
        };
        println!("Button {} {} press -> {}", button, kind, action);
    }
}

/// Render `level` (0..=100) as a fixed-width bar. Levels above 100 fill it.
pub fn volume_bar(level: u8, width: usize, fill: char) -> String {
    let filled = (usize::from(level.min(100)) * width) / 100;
    let mut bar: String = std::iter::repeat(fill).take(filled).collect();
    bar.extend(std::iter::repeat(' ').take(width - filled));
    bar
}
