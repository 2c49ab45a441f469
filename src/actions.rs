use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::mpsc::{self, Sender},
    thread,
};

use tracing::{debug, error};

use crate::error::CapabilityError;

/// Placeholder substituted with the volume percentage in volume commands.
pub const PERCENT_PLACEHOLDER: &str = "{percent}";

/// Sets the host's output volume.
pub trait VolumeControl {
    fn set_volume(&mut self, percent: u8) -> Result<(), CapabilityError>;
}

/// Starts a macro. Must not wait for the macro to finish.
pub trait MacroRunner {
    fn run_action(&mut self, action: &str) -> Result<(), CapabilityError>;
}

/// Volume control backed by an external command line.
///
/// Every argument containing `{percent}` has it replaced with the level.
#[derive(Debug, Clone)]
pub struct CommandVolume {
    argv: Vec<String>,
}

impl CommandVolume {
    pub fn new(argv: Vec<String>) -> Result<Self, CapabilityError> {
        if argv.is_empty() {
            return Err(CapabilityError::NoVolumeCommand);
        }
        Ok(Self { argv })
    }

    /// The platform's stock volume command, if one is known.
    pub fn platform_default() -> Result<Self, CapabilityError> {
        let argv: &[&str] = if cfg!(target_os = "linux") {
            &["pactl", "set-sink-volume", "@DEFAULT_SINK@", "{percent}%"]
        } else if cfg!(target_os = "macos") {
            &["osascript", "-e", "set volume output volume {percent}"]
        } else {
            &[]
        };
        Self::new(argv.iter().map(|s| s.to_string()).collect())
    }

    fn command_for(&self, percent: u8) -> Command {
        let level = percent.to_string();
        let mut args = self
            .argv
            .iter()
            .map(|arg| arg.replace(PERCENT_PLACEHOLDER, &level));
        // argv is checked non-empty in `new`.
        let mut cmd = Command::new(args.next().unwrap_or_default());
        cmd.args(args);
        cmd
    }
}

impl VolumeControl for CommandVolume {
    fn set_volume(&mut self, percent: u8) -> Result<(), CapabilityError> {
        let program = self.argv[0].clone();
        let status = self
            .command_for(percent)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|source| CapabilityError::Spawn {
                program: program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(CapabilityError::ExitStatus {
                program,
                status: status.to_string(),
            })
        }
    }
}

/// Runs another volume control on its own thread.
///
/// `set_volume` only queues the level. The worker applies the newest queued
/// level and drops any older ones still waiting behind it.
#[derive(Debug)]
pub struct BackgroundVolume {
    tx: Option<Sender<u8>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl BackgroundVolume {
    pub fn spawn<V>(mut inner: V) -> io::Result<Self>
    where
        V: VolumeControl + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<u8>();
        let thread = thread::Builder::new().name("volume".into()).spawn(move || {
            while let Ok(mut percent) = rx.recv() {
                while let Ok(newer) = rx.try_recv() {
                    percent = newer;
                }
                match inner.set_volume(percent) {
                    Ok(()) => debug!("volume command applied {}%", percent),
                    Err(err) => error!("failed to set volume to {}%: {}", percent, err),
                }
            }
            debug!("volume worker stopped");
        })?;

        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
        })
    }
}

impl VolumeControl for BackgroundVolume {
    fn set_volume(&mut self, percent: u8) -> Result<(), CapabilityError> {
        self.tx
            .as_ref()
            .and_then(|tx| tx.send(percent).ok())
            .ok_or(CapabilityError::WorkerStopped)
    }
}

impl Drop for BackgroundVolume {
    fn drop(&mut self) {
        // Closing the channel ends the worker once the queued level is applied.
        self.tx.take();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Runs macros by passing the action name to a fixed executable.
#[derive(Debug, Clone)]
pub struct ProcessMacroRunner {
    executable: PathBuf,
}

impl ProcessMacroRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl MacroRunner for ProcessMacroRunner {
    fn run_action(&mut self, action: &str) -> Result<(), CapabilityError> {
        let mut child = Command::new(&self.executable)
            .arg(action)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| CapabilityError::Spawn {
                program: self.executable.display().to_string(),
                source,
            })?;

        // Reap the child in the background so finished macros don't linger.
        let label = action.to_string();
        let _ = thread::Builder::new()
            .name("macro-reaper".into())
            .spawn(move || match child.wait() {
                Ok(status) => debug!("macro \"{}\" exited with {}", label, status),
                Err(err) => debug!("macro \"{}\" wait failed: {}", label, err),
            });
        Ok(())
    }
}
