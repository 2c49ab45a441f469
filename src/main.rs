mod actions;
mod config;
mod console;
mod debounce;
mod dispatcher;
mod error;
mod panel;
mod presenter;
mod profile;

use std::{
    fs::File,
    path::PathBuf,
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError},
        Mutex,
    },
    time::{Duration, Instant},
};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use actions::{BackgroundVolume, CommandVolume, ProcessMacroRunner};
use config::{Config, DEFAULT_CONFIG_PATH};
use console::ConsoleCommand;
use dispatcher::InputDispatcher;
use error::BridgeError;
use panel::{Panel, PanelState, Timestamp};
use presenter::ConsolePresenter;
use profile::{Direction, ProfileRegistry};

#[derive(Debug, Parser)]
#[command(version, about = "Bridge a serial macro pad to volume control and macros")]
struct Cli {
    /// Configuration file (YAML, or the legacy JSON format)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial port, overriding the configured one
    #[arg(short, long)]
    port: Option<String>,

    /// Log level (error, warning, info, debug, trace); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,

    /// Print the available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Don't read profile commands from stdin
    #[arg(long)]
    no_console: bool,
}

#[derive(Debug, Clone, Copy)]
enum ControlMessage {
    Frame {
        state: PanelState,
        timestamp: Timestamp,
    },
    SelectProfile(usize),
    StepProfile(Direction),
    Shutdown,
}

impl From<ConsoleCommand> for ControlMessage {
    fn from(command: ConsoleCommand) -> Self {
        match command {
            ConsoleCommand::SelectProfile(index) => ControlMessage::SelectProfile(index),
            ConsoleCommand::Step(direction) => ControlMessage::StepProfile(direction),
            ConsoleCommand::Quit => ControlMessage::Shutdown,
        }
    }
}

fn main() -> Result<(), BridgeError> {
    let cli = Cli::parse();

    if cli.list_ports {
        for port in panel::list_ports()? {
            println!("{port}");
        }
        return Ok(());
    }

    let config = Config::load(&cli.config)?;
    init_logging(cli.log_level.as_deref().or(config.log_level.as_deref()), &config)?;
    info!("loaded configuration from {}", cli.config.display());

    for violation in config.violations() {
        warn!("{}", violation);
    }

    let registry = ProfileRegistry::new(config.profiles.clone())
        .ok_or(error::ConfigError::NoProfiles)?;

    let volume = match &config.volume_command {
        Some(argv) => CommandVolume::new(argv.clone()),
        None => CommandVolume::platform_default(),
    };
    let volume: Box<dyn actions::VolumeControl> = match volume {
        Ok(volume) => Box::new(BackgroundVolume::spawn(volume)?),
        Err(err) => {
            error!("volume control disabled: {}", err);
            Box::new(DisabledVolume)
        }
    };

    let macros = ProcessMacroRunner::new(&config.macro_executable);
    info!("macros run through {}", macros.executable().display());

    let mut dispatcher = InputDispatcher::new(
        registry,
        config.inputs(),
        config.timing.button_timing(),
        config.timing.deadzone,
        volume,
        Box::new(macros),
        Box::new(ConsolePresenter::default()),
    );

    let (tx, rx) = mpsc::channel::<ControlMessage>();

    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(ControlMessage::Shutdown);
    })?;

    if !cli.no_console {
        console::spawn(tx.clone(), ControlMessage::from)?;
    }

    let port_name = cli.port.as_deref().unwrap_or(&config.port);
    let frame_tx = tx.clone();
    let panel = Panel::open(
        port_name,
        config.frame_layout(),
        config.button_polarity,
        move |state, timestamp| {
            let _ = frame_tx.send(ControlMessage::Frame { state, timestamp });
        },
    )?;
    drop(tx);

    dispatcher.announce();
    run_event_loop(&rx, &mut dispatcher, config.timing.poll_interval(), || {
        panel.is_finished()
    });

    info!("shutting down, closing {}", panel.port_name());
    panel.close()
}

/// Single consumer of all control messages.
///
/// Frames drive the debounce machines immediately; the newest potentiometer
/// level is applied on the next poll tick. Returns when a shutdown is
/// requested, every sender is gone, or `reader_done` reports the panel
/// reader thread has died.
fn run_event_loop<F>(
    rx: &Receiver<ControlMessage>,
    dispatcher: &mut InputDispatcher,
    poll_interval: Duration,
    reader_done: F,
) where
    F: Fn() -> bool,
{
    let mut pending_level: Option<u8> = None;
    let mut next_tick = Instant::now() + poll_interval;

    loop {
        let now = Instant::now();
        if now >= next_tick {
            if let Some(level) = pending_level.take() {
                dispatcher.apply_potentiometer(level);
            }
            if reader_done() {
                break;
            }
            next_tick = now + poll_interval;
        }

        match rx.recv_timeout(next_tick.saturating_duration_since(now)) {
            Ok(ControlMessage::Frame { state, timestamp }) => {
                dispatcher.handle_frame(&state, timestamp);
                pending_level = Some(state.potentiometer);
            }
            Ok(ControlMessage::SelectProfile(index)) => {
                if !dispatcher.switch_to_index(index) {
                    warn!(
                        "no profile {} (0..{})",
                        index,
                        dispatcher.registry().profile_count()
                    );
                }
            }
            Ok(ControlMessage::StepProfile(direction)) => {
                dispatcher.switch_relative(direction);
            }
            Ok(ControlMessage::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Stand-in used when no volume command is available.
struct DisabledVolume;

impl actions::VolumeControl for DisabledVolume {
    fn set_volume(&mut self, _percent: u8) -> Result<(), error::CapabilityError> {
        Err(error::CapabilityError::NoVolumeCommand)
    }
}

fn init_logging(level: Option<&str>, config: &Config) -> Result<(), BridgeError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level.unwrap_or("info"))));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = match &config.log_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| BridgeError::Logging(format!("{}: {}", path.display(), err)))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|err| BridgeError::Logging(err.to_string()))
}

/// Map the configured level name onto an `EnvFilter` directive.
fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        "off" => "off",
        _ => "info",
    }
}
