use std::{
    io::{self, Read},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use serialport::{DataBits, Parity, StopBits};
use tracing::{debug, error, info, trace};

use super::frame_sync::{FrameLayout, FrameSynchronizer, SyncOutcome};
use super::panel_state::{ButtonPolarity, PanelState};
use crate::error::BridgeError;

/// Timestamp used for panel events.
pub type Timestamp = Instant;

pub const BAUD_RATE: u32 = 19_200;
const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Pause after a failed read so a dead port does not spin the thread.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);
const THREAD_NAME: &str = "panel-reader";

/// Reads fixed-size chunks from a byte source and decodes aligned frames.
pub struct PanelReader<R> {
    port: R,
    sync: FrameSynchronizer,
    polarity: ButtonPolarity,
    chunk: Vec<u8>,
}

impl<R: Read> PanelReader<R> {
    pub fn new(port: R, layout: FrameLayout, polarity: ButtonPolarity) -> Self {
        Self {
            port,
            sync: FrameSynchronizer::new(layout),
            polarity,
            chunk: vec![0; layout.chunk_len()],
        }
    }

    /// Read one chunk and decode it.
    ///
    /// Returns `Ok(None)` when nothing usable arrived: a timeout, a short read,
    /// or no signature seen yet. Only hard I/O errors are returned as `Err`.
    pub fn poll_once(&mut self) -> io::Result<Option<PanelState>> {
        let filled = read_chunk(&mut self.port, &mut self.chunk)?;
        if filled < self.chunk.len() {
            if filled > 0 {
                trace!(filled, "short read, keeping offset {:?}", self.sync.last_offset());
            }
            return Ok(None);
        }

        let (outcome, payload) = self.sync.align(&self.chunk);
        match outcome {
            SyncOutcome::Locked(_) => {}
            SyncOutcome::Stale(offset) => debug!(offset, chunk = ?self.chunk, "signature missing, reusing offset"),
            SyncOutcome::Lost => trace!(chunk = ?self.chunk, "waiting for signature"),
        }

        Ok(payload.and_then(|payload| PanelState::from_payload(payload, self.polarity)))
    }
}

/// Fill `buf` from `port`, stopping early on a timeout or end of stream.
fn read_chunk<R: Read>(port: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match port.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Handle to the background thread that owns the serial port.
///
/// Dropping the handle stops the thread and closes the port.
#[derive(Debug)]
pub struct Panel {
    port_name: String,
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Panel {
    /// Open the serial port and start forwarding decoded frames to `on_frame`.
    pub fn open<F>(
        port_name: &str,
        layout: FrameLayout,
        polarity: ButtonPolarity,
        on_frame: F,
    ) -> Result<Self, BridgeError>
    where
        F: FnMut(PanelState, Timestamp) + Send + 'static,
    {
        let port = serialport::new(port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| BridgeError::SerialOpen {
                port: port_name.to_string(),
                source,
            })?;
        info!(port = port_name, baud = BAUD_RATE, ?layout, "serial port opened");

        Self::spawn(port_name, PanelReader::new(port, layout, polarity), on_frame)
    }

    /// Run `reader` on a dedicated thread.
    ///
    /// Read errors are logged and the thread keeps polling; only `close` (or
    /// dropping the handle) stops it.
    pub fn spawn<R, F>(
        port_name: &str,
        mut reader: PanelReader<R>,
        mut on_frame: F,
    ) -> Result<Self, BridgeError>
    where
        R: Read + Send + 'static,
        F: FnMut(PanelState, Timestamp) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let label = port_name.to_string();

        let thread = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    match reader.poll_once() {
                        Ok(Some(state)) => on_frame(state, Instant::now()),
                        Ok(None) => {}
                        Err(err) => {
                            error!("serial read on {} failed: {}", label, err);
                            thread::sleep(ERROR_BACKOFF);
                        }
                    }
                }
                debug!("panel reader on {} stopped", label);
            })?;

        Ok(Self {
            port_name: port_name.to_string(),
            stop,
            thread: Some(thread),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// True once the reader thread has exited without being stopped (a panic).
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stop the reader thread. Fails only if the thread panicked.
    pub fn close(mut self) -> Result<(), BridgeError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), BridgeError> {
        self.stop.store(true, Ordering::Relaxed);
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BridgeError::Reader("reader thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Names of the serial ports currently present on the system.
pub fn list_ports() -> Result<Vec<String>, BridgeError> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .map_err(BridgeError::PortListing)
}
