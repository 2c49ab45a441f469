mod frame_sync;
mod panel;
mod panel_state;

#[allow(unused_imports)]
pub use frame_sync::{FrameLayout, FrameSynchronizer, SyncOutcome, SIGNATURE};
#[allow(unused_imports)]
pub use panel::{list_ports, Panel, PanelReader, Timestamp, BAUD_RATE};
#[allow(unused_imports)]
pub use panel_state::{byte_to_bits, reverse_bits, ButtonPolarity, PanelState, MAX_BUTTONS};
