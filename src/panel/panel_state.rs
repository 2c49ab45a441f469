use serde::Deserialize;

/// Maximum number of macro buttons carried by the control byte.
pub const MAX_BUTTONS: usize = 8;

/// Electrical polarity of the control byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonPolarity {
    /// Buttons pull the line low when pressed: a 0 bit means pressed.
    #[default]
    ActiveLow,
    ActiveHigh,
}

/// Decoded contents of one aligned payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelState {
    /// Potentiometer level, nominally 0..=100. Passed through unclamped.
    pub potentiometer: u8,
    /// Macro buttons, indexed by logical button number. `true` means pressed.
    pub buttons: [bool; MAX_BUTTONS],
    /// Profile buttons as `[prev, next]`, present in the 8-byte layout only.
    pub profile_buttons: Option<[bool; 2]>,
}

impl PanelState {
    /// Parse the aligned payload that follows the signature.
    ///
    /// Byte 0 is the control byte, byte 1 the potentiometer, bytes 2 and 3
    /// (optional) the previous/next profile buttons, sent inverted.
    pub fn from_payload(payload: &[u8], polarity: ButtonPolarity) -> Option<Self> {
        let (&control, &potentiometer) = (payload.first()?, payload.get(1)?);

        let mut buttons = reverse_bits(byte_to_bits(control));
        if polarity == ButtonPolarity::ActiveLow {
            buttons.iter_mut().for_each(|b| *b = !*b);
        }

        let profile_buttons = match payload.get(2..4) {
            Some(&[prev, next]) => Some([prev == 0, next == 0]),
            _ => None,
        };

        Some(Self {
            potentiometer,
            buttons,
            profile_buttons,
        })
    }
}

/// Unpack a byte most-significant bit first, as it is shifted out on the wire.
pub fn byte_to_bits(byte: u8) -> [bool; 8] {
    let mut bits = [false; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = byte & (0x80 >> i) != 0;
    }
    bits
}

/// Reverse the order of eight bits.
pub fn reverse_bits(mut bits: [bool; 8]) -> [bool; 8] {
    bits.reverse();
    bits
}
