/// Fixed signature the firmware writes in front of every payload.
pub const SIGNATURE: [u8; 4] = [0x02, 0x04, 0x03, 0x04];

/// Wire layout of one frame, selected by the firmware build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLayout {
    /// Signature, control byte, potentiometer byte.
    Compact,
    /// Compact layout followed by two inverted profile-button bytes.
    WithProfileButtons,
}

impl FrameLayout {
    pub fn from_profile_buttons(enabled: bool) -> Self {
        if enabled {
            FrameLayout::WithProfileButtons
        } else {
            FrameLayout::Compact
        }
    }

    /// Number of bytes read from the port per cycle.
    pub fn chunk_len(self) -> usize {
        SIGNATURE.len() + self.payload_len()
    }

    pub fn payload_len(self) -> usize {
        match self {
            FrameLayout::Compact => 2,
            FrameLayout::WithProfileButtons => 4,
        }
    }
}

/// Result of one synchronization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Signature found in this chunk at the given offset.
    Locked(usize),
    /// No signature in this chunk; the last known offset is reused.
    Stale(usize),
    /// No signature seen yet.
    Lost,
}

impl SyncOutcome {
    pub fn offset(self) -> Option<usize> {
        match self {
            SyncOutcome::Locked(offset) | SyncOutcome::Stale(offset) => Some(offset),
            SyncOutcome::Lost => None,
        }
    }
}

/// Recovers payload boundaries from the unframed serial stream.
///
/// Every chunk is searched on its own: the chunk is concatenated with itself
/// so a signature that wraps around the chunk end is still found. When the
/// signature is missing the previous offset is kept, which self-corrects as
/// soon as a later chunk carries a clean signature again.
#[derive(Debug, Clone)]
pub struct FrameSynchronizer {
    layout: FrameLayout,
    last_offset: Option<usize>,
    search: Vec<u8>,
}

impl FrameSynchronizer {
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            layout,
            last_offset: None,
            search: Vec::with_capacity(layout.chunk_len() * 2),
        }
    }

    pub fn last_offset(&self) -> Option<usize> {
        self.last_offset
    }

    /// Locate the signature in `chunk` and update the persisted offset.
    pub fn synchronize(&mut self, chunk: &[u8]) -> SyncOutcome {
        self.fill_search(chunk);
        match find_signature(&self.search, chunk.len()) {
            Some(offset) => {
                self.last_offset = Some(offset);
                SyncOutcome::Locked(offset)
            }
            None => match self.last_offset {
                Some(offset) => SyncOutcome::Stale(offset),
                None => SyncOutcome::Lost,
            },
        }
    }

    /// Synchronize and return the aligned payload bytes, if any offset is known.
    pub fn align<'a>(&'a mut self, chunk: &[u8]) -> (SyncOutcome, Option<&'a [u8]>) {
        let outcome = self.synchronize(chunk);
        let payload_len = self.layout.payload_len();
        let payload = outcome.offset().and_then(|offset| {
            let start = offset + SIGNATURE.len();
            self.search.get(start..start + payload_len)
        });
        (outcome, payload)
    }

    fn fill_search(&mut self, chunk: &[u8]) {
        self.search.clear();
        self.search.extend_from_slice(chunk);
        self.search.extend_from_slice(chunk);
    }
}

/// First index `i < chunk_len` where `search[i..i + 4]` equals the signature.
fn find_signature(search: &[u8], chunk_len: usize) -> Option<usize> {
    let last_start = search.len().checked_sub(SIGNATURE.len())?;
    (0..chunk_len.min(last_start + 1)).find(|&i| search[i..i + SIGNATURE.len()] == SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with_signature_at(pos: usize, layout: FrameLayout) -> Vec<u8> {
        let len = layout.chunk_len();
        let mut chunk = vec![0xAA; len];
        for (k, byte) in SIGNATURE.iter().enumerate() {
            chunk[(pos + k) % len] = *byte;
        }
        chunk
    }

    #[test]
    fn finds_signature_at_every_position() {
        for layout in [FrameLayout::Compact, FrameLayout::WithProfileButtons] {
            for pos in 0..layout.chunk_len() {
                let mut sync = FrameSynchronizer::new(layout);
                let chunk = chunk_with_signature_at(pos, layout);
                assert_eq!(sync.synchronize(&chunk), SyncOutcome::Locked(pos));
            }
        }
    }

    #[test]
    fn keeps_previous_offset_when_signature_missing() {
        let mut sync = FrameSynchronizer::new(FrameLayout::Compact);
        sync.synchronize(&[55, 30, 2, 4, 3, 4]);
        assert_eq!(sync.last_offset(), Some(2));

        assert_eq!(sync.synchronize(&[1, 1, 1, 1, 1, 1]), SyncOutcome::Stale(2));
        assert_eq!(sync.synchronize(&[9, 8, 7, 6, 5, 4]), SyncOutcome::Stale(2));
        assert_eq!(sync.last_offset(), Some(2));
    }

    #[test]
    fn reports_lost_before_first_signature() {
        let mut sync = FrameSynchronizer::new(FrameLayout::Compact);
        let (outcome, payload) = sync.align(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(outcome, SyncOutcome::Lost);
        assert!(payload.is_none());
    }

    #[test]
    fn short_reads_do_not_panic() {
        let mut sync = FrameSynchronizer::new(FrameLayout::Compact);
        assert_eq!(sync.synchronize(&[]), SyncOutcome::Lost);
        assert_eq!(sync.synchronize(&[2, 4]), SyncOutcome::Lost);
    }

    #[test]
    fn aligns_wrapped_payload() {
        let mut sync = FrameSynchronizer::new(FrameLayout::Compact);
        let (outcome, payload) = sync.align(&[30, 2, 4, 3, 4, 55]);
        assert_eq!(outcome, SyncOutcome::Locked(1));
        assert_eq!(payload, Some(&[55, 30][..]));
    }

    #[test]
    fn aligns_profile_layout_payload() {
        let mut sync = FrameSynchronizer::new(FrameLayout::WithProfileButtons);
        let (outcome, payload) = sync.align(&[9, 9, 2, 4, 3, 4, 55, 30]);
        assert_eq!(outcome, SyncOutcome::Locked(2));
        assert_eq!(payload, Some(&[55, 30, 9, 9][..]));
    }
}
