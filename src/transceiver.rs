use crate::sdp::{Codec, Direction};

/// A stable small-integer identifier for a `Transport`, used instead of
/// a shared/cyclic reference (spec §9 redesign note: "flat transport
/// vector + small-int IDs instead of reference cycles").
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransportId(pub usize);

/// The `m=` media type. Only the two kinds exercised by this crate's
/// scenarios (spec §8 S2/S3); data channels are a Non-goal (§1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bidirectional media flow paired with (at most) one m-section
/// (spec §3).
#[derive(Debug, Clone)]
pub struct Transceiver {
    pub mid: Option<String>,
    pub mline: Option<usize>,
    pub kind: MediaKind,
    /// Declared by the embedder; never narrower than `current_direction`.
    pub direction: Direction,
    /// `None` means "not yet negotiated"; set only by DescriptionApplier.
    pub current_direction: Option<Direction>,
    pub stopped: bool,
    /// Ordered by priority, highest first.
    pub codec_preferences: Vec<Codec>,
    pub transport: Option<TransportId>,
}

impl Transceiver {
    pub fn new(direction: Direction, codec_preferences: Vec<Codec>) -> Self {
        Transceiver::new_with_kind(MediaKind::Audio, direction, codec_preferences)
    }

    pub fn new_with_kind(kind: MediaKind, direction: Direction, codec_preferences: Vec<Codec>) -> Self {
        Transceiver {
            mid: None,
            mline: None,
            kind,
            direction,
            current_direction: None,
            stopped: false,
            codec_preferences,
            transport: None,
        }
    }

    /// True once this transceiver has been bound to an m-line by
    /// DescriptionApplier.
    pub fn is_associated(&self) -> bool {
        self.mline.is_some()
    }
}
