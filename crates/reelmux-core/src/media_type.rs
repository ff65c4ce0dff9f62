// crates/reelmux-core/src/media_type.rs

/// What kind of media a file was classified as at open time.
///
/// Decided once by the demuxer façade and never changed afterwards — see
/// `reelmux-fetcher::demux::classify` for the selection rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    pub fn is_image(self) -> bool {
        matches!(self, MediaKind::Image)
    }
}
