// crates/reelmux-fetcher/src/error.rs
//
// Typed error taxonomy for the kinds spec.md §7 names. Construction-time
// errors (Open/StreamSelection/Unsupported/UnknownMediaType) are returned
// directly from `MediaFetcher::open`. Worker-time errors (Decode/Seek/
// AudioDevice) are converted with `.to_string()` into the single shared
// `Option<String>` error slot described in spec.md §3 ("Error state") —
// first writer wins, and setting it always implies `dispatch_exit`.
//
// Every FFmpeg call site in this crate maps its `ffmpeg_the_third::Error`
// straight to a `FetcherError` variant via `.map_err(...)`, so there is no
// `anyhow` in this crate's own dependency table — unlike decode.rs/probe.rs/
// encode.rs, which surface ad hoc `anyhow::Error` because they have no
// single typed error enum to convert into.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("failed to open media file: {0}")]
    OpenFailure(String),

    #[error("failed to select a stream: {0}")]
    StreamSelectionFailure(String),

    #[error("unsupported media format: {0}")]
    UnsupportedFormat(String),

    #[error("could not classify media type for file")]
    UnknownMediaType,

    #[error("seek target {target:.3}s is out of range [0, {duration:.3}]")]
    SeekOutOfRange { target: f64, duration: f64 },

    #[error("seek failed: {0}")]
    SeekError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("ring buffer operation timed out")]
    RingBufferTimeout,

    #[error("audio device error: {0}")]
    AudioDeviceError(String),
}

pub type FetcherResult<T> = Result<T, FetcherError>;
