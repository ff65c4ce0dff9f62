// crates/reelmux-fetcher/src/lib.rs
//
// Media fetcher core: demuxing, decoding, clock, ring buffer, scaling, and
// audio output, wired together by the MediaFetcher coordinator in fetcher.rs.

mod audio_out;
mod blocking_ring_buffer;
mod clock;
mod demux;
mod error;
mod fetcher;
mod resample;
mod ring_buffer;
mod scale;
mod stream_decoder;
mod visualizer;
mod worker_audio;
mod worker_duration;
mod worker_video;

pub use audio_out::{AudioOut, AudioSource, RingBufferSource};
pub use blocking_ring_buffer::BlockingAudioRingBuffer;
pub use clock::MediaClock;
pub use error::{FetcherError, FetcherResult};
pub use fetcher::MediaFetcher;
pub use ring_buffer::AudioRingBuffer;

pub use reelmux_core::{FetcherFlags, MediaKind, PixelBitmap};
