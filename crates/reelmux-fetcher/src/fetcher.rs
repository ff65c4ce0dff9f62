// crates/reelmux-fetcher/src/fetcher.rs
//
// MediaFetcher coordinator — spec.md §3 (Lifecycle/Ownership) and §4.7.
// Grounded on the source project's mediafetcher.h/.cpp, down to its locking
// hierarchy doc comment (alter_mutex for general mutations, a dedicated
// mutex+condvar pair for exit notification, another for resume notification)
// and its three worker threads (video, audio, duration watcher).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use reelmux_core::geometry::Dim2;
use reelmux_core::{FetcherFlags, MediaKind, PixelBitmap};

use crate::blocking_ring_buffer::BlockingAudioRingBuffer;
use crate::clock::MediaClock;
use crate::demux::MediaDecoder;
use crate::error::{FetcherError, FetcherResult};
use crate::{worker_audio, worker_duration, worker_video};

const INTERNAL_AUDIO_BUFFER_SECONDS: f64 = 5.0;

pub(crate) struct AlterState {
    pub clock: MediaClock,
    pub bitmap: PixelBitmap,
    pub req_dims: Option<Dim2>,
    pub video_seek_requests: u32,
    pub audio_seek_requests: u32,
}

/// State shared between the coordinator and both worker threads. Every
/// worker gets an `Arc<Shared>` and its own independent demuxer handle.
pub(crate) struct Shared {
    pub path: PathBuf,
    pub media_type: MediaKind,
    pub flags: FetcherFlags,
    /// Bit-cast `f64`, kept up to date by the duration-watcher worker for
    /// sources whose duration isn't known at open time (demux.rs §4.1).
    duration_bits: AtomicU64,
    pub has_video: bool,
    pub has_audio: bool,
    pub sample_rate: u32,
    pub channels: u16,

    pub alter: Mutex<AlterState>,
    pub exit_mutex: Mutex<()>,
    pub exit_cond: Condvar,
    pub resume_mutex: Mutex<()>,
    pub resume_cond: Condvar,
    pub should_exit: AtomicBool,
    pub error: Mutex<Option<String>>,
    pub ring_buffer: Option<Arc<BlockingAudioRingBuffer>>,
}

impl Shared {
    pub fn should_exit(&self) -> bool {
        self.should_exit.load(Ordering::SeqCst)
    }

    pub fn duration(&self) -> f64 {
        f64::from_bits(self.duration_bits.load(Ordering::Relaxed))
    }

    pub fn set_duration(&self, secs: f64) {
        self.duration_bits.store(secs.to_bits(), Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.alter.lock().unwrap().clock.is_playing()
    }

    /// Sets the shared error slot (first writer wins) and triggers exit.
    /// Every worker panic-equivalent failure path routes through this.
    pub fn dispatch_exit_with_error(&self, err: impl Into<String>) {
        {
            let mut slot = self.error.lock().unwrap();
            if slot.is_none() {
                *slot = Some(err.into());
            }
        }
        self.dispatch_exit();
    }

    pub fn dispatch_exit(&self) {
        let _exit_lock = self.exit_mutex.lock().unwrap();
        let _resume_lock = self.resume_mutex.lock().unwrap();
        self.should_exit.store(true, Ordering::SeqCst);
        self.exit_cond.notify_all();
        self.resume_cond.notify_all();
    }

    /// Block until resumed or exit, matching the source project's
    /// `resume_notify_mutex`/`resume_cond` pair, polled on a timeout so a
    /// missed notification can never wedge a worker forever.
    pub fn wait_while_paused(&self, timeout: Duration) {
        let guard = self.resume_mutex.lock().unwrap();
        let _ = self.resume_cond.wait_timeout(guard, timeout);
    }

    /// Sleep on the exit condvar for up to `dur`, waking immediately if
    /// `dispatch_exit` is called meanwhile.
    pub fn sleep_on_exit_cond(&self, dur: Duration) {
        if self.should_exit() {
            return;
        }
        let guard = self.exit_mutex.lock().unwrap();
        let _ = self.exit_cond.wait_timeout(guard, dur);
    }
}

pub struct MediaFetcher {
    shared: Arc<Shared>,
    in_use: bool,
    video_thread: Option<JoinHandle<()>>,
    audio_thread: Option<JoinHandle<()>>,
    duration_thread: Option<JoinHandle<()>>,
}

impl MediaFetcher {
    /// Opens the file, classifies it, and allocates the ring buffer (sized
    /// at ≈5 seconds of audio) if an audio stream is selected. Does not
    /// spawn any worker — call `begin` for that.
    pub fn open(path: &Path, flags: FetcherFlags) -> FetcherResult<Self> {
        let mut mdec = MediaDecoder::open(path, true, true)?;

        let has_video = mdec.has_media_stream(MediaKind::Video);
        let has_audio = mdec.has_media_stream(MediaKind::Audio);
        let media_type = mdec.media_type;
        let duration = mdec.duration();

        let (ring_buffer, sample_rate, channels) = if has_audio {
            let audio = mdec.audio.as_ref().unwrap();
            let sample_rate = audio.rate();
            let channels = audio.channels();
            let capacity_frames = (sample_rate as f64 * INTERNAL_AUDIO_BUFFER_SECONDS) as usize;
            let rb = Arc::new(BlockingAudioRingBuffer::new(
                capacity_frames,
                channels as usize,
                sample_rate,
                0.0,
            ));
            (Some(rb), sample_rate, channels)
        } else {
            (None, 0, 0)
        };
        drop(mdec);

        let shared = Arc::new(Shared {
            path: path.to_path_buf(),
            media_type,
            flags,
            duration_bits: AtomicU64::new(duration.to_bits()),
            has_video,
            has_audio,
            sample_rate,
            channels,
            alter: Mutex::new(AlterState {
                clock: MediaClock::new(),
                bitmap: PixelBitmap::empty(),
                req_dims: None,
                video_seek_requests: 0,
                audio_seek_requests: 0,
            }),
            exit_mutex: Mutex::new(()),
            exit_cond: Condvar::new(),
            resume_mutex: Mutex::new(()),
            resume_cond: Condvar::new(),
            should_exit: AtomicBool::new(true), // not running until begin()
            error: Mutex::new(None),
            ring_buffer,
        });

        Ok(Self {
            shared,
            in_use: false,
            video_thread: None,
            audio_thread: None,
            duration_thread: None,
        })
    }

    pub fn media_type(&self) -> MediaKind {
        self.shared.media_type
    }

    pub fn duration(&self) -> f64 {
        self.shared.duration()
    }

    pub fn has_media_stream(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Video | MediaKind::Image => self.shared.has_video,
            MediaKind::Audio => self.shared.has_audio,
        }
    }

    pub fn has_error(&self) -> bool {
        self.shared.error.lock().unwrap().is_some()
    }

    pub fn take_error(&self) -> Option<String> {
        self.shared.error.lock().unwrap().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    pub fn pause(&self, current_system_time: f64) {
        self.shared.alter.lock().unwrap().clock.stop(current_system_time);
    }

    pub fn resume(&self, current_system_time: f64) {
        self.shared.alter.lock().unwrap().clock.resume(current_system_time);
        let _guard = self.shared.resume_mutex.lock().unwrap();
        self.shared.resume_cond.notify_all();
    }

    pub fn get_time(&self, current_system_time: f64) -> f64 {
        self.shared.alter.lock().unwrap().clock.get_time(current_system_time)
    }

    /// Non-owning handle to the ring buffer, for a caller-owned `AudioOut`.
    /// `None` if the file has no audio stream.
    pub fn ring_buffer(&self) -> Option<Arc<BlockingAudioRingBuffer>> {
        self.shared.ring_buffer.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.shared.channels
    }

    pub fn get_audio_desync_time(&self, current_system_time: f64) -> f64 {
        match &self.shared.ring_buffer {
            Some(rb) => {
                let playback_time = self.get_time(current_system_time);
                (rb.current_time() - playback_time).abs()
            }
            None => 0.0,
        }
    }

    /// Opt-in convenience: jump to the current playback time if audio and
    /// clock have drifted past `RESYNC_THRESHOLD_SECS`. Not run automatically
    /// on any worker's behalf — the caller decides when to check.
    pub fn resync_if_desynced(&self, current_system_time: f64) -> FetcherResult<bool> {
        const RESYNC_THRESHOLD_SECS: f64 = 0.6;
        if self.get_audio_desync_time(current_system_time) <= RESYNC_THRESHOLD_SECS {
            return Ok(false);
        }
        let target = self.get_time(current_system_time);
        self.jump_to_time(target, current_system_time)?;
        Ok(true)
    }

    pub fn set_requested_dims(&self, dims: Option<Dim2>) {
        self.shared.alter.lock().unwrap().req_dims = dims;
    }

    pub fn take_bitmap_snapshot(&self) -> PixelBitmap {
        self.shared.alter.lock().unwrap().bitmap.take_snapshot()
    }

    /// Increments both workers' seek-request counters and skips the clock
    /// by the delta. The actual container seek happens inside each worker
    /// the next time it observes its counter > 0 (spec.md §4.7).
    pub fn jump_to_time(&self, target: f64, current_system_time: f64) -> FetcherResult<()> {
        let duration = self.shared.duration();
        if target < 0.0 || (duration > 0.0 && target > duration) {
            return Err(FetcherError::SeekOutOfRange { target, duration });
        }
        let mut alter = self.shared.alter.lock().unwrap();
        let original_time = alter.clock.get_time(current_system_time);
        alter.video_seek_requests += 1;
        alter.audio_seek_requests += 1;
        alter.clock.skip(target - original_time);
        Ok(())
    }

    /// Non-reentrant: spawns video, audio, and duration-watcher workers.
    pub fn begin(&mut self, current_system_time: f64) -> FetcherResult<()> {
        if self.in_use {
            return Err(FetcherError::OpenFailure(
                "MediaFetcher::begin called while already running".into(),
            ));
        }
        self.in_use = true;
        self.shared.should_exit.store(false, Ordering::SeqCst);
        self.shared.alter.lock().unwrap().clock.init(current_system_time);

        let video_shared = Arc::clone(&self.shared);
        self.video_thread = Some(thread::spawn(move || worker_video::run(video_shared)));

        if self.shared.has_audio {
            let audio_shared = Arc::clone(&self.shared);
            self.audio_thread = Some(thread::spawn(move || worker_audio::run(audio_shared)));
        }

        let duration_shared = Arc::clone(&self.shared);
        self.duration_thread = Some(thread::spawn(move || worker_duration::run(duration_shared)));

        Ok(())
    }

    /// Sets exit, pauses the clock if needed, and joins every worker.
    pub fn join(&mut self, current_system_time: f64) {
        self.in_use = false;
        if self.shared.media_type != MediaKind::Image && self.is_playing() {
            self.pause(current_system_time);
        }
        self.shared.dispatch_exit();
        if let Some(h) = self.video_thread.take() {
            let _ = h.join();
        }
        if let Some(h) = self.audio_thread.take() {
            let _ = h.join();
        }
        if let Some(h) = self.duration_thread.take() {
            let _ = h.join();
        }
    }
}

impl Drop for MediaFetcher {
    fn drop(&mut self) {
        if self.in_use {
            self.join(0.0);
        }
    }
}
