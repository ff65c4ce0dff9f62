// crates/reelmux-fetcher/src/audio_out.rs
//
// AudioOut adapter — spec.md §4.5. Grounded on the source project's
// maaudioout.cpp: a fill thread pulls PCM through a caller-supplied on_data
// closure into a bounded SPSC queue, ramping gain up/down at zero-crossings
// on start/stop to avoid speaker clicks, while a device callback drains the
// queue without ever blocking. miniaudio's device is swapped for `cpal`
// (the only audio-output crate in the example pack, used the same way by
// other_examples/pop-os-cosmic-player).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::blocking_ring_buffer::BlockingAudioRingBuffer;
use crate::error::{FetcherError, FetcherResult};

const AUDIO_QUEUE_SIZE_FRAMES: usize = 2048;
const READING_BLOCK_SIZE_SAMPLES: usize = 4096;
const PERIOD_SIZE_MS: u64 = 20;
const PERIODS: u64 = 3;
const RAMP_TIME_MS: u64 = PERIOD_SIZE_MS * PERIODS * 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Stopped,
    Playing,
    Stopping,
}

fn zero_cross(a: f32, b: f32) -> bool {
    (a <= 0.0 && b >= 0.0) || (a >= 0.0 && b <= 0.0)
}

/// Pulls PCM for the fill thread. Implementations typically delegate to
/// `BlockingAudioRingBuffer::try_read_into`.
pub trait AudioSource: Send {
    /// Fill `out[..nb_frames * channels]` with interleaved samples, blocking
    /// briefly as needed. Short reads are padded with silence by the caller.
    fn on_data(&mut self, out: &mut [f32], nb_frames: usize);
}

struct SharedState {
    state: Mutex<State>,
    stop_cond: Condvar,
    muted: AtomicBool,
    volume_bits: AtomicU32,
}

pub struct AudioOut {
    channels: usize,
    sample_rate: u32,
    queue_tx: Sender<f32>,
    queue_rx: Receiver<f32>,
    shared: Arc<SharedState>,
    fill_thread: Option<JoinHandle<()>>,
    _stream: Option<cpal::Stream>,
}

impl AudioOut {
    pub fn new(channels: u16, sample_rate: u32) -> FetcherResult<Self> {
        let channels = channels as usize;
        let capacity_samples = AUDIO_QUEUE_SIZE_FRAMES * channels;
        let (queue_tx, queue_rx) = bounded(capacity_samples);
        Ok(Self {
            channels,
            sample_rate,
            queue_tx,
            queue_rx,
            shared: Arc::new(SharedState {
                state: Mutex::new(State::Stopped),
                stop_cond: Condvar::new(),
                muted: AtomicBool::new(false),
                volume_bits: AtomicU32::new(1.0f32.to_bits()),
            }),
            fill_thread: None,
            _stream: None,
        })
    }

    pub fn playing(&self) -> bool {
        *self.shared.state.lock().unwrap() == State::Playing
    }

    pub fn set_volume(&self, volume: f64) {
        let clamped = volume.clamp(0.0, 1.0) as f32;
        self.shared
            .volume_bits
            .store(clamped.to_bits(), Ordering::Relaxed);
    }

    pub fn set_muted(&self, muted: bool) {
        self.shared.muted.store(muted, Ordering::Relaxed);
    }

    pub fn muted(&self) -> bool {
        self.shared.muted.load(Ordering::Relaxed)
    }

    fn data_req_size(&self, max_buffer_frames: usize) -> usize {
        const EXTEND_FACTOR: usize = 2;
        let queue_len_frames = self.queue_rx.len() / self.channels;
        let frames_to_fill = AUDIO_QUEUE_SIZE_FRAMES.saturating_sub(queue_len_frames);
        (frames_to_fill * EXTEND_FACTOR).min(max_buffer_frames)
    }

    pub fn start(&mut self, mut source: Box<dyn AudioSource>) -> FetcherResult<()> {
        if self.playing() {
            return Ok(());
        }
        *self.shared.state.lock().unwrap() = State::Playing;

        let channels = self.channels;
        let sample_rate = self.sample_rate;
        let shared = Arc::clone(&self.shared);
        let queue_tx = self.queue_tx.clone();
        let stkbuf_frames = (READING_BLOCK_SIZE_SAMPLES / channels).max(1);

        self.fill_thread = Some(thread::spawn(move || {
            fill_thread_main(&shared, &queue_tx, source.as_mut(), channels, sample_rate, stkbuf_frames);
        }));

        // Wait for the queue to fill before opening the device, matching the
        // source project's start() rendezvous.
        while self.queue_tx.len() != self.queue_tx.capacity().unwrap_or(0) {
            if !self.playing() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        let stream = self.open_stream()?;
        stream
            .play()
            .map_err(|e| FetcherError::AudioDeviceError(e.to_string()))?;
        self._stream = Some(stream);
        Ok(())
    }

    fn open_stream(&self) -> FetcherResult<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| FetcherError::AudioDeviceError("no default output device".into()))?;
        let config = cpal::StreamConfig {
            channels: self.channels as u16,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let rx = self.queue_rx.clone();
        let shared = Arc::clone(&self.shared);
        let err_fn = |e| eprintln!("[audio_out] stream error: {e}");
        device
            .build_output_stream(
                &config,
                move |output: &mut [f32], _| {
                    let muted = shared.muted.load(Ordering::Relaxed);
                    let volume = f32::from_bits(shared.volume_bits.load(Ordering::Relaxed));
                    for sample in output.iter_mut() {
                        let s = rx.try_recv().unwrap_or(0.0);
                        *sample = if muted { 0.0 } else { s * volume };
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| FetcherError::AudioDeviceError(e.to_string()))
    }

    pub fn stop(&mut self) {
        if !self.playing() {
            return;
        }
        {
            let mut state = self.shared.state.lock().unwrap();
            *state = State::Stopping;
            let (guard, _) = self
                .shared
                .stop_cond
                .wait_timeout(state, Duration::from_millis(20))
                .unwrap();
            state = guard;
            while *state != State::Stopped {
                let (guard, _) = self
                    .shared
                    .stop_cond
                    .wait_timeout(state, Duration::from_millis(20))
                    .unwrap();
                state = guard;
            }
        }
        if let Some(stream) = self._stream.take() {
            drop(stream);
        }
        if let Some(handle) = self.fill_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AudioOut {
    fn drop(&mut self) {
        self.stop();
    }
}

fn fill_thread_main(
    shared: &Arc<SharedState>,
    queue_tx: &Sender<f32>,
    source: &mut dyn AudioSource,
    channels: usize,
    sample_rate: u32,
    stkbuf_frames: usize,
) {
    let mut stkbuf = vec![0f32; stkbuf_frames * channels];
    let send_timeout = Duration::from_millis(10);

    ramp(
        shared,
        queue_tx,
        source,
        channels,
        sample_rate,
        stkbuf_frames,
        &mut stkbuf,
        send_timeout,
        true,
    );

    loop {
        if *shared.state.lock().unwrap() != State::Playing {
            break;
        }
        let data_req = data_req_size(queue_tx, channels, stkbuf_frames);
        if data_req == 0 {
            thread::sleep(Duration::from_millis(1));
            continue;
        }
        source.on_data(&mut stkbuf, data_req);
        for &s in &stkbuf[..data_req * channels] {
            while queue_tx.send_timeout(s, send_timeout).is_err() {
                if *shared.state.lock().unwrap() != State::Playing {
                    break;
                }
            }
        }
    }

    ramp(
        shared,
        queue_tx,
        source,
        channels,
        sample_rate,
        stkbuf_frames,
        &mut stkbuf,
        send_timeout,
        false,
    );

    while !queue_tx.is_empty() {
        thread::sleep(Duration::from_millis(1));
    }

    let mut state = shared.state.lock().unwrap();
    *state = State::Stopped;
    shared.stop_cond.notify_all();
}

fn data_req_size(queue_tx: &Sender<f32>, channels: usize, max_buffer_frames: usize) -> usize {
    const EXTEND_FACTOR: usize = 2;
    let queue_len_frames = queue_tx.len() / channels;
    let frames_to_fill = AUDIO_QUEUE_SIZE_FRAMES.saturating_sub(queue_len_frames);
    (frames_to_fill * EXTEND_FACTOR).min(max_buffer_frames)
}

/// Ramp gain from 0→1 (`ramp_up = true`) or 1→0 at each channel's first zero
/// crossing, over `RAMP_TIME_MS`, so playback starts/stops without a click.
#[allow(clippy::too_many_arguments)]
fn ramp(
    shared: &Arc<SharedState>,
    queue_tx: &Sender<f32>,
    source: &mut dyn AudioSource,
    channels: usize,
    sample_rate: u32,
    stkbuf_frames: usize,
    stkbuf: &mut [f32],
    send_timeout: Duration,
    ramp_up: bool,
) {
    let mut gain = vec![if ramp_up { 0.0f32 } else { 1.0f32 }; channels];
    let ramp_frames_total = (sample_rate as u64 * RAMP_TIME_MS / 1000) as usize;
    let mut done_frames = 0usize;

    while done_frames < ramp_frames_total {
        if ramp_up && *shared.state.lock().unwrap() != State::Playing {
            return;
        }
        let req = data_req_size(queue_tx, channels, stkbuf_frames);
        if req < 2 {
            thread::sleep(Duration::from_millis(1));
            continue;
        }
        source.on_data(stkbuf, req);
        for frame in 1..req {
            for ch in 0..channels {
                let last = stkbuf[(frame - 1) * channels + ch];
                let curr = stkbuf[frame * channels + ch];
                if zero_cross(last, curr) {
                    gain[ch] = if ramp_up { 1.0 } else { 0.0 };
                }
                let sample = curr * gain[ch];
                while queue_tx.send_timeout(sample, send_timeout).is_err() {}
            }
        }
        done_frames += req;
    }
}

/// Bridges `BlockingAudioRingBuffer::try_read_into` into `AudioSource`: a
/// miss within the timeout is padded with silence rather than blocking the
/// fill thread indefinitely.
pub struct RingBufferSource {
    rb: Arc<BlockingAudioRingBuffer>,
    channels: usize,
}

impl RingBufferSource {
    pub fn new(rb: Arc<BlockingAudioRingBuffer>) -> Self {
        let channels = rb.channels();
        Self { rb, channels }
    }
}

impl AudioSource for RingBufferSource {
    fn on_data(&mut self, out: &mut [f32], nb_frames: usize) {
        let needed = nb_frames * self.channels;
        if out.len() < needed {
            return;
        }
        match self.rb.try_read_into(nb_frames, &mut out[..needed], Duration::from_millis(2)) {
            Ok(true) => {}
            _ => out[..needed].fill(0.0),
        }
    }
}
