// crates/reelmux-fetcher/src/worker_audio.rs
//
// Audio worker — spec.md §4.3. Grounded on audio_thread.cpp: opens a second
// demuxer handle to the same file (independent seek position from the video
// worker), sleeps until the stream's start_time, then loops decode/resample/
// write with the same EOF back-off (MAX_RUNS_W_FAIL/MAX_RUNS_WAIT_TIME) and
// the same "clear the ring buffer only after the jump and redrain" ordering.

use std::sync::Arc;
use std::time::Duration;

use crate::demux::MediaDecoder;
use crate::fetcher::Shared;
use crate::resample::AudioResampler;

const PAUSED_SLEEP: Duration = Duration::from_millis(25);
const WRITE_RETRY_TIMEOUT: Duration = Duration::from_millis(25);
const MAX_RUNS_W_FAIL: u32 = 5;
const MAX_RUNS_WAIT_TIME: Duration = Duration::from_millis(25);

pub(crate) fn run(shared: Arc<Shared>) {
    let rb = match &shared.ring_buffer {
        Some(rb) => Arc::clone(rb),
        None => return,
    };

    let mut mdec = match MediaDecoder::open(&shared.path, false, true) {
        Ok(m) => m,
        Err(e) => {
            shared.dispatch_exit_with_error(format!("audio worker open: {e}"));
            return;
        }
    };
    let audio = mdec.audio.as_ref().unwrap();
    let src_format = audio.format();
    let src_layout = audio.channel_layout();
    let src_rate = audio.rate();
    let out_channels = rb.channels() as u16;
    let out_rate = rb.sample_rate();

    let mut resampler = match AudioResampler::new(src_format, src_layout, src_rate, out_channels, out_rate) {
        Ok(r) => r,
        Err(e) => {
            shared.dispatch_exit_with_error(format!("audio resampler init: {e}"));
            return;
        }
    };

    let start_time_secs = mdec.audio.as_ref().unwrap().start_time_secs;
    if start_time_secs > 0.0 {
        std::thread::sleep(Duration::from_secs_f64(start_time_secs));
    }

    let mut runs_w_fail: u32 = 0;

    while !shared.should_exit() {
        if !shared.is_playing() {
            while !shared.is_playing() && !shared.should_exit() {
                shared.wait_while_paused(PAUSED_SLEEP);
            }
        }

        let mut frames = mdec.next_audio_frames();

        let (current_time, seek_pending) = {
            let alter = shared.alter.lock().unwrap();
            (
                alter.clock.get_time(wall_clock_secs()),
                alter.audio_seek_requests,
            )
        };

        if seek_pending > 0 {
            match mdec.jump_to_time(current_time) {
                Ok(()) => {
                    frames = mdec.next_audio_frames();
                    // Clear **after** the expensive jump/redrain so readers
                    // don't observe a half-seeked ring buffer.
                    rb.clear(current_time);
                    let mut alter = shared.alter.lock().unwrap();
                    alter.audio_seek_requests = alter.audio_seek_requests.saturating_sub(1);
                }
                Err(e) => {
                    shared.dispatch_exit_with_error(format!("audio seek failed: {e}"));
                    return;
                }
            }
        }

        if frames.is_empty() {
            runs_w_fail += 1;
        } else {
            runs_w_fail = 0;
        }

        for frame in &frames {
            let pcm = match resampler.resample(frame) {
                Ok(p) => p,
                Err(_) => continue,
            };
            write_all_retrying(&shared, &rb, &pcm, out_channels as usize);
        }

        // Drain any samples the resampler buffered internally.
        loop {
            match resampler.flush() {
                Ok(pcm) if !pcm.is_empty() => write_all_retrying(&shared, &rb, &pcm, out_channels as usize),
                _ => break,
            }
        }

        if runs_w_fail >= MAX_RUNS_W_FAIL {
            runs_w_fail = 0;
            shared.sleep_on_exit_cond(MAX_RUNS_WAIT_TIME);
        }
    }
}

fn write_all_retrying(shared: &Shared, rb: &crate::blocking_ring_buffer::BlockingAudioRingBuffer, pcm: &[f32], channels: usize) {
    if channels == 0 {
        return;
    }
    let nb_frames = pcm.len() / channels;
    if nb_frames == 0 {
        return;
    }
    while !rb.try_write_into(nb_frames, pcm, WRITE_RETRY_TIMEOUT).unwrap_or(false) {
        if shared.should_exit() {
            break;
        }
    }
}

fn wall_clock_secs() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
