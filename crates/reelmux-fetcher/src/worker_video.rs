// crates/reelmux-fetcher/src/worker_video.rs
//
// Video worker — spec.md §4.2. Grounded on video_thread.cpp's three
// sub-loops (frame_video_fetching_func / frame_image_fetching_func /
// frame_audio_fetching_func), dispatched from the same top-level switch on
// MediaType that video_fetching_thread_func uses.

use std::time::Duration;

use reelmux_core::geometry::{Dim2, MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH};
use reelmux_core::MediaKind;

use crate::demux::MediaDecoder;
use crate::fetcher::Shared;
use crate::scale::VideoScaler;
use crate::visualizer::{render_waveform, to_mono};

const PAUSED_SLEEP: Duration = Duration::from_millis(100);
const DEFAULT_AVGFTS: f64 = 1.0 / 24.0;
const EOF_SLEEP_THRESHOLD: u32 = 5;
const EOF_SLEEP: Duration = Duration::from_millis(25);
const AUDIO_PEEK_TRY_WAIT: Duration = Duration::from_millis(100);
const AUDIO_PEEK_MAX_SAMPLES: usize = 2048;

pub(crate) fn run(shared: std::sync::Arc<Shared>) {
    if !shared.has_video {
        if shared.has_audio {
            run_audio_visualization(&shared);
        }
        return;
    }

    match shared.media_type {
        MediaKind::Image => run_image(&shared),
        MediaKind::Audio => {
            if run_image(&shared).is_err() {
                run_audio_visualization(&shared);
            }
        }
        MediaKind::Video => run_video(&shared),
    }
}

fn run_image(shared: &Shared) -> Result<(), ()> {
    let mut mdec = match MediaDecoder::open(&shared.path, true, false) {
        Ok(m) => m,
        Err(_) => return Err(()),
    };
    let video = match &mdec.video {
        Some(v) => v,
        None => return Err(()),
    };
    let dims = Dim2::new(video.width(), video.height());
    let mut scaler = match VideoScaler::new(video.format(), video.width(), video.height(), Some(dims)) {
        Ok(s) => s,
        Err(_) => return Err(()),
    };

    let frames = mdec.next_video_frames();
    if let Some(frame) = frames.last() {
        if let Ok(rgb) = scaler.scale_to_rgb(frame) {
            let out_dims = scaler.out_dims();
            let mut alter = shared.alter.lock().unwrap();
            alter.bitmap.publish(out_dims.width, out_dims.height, rgb);
        }
        Ok(())
    } else {
        Err(())
    }
}

fn run_audio_visualization(shared: &Shared) {
    let rb = match &shared.ring_buffer {
        Some(rb) => rb,
        None => return,
    };
    let channels = rb.channels();
    let peek_frames = AUDIO_PEEK_MAX_SAMPLES / channels.max(1);
    let mut buf = vec![0f32; peek_frames * channels];

    let mut vis_dims = {
        let alter = shared.alter.lock().unwrap();
        alter
            .req_dims
            .map(|d| reelmux_core::geometry::bound_dims(d.width, d.height, MAX_FRAME_WIDTH, MAX_FRAME_HEIGHT))
            .unwrap_or(Dim2::new(MAX_FRAME_WIDTH, MAX_FRAME_HEIGHT))
    };

    while !shared.should_exit() {
        if !shared.is_playing() {
            while !shared.is_playing() && !shared.should_exit() {
                shared.wait_while_paused(PAUSED_SLEEP);
            }
        }

        if let Ok(true) = rb.try_peek_into(peek_frames, &mut buf, AUDIO_PEEK_TRY_WAIT) {
            let mono = to_mono(&buf, channels, peek_frames);
            let rgb = render_waveform(&mono, vis_dims.width, vis_dims.height);
            let mut alter = shared.alter.lock().unwrap();
            alter.bitmap.publish(vis_dims.width, vis_dims.height, rgb);
            if let Some(req) = alter.req_dims {
                vis_dims = reelmux_core::geometry::bound_dims(req.width, req.height, MAX_FRAME_WIDTH, MAX_FRAME_HEIGHT);
            }
        }

        shared.sleep_on_exit_cond(Duration::from_secs_f64(DEFAULT_AVGFTS));
    }
}

fn run_video(shared: &Shared) {
    let mut mdec = match MediaDecoder::open(&shared.path, true, false) {
        Ok(m) => m,
        Err(e) => {
            shared.dispatch_exit_with_error(format!("video worker open: {e}"));
            return;
        }
    };
    let video = mdec.video.as_ref().unwrap();
    let mut scaler = match VideoScaler::new(video.format(), video.width(), video.height(), None) {
        Ok(s) => s,
        Err(e) => {
            shared.dispatch_exit_with_error(format!("video scaler init: {e}"));
            return;
        }
    };
    // Average frame time from the stream itself (decode.rs/video_thread.cpp
    // both derive this from avg_frame_rate rather than hardcoding 1/24).
    let avg_fts = {
        let v = mdec.video.as_ref().unwrap();
        if v.avg_frame_time_secs > 0.0 {
            v.avg_frame_time_secs
        } else {
            DEFAULT_AVGFTS
        }
    };

    let mut consecutive_empty: u32 = 0;

    while !shared.should_exit() {
        if !shared.is_playing() {
            while !shared.is_playing() && !shared.should_exit() {
                shared.wait_while_paused(PAUSED_SLEEP);
            }
        }

        let (requested_dims, current_time, seek_pending, bitmap_empty) = {
            let alter = shared.alter.lock().unwrap();
            (
                alter.req_dims,
                alter.clock.get_time(wall_clock_secs()),
                alter.video_seek_requests,
                alter.bitmap.is_empty(),
            )
        };
        if let Ok(true) = scaler.reconfigure_if_needed(requested_dims) {
            // scaler rebuilt to new output dims
        }

        let mut frames = mdec.next_video_frames();

        if seek_pending > 0 {
            let target = current_time;
            match mdec.jump_to_time(target) {
                Ok(()) => {
                    frames = mdec.next_video_frames();
                    let mut alter = shared.alter.lock().unwrap();
                    alter.video_seek_requests = alter.video_seek_requests.saturating_sub(1);
                }
                Err(e) => {
                    shared.dispatch_exit_with_error(format!("video seek failed: {e}"));
                    return;
                }
            }
        }

        if let Some(frame) = frames.last() {
            consecutive_empty = 0;
            let pts = frame.pts().unwrap_or(0);
            let v = mdec.video.as_ref().unwrap();
            let frame_pts_secs = v.pts_to_secs(pts);
            let repeat_pict = if frame.repeat() { 1.0 } else { 0.0 };
            let extra_delay = repeat_pict / (2.0 * avg_fts);
            let wait = frame_pts_secs - current_time + extra_delay;

            if wait > 0.0 || bitmap_empty {
                if let Ok(rgb) = scaler.scale_to_rgb(frame) {
                    let out_dims = scaler.out_dims();
                    let mut alter = shared.alter.lock().unwrap();
                    alter.bitmap.publish(out_dims.width, out_dims.height, rgb);
                }
            }

            shared.sleep_on_exit_cond(Duration::from_secs_f64(wait.max(0.0)));
        } else {
            consecutive_empty += 1;
            if consecutive_empty >= EOF_SLEEP_THRESHOLD {
                consecutive_empty = 0;
                shared.sleep_on_exit_cond(EOF_SLEEP);
            }
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
