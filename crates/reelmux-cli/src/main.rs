// crates/reelmux-cli/src/main.rs
//
// Minimal headless exerciser for the media fetcher core. Argument parsing,
// playlists, and terminal rendering are explicitly out of scope for this
// crate (see SPEC_FULL.md's Non-goals) — this binary exists to drive
// MediaFetcher's public API end to end against a real file path.

use std::env;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use reelmux_fetcher::{AudioOut, FetcherFlags, MediaFetcher, MediaKind, RingBufferSource};

fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let path = match args.next() {
        Some(p) => p,
        None => {
            eprintln!("usage: reelmux <media-file>");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(&path) {
        eprintln!("[reelmux] error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(path: &str) -> anyhow::Result<()> {
    let flags = FetcherFlags::empty().with(FetcherFlags::VISUALIZE_VIDEO);
    let mut fetcher = MediaFetcher::open(path.as_ref(), flags).map_err(|e| anyhow::anyhow!(e))?;

    eprintln!(
        "[reelmux] opened {path}: type={:?} duration={:.2}s video={} audio={}",
        fetcher.media_type(),
        fetcher.duration(),
        fetcher.has_media_stream(MediaKind::Video),
        fetcher.has_media_stream(MediaKind::Audio),
    );

    let mut audio_out = if fetcher.has_media_stream(MediaKind::Audio) {
        let rb = fetcher.ring_buffer().expect("audio stream implies ring buffer");
        let mut out = AudioOut::new(fetcher.channels(), fetcher.sample_rate()).map_err(|e| anyhow::anyhow!(e))?;
        out.start(Box::new(RingBufferSource::new(rb))).map_err(|e| anyhow::anyhow!(e))?;
        Some(out)
    } else {
        None
    };

    let t0 = wall_clock_secs();
    fetcher.begin(t0).map_err(|e| anyhow::anyhow!(e))?;

    let run_for = Duration::from_secs(5);
    let started = Instant::now();
    while started.elapsed() < run_for {
        if fetcher.has_error() {
            break;
        }
        let now = wall_clock_secs();
        let snapshot = fetcher.take_bitmap_snapshot();
        if snapshot.changed {
            eprintln!(
                "[reelmux] t={:.2}s frame {}x{} desync={:.3}s",
                fetcher.get_time(now),
                snapshot.width,
                snapshot.height,
                fetcher.get_audio_desync_time(now),
            );
        }
        thread::sleep(Duration::from_millis(33));
    }

    if let Some(err) = fetcher.take_error() {
        eprintln!("[reelmux] worker error: {err}");
    }

    if let Some(out) = audio_out.as_mut() {
        out.stop();
    }
    fetcher.join(wall_clock_secs());
    Ok(())
}
