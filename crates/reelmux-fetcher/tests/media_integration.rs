// Integration tests exercising MediaFetcher and MediaDecoder against real
// media files. Scenarios mirror spec.md §8's S1-S6 and rely on fixtures this
// pack does not ship (tests/data/*.{mp4,png}); each one guards on the
// fixture's existence and returns early if it's absent, matching
// iced_lens's video_integration.rs convention (`if !Path::new(path).exists()
// { return; }`) rather than `#[ignore]`, so they run and pass trivially here
// but exercise the real scenario the moment a fixture is dropped in.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use reelmux_fetcher::{FetcherFlags, MediaFetcher, MediaKind};

fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[test]
fn open_nonexistent_path_fails_cleanly() {
    let err = MediaFetcher::open(Path::new("tests/data/does_not_exist.mp4"), FetcherFlags::empty());
    assert!(err.is_err());
}

#[test]
fn s1_playback_monotonicity() {
    let path = Path::new("tests/data/sample_10s_24fps_48k_stereo.mp4");
    if !path.exists() {
        return;
    }
    let mut fetcher = MediaFetcher::open(path, FetcherFlags::empty()).unwrap();
    let t0 = wall_clock_secs();
    fetcher.begin(t0).unwrap();

    let mut publications = 0u32;
    let deadline = t0 + 1.0;
    while wall_clock_secs() < deadline {
        if fetcher.take_bitmap_snapshot().changed {
            publications += 1;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    let now = wall_clock_secs();
    let played = fetcher.get_time(now);
    assert!((played - 1.0).abs() < 0.05, "played={played}");
    assert!(publications >= 20, "publications={publications}");

    if let Some(rb) = fetcher.ring_buffer() {
        let frames_read = (rb.current_time() * rb.sample_rate() as f64) as i64;
        assert!((frames_read - 48000).abs() < 2000, "frames_read={frames_read}");
    }

    fetcher.join(wall_clock_secs());
}

#[test]
fn s2_pause_resume_freezes_and_continues_time() {
    let path = Path::new("tests/data/sample_10s_24fps_48k_stereo.mp4");
    if !path.exists() {
        return;
    }
    let mut fetcher = MediaFetcher::open(path, FetcherFlags::empty()).unwrap();
    fetcher.begin(0.0).unwrap();

    fetcher.pause(0.5);
    assert!((fetcher.get_time(1.5) - 0.5).abs() < 0.05);

    fetcher.resume(1.5);
    assert!((fetcher.get_time(2.5) - 1.5).abs() < 0.05);

    fetcher.join(2.5);
}

#[test]
fn s3_seek_forward_lands_past_target() {
    let path = Path::new("tests/data/sample_10s_24fps_48k_stereo.mp4");
    if !path.exists() {
        return;
    }
    let mut fetcher = MediaFetcher::open(path, FetcherFlags::empty()).unwrap();
    fetcher.begin(0.0).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1000));

    fetcher.jump_to_time(5.0, 1.0).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(500));

    let now = wall_clock_secs();
    let played = fetcher.get_time(now);
    assert!(played >= 4.9, "played={played}");

    if let Some(rb) = fetcher.ring_buffer() {
        assert!((rb.current_time() - 5.0).abs() < 0.5);
    }

    fetcher.join(now);
}

#[test]
fn s4_image_file_publishes_single_bitmap_no_audio_worker() {
    let path = Path::new("tests/data/sample.png");
    if !path.exists() {
        return;
    }
    let mut fetcher = MediaFetcher::open(path, FetcherFlags::empty()).unwrap();
    assert_eq!(fetcher.media_type(), MediaKind::Image);
    assert!(!fetcher.has_media_stream(MediaKind::Audio));
    assert!(fetcher.ring_buffer().is_none());

    fetcher.begin(0.0).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(200));
    let snapshot = fetcher.take_bitmap_snapshot();
    assert!(snapshot.changed);
    assert!(snapshot.width > 0 && snapshot.height > 0);

    fetcher.join(0.2);
}

#[test]
fn s6_clean_shutdown_within_bound() {
    let path = Path::new("tests/data/sample_10s_24fps_48k_stereo.mp4");
    if !path.exists() {
        return;
    }
    let mut fetcher = MediaFetcher::open(path, FetcherFlags::empty()).unwrap();
    fetcher.begin(0.0).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(300));

    let start = std::time::Instant::now();
    fetcher.join(0.3);
    assert!(start.elapsed() < std::time::Duration::from_millis(500));
    assert!(!fetcher.is_playing());
}
