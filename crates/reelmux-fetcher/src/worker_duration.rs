// crates/reelmux-fetcher/src/worker_duration.rs
//
// Duration-watcher worker — spec.md §5's "exactly three long-lived workers
// per fetcher (video, audio, duration-watcher)." Grounded on
// mediafetcher.cpp's `duration_checking_thread`, spawned unconditionally
// alongside the video and audio threads (mediafetcher.cpp:158-163) and
// joined alongside them (mediafetcher.cpp:173-174). The watcher's own body
// wasn't part of the retrieved source, so this implements the minimal
// behavior its declared role requires: re-probe the container's reported
// duration until it stabilizes, covering files where duration was unknown
// at `MediaDecoder::open` time (demux.rs's `duration_secs <= 0` case).

use std::sync::Arc;
use std::time::Duration;

use ffmpeg_the_third::format::input;

use crate::fetcher::Shared;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const IDLE_INTERVAL: Duration = Duration::from_secs(3600);

pub(crate) fn run(shared: Arc<Shared>) {
    let mut stable = false;

    while !shared.should_exit() {
        if !stable {
            if let Ok(ictx) = input(&shared.path) {
                let raw = ictx.duration();
                if raw > 0 {
                    let secs = raw as f64 / f64::from(ffmpeg_the_third::ffi::AV_TIME_BASE);
                    let unchanged = (secs - shared.duration()).abs() < 1e-6;
                    shared.set_duration(secs);
                    stable = unchanged;
                }
            }
        }
        // Once the duration has stopped changing between checks there is
        // nothing left to watch for; back off to a long wait that the exit
        // condvar still interrupts promptly on shutdown.
        shared.sleep_on_exit_cond(if stable { IDLE_INTERVAL } else { POLL_INTERVAL });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_interval_is_longer_than_poll_interval() {
        assert!(IDLE_INTERVAL > POLL_INTERVAL);
    }
}
