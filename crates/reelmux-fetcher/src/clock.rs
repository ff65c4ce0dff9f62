// crates/reelmux-fetcher/src/clock.rs
//
// MediaClock — spec.md §3 & §4.6. A pure value object, no internal thread;
// every method is called by the coordinator or a worker while holding the
// fetcher's alter-mutex (see fetcher.rs). Grounded on the source project's
// mediaclock.h, whose four state fields (m_start_time, m_paused_time,
// m_skipped_time, m_last_pause_system_time) this mirrors one-to-one.

#[derive(Clone, Copy, Debug)]
pub struct MediaClock {
    playing: bool,
    anchor_system_time: f64,
    accum_paused: f64,
    accum_skipped: f64,
    last_pause_system_time: f64,
}

impl Default for MediaClock {
    fn default() -> Self {
        Self {
            playing: false,
            anchor_system_time: 0.0,
            accum_paused: 0.0,
            accum_skipped: 0.0,
            last_pause_system_time: 0.0,
        }
    }
}

impl MediaClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin playback fresh at `current_system_time` (playback time 0).
    /// Not for resuming after a pause — use `resume` for that.
    pub fn init(&mut self, current_system_time: f64) {
        self.anchor_system_time = current_system_time;
        self.accum_paused = 0.0;
        self.accum_skipped = 0.0;
        self.last_pause_system_time = current_system_time;
        self.playing = true;
    }

    /// Current playback time in seconds, accounting for pauses and skips.
    /// While paused, the reference point is frozen at the system time the
    /// clock was stopped, so the result is independent of `current_system_time`.
    pub fn get_time(&self, current_system_time: f64) -> f64 {
        let end_time = if self.playing {
            current_system_time
        } else {
            self.last_pause_system_time
        };
        (end_time - self.anchor_system_time) - self.accum_paused + self.accum_skipped
    }

    pub fn stop(&mut self, current_system_time: f64) {
        if self.playing {
            self.last_pause_system_time = current_system_time;
            self.playing = false;
        }
    }

    pub fn resume(&mut self, current_system_time: f64) {
        if !self.playing {
            self.accum_paused += current_system_time - self.last_pause_system_time;
            self.playing = true;
        }
    }

    pub fn toggle(&mut self, current_system_time: f64) {
        if self.playing {
            self.stop(current_system_time);
        } else {
            self.resume(current_system_time);
        }
    }

    /// Shift playback time by `seconds_to_skip` (may be negative for a
    /// backward seek). Never changes the playing/paused state.
    pub fn skip(&mut self, seconds_to_skip: f64) {
        self.accum_skipped += seconds_to_skip;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_while_playing_uninterrupted() {
        let mut c = MediaClock::new();
        c.init(10.0);
        let t0 = c.get_time(11.0);
        let t1 = c.get_time(13.5);
        assert!((t1 - t0 - 2.5).abs() < 1e-9);
    }

    #[test]
    fn pause_freezes_time() {
        let mut c = MediaClock::new();
        c.init(0.0);
        c.stop(0.5);
        assert!((c.get_time(1.5) - 0.5).abs() < 1e-9);
        c.resume(1.5);
        assert!((c.get_time(2.5) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn resume_continues_from_pre_pause_offset_plus_elapsed() {
        // spec.md §8 invariant 3: get_time(t) = get_time(tp) + (t - tr) for t >= tr
        let mut c = MediaClock::new();
        c.init(0.0);
        let tp = 3.0;
        c.stop(tp);
        let pre_pause = c.get_time(tp);
        let tr = 7.0;
        c.resume(tr);
        for t in [7.0, 9.25, 20.0] {
            let expected = pre_pause + (t - tr);
            assert!((c.get_time(t) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn skip_shifts_time_by_exact_delta() {
        let mut c = MediaClock::new();
        c.init(0.0);
        let before = c.get_time(1.0);
        c.skip(4.0);
        assert!((c.get_time(1.0) - (before + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn skip_never_unpauses() {
        let mut c = MediaClock::new();
        c.init(0.0);
        c.stop(1.0);
        c.skip(2.0);
        assert!(!c.is_playing());
    }

    #[test]
    fn toggle_flips_playing_state() {
        let mut c = MediaClock::new();
        c.init(0.0);
        assert!(c.is_playing());
        c.toggle(1.0);
        assert!(!c.is_playing());
        c.toggle(2.0);
        assert!(c.is_playing());
    }
}
