// crates/reelmux-fetcher/src/blocking_ring_buffer.rs
//
// BlockingAudioRingBuffer — the Mutex+Condvar wrapper the audio worker and
// the device callback actually share. Grounded on blocking_audioringbuffer.h,
// which wraps a plain AudioRingBuffer with exactly this mutex/condvar pair and
// exposes both blocking and timed-try variants of each operation.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::FetcherResult;
use crate::ring_buffer::AudioRingBuffer;

pub struct BlockingAudioRingBuffer {
    inner: Mutex<AudioRingBuffer>,
    space_available: Condvar,
    data_available: Condvar,
}

impl BlockingAudioRingBuffer {
    pub fn new(capacity_frames: usize, channels: usize, sample_rate: u32, start_time: f64) -> Self {
        Self {
            inner: Mutex::new(AudioRingBuffer::new(
                capacity_frames,
                channels,
                sample_rate,
                start_time,
            )),
            space_available: Condvar::new(),
            data_available: Condvar::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.inner.lock().unwrap().channels()
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.lock().unwrap().sample_rate()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.lock().unwrap().current_time()
    }

    pub fn end_time(&self) -> f64 {
        self.inner.lock().unwrap().end_time()
    }

    pub fn is_time_in_bounds(&self, t: f64) -> bool {
        self.inner.lock().unwrap().is_time_in_bounds(t)
    }

    pub fn set_time_in_bounds(&self, t: f64) -> FetcherResult<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.set_time_in_bounds(t)?;
        self.space_available.notify_all();
        Ok(())
    }

    pub fn clear(&self, new_start_time: f64) {
        let mut guard = self.inner.lock().unwrap();
        guard.clear(new_start_time);
        self.space_available.notify_all();
    }

    /// Blocks indefinitely until `nb_frames` can be written.
    pub fn write_into(&self, nb_frames: usize, src: &[f32]) -> FetcherResult<()> {
        let mut guard = self.inner.lock().unwrap();
        while guard.frames_writable() < nb_frames {
            guard = self.space_available.wait(guard).unwrap();
        }
        guard.write_into(nb_frames, src)?;
        self.data_available.notify_all();
        Ok(())
    }

    /// Blocks up to `timeout` for `nb_frames` of free space; returns `false`
    /// on timeout without writing anything.
    pub fn try_write_into(&self, nb_frames: usize, src: &[f32], timeout: Duration) -> FetcherResult<bool> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock().unwrap();
        while guard.frames_writable() < nb_frames {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let (next_guard, result) = self
                .space_available
                .wait_timeout(guard, deadline - now)
                .unwrap();
            guard = next_guard;
            if result.timed_out() && guard.frames_writable() < nb_frames {
                return Ok(false);
            }
        }
        guard.write_into(nb_frames, src)?;
        self.data_available.notify_all();
        Ok(true)
    }

    pub fn read_into(&self, nb_frames: usize, out: &mut [f32]) -> FetcherResult<()> {
        let mut guard = self.inner.lock().unwrap();
        while guard.frames_readable() < nb_frames {
            guard = self.data_available.wait(guard).unwrap();
        }
        guard.read_into(nb_frames, out)?;
        self.space_available.notify_all();
        Ok(())
    }

    /// Used by the device callback, which must never block arbitrarily —
    /// a miss here means silence for this callback period, not a stall.
    pub fn try_read_into(&self, nb_frames: usize, out: &mut [f32], timeout: Duration) -> FetcherResult<bool> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock().unwrap();
        while guard.frames_readable() < nb_frames {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let (next_guard, result) = self
                .data_available
                .wait_timeout(guard, deadline - now)
                .unwrap();
            guard = next_guard;
            if result.timed_out() && guard.frames_readable() < nb_frames {
                return Ok(false);
            }
        }
        guard.read_into(nb_frames, out)?;
        self.space_available.notify_all();
        Ok(true)
    }

    pub fn peek_into(&self, nb_frames: usize, out: &mut [f32]) -> FetcherResult<()> {
        let guard = self.inner.lock().unwrap();
        guard.peek_into(nb_frames, out)
    }

    /// Used by the audio-visualization sub-loop (spec.md §4.3): must never
    /// advance the read cursor, even on success.
    pub fn try_peek_into(&self, nb_frames: usize, out: &mut [f32], timeout: Duration) -> FetcherResult<bool> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock().unwrap();
        while guard.frames_readable() < nb_frames {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let (next_guard, result) = self
                .data_available
                .wait_timeout(guard, deadline - now)
                .unwrap();
            guard = next_guard;
            if result.timed_out() && guard.frames_readable() < nb_frames {
                return Ok(false);
            }
        }
        guard.peek_into(nb_frames, out)?;
        Ok(true)
    }

    pub fn frames_readable(&self) -> usize {
        self.inner.lock().unwrap().frames_readable()
    }

    pub fn frames_writable(&self) -> usize {
        self.inner.lock().unwrap().frames_writable()
    }

    pub fn capacity_frames(&self) -> usize {
        self.inner.lock().unwrap().capacity_frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn try_write_returns_false_on_timeout_with_no_reader() {
        let rb = BlockingAudioRingBuffer::new(4, 1, 48000, 0.0);
        let src = vec![1.0f32; 4];
        assert!(rb.try_write_into(4, &src, Duration::from_millis(10)).unwrap());
        // buffer now full; a second write should time out
        let ok = rb.try_write_into(1, &src, Duration::from_millis(10)).unwrap();
        assert!(!ok);
    }

    #[test]
    fn backpressure_bounds_total_frames_written_without_reader() {
        // spec.md §8 scenario S5: producer writes 2C frames with a blocking
        // try_write_into; with no reader draining, actual writes are capped
        // at C.
        let capacity = 8usize;
        let rb = BlockingAudioRingBuffer::new(capacity, 1, 48000, 0.0);
        let src = vec![0.5f32; 1];
        let mut written = 0;
        for _ in 0..(2 * capacity) {
            if rb.try_write_into(1, &src, Duration::from_millis(10)).unwrap() {
                written += 1;
            }
        }
        assert!(written <= capacity);
    }

    #[test]
    fn reader_draining_in_real_time_lets_producer_complete() {
        let capacity = 4usize;
        let rb = Arc::new(BlockingAudioRingBuffer::new(capacity, 1, 48000, 0.0));
        let reader_rb = Arc::clone(&rb);
        let reader = thread::spawn(move || {
            let mut out = vec![0.0f32; 1];
            for _ in 0..16 {
                let _ = reader_rb.try_read_into(1, &mut out, Duration::from_millis(50));
            }
        });
        let src = vec![0.25f32; 1];
        let mut written = 0;
        for _ in 0..16 {
            if rb.try_write_into(1, &src, Duration::from_millis(50)).unwrap() {
                written += 1;
            }
        }
        reader.join().unwrap();
        assert_eq!(written, 16);
    }

    #[test]
    fn peek_never_advances_read_cursor() {
        let rb = BlockingAudioRingBuffer::new(4, 1, 48000, 0.0);
        rb.write_into(4, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut out = vec![0.0f32; 2];
        assert!(rb.try_peek_into(2, &mut out, Duration::from_millis(10)).unwrap());
        assert_eq!(rb.frames_readable(), 4);
    }
}
