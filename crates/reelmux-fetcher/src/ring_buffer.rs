// crates/reelmux-fetcher/src/ring_buffer.rs
//
// AudioRingBuffer — spec.md §4.4. Plain, single-threaded circular buffer;
// every method here assumes the caller already holds whatever lock serializes
// access (see blocking_ring_buffer.rs for the Mutex+Condvar wrapper actually
// shared between the audio worker and the device callback). Grounded on the
// source project's audioringbuffer.h, which keeps exactly this split between
// an unsynchronized ring and a synchronized wrapper around it.

use crate::error::{FetcherError, FetcherResult};

/// Non-overwriting, fixed-capacity circular buffer of interleaved PCM
/// samples. One "frame" is one sample across all channels.
pub struct AudioRingBuffer {
    data: Vec<f32>,
    capacity_frames: usize,
    channels: usize,
    sample_rate: u32,
    start_time: f64,
    frames_read: u64,
    head: usize,
    tail: usize,
    len: usize,
}

impl AudioRingBuffer {
    pub fn new(capacity_frames: usize, channels: usize, sample_rate: u32, start_time: f64) -> Self {
        Self {
            data: vec![0.0; capacity_frames * channels],
            capacity_frames,
            channels,
            sample_rate,
            start_time,
            frames_read: 0,
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    pub fn frames_readable(&self) -> usize {
        self.len
    }

    pub fn frames_writable(&self) -> usize {
        self.capacity_frames - self.len
    }

    /// Reset to empty, anchored at a new playback timestamp. Used by the
    /// audio worker exactly once per completed seek.
    pub fn clear(&mut self, new_start_time: f64) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
        self.frames_read = 0;
        self.start_time = new_start_time;
    }

    pub fn current_time(&self) -> f64 {
        self.start_time + self.frames_read as f64 / self.sample_rate as f64
    }

    pub fn end_time(&self) -> f64 {
        self.current_time() + self.len as f64 / self.sample_rate as f64
    }

    pub fn is_time_in_bounds(&self, t: f64) -> bool {
        t >= self.current_time() && t <= self.end_time()
    }

    /// Advance the read cursor so `current_time() == t`, failing if `t`
    /// falls outside `[current_time(), end_time()]`.
    pub fn set_time_in_bounds(&mut self, t: f64) -> FetcherResult<()> {
        if !self.is_time_in_bounds(t) {
            return Err(FetcherError::SeekOutOfRange {
                target: t,
                duration: self.end_time(),
            });
        }
        let frames_to_skip = ((t - self.current_time()) * self.sample_rate as f64).round() as usize;
        self.advance_read(frames_to_skip);
        Ok(())
    }

    fn advance_read(&mut self, nb_frames: usize) {
        self.head = (self.head + nb_frames) % self.capacity_frames;
        self.len -= nb_frames;
        self.frames_read += nb_frames as u64;
    }

    /// Copy `nb_frames` out starting at the read cursor and advance it.
    /// Fails if fewer than `nb_frames` are currently readable.
    pub fn read_into(&mut self, nb_frames: usize, out: &mut [f32]) -> FetcherResult<()> {
        self.peek_into(nb_frames, out)?;
        self.advance_read(nb_frames);
        Ok(())
    }

    /// Copy `nb_frames` out without advancing the read cursor.
    pub fn peek_into(&self, nb_frames: usize, out: &mut [f32]) -> FetcherResult<()> {
        if nb_frames > self.len {
            return Err(FetcherError::RingBufferTimeout);
        }
        debug_assert!(out.len() >= nb_frames * self.channels);
        for i in 0..nb_frames {
            let src_frame = (self.head + i) % self.capacity_frames;
            let src = src_frame * self.channels;
            let dst = i * self.channels;
            out[dst..dst + self.channels].copy_from_slice(&self.data[src..src + self.channels]);
        }
        Ok(())
    }

    /// Write `nb_frames` in at the write cursor. Fails if fewer than
    /// `nb_frames` are currently writable — the buffer never overwrites
    /// unread data.
    pub fn write_into(&mut self, nb_frames: usize, src: &[f32]) -> FetcherResult<()> {
        if nb_frames > self.frames_writable() {
            return Err(FetcherError::RingBufferTimeout);
        }
        debug_assert!(src.len() >= nb_frames * self.channels);
        for i in 0..nb_frames {
            let dst_frame = (self.tail + i) % self.capacity_frames;
            let dst = dst_frame * self.channels;
            let s = i * self.channels;
            self.data[dst..dst + self.channels].copy_from_slice(&src[s..s + self.channels]);
        }
        self.tail = (self.tail + nb_frames) % self.capacity_frames;
        self.len += nb_frames;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(v: f32, channels: usize) -> Vec<f32> {
        vec![v; channels]
    }

    #[test]
    fn capacity_invariant_holds_after_writes() {
        let mut rb = AudioRingBuffer::new(8, 2, 48000, 0.0);
        assert_eq!(rb.frames_readable() + rb.frames_writable(), 8);
        let src: Vec<f32> = (0..6).flat_map(|i| frame(i as f32, 2)).collect();
        rb.write_into(3, &src).unwrap();
        assert_eq!(rb.frames_readable() + rb.frames_writable(), 8);
        assert_eq!(rb.frames_readable(), 3);
    }

    #[test]
    fn write_fails_when_insufficient_space() {
        let mut rb = AudioRingBuffer::new(4, 1, 48000, 0.0);
        let src = vec![1.0f32; 10];
        assert!(rb.write_into(5, &src).is_err());
    }

    #[test]
    fn read_fails_when_insufficient_data() {
        let mut rb = AudioRingBuffer::new(4, 1, 48000, 0.0);
        let mut out = vec![0.0f32; 3];
        assert!(rb.read_into(3, &mut out).is_err());
    }

    #[test]
    fn peek_does_not_advance_read_cursor() {
        let mut rb = AudioRingBuffer::new(4, 1, 48000, 0.0);
        rb.write_into(4, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut out = vec![0.0f32; 2];
        rb.peek_into(2, &mut out).unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
        assert_eq!(rb.frames_readable(), 4);
    }

    #[test]
    fn read_advances_cursor_and_frames_read() {
        let mut rb = AudioRingBuffer::new(4, 1, 48000, 0.0);
        rb.write_into(4, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut out = vec![0.0f32; 2];
        rb.read_into(2, &mut out).unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
        assert_eq!(rb.frames_readable(), 2);
        assert_eq!(rb.frames_read, 2);
    }

    #[test]
    fn current_time_matches_formula() {
        let mut rb = AudioRingBuffer::new(8, 1, 4, 10.0);
        rb.write_into(8, &[0.0; 8]).unwrap();
        let mut out = vec![0.0f32; 4];
        rb.read_into(4, &mut out).unwrap();
        // start_time=10, frames_read=4, sample_rate=4 -> 10 + 1.0 = 11.0
        assert!((rb.current_time() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn clear_resets_indices_and_anchors_new_start_time() {
        let mut rb = AudioRingBuffer::new(4, 1, 48000, 0.0);
        rb.write_into(4, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        rb.clear(5.0);
        assert_eq!(rb.frames_readable(), 0);
        assert_eq!(rb.frames_writable(), 4);
        assert!((rb.current_time() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn wraps_around_capacity_correctly() {
        let mut rb = AudioRingBuffer::new(4, 1, 48000, 0.0);
        rb.write_into(3, &[1.0, 2.0, 3.0]).unwrap();
        let mut tmp = vec![0.0f32; 3];
        rb.read_into(3, &mut tmp).unwrap();
        rb.write_into(4, &[4.0, 5.0, 6.0, 7.0]).unwrap();
        let mut out = vec![0.0f32; 4];
        rb.read_into(4, &mut out).unwrap();
        assert_eq!(out, vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn set_time_in_bounds_fails_outside_window() {
        let mut rb = AudioRingBuffer::new(8, 1, 4, 0.0);
        rb.write_into(8, &[0.0; 8]).unwrap();
        assert!(rb.set_time_in_bounds(-1.0).is_err());
        assert!(rb.set_time_in_bounds(100.0).is_err());
    }

    #[test]
    fn set_time_in_bounds_advances_to_requested_time() {
        let mut rb = AudioRingBuffer::new(8, 1, 4, 0.0);
        rb.write_into(8, &[0.0; 8]).unwrap();
        rb.set_time_in_bounds(1.0).unwrap(); // 1.0 * 4 = 4 frames in
        assert!((rb.current_time() - 1.0).abs() < 1e-9);
        assert_eq!(rb.frames_readable(), 4);
    }
}
