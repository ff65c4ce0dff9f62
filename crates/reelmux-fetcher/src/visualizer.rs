// crates/reelmux-fetcher/src/visualizer.rs
//
// Audio waveform visualization — spec.md §4.2's audio-visualization
// sub-loop. Grounded on video_thread.cpp's frame_audio_fetching_func, which
// peeks PCM out of the ring buffer and renders it into the shared frame
// without ever touching the read cursor. `audio_visualizer.h`'s actual
// drawing routine wasn't part of the retrieved source, so the waveform shape
// here (centered amplitude line, mono-averaged) is an original rendering of
// the same peek → normalize → draw pipeline the caller describes.

/// Average `channels`-interleaved PCM down to mono, normalized to [-1, 1].
pub fn to_mono(pcm: &[f32], channels: usize, nb_frames: usize) -> Vec<f32> {
    if channels == 0 {
        return Vec::new();
    }
    let mut mono = Vec::with_capacity(nb_frames);
    for frame in 0..nb_frames {
        let base = frame * channels;
        if base + channels > pcm.len() {
            break;
        }
        let sum: f32 = pcm[base..base + channels].iter().sum();
        mono.push((sum / channels as f32).clamp(-1.0, 1.0));
    }
    mono
}

/// Render a centered waveform line into a packed row-major RGB24 buffer of
/// `width` x `height`. Background is black; the waveform is drawn in white.
pub fn render_waveform(mono: &[f32], width: u32, height: u32) -> Vec<u8> {
    let width = width as usize;
    let height = height as usize;
    let mut rgb = vec![0u8; width * height * 3];
    if mono.is_empty() || width == 0 || height == 0 {
        return rgb;
    }

    let center = height as f32 / 2.0;
    for x in 0..width {
        let sample_idx = x * mono.len() / width;
        let amplitude = mono[sample_idx.min(mono.len() - 1)];
        let bar_half = (amplitude.abs() * center).round() as i64;
        let y_from = (center as i64 - bar_half).max(0) as usize;
        let y_to = ((center as i64 + bar_half) as usize).min(height.saturating_sub(1));
        for y in y_from..=y_to {
            let idx = (y * width + x) * 3;
            rgb[idx] = 255;
            rgb[idx + 1] = 255;
            rgb[idx + 2] = 255;
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_mono_averages_channels() {
        // 2 channels, 2 frames: (1,-1) -> 0.0, (0.5,0.5) -> 0.5
        let pcm = [1.0, -1.0, 0.5, 0.5];
        let mono = to_mono(&pcm, 2, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.0).abs() < 1e-6);
        assert!((mono[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn render_waveform_produces_correctly_sized_buffer() {
        let mono = vec![0.0, 0.5, -0.5, 1.0];
        let rgb = render_waveform(&mono, 8, 4);
        assert_eq!(rgb.len(), 8 * 4 * 3);
    }

    #[test]
    fn silent_signal_draws_only_the_center_row() {
        let mono = vec![0.0; 4];
        let rgb = render_waveform(&mono, 4, 5);
        let center_row = 2;
        for x in 0..4 {
            let idx = (center_row * 4 + x) * 3;
            assert_eq!(rgb[idx], 255);
        }
        for x in 0..4 {
            let idx = (0 * 4 + x) * 3;
            assert_eq!(rgb[idx], 0);
        }
    }

    #[test]
    fn empty_input_returns_black_frame() {
        let rgb = render_waveform(&[], 4, 4);
        assert!(rgb.iter().all(|&b| b == 0));
    }
}
