// crates/reelmux-fetcher/src/resample.rs
//
// Audio resampler: decoded frames (whatever format/rate/layout the source
// uses) -> interleaved 32-bit float at the ring buffer's channel count and
// sample rate. Grounded on encode.rs's lazy resampler construction ("created
// lazily on the first audio frame so we know the real input format before
// building the SwrContext") and its mono-source channel-layout guard.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::Sample;
use ffmpeg::software::resampling::Context as SwrContext;
use ffmpeg::util::channel_layout::ChannelLayout;

use crate::error::{FetcherError, FetcherResult};

pub struct AudioResampler {
    ctx: SwrContext,
    out_channels: usize,
}

impl AudioResampler {
    pub fn new(
        src_format: Sample,
        src_layout: ChannelLayout,
        src_rate: u32,
        out_channels: u16,
        out_rate: u32,
    ) -> FetcherResult<Self> {
        // Mono sources must be declared MONO explicitly or swr misinterprets
        // the channel layout (same guard as encode.rs's resampler setup).
        let src_layout = if src_layout.channels() == 0 {
            ChannelLayout::MONO
        } else {
            src_layout
        };
        let out_layout = if out_channels >= 2 {
            ChannelLayout::STEREO
        } else {
            ChannelLayout::MONO
        };
        let target_fmt = Sample::F32(SampleType::Packed);
        let ctx = SwrContext::get(
            src_format,
            src_layout,
            src_rate,
            target_fmt,
            out_layout,
            out_rate,
        )
        .map_err(|e| FetcherError::DecodeError(format!("create audio resampler: {e}")))?;
        Ok(Self {
            ctx,
            out_channels: out_channels as usize,
        })
    }

    /// Resample one decoded frame, returning interleaved `f32` samples
    /// (`out_channels` floats per frame).
    pub fn resample(&mut self, frame: &ffmpeg::frame::Audio) -> FetcherResult<Vec<f32>> {
        let mut out = ffmpeg::frame::Audio::empty();
        self.ctx
            .run(frame, &mut out)
            .map_err(|e| FetcherError::DecodeError(format!("resample: {e}")))?;
        let samples = out.samples();
        if samples == 0 {
            return Ok(Vec::new());
        }
        let raw = out.data(0);
        let needed = samples * self.out_channels * std::mem::size_of::<f32>();
        let bytes = &raw[..needed.min(raw.len())];
        let mut pcm = vec![0f32; samples * self.out_channels];
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            if i >= pcm.len() {
                break;
            }
            pcm[i] = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(pcm)
    }

    /// Drain any samples buffered internally by the resampler (delay between
    /// input and output block sizes). Called once per audio-worker iteration
    /// per spec.md §4.3 ("drain any resampler internal delay buffer").
    pub fn flush(&mut self) -> FetcherResult<Vec<f32>> {
        let mut out = ffmpeg::frame::Audio::empty();
        match self.ctx.flush(&mut out) {
            Ok(_) => {
                let samples = out.samples();
                if samples == 0 {
                    return Ok(Vec::new());
                }
                let raw = out.data(0);
                let needed = samples * self.out_channels * std::mem::size_of::<f32>();
                let bytes = &raw[..needed.min(raw.len())];
                let mut pcm = vec![0f32; samples * self.out_channels];
                for (i, chunk) in bytes.chunks_exact(4).enumerate() {
                    if i >= pcm.len() {
                        break;
                    }
                    pcm[i] = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
                Ok(pcm)
            }
            Err(_) => Ok(Vec::new()),
        }
    }
}
