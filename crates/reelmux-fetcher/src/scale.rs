// crates/reelmux-fetcher/src/scale.rs
//
// Video scaler wrapper around ffmpeg's swscale, configured for RGB24 output
// (the renderer's ASCII-art mapping is a pure function of raw RGB — see
// spec.md §5/§6 — so color conversion belongs entirely to swscale, never to
// this crate). Grounded on decode.rs's `SwsContext::get` usage and reelmux-
// core's geometry module for the bound computation.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};

use reelmux_core::geometry::{bound_for_terminal, Dim2};

use crate::error::{FetcherError, FetcherResult};

pub struct VideoScaler {
    src_format: Pixel,
    src_width: u32,
    src_height: u32,
    out_dims: Dim2,
    ctx: SwsContext,
}

impl VideoScaler {
    pub fn new(
        src_format: Pixel,
        src_width: u32,
        src_height: u32,
        requested: Option<Dim2>,
    ) -> FetcherResult<Self> {
        let out_dims = bound_for_terminal(src_width, src_height, requested);
        let ctx = SwsContext::get(
            src_format,
            src_width,
            src_height,
            Pixel::RGB24,
            out_dims.width,
            out_dims.height,
            Flags::BILINEAR,
        )
        .map_err(|e| FetcherError::DecodeError(format!("scaler init: {e}")))?;
        Ok(Self {
            src_format,
            src_width,
            src_height,
            out_dims,
            ctx,
        })
    }

    pub fn out_dims(&self) -> Dim2 {
        self.out_dims
    }

    /// Rebuild the scaler if the renderer's requested output dims changed.
    /// Called by the video worker once per loop iteration (spec.md §4.2).
    pub fn reconfigure_if_needed(&mut self, requested: Option<Dim2>) -> FetcherResult<bool> {
        let new_dims = bound_for_terminal(self.src_width, self.src_height, requested);
        if new_dims == self.out_dims {
            return Ok(false);
        }
        self.ctx = SwsContext::get(
            self.src_format,
            self.src_width,
            self.src_height,
            Pixel::RGB24,
            new_dims.width,
            new_dims.height,
            Flags::BILINEAR,
        )
        .map_err(|e| FetcherError::DecodeError(format!("scaler reconfigure: {e}")))?;
        self.out_dims = new_dims;
        Ok(true)
    }

    /// Scale `frame` and return packed (stride-free) row-major RGB24 bytes.
    pub fn scale_to_rgb(&mut self, frame: &ffmpeg::frame::Video) -> FetcherResult<Vec<u8>> {
        let mut out = ffmpeg::frame::Video::empty();
        self.ctx
            .run(frame, &mut out)
            .map_err(|e| FetcherError::DecodeError(format!("scale: {e}")))?;
        let stride = out.stride(0);
        let raw = out.data(0);
        let row_bytes = self.out_dims.width as usize * 3;
        let mut packed = Vec::with_capacity(row_bytes * self.out_dims.height as usize);
        for row in 0..self.out_dims.height as usize {
            let start = row * stride;
            packed.extend_from_slice(&raw[start..start + row_bytes]);
        }
        Ok(packed)
    }
}
