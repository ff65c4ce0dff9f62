// crates/reelmux-fetcher/src/stream_decoder.rs
//
// Per-stream decode state: one AVStream + its AVCodecContext plus the packet
// queue the demuxer feeds it. Grounded on the source project's
// streamdecoder.h — note its header comment: "a StreamDecoder is not
// responsible for putting packets into its own queue. This is the
// responsibility of the MediaDecoder class" (demux.rs here).

use std::collections::VecDeque;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::context::Context as CodecContext;
use ffmpeg::format::context::Input;
use ffmpeg::Packet;

use crate::error::{FetcherError, FetcherResult};

pub struct VideoStreamDecoder {
    pub stream_index: usize,
    pub time_base: (i32, i32),
    pub start_time_secs: f64,
    pub avg_frame_time_secs: f64,
    decoder: ffmpeg::decoder::Video,
    packet_queue: VecDeque<Packet>,
}

impl VideoStreamDecoder {
    pub fn open(ictx: &Input, stream_index: usize) -> FetcherResult<Self> {
        let stream = ictx
            .stream(stream_index)
            .ok_or_else(|| FetcherError::StreamSelectionFailure("video stream vanished".into()))?;
        let time_base = stream.time_base();
        let start_time_secs = if stream.start_time() == ffmpeg::ffi::AV_NOPTS_VALUE {
            0.0
        } else {
            stream.start_time() as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
        };
        let avg = stream.avg_frame_rate();
        let avg_frame_time_secs = if avg.numerator() == 0 {
            1.0 / 24.0
        } else {
            avg.denominator() as f64 / avg.numerator() as f64
        };
        let codec_ctx = CodecContext::from_parameters(stream.parameters())
            .map_err(|e| FetcherError::StreamSelectionFailure(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| FetcherError::StreamSelectionFailure(e.to_string()))?;
        Ok(Self {
            stream_index,
            time_base: (time_base.numerator(), time_base.denominator()),
            start_time_secs,
            avg_frame_time_secs,
            decoder,
            packet_queue: VecDeque::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    pub fn format(&self) -> ffmpeg::format::Pixel {
        self.decoder.format()
    }

    pub fn pts_to_secs(&self, pts: i64) -> f64 {
        pts as f64 * self.time_base.0 as f64 / self.time_base.1 as f64
    }

    pub fn has_packets(&self) -> bool {
        !self.packet_queue.is_empty()
    }

    pub fn push_back(&mut self, packet: Packet) {
        self.packet_queue.push_back(packet);
    }

    /// Drain the queued packets into the decoder and return every frame that
    /// comes out. Decode failures on an individual packet are soft-failed,
    /// matching decode.rs's tolerance for corrupt packets.
    pub fn decode_next(&mut self) -> Vec<ffmpeg::frame::Video> {
        let mut frames = Vec::new();
        while let Some(packet) = self.packet_queue.pop_front() {
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg::frame::Video::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                frames.push(decoded.clone());
            }
        }
        frames
    }

    /// Drop any in-flight state after a seek so the next decode starts clean.
    pub fn reset(&mut self) {
        self.packet_queue.clear();
        let _ = self.decoder.flush();
    }
}

pub struct AudioStreamDecoder {
    pub stream_index: usize,
    pub time_base: (i32, i32),
    pub start_time_secs: f64,
    decoder: ffmpeg::decoder::Audio,
    packet_queue: VecDeque<Packet>,
}

impl AudioStreamDecoder {
    pub fn open(ictx: &Input, stream_index: usize) -> FetcherResult<Self> {
        let stream = ictx
            .stream(stream_index)
            .ok_or_else(|| FetcherError::StreamSelectionFailure("audio stream vanished".into()))?;
        let time_base = stream.time_base();
        let start_time_secs = if stream.start_time() == ffmpeg::ffi::AV_NOPTS_VALUE {
            0.0
        } else {
            stream.start_time() as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
        };
        let codec_ctx = CodecContext::from_parameters(stream.parameters())
            .map_err(|e| FetcherError::StreamSelectionFailure(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .audio()
            .map_err(|e| FetcherError::StreamSelectionFailure(e.to_string()))?;
        Ok(Self {
            stream_index,
            time_base: (time_base.numerator(), time_base.denominator()),
            start_time_secs,
            decoder,
            packet_queue: VecDeque::new(),
        })
    }

    pub fn channels(&self) -> u16 {
        self.decoder.channels()
    }

    pub fn rate(&self) -> u32 {
        self.decoder.rate()
    }

    pub fn format(&self) -> ffmpeg::format::Sample {
        self.decoder.format()
    }

    pub fn channel_layout(&self) -> ffmpeg::util::channel_layout::ChannelLayout {
        self.decoder.channel_layout()
    }

    pub fn has_packets(&self) -> bool {
        !self.packet_queue.is_empty()
    }

    pub fn push_back(&mut self, packet: Packet) {
        self.packet_queue.push_back(packet);
    }

    pub fn decode_next(&mut self) -> Vec<ffmpeg::frame::Audio> {
        let mut frames = Vec::new();
        while let Some(packet) = self.packet_queue.pop_front() {
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg::frame::Audio::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                frames.push(decoded.clone());
            }
        }
        frames
    }

    pub fn reset(&mut self) {
        self.packet_queue.clear();
        let _ = self.decoder.flush();
    }
}
