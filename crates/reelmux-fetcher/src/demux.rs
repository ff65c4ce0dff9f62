// crates/reelmux-fetcher/src/demux.rs
//
// MediaDecoder façade — spec.md §4.1. Grounded on the source project's
// mediadecoder.h ("high level interface between a media file and that
// file's media streams... allows seeking") and on decode.rs for the actual
// ffmpeg-the-third call shapes (dual Input handles for seeking vs. decoder
// construction, packets().flatten() demux loop).

use std::path::{Path, PathBuf};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::context::Input;
use ffmpeg::format::{input, stream::Disposition};
use ffmpeg::media::Type as AvMediaType;

use reelmux_core::MediaKind;

use crate::error::{FetcherError, FetcherResult};
use crate::stream_decoder::{AudioStreamDecoder, VideoStreamDecoder};

/// Pseudo-formats that decode technically but make no sense for this player
/// (the teletype/ANSI-art containers the source project explicitly rejects).
const FORMAT_BLACKLIST: &[&str] = &["tty", "ansi"];

const IMAGE_FORMATS: &[&str] = &[
    "image2", "png_pipe", "jpeg_pipe", "gif", "webp_pipe", "bmp_pipe", "tiff_pipe",
];
const AUDIO_FORMATS: &[&str] = &["mp3", "wav", "flac", "ogg", "opus", "aac", "ac3"];
const VIDEO_FORMATS: &[&str] = &["mov,mp4,m4a,3gp,3g2,mj2", "matroska,webm", "avi"];

pub struct MediaDecoder {
    pub path: PathBuf,
    ictx: Input,
    pub video: Option<VideoStreamDecoder>,
    pub audio: Option<AudioStreamDecoder>,
    pub media_type: MediaKind,
    duration_secs: f64,
}

fn format_name(ictx: &Input) -> String {
    ictx.format().name().to_string()
}

fn best_stream_index(ictx: &Input, kind: AvMediaType) -> Option<usize> {
    ictx.streams().best(kind).map(|s| s.index())
}

fn all_video_streams_are_attached_pics(ictx: &Input) -> bool {
    let mut saw_any = false;
    for stream in ictx.streams() {
        if stream.parameters().medium() == AvMediaType::Video {
            saw_any = true;
            if !stream.disposition().contains(Disposition::ATTACHED_PIC) {
                return false;
            }
        }
    }
    saw_any
}

fn classify(
    ictx: &Input,
    has_video: bool,
    has_audio: bool,
) -> FetcherResult<MediaKind> {
    let fmt = format_name(ictx);

    if IMAGE_FORMATS.iter().any(|f| fmt == *f) {
        return Ok(MediaKind::Image);
    }
    if AUDIO_FORMATS.iter().any(|f| fmt == *f) {
        return Ok(MediaKind::Audio);
    }
    if VIDEO_FORMATS.iter().any(|f| fmt == *f) {
        return Ok(MediaKind::Video);
    }
    if has_video && !has_audio && ictx.duration() <= 0 {
        return Ok(MediaKind::Image);
    }
    if has_video && all_video_streams_are_attached_pics(ictx) {
        return Ok(if has_audio { MediaKind::Audio } else { MediaKind::Image });
    }
    if has_video {
        return Ok(MediaKind::Video);
    }
    if has_audio {
        return Ok(MediaKind::Audio);
    }
    Err(FetcherError::UnknownMediaType)
}

impl MediaDecoder {
    /// `want_video`/`want_audio` is the caller-provided stream mask: a
    /// renderer with audio visualization disabled and no attached-picture
    /// support might open with `want_video = false`.
    pub fn open(path: &Path, want_video: bool, want_audio: bool) -> FetcherResult<Self> {
        let ictx = input(path).map_err(|e| FetcherError::OpenFailure(e.to_string()))?;

        let fmt = format_name(&ictx);
        if FORMAT_BLACKLIST.iter().any(|f| fmt == *f) {
            return Err(FetcherError::UnsupportedFormat(fmt));
        }

        let video_idx = if want_video {
            best_stream_index(&ictx, AvMediaType::Video)
        } else {
            None
        };
        let audio_idx = if want_audio {
            best_stream_index(&ictx, AvMediaType::Audio)
        } else {
            None
        };

        let media_type = classify(&ictx, video_idx.is_some(), audio_idx.is_some())?;

        let duration_secs = if ictx.duration() > 0 {
            ictx.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE)
        } else {
            0.0
        };

        // Reopen for decoder construction: ffmpeg-the-third's Parameters
        // borrow from the Stream, which borrows from this Input, so decoder
        // setup needs its own handle distinct from the one `ictx` retains
        // for seeking/demuxing (same shape as decode.rs's `ictx`/`ictx2`).
        let video = match video_idx {
            Some(idx) => {
                let dec_ictx = input(path).map_err(|e| FetcherError::OpenFailure(e.to_string()))?;
                Some(VideoStreamDecoder::open(&dec_ictx, idx)?)
            }
            None => None,
        };
        let audio = match audio_idx {
            Some(idx) => {
                let dec_ictx = input(path).map_err(|e| FetcherError::OpenFailure(e.to_string()))?;
                Some(AudioStreamDecoder::open(&dec_ictx, idx)?)
            }
            None => None,
        };

        if video.is_none() && audio.is_none() {
            return Err(FetcherError::StreamSelectionFailure(
                "no usable video or audio stream".into(),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            ictx,
            video,
            audio,
            media_type,
            duration_secs,
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration_secs
    }

    pub fn has_media_stream(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Video | MediaKind::Image => self.video.is_some(),
            MediaKind::Audio => self.audio.is_some(),
        }
    }

    /// Seek the container to `target` seconds and reset both decoders. The
    /// caller must subsequently drain each decoder until delivered frames
    /// reach or pass `target` (spec.md §4.1).
    pub fn jump_to_time(&mut self, target: f64) -> FetcherResult<()> {
        if target < 0.0 || (self.duration_secs > 0.0 && target > self.duration_secs) {
            return Err(FetcherError::SeekOutOfRange {
                target,
                duration: self.duration_secs,
            });
        }
        // Backward seek: lands on the keyframe at-or-before `target`, so the
        // caller's PTS-based drain can discard pre-roll frames and still
        // deliver the first frame at or past `target` (matches the source
        // project's seek direction rationale).
        let seek_ts = (target * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
        self.ictx
            .seek(seek_ts, ..=seek_ts)
            .map_err(|e| FetcherError::SeekError(e.to_string()))?;
        if let Some(v) = &mut self.video {
            v.reset();
        }
        if let Some(a) = &mut self.audio {
            a.reset();
        }
        Ok(())
    }

    /// Demux packets, routing each to the decoder that owns its stream
    /// index, until one lands on `want_idx` or the container truly has no
    /// packets left. Off-type packets encountered along the way are routed
    /// to their own queue and the loop keeps going — a single interleaved
    /// packet for the other stream must never look like EOF for this one.
    /// Returns `false` only on genuine container exhaustion.
    fn fetch_packets_until(&mut self, want_idx: Option<usize>) -> bool {
        let video_idx = self.video.as_ref().map(|v| v.stream_index);
        let audio_idx = self.audio.as_ref().map(|a| a.stream_index);

        for (stream, packet) in self.ictx.packets().flatten() {
            let idx = stream.index();
            if Some(idx) == video_idx {
                if let Some(v) = &mut self.video {
                    v.push_back(packet);
                }
            } else if Some(idx) == audio_idx {
                if let Some(a) = &mut self.audio {
                    a.push_back(packet);
                }
            }
            if Some(idx) == want_idx {
                return true;
            }
        }
        false
    }

    pub fn next_video_frames(&mut self) -> Vec<ffmpeg::frame::Video> {
        if self.video.is_none() {
            return Vec::new();
        }
        let want_idx = self.video.as_ref().map(|v| v.stream_index);
        loop {
            if self.video.as_ref().unwrap().has_packets() {
                let frames = self.video.as_mut().unwrap().decode_next();
                if !frames.is_empty() {
                    return frames;
                }
            }
            if !self.fetch_packets_until(want_idx) {
                return Vec::new(); // EOF: container has no more packets at all
            }
        }
    }

    pub fn next_audio_frames(&mut self) -> Vec<ffmpeg::frame::Audio> {
        if self.audio.is_none() {
            return Vec::new();
        }
        let want_idx = self.audio.as_ref().map(|a| a.stream_index);
        loop {
            if self.audio.as_ref().unwrap().has_packets() {
                let frames = self.audio.as_mut().unwrap().decode_next();
                if !frames.is_empty() {
                    return frames;
                }
            }
            if !self.fetch_packets_until(want_idx) {
                return Vec::new();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_blacklist_rejects_teletype() {
        assert!(FORMAT_BLACKLIST.contains(&"tty"));
    }
}
