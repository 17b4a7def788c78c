//! Video file source using FFmpeg.
//!
//! Frames are decoded in-memory and scaled to 8-bit interleaved RGB.
//! Seeking lands on the nearest earlier keyframe and decodes forward to
//! the exact frame, so reverse traversal over long-GOP files is costly
//! but correct.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, Shape};

use super::{FrameSource, SourceReader};

fn codec_err(what: &str, err: ffmpeg::Error) -> CaptureError {
    CaptureError::Codec(format!("{what}: {err}"))
}

#[derive(Clone, Debug)]
pub struct FfmpegSource {
    path: PathBuf,
}

impl FfmpegSource {
    pub fn new(path: &Path) -> CaptureResult<Self> {
        ffmpeg::init().map_err(|err| codec_err("initialize ffmpeg", err))?;
        if !path.is_file() {
            return Err(CaptureError::SourceUnreadable {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl FrameSource for FfmpegSource {
    fn open(&self) -> CaptureResult<Box<dyn SourceReader>> {
        Ok(Box::new(FfmpegReader::start(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

struct FfmpegReader {
    path: PathBuf,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_duration: i64,
    frame_count: usize,
    // index of the frame the next read() returns
    position: usize,
    // index of the next frame the decoder will hand out
    decoded: usize,
}

impl FfmpegReader {
    fn start(path: &Path) -> CaptureResult<Self> {
        let input = ffmpeg::format::input(&path).map_err(|err| {
            log::warn!("ffmpeg cannot open '{}': {err}", path.display());
            CaptureError::SourceUnreadable {
                path: path.display().to_string(),
            }
        })?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| CaptureError::Codec("file has no video track".to_string()))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let rate = stream.avg_frame_rate();

        // ticks of one frame in stream time_base units
        let frame_duration = if rate.numerator() > 0 && time_base.numerator() > 0 {
            (i64::from(rate.denominator()) * i64::from(time_base.denominator()))
                / (i64::from(rate.numerator()) * i64::from(time_base.numerator()))
        } else {
            1
        };

        let frame_count = if stream.frames() > 0 {
            stream.frames() as usize
        } else if stream.duration() > 0 && frame_duration > 0 {
            (stream.duration() / frame_duration) as usize
        } else {
            0
        };

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|err| codec_err("load video decoder parameters", err))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|err| codec_err("open ffmpeg video decoder", err))?;
        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|err| codec_err("create ffmpeg scaler", err))?;

        Ok(Self {
            path: path.to_path_buf(),
            input,
            stream_index,
            decoder,
            scaler,
            frame_duration,
            frame_count,
            position: 0,
            decoded: 0,
        })
    }

    /// Advance the decode counter past the frame just received. The PTS
    /// is authoritative when present; after a seek it re-anchors the
    /// counter at wherever the demuxer actually landed.
    fn account(&mut self, raw: &ffmpeg::frame::Video) {
        match raw.pts() {
            Some(pts) if self.frame_duration > 0 => {
                self.decoded = (pts / self.frame_duration) as usize + 1;
            }
            _ => self.decoded += 1,
        }
    }

    /// Pull the next decoded frame in stream order.
    fn decode_next(&mut self) -> CaptureResult<Option<Frame>> {
        let mut raw = ffmpeg::frame::Video::empty();
        let mut rgb = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut raw).is_ok() {
                self.scaler
                    .run(&raw, &mut rgb)
                    .map_err(|err| codec_err("scale frame to RGB", err))?;
                self.account(&raw);
                return Ok(Some(video_to_frame(&rgb)?));
            }
            let mut sent = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .map_err(|err| codec_err("send packet to ffmpeg decoder", err))?;
                sent = true;
                break;
            }
            if !sent {
                // drain buffered frames at end of stream
                if self.decoder.send_eof().is_err() {
                    return Ok(None);
                }
                if self.decoder.receive_frame(&mut raw).is_ok() {
                    self.scaler
                        .run(&raw, &mut rgb)
                        .map_err(|err| codec_err("scale frame to RGB", err))?;
                    self.account(&raw);
                    return Ok(Some(video_to_frame(&rgb)?));
                }
                return Ok(None);
            }
        }
    }
}

impl SourceReader for FfmpegReader {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn read(&mut self) -> CaptureResult<Option<Frame>> {
        // skip decoded frames that precede the requested position
        while self.decoded < self.position {
            if self.decode_next()?.is_none() {
                return Ok(None);
            }
        }
        match self.decode_next()? {
            Some(frame) => {
                self.position = self.decoded;
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    fn seek(&mut self, position: usize) -> CaptureResult<()> {
        if self.frame_count > 0 && position >= self.frame_count {
            return Err(CaptureError::PositionOutOfRange {
                position,
                length: self.frame_count,
            });
        }
        let timestamp = position as i64 * self.frame_duration;
        self.input
            .seek(timestamp, ..timestamp)
            .map_err(|err| codec_err("seek in video file", err))?;
        self.decoder.flush();
        // The demuxer lands on a keyframe at or before the target; the
        // first decoded PTS re-anchors `decoded` and read() rolls forward
        // to the exact frame.
        self.decoded = 0;
        self.position = position;
        log::debug!(
            "seek to frame {position} in '{}' (keyframe rollforward)",
            self.path.display()
        );
        Ok(())
    }
}

fn video_to_frame(frame: &ffmpeg::frame::Video) -> CaptureResult<Frame> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let row_bytes = width * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);
    let shape = Shape::new(height, width, 3);

    if stride == row_bytes {
        return Frame::new(shape, data.to_vec());
    }
    let mut pixels = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let start = row * stride;
        let end = start + row_bytes;
        let line = data
            .get(start..end)
            .ok_or_else(|| CaptureError::Codec("ffmpeg frame row is out of bounds".to_string()))?;
        pixels.extend_from_slice(line);
    }
    Frame::new(shape, pixels)
}
