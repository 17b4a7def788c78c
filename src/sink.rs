//! Frame sinks.
//!
//! Counterpart of the source layer: a [`FrameSink`] accepts RGB frames one
//! at a time and flushes on `finish`. Provided sinks:
//! - In-memory collection (testing)
//! - Numbered image files in a directory
//! - Encoded video files (feature: source-ffmpeg)
//!
//! Sinks receive frames in forward order only; labels are not part of the
//! output format.

use std::path::{Path, PathBuf};

use crate::error::{CaptureError, CaptureResult};
use crate::frame::Frame;

/// Destination for an RGB frame stream.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> CaptureResult<()>;

    /// Flush and close the destination. Must be called exactly once, after
    /// the last frame.
    fn finish(&mut self) -> CaptureResult<()>;
}

// -------------------- In-memory sink --------------------

/// Collects written frames; tests inspect `frames()` after `finish`.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<Frame>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> CaptureResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> CaptureResult<()> {
        self.finished = true;
        Ok(())
    }
}

// -------------------- Image sequence sink --------------------

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: usize,
}

impl ImageSequenceSink {
    /// The directory must already exist; this sink never creates paths.
    pub fn new(dir: &Path) -> CaptureResult<Self> {
        if !dir.is_dir() {
            return Err(CaptureError::SourceUnreadable {
                path: dir.display().to_string(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &Frame) -> CaptureResult<()> {
        let shape = frame.shape();
        let buffer = image::RgbImage::from_raw(
            shape.width as u32,
            shape.height as u32,
            frame.as_bytes().to_vec(),
        )
        .ok_or_else(|| CaptureError::Codec(format!("frame {} is not packed RGB", shape)))?;
        let path = self.dir.join(format!("frame_{:06}.png", self.written));
        buffer.save(&path)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> CaptureResult<()> {
        log::debug!("wrote {} frames to '{}'", self.written, self.dir.display());
        Ok(())
    }
}

// -------------------- Video sink --------------------

#[cfg(feature = "source-ffmpeg")]
pub use video::FfmpegSink;

#[cfg(feature = "source-ffmpeg")]
mod video {
    use super::*;
    use crate::frame::Shape;
    use ffmpeg_next as ffmpeg;

    fn codec_err(what: &str, err: ffmpeg::Error) -> CaptureError {
        CaptureError::Codec(format!("{what}: {err}"))
    }

    /// Encodes frames into a video file. The container format comes from
    /// the file extension; the first frame fixes the picture size.
    pub struct FfmpegSink {
        output: ffmpeg::format::context::Output,
        encoder: Option<ffmpeg::codec::encoder::Video>,
        scaler: Option<ffmpeg::software::scaling::Context>,
        path: PathBuf,
        fps: i32,
        shape: Option<Shape>,
        written: i64,
    }

    impl FfmpegSink {
        pub fn new(path: &Path, fps: u32) -> CaptureResult<Self> {
            ffmpeg::init().map_err(|err| codec_err("initialize ffmpeg", err))?;
            let output = ffmpeg::format::output(&path)
                .map_err(|err| codec_err("open output container", err))?;
            Ok(Self {
                output,
                encoder: None,
                scaler: None,
                path: path.to_path_buf(),
                fps: fps.max(1) as i32,
                shape: None,
                written: 0,
            })
        }

        fn start_stream(&mut self, shape: Shape) -> CaptureResult<()> {
            let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
                .ok_or_else(|| CaptureError::Codec("mpeg4 encoder unavailable".to_string()))?;
            let mut stream = self
                .output
                .add_stream(codec)
                .map_err(|err| codec_err("add video stream", err))?;
            let context = ffmpeg::codec::context::Context::new_with_codec(codec);
            let mut encoder = context
                .encoder()
                .video()
                .map_err(|err| codec_err("open video encoder", err))?;
            encoder.set_width(shape.width as u32);
            encoder.set_height(shape.height as u32);
            encoder.set_format(ffmpeg::util::format::pixel::Pixel::YUV420P);
            encoder.set_time_base(ffmpeg::Rational(1, self.fps));
            stream.set_time_base(ffmpeg::Rational(1, self.fps));
            let encoder = encoder
                .open_as(codec)
                .map_err(|err| codec_err("open video encoder", err))?;
            stream.set_parameters(&encoder);
            let scaler = ffmpeg::software::scaling::context::Context::get(
                ffmpeg::util::format::pixel::Pixel::RGB24,
                shape.width as u32,
                shape.height as u32,
                ffmpeg::util::format::pixel::Pixel::YUV420P,
                shape.width as u32,
                shape.height as u32,
                ffmpeg::software::scaling::flag::Flags::BILINEAR,
            )
            .map_err(|err| codec_err("create ffmpeg scaler", err))?;
            self.output
                .write_header()
                .map_err(|err| codec_err("write container header", err))?;
            self.encoder = Some(encoder);
            self.scaler = Some(scaler);
            self.shape = Some(shape);
            Ok(())
        }

        fn drain(&mut self) -> CaptureResult<()> {
            let Some(encoder) = self.encoder.as_mut() else {
                return Ok(());
            };
            let mut packet = ffmpeg::codec::packet::Packet::empty();
            while encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet
                    .write_interleaved(&mut self.output)
                    .map_err(|err| codec_err("write packet", err))?;
            }
            Ok(())
        }
    }

    impl FrameSink for FfmpegSink {
        fn write_frame(&mut self, frame: &Frame) -> CaptureResult<()> {
            let shape = frame.shape();
            match self.shape {
                None => self.start_stream(shape)?,
                Some(expected) if expected != shape => {
                    return Err(CaptureError::ShapeMismatch {
                        expected,
                        actual: shape,
                    });
                }
                Some(_) => {}
            }
            let mut rgb = ffmpeg::frame::Video::new(
                ffmpeg::util::format::pixel::Pixel::RGB24,
                shape.width as u32,
                shape.height as u32,
            );
            let stride = rgb.stride(0);
            let row_bytes = shape.width * 3;
            let data = rgb.data_mut(0);
            for row in 0..shape.height {
                data[row * stride..row * stride + row_bytes]
                    .copy_from_slice(frame.row(row));
            }
            let mut yuv = ffmpeg::frame::Video::empty();
            if let (Some(scaler), Some(encoder)) = (self.scaler.as_mut(), self.encoder.as_mut()) {
                scaler
                    .run(&rgb, &mut yuv)
                    .map_err(|err| codec_err("scale frame to YUV", err))?;
                yuv.set_pts(Some(self.written));
                encoder
                    .send_frame(&yuv)
                    .map_err(|err| codec_err("send frame to encoder", err))?;
            }
            self.written += 1;
            self.drain()
        }

        fn finish(&mut self) -> CaptureResult<()> {
            if let Some(encoder) = self.encoder.as_mut() {
                encoder
                    .send_eof()
                    .map_err(|err| codec_err("flush encoder", err))?;
            }
            self.drain()?;
            if self.shape.is_some() {
                self.output
                    .write_trailer()
                    .map_err(|err| codec_err("write container trailer", err))?;
            }
            log::debug!("encoded {} frames to '{}'", self.written, self.path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Shape;

    #[test]
    fn memory_sink_collects_in_order() {
        let mut sink = MemorySink::new();
        let a = Frame::filled(Shape::new(2, 2, 3), 1);
        let b = Frame::filled(Shape::new(2, 2, 3), 2);
        sink.write_frame(&a).unwrap();
        sink.write_frame(&b).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.frames(), &[a, b]);
        assert!(sink.is_finished());
    }

    #[test]
    fn image_sink_numbers_files_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::new(dir.path()).unwrap();
        sink.write_frame(&Frame::filled(Shape::new(2, 3, 3), 9)).unwrap();
        sink.write_frame(&Frame::filled(Shape::new(2, 3, 3), 9)).unwrap();
        sink.finish().unwrap();
        assert!(dir.path().join("frame_000000.png").is_file());
        assert!(dir.path().join("frame_000001.png").is_file());
    }

    #[test]
    fn image_sink_requires_an_existing_directory() {
        assert!(ImageSequenceSink::new(Path::new("/nonexistent/out")).is_err());
    }
}
