//! Exporting cropped stills and clips.
//!
//! Stills are written synchronously through the `image` crate. Clips are
//! encoded on a worker thread that opens its own [`VideoReader`], so the
//! interactive source is never shared across threads.

use crossbeam_channel::{unbounded, Receiver, Sender};
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalerContext, Flags};
use ffmpeg_next::{codec, encoder, Packet, Rational};
use image::{DynamicImage, ImageBuffer, ImageFormat};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::frame::{Frame, PixelFormat};
use super::{init_ffmpeg, FrameSource, VideoReader};
use crate::crop::CropRegion;
use crate::error::{Error, Result};

/// Container extensions accepted for clip export
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "avi", "mkv", "mov"];
/// Still image extensions offered in the save dialog
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "tiff"];

/// Write a single (already cropped) frame as an image
pub fn save_image(frame: &Frame, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)?;
    let (width, height) = (frame.width, frame.height);
    let data = frame.data.clone();

    let image = match frame.format {
        PixelFormat::Gray => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        PixelFormat::Rgb => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        PixelFormat::Rgba => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgba8)
        }
    }
    .ok_or(Error::InvalidDimensions { width, height })?;

    // JPEG has no alpha channel
    let image = if format == ImageFormat::Jpeg && frame.format == PixelFormat::Rgba {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    image.save_with_format(path, format)?;
    info!("Saved {}x{} frame to {}", width, height, path.display());
    Ok(())
}

/// Everything a clip export needs
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub source: PathBuf,
    pub crop: CropRegion,
    /// Frame indices to write, in order
    pub frames: Vec<usize>,
    pub output: PathBuf,
}

/// Messages from the export worker
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    Progress { done: usize, total: usize },
    Finished(PathBuf),
    Cancelled,
    Failed(String),
}

/// A clip export running on its own thread
pub struct ExportJob {
    receiver: Receiver<ExportEvent>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    // Whether Finished, Cancelled or Failed has been handed out
    settled: bool,
}

impl ExportJob {
    /// Validate the request and start encoding in the background
    pub fn spawn(request: ExportRequest) -> Result<Self> {
        check_video_extension(&request.output)?;
        Self::start(move |cancel, sender| run_export(request, cancel, sender))
    }

    fn start<F>(worker: F) -> Result<Self>
    where
        F: FnOnce(&AtomicBool, &Sender<ExportEvent>) + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("vidcrop-export".into())
            .spawn(move || worker(&worker_cancel, &sender))?;

        Ok(Self {
            receiver,
            cancel,
            handle: Some(handle),
            settled: false,
        })
    }

    /// Drain pending worker messages without blocking.
    ///
    /// A worker that stopped without reporting an outcome (it panicked) is
    /// reported as `Failed`, so every job ends with exactly one final event.
    pub fn poll(&mut self) -> Vec<ExportEvent> {
        let stopped = self.is_finished();
        let mut events: Vec<ExportEvent> = self.receiver.try_iter().collect();
        if events.iter().any(ExportEvent::is_final) {
            self.settled = true;
        }
        if stopped && !self.settled {
            error!("Export worker stopped without reporting a result");
            events.push(ExportEvent::Failed(
                "export worker stopped unexpectedly".to_string(),
            ));
            self.settled = true;
        }
        events
    }

    /// Ask the worker to stop after the current frame
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl ExportEvent {
    /// Whether this is the last event of a job
    pub fn is_final(&self) -> bool {
        !matches!(self, ExportEvent::Progress { .. })
    }
}

impl Drop for ExportJob {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn check_video_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat(path.display().to_string()))
    }
}

fn run_export(request: ExportRequest, cancel: &AtomicBool, sender: &Sender<ExportEvent>) {
    let event = match encode_clip(&request, cancel, sender) {
        Ok(()) => {
            info!("Exported {} frames to {}", request.frames.len(), request.output.display());
            ExportEvent::Finished(request.output.clone())
        }
        Err(Error::Cancelled) => {
            info!("Export to {} cancelled", request.output.display());
            discard_partial(&request.output);
            ExportEvent::Cancelled
        }
        Err(e) => {
            error!("Export to {} failed: {}", request.output.display(), e);
            discard_partial(&request.output);
            ExportEvent::Failed(e.to_string())
        }
    };
    let _ = sender.send(event);
}

fn discard_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Could not remove partial export {}: {}", path.display(), e);
        }
    }
}

/// YUV 4:2:0 needs even dimensions
fn even(value: u32) -> u32 {
    (value & !1).max(2)
}

fn encode_clip(
    request: &ExportRequest,
    cancel: &AtomicBool,
    sender: &Sender<ExportEvent>,
) -> Result<()> {
    init_ffmpeg()?;

    let mut reader = VideoReader::open(&request.source)?;
    reader.set_crop(request.crop.clamp_to(reader.width(), reader.height()));
    let crop = reader.crop();

    let fps = (reader.fps().round() as i32).max(1);
    let time_base = Rational::new(1, fps);
    let (out_width, out_height) = (even(crop.width()), even(crop.height()));

    let mut output = ffmpeg_next::format::output(&request.output)?;
    let global_header = output
        .format()
        .flags()
        .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

    let codec = [codec::Id::H264, codec::Id::MPEG4]
        .into_iter()
        .find_map(encoder::find)
        .ok_or(Error::NoEncoder)?;

    let mut stream = output.add_stream(codec)?;
    let stream_index = stream.index();

    let mut context = codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()?;
    context.set_width(out_width);
    context.set_height(out_height);
    context.set_format(Pixel::YUV420P);
    context.set_time_base(time_base);
    context.set_frame_rate(Some(Rational::new(fps, 1)));
    if global_header {
        context.set_flags(codec::Flags::GLOBAL_HEADER);
    }

    let mut encoder = context.open_as(codec)?;
    stream.set_parameters(&encoder);
    stream.set_time_base(time_base);

    output.write_header()?;
    let stream_time_base = output
        .stream(stream_index)
        .map(|s| s.time_base())
        .unwrap_or(time_base);

    let mut scaler = ScalerContext::get(
        Pixel::RGB24,
        crop.width(),
        crop.height(),
        Pixel::YUV420P,
        out_width,
        out_height,
        Flags::BILINEAR,
    )?;

    let total = request.frames.len();
    for (position, &index) in request.frames.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let frame = reader.read_frame(index)?;
        let rgb = to_ffmpeg_frame(&frame);
        let mut yuv = VideoFrame::empty();
        scaler.run(&rgb, &mut yuv)?;
        yuv.set_pts(Some(position as i64));

        encoder.send_frame(&yuv)?;
        write_packets(&mut encoder, &mut output, stream_index, time_base, stream_time_base)?;

        let _ = sender.send(ExportEvent::Progress {
            done: position + 1,
            total,
        });
    }

    encoder.send_eof()?;
    write_packets(&mut encoder, &mut output, stream_index, time_base, stream_time_base)?;
    output.write_trailer()?;
    Ok(())
}

fn to_ffmpeg_frame(frame: &Frame) -> VideoFrame {
    let rgb = match frame.format {
        PixelFormat::Rgb => frame.data.clone(),
        _ => frame
            .to_rgba()
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect(),
    };

    let mut out = VideoFrame::new(Pixel::RGB24, frame.width, frame.height);
    let stride = out.stride(0);
    let row_len = frame.width as usize * 3;
    for (dst, src) in out
        .data_mut(0)
        .chunks_mut(stride)
        .zip(rgb.chunks_exact(row_len))
    {
        dst[..row_len].copy_from_slice(src);
    }
    out
}

fn write_packets(
    encoder: &mut encoder::video::Encoder,
    output: &mut Output,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
) -> Result<()> {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(stream_index);
        packet.rescale_ts(encoder_time_base, stream_time_base);
        packet.write_interleaved(output)?;
    }
    Ok(())
}
