use ffmpeg_next::format::context::Input;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling::{Context as ScalerContext, Flags};
use ffmpeg_next::{codec, decoder, Packet, Rational};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::frame::{Frame, PixelFormat};
use super::FrameSource;
use crate::crop::CropRegion;
use crate::error::{Error, Result};

/// Decoding forward is cheaper than seeking for short hops
const MAX_FORWARD_DECODE: usize = 48;
/// Used when the container does not report a usable frame rate
const FALLBACK_FPS: f64 = 25.0;
/// Consecutive demuxer errors tolerated before a read gives up
const MAX_READ_ERRORS: u32 = 16;

static FFMPEG_INIT: OnceLock<std::result::Result<(), ffmpeg_next::Error>> = OnceLock::new();

/// Initialize FFmpeg once per process and quiet its logging down to errors
pub fn init_ffmpeg() -> Result<()> {
    let result = *FFMPEG_INIT.get_or_init(|| {
        ffmpeg_next::init()?;
        ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
        Ok(())
    });
    result.map_err(Error::from)
}

/// FFmpeg-backed frame source addressing frames by index
pub struct VideoReader {
    path: PathBuf,
    input: Input,
    decoder: decoder::Video,
    scaler: ScalerContext,
    stream_index: usize,
    time_base: Rational,
    start_ts: i64,

    width: u32,
    height: u32,
    fps: f64,
    num_frames: usize,

    crop: CropRegion,
    // Index the decoder will produce next, if known
    next_index: Option<usize>,
    drained: bool,
    read_errors: ReadErrors,
    // Last decoded full-size frame
    cached: Option<(usize, Frame)>,
}

impl VideoReader {
    /// Open a video file and probe its dimensions and frame count
    pub fn open(path: &Path) -> Result<Self> {
        init_ffmpeg()?;

        let input = ffmpeg_next::format::input(path)?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| Error::NoVideoStream(path.to_path_buf()))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let start_ts = if stream.start_time() == ffmpeg_next::ffi::AV_NOPTS_VALUE {
            0
        } else {
            stream.start_time()
        };

        let decoder = codec::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        let fps = [stream.avg_frame_rate(), stream.rate()]
            .into_iter()
            .filter(|rate| rate.numerator() > 0 && rate.denominator() > 0)
            .map(f64::from)
            .next()
            .unwrap_or(FALLBACK_FPS);

        let num_frames = if stream.frames() > 0 {
            stream.frames() as usize
        } else {
            let seconds = if stream.duration() > 0 {
                stream.duration() as f64 * f64::from(time_base)
            } else {
                input.duration().max(0) as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE)
            };
            (seconds * fps).round() as usize
        };

        let scaler = ScalerContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )?;

        info!(
            "Opened {}: {}x{}, {:.3} fps, {} frames",
            path.display(),
            width,
            height,
            fps,
            num_frames
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            start_ts,
            width,
            height,
            fps,
            num_frames,
            crop: CropRegion::full(width, height),
            next_index: Some(0),
            drained: false,
            read_errors: ReadErrors::default(),
            cached: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Decode the full-size frame at `index`
    fn decode_frame(&mut self, index: usize) -> Result<Frame> {
        let needs_seek = match self.next_index {
            Some(next) => index < next || index - next > MAX_FORWARD_DECODE,
            None => true,
        };
        if needs_seek {
            self.seek_to(index)?;
        }

        loop {
            let decoded = match self.receive_next() {
                Ok(Some(decoded)) => decoded,
                Ok(None) => break,
                Err(e) => {
                    // Decoder position is unknown now, so the next read seeks
                    self.next_index = None;
                    return Err(e);
                }
            };
            let decoded_index = match decoded.timestamp().or_else(|| decoded.pts()) {
                Some(ts) => self.index_of(ts),
                None => self.next_index.unwrap_or(index),
            };
            self.next_index = Some(decoded_index + 1);

            if decoded_index < index {
                continue;
            }
            if decoded_index > index {
                debug!("Wanted frame {index}, decoder landed on {decoded_index}");
            }

            let mut rgb = VideoFrame::empty();
            self.scaler.run(&decoded, &mut rgb)?;
            return Ok(Frame::from_strided(
                rgb.width(),
                rgb.height(),
                PixelFormat::Rgb,
                rgb.data(0),
                rgb.stride(0),
            ));
        }

        self.next_index = None;
        Err(Error::DecodeFailed(index))
    }

    /// Seek to the keyframe at or before `index` and reset the decoder
    fn seek_to(&mut self, index: usize) -> Result<()> {
        let start_seconds = self.start_ts as f64 * f64::from(self.time_base);
        let seconds = start_seconds + index as f64 / self.fps;
        let target = (seconds * f64::from(ffmpeg_next::ffi::AV_TIME_BASE)) as i64;
        debug!("Seeking to frame {index} ({seconds:.3}s)");

        self.input.seek(target, ..target)?;
        self.decoder.flush();
        self.drained = false;
        self.read_errors.reset();
        self.next_index = None;
        Ok(())
    }

    /// Pull the next decoded frame, feeding packets as needed.
    /// Returns `None` once the stream is fully drained.
    fn receive_next(&mut self) -> Result<Option<VideoFrame>> {
        let mut decoded = VideoFrame::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.drained {
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    self.read_errors.reset();
                    if packet.stream() == self.stream_index {
                        if let Err(e) = self.decoder.send_packet(&packet) {
                            warn!("Skipping undecodable packet: {e}");
                        }
                    }
                }
                Err(ffmpeg_next::Error::Eof) => {
                    self.decoder.send_eof()?;
                    self.drained = true;
                }
                Err(e) => self.read_errors.record(e)?,
            }
        }
    }

    fn index_of(&self, ts: i64) -> usize {
        let seconds = (ts - self.start_ts) as f64 * f64::from(self.time_base);
        (seconds * self.fps).round().max(0.0) as usize
    }
}

/// Run of consecutive demuxer read failures.
///
/// Corrupted packets are skipped, but an error that repeats (truncated file,
/// lost mount) would otherwise spin the read loop forever.
#[derive(Debug, Default)]
struct ReadErrors {
    count: u32,
}

impl ReadErrors {
    fn record(&mut self, err: ffmpeg_next::Error) -> Result<()> {
        self.count += 1;
        if self.count >= MAX_READ_ERRORS {
            self.count = 0;
            return Err(Error::Ffmpeg(err));
        }
        warn!("Skipping corrupted packet: {err}");
        Ok(())
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

impl FrameSource for VideoReader {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn num_frames(&self) -> usize {
        self.num_frames
    }

    fn crop(&self) -> CropRegion {
        self.crop
    }

    fn set_crop(&mut self, region: CropRegion) {
        debug!("Crop set to {region}");
        self.crop = region;
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame> {
        if index >= self.num_frames {
            return Err(Error::FrameOutOfRange {
                index,
                num_frames: self.num_frames,
            });
        }

        if let Some((cached_index, frame)) = &self.cached {
            if *cached_index == index {
                return frame.crop(&self.crop);
            }
        }

        let frame = self.decode_frame(index)?;
        let cropped = frame.crop(&self.crop);
        self.cached = Some((index, frame));
        cropped
    }
}
