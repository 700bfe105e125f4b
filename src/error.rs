use std::path::PathBuf;

use crate::crop::CropRegion;

/// Errors produced by frame sources, cropping and export
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("frame {index} out of range (video has {num_frames} frames)")]
    FrameOutOfRange { index: usize, num_frames: usize },

    #[error("crop {region} exceeds frame bounds {width}x{height}")]
    CropOutOfBounds {
        region: CropRegion,
        width: u32,
        height: u32,
    },

    #[error("no video stream found in {0}")]
    NoVideoStream(PathBuf),

    #[error("invalid video dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("could not decode frame {0}")]
    DecodeFailed(usize),

    #[error("no suitable video encoder available")]
    NoEncoder,

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("export cancelled")]
    Cancelled,

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
