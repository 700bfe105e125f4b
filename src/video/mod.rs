mod decoder;
pub mod export;
mod frame;

use crate::crop::CropRegion;
use crate::error::Result;

pub use decoder::{init_ffmpeg, VideoReader};
pub use frame::{Frame, PixelFormat};

/// Anything that can decode frames by index and clip them to a crop.
pub trait FrameSource {
    /// Native frame width, fixed while the source is open
    fn width(&self) -> u32;

    /// Native frame height, fixed while the source is open
    fn height(&self) -> u32;

    fn num_frames(&self) -> usize;

    /// The crop currently applied to every read
    fn crop(&self) -> CropRegion;

    /// Replace the active crop. Subsequent reads are clipped to it.
    fn set_crop(&mut self, region: CropRegion);

    /// Decode frame `index` (0-based) clipped to the active crop.
    ///
    /// Indices outside `0..num_frames()` are an error, never clamped.
    fn read_frame(&mut self, index: usize) -> Result<Frame>;
}
