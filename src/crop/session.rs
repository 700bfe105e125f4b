use log::debug;

use super::region::{CropRegion, Point};
use crate::error::Result;
use crate::video::{Frame, FrameSource};

/// Turns drag corners into a crop and applies it to a frame source.
///
/// The session keeps nothing but the borrow of its source; the active crop
/// lives in the source itself.
pub struct CropSession<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: FrameSource + ?Sized> CropSession<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }

    /// Apply `region` to the source and reload frame `index`.
    ///
    /// Regions reaching past the native frame are clamped to it.
    pub fn apply(&mut self, region: CropRegion, index: usize) -> Result<Frame> {
        let clamped = region.clamp_to(self.source.width(), self.source.height());
        if clamped != region {
            debug!("Clamped crop {} to {}", region, clamped);
        }
        self.source.set_crop(clamped);
        self.source.read_frame(index)
    }

    /// Restore the full frame and reload frame `index`
    pub fn reset(&mut self, index: usize) -> Result<Frame> {
        let full = CropRegion::full(self.source.width(), self.source.height());
        self.source.set_crop(full);
        self.source.read_frame(index)
    }

    /// Normalize a finished drag and apply it.
    ///
    /// The corners are in the coordinates of the frame as currently read,
    /// i.e. relative to the active crop, so selecting inside a cropped view
    /// narrows that crop further.
    pub fn commit(&mut self, p1: Point, p2: Point, index: usize) -> Result<Frame> {
        let origin = self.source.crop();
        let region = normalize(p1, p2).offset(origin.x_min(), origin.y_min());
        self.apply(region, index)
    }
}

/// Normalize two arbitrary corners into a crop region.
///
/// Coordinates are truncated toward zero, ordered per axis and floored at
/// zero. A span shorter than one pixel is widened to exactly one, so a
/// plain click still yields a 1x1 region.
pub fn normalize(p1: Point, p2: Point) -> CropRegion {
    let (x_min, x_max) = span(p1.x, p2.x);
    let (y_min, y_max) = span(p1.y, p2.y);
    CropRegion::new(x_min, x_max, y_min, y_max).unwrap_or_else(|| CropRegion::full(1, 1))
}

/// Ordered integer bounds of one axis, at least one pixel wide
fn span(a: f32, b: f32) -> (u32, u32) {
    // `as` truncates toward zero and saturates
    let a = a as i64;
    let b = b as i64;
    let min = a.min(b).clamp(0, u32::MAX as i64 - 1);
    let max = a.max(b).clamp(0, u32::MAX as i64);
    let max = if max - min < 1 { min + 1 } else { max };
    (min as u32, max as u32)
}
