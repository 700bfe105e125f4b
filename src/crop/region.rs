use std::fmt;

/// A point in image pixel space. May lie outside the image or be negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Rectangular crop in image pixels, half-open on both axes.
///
/// Always holds `x_min < x_max` and `y_min < y_max`, so a region is never
/// narrower or shorter than one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropRegion {
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

impl CropRegion {
    /// Build a region, returning `None` if either span is empty.
    pub fn new(x_min: u32, x_max: u32, y_min: u32, y_max: u32) -> Option<Self> {
        (x_min < x_max && y_min < y_max).then_some(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    /// The whole frame, `(0, width) x (0, height)`.
    ///
    /// Zero dimensions are raised to one so the invariant holds.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x_min: 0,
            x_max: width.max(1),
            y_min: 0,
            y_max: height.max(1),
        }
    }

    pub fn x_min(&self) -> u32 {
        self.x_min
    }

    pub fn x_max(&self) -> u32 {
        self.x_max
    }

    pub fn y_min(&self) -> u32 {
        self.y_min
    }

    pub fn y_max(&self) -> u32 {
        self.y_max
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min
    }

    /// Whether the region fits entirely inside a `width` x `height` frame.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x_max <= width && self.y_max <= height
    }

    /// Shift by `(dx, dy)`, saturating at `u32::MAX`
    pub fn offset(&self, dx: u32, dy: u32) -> Self {
        let x_min = self.x_min.saturating_add(dx).min(u32::MAX - 1);
        let y_min = self.y_min.saturating_add(dy).min(u32::MAX - 1);
        Self {
            x_min,
            x_max: self.x_max.saturating_add(dx).max(x_min + 1),
            y_min,
            y_max: self.y_max.saturating_add(dy).max(y_min + 1),
        }
    }

    /// Clamp to a `width` x `height` frame, keeping at least one pixel per axis.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let x_min = self.x_min.min(width - 1);
        let y_min = self.y_min.min(height - 1);
        Self {
            x_min,
            x_max: self.x_max.clamp(x_min + 1, width),
            y_min,
            y_max: self.y_max.clamp(y_min + 1, height),
        }
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{} x {}..{}",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

impl std::str::FromStr for CropRegion {
    type Err = String;

    /// Parses `x_min,x_max,y_min,y_max`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid crop value: {e}"))?;

        match values[..] {
            [x_min, x_max, y_min, y_max] => Self::new(x_min, x_max, y_min, y_max)
                .ok_or_else(|| format!("empty crop region: {s}")),
            _ => Err(format!("expected x_min,x_max,y_min,y_max but got {s:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_spans() {
        assert!(CropRegion::new(3, 3, 0, 5).is_none());
        assert!(CropRegion::new(0, 5, 7, 2).is_none());
        assert!(CropRegion::new(0, 1, 0, 1).is_some());
    }

    #[test]
    fn full_covers_frame() {
        let region = CropRegion::full(640, 480);
        assert_eq!((region.width(), region.height()), (640, 480));
        assert_eq!(region.x_min(), 0);
        assert_eq!(region.y_min(), 0);
    }

    #[test]
    fn clamp_trims_overhang() {
        let region = CropRegion::new(600, 700, 400, 500).unwrap();
        let clamped = region.clamp_to(640, 480);
        assert_eq!(clamped, CropRegion::new(600, 640, 400, 480).unwrap());
    }

    #[test]
    fn clamp_keeps_one_pixel_when_fully_outside() {
        let region = CropRegion::new(900, 950, 10, 20).unwrap();
        let clamped = region.clamp_to(640, 480);
        assert_eq!(clamped, CropRegion::new(639, 640, 10, 20).unwrap());
        assert!(clamped.fits(640, 480));
    }

    #[test]
    fn offset_moves_both_corners() {
        let region = CropRegion::new(0, 2, 1, 3).unwrap().offset(100, 50);
        assert_eq!(region, CropRegion::new(100, 102, 51, 53).unwrap());
        assert_eq!(region.offset(0, 0), region);
    }

    #[test]
    fn parses_from_cli_string() {
        let region: CropRegion = "10, 20,30,40".parse().unwrap();
        assert_eq!(region, CropRegion::new(10, 20, 30, 40).unwrap());
        assert!("10,20,30".parse::<CropRegion>().is_err());
        assert!("10,10,30,40".parse::<CropRegion>().is_err());
        assert!("a,b,c,d".parse::<CropRegion>().is_err());
    }
}
