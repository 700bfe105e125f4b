/// Frame-index state shared by the linked slider and spinbox.
///
/// The selectable range is a sub-range `start..=end` of the video's frames,
/// walked with `step`. A clip export writes `start, start + step, ...` up to
/// but not including `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSlider {
    last_frame: usize,
    start: usize,
    end: usize,
    step: usize,
    value: usize,
}

impl FrameSlider {
    pub fn new(num_frames: usize) -> Self {
        let last_frame = num_frames.saturating_sub(1);
        Self {
            last_frame,
            start: 0,
            end: last_frame,
            step: 1,
            value: 0,
        }
    }

    pub fn value(&self) -> usize {
        self.value
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Set the current frame, clamped into the range
    pub fn set_value(&mut self, value: usize) {
        self.value = value.clamp(self.start, self.end);
    }

    /// Restrict the range to `start..=end` within the video and pull the
    /// current value inside it
    pub fn set_range(&mut self, start: usize, end: usize, step: usize) {
        self.end = end.min(self.last_frame);
        self.start = start.min(self.end);
        self.step = step.max(1);
        self.set_value(self.value);
    }

    /// Move by `delta` frames (mouse wheel), staying inside the range
    pub fn step_by(&mut self, delta: i64) {
        let target = (self.value as i64).saturating_add(delta).max(0) as usize;
        self.set_value(target);
    }

    /// Frames written by a clip export
    pub fn indices(&self) -> Vec<usize> {
        (self.start..self.end).step_by(self.step).collect()
    }

    /// `min,max,step` as shown in the range editor
    pub fn range_text(&self) -> String {
        format!("{},{},{}", self.start, self.end, self.step)
    }
}

/// Parse a `min,max,step` range
pub fn parse_range(text: &str) -> Result<(usize, usize, usize), String> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid range value: {e}"))?;

    match values[..] {
        [start, end, step] if step > 0 => Ok((start, end, step)),
        [_, _, _] => Err("step must be at least 1".to_string()),
        _ => Err(format!("expected min,max,step but got {text:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_spans_whole_video() {
        let slider = FrameSlider::new(100);
        assert_eq!((slider.start(), slider.end(), slider.step()), (0, 99, 1));
        assert_eq!(slider.value(), 0);
    }

    #[test]
    fn value_is_clamped() {
        let mut slider = FrameSlider::new(10);
        slider.set_value(50);
        assert_eq!(slider.value(), 9);
    }

    #[test]
    fn range_is_bounded_by_video() {
        let mut slider = FrameSlider::new(10);
        slider.set_range(2, 40, 0);
        assert_eq!((slider.start(), slider.end(), slider.step()), (2, 9, 1));
        assert_eq!(slider.value(), 2);
    }

    #[test]
    fn shrinking_range_pulls_value_in() {
        let mut slider = FrameSlider::new(100);
        slider.set_value(80);
        slider.set_range(10, 50, 5);
        assert_eq!(slider.value(), 50);
    }

    #[test]
    fn wheel_steps_stay_in_range() {
        let mut slider = FrameSlider::new(5);
        slider.step_by(-3);
        assert_eq!(slider.value(), 0);
        slider.step_by(2);
        assert_eq!(slider.value(), 2);
        slider.step_by(10);
        assert_eq!(slider.value(), 4);
    }

    #[test]
    fn export_indices_are_half_open() {
        let mut slider = FrameSlider::new(20);
        slider.set_range(3, 12, 4);
        assert_eq!(slider.indices(), vec![3, 7, 11]);
        slider.set_range(3, 11, 4);
        assert_eq!(slider.indices(), vec![3, 7]);
    }

    #[test]
    fn empty_video_has_single_frame_range() {
        let slider = FrameSlider::new(0);
        assert_eq!((slider.start(), slider.end()), (0, 0));
        assert!(slider.indices().is_empty());
    }

    #[test]
    fn parses_range_text() {
        assert_eq!(parse_range("1, 20,2"), Ok((1, 20, 2)));
        assert!(parse_range("1,20").is_err());
        assert!(parse_range("1,20,0").is_err());
        assert!(parse_range("a,b,c").is_err());
        let slider = FrameSlider::new(30);
        assert_eq!(parse_range(&slider.range_text()), Ok((0, 29, 1)));
    }
}
