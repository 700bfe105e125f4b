use super::region::Point;

/// Pointer events that drive a drag selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEvent {
    Begin(Point),
    Move(Point),
    End(Point),
}

/// An in-progress drag, from press to the latest pointer position
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragGesture {
    start: Point,
    current: Point,
}

/// Tracks a free-form pointer drag and exposes its two corner points.
///
/// `update` and `end` without a prior `begin` are no-ops; `end` then
/// returns `None`. A drag is abandoned by calling `cancel` or simply never
/// calling `end`.
#[derive(Debug, Default)]
pub struct DragSelector {
    gesture: Option<DragGesture>,
}

impl DragSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new gesture at `point`, discarding any unfinished one
    pub fn begin(&mut self, point: Point) {
        self.gesture = Some(DragGesture {
            start: point,
            current: point,
        });
    }

    /// Move the current corner of the active gesture
    pub fn update(&mut self, point: Point) {
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.current = point;
        }
    }

    /// Finish the gesture and hand back `(start, end)`
    pub fn end(&mut self, point: Point) -> Option<(Point, Point)> {
        self.gesture.take().map(|gesture| (gesture.start, point))
    }

    pub fn cancel(&mut self) {
        self.gesture = None;
    }

    /// Dispatch a pointer event. Returns the corner pair once a drag ends.
    pub fn handle(&mut self, event: DragEvent) -> Option<(Point, Point)> {
        match event {
            DragEvent::Begin(point) => {
                self.begin(point);
                None
            }
            DragEvent::Move(point) => {
                self.update(point);
                None
            }
            DragEvent::End(point) => self.end(point),
        }
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Raw corners of the active gesture, for drawing the rubber band
    pub fn current(&self) -> Option<(Point, Point)> {
        self.gesture.map(|gesture| (gesture.start, gesture.current))
    }
}
