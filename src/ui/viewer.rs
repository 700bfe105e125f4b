use egui::{
    Color32, ColorImage, Context, Image, Pos2, Rect, Response, ScrollArea, Sense, Stroke,
    TextureHandle, TextureOptions, Ui, Vec2,
};

use crate::crop::{DragEvent, DragSelector, Point};
use crate::video::Frame;

/// Fill colour of the selection rectangle
const SELECTION_FILL: Color32 = Color32::from_rgba_premultiplied(78, 3, 3, 80);
const SELECTION_STROKE: Color32 = Color32::from_rgb(250, 10, 10);

/// Display mode for frame rendering
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DisplayMode {
    FitToWindow,
    NativeSize,
}

/// What happened on the viewer this frame
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ViewerResponse {
    /// A drag selection was released with these image-space corners
    pub selection: Option<(Point, Point)>,
    /// Mouse wheel notches over the image, positive scrolls forward
    pub wheel_steps: i64,
    /// Image pixel clicked outside crop mode
    pub clicked_pixel: Option<(u32, u32)>,
}

/// Shows the current frame and turns pointer input into image coordinates
pub struct FrameViewer {
    texture: Option<TextureHandle>,
    image_size: [usize; 2],
    display_mode: DisplayMode,
}

impl Default for FrameViewer {
    fn default() -> Self {
        Self {
            texture: None,
            image_size: [0, 0],
            display_mode: DisplayMode::FitToWindow,
        }
    }
}

impl FrameViewer {
    /// Upload a frame to the GPU texture
    pub fn set_frame(&mut self, ctx: &Context, frame: &Frame) {
        let size = [frame.width as usize, frame.height as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, &frame.to_rgba());
        match self.texture {
            Some(ref mut texture) => texture.set(image, TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("video_frame", image, TextureOptions::NEAREST))
            }
        }
        self.image_size = size;
    }

    pub fn clear(&mut self) {
        self.texture = None;
        self.image_size = [0, 0];
    }

    pub fn toggle_display_mode(&mut self) {
        self.display_mode = match self.display_mode {
            DisplayMode::FitToWindow => DisplayMode::NativeSize,
            DisplayMode::NativeSize => DisplayMode::FitToWindow,
        };
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Draw the frame. In crop mode pointer drags feed `selector`, and
    /// `pending` is drawn as the last finished selection.
    pub fn show(
        &mut self,
        ui: &mut Ui,
        selector: &mut DragSelector,
        crop_mode: bool,
        pending: Option<(Point, Point)>,
    ) -> ViewerResponse {
        let mut result = ViewerResponse::default();
        let Some(texture_id) = self.texture.as_ref().map(|t| t.id()) else {
            return result;
        };

        let native = Vec2::new(self.image_size[0] as f32, self.image_size[1] as f32);
        let image = |size: Vec2| {
            Image::new((texture_id, size)).sense(Sense::click_and_drag())
        };

        let response = match self.display_mode {
            DisplayMode::FitToWindow => {
                let display_size = fit_size(native, ui.available_size());
                ui.centered_and_justified(|ui| ui.add(image(display_size)))
                    .inner
            }
            DisplayMode::NativeSize => {
                ScrollArea::both()
                    .show(ui, |ui| ui.add(image(native)))
                    .inner
            }
        };

        let rect = response.rect;
        let to_image = |pos: Pos2| self.to_image(rect, pos);

        if crop_mode {
            if let Some(corners) = Self::track_drag(ui, &response, selector, to_image) {
                result.selection = Some(corners);
            }
        } else if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let point = to_image(pos);
                if point.x >= 0.0 && point.y >= 0.0 {
                    result.clicked_pixel = Some((point.x as u32, point.y as u32));
                }
            }
        }

        if response.double_clicked() && !crop_mode {
            self.toggle_display_mode();
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                result.wheel_steps = scroll.signum() as i64;
            }
        }

        let band = selector.current().or(pending);
        if let Some((start, end)) = band {
            let band_rect = Rect::from_two_pos(self.to_screen(rect, start), self.to_screen(rect, end));
            let painter = ui.painter_at(rect);
            painter.rect_filled(band_rect, 0.0, SELECTION_FILL);
            painter.rect_stroke(band_rect, 0.0, Stroke::new(1.0, SELECTION_STROKE));
        }

        result
    }

    fn track_drag(
        ui: &Ui,
        response: &Response,
        selector: &mut DragSelector,
        to_image: impl Fn(Pos2) -> Point,
    ) -> Option<(Point, Point)> {
        let pointer = response.interact_pointer_pos();

        // A press and release without movement selects a single pixel
        if response.clicked() {
            let point = to_image(pointer?);
            selector.handle(DragEvent::Begin(point));
            return selector.handle(DragEvent::End(point));
        }

        if response.drag_started() {
            let origin = ui.input(|i| i.pointer.press_origin()).or(pointer)?;
            selector.handle(DragEvent::Begin(to_image(origin)));
        }
        if response.dragged() {
            if let Some(pos) = pointer {
                selector.handle(DragEvent::Move(to_image(pos)));
            }
        }
        if response.drag_stopped() {
            let pos = pointer.or_else(|| ui.input(|i| i.pointer.latest_pos()))?;
            return selector.handle(DragEvent::End(to_image(pos)));
        }
        None
    }

    /// Screen position to image pixel coordinates (may fall outside the image)
    fn to_image(&self, rect: Rect, pos: Pos2) -> Point {
        let scale_x = self.image_size[0] as f32 / rect.width().max(1.0);
        let scale_y = self.image_size[1] as f32 / rect.height().max(1.0);
        Point::new((pos.x - rect.min.x) * scale_x, (pos.y - rect.min.y) * scale_y)
    }

    fn to_screen(&self, rect: Rect, point: Point) -> Pos2 {
        let scale_x = rect.width() / (self.image_size[0] as f32).max(1.0);
        let scale_y = rect.height() / (self.image_size[1] as f32).max(1.0);
        Pos2::new(rect.min.x + point.x * scale_x, rect.min.y + point.y * scale_y)
    }
}

/// Largest size with the image's aspect ratio that fits in `available`
fn fit_size(image: Vec2, available: Vec2) -> Vec2 {
    if image.x <= 0.0 || image.y <= 0.0 || available.y <= 0.0 {
        return image;
    }
    let aspect = image.x / image.y;
    let available_aspect = available.x / available.y;
    if aspect > available_aspect {
        Vec2::new(available.x, available.x / aspect)
    } else {
        Vec2::new(available.y * aspect, available.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_fills_width() {
        let size = fit_size(Vec2::new(1920.0, 1080.0), Vec2::new(960.0, 960.0));
        assert_eq!(size, Vec2::new(960.0, 540.0));
    }

    #[test]
    fn tall_image_fills_height() {
        let size = fit_size(Vec2::new(100.0, 200.0), Vec2::new(400.0, 100.0));
        assert_eq!(size, Vec2::new(50.0, 100.0));
    }

    #[test]
    fn screen_and_image_coordinates_invert() {
        let viewer = FrameViewer {
            texture: None,
            image_size: [200, 100],
            display_mode: DisplayMode::FitToWindow,
        };
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(400.0, 200.0));

        let point = viewer.to_image(rect, Pos2::new(110.0, 70.0));
        assert_eq!(point, Point::new(50.0, 25.0));
        assert_eq!(viewer.to_screen(rect, point), Pos2::new(110.0, 70.0));

        let outside = viewer.to_image(rect, Pos2::new(0.0, 0.0));
        assert!(outside.x < 0.0 && outside.y < 0.0);
    }

    #[test]
    fn display_mode_toggles() {
        let mut viewer = FrameViewer::default();
        assert_eq!(viewer.display_mode(), DisplayMode::FitToWindow);
        viewer.toggle_display_mode();
        assert_eq!(viewer.display_mode(), DisplayMode::NativeSize);
    }
}
