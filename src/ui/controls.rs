use egui::{DragValue, Slider, TextEdit, Ui};
use log::debug;

use super::frame_slider::{parse_range, FrameSlider};

/// What the user asked for from the control bar this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// The frame slider or spinbox settled on a new frame
    Seek(usize),
    /// Crop mode switched on (`true`) or off (`false`)
    ToggleCrop(bool),
    ResetCrop,
    SaveImage,
    SaveVideo,
}

pub struct CropControls;

impl CropControls {
    pub fn show(ui: &mut Ui, slider: &mut FrameSlider, crop_mode: bool) -> Option<ControlAction> {
        let mut action = None;

        ui.horizontal(|ui| {
            ui.label("frame number");

            // Slider and spinbox share one value so they always agree
            let mut value = slider.value();
            let slider_response = ui.add(
                Slider::new(&mut value, slider.start()..=slider.end())
                    .step_by(slider.step() as f64)
                    .show_value(false)
                    .trailing_fill(true),
            );
            let spin_response = ui.add(
                DragValue::new(&mut value)
                    .range(slider.start()..=slider.end())
                    .speed(1.0),
            );

            if value != slider.value() {
                slider.set_value(value);
            }
            if slider_response.drag_stopped()
                || slider_response.clicked()
                || spin_response.lost_focus()
                || spin_response.drag_stopped()
            {
                action = Some(ControlAction::Seek(slider.value()));
            }

            Self::range_editor(ui, slider);

            ui.separator();

            let mut crop = crop_mode;
            if ui
                .toggle_value(&mut crop, "Crop")
                .on_hover_text("Drag on the frame, then toggle off to apply")
                .changed()
            {
                action = Some(ControlAction::ToggleCrop(crop));
            }
            if ui.button("Reset").clicked() {
                action = Some(ControlAction::ResetCrop);
            }

            ui.separator();

            if ui.button("Save Img").clicked() {
                action = Some(ControlAction::SaveImage);
            }
            if ui
                .button("Save Vid")
                .on_hover_text("Export frames min..max every step")
                .clicked()
            {
                action = Some(ControlAction::SaveVideo);
            }
        });

        action
    }

    /// `min,max,step` field that narrows the slider range
    fn range_editor(ui: &mut Ui, slider: &mut FrameSlider) {
        let text_id = ui.id().with("range_text");
        let error_id = ui.id().with("range_error");
        let mut text = ui
            .memory(|mem| mem.data.get_temp::<String>(text_id))
            .unwrap_or_else(|| slider.range_text());

        let response = ui.add(
            TextEdit::singleline(&mut text)
                .desired_width(90.0)
                .hint_text("min,max,step"),
        );

        if response.lost_focus() {
            match parse_range(&text) {
                Ok((start, end, step)) => {
                    slider.set_range(start, end, step);
                    debug!("Frame range set to {}", slider.range_text());
                    ui.memory_mut(|mem| mem.data.remove::<String>(error_id));
                }
                Err(e) => ui.memory_mut(|mem| mem.data.insert_temp(error_id, e)),
            }
        }

        // Keep the edit buffer only while typing
        if response.has_focus() {
            ui.memory_mut(|mem| mem.data.insert_temp(text_id, text));
        } else {
            ui.memory_mut(|mem| mem.data.remove::<String>(text_id));
        }

        if let Some(error) = ui.memory(|mem| mem.data.get_temp::<String>(error_id)) {
            response.on_hover_text(error);
        }
    }
}
