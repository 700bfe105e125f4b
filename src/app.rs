use anyhow::{Context as _, Result};
use egui::{CentralPanel, Color32, ProgressBar, TopBottomPanel};
use log::{debug, error, info};
use std::path::PathBuf;

use vidcrop::crop::{CropSession, DragSelector, Point};
use vidcrop::ui::{ControlAction, CropControls, FrameSlider, FrameViewer};
use vidcrop::video::export::{
    self, ExportEvent, ExportJob, ExportRequest, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
use vidcrop::video::{Frame, FrameSource, VideoReader};
use vidcrop::AppConfig;

const OPEN_EXTENSIONS: &[&str] = &["mp4", "m4v", "mkv", "avi", "mov", "webm", "flv", "wmv"];

pub struct VidCropApp {
    config: AppConfig,
    source: Option<VideoReader>,
    frame: Option<Frame>,
    slider: FrameSlider,
    viewer: FrameViewer,

    crop_mode: bool,
    selector: DragSelector,
    // Last released drag, applied when crop mode is switched off
    selection: Option<(Point, Point)>,

    export: Option<ExportJob>,
    export_progress: Option<(usize, usize)>,
    status: Option<String>,
    error_message: Option<String>,
}

impl VidCropApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let mut app = Self {
            config,
            source: None,
            frame: None,
            slider: FrameSlider::new(0),
            viewer: FrameViewer::default(),
            crop_mode: false,
            selector: DragSelector::new(),
            selection: None,
            export: None,
            export_progress: None,
            status: None,
            error_message: None,
        };

        let initial = app.config.file.clone().or_else(|| app.pick_video());
        if let Some(path) = initial {
            app.load_video(path, &cc.egui_ctx);
            app.apply_initial_view(&cc.egui_ctx);
        }
        app
    }

    fn pick_video(&self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new().add_filter("Video", OPEN_EXTENSIONS);
        if let Some(dir) = &self.config.video_dir {
            dialog = dialog.set_directory(dir);
        }
        dialog.pick_file()
    }

    fn open_file(&mut self, ctx: &egui::Context) {
        if let Some(path) = self.pick_video() {
            self.load_video(path, ctx);
        }
    }

    fn load_video(&mut self, path: PathBuf, ctx: &egui::Context) {
        self.error_message = None;
        self.status = None;
        self.crop_mode = false;
        self.selector.cancel();
        self.selection = None;

        match VideoReader::open(&path) {
            Ok(source) => {
                self.slider = FrameSlider::new(source.num_frames());
                self.source = Some(source);
                self.reload(ctx);
            }
            Err(e) => {
                error!("Failed to open {}: {}", path.display(), e);
                self.source = None;
                self.frame = None;
                self.viewer.clear();
                self.error_message = Some(format!("Failed to open video: {e}"));
            }
        }
    }

    /// Frame and crop requested on the command line
    fn apply_initial_view(&mut self, ctx: &egui::Context) {
        self.slider.set_value(self.config.initial_frame);
        match (self.config.initial_crop, self.source.as_mut()) {
            (Some(region), Some(source)) => {
                let result = CropSession::new(source).apply(region, self.slider.value());
                self.show_result(result, ctx);
            }
            _ => self.reload(ctx),
        }
    }

    /// Read the slider's frame from the source and display it
    fn reload(&mut self, ctx: &egui::Context) {
        let index = self.slider.value();
        if let Some(source) = self.source.as_mut() {
            let result = source.read_frame(index);
            self.show_result(result, ctx);
        }
    }

    fn show_result(&mut self, result: vidcrop::Result<Frame>, ctx: &egui::Context) {
        match result {
            Ok(frame) => {
                self.viewer.set_frame(ctx, &frame);
                self.frame = Some(frame);
                self.error_message = None;
            }
            Err(e) => {
                error!("Failed to read frame {}: {}", self.slider.value(), e);
                self.error_message = Some(e.to_string());
            }
        }
    }

    fn handle_action(&mut self, action: ControlAction, ctx: &egui::Context) {
        match action {
            ControlAction::Seek(index) => {
                self.slider.set_value(index);
                self.reload(ctx);
            }
            ControlAction::ToggleCrop(true) => {
                self.crop_mode = true;
                self.selector.cancel();
                self.selection = None;
            }
            ControlAction::ToggleCrop(false) => {
                self.crop_mode = false;
                self.selector.cancel();
                if let (Some((start, end)), Some(source)) =
                    (self.selection.take(), self.source.as_mut())
                {
                    let result = CropSession::new(source).commit(start, end, self.slider.value());
                    info!("Crop set to {}", source.crop());
                    self.show_result(result, ctx);
                }
            }
            ControlAction::ResetCrop => {
                self.selection = None;
                if let Some(source) = self.source.as_mut() {
                    let result = CropSession::new(source).reset(self.slider.value());
                    self.show_result(result, ctx);
                }
            }
            ControlAction::SaveImage => {
                if let Err(e) = self.save_image() {
                    error!("{e:#}");
                    self.error_message = Some(format!("{e:#}"));
                }
            }
            ControlAction::SaveVideo => {
                if let Err(e) = self.save_video() {
                    error!("{e:#}");
                    self.error_message = Some(format!("{e:#}"));
                }
            }
        }
    }

    fn save_image(&mut self) -> Result<()> {
        let Some(frame) = self.frame.as_ref() else {
            return Ok(());
        };
        let mut dialog = rfd::FileDialog::new().add_filter("Image", IMAGE_EXTENSIONS);
        if let Some(dir) = &self.config.picture_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return Ok(());
        };

        let path = with_default_extension(path, IMAGE_EXTENSIONS, "png");
        export::save_image(frame, &path)
            .with_context(|| format!("Failed to save image to {}", path.display()))?;
        self.status = Some(format!("Saved {}", path.display()));
        Ok(())
    }

    fn save_video(&mut self) -> Result<()> {
        let Some(source) = self.source.as_ref() else {
            return Ok(());
        };
        if self.export.is_some() {
            anyhow::bail!("An export is already running");
        }

        let mut dialog = rfd::FileDialog::new().add_filter("Video", VIDEO_EXTENSIONS);
        if let Some(dir) = &self.config.video_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return Ok(());
        };
        let output = with_default_extension(path, VIDEO_EXTENSIONS, "mp4");

        let frames = self.slider.indices();
        if frames.is_empty() {
            anyhow::bail!("Frame range {} selects no frames", self.slider.range_text());
        }

        let request = ExportRequest {
            source: source.path().to_path_buf(),
            crop: source.crop(),
            frames,
            output,
        };
        info!(
            "Exporting {} frames cropped to {} into {}",
            request.frames.len(),
            request.crop,
            request.output.display()
        );
        let job = ExportJob::spawn(request).context("Failed to start export")?;
        self.export = Some(job);
        self.export_progress = Some((0, 0));
        Ok(())
    }

    fn poll_export(&mut self, ctx: &egui::Context) {
        let Some(job) = self.export.as_mut() else {
            return;
        };

        let events = job.poll();
        let settled = events.iter().any(ExportEvent::is_final);
        for event in events {
            match event {
                ExportEvent::Progress { done, total } => {
                    self.export_progress = Some((done, total));
                }
                ExportEvent::Finished(path) => {
                    self.status = Some(format!("Exported {}", path.display()));
                    self.export_progress = None;
                }
                ExportEvent::Cancelled => {
                    self.status = Some("Export cancelled".to_string());
                    self.export_progress = None;
                }
                ExportEvent::Failed(message) => {
                    self.error_message = Some(format!("Export failed: {message}"));
                    self.export_progress = None;
                }
            }
        }

        // poll() always yields a final event once the worker has stopped
        if settled {
            self.export = None;
            self.export_progress = None;
        } else {
            ctx.request_repaint();
        }
    }

    fn show_pixel(&self, x: u32, y: u32) {
        if let Some(value) = self.frame.as_ref().and_then(|f| f.pixel(x, y)) {
            debug!("Pixel ({x}, {y}) = {value:?}");
        }
    }
}

impl eframe::App for VidCropApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_export(ctx);

        // Menu bar
        TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open...").clicked() {
                        ui.close_menu();
                        self.open_file(ctx);
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        // Control bar at bottom
        if self.source.is_some() {
            let mut action = None;
            TopBottomPanel::bottom("controls").show(ctx, |ui| {
                action = CropControls::show(ui, &mut self.slider, self.crop_mode);

                if let Some((done, total)) = self.export_progress {
                    ui.horizontal(|ui| {
                        let fraction = if total == 0 { 0.0 } else { done as f32 / total as f32 };
                        ui.add(
                            ProgressBar::new(fraction)
                                .text(format!("Exporting {done}/{total}"))
                                .desired_width(300.0),
                        );
                        if ui.button("Cancel").clicked() {
                            if let Some(job) = &self.export {
                                job.cancel();
                            }
                        }
                    });
                }

                if let Some(ref err) = self.error_message {
                    ui.colored_label(Color32::RED, err);
                } else if let Some(ref status) = self.status {
                    ui.label(status);
                }
            });
            if let Some(action) = action {
                self.handle_action(action, ctx);
            }
        }

        // Frame display area
        let mut response = None;
        CentralPanel::default().show(ctx, |ui| {
            if self.source.is_some() {
                response = Some(self.viewer.show(
                    ui,
                    &mut self.selector,
                    self.crop_mode,
                    self.selection,
                ));
            } else {
                // No video loaded - show open button
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(ui.available_height() / 3.0);

                        if let Some(ref err) = self.error_message {
                            ui.colored_label(Color32::RED, err);
                            ui.add_space(20.0);
                        }

                        ui.heading("No video loaded");
                        ui.add_space(10.0);

                        if ui.button("Open Video File...").clicked() {
                            self.open_file(ctx);
                        }

                        ui.add_space(10.0);
                        ui.label("Or drag and drop a video file");
                    });
                });
            }
        });

        if let Some(response) = response {
            if let Some(corners) = response.selection {
                debug!("Selection {:?} -> {:?}", corners.0, corners.1);
                self.selection = Some(corners);
            }
            if response.wheel_steps != 0 {
                let before = self.slider.value();
                self.slider.step_by(response.wheel_steps);
                if self.slider.value() != before {
                    self.reload(ctx);
                }
            }
            if let Some((x, y)) = response.clicked_pixel {
                self.show_pixel(x, y);
            }
        }

        // Handle file drops
        let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.load_video(path, ctx);
        }
    }
}

/// Append `fallback` when the dialog returned a name without a known extension
fn with_default_extension(path: PathBuf, known: &[&str], fallback: &str) -> PathBuf {
    let has_known = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| known.contains(&e.to_ascii_lowercase().as_str()));
    if has_known {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(".");
        name.push(fallback);
        PathBuf::from(name)
    }
}
