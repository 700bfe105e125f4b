mod app;

use app::VidCropApp;
use clap::Parser;
use eframe::NativeOptions;
use std::path::PathBuf;
use vidcrop::{AppConfig, CropRegion};

/// Scrub through a video, crop it by dragging, and export stills or clips
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Video file to open
    file: Option<PathBuf>,

    /// Frame to show first
    #[arg(short, long, default_value_t = 0)]
    frame: usize,

    /// Initial crop as x_min,x_max,y_min,y_max
    #[arg(short, long)]
    crop: Option<CropRegion>,

    /// Starting directory for video dialogs
    #[arg(long)]
    video_dir: Option<PathBuf>,

    /// Starting directory for image dialogs
    #[arg(long)]
    picture_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> AppConfig {
        let defaults = AppConfig::default();
        AppConfig {
            file: self.file,
            initial_frame: self.frame,
            initial_crop: self.crop,
            video_dir: self.video_dir.or(defaults.video_dir),
            picture_dir: self.picture_dir.or(defaults.picture_dir),
        }
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();

    if let Err(e) = vidcrop::video::init_ffmpeg() {
        log::error!("Failed to initialize FFmpeg: {e}");
        std::process::exit(1);
    }

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 720.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "vidcrop",
        options,
        Box::new(|cc| Ok(Box::new(VidCropApp::new(cc, config)))),
    )
}
