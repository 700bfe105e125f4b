use std::path::PathBuf;

/// Startup configuration, from the command line with desktop defaults
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Video to open on startup; a file dialog is shown when absent
    pub file: Option<PathBuf>,
    /// Frame shown first
    pub initial_frame: usize,
    /// `x_min,x_max,y_min,y_max` crop applied once the video is open
    pub initial_crop: Option<crate::CropRegion>,
    /// Where open and "Save Vid" dialogs start
    pub video_dir: Option<PathBuf>,
    /// Where "Save Img" dialogs start
    pub picture_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            file: None,
            initial_frame: 0,
            initial_crop: None,
            video_dir: dirs::video_dir().or_else(dirs::home_dir),
            picture_dir: dirs::picture_dir().or_else(dirs::home_dir),
        }
    }
}
