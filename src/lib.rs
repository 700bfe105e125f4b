pub mod config;
pub mod crop;
pub mod error;
pub mod ui;
pub mod video;

pub use config::AppConfig;
pub use crop::{normalize, CropRegion, CropSession, DragEvent, DragSelector, Point};
pub use error::{Error, Result};
pub use ui::{CropControls, FrameSlider, FrameViewer};
pub use video::{Frame, FrameSource, PixelFormat, VideoReader};
