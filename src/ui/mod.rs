pub mod controls;
pub mod frame_slider;
pub mod viewer;

pub use controls::{ControlAction, CropControls};
pub use frame_slider::FrameSlider;
pub use viewer::{DisplayMode, FrameViewer, ViewerResponse};
