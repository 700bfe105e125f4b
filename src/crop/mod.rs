mod region;
mod selector;
mod session;

pub use region::{CropRegion, Point};
pub use selector::{DragEvent, DragSelector};
pub use session::{normalize, CropSession};
