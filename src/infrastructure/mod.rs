pub mod camera;

pub use camera::{CameraDevice, CameraSession, CommandCamera, FrameSource};
