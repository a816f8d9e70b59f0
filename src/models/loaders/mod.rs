pub mod image_loader;

pub use image_loader::{list_image_files, load_image_file};
