mod content;
mod image;

pub use content::ContentRecord;
pub use image::ImageRecord;
