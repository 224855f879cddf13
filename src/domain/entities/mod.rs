//! Domain entity definitions.

mod cache_key;
mod loaded_image;

pub use cache_key::{CacheKey, MAX_KEY_LEN};
pub use loaded_image::{ImageSource, LoadedImage, decoded_size};
