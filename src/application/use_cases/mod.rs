//! Use case implementations.

mod web_image_use_case;

pub use web_image_use_case::WebImageUseCase;
