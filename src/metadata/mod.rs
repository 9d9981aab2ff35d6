//! Playlist metadata change detection.
//!
//! Name and description are compared verbatim. Cover images are compared by a
//! content id derived from the URL and debounced, since the image CDN rewrites
//! paths without the picture actually changing.

mod detector;
mod image;

pub use detector::{
    MetadataChange, MetadataChangeDetector, MetadataDetection, DEFAULT_IMAGE_DEBOUNCE,
};
pub use image::{image_content_id, strip_query};
