#![deny(missing_docs)]
//! Dense 2-D and 3-D multi-channel voxel grids.

/// image representation for image foresting transforms.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize, Voxel};
