use crate::image::ImageSize;

/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two images that must be co-indexed have different sizes.
    #[error("Image size mismatch: {0} vs {1}")]
    InvalidImageSize(ImageSize, ImageSize),

    /// Error when the channel index is out of bounds.
    #[error("Channel index {0} is out of bounds ({1} channels)")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when the voxel index is out of bounds.
    #[error("Voxel index {0} is out of bounds ({1} voxels)")]
    VoxelIndexOutOfBounds(usize, usize),

    /// Error when an operation needs at least one voxel.
    #[error("Image has no voxels")]
    EmptyImage,

    /// Error when a value cannot be represented in the target type.
    #[error("Failed to cast image data")]
    CastError,
}
