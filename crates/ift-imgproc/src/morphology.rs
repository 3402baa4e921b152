use ift_image::{Image, ImageError};

use crate::adjacency::AdjacencyRelation;
use crate::parallel;

/// Dilate a binary mask with a disk or a sphere of the given radius.
///
/// Every non-zero voxel of `src` is foreground. A voxel of `dst` is set to
/// 255 when it is foreground or lies within `radius` of a boundary voxel,
/// i.e. a foreground voxel with a background direct neighbour. Interior
/// voxels add nothing the boundary does not already cover.
///
/// # Arguments
///
/// * `src` - The input mask.
/// * `dst` - The dilated mask, same size as the input.
/// * `radius` - Radius of the structuring element.
///
/// # Errors
///
/// Returns an error if the images differ in size.
///
/// # Example
///
/// ```
/// use ift_image::Image;
/// use ift_imgproc::morphology::dilate_binary;
///
/// let mask = Image::<u8, 1>::new([5, 1].into(), vec![0, 0, 1, 0, 0]).unwrap();
/// let mut dilated = Image::<u8, 1>::from_size_val(mask.size(), 0).unwrap();
///
/// dilate_binary(&mask, &mut dilated, 1.0).unwrap();
/// assert_eq!(dilated.as_slice(), &[0, 255, 255, 255, 0]);
/// ```
pub fn dilate_binary(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    radius: f32,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(src.size(), dst.size()));
    }

    let size = src.size();
    let mask = src.as_slice();
    let unit = AdjacencyRelation::ball(size, 1.0);

    let mut boundary = Image::from_size_val(size, false)?;
    parallel::par_iter_rows_indexed(&mut boundary, |p, is_boundary| {
        *is_boundary = mask[p] != 0
            && unit
                .neighbors(size.voxel_coord(p))
                .any(|v| size.is_valid_voxel(v) && mask[size.voxel_index(v)] == 0);
    });

    // the ball is symmetric, so gathering from the boundary equals stamping it
    let ball = AdjacencyRelation::ball(size, radius);
    let boundary = boundary.as_slice();
    parallel::par_iter_rows_indexed(dst, |p, dst_pixel| {
        let u = size.voxel_coord(p);
        let covered = mask[p] != 0
            || ball
                .neighbors(u)
                .any(|v| size.is_valid_voxel(v) && boundary[size.voxel_index(v)]);
        *dst_pixel = if covered { 255 } else { 0 };
    });

    Ok(())
}

/// Set 255 where the mask is zero and zero elsewhere.
///
/// # Errors
///
/// Returns an error if the images differ in size.
pub fn complement(src: &Image<u8, 1>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(src.size(), dst.size()));
    }

    parallel::par_iter_rows_val(src, dst, |src_pixel, dst_pixel| {
        *dst_pixel = if *src_pixel == 0 { 255 } else { 0 };
    });

    Ok(())
}
