use rayon::prelude::*;

use ift_image::Image;

/// Apply a function to each value in the image in parallel.
pub fn par_iter_rows_val<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&T1, &mut T2) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
{
    if src.num_voxels() == 0 {
        return;
    }
    let cols = src.width();
    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .iter()
                .zip(dst_chunk.iter_mut())
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

/// Fill a single-channel image in parallel from the raster index of each voxel.
///
/// Used by operators that read a neighbourhood around `p` from another image.
pub fn par_iter_rows_indexed<T: Send + Sync>(
    dst: &mut Image<T, 1>,
    f: impl Fn(usize, &mut T) + Send + Sync,
) {
    if dst.num_voxels() == 0 {
        return;
    }
    let cols = dst.width();
    dst.as_slice_mut()
        .par_chunks_exact_mut(cols)
        .enumerate()
        .for_each(|(row, dst_chunk)| {
            dst_chunk
                .iter_mut()
                .enumerate()
                .for_each(|(col, dst_pixel)| f(row * cols + col, dst_pixel));
        });
}
