use ift_image::{Image, ImageError};

use crate::adjacency::AdjacencyRelation;
use crate::parallel;

/// Compute the gradient magnitude of a multi-channel image over an adjacency.
///
/// For every voxel `p` and channel `b` the directional derivatives along the
/// adjacency offsets are accumulated into a vector
///
/// `g_b = sum_i (I_b(q_i) - I_b(p)) * d_i / |d_i| / (n - 1)`
///
/// where `q_i = p + d_i` runs over the neighbours inside the image and `n`
/// is the adjacency size. The channel vectors are averaged and the output is
/// the rounded Euclidean norm of that average.
///
/// # Arguments
///
/// * `src` - The input image with `C` channels.
/// * `adjacency` - Neighbourhood the derivatives are taken over.
///
/// # Returns
///
/// A single-channel image with the rounded gradient magnitude.
///
/// # Example
///
/// ```
/// use ift_image::Image;
/// use ift_imgproc::adjacency::AdjacencyRelation;
/// use ift_imgproc::gradient::image_gradient;
///
/// let image = Image::<f32, 1>::new([4, 1].into(), vec![0.0, 0.0, 80.0, 80.0]).unwrap();
/// let gradient = image_gradient(&image, &AdjacencyRelation::circular(1.0)).unwrap();
///
/// assert_eq!(gradient.as_slice(), &[0, 20, 20, 0]);
/// ```
pub fn image_gradient<T, const C: usize>(
    src: &Image<T, C>,
    adjacency: &AdjacencyRelation,
) -> Result<Image<u32, 1>, ImageError>
where
    T: Copy + Into<f32> + Send + Sync,
{
    let mut dst = Image::from_size_val(src.size(), 0u32)?;
    if adjacency.len() < 2 {
        return Ok(dst);
    }

    let size = src.size();
    let norm = (adjacency.len() - 1) as f32;
    // unit direction of every offset, center excluded
    let directions = adjacency
        .offsets()
        .iter()
        .zip(adjacency.magnitudes())
        .skip(1)
        .map(|(d, mag)| (*d, [d.x as f32 / mag, d.y as f32 / mag, d.z as f32 / mag]))
        .collect::<Vec<_>>();

    parallel::par_iter_rows_indexed(&mut dst, |p, dst_pixel| {
        let u = size.voxel_coord(p);
        let center = src.pixel(p);
        let mut mean = [0f32; 3];

        for (d, unit) in directions.iter() {
            let v = u + *d;
            if !size.is_valid_voxel(v) {
                continue;
            }
            let neighbor = src.pixel(size.voxel_index(v));
            for (&a, &b) in neighbor.iter().zip(center.iter()) {
                let diff = Into::<f32>::into(a) - Into::<f32>::into(b);
                for (m, &w) in mean.iter_mut().zip(unit.iter()) {
                    *m += diff * w;
                }
            }
        }

        let scale = norm * C as f32;
        let magnitude = mean
            .iter()
            .map(|m| (m / scale) * (m / scale))
            .sum::<f32>()
            .sqrt();
        *dst_pixel = magnitude.round() as u32;
    });

    Ok(dst)
}
