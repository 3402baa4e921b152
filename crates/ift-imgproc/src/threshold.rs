use num_traits::Zero;

use ift_image::{Image, ImageError};

use crate::parallel;

/// Compute Otsu's threshold of an 8-bit image.
///
/// Every candidate `T` in `1..max` splits the histogram into the classes
/// `v <= T` and `v > T`; the returned `T` is the first one maximizing
/// `p1 * p2 * (m1 - m2)^2 / (p1 * s1 + p2 * s2)`, with `p`, `m` and `s` the
/// weight, mean and variance of each class. Returns 0 when no candidate exists.
///
/// # Example
///
/// ```
/// use ift_image::Image;
/// use ift_imgproc::threshold::otsu_threshold;
///
/// let image = Image::<u8, 1>::new([4, 1].into(), vec![0, 0, 255, 255]).unwrap();
///
/// assert_eq!(otsu_threshold(&image), 1);
/// ```
pub fn otsu_threshold(src: &Image<u8, 1>) -> u8 {
    let mut hist = [0usize; 256];
    for &v in src.as_slice() {
        hist[v as usize] += 1;
    }

    let n = src.num_voxels() as f64;
    let max = src.as_slice().iter().copied().max().unwrap_or(0) as usize;

    let mut best = 0;
    let mut best_score = -1.0f64;
    for t in 1..max {
        let (lower, upper) = hist[..=max].split_at(t + 1);
        let c1 = lower.iter().sum::<usize>();
        let c2 = upper.iter().sum::<usize>();

        let score = if c1 > 0 && c2 > 0 {
            let (p1, p2) = (c1 as f64 / n, c2 as f64 / n);
            let (m1, s1) = class_moments(lower, 0, p1, n);
            let (m2, s2) = class_moments(upper, t + 1, p2, n);
            // zero within-class variance gives +inf, which still compares
            p1 * p2 * (m1 - m2) * (m1 - m2) / (p1 * s1 + p2 * s2)
        } else {
            0.0
        };

        if score > best_score {
            best_score = score;
            best = t;
        }
    }

    best as u8
}

// mean and variance of the histogram slice starting at intensity `offset`
fn class_moments(hist: &[usize], offset: usize, weight: f64, n: f64) -> (f64, f64) {
    let prob = |i: usize| hist[i] as f64 / n;
    let mean = (0..hist.len())
        .map(|i| prob(i) * (i + offset) as f64)
        .sum::<f64>()
        / weight;
    let var = (0..hist.len())
        .map(|i| {
            let d = (i + offset) as f64 - mean;
            prob(i) * d * d
        })
        .sum::<f64>()
        / weight;
    (mean, var)
}

/// Set `value` where `lowest <= src <= highest` and zero elsewhere.
///
/// # Arguments
///
/// * `src` - The input image of an arbitrary number of channels and type.
/// * `dst` - The output image, same size as the input.
/// * `lowest` - Lower bound of the accepted range, inclusive.
/// * `highest` - Upper bound of the accepted range, inclusive.
/// * `value` - The value written inside the range.
///
/// # Errors
///
/// Returns an error if the images differ in size.
///
/// # Example
///
/// ```
/// use ift_image::Image;
/// use ift_imgproc::threshold::threshold_range;
///
/// let image = Image::<u8, 1>::new([2, 3].into(), vec![100, 200, 50, 150, 200, 250]).unwrap();
/// let mut binary = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// threshold_range(&image, &mut binary, 150, 200, 255).unwrap();
/// assert_eq!(binary.as_slice(), &[0, 255, 0, 255, 255, 0]);
/// ```
pub fn threshold_range<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    lowest: T,
    highest: T,
    value: T,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync + PartialOrd + Zero,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(src.size(), dst.size()));
    }

    parallel::par_iter_rows_val(src, dst, |src_pixel, dst_pixel| {
        *dst_pixel = if *src_pixel >= lowest && *src_pixel <= highest {
            value
        } else {
            T::zero()
        };
    });

    Ok(())
}
