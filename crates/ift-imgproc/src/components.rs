use std::collections::VecDeque;

use num_traits::Zero;

use ift_image::{Image, ImageError};

use crate::adjacency::AdjacencyRelation;

/// Label the connected components of the non-zero voxels of an image.
///
/// Components are numbered `1..=n` in the raster order of their first voxel;
/// background voxels get label 0. Two voxels are connected when one is an
/// adjacency offset away from the other, whatever their values.
///
/// # Returns
///
/// The label image and the number of components.
///
/// # Example
///
/// ```
/// use ift_image::Image;
/// use ift_imgproc::adjacency::AdjacencyRelation;
/// use ift_imgproc::components::label_components;
///
/// let mask = Image::<u8, 1>::new([5, 1].into(), vec![255, 255, 0, 0, 9]).unwrap();
/// let (label, num) = label_components(&mask, &AdjacencyRelation::circular(1.0)).unwrap();
///
/// assert_eq!(num, 2);
/// assert_eq!(label.as_slice(), &[1, 1, 0, 0, 2]);
/// ```
pub fn label_components<T>(
    mask: &Image<T, 1>,
    adjacency: &AdjacencyRelation,
) -> Result<(Image<u32, 1>, usize), ImageError>
where
    T: Copy + PartialEq + Zero,
{
    let size = mask.size();
    let mut label = Image::from_size_val(size, 0u32)?;
    let mut fifo = VecDeque::new();
    let mut num_labels = 0u32;

    for start in 0..size.num_voxels() {
        if mask.as_slice()[start].is_zero() || label.as_slice()[start] != 0 {
            continue;
        }

        num_labels += 1;
        label.as_slice_mut()[start] = num_labels;
        fifo.push_back(start);

        while let Some(p) = fifo.pop_front() {
            for v in adjacency.neighbors(size.voxel_coord(p)) {
                if !size.is_valid_voxel(v) {
                    continue;
                }
                let q = size.voxel_index(v);
                if !mask.as_slice()[q].is_zero() && label.as_slice()[q] == 0 {
                    label.as_slice_mut()[q] = num_labels;
                    fifo.push_back(q);
                }
            }
        }
    }

    Ok((label, num_labels as usize))
}

fn component_sizes(label: &Image<u32, 1>, num_labels: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; num_labels + 1];
    for &l in label.as_slice() {
        sizes[l as usize] += 1;
    }
    sizes
}

/// Keep the components whose voxel count lies in `[min_area, max_area]`.
///
/// # Returns
///
/// A binary mask with 255 on the kept components.
pub fn select_components_in_area_interval<T>(
    mask: &Image<T, 1>,
    adjacency: &AdjacencyRelation,
    min_area: usize,
    max_area: usize,
) -> Result<Image<u8, 1>, ImageError>
where
    T: Copy + PartialEq + Zero,
{
    let (label, num_labels) = label_components(mask, adjacency)?;
    let sizes = component_sizes(&label, num_labels);
    let keep = sizes
        .iter()
        .enumerate()
        .map(|(l, &s)| l != 0 && s >= min_area && s <= max_area)
        .collect::<Vec<_>>();

    Ok(label.map(|&l| if keep[l as usize] { 255u8 } else { 0 }))
}

/// Keep only the largest connected component of the non-zero voxels.
///
/// Voxels of the kept component retain their original value. When several
/// components share the largest size, the first in raster order is kept.
pub fn select_largest_component(
    label: &Image<u32, 1>,
    adjacency: &AdjacencyRelation,
) -> Result<Image<u32, 1>, ImageError> {
    let (components, num_labels) = label_components(label, adjacency)?;
    let sizes = component_sizes(&components, num_labels);

    let mut largest = 0;
    for (l, &s) in sizes.iter().enumerate().skip(1) {
        if largest == 0 || s > sizes[largest] {
            largest = l;
        }
    }

    let data = label
        .as_slice()
        .iter()
        .zip(components.as_slice())
        .map(|(&value, &c)| {
            if largest != 0 && c as usize == largest {
                value
            } else {
                0
            }
        })
        .collect();

    Image::new(label.size(), data)
}

/// Zero out the labels covering too small or too large a share of the image.
///
/// A label covering `s` voxels of an image of `n` voxels is removed when
/// `s < min_fraction * n` or `s > max_fraction * n`. Label 0 is ignored.
/// Removing labels does not change the size of the remaining ones, so a
/// second pass is a no-op.
///
/// # Returns
///
/// The number of labels removed.
pub fn remove_labels_by_size_fraction(
    label: &mut Image<u32, 1>,
    min_fraction: f32,
    max_fraction: f32,
) -> usize {
    let n = label.num_voxels() as f32;
    let max_label = label.as_slice().iter().copied().max().unwrap_or(0) as usize;
    let sizes = component_sizes(label, max_label);

    let remove = sizes
        .iter()
        .enumerate()
        .map(|(l, &s)| {
            l != 0 && s > 0 && ((s as f32) < min_fraction * n || (s as f32) > max_fraction * n)
        })
        .collect::<Vec<_>>();

    for l in label.as_slice_mut() {
        if remove[*l as usize] {
            *l = 0;
        }
    }

    remove.iter().filter(|&&r| r).count()
}
