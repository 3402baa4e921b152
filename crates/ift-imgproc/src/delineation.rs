use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ift_image::{Image, ImageError};

use crate::adjacency::AdjacencyRelation;
use crate::components::{
    label_components, remove_labels_by_size_fraction, select_components_in_area_interval,
    select_largest_component,
};
use crate::forest::{self, ForestError};
use crate::gradient::image_gradient;
use crate::morphology::{complement, dilate_binary};
use crate::threshold::{otsu_threshold, threshold_range};

/// Errors raised by the delineation pipeline.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DelineationError {
    /// Error from the forest propagation.
    #[error(transparent)]
    Forest(#[from] ForestError),

    /// Error from an image operator.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Arc-weight policy used to propagate the seeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PropagationMethod {
    /// Static weights from the image gradient.
    Watershed,
    /// Weights from the running color mean of each tree.
    #[default]
    DynamicTrees,
}

/// Parameters of [`delineate`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DelineationConfig {
    /// Arc-weight policy.
    pub method: PropagationMethod,
    /// Radius of the neighbourhood the gradient is computed over.
    pub gradient_radius: f32,
    /// Smallest saliency component, in voxels, kept as an object seed.
    pub min_seed_area: usize,
    /// Largest saliency component, in voxels, kept as an object seed.
    pub max_seed_area: usize,
    /// Distance from the object seeds beyond which every voxel is a background seed.
    pub dilation_radius: f32,
    /// Labels covering less than this share of the image are dropped.
    pub min_size_fraction: f32,
    /// Labels covering more than this share of the image are dropped.
    pub max_size_fraction: f32,
    /// Keep only the largest connected object of the result.
    pub keep_largest_component: bool,
}

impl Default for DelineationConfig {
    fn default() -> Self {
        Self {
            method: PropagationMethod::DynamicTrees,
            gradient_radius: 3.0,
            min_seed_area: 400,
            max_seed_area: 4000,
            dilation_radius: 15.0,
            min_size_fraction: 0.01,
            max_size_fraction: 0.035,
            keep_largest_component: true,
        }
    }
}

/// Delineate the salient objects of an image.
///
/// The saliency map is binarized at its Otsu threshold and the components
/// whose area fits the configured interval become object seeds, one label
/// per component. Everything farther than `dilation_radius` from them is a
/// background seed. The seeds are then propagated over the image with the
/// configured policy and the resulting labels are filtered by size.
///
/// When no component qualifies as a seed the propagation is skipped and
/// the label grid is all background.
///
/// # Arguments
///
/// * `image` - The image to delineate, any number of channels.
/// * `saliency` - An 8-bit saliency map of the same size, high on objects.
/// * `config` - The pipeline parameters.
///
/// # Returns
///
/// The label grid, 0 for background.
///
/// # Errors
///
/// Fails if the saliency map and the image differ in size.
pub fn delineate<const C: usize>(
    image: &Image<f32, C>,
    saliency: &Image<u8, 1>,
    config: &DelineationConfig,
) -> Result<Image<u32, 1>, DelineationError> {
    let size = image.size();
    if saliency.size() != size {
        return Err(ImageError::InvalidImageSize(saliency.size(), size).into());
    }

    let components = AdjacencyRelation::default_for(size);

    let threshold = otsu_threshold(saliency);
    let mut bin = Image::from_size_val(size, 0u8)?;
    threshold_range(saliency, &mut bin, threshold, u8::MAX, u8::MAX)?;

    let seeds = select_components_in_area_interval(
        &bin,
        &components,
        config.min_seed_area,
        config.max_seed_area,
    )?;
    if seeds.as_slice().iter().all(|&v| v == 0) {
        log::info!(
            "no saliency component in [{}, {}] voxels at threshold {}, labelling all background",
            config.min_seed_area,
            config.max_seed_area,
            threshold
        );
        return Ok(Image::from_size_val(size, 0u32)?);
    }

    let mut dilated = Image::from_size_val(size, 0u8)?;
    dilate_binary(&seeds, &mut dilated, config.dilation_radius)?;
    let mut outside = Image::from_size_val(size, 0u8)?;
    complement(&dilated, &mut outside)?;
    let seeds_out = outside.map(|&v| v as u32);
    let (seeds_in, num_objects) = label_components(&seeds, &components)?;

    let adjacency = AdjacencyRelation::ball(size, 1.0);
    let mut label = match config.method {
        PropagationMethod::Watershed => {
            let gradient =
                image_gradient(image, &AdjacencyRelation::ball(size, config.gradient_radius))?;
            forest::watershed(&gradient, &seeds_in, &seeds_out, &adjacency)?
        }
        PropagationMethod::DynamicTrees => {
            forest::dynamic_trees(image, &seeds_in, &seeds_out, &adjacency)?
        }
    };

    let removed = remove_labels_by_size_fraction(
        &mut label,
        config.min_size_fraction,
        config.max_size_fraction,
    );
    if config.keep_largest_component {
        label = select_largest_component(&label, &components)?;
    }

    log::debug!(
        "delineation: {} object seeds at threshold {}, {} labels dropped by size",
        num_objects,
        threshold,
        removed
    );

    Ok(label)
}

/// Run [`delineate`] on every `(image, saliency)` pair in parallel.
///
/// Each pair is processed independently; the results keep the input order.
pub fn delineate_batch<const C: usize>(
    inputs: &[(Image<f32, C>, Image<u8, 1>)],
    config: &DelineationConfig,
) -> Vec<Result<Image<u32, 1>, DelineationError>> {
    inputs
        .par_iter()
        .map(|(image, saliency)| delineate(image, saliency, config))
        .collect()
}
