//! Image foresting transform with minimax path costs.
//!
//! [`OptimumPathForest`] drives the propagation; an [`ArcWeight`] decides the
//! weight of each arc. Two policies are provided:
//!
//! * [`StaticWeight`], a precomputed scalar per target voxel (seeded watershed).
//! * [`DynamicTreeWeight`], the distance between the target sample and the
//!   running mean of the tree that owns the source voxel (dynamic trees).

mod propagation;
mod weight;

pub use propagation::{ForestOutput, OptimumPathForest};
pub use weight::{ArcWeight, DynamicTreeWeight, StaticWeight, TreeStats};

use ift_image::{Image, ImageError};

use crate::adjacency::AdjacencyRelation;
use crate::queue::QueueError;

/// Errors raised while building or propagating a forest.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ForestError {
    /// Error from the bucket queue, typically a cost above the weight bound.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Error from the input or output grids.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Seeded watershed: propagate labels over a precomputed gradient.
///
/// # Arguments
///
/// * `gradient` - Arc weight of every target voxel.
/// * `seeds_in` - Object seeds with their labels, 0 elsewhere.
/// * `seeds_out` - Background seeds, non-zero where a seed is.
/// * `adjacency` - Neighbourhood of the arcs.
///
/// # Returns
///
/// The label grid, 0 for background.
///
/// # Example
///
/// ```
/// use ift_image::Image;
/// use ift_imgproc::adjacency::AdjacencyRelation;
/// use ift_imgproc::forest::watershed;
///
/// let gradient = Image::<u32, 1>::new([5, 1].into(), vec![0, 1, 9, 1, 0]).unwrap();
/// let seeds_in = Image::<u32, 1>::new([5, 1].into(), vec![1, 0, 0, 0, 0]).unwrap();
/// let seeds_out = Image::<u32, 1>::new([5, 1].into(), vec![0, 0, 0, 0, 1]).unwrap();
///
/// let label = watershed(
///     &gradient,
///     &seeds_in,
///     &seeds_out,
///     &AdjacencyRelation::circular(1.0),
/// )
/// .unwrap();
///
/// assert_eq!(label.as_slice(), &[1, 1, 1, 0, 0]);
/// ```
pub fn watershed(
    gradient: &Image<u32, 1>,
    seeds_in: &Image<u32, 1>,
    seeds_out: &Image<u32, 1>,
    adjacency: &AdjacencyRelation,
) -> Result<Image<u32, 1>, ForestError> {
    let weight = StaticWeight::new(gradient);
    let forest = OptimumPathForest::new(seeds_in, seeds_out, adjacency, weight)?;
    Ok(forest.run()?.label)
}

/// Dynamic trees: propagate labels with weights taken from growing tree means.
///
/// Same contract as [`watershed`], with `samples` holding the channel values
/// the tree means are computed from.
pub fn dynamic_trees<const C: usize>(
    samples: &Image<f32, C>,
    seeds_in: &Image<u32, 1>,
    seeds_out: &Image<u32, 1>,
    adjacency: &AdjacencyRelation,
) -> Result<Image<u32, 1>, ForestError> {
    let weight = DynamicTreeWeight::new(samples);
    let forest = OptimumPathForest::new(seeds_in, seeds_out, adjacency, weight)?;
    Ok(forest.run()?.label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{NodeState, INFINITE_COST, MAX_COST_BOUND};
    use ift_image::{ImageSize, Voxel};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn seed_grid(size: ImageSize, seeds: &[(usize, u32)]) -> Result<Image<u32, 1>, ImageError> {
        let mut grid = Image::from_size_val(size, 0u32)?;
        for &(p, l) in seeds {
            grid.as_slice_mut()[p] = l;
        }
        Ok(grid)
    }

    fn random_gradient(size: ImageSize, seed: u64) -> Result<Image<u32, 1>, ImageError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..size.num_voxels())
            .map(|_| rng.random_range(0..50u32))
            .collect();
        Image::new(size, data)
    }

    #[test]
    fn watershed_constant_weight_partition() -> Result<(), ForestError> {
        let size = ImageSize::from([5, 5]);
        let gradient = Image::from_size_val(size, 1u32)?;
        let seeds_in = seed_grid(size, &[(0, 1)])?;
        let seeds_out = seed_grid(size, &[(24, 1)])?;

        let label = watershed(
            &gradient,
            &seeds_in,
            &seeds_out,
            &AdjacencyRelation::circular(1.0),
        )?;

        // the anti-diagonal is equidistant; the object seed is popped first
        #[rustfmt::skip]
        let expected = vec![
            1, 1, 1, 1, 1,
            1, 1, 1, 1, 0,
            1, 1, 1, 0, 0,
            1, 1, 0, 0, 0,
            1, 0, 0, 0, 0,
        ];
        assert_eq!(label.as_slice(), expected.as_slice());
        Ok(())
    }

    #[test]
    fn watershed_costs_and_roots() -> Result<(), ForestError> {
        let size = ImageSize::from([5, 1]);
        let gradient = Image::new(size, vec![0, 1, 9, 1, 0])?;
        let seeds_in = seed_grid(size, &[(0, 1)])?;
        let seeds_out = seed_grid(size, &[(4, 255)])?;
        let adjacency = AdjacencyRelation::circular(1.0);

        let output = OptimumPathForest::new(
            &seeds_in,
            &seeds_out,
            &adjacency,
            StaticWeight::new(&gradient),
        )?
        .run()?;

        assert_eq!(output.label.as_slice(), &[1, 1, 1, 0, 0]);
        assert_eq!(output.cost.as_slice(), &[0, 1, 9, 1, 0]);
        assert_eq!(
            output.root,
            vec![Some(0), Some(0), Some(0), Some(4), Some(4)]
        );
        Ok(())
    }

    #[test]
    fn object_seed_wins_over_background_seed() -> Result<(), ForestError> {
        let size = ImageSize::from([2, 1]);
        let gradient = Image::from_size_val(size, 0u32)?;
        let seeds_in = seed_grid(size, &[(1, 3)])?;
        let seeds_out = seed_grid(size, &[(0, 1), (1, 1)])?;

        let label = watershed(
            &gradient,
            &seeds_in,
            &seeds_out,
            &AdjacencyRelation::circular(1.0),
        )?;
        assert_eq!(label.as_slice(), &[0, 3]);
        Ok(())
    }

    #[test]
    fn empty_seeds_give_background() -> Result<(), ForestError> {
        let size = ImageSize::from([4, 3]);
        let adjacency = AdjacencyRelation::circular(1.0);
        let none = Image::from_size_val(size, 0u32)?;
        let gradient = random_gradient(size, 7)?;

        let output = OptimumPathForest::new(
            &none,
            &none,
            &adjacency,
            StaticWeight::new(&gradient),
        )?
        .run()?;
        assert!(output.label.as_slice().iter().all(|&l| l == 0));
        assert!(output.cost.as_slice().iter().all(|&c| c == INFINITE_COST));
        assert!(output.root.iter().all(Option::is_none));

        let samples = gradient.map(|&g| g as f32);
        let label = dynamic_trees(&samples, &none, &none, &adjacency)?;
        assert!(label.as_slice().iter().all(|&l| l == 0));
        Ok(())
    }

    #[test]
    fn propagation_is_deterministic() -> Result<(), ForestError> {
        let size = ImageSize::from([16, 12]);
        let adjacency = AdjacencyRelation::circular(1.5);
        let gradient = random_gradient(size, 42)?;
        let samples = gradient.map(|&g| g as f32);
        let seeds_in = seed_grid(size, &[(17, 1), (100, 2)])?;
        let seeds_out = seed_grid(size, &[(0, 1), (191, 1)])?;

        let run_static = || {
            OptimumPathForest::new(
                &seeds_in,
                &seeds_out,
                &adjacency,
                StaticWeight::new(&gradient),
            )?
            .run()
        };
        assert_eq!(run_static()?, run_static()?);

        let run_dynamic = || {
            OptimumPathForest::new(
                &seeds_in,
                &seeds_out,
                &adjacency,
                DynamicTreeWeight::new(&samples),
            )?
            .run()
        };
        assert_eq!(run_dynamic()?, run_dynamic()?);
        Ok(())
    }

    #[test]
    fn popped_costs_are_monotone() -> Result<(), ForestError> {
        let size = ImageSize::from([20, 15]);
        let adjacency = AdjacencyRelation::circular(1.5);
        let gradient = random_gradient(size, 3)?;
        let seeds_in = seed_grid(size, &[(21, 1), (150, 2)])?;
        let seeds_out = seed_grid(size, &[(0, 1), (299, 1)])?;

        let mut forest = OptimumPathForest::new(
            &seeds_in,
            &seeds_out,
            &adjacency,
            StaticWeight::new(&gradient),
        )?;

        let mut popped = Vec::new();
        while let Some(p) = forest.step()? {
            popped.push(forest.cost()[p]);
        }
        assert_eq!(popped.len(), size.num_voxels());
        assert!(popped.windows(2).all(|w| w[0] <= w[1]));
        Ok(())
    }

    #[test]
    fn finalized_voxels_are_immutable() -> Result<(), ForestError> {
        let size = ImageSize::from([10, 10]);
        let adjacency = AdjacencyRelation::circular(1.0);
        let gradient = random_gradient(size, 11)?;
        let samples = gradient.map(|&g| g as f32);
        let seeds_in = seed_grid(size, &[(55, 1)])?;
        let seeds_out = seed_grid(size, &[(0, 1), (99, 1)])?;

        let mut forest = OptimumPathForest::new(
            &seeds_in,
            &seeds_out,
            &adjacency,
            DynamicTreeWeight::new(&samples),
        )?;
        while forest.step()?.is_some() {}
        assert!(forest.is_done());

        let cost = forest.cost().to_vec();
        let label = forest.label().to_vec();
        for q in 0..size.num_voxels() {
            assert_eq!(forest.state(q), NodeState::Finalized);
            let v = size.voxel_coord(q);
            for u in adjacency.neighbors(v).filter(|&u| size.is_valid_voxel(u)) {
                assert!(!forest.relax(size.voxel_index(u), q)?);
            }
        }
        assert_eq!(forest.cost(), cost.as_slice());
        assert_eq!(forest.label(), label.as_slice());
        Ok(())
    }

    #[test]
    fn every_finalized_voxel_carries_its_root_label() -> Result<(), ForestError> {
        let size = ImageSize::from([12, 9]);
        let adjacency = AdjacencyRelation::circular(1.0);
        let gradient = random_gradient(size, 5)?;
        let samples = gradient.map(|&g| g as f32);
        let seeds_in = seed_grid(size, &[(13, 4), (80, 9)])?;
        let seeds_out = seed_grid(size, &[(0, 1), (107, 1)])?;

        let output = OptimumPathForest::new(
            &seeds_in,
            &seeds_out,
            &adjacency,
            DynamicTreeWeight::new(&samples),
        )?
        .run()?;

        for (p, root) in output.root.iter().enumerate() {
            let r = root.expect("every voxel is reachable");
            assert!([13, 80, 0, 107].contains(&r));
            assert_eq!(output.label.as_slice()[p], output.label.as_slice()[r]);
        }
        Ok(())
    }

    #[test]
    fn dynamic_tree_mean_follows_popping_order() -> Result<(), ForestError> {
        let size = ImageSize::from([3, 3]);
        let mut data = vec![10.0f32; 27];
        data[12..15].copy_from_slice(&[200.0, 50.0, 0.0]);
        let samples = Image::<f32, 3>::new(size, data)?;
        let seeds_in = seed_grid(size, &[(1, 1)])?;
        let seeds_out = seed_grid(size, &[(7, 1)])?;
        let adjacency = AdjacencyRelation::circular(1.0);

        let mut forest = OptimumPathForest::new(
            &seeds_in,
            &seeds_out,
            &adjacency,
            DynamicTreeWeight::new(&samples),
        )?;

        let mut popped = Vec::new();
        while let Some(p) = forest.step()? {
            popped.push(p);
            let r = forest.root()[p].expect("all voxels are reachable");

            // arithmetic mean of the voxels popped so far under the same root
            let members = popped
                .iter()
                .filter(|&&s| forest.root()[s] == Some(r))
                .collect::<Vec<_>>();
            let mut expected = [0.0f64; 3];
            for &&s in &members {
                for (e, &v) in expected.iter_mut().zip(samples.pixel(s)) {
                    *e += v as f64 / members.len() as f64;
                }
            }

            let stats = forest.weight().tree_stats(r);
            assert_eq!(stats.count as usize, members.len());
            let mean = forest.weight().tree_mean(r).expect("tree is not empty");
            for (m, e) in mean.iter().zip(expected.iter()) {
                approx::assert_relative_eq!(*m, *e, epsilon = 1e-9);
            }
        }

        assert_eq!(popped, vec![1, 7, 0, 2, 6, 8, 3, 5, 4]);
        assert_eq!(forest.label(), &[1, 1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(forest.cost()[4], 194);
        assert_eq!(forest.weight().tree_stats(1).count, 6);
        assert_eq!(forest.weight().tree_stats(7).count, 3);
        Ok(())
    }

    #[test]
    fn watershed_volume() -> Result<(), ForestError> {
        let size = ImageSize::from([3, 3, 3]);
        let adjacency = AdjacencyRelation::spherical(1.0);
        // a wall of high gradient on the middle slice
        let gradient = Image::new(
            size,
            (0..27)
                .map(|p| if size.voxel_coord(p).z == 1 { 20 } else { 1 })
                .collect(),
        )?;
        let seeds_in = seed_grid(size, &[(size.voxel_index(Voxel::new(1, 1, 0)), 2)])?;
        let seeds_out = seed_grid(size, &[(size.voxel_index(Voxel::new(1, 1, 2)), 1)])?;

        let label = watershed(&gradient, &seeds_in, &seeds_out, &adjacency)?;
        for p in 0..27 {
            let z = size.voxel_coord(p).z;
            let l = label.as_slice()[p];
            match z {
                0 => assert_eq!(l, 2),
                2 => assert_eq!(l, 0),
                _ => assert!(l == 0 || l == 2),
            }
        }
        Ok(())
    }

    struct LyingWeight;

    impl ArcWeight for LyingWeight {
        fn size(&self) -> ImageSize {
            [3, 1].into()
        }

        fn max_weight(&self) -> u32 {
            2
        }

        fn weight(&self, _p: usize, _q: usize, _root: usize) -> u32 {
            5
        }
    }

    #[test]
    fn weight_above_bound_fails_fast() -> Result<(), ForestError> {
        let size = ImageSize::from([3, 1]);
        let seeds_in = seed_grid(size, &[(0, 1)])?;
        let seeds_out = seed_grid(size, &[])?;
        let adjacency = AdjacencyRelation::circular(1.0);

        let mut forest = OptimumPathForest::new(&seeds_in, &seeds_out, &adjacency, LyingWeight)?;
        assert_eq!(
            forest.step(),
            Err(ForestError::Queue(QueueError::CostOutOfRange {
                cost: 5,
                max_cost: 2
            }))
        );
        assert_eq!(forest.cost()[1], INFINITE_COST);
        assert_eq!(forest.label()[1], 0);
        Ok(())
    }

    #[test]
    fn oversized_weight_bound_is_rejected() -> Result<(), ForestError> {
        let size = ImageSize::from([3, 1]);
        let seeds_in = seed_grid(size, &[(0, 1)])?;
        let seeds_out = seed_grid(size, &[(2, 1)])?;
        let adjacency = AdjacencyRelation::circular(1.0);

        let gradient = Image::new(size, vec![0, u32::MAX - 1, 0])?;
        assert_eq!(
            watershed(&gradient, &seeds_in, &seeds_out, &adjacency),
            Err(ForestError::Queue(QueueError::BoundTooLarge(
                u32::MAX - 1,
                MAX_COST_BOUND
            )))
        );

        // a gradient at the unreached cost could never be offered to a voxel
        let gradient = Image::new(size, vec![0, INFINITE_COST, 0])?;
        assert!(watershed(&gradient, &seeds_in, &seeds_out, &adjacency).is_err());

        let samples = Image::<f32, 1>::new(size, vec![0.0, 5.0e9, 1.0])?;
        assert_eq!(
            dynamic_trees(&samples, &seeds_in, &seeds_out, &adjacency),
            Err(ForestError::Queue(QueueError::BoundTooLarge(
                u32::MAX,
                MAX_COST_BOUND
            )))
        );
        Ok(())
    }

    #[test]
    fn seed_size_mismatch() -> Result<(), ForestError> {
        let gradient = Image::from_size_val([3, 3].into(), 0u32)?;
        let seeds = Image::from_size_val([3, 2].into(), 0u32)?;
        let res = watershed(
            &gradient,
            &seeds,
            &seeds,
            &AdjacencyRelation::circular(1.0),
        );
        assert_eq!(
            res,
            Err(ForestError::Image(ImageError::InvalidImageSize(
                [3, 2].into(),
                [3, 3].into()
            )))
        );
        Ok(())
    }
}
