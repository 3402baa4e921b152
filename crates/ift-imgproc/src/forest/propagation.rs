use ift_image::{Image, ImageError, ImageSize};

use super::weight::ArcWeight;
use super::ForestError;
use crate::adjacency::AdjacencyRelation;
use crate::queue::{BucketQueue, NodeState, INFINITE_COST};

/// Result of a complete propagation, co-indexed with the input grid.
#[derive(Clone, Debug, PartialEq)]
pub struct ForestOutput {
    /// Label inherited from the root of each optimum path, 0 for background.
    pub label: Image<u32, 1>,
    /// Minimax path cost, [`INFINITE_COST`] for voxels no seed reaches.
    pub cost: Image<u32, 1>,
    /// Seed voxel whose tree owns each voxel.
    pub root: Vec<Option<usize>>,
}

/// Optimum-path forest under the minimax path cost.
///
/// Every voxel is queued up front: seeds with cost 0, everything else with
/// [`INFINITE_COST`]. Each [`OptimumPathForest::step`] pops the cheapest
/// voxel `p`, lets the weight function fold it into its tree, then offers
/// every non-finalized neighbour `q` the path cost `max(cost[p], w(p, q))`.
/// A neighbour that accepts is relabelled, rerooted and moved to its new
/// bucket.
///
/// The state arrays belong to this value and are dropped with it; the
/// output images handed back by [`OptimumPathForest::run`] are independent.
pub struct OptimumPathForest<'a, W: ArcWeight> {
    size: ImageSize,
    adjacency: &'a AdjacencyRelation,
    weight: W,
    queue: BucketQueue,
    cost: Vec<u32>,
    label: Vec<u32>,
    root: Vec<Option<usize>>,
    num_seeds: usize,
}

impl<'a, W: ArcWeight> OptimumPathForest<'a, W> {
    /// Initialize the forest from two seed grids.
    ///
    /// # Arguments
    ///
    /// * `seeds_in` - Object seeds, each non-zero value is the label of its tree.
    /// * `seeds_out` - Background seeds, any non-zero value marks a seed with label 0.
    /// * `adjacency` - Neighbourhood used for the arcs. Offset 0 is skipped.
    /// * `weight` - Arc-weight function.
    ///
    /// A voxel marked in both grids is an object seed.
    ///
    /// # Errors
    ///
    /// Fails if the seed grids and the weight grid differ in size, or if the
    /// weight bound is above [`MAX_COST_BOUND`](crate::queue::MAX_COST_BOUND).
    pub fn new(
        seeds_in: &Image<u32, 1>,
        seeds_out: &Image<u32, 1>,
        adjacency: &'a AdjacencyRelation,
        weight: W,
    ) -> Result<Self, ForestError> {
        let size = weight.size();
        for seeds in [seeds_in, seeds_out] {
            if seeds.size() != size {
                return Err(ImageError::InvalidImageSize(seeds.size(), size).into());
            }
        }

        let n = size.num_voxels();
        let mut queue = BucketQueue::new(weight.max_weight(), n)?;
        let mut cost = vec![INFINITE_COST; n];
        let mut label = vec![0u32; n];
        let mut root = vec![None; n];
        let mut num_seeds = 0;

        let seeds = seeds_in.as_slice().iter().zip(seeds_out.as_slice());
        for (p, (&obj, &bkg)) in seeds.enumerate() {
            if obj != 0 || bkg != 0 {
                cost[p] = 0;
                label[p] = obj;
                root[p] = Some(p);
                num_seeds += 1;
            }
            queue.insert(p, cost[p])?;
        }

        Ok(Self {
            size,
            adjacency,
            weight,
            queue,
            cost,
            label,
            root,
            num_seeds,
        })
    }

    /// Pop and finalize the cheapest voxel, then relax its neighbours.
    ///
    /// Returns the popped voxel, or `None` once every voxel is finalized.
    /// A voxel that no seed reached is finalized with label 0 and relaxes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Fails if a relaxed path cost exceeds the weight bound.
    pub fn step(&mut self) -> Result<Option<usize>, ForestError> {
        let Some(p) = self.queue.pop_min() else {
            return Ok(None);
        };
        let Some(r) = self.root[p] else {
            return Ok(Some(p));
        };

        self.weight.on_finalize(p, r);

        let u = self.size.voxel_coord(p);
        let adjacency = self.adjacency;
        for v in adjacency.neighbors(u) {
            if self.size.is_valid_voxel(v) {
                self.relax(p, self.size.voxel_index(v))?;
            }
        }

        Ok(Some(p))
    }

    /// Offer `q` the path through `p`.
    ///
    /// Returns whether `q` accepted it. Finalized voxels never change, and a
    /// voxel `p` without a root has no path to offer.
    ///
    /// # Errors
    ///
    /// Fails if the offered cost exceeds the weight bound; `q` is left
    /// untouched in that case.
    pub fn relax(&mut self, p: usize, q: usize) -> Result<bool, ForestError> {
        if self.queue.state(q) == NodeState::Finalized {
            return Ok(false);
        }
        let Some(r) = self.root[p] else {
            return Ok(false);
        };

        let offered = self.cost[p].max(self.weight.weight(p, q, r));
        if offered >= self.cost[q] {
            return Ok(false);
        }

        self.queue.decrease_key(q, offered)?;
        self.cost[q] = offered;
        self.label[q] = self.label[p];
        self.root[q] = Some(r);
        Ok(true)
    }

    /// Run until the queue is exhausted and return the forest.
    ///
    /// # Errors
    ///
    /// Fails if a path cost exceeds the weight bound.
    pub fn run(mut self) -> Result<ForestOutput, ForestError> {
        let mut num_popped = 0usize;
        while self.step()?.is_some() {
            num_popped += 1;
        }

        log::debug!(
            "optimum-path forest: {} voxels finalized from {} seeds, cost bound {}",
            num_popped,
            self.num_seeds,
            self.queue.max_cost()
        );

        Ok(ForestOutput {
            label: Image::new(self.size, self.label)?,
            cost: Image::new(self.size, self.cost)?,
            root: self.root,
        })
    }

    /// Size of the grid.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Current path cost of every voxel.
    pub fn cost(&self) -> &[u32] {
        &self.cost
    }

    /// Current label of every voxel.
    pub fn label(&self) -> &[u32] {
        &self.label
    }

    /// Current root of every voxel.
    pub fn root(&self) -> &[Option<usize>] {
        &self.root
    }

    /// Queue state of voxel `p`.
    pub fn state(&self, p: usize) -> NodeState {
        self.queue.state(p)
    }

    /// Whether every voxel has been finalized.
    pub fn is_done(&self) -> bool {
        self.queue.is_empty()
    }

    /// The arc-weight function, with whatever state it accumulated.
    pub fn weight(&self) -> &W {
        &self.weight
    }

    /// Number of seed voxels, object and background.
    pub fn num_seeds(&self) -> usize {
        self.num_seeds
    }
}
