use ift_image::{Image, ImageSize};

/// Arc-weight function of an optimum-path forest.
///
/// The propagator calls [`ArcWeight::on_finalize`] exactly once per rooted
/// voxel, when it leaves the queue, and only then evaluates the arcs leaving
/// that voxel. Implementations that keep per-tree state must update it in
/// `on_finalize` and only read it in `weight`.
pub trait ArcWeight {
    /// Size of the grid the weights are defined on.
    fn size(&self) -> ImageSize;

    /// Upper bound of every value returned by [`ArcWeight::weight`].
    ///
    /// The propagator sizes its bucket queue with it and rejects bounds above
    /// [`MAX_COST_BOUND`](crate::queue::MAX_COST_BOUND).
    fn max_weight(&self) -> u32;

    /// Voxel `p`, owned by the tree rooted at `root`, was finalized.
    fn on_finalize(&mut self, _p: usize, _root: usize) {}

    /// Weight of the arc `(p, q)`, where `p` belongs to the tree rooted at `root`.
    fn weight(&self, p: usize, q: usize, root: usize) -> u32;
}

/// Static arc weights read from a precomputed scalar grid.
///
/// `weight(p, q) = gradient[q]`, which turns the forest into a seeded
/// watershed transform.
pub struct StaticWeight<'a> {
    gradient: &'a Image<u32, 1>,
    max_weight: u32,
}

impl<'a> StaticWeight<'a> {
    /// Weights taken from `gradient`.
    pub fn new(gradient: &'a Image<u32, 1>) -> Self {
        let max_weight = gradient.as_slice().iter().copied().max().unwrap_or(0);
        Self {
            gradient,
            max_weight,
        }
    }
}

impl ArcWeight for StaticWeight<'_> {
    fn size(&self) -> ImageSize {
        self.gradient.size()
    }

    fn max_weight(&self) -> u32 {
        self.max_weight
    }

    fn weight(&self, _p: usize, q: usize, _root: usize) -> u32 {
        self.gradient.as_slice()[q]
    }
}

/// Running channel sum and voxel count of one tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeStats<const C: usize> {
    /// Sum of the samples of every finalized voxel of the tree, per channel.
    pub sum: [f64; C],
    /// Number of finalized voxels in the tree.
    pub count: u32,
}

impl<const C: usize> TreeStats<C> {
    /// Statistics of an empty tree.
    pub fn new() -> Self {
        Self {
            sum: [0.0; C],
            count: 0,
        }
    }

    /// Add one sample to the tree.
    pub fn push(&mut self, sample: &[f32]) {
        for (acc, &v) in self.sum.iter_mut().zip(sample) {
            *acc += v as f64;
        }
        self.count += 1;
    }

    /// Mean sample of the tree, or `None` while the tree is empty.
    pub fn mean(&self) -> Option<[f64; C]> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(self.sum.map(|s| s / n))
    }
}

impl<const C: usize> Default for TreeStats<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Arc weights computed from the running mean of the tree that owns `p`.
///
/// `weight(p, q) = round(|sample[q] - mean(tree(p))|)`, where the mean covers
/// every voxel the tree has finalized so far, `p` included and `q` excluded.
/// Trees grow as voxels are popped, so the weights depend on the popping
/// order and hence on the queue tie-break.
pub struct DynamicTreeWeight<'a, const C: usize> {
    samples: &'a Image<f32, C>,
    trees: Vec<TreeStats<C>>,
    max_weight: u32,
}

impl<'a, const C: usize> DynamicTreeWeight<'a, C> {
    /// Weights over the multi-channel `samples`.
    ///
    /// The bound is the diagonal of the bounding box of all samples, since
    /// a tree mean never leaves the range of the values it averages. One unit
    /// of slack absorbs rounding of the mean. The bound saturates at
    /// `u32::MAX` for sample ranges no queue can hold.
    pub fn new(samples: &'a Image<f32, C>) -> Self {
        let diagonal = (0..C)
            .map(|c| {
                samples
                    .min_max(c)
                    .map(|(lo, hi)| (hi - lo) as f64)
                    .unwrap_or(0.0)
            })
            .map(|range| range * range)
            .sum::<f64>()
            .sqrt();

        let max_weight = if samples.num_voxels() == 0 {
            0
        } else {
            (diagonal.round() as u32).saturating_add(1)
        };

        Self {
            samples,
            trees: vec![TreeStats::new(); samples.num_voxels()],
            max_weight,
        }
    }

    /// Statistics of the tree rooted at `root`.
    pub fn tree_stats(&self, root: usize) -> &TreeStats<C> {
        &self.trees[root]
    }

    /// Current mean of the tree rooted at `root`.
    pub fn tree_mean(&self, root: usize) -> Option<[f64; C]> {
        self.trees[root].mean()
    }
}

impl<const C: usize> ArcWeight for DynamicTreeWeight<'_, C> {
    fn size(&self) -> ImageSize {
        self.samples.size()
    }

    fn max_weight(&self) -> u32 {
        self.max_weight
    }

    fn on_finalize(&mut self, p: usize, root: usize) {
        self.trees[root].push(self.samples.pixel(p));
    }

    fn weight(&self, _p: usize, q: usize, root: usize) -> u32 {
        let Some(mean) = self.trees[root].mean() else {
            return 0;
        };

        let dist2 = self
            .samples
            .pixel(q)
            .iter()
            .zip(mean.iter())
            .map(|(&v, &m)| {
                let d = v as f64 - m;
                d * d
            })
            .sum::<f64>();

        dist2.sqrt().round() as u32
    }
}
