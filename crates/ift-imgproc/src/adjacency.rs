use ift_image::{ImageSize, Voxel};

/// A set of relative voxel offsets approximating a disk or a sphere.
///
/// The first offset is always the voxel itself; the remaining offsets are
/// ordered by increasing distance, so `circular(1.5)` lists the four direct
/// neighbours before the diagonals. Operators that visit the neighbours of a
/// voxel skip index 0 (see [`AdjacencyRelation::neighbors`]).
#[derive(Clone, Debug, PartialEq)]
pub struct AdjacencyRelation {
    offsets: Vec<Voxel>,
}

impl AdjacencyRelation {
    /// Disk of the given radius in the xy plane.
    ///
    /// # Examples
    ///
    /// ```
    /// use ift_image::Voxel;
    /// use ift_imgproc::adjacency::AdjacencyRelation;
    ///
    /// let adj = AdjacencyRelation::circular(1.0);
    ///
    /// assert_eq!(adj.len(), 5);
    /// assert_eq!(adj.offset(0), Voxel::new(0, 0, 0));
    /// assert_eq!(adj.offset(1), Voxel::new(0, -1, 0));
    /// ```
    pub fn circular(radius: f32) -> Self {
        let r0 = radius as i32;
        let r2 = (radius * radius + 0.5) as i32;

        let mut offsets = Vec::new();
        for dy in -r0..=r0 {
            for dx in -r0..=r0 {
                if dx * dx + dy * dy <= r2 {
                    offsets.push(Voxel::new(dx, dy, 0));
                }
            }
        }

        Self::from_raster_offsets(offsets)
    }

    /// Sphere of the given radius.
    pub fn spherical(radius: f32) -> Self {
        let r0 = radius as i32;
        let r2 = (radius * radius + 0.5) as i32;

        let mut offsets = Vec::new();
        for dz in -r0..=r0 {
            for dy in -r0..=r0 {
                for dx in -r0..=r0 {
                    if dx * dx + dy * dy + dz * dz <= r2 {
                        offsets.push(Voxel::new(dx, dy, dz));
                    }
                }
            }
        }

        Self::from_raster_offsets(offsets)
    }

    /// Disk or sphere depending on whether the grid is planar.
    pub fn ball(size: ImageSize, radius: f32) -> Self {
        if size.is_3d() {
            Self::spherical(radius)
        } else {
            Self::circular(radius)
        }
    }

    /// 8-neighbourhood in 2-D and 26-neighbourhood in 3-D.
    pub fn default_for(size: ImageSize) -> Self {
        if size.is_3d() {
            Self::spherical(3f32.sqrt())
        } else {
            Self::circular(1.5)
        }
    }

    // moves the center offset to the front, then selection-sorts the rest by
    // squared norm; equal norms keep the order the sort leaves them in.
    fn from_raster_offsets(mut offsets: Vec<Voxel>) -> Self {
        if let Some(center) = offsets.iter().position(|v| v.norm_squared() == 0) {
            let self_offset = offsets.remove(center);
            offsets.insert(0, self_offset);
        }

        let n = offsets.len();
        for i in 1..n.saturating_sub(1) {
            let mut k = i;
            for j in (i + 1)..n {
                if offsets[j].norm_squared() < offsets[k].norm_squared() {
                    k = j;
                }
            }
            offsets.swap(i, k);
        }

        Self { offsets }
    }

    /// Number of offsets, including the center.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the relation has no offsets at all.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The `i`-th offset.
    pub fn offset(&self, i: usize) -> Voxel {
        self.offsets[i]
    }

    /// All offsets, center first.
    pub fn offsets(&self) -> &[Voxel] {
        &self.offsets
    }

    /// Iterate the absolute coordinates around `v`, excluding `v` itself.
    ///
    /// Coordinates outside the grid are not filtered out.
    pub fn neighbors(&self, v: Voxel) -> impl Iterator<Item = Voxel> + '_ {
        self.offsets.iter().skip(1).map(move |&d| v + d)
    }

    /// Euclidean length of every offset, center first.
    pub fn magnitudes(&self) -> Vec<f32> {
        self.offsets
            .iter()
            .map(|d| (d.norm_squared() as f32).sqrt())
            .collect()
    }
}
