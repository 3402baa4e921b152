use std::ops;

use crate::error::ImageError;

/// Image size in voxels
///
/// A struct to represent the size of a 2-D image or 3-D volume. Planar
/// images have a `depth` of one.
///
/// # Examples
///
/// ```
/// use ift_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
///   depth: 1,
/// };
///
/// assert_eq!(image_size.num_voxels(), 200);
/// assert!(!image_size.is_3d());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    /// Width of the image in voxels
    pub width: usize,
    /// Height of the image in voxels
    pub height: usize,
    /// Number of slices, one for planar images
    pub depth: usize,
}

impl ImageSize {
    /// Total number of voxels covered by the size.
    pub fn num_voxels(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Whether the size describes a volume with more than one slice.
    pub fn is_3d(&self) -> bool {
        self.depth > 1
    }

    /// Whether the coordinate lies inside the grid.
    pub fn is_valid_voxel(&self, v: Voxel) -> bool {
        v.x >= 0
            && v.y >= 0
            && v.z >= 0
            && (v.x as usize) < self.width
            && (v.y as usize) < self.height
            && (v.z as usize) < self.depth
    }

    /// The coordinate of the voxel at raster index `p`.
    pub fn voxel_coord(&self, p: usize) -> Voxel {
        let slice = self.width * self.height;
        let rem = p % slice;
        Voxel::new(
            (rem % self.width) as i32,
            (rem / self.width) as i32,
            (p / slice) as i32,
        )
    }

    /// The raster index of the voxel at coordinate `v`.
    ///
    /// The coordinate must satisfy [`ImageSize::is_valid_voxel`].
    pub fn voxel_index(&self, v: Voxel) -> usize {
        v.x as usize + v.y as usize * self.width + v.z as usize * self.width * self.height
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {}, depth: {} }}",
            self.width, self.height, self.depth
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
            depth: 1,
        }
    }
}

impl From<[usize; 3]> for ImageSize {
    fn from(size: [usize; 3]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
            depth: size[2],
        }
    }
}

/// A signed voxel coordinate.
///
/// Used both for absolute positions inside a grid and for relative offsets
/// of an adjacency relation, so the components may be negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Voxel {
    /// column
    pub x: i32,
    /// row
    pub y: i32,
    /// slice
    pub z: i32,
}

impl Voxel {
    /// Create a new voxel coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean norm of the coordinate seen as an offset.
    pub fn norm_squared(&self) -> i32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
}

impl ops::Add for Voxel {
    type Output = Voxel;

    fn add(self, rhs: Voxel) -> Voxel {
        Voxel::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Represents a dense image or volume with `C` channels per voxel.
///
/// The data is stored interleaved in raster order: the voxel at
/// `(x, y, z)` has index `p = x + y * width + z * width * height` and its
/// channels live at `data[p * C..(p + 1) * C]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const C: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const C: usize> Image<T, C> {
    /// Create a new image from voxel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in voxels.
    /// * `data` - The interleaved voxel data of the image.
    ///
    /// # Errors
    ///
    /// If the length of the data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use ift_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::new([10, 20].into(), vec![0u8; 10 * 20 * 3]).unwrap();
    ///
    /// assert_eq!(image.width(), 10);
    /// assert_eq!(image.height(), 20);
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        if data.len() != size.num_voxels() * C {
            return Err(ImageError::InvalidChannelShape(
                data.len(),
                size.num_voxels() * C,
            ));
        }

        Ok(Self { size, data })
    }

    /// Create a new image with the given size filled with a single value.
    ///
    /// # Examples
    ///
    /// ```
    /// use ift_image::{Image, ImageSize};
    ///
    /// let image = Image::<u32, 1>::from_size_val([4, 3, 2].into(), 7).unwrap();
    ///
    /// assert_eq!(image.num_voxels(), 24);
    /// assert!(image.as_slice().iter().all(|&v| v == 7));
    /// ```
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        Image::new(size, vec![val; size.num_voxels() * C])
    }

    /// The size of the image in voxels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// The width of the image in voxels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// The height of the image in voxels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// The number of slices of the image.
    pub fn depth(&self) -> usize {
        self.size.depth
    }

    /// Whether the image is a volume.
    pub fn is_3d(&self) -> bool {
        self.size.is_3d()
    }

    /// The number of voxels in the image.
    pub fn num_voxels(&self) -> usize {
        self.size.num_voxels()
    }

    /// The number of channels per voxel.
    pub fn num_channels(&self) -> usize {
        C
    }

    /// The raw interleaved data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The raw interleaved data, mutably.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the image and return its raw data.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// The channel values of the voxel at index `p`.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not a valid voxel index.
    pub fn pixel(&self, p: usize) -> &[T] {
        &self.data[p * C..(p + 1) * C]
    }

    /// The channel values of the voxel at index `p`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not a valid voxel index.
    pub fn pixel_mut(&mut self, p: usize) -> &mut [T] {
        &mut self.data[p * C..(p + 1) * C]
    }

    /// Get the channel values of the voxel at index `p`.
    ///
    /// # Errors
    ///
    /// Returns an error if `p` is out of bounds.
    pub fn get_pixel(&self, p: usize) -> Result<&[T], ImageError> {
        if p >= self.num_voxels() {
            return Err(ImageError::VoxelIndexOutOfBounds(p, self.num_voxels()));
        }
        Ok(self.pixel(p))
    }

    /// Whether the coordinate lies inside the image domain.
    pub fn is_valid_voxel(&self, v: Voxel) -> bool {
        self.size.is_valid_voxel(v)
    }

    /// The coordinate of the voxel at raster index `p`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ift_image::{Image, Voxel};
    ///
    /// let image = Image::<u8, 1>::from_size_val([4, 3, 2].into(), 0).unwrap();
    ///
    /// assert_eq!(image.voxel_coord(17), Voxel::new(1, 1, 1));
    /// assert_eq!(image.voxel_index(Voxel::new(1, 1, 1)), 17);
    /// ```
    pub fn voxel_coord(&self, p: usize) -> Voxel {
        self.size.voxel_coord(p)
    }

    /// The raster index of the voxel at coordinate `v`.
    ///
    /// The coordinate must satisfy [`Image::is_valid_voxel`].
    pub fn voxel_index(&self, v: Voxel) -> usize {
        self.size.voxel_index(v)
    }

    /// Extract a single channel as a new image.
    ///
    /// # Errors
    ///
    /// If the channel index is out of bounds, an error is returned.
    pub fn channel(&self, channel: usize) -> Result<Image<T, 1>, ImageError>
    where
        T: Clone,
    {
        if channel >= C {
            return Err(ImageError::ChannelIndexOutOfBounds(channel, C));
        }

        let channel_data = self
            .data
            .iter()
            .skip(channel)
            .step_by(C)
            .cloned()
            .collect();

        Image::new(self.size, channel_data)
    }

    /// Apply a function to every value and return the result as a new image.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Image<U, C> {
        Image {
            size: self.size,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Cast the voxel data of the image to a different type.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit in the target type.
    pub fn cast<U>(&self) -> Result<Image<U, C>, ImageError>
    where
        U: num_traits::NumCast,
        T: num_traits::NumCast + Copy,
    {
        let casted_data = self
            .data
            .iter()
            .map(|&x| U::from(x).ok_or(ImageError::CastError))
            .collect::<Result<Vec<U>, ImageError>>()?;

        Image::new(self.size, casted_data)
    }

    /// The minimum and maximum value of a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is out of bounds or the image is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use ift_image::Image;
    ///
    /// let image = Image::<f32, 2>::new([2, 1].into(), vec![1.0, -4.0, 3.0, 8.0]).unwrap();
    ///
    /// assert_eq!(image.min_max(0).unwrap(), (1.0, 3.0));
    /// assert_eq!(image.min_max(1).unwrap(), (-4.0, 8.0));
    /// ```
    pub fn min_max(&self, channel: usize) -> Result<(T, T), ImageError>
    where
        T: PartialOrd + Copy,
    {
        if channel >= C {
            return Err(ImageError::ChannelIndexOutOfBounds(channel, C));
        }

        let mut values = self.data.iter().skip(channel).step_by(C);
        let first = *values.next().ok_or(ImageError::EmptyImage)?;

        Ok(values.fold((first, first), |(lo, hi), &v| {
            (
                if v < lo { v } else { lo },
                if v > hi { v } else { hi },
            )
        }))
    }

    /// The minimum value of a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is out of bounds or the image is empty.
    pub fn min_value(&self, channel: usize) -> Result<T, ImageError>
    where
        T: PartialOrd + Copy,
    {
        Ok(self.min_max(channel)?.0)
    }

    /// The maximum value of a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is out of bounds or the image is empty.
    pub fn max_value(&self, channel: usize) -> Result<T, ImageError>
    where
        T: PartialOrd + Copy,
    {
        Ok(self.min_max(channel)?.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size() {
        let size = ImageSize::from([5, 4]);
        assert_eq!(size.depth, 1);
        assert_eq!(size.num_voxels(), 20);
        assert!(ImageSize::from([2, 2, 3]).is_3d());
        assert_eq!(
            size.to_string(),
            "ImageSize { width: 5, height: 4, depth: 1 }"
        );
    }

    #[test]
    fn image_smoke() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new([2, 3].into(), vec![0u8; 2 * 3 * 3])?;
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 3);
        assert_eq!(image.depth(), 1);
        assert_eq!(image.num_channels(), 3);
        assert_eq!(image.as_slice().len(), 18);
        Ok(())
    }

    #[test]
    fn image_invalid_length() {
        let res = Image::<u8, 3>::new([2, 3].into(), vec![0u8; 17]);
        assert_eq!(res, Err(ImageError::InvalidChannelShape(17, 18)));
    }

    #[test]
    fn image_pixel_access() -> Result<(), ImageError> {
        let mut image = Image::<u8, 2>::new([2, 2].into(), vec![0, 1, 2, 3, 4, 5, 6, 7])?;
        assert_eq!(image.pixel(2), &[4, 5]);
        image.pixel_mut(3)[1] = 42;
        assert_eq!(image.get_pixel(3)?, &[6, 42]);
        assert_eq!(
            image.get_pixel(4),
            Err(ImageError::VoxelIndexOutOfBounds(4, 4))
        );
        Ok(())
    }

    #[test]
    fn voxel_coord_roundtrip_3d() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([3, 4, 5].into(), 0)?;
        for p in 0..image.num_voxels() {
            let v = image.voxel_coord(p);
            assert!(image.is_valid_voxel(v));
            assert_eq!(image.voxel_index(v), p);
        }
        Ok(())
    }

    #[test]
    fn voxel_validity() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([3, 4].into(), 0)?;
        assert!(image.is_valid_voxel(Voxel::new(2, 3, 0)));
        assert!(!image.is_valid_voxel(Voxel::new(3, 0, 0)));
        assert!(!image.is_valid_voxel(Voxel::new(0, -1, 0)));
        assert!(!image.is_valid_voxel(Voxel::new(0, 0, 1)));
        Ok(())
    }

    #[test]
    fn voxel_add() {
        let v = Voxel::new(1, 2, 3) + Voxel::new(-1, 0, 2);
        assert_eq!(v, Voxel::new(0, 2, 5));
        assert_eq!(Voxel::new(1, -2, 2).norm_squared(), 9);
    }

    #[test]
    fn image_channel() -> Result<(), ImageError> {
        let image = Image::<u8, 2>::new([1, 2].into(), vec![0, 1, 2, 3])?;
        let channel = image.channel(1)?;
        assert_eq!(channel.num_channels(), 1);
        assert_eq!(channel.as_slice(), &[1, 3]);
        assert_eq!(
            image.channel(2),
            Err(ImageError::ChannelIndexOutOfBounds(2, 2))
        );
        Ok(())
    }

    #[test]
    fn image_cast() -> Result<(), ImageError> {
        let image = Image::<u32, 1>::new([3, 1].into(), vec![0, 128, 255])?;
        let casted = image.cast::<u8>()?;
        assert_eq!(casted.as_slice(), &[0u8, 128, 255]);

        let too_big = Image::<u32, 1>::new([1, 1].into(), vec![256])?;
        assert_eq!(too_big.cast::<u8>(), Err(ImageError::CastError));
        Ok(())
    }

    #[test]
    fn image_map_into_vec() -> Result<(), ImageError> {
        let image = Image::<u32, 1>::new([2, 2].into(), vec![0, 3, 0, 1])?;
        let mask = image.map(|&l| if l > 0 { u8::MAX } else { 0 });
        assert_eq!(mask.size(), image.size());
        assert_eq!(mask.into_vec(), vec![0, 255, 0, 255]);
        Ok(())
    }

    #[test]
    fn image_min_max_empty() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new([0, 0].into(), vec![])?;
        assert_eq!(image.max_value(0), Err(ImageError::EmptyImage));
        assert_eq!(image.min_value(0), Err(ImageError::EmptyImage));

        let image = Image::<u8, 2>::new([2, 1].into(), vec![4, 9, 2, 7])?;
        assert_eq!(image.min_value(0)?, 2);
        assert_eq!(image.max_value(1)?, 9);
        Ok(())
    }
}
