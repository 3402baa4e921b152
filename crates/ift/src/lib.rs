#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use ift_image as image;

#[doc(inline)]
pub use ift_imgproc as imgproc;
