//! CPU-side textures.
//!
//! A [`Texture`] keeps the decoded RGBA pixels plus a [`ResourceHandle`]. The
//! renderer uploads the pixels on first use and frees the GPU copy once the
//! handle is disposed.

use std::sync::Arc;

use image::{GenericImageView, ImageFormat, RgbaImage, load_from_memory_with_format};

use crate::{
    error::Result,
    resources::{ResourceHandle, ResourceKind, ResourceTracker},
};

#[derive(Debug)]
pub struct Texture {
    pub label: String,
    pub handle: ResourceHandle,
    pub image: Arc<RgbaImage>,
    /// Normal maps are stored linear, colour maps as sRGB.
    pub is_normal_map: bool,
}

impl Texture {
    /// Format used for the GPU copy of colour textures.
    pub const COLOUR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Decode raw image file data (PNG, JPEG, ...).
    ///
    /// `format` is an optional extension hint such as `"png"`; without it the
    /// format is guessed from the bytes.
    pub fn from_bytes(
        tracker: &ResourceTracker,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Ok(Self::from_image(tracker, &img, label, is_normal_map))
    }

    pub fn from_image(
        tracker: &ResourceTracker,
        img: &image::DynamicImage,
        label: &str,
        is_normal_map: bool,
    ) -> Self {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            log::warn!("texture {label} has no pixels");
        }
        Self {
            label: label.to_string(),
            handle: tracker.register(ResourceKind::Texture),
            image: Arc::new(img.to_rgba8()),
            is_normal_map,
        }
    }

    /// A one-coloured texture, e.g. the white fallback for materials without a base map.
    pub fn solid(tracker: &ResourceTracker, rgba: [u8; 4], label: &str) -> Self {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba(rgba));
        Self {
            label: label.to_string(),
            handle: tracker.register(ResourceKind::Texture),
            image: Arc::new(image),
            is_normal_map: false,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn dispose(&self) -> bool {
        self.handle.dispose()
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        if self.is_normal_map {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            Self::COLOUR_FORMAT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_bytes() {
        let tracker = ResourceTracker::new();
        let img = image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            2,
            3,
            image::Rgba([10, 20, 30, 255]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let texture = Texture::from_bytes(&tracker, &bytes, "tiny", Some("png"), false).unwrap();
        assert_eq!(texture.dimensions(), (2, 3));
        assert_eq!(texture.format(), Texture::COLOUR_FORMAT);
        assert_eq!(tracker.info().textures, 1);
    }

    #[test]
    fn garbage_bytes_fail_without_registering() {
        let tracker = ResourceTracker::new();
        let result = Texture::from_bytes(&tracker, b"not an image", "bad", None, false);
        assert!(result.is_err());
        assert_eq!(tracker.info().textures, 0);
    }

    #[test]
    fn normal_maps_are_linear() {
        let tracker = ResourceTracker::new();
        let img = image::DynamicImage::new_rgba8(1, 1);
        let texture = Texture::from_image(&tracker, &img, "normal", true);
        assert_eq!(texture.format(), wgpu::TextureFormat::Rgba8Unorm);
    }
}
