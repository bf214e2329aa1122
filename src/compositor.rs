//! Deterministic glasses compositing
//!
//! The fallback used when the external generator is unconfigured or failing.
//! Glasses are resized to 60% of the face width and anchored at the top
//! quarter of the face image. The placement is a fixed heuristic, applied
//! unconditionally; there is no face detection.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage, imageops};
use tracing::debug;

use crate::constants::{GLASSES_TOP_RATIO, GLASSES_WIDTH_RATIO, JPEG_QUALITY};
use crate::error::GlassifyError;
use crate::store::ImageStore;

/// Resized glasses dimensions and their placement on the face raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlassesGeometry {
    /// Target glasses width, 60% of the face width.
    pub width: u32,
    /// Target glasses height, preserving the glasses aspect ratio.
    pub height: u32,
    /// Horizontal offset centering the glasses on the face.
    pub x: i64,
    /// Vertical offset, 25% of the face height.
    pub y: i64,
}

/// Computes the resize target and placement offset for the glasses.
pub fn glasses_geometry(
    face_width: u32,
    face_height: u32,
    glasses_width: u32,
    glasses_height: u32,
) -> Result<GlassesGeometry, GlassifyError> {
    if face_width == 0 || face_height == 0 || glasses_width == 0 || glasses_height == 0 {
        return Err(GlassifyError::CompositingFailed(
            "zero-sized input raster".to_string(),
        ));
    }

    let width = (f64::from(face_width) * GLASSES_WIDTH_RATIO).round() as u32;
    let height = (f64::from(width) * f64::from(glasses_height) / f64::from(glasses_width)).round()
        as u32;
    if width == 0 || height == 0 {
        return Err(GlassifyError::CompositingFailed(
            "glasses resize target collapsed to zero".to_string(),
        ));
    }

    Ok(GlassesGeometry {
        width,
        height,
        x: (i64::from(face_width) - i64::from(width)) / 2,
        y: (f64::from(face_height) * GLASSES_TOP_RATIO).round() as i64,
    })
}

/// Composites the glasses onto a copy of the face raster.
///
/// Glasses with an alpha channel are alpha-blended: fully transparent pixels
/// leave the face pixel unchanged, fully opaque ones replace it. Glasses
/// without alpha overwrite the destination region outright, margin padding
/// included. The output always has the face's exact dimensions.
pub fn composite(
    face: &DynamicImage,
    glasses: &DynamicImage,
) -> Result<RgbImage, GlassifyError> {
    let face_rgb = face.to_rgb8();
    let glasses_rgba = glasses.to_rgba8();
    let geometry = glasses_geometry(
        face_rgb.width(),
        face_rgb.height(),
        glasses_rgba.width(),
        glasses_rgba.height(),
    )?;
    let resized = imageops::resize(
        &glasses_rgba,
        geometry.width,
        geometry.height,
        FilterType::Lanczos3,
    );

    if glasses.color().has_alpha() {
        let mut canvas = face.to_rgba8();
        imageops::overlay(&mut canvas, &resized, geometry.x, geometry.y);
        Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
    } else {
        let mut canvas = face_rgb;
        let resized_rgb = DynamicImage::ImageRgba8(resized).to_rgb8();
        imageops::replace(&mut canvas, &resized_rgb, geometry.x, geometry.y);
        Ok(canvas)
    }
}

/// Encodes a raster as quality-95 JPEG, fully in memory.
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, GlassifyError> {
    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
    encoder
        .encode_image(image)
        .map_err(|err| GlassifyError::CompositingFailed(err.to_string()))?;
    Ok(output)
}

fn load_image(path: &Path) -> Result<DynamicImage, GlassifyError> {
    image::ImageReader::open(path)
        .map_err(|err| GlassifyError::CompositingFailed(err.to_string()))?
        .with_guessed_format()
        .map_err(|err| GlassifyError::CompositingFailed(err.to_string()))?
        .decode()
        .map_err(|err| GlassifyError::CompositingFailed(err.to_string()))
}

/// Loads both rasters, composites, and persists the result as JPEG under a
/// fresh name. The file is only written after encoding succeeds, so a
/// failure never leaves a partial result behind. Returns the filename.
pub async fn composite_to_store(
    store: &ImageStore,
    face_path: &Path,
    glasses_path: &Path,
) -> Result<String, GlassifyError> {
    let face = load_image(face_path)?;
    let glasses = load_image(glasses_path)?;

    let result = composite(&face, &glasses)?;
    let encoded = encode_jpeg(&result)?;

    let (result_path, filename) = store.fresh_result_path("jpg");
    tokio::fs::write(&result_path, encoded)
        .await
        .map_err(|err| GlassifyError::CompositingFailed(err.to_string()))?;
    debug!("Composited result saved to {}", result_path.display());
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    const FACE_COLOUR: Rgb<u8> = Rgb([10, 200, 60]);

    fn solid_face(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, FACE_COLOUR))
    }

    #[test]
    fn geometry_matches_fixed_ratios() {
        let geometry = glasses_geometry(200, 100, 50, 20).expect("geometry");
        assert_eq!(geometry.width, 120);
        assert_eq!(geometry.height, 48);
        assert_eq!(geometry.x, 40);
        assert_eq!(geometry.y, 25);
    }

    #[test]
    fn geometry_rounds_rather_than_truncates() {
        let geometry = glasses_geometry(333, 101, 100, 100).expect("geometry");
        // 333 * 0.6 = 199.8 rounds up, 101 * 0.25 = 25.25 rounds down.
        assert_eq!(geometry.width, 200);
        assert_eq!(geometry.y, 25);
    }

    #[test]
    fn geometry_rejects_zero_sized_inputs() {
        assert!(matches!(
            glasses_geometry(0, 100, 50, 20),
            Err(GlassifyError::CompositingFailed(_))
        ));
        assert!(matches!(
            glasses_geometry(100, 100, 0, 20),
            Err(GlassifyError::CompositingFailed(_))
        ));
    }

    #[test]
    fn geometry_rejects_collapsed_resize_target() {
        // Extremely wide glasses round to a zero-pixel height.
        assert!(matches!(
            glasses_geometry(10, 10, 1000, 1),
            Err(GlassifyError::CompositingFailed(_))
        ));
    }

    #[test]
    fn output_keeps_face_dimensions() {
        let face = solid_face(101, 67);
        let glasses = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            40,
            15,
            Rgba([0, 0, 0, 255]),
        ));
        let result = composite(&face, &glasses).expect("composite");
        assert_eq!((result.width(), result.height()), (101, 67));
    }

    #[test]
    fn transparent_glasses_leave_face_untouched() {
        let face = solid_face(100, 100);
        let glasses =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 25, Rgba([255, 0, 0, 0])));
        let result = composite(&face, &glasses).expect("composite");
        for pixel in result.pixels() {
            assert_eq!(*pixel, FACE_COLOUR);
        }
    }

    #[test]
    fn opaque_glasses_pixels_replace_face_pixels() {
        let face = solid_face(100, 100);
        let glasses =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 25, Rgba([255, 0, 0, 255])));
        let result = composite(&face, &glasses).expect("composite");

        // Target region: 60x30 anchored at (20, 25).
        assert_eq!(*result.get_pixel(50, 40), Rgb([255, 0, 0]));
        assert_eq!(*result.get_pixel(20, 25), Rgb([255, 0, 0]));
        assert_eq!(*result.get_pixel(79, 54), Rgb([255, 0, 0]));
        // Outside the region the face is untouched.
        assert_eq!(*result.get_pixel(10, 10), FACE_COLOUR);
        assert_eq!(*result.get_pixel(50, 90), FACE_COLOUR);
        assert_eq!(*result.get_pixel(19, 40), FACE_COLOUR);
    }

    #[test]
    fn alpha_free_glasses_overwrite_the_region() {
        let face = solid_face(100, 100);
        let glasses =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 25, Rgb([255, 255, 255])));
        let result = composite(&face, &glasses).expect("composite");

        assert_eq!(*result.get_pixel(50, 40), Rgb([255, 255, 255]));
        assert_eq!(*result.get_pixel(10, 10), FACE_COLOUR);
    }

    #[tokio::test]
    async fn composite_to_store_persists_a_jpeg_result() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(tmp.path());
        store.ensure_dirs().await.expect("create dirs");

        let face_path = tmp.path().join("face.png");
        solid_face(100, 100).save(&face_path).expect("save face");
        let glasses_path = tmp.path().join("glasses.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 25, Rgba([0, 0, 0, 255])))
            .save(&glasses_path)
            .expect("save glasses");

        let filename = composite_to_store(&store, &face_path, &glasses_path)
            .await
            .expect("composite");
        assert!(filename.ends_with(".jpg"));

        let result_path = store
            .dir_for(crate::store::ImageRole::Result)
            .join(&filename);
        let dimensions = image::ImageReader::open(&result_path)
            .expect("open result")
            .with_guessed_format()
            .expect("sniff result")
            .into_dimensions()
            .expect("read result dimensions");
        assert_eq!(dimensions, (100, 100));
    }

    #[tokio::test]
    async fn corrupt_face_file_is_compositing_failed() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(tmp.path());
        store.ensure_dirs().await.expect("create dirs");

        let face_path = tmp.path().join("face.jpg");
        std::fs::write(&face_path, b"not an image").expect("write");
        let glasses_path = tmp.path().join("glasses.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])))
            .save(&glasses_path)
            .expect("save glasses");

        let err = composite_to_store(&store, &face_path, &glasses_path)
            .await
            .expect_err("corrupt face must fail");
        assert!(matches!(err, GlassifyError::CompositingFailed(_)));

        // No partial result file was written.
        let mut entries =
            std::fs::read_dir(store.dir_for(crate::store::ImageRole::Result)).expect("read dir");
        assert!(entries.next().is_none());
    }
}
