//! JPEG2000 to PNG recompression and raw-sample image construction.

use crate::{Error, Result};
use hayro_jpeg2000::{DecodeSettings, Image as Jp2Image};
use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Decode a JPEG2000 payload and re-encode it as PNG.
///
/// RGBA images lose their alpha channel (plain mode conversion, no
/// compositing against a background).
pub fn jp2_to_png(data: &[u8]) -> Result<Vec<u8>> {
    let image = decode_jp2(data)?;
    encode_png(&drop_alpha(image))
}

/// Convert a JPEG2000 file on disk to PNG, overwriting it in place.
pub fn convert_jp2_file(path: &Path) -> Result<()> {
    let data = std::fs::read(path)?;
    let png = jp2_to_png(&data)?;
    std::fs::write(path, png)?;
    Ok(())
}

/// Decode a JPEG2000 codestream or JP2 file into an 8-bit image.
pub fn decode_jp2(data: &[u8]) -> Result<DynamicImage> {
    let image = Jp2Image::new(data, &DecodeSettings::default())
        .map_err(|e| Error::ImageDecode(format!("JPEG2000 header: {:?}", e)))?;

    let width = image.width();
    let height = image.height();
    let has_alpha = image.has_alpha();
    let channels = usize::from(image.color_space().num_channels()) + usize::from(has_alpha);

    let pixels = image
        .decode()
        .map_err(|e| Error::ImageDecode(format!("JPEG2000 pixels: {:?}", e)))?;

    from_samples(width, height, channels, has_alpha, pixels)
}

/// Build an image from interleaved 8-bit samples.
///
/// The buffer must hold exactly `width * height * channels` bytes. Four
/// channels without alpha are treated as CMYK and converted to RGB.
pub fn from_samples(
    width: u32,
    height: u32,
    channels: usize,
    has_alpha: bool,
    samples: Vec<u8>,
) -> Result<DynamicImage> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(channels));
    if expected != Some(samples.len()) {
        return Err(Error::ImageDecode(format!(
            "{} sample bytes do not match {}x{}x{}",
            samples.len(),
            width,
            height,
            channels
        )));
    }

    let image = match (channels, has_alpha) {
        (1, _) => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        (2, _) => {
            GrayAlphaImage::from_raw(width, height, samples).map(DynamicImage::ImageLumaA8)
        }
        (3, _) => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        (4, true) => RgbaImage::from_raw(width, height, samples).map(DynamicImage::ImageRgba8),
        (4, false) => {
            RgbImage::from_raw(width, height, cmyk_to_rgb(&samples)).map(DynamicImage::ImageRgb8)
        }
        _ => {
            return Err(Error::ImageDecode(format!(
                "unsupported channel count: {}",
                channels
            )))
        }
    };

    image.ok_or_else(|| {
        Error::ImageDecode(format!(
            "sample buffer does not match {}x{}x{}",
            width, height, channels
        ))
    })
}

/// Discard the alpha channel of RGBA images; other modes pass through.
pub fn drop_alpha(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgba8(_) | DynamicImage::ImageRgba16(_) => {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
        other => other,
    }
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::ImageEncode(format!("PNG: {}", e)))?;
    Ok(png)
}

/// Convert CMYK bytes to RGB.
#[allow(clippy::many_single_char_names)]
fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((cmyk.len() / 4) * 3);
    for chunk in cmyk.chunks_exact(4) {
        let k = 255 - u16::from(chunk[3]);
        for &c in &chunk[..3] {
            rgb.push((((255 - u16::from(c)) * k) / 255) as u8);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, GenericImageView};

    const RGB_JP2: &[u8] = include_bytes!("../../../testdata/rgb.jp2");
    const RGBA_JP2: &[u8] = include_bytes!("../../../testdata/rgba.jp2");
    const GRAY_JP2: &[u8] = include_bytes!("../../../testdata/gray.jp2");
    const RGB_J2K: &[u8] = include_bytes!("../../../testdata/rgb.j2k");

    #[test]
    fn test_from_samples_by_channel_count() {
        let gray = from_samples(2, 1, 1, false, vec![0, 255]).unwrap();
        assert_eq!(gray.color(), ColorType::L8);

        let rgb = from_samples(1, 1, 3, false, vec![1, 2, 3]).unwrap();
        assert_eq!(rgb.color(), ColorType::Rgb8);

        let rgba = from_samples(1, 1, 4, true, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(rgba.color(), ColorType::Rgba8);

        let cmyk = from_samples(1, 1, 4, false, vec![0, 0, 0, 0]).unwrap();
        assert_eq!(cmyk.color(), ColorType::Rgb8);
        assert_eq!(cmyk.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_from_samples_rejects_short_buffer() {
        let result = from_samples(4, 4, 3, false, vec![0; 10]);
        assert!(matches!(result, Err(Error::ImageDecode(_))));

        let result = from_samples(1, 1, 5, false, vec![0; 5]);
        assert!(matches!(result, Err(Error::ImageDecode(_))));
    }

    #[test]
    fn test_from_samples_rejects_long_buffer() {
        // Two bytes too many for a 2x2 RGB image
        let result = from_samples(2, 2, 3, false, vec![0; 14]);
        assert!(matches!(result, Err(Error::ImageDecode(_))));

        let result = from_samples(1, 1, 4, false, vec![0; 8]);
        assert!(matches!(result, Err(Error::ImageDecode(_))));
    }

    #[test]
    fn test_drop_alpha_discards_channel_without_compositing() {
        let rgba = from_samples(1, 1, 4, true, vec![10, 20, 30, 0]).unwrap();
        let flat = drop_alpha(rgba);

        assert_eq!(flat.color(), ColorType::Rgb8);
        // Fully transparent pixel keeps its colour rather than a background
        assert_eq!(flat.to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_drop_alpha_keeps_other_modes() {
        let gray_alpha = from_samples(1, 1, 2, true, vec![5, 6]).unwrap();
        assert_eq!(drop_alpha(gray_alpha).color(), ColorType::La8);
    }

    #[test]
    fn test_encode_png_preserves_dimensions() {
        let image = from_samples(3, 2, 4, true, vec![200; 3 * 2 * 4]).unwrap();
        let png = encode_png(&drop_alpha(image)).unwrap();

        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_jp2_to_png_preserves_dimensions() {
        let cases: [(&[u8], (u32, u32), ColorType); 4] = [
            (RGB_JP2, (7, 4), ColorType::Rgb8),
            (RGBA_JP2, (5, 3), ColorType::Rgb8),
            (GRAY_JP2, (4, 4), ColorType::L8),
            (RGB_J2K, (6, 2), ColorType::Rgb8),
        ];

        for (data, dimensions, color) in cases {
            let png = jp2_to_png(data).unwrap();
            let decoded = image::load_from_memory(&png).unwrap();
            assert_eq!(decoded.dimensions(), dimensions);
            assert_eq!(decoded.color(), color);
        }
    }

    #[test]
    fn test_decode_jp2_reports_alpha_before_flattening() {
        let image = decode_jp2(RGBA_JP2).unwrap();
        assert_eq!(image.color(), ColorType::Rgba8);
        assert_eq!(drop_alpha(image).color(), ColorType::Rgb8);
    }

    #[test]
    fn test_convert_jp2_file_rewrites_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picture.jp2");
        std::fs::write(&path, RGB_JP2).unwrap();

        convert_jp2_file(&path).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.dimensions(), (7, 4));
    }

    #[test]
    fn test_jp2_to_png_rejects_corrupt_input() {
        let result = jp2_to_png(b"definitely not a jpeg2000 stream");
        assert!(matches!(result, Err(Error::ImageDecode(_))));
    }

    #[test]
    fn test_convert_jp2_file_leaves_corrupt_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jp2");
        std::fs::write(&path, b"garbage").unwrap();

        assert!(convert_jp2_file(&path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"garbage");
    }
}
