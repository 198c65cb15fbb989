//! Re-encode raster images between PNG, JPEG, WebP and GIF.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};
use webp::Encoder as WebpEncoder;

use crate::error::{Error, Result};

/// Quality used for lossy targets when the caller has no preference
pub const DEFAULT_IMAGE_QUALITY: f32 = 0.92;

/// Target formats for conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageFormat {
    pub const ALL: [Self; 4] = [Self::Png, Self::Jpeg, Self::Webp, Self::Gif];

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// File extension for converted output
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    /// Whether the quality setting applies
    pub const fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::Webp)
    }

    /// Sniff the format of encoded image bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::Webp),
            image::ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Webp => "WebP",
            Self::Gif => "GIF",
        };
        f.write_str(label)
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            "gif" => Ok(Self::Gif),
            other => Err(format!("unsupported image format '{other}' (expected png, jpeg, webp or gif)")),
        }
    }
}

/// Decode `bytes` and encode the first frame as `format`.
///
/// `quality` runs from 0.10 to 1.00 and only affects JPEG and WebP.
/// JPEG has no alpha channel, so transparent pixels land on white.
pub fn convert_image(bytes: &[u8], format: ImageFormat, quality: f32) -> Result<Vec<u8>> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| Error::ImageDecode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let quality = clamp_quality(quality);

    match format {
        ImageFormat::Png => write_with_image(rgba, image::ImageFormat::Png),
        ImageFormat::Gif => write_with_image(rgba, image::ImageFormat::Gif),
        ImageFormat::Jpeg => encode_jpeg(&flatten_on_white(&rgba), quality),
        ImageFormat::Webp => {
            let encoded =
                WebpEncoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()).encode(quality * 100.0);
            Ok(encoded.to_vec())
        }
    }
}

/// `<name without extension>.<ext>`, or `converted-image.<ext>` when blank.
pub fn converted_file_name(file_name: &str, format: ImageFormat) -> String {
    let trimmed = file_name.trim();
    let stem = trimmed
        .rsplit_once('.')
        .map_or(trimmed, |(stem, _)| stem)
        .trim();
    let stem = if stem.is_empty() { "converted-image" } else { stem };
    format!("{stem}.{}", format.extension())
}

fn clamp_quality(quality: f32) -> f32 {
    if quality.is_finite() {
        quality.clamp(0.1, 1.0)
    } else {
        DEFAULT_IMAGE_QUALITY
    }
}

fn write_with_image(rgba: RgbaImage, format: image::ImageFormat) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(rgba)
        .write_to(&mut out, format)
        .map_err(|e| Error::ImageEncode(e.to_string()))?;
    Ok(out.into_inner())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_jpeg(rgb: &RgbImage, quality: f32) -> Result<Vec<u8>> {
    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| Error::ImageEncode(e.to_string()))?;
    Ok(jpeg)
}

/// Composite straight-alpha RGBA over white.
#[allow(clippy::cast_possible_truncation)]
fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| {
            let c = u32::from(c);
            let a = u32::from(a);
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn sample_png() -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(6, 4, Rgba([30, 120, 200, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        write_with_image(img, image::ImageFormat::Png).unwrap()
    }

    #[test]
    fn test_convert_to_every_format() {
        let png = sample_png();
        for format in ImageFormat::ALL {
            let out = convert_image(&png, format, DEFAULT_IMAGE_QUALITY).unwrap();
            assert_eq!(ImageFormat::detect(&out), Some(format), "{format}");

            let decoded = image::load_from_memory(&out).unwrap();
            assert_eq!(decoded.dimensions(), (6, 4));
        }
    }

    #[test]
    fn test_flatten_on_white() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([200, 10, 10, 255]));
        img.put_pixel(2, 0, Rgba([0, 0, 0, 128]));

        let rgb = flatten_on_white(&img);
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [200, 10, 10]);
        assert_eq!(rgb.get_pixel(2, 0).0, [127, 127, 127]);
    }

    #[test]
    fn test_png_keeps_alpha() {
        let png = convert_image(&sample_png(), ImageFormat::Png, 0.5).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
        assert_eq!(decoded.get_pixel(1, 0).0, [30, 120, 200, 255]);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn test_lower_quality_gives_smaller_jpeg() {
        let img = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255])
        });
        let png = write_with_image(img, image::ImageFormat::Png).unwrap();

        let high = convert_image(&png, ImageFormat::Jpeg, 0.95).unwrap();
        let low = convert_image(&png, ImageFormat::Jpeg, 0.1).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_undecodable_input() {
        let err = convert_image(b"not an image", ImageFormat::Png, DEFAULT_IMAGE_QUALITY).unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }

    #[test]
    fn test_quality_clamp() {
        assert!((clamp_quality(0.0) - 0.1).abs() < f32::EPSILON);
        assert!((clamp_quality(4.0) - 1.0).abs() < f32::EPSILON);
        assert!((clamp_quality(f32::NAN) - DEFAULT_IMAGE_QUALITY).abs() < f32::EPSILON);
    }

    #[test]
    fn test_converted_file_name() {
        assert_eq!(converted_file_name("holiday.png", ImageFormat::Jpeg), "holiday.jpg");
        assert_eq!(converted_file_name("scan.v2.gif", ImageFormat::Webp), "scan.v2.webp");
        assert_eq!(converted_file_name("noext", ImageFormat::Gif), "noext.gif");
        assert_eq!(converted_file_name(".png", ImageFormat::Png), "converted-image.png");
        assert_eq!(converted_file_name("  ", ImageFormat::Png), "converted-image.png");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JPG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("webp".parse::<ImageFormat>().unwrap(), ImageFormat::Webp);
        assert!("bmp".parse::<ImageFormat>().is_err());
        assert!(ImageFormat::Webp.is_lossy());
        assert!(!ImageFormat::Gif.is_lossy());
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
    }
}
