use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageReader, Limits};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{MAX_IMAGE_BYTES, MAX_OUTPUT_DIMENSION};

pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Error)]
pub enum ImageProcessingError {
    #[error("failed to decode image: {source}")]
    Decode {
        #[from]
        source: image::ImageError,
    },

    #[error("jpeg encoding failed: width={width}, height={height}, reason={reason}")]
    Encode {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("image too large: {width}x{height} = {pixels} pixels, max {max_pixels}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },

    #[error("input too large: {size} bytes, max {max_size}")]
    InputTooLarge { size: usize, max_size: usize },

    #[error("input bytes empty")]
    EmptyInput,

    #[error("declared type '{mime}' is not an image")]
    NotAnImage { mime: String },

    #[error("unsupported image format")]
    UnsupportedFormat,
}

#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    pub max_image_pixels: u64,
    pub max_input_bytes: usize,
    pub max_alloc_bytes: u64,
    pub max_dimension: u32,
    /// Longest side of the attached image; smaller images are kept as-is.
    pub max_output_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_image_pixels: 40_000_000,
            max_input_bytes: MAX_IMAGE_BYTES,
            max_alloc_bytes: 256 * 1024 * 1024,
            max_dimension: 10_000,
            max_output_dimension: MAX_OUTPUT_DIMENSION,
            jpeg_quality: 70,
        }
    }
}

/// A re-encoded image ready to embed in a review.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ImageProcessor {
    config: ProcessingConfig,
}

impl ImageProcessor {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ProcessingConfig::default())
    }

    /// Turns user-supplied bytes into a bounded JPEG data URL.
    ///
    /// `declared_mime` is what the picker reported; when present it must be
    /// an `image/*` type. The content itself is always sniffed.
    #[instrument(skip(self, raw_bytes), fields(input_size = raw_bytes.len()))]
    pub fn prepare_attachment(
        &self,
        raw_bytes: &[u8],
        declared_mime: Option<&str>,
    ) -> Result<EncodedImage, ImageProcessingError> {
        let result = self.prepare_attachment_inner(raw_bytes, declared_mime);
        match &result {
            Ok(encoded) => debug!(
                width = encoded.width,
                height = encoded.height,
                output_size = encoded.data_url.len(),
                "image attached"
            ),
            Err(e) => warn!(error = %e, "image rejected"),
        }
        result
    }

    fn prepare_attachment_inner(
        &self,
        raw_bytes: &[u8],
        declared_mime: Option<&str>,
    ) -> Result<EncodedImage, ImageProcessingError> {
        if let Some(mime) = declared_mime {
            check_declared_mime(mime)?;
        }

        let img = decode_image(&self.config, raw_bytes)?;
        let bounded = fit_within(img, self.config.max_output_dimension);
        let (width, height) = bounded.dimensions();
        let jpeg = encode_jpeg(&bounded, self.config.jpeg_quality)?;

        Ok(EncodedImage {
            data_url: format!("{JPEG_DATA_URL_PREFIX}{}", STANDARD.encode(jpeg)),
            width,
            height,
        })
    }
}

fn check_declared_mime(mime: &str) -> Result<(), ImageProcessingError> {
    let normalized = mime.trim().to_ascii_lowercase();
    if !normalized.starts_with("image/") {
        return Err(ImageProcessingError::NotAnImage {
            mime: mime.to_string(),
        });
    }
    Ok(())
}

/// Downscales so neither side exceeds `max_side`, keeping the aspect ratio.
fn fit_within(img: DynamicImage, max_side: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max_side && h <= max_side {
        return img;
    }
    img.resize(max_side, max_side, FilterType::Triangle)
}

fn decode_image(
    config: &ProcessingConfig,
    raw_bytes: &[u8],
) -> Result<DynamicImage, ImageProcessingError> {
    if raw_bytes.is_empty() {
        return Err(ImageProcessingError::EmptyInput);
    }

    if raw_bytes.len() > config.max_input_bytes {
        return Err(ImageProcessingError::InputTooLarge {
            size: raw_bytes.len(),
            max_size: config.max_input_bytes,
        });
    }

    let mut reader = ImageReader::new(Cursor::new(raw_bytes))
        .with_guessed_format()
        .map_err(|e| ImageProcessingError::Decode { source: e.into() })?;

    if reader.format().is_none() {
        return Err(ImageProcessingError::UnsupportedFormat);
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(config.max_dimension);
    limits.max_image_height = Some(config.max_dimension);
    limits.max_alloc = Some(config.max_alloc_bytes);
    reader.limits(limits);

    let img = reader.decode()?;
    let (w, h) = img.dimensions();
    let pixels = u64::from(w) * u64::from(h);

    if pixels > config.max_image_pixels {
        return Err(ImageProcessingError::ImageTooLarge {
            width: w,
            height: h,
            pixels,
            max_pixels: config.max_image_pixels,
        });
    }

    Ok(img)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageProcessingError> {
    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    if width == 0 || height == 0 {
        return Err(ImageProcessingError::Encode {
            width,
            height,
            reason: "zero dimension".into(),
        });
    }

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ImageProcessingError::Encode {
            width,
            height,
            reason: e.to_string(),
        })?;

    if buffer.len() < 3 || buffer[0..3] != [0xFF, 0xD8, 0xFF] {
        return Err(ImageProcessingError::Encode {
            width,
            height,
            reason: "invalid jpeg magic bytes".into(),
        });
    }

    Ok(buffer)
}
