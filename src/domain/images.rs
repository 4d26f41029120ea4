//! Validation for images attached to posts.

use image::ImageFormat;
use imagesize::{ImageError, ImageType};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageValidationError {
    #[error("uploaded file is empty")]
    Empty,
    #[error("uploaded file is not a supported image")]
    Unsupported,
    #[error("uploaded image is corrupted")]
    Corrupted,
}

impl ImageValidationError {
    /// Field-level message shown next to the image input.
    pub fn field_message(&self) -> &'static str {
        match self {
            ImageValidationError::Empty => "The submitted file is empty.",
            ImageValidationError::Unsupported | ImageValidationError::Corrupted => {
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    pub extension: &'static str,
}

/// Probe the payload header, then decode the whole image so truncated or
/// damaged payloads are rejected along with non-images.
pub fn validate_image(bytes: &[u8]) -> Result<ImageInfo, ImageValidationError> {
    if bytes.is_empty() {
        return Err(ImageValidationError::Empty);
    }

    let kind = imagesize::image_type(bytes).map_err(map_image_error)?;
    let (format, extension) = decoder_for(kind).ok_or(ImageValidationError::Unsupported)?;
    let size = imagesize::blob_size(bytes).map_err(map_image_error)?;
    if size.width == 0 || size.height == 0 {
        return Err(ImageValidationError::Corrupted);
    }

    image::load_from_memory_with_format(bytes, format).map_err(map_decode_error)?;

    Ok(ImageInfo {
        width: size.width,
        height: size.height,
        extension,
    })
}

fn map_image_error(err: ImageError) -> ImageValidationError {
    match err {
        ImageError::NotSupported => ImageValidationError::Unsupported,
        ImageError::CorruptedImage | ImageError::IoError(_) => ImageValidationError::Corrupted,
    }
}

fn map_decode_error(err: image::ImageError) -> ImageValidationError {
    match err {
        image::ImageError::Unsupported(_) => ImageValidationError::Unsupported,
        _ => ImageValidationError::Corrupted,
    }
}

fn decoder_for(kind: ImageType) -> Option<(ImageFormat, &'static str)> {
    match kind {
        ImageType::Gif => Some((ImageFormat::Gif, "gif")),
        ImageType::Png => Some((ImageFormat::Png, "png")),
        ImageType::Jpeg => Some((ImageFormat::Jpeg, "jpg")),
        ImageType::Webp => Some((ImageFormat::WebP, "webp")),
        ImageType::Bmp => Some((ImageFormat::Bmp, "bmp")),
        _ => None,
    }
}
