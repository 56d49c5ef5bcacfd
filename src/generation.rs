//! Prompt-to-image generation: request model, service seam, and the
//! "first image wins" persistence policy.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};

/// Output path used when none is given.
pub const DEFAULT_OUTPUT_PATH: &str = "generated_image.png";
/// Aspect ratio used when none is given.
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";
/// Image size used when none is given.
pub const DEFAULT_IMAGE_SIZE: &str = "2K";
/// Aspect ratios the generation service documents. Not enforced locally.
pub const ASPECT_RATIOS: [&str; 5] = ["1:1", "16:9", "9:16", "4:3", "3:4"];
/// Image sizes the generation service documents. Not enforced locally.
pub const IMAGE_SIZES: [&str; 3] = ["1K", "2K", "4K"];

/// A single prompt-to-image invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Text prompt sent to the model.
    pub prompt: String,
    /// Where the first returned image is written.
    pub output_path: PathBuf,
    /// Aspect ratio forwarded verbatim, e.g. `16:9`.
    pub aspect_ratio: String,
    /// Image size forwarded verbatim, e.g. `2K`.
    pub image_size: String,
    /// Optional image steering the generation. Ignored if the file is missing.
    pub reference_image: Option<PathBuf>,
}

impl GenerationRequest {
    /// Create a request for `prompt` with default output path, ratio and size.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            reference_image: None,
        }
    }

    /// Set the output path.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Set the aspect ratio.
    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    /// Set the image size.
    #[must_use]
    pub fn with_image_size(mut self, image_size: impl Into<String>) -> Self {
        self.image_size = image_size.into();
        self
    }

    /// Attach a reference image path.
    #[must_use]
    pub fn with_reference_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_image = Some(path.into());
        self
    }

    /// Load the reference image if one was given and it exists on disk.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or its format is unknown.
    pub fn load_reference_image(&self) -> Result<Option<ReferenceImage>> {
        let Some(path) = self.reference_image.as_deref() else {
            return Ok(None);
        };
        if !path.is_file() {
            log::warn!(
                "Reference image {} not found, generating from prompt only",
                path.display()
            );
            return Ok(None);
        }
        ReferenceImage::load(path).map(Some)
    }
}

/// Raw bytes of a reference image plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// MIME type such as `image/png`.
    pub mime_type: String,
    /// Encoded file contents.
    pub data: Vec<u8>,
}

impl ReferenceImage {
    /// Read a reference image, sniffing its format from content then extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading fails and [`Error::UnsupportedFormat`]
    /// if neither the content nor the extension names an image format.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let format = image::guess_format(&data)
            .or_else(|_| ImageFormat::from_path(path))
            .map_err(|_| Error::UnsupportedFormat(path.display().to_string()))?;
        Ok(Self {
            mime_type: format.to_mime_type().to_string(),
            data,
        })
    }
}

/// One element of a generation response, in the order the service returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// Commentary text from the model.
    Text(String),
    /// A decoded image artifact.
    Image {
        /// MIME type reported by the service.
        mime_type: String,
        /// Encoded image bytes.
        data: Vec<u8>,
    },
}

/// Ordered parts returned by the generation service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    /// Response parts in service order.
    pub parts: Vec<ResponsePart>,
}

/// A remote (or fake) multimodal generation backend.
pub trait ImageGenerationService {
    /// Submit one request and return the parts of the reply.
    ///
    /// # Errors
    ///
    /// Implementations fail on transport, API, or decoding errors.
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}

/// What a successful generation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Path the image was written to.
    pub saved_path: PathBuf,
    /// Every text part, in order.
    pub texts: Vec<String>,
}

/// Run one generation: call `service`, echo text parts to `out`, and persist
/// the first image part to `request.output_path`.
///
/// Later image parts are ignored. Text parts are echoed whether they come
/// before or after the image.
///
/// # Errors
///
/// Propagates service errors, returns [`Error::NoImageGenerated`] if the
/// response held no image, and I/O or codec errors from saving.
pub fn generate_image<S, W>(
    service: &S,
    request: &GenerationRequest,
    out: &mut W,
) -> Result<GenerationOutcome>
where
    S: ImageGenerationService + ?Sized,
    W: Write,
{
    log::info!(
        "Generating image (aspect ratio {}, size {})",
        request.aspect_ratio,
        request.image_size
    );
    let response = service.generate(request)?;
    log::debug!("Service returned {} part(s)", response.parts.len());

    let mut saved: Option<PathBuf> = None;
    let mut texts = Vec::new();

    for part in response.parts {
        match part {
            ResponsePart::Text(text) => {
                writeln!(out, "{text}")?;
                texts.push(text);
            }
            ResponsePart::Image { mime_type, data } => {
                if saved.is_some() {
                    log::debug!("Ignoring additional {mime_type} image part");
                    continue;
                }
                save_image_bytes(&data, Some(mime_type.as_str()), &request.output_path)?;
                writeln!(out, "Saved image: {}", request.output_path.display())?;
                saved = Some(request.output_path.clone());
            }
        }
    }

    match saved {
        Some(saved_path) => Ok(GenerationOutcome { saved_path, texts }),
        None => Err(Error::NoImageGenerated),
    }
}

/// Write encoded image bytes to `path`, creating parent directories.
///
/// Bytes are written verbatim when their format matches the one implied by
/// the path's extension, or when either side is unknown. Otherwise the image
/// is decoded and re-encoded into the extension's format. If that conversion
/// fails the original bytes are written instead, so a generated image is
/// never lost.
///
/// # Errors
///
/// Returns an error if directory creation or writing fails.
pub fn save_image_bytes(data: &[u8], mime_type: Option<&str>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let source = image::guess_format(data)
        .ok()
        .or_else(|| mime_type.and_then(ImageFormat::from_mime_type));
    let target = ImageFormat::from_path(path).ok();

    match (source, target) {
        (Some(src), Some(dst)) if src != dst => {
            log::debug!("Converting {src:?} payload to {dst:?} for {}", path.display());
            let converted = image::load_from_memory_with_format(data, src)
                .map_err(Error::from)
                .and_then(|img| encode_to_path(&img, dst, path));
            if let Err(e) = converted {
                log::warn!(
                    "Could not convert {src:?} to {dst:?} ({e}); writing original bytes to {}",
                    path.display()
                );
                fs::write(path, data)?;
            }
            Ok(())
        }
        _ => {
            fs::write(path, data)?;
            Ok(())
        }
    }
}

fn encode_to_path(img: &DynamicImage, format: ImageFormat, path: &Path) -> Result<()> {
    match format {
        ImageFormat::Jpeg => {
            let file = fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 95);
            encoder.encode_image(&img.to_rgb8())?;
        }
        _ => img.save_with_format(path, format)?,
    }
    Ok(())
}
