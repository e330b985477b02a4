//! Image generation: one request, first image persisted, fallback on any failure.

use crate::error::ImageError;
use crate::imaging::store::ImageStore;
use crate::llm::backend::{ImageBackend, ImageRequest};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Aspect ratio requested for every generated image.
pub const ASPECT_RATIO: &str = "1:1";

/// Which file ended up being sent for an image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Generated(PathBuf),
    Fallback(PathBuf),
}

impl ImageOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ImageOutcome::Generated(path) | ImageOutcome::Fallback(path) => path,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ImageOutcome::Fallback(_))
    }
}

/// Turns prompts into saved image files.
#[derive(Clone)]
pub struct ImagePipeline {
    backend: Arc<dyn ImageBackend>,
    store: ImageStore,
    fallback_image: PathBuf,
}

impl ImagePipeline {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        store: ImageStore,
        fallback_image: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            store,
            fallback_image: fallback_image.into(),
        }
    }

    /// Generate one image for `prompt` and save it. No retries.
    #[tracing::instrument(skip(self))]
    pub async fn generate(&self, model_id: &str, prompt: &str) -> Result<PathBuf, ImageError> {
        let request = ImageRequest {
            model_id: model_id.to_string(),
            prompt: prompt.to_string(),
            aspect_ratio: ASPECT_RATIO.to_string(),
            count: 1,
        };

        let images = self.backend.generate_images(&request).await?;
        let Some(image) = images.into_iter().next() else {
            return Err(ImageError::NoImages);
        };

        let (bytes, extension) = tokio::task::spawn_blocking(move || {
            let extension = decode_extension(&image.bytes, image.mime_type.as_deref())?;
            Ok::<_, ImageError>((image.bytes, extension))
        })
        .await
        .map_err(|e| ImageError::Decode(format!("decode task failed: {e}")))??;

        let path = self.store.save(&bytes, extension).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "generated image saved");

        Ok(path)
    }

    /// Like [`generate`](Self::generate), but any failure is logged and the
    /// fallback asset is returned instead.
    pub async fn generate_or_fallback(&self, model_id: &str, prompt: &str) -> ImageOutcome {
        match self.generate(model_id, prompt).await {
            Ok(path) => ImageOutcome::Generated(path),
            Err(error) => {
                tracing::error!(
                    %error,
                    fallback = %self.fallback_image.display(),
                    "image generation failed, using fallback image"
                );
                ImageOutcome::Fallback(self.fallback_image.clone())
            }
        }
    }
}

/// Decode the image to confirm it is usable and pick its file extension.
///
/// The format is sniffed from the bytes; the backend's MIME type is used only
/// when sniffing fails.
fn decode_extension(bytes: &[u8], mime_type: Option<&str>) -> Result<&'static str, ImageError> {
    let format = match image::guess_format(bytes) {
        Ok(format) => format,
        Err(error) => mime_type
            .and_then(image::ImageFormat::from_mime_type)
            .ok_or_else(|| ImageError::Decode(error.to_string()))?,
    };
    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    Ok(format.extensions_str().first().copied().unwrap_or("png"))
}
