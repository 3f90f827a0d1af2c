//! Inference service.
//!
//! One endpoint: `POST /predict` takes a multipart image upload, runs the
//! detector, blurs every detected region, and returns the redacted image as a
//! base64 PNG field in the JSON response alongside the detection count.
//!
//! Requests are stateless and independent; the detector is constructed once
//! at startup and shared read-only across requests.

pub mod redact;

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::adapters::Detector;

/// Per-request ceiling on the detect + redact path
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upload size limit
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared service state, built once at startup
pub struct ServeContext {
    pub detector: Arc<dyn Detector>,
}

impl ServeContext {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self { detector }
    }
}

/// Successful prediction response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    /// Original upload filename
    pub filename: String,

    /// Whether redaction ran (always true on success, zero boxes included)
    pub processed: bool,

    /// Number of detected regions
    pub detections: usize,

    /// Redacted image, PNG, base64-encoded
    pub image_base64: String,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures on the prediction path
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Could not decode uploaded image: {0}")]
    Decode(String),

    #[error("Detector failed: {0}")]
    Detector(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PredictError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Detector(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Build the service router
pub fn router(ctx: Arc<ServeContext>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(ctx)
}

/// Bind and serve until shutdown
pub async fn serve(addr: &str, ctx: Arc<ServeContext>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Inference service listening");
    axum::serve(listener, router(ctx)).await?;
    Ok(())
}

/// `POST /predict` handler
async fn predict(
    State(ctx): State<Arc<ServeContext>>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (filename, bytes) = read_upload(&mut multipart).await.map_err(reject)?;

    let result = tokio::time::timeout(
        REQUEST_TIMEOUT,
        process_upload(ctx.detector.as_ref(), bytes),
    )
    .await
    .unwrap_or(Err(PredictError::Timeout));

    match result {
        Ok((detections, png)) => Ok(Json(PredictResponse {
            filename,
            processed: true,
            detections,
            image_base64: BASE64.encode(png),
        })),
        Err(e) => Err(reject(e)),
    }
}

fn reject(e: PredictError) -> (StatusCode, Json<ErrorResponse>) {
    error!(error = %e, "Prediction failed");
    (
        e.status(),
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// Pull the first file field out of the multipart body
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), PredictError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PredictError::Decode(e.to_string()))?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| PredictError::Decode(e.to_string()))?;
        return Ok((filename, bytes.to_vec()));
    }

    Err(PredictError::Decode("no file field in upload".to_string()))
}

/// Decode, detect, redact, and re-encode one upload.
///
/// Returns the detection count and the redacted PNG bytes. Zero detections is
/// valid: the returned pixels are identical to the decoded input.
pub async fn process_upload(
    detector: &dyn Detector,
    bytes: Vec<u8>,
) -> Result<(usize, Vec<u8>), PredictError> {
    // Decode on the blocking pool; uploads can be large
    let image: RgbImage = tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map(|img| img.to_rgb8())
            .map_err(|e| PredictError::Decode(e.to_string()))
    })
    .await
    .map_err(|e| PredictError::Internal(e.to_string()))??;

    let boxes = detector
        .detect(&image)
        .await
        .map_err(|e| PredictError::Detector(e.to_string()))?;

    let detections = boxes.len();

    // Redaction and PNG encoding are CPU-bound
    let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, PredictError> {
        let redacted = redact::blur_regions(&image, &boxes);
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(redacted)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| PredictError::Internal(e.to_string()))?;
        Ok(buf)
    })
    .await
    .map_err(|e| PredictError::Internal(e.to_string()))??;

    Ok((detections, png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::BoundingBox;
    use async_trait::async_trait;

    struct FixedDetector {
        boxes: Vec<BoundingBox>,
    }

    #[async_trait]
    impl Detector for FixedDetector {
        async fn detect(&self, _image: &RgbImage) -> anyhow::Result<Vec<BoundingBox>> {
            Ok(self.boxes.clone())
        }
    }

    struct BrokenDetector;

    #[async_trait]
    impl Detector for BrokenDetector {
        async fn detect(&self, _image: &RgbImage) -> anyhow::Result<Vec<BoundingBox>> {
            anyhow::bail!("model not loaded")
        }
    }

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 37 % 256) as u8, (y * 11 % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_zero_detections_returns_original_pixels() {
        let detector = FixedDetector { boxes: vec![] };
        let bytes = png_fixture(32, 32);

        let (detections, png) = process_upload(&detector, bytes.clone()).await.unwrap();
        assert_eq!(detections, 0);

        let original = image::load_from_memory(&bytes).unwrap().to_rgb8();
        let returned = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(original.as_raw(), returned.as_raw());
    }

    #[tokio::test]
    async fn test_detections_are_counted() {
        let detector = FixedDetector {
            boxes: vec![
                BoundingBox::new(2.0, 2.0, 12.0, 12.0),
                BoundingBox::new(16.0, 16.0, 30.0, 30.0),
            ],
        };
        let bytes = png_fixture(32, 32);

        let (detections, png) = process_upload(&detector, bytes).await.unwrap();
        assert_eq!(detections, 2);
        assert!(image::load_from_memory(&png).is_ok());
    }

    #[tokio::test]
    async fn test_undecodable_upload_is_decode_error() {
        let detector = FixedDetector { boxes: vec![] };
        let result = process_upload(&detector, b"not an image".to_vec()).await;

        assert!(matches!(result, Err(PredictError::Decode(_))));
    }

    #[tokio::test]
    async fn test_detector_failure_is_surfaced() {
        let result = process_upload(&BrokenDetector, png_fixture(8, 8)).await;
        assert!(matches!(result, Err(PredictError::Detector(_))));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            PredictError::Decode("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PredictError::Detector("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(PredictError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
