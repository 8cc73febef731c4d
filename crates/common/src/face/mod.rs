//! Face engine abstraction
//!
//! The face-detection/encoding computation is an external collaborator.
//! This module provides a unified interface to it:
//! - `FaceEngine` trait: RGB frame in, one encoding per detected face out
//! - `RemoteFaceEngine`: HTTP client against a face service
//! - `MockFaceEngine`: canned responses for tests
//! plus the image decoding and distance comparison that surround the call.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Fixed-length numeric vector summarizing a detected face
pub type Encoding = Vec<f32>;

/// Decoded image as a tightly packed RGB8 pixel buffer
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode a data-URI-encoded bitmap into an RGB pixel buffer
///
/// Accepts the `data:image/...;base64,` prefix or a bare base64 body. Any
/// failure along the way is an `ImageDecode` error, surfaced to the caller
/// as an internal fault rather than a business rejection.
pub fn decode_data_uri(data: &str) -> Result<RgbFrame> {
    let payload = match data.split_once(',') {
        Some((_, body)) => body,
        None => data,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::ImageDecode {
            message: format!("Invalid base64 payload: {}", e),
        })?;

    let decoded = image::load_from_memory(&bytes).map_err(|e| AppError::ImageDecode {
        message: format!("Unreadable image: {}", e),
    })?;

    // Face engines expect RGB channel order
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(RgbFrame {
        width,
        height,
        pixels: rgb.into_raw(),
    })
}

/// Euclidean distance between two encodings. Vectors of different lengths
/// never match.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Whether two encodings belong to the same person. Lower tolerance is
/// stricter; the match requires distance strictly below it.
pub fn is_match(stored: &[f32], probe: &[f32], tolerance: f32) -> bool {
    euclidean_distance(stored, probe) < tolerance
}

/// Trait for face detection and encoding
#[async_trait]
pub trait FaceEngine: Send + Sync {
    /// Detect faces in the frame, returning one encoding per face found.
    /// The caller decides what zero or multiple faces mean.
    async fn scan(&self, frame: &RgbFrame) -> Result<Vec<Encoding>>;

    /// Length of the encoding vectors this engine produces
    fn dimension(&self) -> usize;
}

/// HTTP client for a remote face service
pub struct RemoteFaceEngine {
    client: reqwest::Client,
    base_url: String,
    dimension: usize,
    max_retries: u32,
}

#[derive(Serialize)]
struct ScanRequest {
    width: u32,
    height: u32,
    /// Base64 of the raw RGB8 pixel buffer
    pixels: String,
}

#[derive(Deserialize)]
struct ScanResponse {
    faces: Vec<DetectedFace>,
}

#[derive(Deserialize)]
struct DetectedFace {
    encoding: Encoding,
}

impl RemoteFaceEngine {
    /// Create a new remote engine client
    pub fn new(base_url: String, dimension: usize, timeout_secs: u64, max_retries: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            dimension,
            max_retries,
        }
    }

    /// Make request with retry
    async fn request_with_retry(&self, frame: &RgbFrame) -> Result<Vec<Encoding>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(frame).await {
                Ok(encodings) => return Ok(encodings),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Face scan request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::FaceEngine {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, frame: &RgbFrame) -> Result<Vec<Encoding>> {
        let url = format!("{}/encodings", self.base_url);

        let request = ScanRequest {
            width: frame.width,
            height: frame.height,
            pixels: STANDARD.encode(&frame.pixels),
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::FaceEngine {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::FaceEngine {
                message: format!("Face service error {}: {}", status, body),
            });
        }

        let result: ScanResponse = response.json().await.map_err(|e| AppError::FaceEngine {
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(result.faces.into_iter().map(|f| f.encoding).collect())
    }
}

#[async_trait]
impl FaceEngine for RemoteFaceEngine {
    async fn scan(&self, frame: &RgbFrame) -> Result<Vec<Encoding>> {
        self.request_with_retry(frame).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Mock engine for testing and local development
pub struct MockFaceEngine {
    faces: Vec<Encoding>,
    dimension: usize,
}

impl MockFaceEngine {
    /// Engine that finds one random face in every frame
    pub fn new(dimension: usize) -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let face = (0..dimension).map(|_| rng.gen::<f32>()).collect();
        Self {
            faces: vec![face],
            dimension,
        }
    }

    /// Engine that returns exactly these faces for every frame
    pub fn with_faces(faces: Vec<Encoding>) -> Self {
        let dimension = faces.first().map(|f| f.len()).unwrap_or(0);
        Self { faces, dimension }
    }
}

#[async_trait]
impl FaceEngine for MockFaceEngine {
    async fn scan(&self, _frame: &RgbFrame) -> Result<Vec<Encoding>> {
        Ok(self.faces.clone())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create a face engine based on configuration
pub fn create_face_engine(config: &crate::config::FaceConfig) -> Arc<dyn FaceEngine> {
    match config.provider.as_str() {
        "remote" => {
            let base_url = config
                .base_url
                .clone()
                .expect("Remote face engine requires face.base_url");
            Arc::new(RemoteFaceEngine::new(
                base_url,
                config.dimension,
                config.timeout_secs,
                config.max_retries,
            ))
        }
        "mock" => Arc::new(MockFaceEngine::new(config.dimension)),
        other => {
            tracing::warn!(provider = other, "Unknown face engine provider, using mock");
            Arc::new(MockFaceEngine::new(config.dimension))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_data_uri(width: u32, height: u32) -> String {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([12, 34, 56]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        format!(
            "data:image/png;base64,{}",
            STANDARD.encode(buf.into_inner())
        )
    }

    #[test]
    fn test_decode_data_uri() {
        let frame = decode_data_uri(&png_data_uri(8, 6)).unwrap();
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 6);
        assert_eq!(frame.pixels.len(), 8 * 6 * 3);
        assert_eq!(&frame.pixels[..3], &[12, 34, 56]);
    }

    #[test]
    fn test_decode_without_prefix() {
        let uri = png_data_uri(4, 4);
        let bare = uri.split_once(',').unwrap().1;
        assert!(decode_data_uri(bare).is_ok());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_data_uri("data:image/png;base64,!!!not-base64!!!").unwrap_err();
        assert!(matches!(err, AppError::ImageDecode { .. }));
    }

    #[test]
    fn test_decode_rejects_non_image() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"hello"));
        let err = decode_data_uri(&uri).unwrap_err();
        assert!(matches!(err, AppError::ImageDecode { .. }));
    }

    #[test]
    fn test_distance() {
        assert_eq!(euclidean_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert_eq!(euclidean_distance(&[0.0, 3.0], &[4.0, 0.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0], &[1.0, 2.0]), f32::INFINITY);
    }

    #[test]
    fn test_match_is_strictly_below_tolerance() {
        // powers of two keep the arithmetic exact in f32
        assert!(is_match(&[0.0], &[0.25], 0.5));
        assert!(!is_match(&[0.0], &[0.5], 0.5));
        assert!(!is_match(&[0.0], &[0.75], 0.5));
    }

    #[test]
    fn test_dimension_mismatch_never_matches() {
        assert!(!is_match(&[0.0, 0.0], &[0.0], 100.0));
    }

    #[tokio::test]
    async fn test_mock_engine_returns_configured_faces() {
        let engine = MockFaceEngine::with_faces(vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        let frame = RgbFrame {
            width: 1,
            height: 1,
            pixels: vec![0, 0, 0],
        };
        let faces = engine.scan(&frame).await.unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(engine.dimension(), 2);
    }

    #[tokio::test]
    async fn test_mock_engine_single_face() {
        let engine = MockFaceEngine::new(128);
        let frame = RgbFrame {
            width: 1,
            height: 1,
            pixels: vec![0, 0, 0],
        };
        let faces = engine.scan(&frame).await.unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].len(), 128);
    }
}
