use async_trait::async_trait;
use opencv::core::Mat;
use crate::error::Result;
use crate::utils::coordinate::Landmark;

/// LandmarkProvider detects body landmarks on a single image.
///
/// Implementations are shared by concurrent requests and must be safe to call
/// from several tasks at once. `detect` returns landmarks in [`BodyLandmark`]
/// order, or an empty sequence when no body is found.
///
/// [`BodyLandmark`]: crate::utils::coordinate::BodyLandmark
#[async_trait]
pub trait LandmarkProvider: Send + Sync {
    async fn detect(&self, img: Mat) -> Result<Vec<Landmark>>;

    async fn is_ready(&self) -> bool {
        true
    }
}
