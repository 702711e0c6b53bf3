use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Error};
use log::{debug, info};
use opencv::core::{Mat, MatTraitConst};
use tokio::task;
use tokio::time::timeout;
use crate::config::config::ServiceConfig;
use crate::error::SmartFitError;
use crate::modules::body_measurement::{BodyMeasurementService, MeasurementSet};
use crate::modules::landmark_provider::LandmarkProvider;
use crate::modules::pose_landmark_client::PoseLandmarkClient;
use crate::modules::virtual_tryon::{CompositeResult, VirtualTryOnService};
use crate::pipeline::schemas::{
    BodyMeasurementRequest, BodyMeasurementResponse, HealthResponse, PoseEstimationRequest,
    PoseEstimationResponse, VirtualFittingRequest, VirtualFittingResponse, VirtualTryOnRequest,
    VirtualTryOnResponse,
};
use crate::utils::coordinate::{PoseData, parse_landmarks};
use crate::utils::image::decode_base64_image;

/// SmartFitPipeline sequences landmark detection, body measurement and garment compositing.
///
/// It holds no per-request state: every call decodes its own buffers, and
/// clones share the same read-only configuration and landmark provider.
#[derive(Clone)]
pub struct SmartFitPipeline {
    landmark_provider: Arc<dyn LandmarkProvider>,
    body_measurement: BodyMeasurementService,
    virtual_tryon: VirtualTryOnService,
    pose_confidence: f64,
    pose_timeout: Duration,
    tryon_timeout: Duration,
}

impl SmartFitPipeline {

    /// new initializes new instance of the pipeline
    pub fn new(landmark_provider: Arc<dyn LandmarkProvider>, config: ServiceConfig) -> Self {
        SmartFitPipeline {
            landmark_provider,
            body_measurement: BodyMeasurementService::new(config.body_measurement),
            virtual_tryon: VirtualTryOnService::new(config.virtual_tryon.clone()),
            pose_confidence: config.pose_estimation.confidence,
            pose_timeout: Duration::from_secs(config.pose_estimation.timeout),
            tryon_timeout: Duration::from_secs(config.virtual_tryon.timeout),
        }
    }

    /// connect builds a pipeline backed by the pose landmark model on the configured inference server.
    pub async fn connect(config: ServiceConfig) -> Result<Self, Error> {
        config.validate()?;
        let client = PoseLandmarkClient::connect(config.pose_estimation.clone())
            .await
            .with_context(|| format!("failed to connect to pose model at {}", config.pose_estimation.url))?;
        Ok(SmartFitPipeline::new(Arc::new(client), config))
    }

    /// estimate_pose detects body landmarks on the request image.
    ///
    /// # Arguments
    /// * `request` - base64 encoded image
    ///
    /// # Returns
    /// * `Result<PoseEstimationResponse, Error>`
    pub async fn estimate_pose(&self, request: &PoseEstimationRequest) -> Result<PoseEstimationResponse, Error> {
        let img = decode_base64_image(&request.image_data).context("pose estimation failed")?;
        let (pose_data, confidence) = self.detect_pose(img).await.context("pose estimation failed")?;
        info!("pose estimation found {} landmarks", pose_data.landmarks.len());

        Ok(PoseEstimationResponse {
            success: true,
            pose_data,
            confidence,
        })
    }

    /// measure_body derives body measurements from the request image and pose payload.
    ///
    /// A malformed or incomplete pose payload is not an error, it yields zero measurements.
    ///
    /// # Arguments
    /// * `request` - base64 encoded image and pose payload
    ///
    /// # Returns
    /// * `Result<BodyMeasurementResponse, Error>`
    pub async fn measure_body(&self, request: &BodyMeasurementRequest) -> Result<BodyMeasurementResponse, Error> {
        let img = decode_base64_image(&request.image_data).context("body measurement failed")?;
        let estimate = self.body_measurement.measure_body(&img, &request.pose_data);
        info!("body measurement finished with confidence {}", estimate.confidence);

        Ok(BodyMeasurementResponse {
            success: true,
            measurements: estimate.measurements,
            confidence: estimate.confidence,
        })
    }

    /// try_on composites the garment onto the body using the supplied measurements.
    ///
    /// # Arguments
    /// * `request` - base64 encoded body and garment images, pose payload and measurements
    ///
    /// # Returns
    /// * `Result<VirtualTryOnResponse, Error>`
    pub async fn try_on(&self, request: &VirtualTryOnRequest) -> Result<VirtualTryOnResponse, Error> {
        let body = decode_base64_image(&request.body_image).context("virtual try-on failed")?;
        let garment = decode_base64_image(&request.garment_image).context("virtual try-on failed")?;
        let measurements = MeasurementSet::from_map(&request.measurements);
        debug!("try-on request carries {} landmarks", parse_landmarks(&request.pose_data).len());

        let result = self.composite(body, garment, measurements).await.context("virtual try-on failed")?;
        info!("virtual try-on produced {} bytes", result.image.len());

        Ok(VirtualTryOnResponse {
            success: true,
            result_image: result.to_data_uri(),
            confidence: result.confidence,
        })
    }

    /// virtual_fitting runs detection, measurement and compositing for one body/garment pair.
    ///
    /// # Arguments
    /// * `request` - base64 encoded body and garment images
    ///
    /// # Returns
    /// * `Result<VirtualFittingResponse, Error>`
    pub async fn virtual_fitting(&self, request: &VirtualFittingRequest) -> Result<VirtualFittingResponse, Error> {
        let body = decode_base64_image(&request.body_image).context("virtual fitting failed")?;
        let garment = decode_base64_image(&request.garment_image).context("virtual fitting failed")?;

        let (pose_data, _) = self.detect_pose(body.try_clone()?).await.context("virtual fitting failed")?;
        let estimate = self.body_measurement.estimate(&pose_data.landmarks, pose_data.image_width, pose_data.image_height);
        let result = self.composite(body, garment, estimate.measurements).await.context("virtual fitting failed")?;
        info!("virtual fitting finished, {} landmarks, measurement confidence {}",
            pose_data.landmarks.len(), estimate.confidence);

        Ok(VirtualFittingResponse {
            success: true,
            pose_data,
            measurements: estimate.measurements,
            measurement_confidence: estimate.confidence,
            result_image: result.to_data_uri(),
            confidence: result.confidence,
        })
    }

    pub async fn health(&self) -> HealthResponse {
        let pose_ready = self.landmark_provider.is_ready().await;
        let availability = |ready: bool| String::from(if ready { "available" } else { "unavailable" });

        let services = BTreeMap::from([
            ("pose_estimation".to_string(), availability(pose_ready)),
            ("body_measurement".to_string(), availability(true)),
            ("virtual_tryon".to_string(), availability(true)),
        ]);

        HealthResponse {
            status: String::from(if pose_ready { "healthy" } else { "degraded" }),
            services,
        }
    }

    async fn detect_pose(&self, img: Mat) -> Result<(PoseData, f64), SmartFitError> {
        let (image_width, image_height) = (img.cols(), img.rows());
        let landmarks = match timeout(self.pose_timeout, self.landmark_provider.detect(img)).await {
            Ok(landmarks) => landmarks?,
            Err(_) => return Err(SmartFitError::Timeout {
                stage: "pose estimation",
                seconds: self.pose_timeout.as_secs(),
            }),
        };

        let confidence = if landmarks.is_empty() { 0.0 } else { self.pose_confidence };
        let pose_data = PoseData {
            landmarks,
            image_width,
            image_height,
        };
        Ok((pose_data, confidence))
    }

    async fn composite(&self, body: Mat, garment: Mat, measurements: MeasurementSet) -> Result<CompositeResult, SmartFitError> {
        let virtual_tryon = self.virtual_tryon.clone();
        let handle = task::spawn_blocking(move || virtual_tryon.composite(body, garment, &measurements));

        match timeout(self.tryon_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(SmartFitError::Compositing(format!("compositing task aborted: {e}"))),
            Err(_) => Err(SmartFitError::Timeout {
                stage: "virtual try-on",
                seconds: self.tryon_timeout.as_secs(),
            }),
        }
    }
}
