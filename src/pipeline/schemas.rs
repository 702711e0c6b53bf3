use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use crate::modules::body_measurement::MeasurementSet;
use crate::utils::coordinate::PoseData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimationRequest {
    pub image_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimationResponse {
    pub success: bool,
    pub pose_data: PoseData,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurementRequest {
    pub image_data: String,
    pub pose_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurementResponse {
    pub success: bool,
    pub measurements: MeasurementSet,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualTryOnRequest {
    pub body_image: String,
    pub garment_image: String,
    #[serde(default)]
    pub pose_data: serde_json::Value,
    #[serde(default)]
    pub measurements: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualTryOnResponse {
    pub success: bool,
    pub result_image: String,
    pub confidence: f64,
}

/// Body and garment for the full detect, measure and composite sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualFittingRequest {
    pub body_image: String,
    pub garment_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualFittingResponse {
    pub success: bool,
    pub pose_data: PoseData,
    pub measurements: MeasurementSet,
    pub measurement_confidence: f64,
    pub result_image: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub detail: String,
}

impl ErrorResponse {
    /// from_error reports any failure uniformly, with the full context chain as detail.
    pub fn from_error(err: &anyhow::Error) -> Self {
        ErrorResponse {
            success: false,
            error: "Internal server error".to_string(),
            detail: format!("{err:#}"),
        }
    }
}
