use std::env;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Result, SmartFitError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoseEstimationConfig {
    pub url: String,
    pub model_name: String,
    pub timeout: u64,
    pub imsize: (i32, i32),
    pub channels_first: bool,
    pub landmark_output: String,
    pub presence_output: Option<String>,
    pub num_landmarks: usize,
    pub values_per_landmark: usize,
    pub min_detection_confidence: f32,
    pub confidence: f64,
}

impl PoseEstimationConfig {
    pub fn new() -> Self {
        PoseEstimationConfig {
            url: "http://localhost:8001".to_string(),
            model_name: "pose_landmark".to_string(),
            timeout: 20,
            imsize: (256, 256),
            channels_first: false,
            landmark_output: "Identity".to_string(),
            presence_output: Some("Identity_1".to_string()),
            num_landmarks: 33,
            values_per_landmark: 5,
            min_detection_confidence: 0.5,
            confidence: 0.85,
        }
    }

    /// validate checks the settings the landmark client relies on.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SmartFitError::Config(format!("pose_estimation.confidence must be within [0, 1], got {}", self.confidence)))
        }
        if self.imsize.0 <= 0 || self.imsize.1 <= 0 {
            return Err(SmartFitError::Config(format!("pose_estimation.imsize must be positive, got {:?}", self.imsize)))
        }
        if self.values_per_landmark < 2 || self.num_landmarks == 0 {
            return Err(SmartFitError::Config("pose_estimation landmark layout is empty".to_string()))
        }
        if self.timeout == 0 {
            return Err(SmartFitError::Config("pose_estimation.timeout must be positive".to_string()))
        }
        Ok(())
    }
}

impl Default for PoseEstimationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BodyMeasurementConfig {
    pub hip_circumference_factor: f64,
    pub chest_ratio: f64,
    pub waist_ratio: f64,
    pub default_shoulder_width: f64,
    pub default_hips: f64,
    pub arm_length: f64,
    pub leg_length: f64,
    pub confidence: f64,
}

impl BodyMeasurementConfig {
    pub fn new() -> Self {
        BodyMeasurementConfig {
            hip_circumference_factor: 1.2,
            chest_ratio: 0.9,
            waist_ratio: 0.8,
            default_shoulder_width: 40.0,
            default_hips: 35.0,
            arm_length: 25.0,
            leg_length: 30.0,
            confidence: 0.8,
        }
    }
}

impl Default for BodyMeasurementConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VirtualTryOnConfig {
    pub default_shoulder_width: f64,
    pub mask_threshold: f64,
    pub vertical_offset_divisor: i32,
    pub jpeg_quality: i32,
    pub timeout: u64,
    pub confidence: f64,
}

impl VirtualTryOnConfig {
    pub fn new() -> Self {
        VirtualTryOnConfig {
            default_shoulder_width: 40.0,
            mask_threshold: 10.0,
            vertical_offset_divisor: 3,
            jpeg_quality: 95,
            timeout: 20,
            confidence: 0.75,
        }
    }
}

impl Default for VirtualTryOnConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// ServiceConfig groups the per-stage configs. It is built once at startup
/// and shared read-only by every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub pose_estimation: PoseEstimationConfig,
    pub body_measurement: BodyMeasurementConfig,
    pub virtual_tryon: VirtualTryOnConfig,
}

impl ServiceConfig {
    pub fn new() -> Self {
        ServiceConfig::default()
    }

    /// from_json_file reads a (possibly partial) JSON config. Missing fields keep their defaults.
    ///
    /// # Arguments
    /// * `path` - path to the JSON document
    ///
    /// # Returns
    /// * `Result<ServiceConfig>`
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ServiceConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// from_env starts from the defaults and applies the `TRITON_URL`,
    /// `POSE_MODEL_NAME` and `POSE_TIMEOUT_SECS` overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = ServiceConfig::new();
        if let Ok(url) = env::var("TRITON_URL") {
            config.pose_estimation.url = url;
        }
        if let Ok(model_name) = env::var("POSE_MODEL_NAME") {
            config.pose_estimation.model_name = model_name;
        }
        if let Ok(timeout) = env::var("POSE_TIMEOUT_SECS") {
            config.pose_estimation.timeout = timeout
                .parse()
                .map_err(|_| SmartFitError::Config(format!("POSE_TIMEOUT_SECS is not a number: {timeout}")))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.pose_estimation.validate()?;
        let confidences = [
            ("body_measurement.confidence", self.body_measurement.confidence),
            ("virtual_tryon.confidence", self.virtual_tryon.confidence),
        ];
        for (name, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(SmartFitError::Config(format!("{name} must be within [0, 1], got {value}")))
            }
        }

        let tryon = &self.virtual_tryon;
        if !(0.0..=255.0).contains(&tryon.mask_threshold) {
            return Err(SmartFitError::Config(format!("virtual_tryon.mask_threshold must be within [0, 255], got {}", tryon.mask_threshold)))
        }
        if tryon.vertical_offset_divisor <= 0 {
            return Err(SmartFitError::Config("virtual_tryon.vertical_offset_divisor must be positive".to_string()))
        }
        if !(0..=100).contains(&tryon.jpeg_quality) {
            return Err(SmartFitError::Config(format!("virtual_tryon.jpeg_quality must be within [0, 100], got {}", tryon.jpeg_quality)))
        }
        if tryon.timeout == 0 {
            return Err(SmartFitError::Config("virtual_tryon.timeout must be positive".to_string()))
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServiceConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.pose_estimation.num_landmarks, 33);
        assert_eq!(config.virtual_tryon.mask_threshold, 10.0);
        assert_eq!(config.body_measurement.hip_circumference_factor, 1.2);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let raw = r#"{"pose_estimation":{"url":"http://triton:8001"},"virtual_tryon":{"jpeg_quality":80}}"#;
        let config: ServiceConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.pose_estimation.url, "http://triton:8001");
        assert_eq!(config.pose_estimation.model_name, "pose_landmark");
        assert_eq!(config.virtual_tryon.jpeg_quality, 80);
        assert_eq!(config.body_measurement, BodyMeasurementConfig::new());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = ServiceConfig::new();
        config.virtual_tryon.confidence = 1.5;
        assert!(matches!(config.validate(), Err(SmartFitError::Config(_))));

        let mut config = ServiceConfig::new();
        config.virtual_tryon.vertical_offset_divisor = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::new();
        config.virtual_tryon.mask_threshold = 300.0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::new();
        config.pose_estimation.timeout = 0;
        assert!(matches!(config.validate(), Err(SmartFitError::Config(_))));

        let mut config = ServiceConfig::new();
        config.virtual_tryon.timeout = 0;
        assert!(matches!(config.validate(), Err(SmartFitError::Config(_))));
    }

    #[test]
    fn test_pose_config_rejects_bad_layout() {
        for values_per_landmark in [0, 1] {
            let config = PoseEstimationConfig { values_per_landmark, ..PoseEstimationConfig::new() };
            assert!(matches!(config.validate(), Err(SmartFitError::Config(_))));
        }
        let config = PoseEstimationConfig { num_landmarks: 0, ..PoseEstimationConfig::new() };
        assert!(config.validate().is_err());
        assert!(PoseEstimationConfig::new().validate().is_ok());
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("smartfit-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"body_measurement":{"confidence":0.6}}"#).unwrap();
        let config = ServiceConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.body_measurement.confidence, 0.6);
        assert_eq!(config.body_measurement.chest_ratio, 0.9);
    }
}
