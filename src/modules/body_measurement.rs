use std::collections::HashMap;
use log::{debug, warn};
use opencv::core::{Mat, MatTraitConst};
use serde::{Deserialize, Serialize};
use crate::config::config::BodyMeasurementConfig;
use crate::error::{Result, SmartFitError};
use crate::utils::coordinate::{BodyLandmark, Landmark, parse_landmarks};

/// Body measurements in pixel-proportional units. They are not calibrated
/// against real-world length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurementSet {
    pub chest: f64,
    pub waist: f64,
    pub hips: f64,
    pub shoulder_width: f64,
    pub arm_length: f64,
    pub leg_length: f64,
}

impl MeasurementSet {
    pub fn zeroed() -> Self {
        MeasurementSet::default()
    }

    /// from_map reads measurements from a request payload. Missing keys read as 0.
    pub fn from_map(values: &HashMap<String, f64>) -> Self {
        let get = |key: &str| values.get(key).copied().unwrap_or(0.0);
        MeasurementSet {
            chest: get("chest"),
            waist: get("waist"),
            hips: get("hips"),
            shoulder_width: get("shoulder_width"),
            arm_length: get("arm_length"),
            leg_length: get("leg_length"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementEstimate {
    pub measurements: MeasurementSet,
    pub confidence: f64,
}

impl MeasurementEstimate {
    fn insufficient() -> Self {
        MeasurementEstimate {
            measurements: MeasurementSet::zeroed(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BodyMeasurementService {
    config: BodyMeasurementConfig,
}

impl BodyMeasurementService {
    pub fn new(config: BodyMeasurementConfig) -> Self {
        BodyMeasurementService { config }
    }

    /// measure_body estimates measurements for a decoded image and a pose payload.
    ///
    /// # Arguments
    /// * `img` - decoded body image, only its dimensions are used
    /// * `pose_data` - JSON pose payload carrying a `landmarks` array
    ///
    /// # Returns
    /// * `MeasurementEstimate`
    pub fn measure_body(&self, img: &Mat, pose_data: &serde_json::Value) -> MeasurementEstimate {
        let landmarks = parse_landmarks(pose_data);
        self.estimate(&landmarks, img.cols(), img.rows())
    }

    /// estimate derives the measurement set from a full landmark sequence.
    ///
    /// Fewer than 33 landmarks, or a non-positive image size, yield an all-zero
    /// set with zero confidence. Shoulder and hip widths are horizontal
    /// distances between the paired landmarks; chest and waist are fixed
    /// ratios of those, and arm/leg length are configured constants.
    ///
    /// # Arguments
    /// * `landmarks` - normalized landmarks in detector order
    /// * `image_width` - image width in pixels
    /// * `image_height` - image height in pixels
    ///
    /// # Returns
    /// * `MeasurementEstimate`
    pub fn estimate(&self, landmarks: &[Landmark], image_width: i32, image_height: i32) -> MeasurementEstimate {
        if image_width <= 0 || image_height <= 0 {
            warn!("cannot measure a {image_width}x{image_height} image");
            return MeasurementEstimate::insufficient()
        }
        if let Err(e) = check_landmark_count(landmarks) {
            warn!("{e}");
            return MeasurementEstimate::insufficient()
        }

        let width = image_width as f64;
        let shoulder_width = horizontal_span(landmarks, BodyLandmark::LeftShoulder, BodyLandmark::RightShoulder)
            .map(|span| round2(span * width));
        let hips = horizontal_span(landmarks, BodyLandmark::LeftHip, BodyLandmark::RightHip)
            .map(|span| round2(span * width * self.config.hip_circumference_factor));

        let measurements = MeasurementSet {
            chest: shoulder_width.unwrap_or(self.config.default_shoulder_width) * self.config.chest_ratio,
            waist: hips.unwrap_or(self.config.default_hips) * self.config.waist_ratio,
            hips: hips.unwrap_or(0.0),
            shoulder_width: shoulder_width.unwrap_or(0.0),
            arm_length: self.config.arm_length,
            leg_length: self.config.leg_length,
        };
        debug!("measurements for {image_width}x{image_height}: {measurements:?}");

        MeasurementEstimate {
            measurements,
            confidence: self.config.confidence,
        }
    }
}

/// check_landmark_count requires one landmark per body role.
pub fn check_landmark_count(landmarks: &[Landmark]) -> Result<()> {
    if landmarks.len() < BodyLandmark::COUNT {
        return Err(SmartFitError::InsufficientLandmarks {
            found: landmarks.len(),
            required: BodyLandmark::COUNT,
        })
    }
    Ok(())
}

fn horizontal_span(landmarks: &[Landmark], left: BodyLandmark, right: BodyLandmark) -> Option<f64> {
    let left = left.landmark(landmarks)?;
    let right = right.landmark(landmarks)?;
    Some((right.x - left.x).abs())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use opencv::core::{CV_8UC3, Scalar};
    use serde_json::json;
    use super::*;

    fn full_pose(left_shoulder: f64, right_shoulder: f64, left_hip: f64, right_hip: f64) -> Vec<Landmark> {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0, 0.9); BodyLandmark::COUNT];
        landmarks[BodyLandmark::LeftShoulder.index()].x = left_shoulder;
        landmarks[BodyLandmark::RightShoulder.index()].x = right_shoulder;
        landmarks[BodyLandmark::LeftHip.index()].x = left_hip;
        landmarks[BodyLandmark::RightHip.index()].x = right_hip;
        landmarks
    }

    fn service() -> BodyMeasurementService {
        BodyMeasurementService::new(BodyMeasurementConfig::new())
    }

    #[test]
    fn test_estimate_from_full_pose() {
        let landmarks = full_pose(0.6, 0.4, 0.55, 0.45);
        let estimate = service().estimate(&landmarks, 640, 480);
        let m = estimate.measurements;

        assert_eq!(m.shoulder_width, round2((0.4f64 - 0.6).abs() * 640.0));
        assert_eq!(m.shoulder_width, 128.0);
        assert_eq!(m.hips, round2((0.45f64 - 0.55).abs() * 640.0 * 1.2));
        assert_eq!(m.chest, m.shoulder_width * 0.9);
        assert_eq!(m.waist, m.hips * 0.8);
        assert_eq!(m.arm_length, 25.0);
        assert_eq!(m.leg_length, 30.0);
        assert_eq!(estimate.confidence, 0.8);
    }

    #[test]
    fn test_shoulder_width_is_rounded_and_non_negative() {
        let landmarks = full_pose(0.123456, 0.654321, 0.3, 0.3);
        let m = service().estimate(&landmarks, 333, 100).measurements;
        assert!(m.shoulder_width >= 0.0);
        assert_eq!(m.shoulder_width, round2((0.654321f64 - 0.123456).abs() * 333.0));
        assert_eq!(m.hips, 0.0);
        assert_eq!(m.waist, 0.0);
    }

    #[test]
    fn test_insufficient_landmarks_yield_zeros() {
        let svc = service();
        for count in [0, 1, 24, 32] {
            let landmarks = vec![Landmark::new(0.5, 0.5, 0.0, 1.0); count];
            let estimate = svc.estimate(&landmarks, 640, 480);
            assert_eq!(estimate.measurements, MeasurementSet::zeroed());
            assert_eq!(estimate.confidence, 0.0);
        }
    }

    #[test]
    fn test_check_landmark_count() {
        let err = check_landmark_count(&vec![Landmark::new(0.5, 0.5, 0.0, 1.0); 10]).unwrap_err();
        assert!(matches!(err, SmartFitError::InsufficientLandmarks { found: 10, required: 33 }));
        assert_eq!(err.to_string(), "insufficient landmarks: found 10, required 33");
        assert!(check_landmark_count(&full_pose(0.6, 0.4, 0.55, 0.45)).is_ok());
    }

    #[test]
    fn test_invalid_dimensions_yield_zeros() {
        let estimate = service().estimate(&full_pose(0.6, 0.4, 0.55, 0.45), 0, 480);
        assert_eq!(estimate, MeasurementEstimate::insufficient());
    }

    #[test]
    fn test_measure_body_with_malformed_payload() {
        let img = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(0.0)).unwrap();
        let estimate = service().measure_body(&img, &json!({"landmarks": [{"x": "left"}]}));
        assert_eq!(estimate.measurements, MeasurementSet::zeroed());
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn test_measure_body_uses_image_width() {
        let img = Mat::new_rows_cols_with_default(100, 200, CV_8UC3, Scalar::all(0.0)).unwrap();
        let payload = json!({ "landmarks": full_pose(0.25, 0.75, 0.4, 0.6) });
        let estimate = service().measure_body(&img, &payload);
        assert_eq!(estimate.measurements.shoulder_width, 100.0);
        assert_eq!(estimate.measurements.hips, 48.0);
    }

    #[test]
    fn test_measurement_set_serializes_all_keys() {
        let value = serde_json::to_value(MeasurementSet::zeroed()).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 6);
        for key in ["chest", "waist", "hips", "shoulder_width", "arm_length", "leg_length"] {
            assert_eq!(value[key], 0.0);
        }
    }

    #[test]
    fn test_from_map_defaults_missing_keys() {
        let values = HashMap::from([("shoulder_width".to_string(), 64.0)]);
        let m = MeasurementSet::from_map(&values);
        assert_eq!(m.shoulder_width, 64.0);
        assert_eq!(m.chest, 0.0);
    }
}
