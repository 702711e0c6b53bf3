use log::warn;
use serde::{Deserialize, Serialize};

/// A single body keypoint. `x`, `y` and `z` are normalized against the image
/// size, `visibility` is the detector's confidence for the point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Landmark { x, y, z, visibility }
    }
}

/// Canonical body-point roles in the order the pose landmark model emits them
/// (the 33-point BlazePose topology). Landmark sequences are indexed through
/// this enum rather than raw offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    /// Number of points in a complete detection.
    pub const COUNT: usize = 33;

    pub fn index(self) -> usize {
        self as usize
    }

    /// landmark looks up this role in a landmark sequence.
    pub fn landmark(self, landmarks: &[Landmark]) -> Option<&Landmark> {
        landmarks.get(self.index())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseData {
    pub landmarks: Vec<Landmark>,
    pub image_width: i32,
    pub image_height: i32,
}

/// parse_landmarks reads the `landmarks` array out of a pose payload.
///
/// A missing or malformed array is not an error: it is reported as an empty
/// sequence, which downstream stages handle as "no body detected".
///
/// # Arguments
/// * `pose_data` - JSON pose payload as produced by pose estimation
///
/// # Returns
/// * `Vec<Landmark>`
pub fn parse_landmarks(pose_data: &serde_json::Value) -> Vec<Landmark> {
    let raw = match pose_data.get("landmarks") {
        None => return vec![],
        Some(raw) => raw,
    };

    match Vec::<Landmark>::deserialize(raw) {
        Ok(landmarks) => landmarks,
        Err(e) => {
            warn!("ignoring malformed landmark payload: {e}");
            vec![]
        }
    }
}
