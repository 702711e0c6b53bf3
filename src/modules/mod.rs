pub mod body_measurement;
pub mod landmark_provider;
pub mod pose_landmark_client;
pub mod virtual_tryon;
