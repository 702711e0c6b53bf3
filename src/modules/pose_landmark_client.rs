use std::time::Duration;
use async_trait::async_trait;
use log::{debug, warn};
use ndarray::{Array2, Array3, Array4, Axis};
use opencv::core::{CV_8UC3, Mat, MatTraitConst, Rect, Scalar, Size, Vec3b};
use opencv::imgproc;
use opencv::imgproc::resize;
use crate::config::config::PoseEstimationConfig;
use crate::error::{Result, SmartFitError};
use crate::modules::landmark_provider::LandmarkProvider;
use crate::triton_client::client::triton::model_infer_request::InferInputTensor;
use crate::triton_client::client::triton::{InferTensorContents, ModelInferRequest, ModelInferResponse, ModelMetadataResponse};
use crate::triton_client::client::TritonInferenceClient;
use crate::utils::coordinate::Landmark;
use crate::utils::image::convert_image_to_rgb;
use crate::utils::utils::{sigmoid, u8_to_f32_vec};

/// PoseLandmarkClient runs a single-person body landmark model on an inference server.
#[derive(Debug, Clone)]
pub struct PoseLandmarkClient {
    triton_infer_client: TritonInferenceClient,
    triton_model_metadata: ModelMetadataResponse,
    model_name: String,
    imsize: (i32, i32),
    channels_first: bool,
    landmark_output: String,
    presence_output: Option<String>,
    num_landmarks: usize,
    values_per_landmark: usize,
    min_detection_confidence: f32,
}

impl PoseLandmarkClient {
    pub fn new(triton_infer_client: TritonInferenceClient,
               triton_model_metadata: ModelMetadataResponse,
               config: PoseEstimationConfig
    ) -> Self {
        PoseLandmarkClient {
            triton_infer_client,
            triton_model_metadata,
            model_name: config.model_name,
            imsize: config.imsize,
            channels_first: config.channels_first,
            landmark_output: config.landmark_output,
            presence_output: config.presence_output,
            num_landmarks: config.num_landmarks,
            values_per_landmark: config.values_per_landmark,
            min_detection_confidence: config.min_detection_confidence,
        }
    }

    /// connect opens the server channel and fetches the model metadata.
    pub async fn connect(config: PoseEstimationConfig) -> Result<Self> {
        config.validate()?;
        let client = TritonInferenceClient::connect(&config.url, Duration::from_secs(config.timeout)).await?;
        let metadata = client.model_metadata(&config.model_name).await?;
        debug!("loaded metadata for pose model {}: {} input(s), {} output(s)",
            metadata.name, metadata.inputs.len(), metadata.outputs.len());
        Ok(PoseLandmarkClient::new(client, metadata, config))
    }

    /// preprocess letterboxes the image into the model input.
    ///
    /// The image keeps its aspect ratio, is anchored at the top-left corner and
    /// the remainder is zero padded. Pixels are RGB scaled into `[0, 1]`.
    ///
    /// # Arguments
    /// * `img` - BGR image
    ///
    /// # Returns
    /// * `(Array4<f32>, f32)` - the batched input tensor and the resize ratio
    fn preprocess(&self, img: &Mat) -> Result<(Array4<f32>, f32)> {
        let img_rgb = convert_image_to_rgb(img)?;
        let (img_w, img_h) = (img_rgb.cols(), img_rgb.rows());
        let (model_w, model_h) = self.imsize;

        let ratio = f32::min(model_w as f32 / img_w as f32, model_h as f32 / img_h as f32);
        let new_width = ((img_w as f32 * ratio) as i32).clamp(1, model_w);
        let new_height = ((img_h as f32 * ratio) as i32).clamp(1, model_h);

        let mut img_resized = Mat::default();
        resize(
            &img_rgb,
            &mut img_resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut img_scaled = Mat::new_rows_cols_with_default(model_h, model_w, CV_8UC3, Scalar::all(0.0))?;
        {
            let mut roi = Mat::roi_mut(&mut img_scaled, Rect::new(0, 0, new_width, new_height))?;
            img_resized.copy_to(&mut roi)?;
        }

        let mut im_tensor = Array3::<f32>::zeros((model_h as usize, model_w as usize, 3));
        for y in 0..model_h {
            for x in 0..model_w {
                let pixel = img_scaled.at_2d::<Vec3b>(y, x)?;
                for c in 0..3 {
                    im_tensor[[y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
                }
            }
        }

        let im_tensor = if self.channels_first {
            im_tensor.permuted_axes([2, 0, 1])
        } else {
            im_tensor
        };
        Ok((im_tensor.insert_axis(Axis(0)), ratio))
    }

    async fn infer(&self, input_tensor: &Array4<f32>) -> Result<(Vec<f32>, Option<f32>)> {
        let input_cfg = self.triton_model_metadata.inputs.first().ok_or_else(|| {
            SmartFitError::Provider(format!("pose model {} declares no inputs", self.model_name))
        })?;

        let model_input = InferInputTensor {
            name: input_cfg.name.to_string(),
            datatype: "FP32".to_string(),
            shape: input_tensor.shape().iter().map(|&x| x as i64).collect(),
            parameters: Default::default(),
            contents: Some(InferTensorContents {
                fp32_contents: input_tensor.iter().copied().collect(),
                ..Default::default()
            }),
        };
        let model_request = ModelInferRequest {
            model_name: self.model_name.to_owned(),
            model_version: "".to_string(),
            id: "".to_string(),
            parameters: Default::default(),
            inputs: vec![model_input],
            outputs: vec![],
            raw_input_contents: vec![],
        };

        let response = self.triton_infer_client.model_infer(model_request).await?;
        let landmarks = output_values(&response, &self.landmark_output).ok_or_else(|| {
            SmartFitError::Provider(format!("pose model {} returned no {} output", self.model_name, self.landmark_output))
        })?;
        let presence = self.presence_output
            .as_deref()
            .and_then(|name| output_values(&response, name))
            .and_then(|values| values.first().copied());

        Ok((landmarks, presence))
    }

    /// postprocess maps raw model landmarks back to normalized image coordinates.
    ///
    /// Rows are `(x, y, z, visibility, ...)` in model-input pixels. Returns an
    /// empty sequence when the presence score is below the detection threshold
    /// or the model produced fewer rows than a full body.
    ///
    /// # Arguments
    /// * `raw` - flattened landmark tensor
    /// * `presence` - raw pose presence logit, when the model has one
    /// * `ratio` - resize ratio applied by `preprocess`
    /// * `img_size` - original `(width, height)`
    ///
    /// # Returns
    /// * `Result<Vec<Landmark>>`
    fn postprocess(&self, raw: &[f32], presence: Option<f32>, ratio: f32, img_size: (i32, i32)) -> Result<Vec<Landmark>> {
        if let Some(logit) = presence {
            let score = sigmoid(logit);
            if score < self.min_detection_confidence {
                debug!("no body detected, presence score {score:.3}");
                return Ok(vec![])
            }
        }

        let stride = self.values_per_landmark;
        if stride < 2 {
            return Err(SmartFitError::Config(format!("pose model rows need at least x and y, got {stride} value(s) per landmark")))
        }
        let rows = raw.len() / stride;
        if rows < self.num_landmarks {
            warn!("pose model returned {rows} landmarks, expected {}", self.num_landmarks);
            return Ok(vec![])
        }

        let points = Array2::from_shape_vec((rows, stride), raw[..rows * stride].to_vec())?;
        let (img_w, img_h) = (img_size.0 as f32, img_size.1 as f32);

        let landmarks = points
            .outer_iter()
            .take(self.num_landmarks)
            .map(|row| {
                let x = row[0] / ratio / img_w;
                let y = row[1] / ratio / img_h;
                let z = if stride > 2 { row[2] / ratio / img_w } else { 0.0 };
                let visibility = if stride > 3 { sigmoid(row[3]) } else { 1.0 };
                Landmark::new(
                    x.clamp(0.0, 1.0) as f64,
                    y.clamp(0.0, 1.0) as f64,
                    z as f64,
                    visibility as f64,
                )
            })
            .collect();
        Ok(landmarks)
    }
}

#[async_trait]
impl LandmarkProvider for PoseLandmarkClient {
    async fn detect(&self, img: Mat) -> Result<Vec<Landmark>> {
        let img_size = (img.cols(), img.rows());
        if img_size.0 <= 0 || img_size.1 <= 0 {
            return Err(SmartFitError::Decode("cannot detect landmarks on an empty image".to_string()))
        }

        let (input_tensor, ratio) = self.preprocess(&img)?;
        let (raw, presence) = self.infer(&input_tensor).await?;
        let landmarks = self.postprocess(&raw, presence, ratio, img_size)?;
        debug!("pose model returned {} landmarks for {}x{}", landmarks.len(), img_size.0, img_size.1);
        Ok(landmarks)
    }

    async fn is_ready(&self) -> bool {
        match self.triton_infer_client.model_ready(&self.model_name).await {
            Ok(ready) => ready,
            Err(e) => {
                warn!("pose model {} is unavailable: {e}", self.model_name);
                false
            }
        }
    }
}

/// output_values reads a named FP32 output, preferring the raw byte payload.
fn output_values(response: &ModelInferResponse, name: &str) -> Option<Vec<f32>> {
    let idx = response.outputs.iter().position(|output| output.name == name)?;
    if let Some(raw) = response.raw_output_contents.get(idx) {
        return Some(u8_to_f32_vec(raw))
    }
    response.outputs[idx]
        .contents
        .as_ref()
        .map(|contents| contents.fp32_contents.clone())
}
