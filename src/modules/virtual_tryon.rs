use log::{debug, warn};
use opencv::core::{Mat, MatTraitConst, Size};
use opencv::imgproc;
use opencv::imgproc::{COLOR_BGR2GRAY, COLOR_BGRA2BGR, COLOR_GRAY2BGR, THRESH_BINARY, cvt_color, resize, threshold};
use crate::config::config::VirtualTryOnConfig;
use crate::error::{Result, SmartFitError};
use crate::helper::garment_helper::{GarmentPlacement, scale_factor};
use crate::modules::body_measurement::MeasurementSet;
use crate::utils::image::{encode_jpeg, to_jpeg_data_uri};

/// CompositeResult holds the JPEG encoded composite.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeResult {
    pub image: Vec<u8>,
    pub confidence: f64,
}

impl CompositeResult {
    pub fn to_data_uri(&self) -> String {
        to_jpeg_data_uri(&self.image)
    }
}

#[derive(Debug, Clone)]
pub struct VirtualTryOnService {
    config: VirtualTryOnConfig,
}

impl VirtualTryOnService {
    pub fn new(config: VirtualTryOnConfig) -> Self {
        VirtualTryOnService { config }
    }

    /// composite places the garment on the body and encodes the result as JPEG.
    ///
    /// # Arguments
    /// * `body` - BGR body image, owned by this call
    /// * `garment` - BGR garment image, owned by this call
    /// * `measurements` - body measurements, only `shoulder_width` is used
    ///
    /// # Returns
    /// * `Result<CompositeResult>`
    pub fn composite(&self, body: Mat, garment: Mat, measurements: &MeasurementSet) -> Result<CompositeResult> {
        let result = self.overlay_garment(&body, &garment, measurements)?;
        let image = encode_jpeg(&result, self.config.jpeg_quality)?;
        Ok(CompositeResult {
            image,
            confidence: self.config.confidence,
        })
    }

    /// overlay_garment returns a copy of `body` with the scaled garment pasted in.
    ///
    /// The garment is scaled by `shoulder_width / body width`, centered
    /// horizontally and dropped to a third of the body height. Near-black
    /// garment pixels (grayscale at or below the mask threshold) are treated
    /// as background and keep the body pixel. When masking fails the
    /// garment rectangle is copied unmasked if it fits, otherwise the body
    /// is returned untouched.
    pub fn overlay_garment(&self, body: &Mat, garment: &Mat, measurements: &MeasurementSet) -> Result<Mat> {
        let mut result = body.try_clone()?;
        let body_size = body.size()?;
        let garment_size = garment.size()?;

        let scale = scale_factor(measurements.shoulder_width, body_size.width, self.config.default_shoulder_width);
        let placement = GarmentPlacement::compute(body_size, garment_size, scale, self.config.vertical_offset_divisor);
        debug!("garment scale {scale:.4}, placement {placement:?}");

        if placement.is_empty() {
            warn!("scaled garment is empty ({}x{}), skipping compositing", placement.width, placement.height);
            return Ok(result)
        }
        if !placement.fits_within(body_size) {
            warn!("garment region {:?} exceeds body {}x{}, skipping compositing",
                placement.rect(), body_size.width, body_size.height);
            return Ok(result)
        }

        let mut resized_garment = Mat::default();
        resize(
            garment,
            &mut resized_garment,
            placement.size(),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        if let Err(e) = self.masked_overlay(&mut result, &resized_garment, &placement) {
            warn!("masked overlay failed, falling back to rectangular copy: {e}");
            if let Err(e) = self.rectangular_overlay(&mut result, &resized_garment, &placement, body_size) {
                warn!("rectangular overlay failed, skipping compositing: {e}");
                return Ok(body.try_clone()?)
            }
        }
        Ok(result)
    }

    fn masked_overlay(&self, result: &mut Mat, resized_garment: &Mat, placement: &GarmentPlacement) -> Result<()> {
        let mask = self.garment_mask(resized_garment)?;
        let mut roi = Mat::roi_mut(result, placement.rect())?;
        resized_garment.copy_to_masked(&mut roi, &mask)?;
        Ok(())
    }

    /// rectangular_overlay overwrites the whole destination region with the garment.
    ///
    /// Gray and BGRA garments are converted to BGR first. Any other type
    /// mismatch is an error: copying into a region of a different type would
    /// reallocate the destination instead of writing into the body.
    fn rectangular_overlay(&self, result: &mut Mat, resized_garment: &Mat, placement: &GarmentPlacement, body_size: Size) -> Result<()> {
        if !placement.fits_within(body_size) {
            return Err(SmartFitError::Compositing(format!(
                "garment region {:?} exceeds body {}x{}", placement.rect(), body_size.width, body_size.height
            )))
        }

        let garment = match (resized_garment.channels(), result.channels()) {
            (1, 3) => convert_color(resized_garment, COLOR_GRAY2BGR)?,
            (4, 3) => convert_color(resized_garment, COLOR_BGRA2BGR)?,
            _ => resized_garment.try_clone()?,
        };
        if garment.typ() != result.typ() {
            return Err(SmartFitError::Compositing(format!(
                "garment type {} does not match body type {}", garment.typ(), result.typ()
            )))
        }

        let mut roi = Mat::roi_mut(result, placement.rect())?;
        garment.copy_to(&mut roi)?;
        Ok(())
    }

    /// garment_mask marks pixels brighter than the threshold as garment foreground (255).
    fn garment_mask(&self, garment: &Mat) -> Result<Mat> {
        let mut garment_gray = Mat::default();
        cvt_color(garment, &mut garment_gray, COLOR_BGR2GRAY, 0)?;

        let mut mask = Mat::default();
        threshold(&garment_gray, &mut mask, self.config.mask_threshold, 255.0, THRESH_BINARY)?;
        Ok(mask)
    }
}

fn convert_color(img: &Mat, code: i32) -> Result<Mat> {
    let mut converted = Mat::default();
    cvt_color(img, &mut converted, code, 0)?;
    Ok(converted)
}
