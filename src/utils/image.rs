use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use opencv::core::{Mat, MatTraitConst, Vector};
use opencv::imgcodecs::{imdecode, imencode, IMREAD_COLOR, IMWRITE_JPEG_QUALITY};
use opencv::imgproc::{COLOR_BGR2RGB, cvt_color};
use crate::error::{Result, SmartFitError};

const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// strip_data_uri drops a `data:image/...;base64,` header when present.
pub fn strip_data_uri(image_data: &str) -> &str {
    match image_data.split_once(',') {
        Some((_, payload)) => payload,
        None => image_data,
    }
}

/// decode_base64_image turns a base64 (optionally data-URI) string into a BGR matrix.
///
/// # Arguments
/// * `image_data` - base64 encoded image, with or without a data-URI header
///
/// # Returns
/// * `Result<Mat>`
pub fn decode_base64_image(image_data: &str) -> Result<Mat> {
    let im_bytes = STANDARD
        .decode(strip_data_uri(image_data).trim())
        .map_err(|e| SmartFitError::Decode(format!("invalid base64 payload: {e}")))?;
    decode_image_bytes(&im_bytes)
}

pub fn decode_image_bytes(im_bytes: &[u8]) -> Result<Mat> {
    if im_bytes.is_empty() {
        return Err(SmartFitError::Decode("image payload is empty".to_string()))
    }

    let buffer = Vector::<u8>::from_slice(im_bytes);
    let img = imdecode(&buffer, IMREAD_COLOR)
        .map_err(|e| SmartFitError::Decode(e.to_string()))?;

    // imdecode signals unreadable data with an empty matrix rather than an error
    if img.empty() {
        return Err(SmartFitError::Decode("payload is not a supported image format".to_string()))
    }
    Ok(img)
}

pub fn convert_image_to_rgb(img: &Mat) -> Result<Mat> {
    let mut img_rgb = Mat::default();
    cvt_color(img, &mut img_rgb, COLOR_BGR2RGB, 0)?;
    Ok(img_rgb)
}

/// encode_jpeg compresses a BGR matrix to JPEG bytes.
pub fn encode_jpeg(img: &Mat, quality: i32) -> Result<Vec<u8>> {
    let mut buffer = Vector::<u8>::new();
    let params = Vector::<i32>::from_slice(&[IMWRITE_JPEG_QUALITY, quality]);
    let encoded = imencode(".jpg", img, &mut buffer, &params)
        .map_err(|e| SmartFitError::Encode(e.to_string()))?;
    if !encoded {
        return Err(SmartFitError::Encode("jpeg encoder rejected the image".to_string()))
    }
    Ok(buffer.to_vec())
}

pub fn to_jpeg_data_uri(jpeg: &[u8]) -> String {
    format!("{JPEG_DATA_URI_PREFIX}{}", STANDARD.encode(jpeg))
}

#[cfg(test)]
mod tests {
    use opencv::core::{CV_8UC3, Scalar};
    use super::*;

    fn solid_image(rows: i32, cols: i32, value: f64) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(value)).unwrap()
    }

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(strip_data_uri("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("QUJD"), "QUJD");
    }

    #[test]
    fn test_jpeg_data_uri_roundtrip_keeps_dimensions() {
        let img = solid_image(48, 64, 128.0);
        let jpeg = encode_jpeg(&img, 95).unwrap();
        let data_uri = to_jpeg_data_uri(&jpeg);
        assert!(data_uri.starts_with("data:image/jpeg;base64,"));

        let decoded = decode_base64_image(&data_uri).unwrap();
        assert_eq!(decoded.rows(), 48);
        assert_eq!(decoded.cols(), 64);
        assert_eq!(decoded.channels(), 3);

        let bare = STANDARD.encode(&jpeg);
        assert_eq!(decode_base64_image(&bare).unwrap().cols(), 64);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_base64_image("data:image/png;base64,@@@"), Err(SmartFitError::Decode(_))));
        assert!(matches!(decode_base64_image(&STANDARD.encode(b"not an image")), Err(SmartFitError::Decode(_))));
        assert!(matches!(decode_base64_image(""), Err(SmartFitError::Decode(_))));
    }

    #[test]
    fn test_convert_image_to_rgb_swaps_channels() {
        let img = Mat::new_rows_cols_with_default(2, 2, CV_8UC3, Scalar::new(10.0, 20.0, 30.0, 0.0)).unwrap();
        let rgb = convert_image_to_rgb(&img).unwrap();
        let px = *rgb.at_2d::<opencv::core::Vec3b>(0, 0).unwrap();
        assert_eq!((px[0], px[1], px[2]), (30, 20, 10));
    }
}
