use opencv::core::{Rect, Size};

/// scale_factor returns the uniform garment scale for a body image.
///
/// A shoulder width that is missing, zero, negative or not finite is
/// replaced by `fallback_shoulder_width`, so the result is never zero or NaN
/// for a body image of positive width.
///
/// # Arguments
/// * `shoulder_width` - measured shoulder width in body-image pixels
/// * `body_width` - body image width in pixels
/// * `fallback_shoulder_width` - width used when the measurement is unusable
///
/// # Returns
/// * `f64`
pub fn scale_factor(shoulder_width: f64, body_width: i32, fallback_shoulder_width: f64) -> f64 {
    if body_width <= 0 {
        return 0.0
    }
    let shoulder_width = if shoulder_width.is_finite() && shoulder_width > 0.0 {
        shoulder_width
    } else {
        fallback_shoulder_width
    };
    shoulder_width / body_width as f64
}

/// GarmentPlacement is the destination rectangle of the resized garment on the body image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GarmentPlacement {
    pub x_offset: i32,
    pub y_offset: i32,
    pub width: i32,
    pub height: i32,
}

impl GarmentPlacement {

    /// compute scales the garment and places it horizontally centered,
    /// `body.height / vertical_divisor` from the top. Offsets are clamped into
    /// `[0, body - garment]`, and never below 0 when the garment is larger
    /// than the body.
    pub fn compute(body: Size, garment: Size, scale: f64, vertical_divisor: i32) -> Self {
        let width = scaled_dimension(garment.width, scale);
        let height = scaled_dimension(garment.height, scale);

        let x_offset = (body.width - width) / 2;
        let y_offset = if vertical_divisor > 0 { body.height / vertical_divisor } else { 0 };

        GarmentPlacement {
            x_offset: x_offset.min(body.width - width).max(0),
            y_offset: y_offset.min(body.height - height).max(0),
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x_offset, self.y_offset, self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// fits_within reports whether the whole destination region lies inside the body image.
    pub fn fits_within(&self, body: Size) -> bool {
        self.x_offset >= 0
            && self.y_offset >= 0
            && self.x_offset + self.width <= body.width
            && self.y_offset + self.height <= body.height
    }
}

fn scaled_dimension(length: i32, scale: f64) -> i32 {
    let scaled = (length as f64 * scale).round();
    if scaled.is_finite() && scaled > 0.0 {
        scaled.min(i32::MAX as f64) as i32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_factor() {
        assert_eq!(scale_factor(64.0, 640, 40.0), 0.1);
        assert_eq!(scale_factor(0.0, 400, 40.0), 0.1);
        assert_eq!(scale_factor(-3.0, 400, 40.0), 0.1);
        assert_eq!(scale_factor(f64::NAN, 400, 40.0), 0.1);
        assert_eq!(scale_factor(64.0, 0, 40.0), 0.0);
    }

    #[test]
    fn test_placement_reference_scenario() {
        let body = Size::new(640, 480);
        let garment = Size::new(200, 300);
        let scale = scale_factor(64.0, body.width, 40.0);
        let placement = GarmentPlacement::compute(body, garment, scale, 3);

        assert_eq!(placement, GarmentPlacement { x_offset: 310, y_offset: 160, width: 20, height: 30 });
        assert!(placement.fits_within(body));
        assert_eq!(placement.rect(), Rect::new(310, 160, 20, 30));
    }

    #[test]
    fn test_placement_clamps_into_body() {
        // tall garment: y offset is pulled up so the bottom edge stays inside
        let body = Size::new(100, 90);
        let placement = GarmentPlacement::compute(body, Size::new(50, 160), 0.5, 3);
        assert_eq!(placement.height, 80);
        assert_eq!(placement.y_offset, 10);
        assert!(placement.fits_within(body));
    }

    #[test]
    fn test_oversized_garment_does_not_fit() {
        let body = Size::new(100, 100);
        let placement = GarmentPlacement::compute(body, Size::new(300, 300), 1.0, 3);
        assert_eq!((placement.x_offset, placement.y_offset), (0, 0));
        assert!(!placement.fits_within(body));
    }

    #[test]
    fn test_tiny_garment_is_empty() {
        let placement = GarmentPlacement::compute(Size::new(640, 480), Size::new(2, 2), 0.1, 3);
        assert!(placement.is_empty());
    }

    #[test]
    fn test_placement_never_escapes_bounds() {
        let body = Size::new(320, 240);
        for shoulder in [1.0, 10.0, 40.0, 64.0, 100.0, 320.0] {
            for (gw, gh) in [(10, 10), (200, 300), (640, 100), (50, 900)] {
                let scale = scale_factor(shoulder, body.width, 40.0);
                let placement = GarmentPlacement::compute(body, Size::new(gw, gh), scale, 3);
                assert!(placement.x_offset >= 0 && placement.y_offset >= 0);
                if placement.width <= body.width && placement.height <= body.height {
                    assert!(placement.fits_within(body));
                }
            }
        }
    }
}
