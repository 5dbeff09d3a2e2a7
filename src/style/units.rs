//! Length conversions between configuration units and WordprocessingML units.

/// Twentieths of a point per inch.
pub const TWIPS_PER_INCH: f64 = 1440.0;
/// English Metric Units per inch (DrawingML).
pub const EMU_PER_INCH: f64 = 914_400.0;
pub const CM_PER_INCH: f64 = 2.54;

pub fn cm_to_inches(cm: f64) -> f64 {
    cm / CM_PER_INCH
}

pub fn inches_to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

pub fn cm_to_twips(cm: f64) -> i64 {
    (cm_to_inches(cm) * TWIPS_PER_INCH).round() as i64
}

pub fn inches_to_twips(inches: f64) -> i64 {
    (inches * TWIPS_PER_INCH).round() as i64
}

pub fn pt_to_twips(pt: f64) -> i64 {
    (pt * 20.0).round() as i64
}

/// Font sizes are written in half-points.
pub fn pt_to_half_points(pt: f64) -> i64 {
    (pt * 2.0).round() as i64
}

/// Border widths are written in eighths of a point.
pub fn pt_to_eighths(pt: f64) -> i64 {
    (pt * 8.0).round() as i64
}

pub fn cm_to_emu(cm: f64) -> i64 {
    (cm_to_inches(cm) * EMU_PER_INCH).round() as i64
}

/// Pixels at a given DPI for a length in centimeters.
pub fn cm_to_pixels(cm: f64, dpi: u32) -> u32 {
    (cm_to_inches(cm) * f64::from(dpi)).round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(cm_to_twips(2.54), 1440);
        assert_eq!(inches_to_twips(0.5), 720);
        assert_eq!(pt_to_twips(12.0), 240);
        assert_eq!(pt_to_half_points(10.5), 21);
        assert_eq!(pt_to_eighths(0.5), 4);
        assert_eq!(cm_to_emu(2.54), 914_400);
        assert_eq!(cm_to_pixels(2.54, 150), 150);
        assert!((inches_to_cm(1.0) - 2.54).abs() < 1e-9);
    }
}
