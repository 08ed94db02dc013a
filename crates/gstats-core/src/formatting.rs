/// Format `numerator / denominator` with three decimal places.
///
/// A zero denominator yields a bare `"0"` rather than `NaN` or `inf`.
///
/// # Examples
///
/// ```
/// use gstats_core::formatting::format_ratio;
///
/// assert_eq!(format_ratio(2, 3), "0.667");
/// assert_eq!(format_ratio(5, 2), "2.500");
/// assert_eq!(format_ratio(7, 0), "0");
/// ```
pub fn format_ratio(numerator: u32, denominator: u32) -> String {
    if denominator == 0 {
        return "0".to_string();
    }
    format!("{:.3}", f64::from(numerator) / f64::from(denominator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ratio_zero_denominator() {
        assert_eq!(format_ratio(0, 0), "0");
        assert_eq!(format_ratio(12, 0), "0");
    }

    #[test]
    fn test_format_ratio_zero_numerator() {
        assert_eq!(format_ratio(0, 5), "0.000");
    }

    #[test]
    fn test_format_ratio_rounds_to_three_decimals() {
        assert_eq!(format_ratio(1, 3), "0.333");
        assert_eq!(format_ratio(2, 3), "0.667");
        assert_eq!(format_ratio(13, 13), "1.000");
    }

    #[test]
    fn test_format_ratio_above_one() {
        assert_eq!(format_ratio(89, 21), "4.238");
    }
}
