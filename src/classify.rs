//! Magnitude classification.
//!
//! Pure mappings from a magnitude to the visual attributes the views use:
//! marker color, marker radius and badge category. All three share one
//! five-bucket scale with inclusive lower bounds at 7, 6, 5 and 4.

use serde::Serialize;

/// Smallest marker radius, so that tiny events stay clickable.
pub const MIN_RADIUS: f64 = 5.0;

/// Radius growth per magnitude unit.
const RADIUS_PER_MAGNITUDE: f64 = 3.0;

/// Severity bucket for a magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Below 4.0, or no usable magnitude
    Low,
    /// 4.0 up to 5.0
    Moderate,
    /// 5.0 up to 6.0
    Elevated,
    /// 6.0 up to 7.0
    High,
    /// 7.0 and above
    SevereHigh,
}

/// A display color as a CSS hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Color(pub &'static str);

/// Discrete badge styling tag for table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BadgeCategory {
    #[serde(rename = "magnitude-7")]
    Magnitude7,
    #[serde(rename = "magnitude-6")]
    Magnitude6,
    #[serde(rename = "magnitude-5")]
    Magnitude5,
    #[serde(rename = "magnitude-4")]
    Magnitude4,
    #[serde(rename = "magnitude-low")]
    MagnitudeLow,
}

impl BadgeCategory {
    /// CSS class name for the badge.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Magnitude7 => "magnitude-7",
            Self::Magnitude6 => "magnitude-6",
            Self::Magnitude5 => "magnitude-5",
            Self::Magnitude4 => "magnitude-4",
            Self::MagnitudeLow => "magnitude-low",
        }
    }
}

/// Usable magnitude, or `None` when absent or not a finite number.
#[must_use]
pub fn usable(magnitude: Option<f64>) -> Option<f64> {
    magnitude.filter(|m| m.is_finite())
}

/// Bucket a magnitude, checking the highest threshold first.
///
/// Missing or non-numeric magnitudes fall into [`Severity::Low`].
#[must_use]
pub fn severity_for(magnitude: Option<f64>) -> Severity {
    match usable(magnitude) {
        Some(m) if m >= 7.0 => Severity::SevereHigh,
        Some(m) if m >= 6.0 => Severity::High,
        Some(m) if m >= 5.0 => Severity::Elevated,
        Some(m) if m >= 4.0 => Severity::Moderate,
        _ => Severity::Low,
    }
}

/// Marker color for a magnitude.
#[must_use]
pub fn color_for(magnitude: Option<f64>) -> Color {
    match severity_for(magnitude) {
        Severity::SevereHigh => Color("#8B0000"),
        Severity::High => Color("#FF0000"),
        Severity::Elevated => Color("#FF6600"),
        Severity::Moderate => Color("#FFFF00"),
        Severity::Low => Color("#00FF00"),
    }
}

/// Marker radius: three units per magnitude, never below [`MIN_RADIUS`].
#[must_use]
pub fn radius_for(magnitude: Option<f64>) -> f64 {
    usable(magnitude).map_or(MIN_RADIUS, |m| {
        (m * RADIUS_PER_MAGNITUDE).max(MIN_RADIUS)
    })
}

/// Badge category for a magnitude.
#[must_use]
pub fn badge_category_for(magnitude: Option<f64>) -> BadgeCategory {
    match severity_for(magnitude) {
        Severity::SevereHigh => BadgeCategory::Magnitude7,
        Severity::High => BadgeCategory::Magnitude6,
        Severity::Elevated => BadgeCategory::Magnitude5,
        Severity::Moderate => BadgeCategory::Magnitude4,
        Severity::Low => BadgeCategory::MagnitudeLow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_buckets() {
        assert_eq!(color_for(Some(9.1)), Color("#8B0000"));
        assert_eq!(color_for(Some(6.5)), Color("#FF0000"));
        assert_eq!(color_for(Some(5.9)), Color("#FF6600"));
        assert_eq!(color_for(Some(4.2)), Color("#FFFF00"));
        assert_eq!(color_for(Some(3.99)), Color("#00FF00"));
        assert_eq!(color_for(Some(0.0)), Color("#00FF00"));
    }

    #[test]
    fn test_boundaries_belong_to_higher_bucket() {
        assert_eq!(severity_for(Some(7.0)), Severity::SevereHigh);
        assert_eq!(severity_for(Some(6.0)), Severity::High);
        assert_eq!(severity_for(Some(5.0)), Severity::Elevated);
        assert_eq!(severity_for(Some(4.0)), Severity::Moderate);

        assert_eq!(badge_category_for(Some(7.0)), BadgeCategory::Magnitude7);
        assert_eq!(badge_category_for(Some(6.0)), BadgeCategory::Magnitude6);
        assert_eq!(badge_category_for(Some(5.0)), BadgeCategory::Magnitude5);
        assert_eq!(badge_category_for(Some(4.0)), BadgeCategory::Magnitude4);
    }

    #[test]
    fn test_badge_matches_color_bucket() {
        for m in [0.0, 2.5, 4.0, 4.9, 5.0, 6.1, 7.0, 8.3] {
            let by_color = match color_for(Some(m)).0 {
                "#8B0000" => "magnitude-7",
                "#FF0000" => "magnitude-6",
                "#FF6600" => "magnitude-5",
                "#FFFF00" => "magnitude-4",
                _ => "magnitude-low",
            };
            assert_eq!(badge_category_for(Some(m)).css_class(), by_color, "m = {m}");
        }
    }

    #[test]
    fn test_radius() {
        assert!((radius_for(Some(0.0)) - 5.0).abs() < f64::EPSILON);
        assert!((radius_for(Some(10.0)) - 30.0).abs() < f64::EPSILON);
        assert!((radius_for(Some(7.2)) - 21.6).abs() < 1e-9);
        // Floor holds up to 5/3.
        assert!((radius_for(Some(1.5)) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_radius_monotonic() {
        let mut last = 0.0;
        for step in 0..=100 {
            let r = radius_for(Some(f64::from(step) / 10.0));
            assert!(r >= last);
            last = r;
        }
    }

    #[test]
    fn test_invalid_magnitude_is_lowest_bucket() {
        for m in [None, Some(f64::NAN), Some(f64::INFINITY)] {
            assert_eq!(severity_for(m), Severity::Low);
            assert_eq!(color_for(m), Color("#00FF00"));
            assert_eq!(badge_category_for(m), BadgeCategory::MagnitudeLow);
            assert!((radius_for(m) - MIN_RADIUS).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_badge_serializes_as_css_class() {
        let json = serde_json::to_string(&BadgeCategory::Magnitude5).unwrap();
        assert_eq!(json, "\"magnitude-5\"");
    }
}
