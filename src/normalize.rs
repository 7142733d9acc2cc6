/// Markers the source uses for "no reading".
const MISSING_MARKERS: &[&str] = &["M", "MM"];

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Plain,
    /// Sustained speed optionally followed by a gust, e.g. `28G38`.
    WindSpeed,
}

fn present(raw: Option<&str>) -> Option<&str> {
    let s = raw?.trim();
    if s.is_empty() || MISSING_MARKERS.contains(&s) {
        None
    } else {
        Some(s)
    }
}

pub fn normalize_value(raw: Option<&str>, kind: ValueKind) -> Option<f64> {
    let s = present(raw)?;
    let primary = match kind {
        ValueKind::Plain => s,
        ValueKind::WindSpeed => leading_number(s),
    };
    primary.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn leading_number(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}

pub fn normalize_direction(raw: Option<&str>) -> Option<String> {
    let s = present(raw)?;
    if let Ok(degrees) = s.parse::<f64>() {
        return compass_label(degrees).map(str::to_string);
    }
    let label = s.to_ascii_uppercase();
    if COMPASS_POINTS.contains(&label.as_str()) {
        Some(label)
    } else {
        None
    }
}

pub fn compass_label(degrees: f64) -> Option<&'static str> {
    if !degrees.is_finite() || !(0.0..=360.0).contains(&degrees) {
        return None;
    }
    let sector = ((degrees / 22.5).round() as usize) % COMPASS_POINTS.len();
    Some(COMPASS_POINTS[sector])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_markers() {
        assert_eq!(normalize_value(Some("M"), ValueKind::Plain), None);
        assert_eq!(normalize_value(Some("MM"), ValueKind::Plain), None);
        assert_eq!(normalize_value(Some(""), ValueKind::Plain), None);
        assert_eq!(normalize_value(Some("   "), ValueKind::WindSpeed), None);
        assert_eq!(normalize_value(None, ValueKind::Plain), None);
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(normalize_value(Some("25.5"), ValueKind::Plain), Some(25.5));
        assert_eq!(normalize_value(Some(" -3 "), ValueKind::Plain), Some(-3.0));
        assert_eq!(normalize_value(Some("12in"), ValueKind::Plain), None);
        assert_eq!(normalize_value(Some("NaN"), ValueKind::Plain), None);
    }

    #[test]
    fn test_gust_suffix_is_discarded() {
        assert_eq!(normalize_value(Some("28G38"), ValueKind::WindSpeed), Some(28.0));
        assert_eq!(normalize_value(Some("7"), ValueKind::WindSpeed), Some(7.0));
        assert_eq!(normalize_value(Some("G15"), ValueKind::WindSpeed), None);
    }

    #[test]
    fn test_direction_labels() {
        assert_eq!(normalize_direction(Some("nw")), Some("NW".to_string()));
        assert_eq!(normalize_direction(Some("270")), Some("W".to_string()));
        assert_eq!(normalize_direction(Some("355")), Some("N".to_string()));
        assert_eq!(normalize_direction(Some("M")), None);
        assert_eq!(normalize_direction(Some("calm")), None);
    }

    #[test]
    fn test_compass_label_bounds() {
        assert_eq!(compass_label(0.0), Some("N"));
        assert_eq!(compass_label(360.0), Some("N"));
        assert_eq!(compass_label(135.0), Some("SE"));
        assert_eq!(compass_label(-1.0), None);
    }
}
