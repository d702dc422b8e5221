// Axis label formatting: compact suffixes for volume, two decimals for price.

/// Format a volume figure with a K/M/B suffix (e.g. `2.35M`).
///
/// Non-finite input renders as `N/A`.
pub fn format_volume(volume: f64) -> String {
    if !volume.is_finite() {
        return "N/A".to_string();
    }

    let abs = volume.abs();
    if abs >= 1e9 {
        format!("{:.2}B", volume / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", volume / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", volume / 1e3)
    } else {
        format!("{volume:.0}")
    }
}

pub fn format_price(price: f64) -> String {
    if price.is_finite() {
        format!("{price:.2}")
    } else {
        "N/A".to_string()
    }
}
