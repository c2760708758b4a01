//! Display helpers shared by the CLI summary and the terminal UI.

/// Group thousands with commas and round to `decimals` places.
///
/// ```
/// use analyzer_core::formatting::format_number;
///
/// assert_eq!(format_number(12_480.0, 0), "12,480");
/// assert_eq!(format_number(83.333, 1), "83.3");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a scaled epsilon so exact binary midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let mut out = String::new();
    if negative && rounded != 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(&(rounded.trunc() as u64).to_string()));
    if decimals > 0 {
        let frac = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        // Skip the leading "0".
        out.push_str(&frac[1..]);
    }
    out
}

/// Format an XP amount: whole numbers without decimals, fractional values
/// with one decimal place.
///
/// ```
/// use analyzer_core::formatting::format_xp;
///
/// assert_eq!(format_xp(1250.0), "1,250 XP");
/// assert_eq!(format_xp(12.5), "12.5 XP");
/// ```
pub fn format_xp(value: f64) -> String {
    format!("{} XP", format_xp_value(value))
}

/// Same as [`format_xp`] without the unit suffix.
pub fn format_xp_value(value: f64) -> String {
    let decimals = if (value - value.round()).abs() < 1e-9 { 0 } else { 1 };
    format_number(value, decimals)
}

/// Render an optional ratio as a percentage, `n/a` when undefined.
///
/// ```
/// use analyzer_core::formatting::format_ratio;
///
/// assert_eq!(format_ratio(Some(0.8333)), "83.3%");
/// assert_eq!(format_ratio(None), "n/a");
/// ```
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{}%", format_number(r * 100.0, 1)),
        None => "n/a".to_string(),
    }
}

/// Render a percent change with an explicit sign.
pub fn format_change(percent: f64) -> String {
    if percent > 0.0 {
        format!("+{}%", format_number(percent, 1))
    } else {
        format!("{}%", format_number(percent, 1))
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let remainder = s.len() % 3;
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i != 0 && i % 3 == remainder {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
