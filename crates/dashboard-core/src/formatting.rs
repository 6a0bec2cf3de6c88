/// Format a number with a fixed number of decimals and custom separators.
///
/// # Examples
///
/// ```
/// use dashboard_core::formatting::format_number_with;
///
/// assert_eq!(format_number_with(1234.5, 1, ',', '.'), "1,234.5");
/// assert_eq!(format_number_with(1234567.0, 0, '.', ','), "1.234.567");
/// assert_eq!(format_number_with(-9876.5, 2, '.', ','), "-9.876,50");
/// ```
///
/// Grouping applies while `|value| * 10^decimals` fits in a `u128` (about
/// 3.4e38). Larger magnitudes and non-finite input fall back to plain
/// `{:.N}` output without separators.
pub fn format_number_with(value: f64, decimals: u32, group_sep: char, decimal_sep: char) -> String {
    // Handle the sign separately so the thousands grouping works on the
    // absolute value.
    let abs_value = value.abs();

    let factor = 10_f64.powi(decimals as i32);
    if !abs_value.is_finite() || abs_value * factor >= u128::MAX as f64 {
        return format!("{value:.prec$}", prec = decimals as usize);
    }

    // Round to integer units of the last decimal. The epsilon (relative to the
    // magnitude) keeps exact binary midpoints like 1.005 rounding up.
    let epsilon = f64::EPSILON * abs_value * factor;
    let scaled = ((abs_value * factor) + epsilon).round() as u128;

    let unit = 10_u128.pow(decimals);
    let integer_part = scaled / unit;
    let frac_part = scaled % unit;

    let grouped = group_thousands(&integer_part.to_string(), group_sep);

    let mut result = if decimals == 0 {
        grouped
    } else {
        format!(
            "{}{}{:0width$}",
            grouped,
            decimal_sep,
            frac_part,
            width = decimals as usize
        )
    };

    if value < 0.0 && scaled != 0 {
        result.insert(0, '-');
    }
    result
}

/// Brazilian number layout: `.` groups thousands, `,` marks decimals.
///
/// ```
/// use dashboard_core::formatting::format_number_br;
///
/// assert_eq!(format_number_br(1334.56, 2), "1.334,56");
/// assert_eq!(format_number_br(57.25, 1), "57,3");
/// ```
pub fn format_number_br(value: f64, decimals: u32) -> String {
    format_number_with(value, decimals, '.', ',')
}

/// Format an amount in Brazilian reais: `R$` prefix, two decimals.
///
/// ```
/// use dashboard_core::formatting::format_brl;
///
/// assert_eq!(format_brl(1334.56), "R$ 1.334,56");
/// assert_eq!(format_brl(0.0), "R$ 0,00");
/// assert_eq!(format_brl(-10.5), "R$ -10,50");
/// ```
pub fn format_brl(amount: f64) -> String {
    format!("R$ {}", format_number_br(amount, 2))
}

/// Render a 0..=1 share as a one-decimal percentage label (`"37.5%"`).
pub fn format_share(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert `sep` every three digits from the right of an integer string.
fn group_thousands(s: &str, sep: char) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(sep);
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
