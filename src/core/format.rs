//! Number formatting for the Polish locale

const GROUP_SEPARATOR: char = '\u{a0}';

/// Formats `value` with exactly `decimals` fraction digits, a decimal comma and
/// non-breaking-space thousands grouping (only from five integer digits up, as
/// the pl-PL locale does). `NaN` is rendered as-is so bad upstream data stays
/// visible.
pub fn format_amount(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + 4);
    if value < 0.0 {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

fn group_digits(digits: &str) -> String {
    if digits.len() < 5 {
        return digits.to_string();
    }
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(ch);
    }
    grouped
}

/// Converts `amount` priced at `from_rate` into units priced at `to_rate`.
/// Returns 0 when any input is zero or not a number.
pub fn convert_currency(amount: f64, from_rate: f64, to_rate: f64) -> f64 {
    let unusable = |v: f64| v == 0.0 || v.is_nan();
    if unusable(amount) || unusable(from_rate) || unusable(to_rate) {
        return 0.0;
    }
    (amount * from_rate) / to_rate
}
