const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Human-readable rendering for earnings figures that span many orders of
/// magnitude.
pub fn format_magnitude(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value < 1e-6 {
        return scientific(value);
    }
    if value < 0.1 {
        return format!("{:.8}", value);
    }
    if value < 1.0 {
        return format!("{:.6}", value);
    }
    if value < 10.0 {
        return format!("{:.4}", value);
    }

    for (scale, suffix) in SUFFIXES {
        if value >= scale {
            return format!("{:.2}{}", value / scale, suffix);
        }
    }
    grouped(value)
}

/// Six fractional digits with an explicitly signed exponent (`e+3`, `e-8`).
fn scientific(value: f64) -> String {
    let rendered = format!("{:.6e}", value);
    match rendered.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => rendered,
    }
}

/// At most two fractional digits, trailing zeros dropped, `,` between
/// thousands.
fn grouped(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (trimmed, None),
    };

    let mut out = String::with_capacity(trimmed.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
