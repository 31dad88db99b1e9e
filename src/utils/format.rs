//! Output formatting utilities

/// Cut `s` to at most `max_len` characters, marking the cut with `...`.
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(&"..."[..max_len.min(3)]);
    out
}

/// Format a currency amount rounded to whole units with thousands separators.
///
/// `210000.4` becomes `"210,000"`, `-1500.0` becomes `"-1,500"`.
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    #[allow(clippy::cast_possible_truncation)]
    let digits = (rounded.abs() as u64).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format a ratio as a percentage with one decimal, e.g. `0.125` -> `"12.5%"`.
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Format duration in human-readable form
pub fn format_duration(secs: f64) -> String {
    if secs >= 60.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = secs as u64;
        format!("{}m {}s", whole / 60, whole % 60)
    } else if secs >= 1.0 {
        format!("{secs:.1}s")
    } else {
        format!("{:.0}ms", secs * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_grouping() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(1000.0), "1,000");
        assert_eq!(format_amount(210_000.4), "210,000");
        assert_eq!(format_amount(1_234_567.0), "1,234,567");
        assert_eq!(format_amount(-1500.0), "-1,500");
    }

    #[test]
    fn percent_and_duration() {
        assert_eq!(format_percent(0.125), "12.5%");
        assert_eq!(format_duration(0.25), "250ms");
        assert_eq!(format_duration(2.5), "2.5s");
        assert_eq!(format_duration(125.0), "2m 5s");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate_string("negotiation", 8), "negot...");
        assert_eq!(truncate_string("short", 8), "short");
    }
}
