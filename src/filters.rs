use askama::Result;

// Custom template filters, used as `|money` in the panel pages.

/// Two decimals, `.` between thousands and `,` before the cents.
pub fn money<T: std::fmt::Display>(value: T) -> Result<String> {
    Ok(format_money(&format!("{:.2}", value)))
}

fn format_money(raw: &str) -> String {
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}{},{}", sign, grouped, frac_part)
}
