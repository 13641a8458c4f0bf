use chrono::NaiveDate;

/// Format a follower count compactly: 950, 1.2k, 3.4M
pub fn format_count(count: u64) -> String {
    match count {
        0..=999 => count.to_string(),
        // 999_950 and up would round to "1000k"
        1_000..=999_949 => compact(count as f64 / 1_000.0, "k"),
        _ => compact(count as f64 / 1_000_000.0, "M"),
    }
}

fn compact(value: f64, suffix: &str) -> String {
    let rounded = format!("{:.1}", value);
    // "12.0k" reads worse than "12k"
    let trimmed = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{}{}", trimmed, suffix)
}

/// Format a signed daily change with an explicit sign: +12, -3, 0
pub fn format_change(change: i64) -> String {
    if change > 0 {
        format!("+{}", change)
    } else {
        change.to_string()
    }
}

/// Format a dollar amount with two decimals and thousands separators
pub fn format_money(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Format a date to a more readable format
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}
