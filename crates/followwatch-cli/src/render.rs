//! Plain-text rendering of dashboards, ledgers and reports.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use followwatch_core::history::{
    available_months, average_daily_growth, milestone_costs, month_change, period_change, project,
    Period,
};
use followwatch_core::utils::{format_change, format_count, format_date, format_money};
use followwatch_core::{Dashboard, DashboardStatus, HistoryEntry};

use crate::args::Month;

fn status_label(status: DashboardStatus) -> &'static str {
    match status {
        DashboardStatus::Empty => "no data yet",
        DashboardStatus::Live => "live",
        DashboardStatus::Stale => "stale",
    }
}

/// Multi-line summary printed by `fetch`.
pub fn dashboard(dashboard: &Dashboard, today: NaiveDate) -> String {
    let mut out = String::new();
    let Some(profile) = &dashboard.profile else {
        return status_label(DashboardStatus::Empty).to_string();
    };

    let _ = writeln!(out, "@{}", profile.username);
    let _ = writeln!(
        out,
        "  Followers: {} ({})",
        profile.followers,
        status_label(dashboard.status)
    );
    for period in [Period::Today, Period::Week, Period::Month] {
        let change = period_change(&dashboard.history, today, period);
        let _ = writeln!(out, "  {}: {}", period.label(), format_change(change));
    }
    if dashboard.end_of_day_sync {
        let _ = writeln!(out, "  End-of-day count recorded for {}", format_date(today));
    }
    if let Some(error) = &dashboard.fetch_error {
        let _ = writeln!(out, "  Last fetch failed: {}", error);
    }
    out
}

/// One line per poll for `watch`.
pub fn watch_line(dashboard: &Dashboard, now: DateTime<Tz>) -> String {
    let followers = dashboard
        .followers()
        .map(format_count)
        .unwrap_or_else(|| "-".to_string());
    let today = period_change(&dashboard.history, now.date_naive(), Period::Today);
    format!(
        "[{}] {} ({} today) {}{}",
        now.format("%H:%M:%S"),
        followers,
        format_change(today),
        status_label(dashboard.status),
        if dashboard.end_of_day_sync { " [end of day]" } else { "" }
    )
}

/// The ledger table for `history`, newest day first.
pub fn history(entries: &[HistoryEntry], month: Option<Month>) -> String {
    let mut out = String::new();
    let selected: Vec<&HistoryEntry> = entries
        .iter()
        .filter(|e| month.map_or(true, |m| m.contains(e.date)))
        .collect();

    if selected.is_empty() {
        return "No history recorded.\n".to_string();
    }

    let _ = writeln!(out, "{:<12} {:>10} {:>8}", "Date", "Followers", "Change");
    for entry in selected.iter().rev() {
        let _ = writeln!(
            out,
            "{:<12} {:>10} {:>8}",
            entry.date,
            entry.followers,
            format_change(entry.change)
        );
    }

    match month {
        Some(m) => {
            let total = month_change(entries, m.year, m.month);
            let _ = writeln!(out, "\nNet for {}-{:02}: {}", m.year, m.month, format_change(total));
        }
        None => {
            let months = available_months(entries);
            let _ = writeln!(out, "\nMonths with data: {}", months.join(", "));
        }
    }
    out
}

pub struct ReportOptions {
    pub target: u64,
    pub cost_per_follower: f64,
    pub rate: Option<f64>,
}

/// Period totals, growth projection and milestone costs for `report`.
pub fn report(entries: &[HistoryEntry], today: NaiveDate, options: &ReportOptions) -> String {
    let mut out = String::new();
    let Some(current) = entries.last().map(|e| e.followers) else {
        return "No history recorded.\n".to_string();
    };

    let _ = writeln!(out, "Current followers: {}", current);
    for period in [Period::Today, Period::Week, Period::Month] {
        let change = period_change(entries, today, period);
        let _ = writeln!(out, "  {}: {}", period.label(), format_change(change));
    }

    let average = average_daily_growth(entries, today);
    let rate = options.rate.unwrap_or(average);
    let projection = project(entries, current, rate, options.target, today);

    let _ = writeln!(out, "\nAverage daily growth (last 7 days): {:.1}", average);
    let _ = writeln!(
        out,
        "Progress to {}: {:.1}%",
        format_count(options.target),
        projection.progress_percent(current)
    );
    match projection.estimated_date {
        Some(date) => {
            let _ = writeln!(
                out,
                "At {:.1}/day: {} days, around {}",
                rate,
                projection.days_to_target.unwrap_or_default(),
                format_date(date)
            );
        }
        None if current >= options.target => {
            let _ = writeln!(out, "Target reached");
        }
        None => {
            let _ = writeln!(out, "No projection without positive growth");
        }
    }

    let _ = writeln!(
        out,
        "\nMilestones at {} per follower:",
        format_money(options.cost_per_follower)
    );
    for milestone in milestone_costs(current, options.cost_per_follower) {
        match milestone.cost {
            Some(cost) => {
                let _ = writeln!(
                    out,
                    "  {:>6}: {} to go, {}",
                    format_count(milestone.target),
                    milestone.remaining,
                    format_money(cost)
                );
            }
            None => {
                let _ = writeln!(out, "  {:>6}: reached", format_count(milestone.target));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use followwatch_core::{Handle, Profile};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entries() -> Vec<HistoryEntry> {
        vec![
            HistoryEntry::new(date(2025, 5, 30), 9_000, 0),
            HistoryEntry::new(date(2025, 5, 31), 9_100, 100),
            HistoryEntry::new(date(2025, 6, 1), 9_150, 50),
        ]
    }

    fn live(followers: u64) -> Dashboard {
        let handle = Handle::parse("trawi.viajes").unwrap();
        Dashboard {
            profile: Some(Profile::from_count(&handle, followers)),
            history: entries(),
            status: DashboardStatus::Live,
            fetch_error: None,
            end_of_day_sync: false,
        }
    }

    #[test]
    fn test_dashboard_text() {
        let text = dashboard(&live(9_150), date(2025, 6, 1));
        assert!(text.starts_with("@trawi.viajes\n"));
        assert!(text.contains("Followers: 9150 (live)"));
        assert!(text.contains("Today: +50"));
        assert!(text.contains("Last 7 days: +150"));
    }

    #[test]
    fn test_watch_line() {
        let now = chrono_tz::America::Caracas
            .with_ymd_and_hms(2025, 6, 1, 23, 55, 0)
            .unwrap();
        let mut board = live(9_160);
        board.end_of_day_sync = true;
        assert_eq!(watch_line(&board, now), "[23:55:00] 9.2k (+50 today) live [end of day]");
    }

    #[test]
    fn test_history_filters_month() {
        let month = Month::parse("2025-05").unwrap();
        let text = history(&entries(), Some(month));
        assert!(text.contains("2025-05-31"));
        assert!(!text.contains("2025-06-01"));
        assert!(text.contains("Net for 2025-05: +100"));
    }

    #[test]
    fn test_history_empty() {
        assert_eq!(history(&[], None), "No history recorded.\n");
    }

    #[test]
    fn test_report_projection_and_milestones() {
        let options = ReportOptions {
            target: 10_000,
            cost_per_follower: 0.12,
            rate: None,
        };
        let text = report(&entries(), date(2025, 6, 1), &options);
        // Completed days before today: changes 0 and 100
        assert!(text.contains("Average daily growth (last 7 days): 50.0"));
        assert!(text.contains("At 50.0/day: 17 days"));
        assert!(text.contains("850 to go, $102.00"));
    }
}
