//! Growth projection and milestone costing.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::HistoryEntry;

/// Follower milestones the cost calculator reports on.
pub const MILESTONES: [u64; 6] = [10_000, 20_000, 50_000, 100_000, 500_000, 1_000_000];

/// Projection stops after this many days.
const MAX_PROJECTION_DAYS: u32 = 730;

/// Projection runs this far past the target before stopping.
const TARGET_OVERSHOOT: f64 = 1.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionPoint {
    pub date: NaiveDate,
    pub followers: u64,
    pub projected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub rate: f64,
    pub target: u64,
    pub days_to_target: Option<u64>,
    pub estimated_date: Option<NaiveDate>,
    /// Recorded history followed by projected days.
    pub points: Vec<ProjectionPoint>,
}

impl Projection {
    /// Share of `target` already reached, capped at 100.
    pub fn progress_percent(&self, current: u64) -> f64 {
        if self.target == 0 {
            return 100.0;
        }
        (current as f64 / self.target as f64 * 100.0).min(100.0)
    }
}

/// Project `history` forward at `rate` followers per day toward `target`.
///
/// Needs at least two recorded days to draw anything; with no positive rate
/// only the recorded points are returned.
pub fn project(
    history: &[HistoryEntry],
    current: u64,
    rate: f64,
    target: u64,
    today: NaiveDate,
) -> Projection {
    let days_to_target = if rate > 0.0 && current < target {
        Some(((target - current) as f64 / rate).ceil() as u64)
    } else {
        None
    };
    let estimated_date = days_to_target.map(|days| today + Duration::days(days as i64));

    let mut points = Vec::new();
    if history.len() >= 2 {
        points.extend(history.iter().map(|e| ProjectionPoint {
            date: e.date,
            followers: e.followers,
            projected: false,
        }));

        if rate > 0.0 {
            if let Some(last) = history.last() {
                let ceiling = target as f64 * TARGET_OVERSHOOT;
                let mut count = last.followers as f64;
                let mut date = last.date;
                let mut days = 0;

                while count < ceiling && days < MAX_PROJECTION_DAYS {
                    days += 1;
                    date += Duration::days(1);
                    count += rate;
                    points.push(ProjectionPoint {
                        date,
                        followers: count.round() as u64,
                        projected: true,
                    });
                }
            }
        }
    }

    Projection {
        rate,
        target,
        days_to_target,
        estimated_date,
        points,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneCost {
    pub target: u64,
    pub remaining: u64,
    /// `None` once the milestone has been reached.
    pub cost: Option<f64>,
}

impl MilestoneCost {
    pub fn is_completed(&self) -> bool {
        self.cost.is_none()
    }
}

/// What it would cost to buy the way to each milestone at `cost_per_follower`.
pub fn milestone_costs(current: u64, cost_per_follower: f64) -> Vec<MilestoneCost> {
    MILESTONES
        .iter()
        .map(|&target| {
            let remaining = target.saturating_sub(current);
            MilestoneCost {
                target,
                remaining,
                cost: (target > current).then(|| remaining as f64 * cost_per_follower),
            }
        })
        .collect()
}
