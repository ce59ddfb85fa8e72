//! Deadline scheduling for study batches.

use chrono::{DateTime, Duration, Local, LocalResult, TimeZone};

/// Hour of day every deadline lands on.
const DEADLINE_HOUR: u32 = 9;

/// Days granted for a batch, by summed topic weight.
///
/// Up to 10 gets 2 days, 11 through 14 gets 3, 15 and above gets 4.
pub fn days_for_total_weight(total_weight: u32) -> i64 {
    match total_weight {
        0..=10 => 2,
        11..=14 => 3,
        _ => 4,
    }
}

/// The deadline `days` calendar days after `now`, at 09:00 local time.
pub fn deadline_from(now: DateTime<Local>, days: i64) -> DateTime<Local> {
    let date = now.date_naive() + Duration::days(days);
    let Some(target) = date.and_hms_opt(DEADLINE_HOUR, 0, 0) else {
        return now + Duration::days(days);
    };

    match Local.from_local_datetime(&target) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // 09:00 skipped by a DST jump: take the first valid minute after it.
        LocalResult::None => (1..=180)
            .find_map(|m| {
                Local
                    .from_local_datetime(&(target + Duration::minutes(m)))
                    .earliest()
            })
            .unwrap_or(now + Duration::days(days)),
    }
}

/// Short calendar label for a deadline, e.g. `Deadline: Mon, Feb 16`.
pub fn format_deadline(deadline: DateTime<Local>) -> String {
    format!("Deadline: {}", deadline.format("%a, %b %-d"))
}

/// Where the clock stands relative to a batch deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// More than a day remains.
    Scheduled,
    /// Within a day of the deadline, or up to 12 hours past it.
    QuizActive,
    /// More than 12 hours past the deadline.
    Overdue,
}

impl Countdown {
    pub fn at(deadline: DateTime<Local>, now: DateTime<Local>) -> Self {
        const HOUR_MS: i64 = 3_600_000;
        let ms_left = deadline.signed_duration_since(now).num_milliseconds();
        if ms_left > 24 * HOUR_MS {
            Self::Scheduled
        } else if ms_left > -12 * HOUR_MS {
            Self::QuizActive
        } else {
            Self::Overdue
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled Window",
            Self::QuizActive => "Time to Test",
            Self::Overdue => "Missed Deadline",
        }
    }

    /// Headline text; scheduled batches show their deadline label.
    pub fn headline<'a>(&self, range_str: &'a str) -> &'a str {
        match self {
            Self::Scheduled => range_str,
            Self::QuizActive => "QUIZ ACTIVE",
            Self::Overdue => "OVERDUE",
        }
    }

    pub fn is_alert(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}
