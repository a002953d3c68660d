use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};

/// Source of "now". Quota days are counted on the local calendar, timeline
/// and audit timestamps in UTC.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn local_now(&self) -> NaiveDateTime;

    /// Local calendar date as `YYYY-MM-DD`.
    fn today(&self) -> String {
        self.local_now().format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually advanced clock whose local time zone is UTC.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn local_now(&self) -> NaiveDateTime {
        self.now().naive_utc()
    }
}

/// Whole seconds until the next local midnight, never less than one.
pub fn seconds_until_midnight(local: NaiveDateTime) -> u64 {
    let next = local
        .date()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0));
    match next {
        Some(midnight) => (midnight - local).num_seconds().max(1) as u64,
        None => 86_400,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_formats_today_and_advances() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap());
        assert_eq!(clock.today(), "2024-01-01");
        clock.advance(Duration::minutes(2));
        assert_eq!(clock.today(), "2024-01-02");
    }

    #[test]
    fn seconds_until_midnight_counts_down() {
        let local = Utc
            .with_ymd_and_hms(2024, 1, 1, 23, 0, 0)
            .unwrap()
            .naive_utc();
        assert_eq!(seconds_until_midnight(local), 3600);

        let start_of_day = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().naive_utc();
        assert_eq!(seconds_until_midnight(start_of_day), 86_400);
    }
}
