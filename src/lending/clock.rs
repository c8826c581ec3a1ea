use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{Datelike, Duration, NaiveDate, Utc};

/// Source of the current calendar date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, UTC calendar date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Settable clock for deterministic tests
#[derive(Debug)]
pub struct FixedClock {
    days_from_ce: AtomicI32,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { days_from_ce: AtomicI32::new(today.num_days_from_ce()) }
    }

    pub fn set(&self, today: NaiveDate) {
        self.days_from_ce.store(today.num_days_from_ce(), Ordering::SeqCst);
    }

    pub fn advance(&self, days: i64) {
        self.set(self.today() + Duration::days(days));
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        // Only ever stores values produced by num_days_from_ce
        NaiveDate::from_num_days_from_ce_opt(self.days_from_ce.load(Ordering::SeqCst))
            .unwrap_or(NaiveDate::MIN)
    }
}
