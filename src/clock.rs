//! Current-date sources injected into the services

use std::sync::{
    atomic::{AtomicI32, Ordering},
    Mutex,
};

use chrono::{Datelike, Duration, Local, NaiveDate};

/// Source of "today" for the lending rules
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date that never moves backwards once observed
#[derive(Debug, Default)]
pub struct SystemClock {
    latest: AtomicI32,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        let now = Local::now().date_naive().num_days_from_ce();
        let latest = self.latest.fetch_max(now, Ordering::SeqCst).max(now);
        NaiveDate::from_num_days_from_ce_opt(latest).unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Settable clock for tests and demos
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.today.lock().unwrap_or_else(|e| e.into_inner()) = date;
    }

    pub fn advance_days(&self, days: i64) {
        let mut today = self.today.lock().unwrap_or_else(|e| e.into_inner());
        *today += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(|e| e.into_inner())
    }
}
