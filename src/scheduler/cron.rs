//! Daily trigger at a fixed wall-clock time in a fixed UTC offset.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule as CronSchedule;

use crate::config::ScheduleConfig;
use crate::error::{BenchError, Result};

#[derive(Debug, Clone)]
pub struct DailySchedule {
    hour: u32,
    minute: u32,
    offset: FixedOffset,
    cron: CronSchedule,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32, offset: FixedOffset) -> Result<Self> {
        let invalid = || BenchError::InvalidScheduleTime {
            value: format!("{}:{}", hour, minute),
        };
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        // sec min hour day-of-month month day-of-week
        let expr = format!("0 {} {} * * *", minute, hour);
        let cron = CronSchedule::from_str(&expr).map_err(|_| invalid())?;
        Ok(Self {
            hour,
            minute,
            offset,
            cron,
        })
    }

    /// Parse `HH:MM` and `±HH:MM`.
    pub fn parse(time: &str, utc_offset: &str) -> Result<Self> {
        let (hour, minute) = parse_hh_mm(time).ok_or_else(|| BenchError::InvalidScheduleTime {
            value: time.to_string(),
        })?;
        let offset = parse_offset(utc_offset)?;
        Self::new(hour, minute, offset)
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Self::parse(&config.time, &config.utc_offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// First fire time strictly after `after`, in the schedule's offset.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        self.cron.after(&after.with_timezone(&self.offset)).next()
    }

    /// The next `count` fire times after `from`.
    pub fn upcoming(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<FixedOffset>> {
        self.cron
            .after(&from.with_timezone(&self.offset))
            .take(count)
            .collect()
    }
}

impl std::fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02} UTC{}", self.hour, self.minute, self.offset)
    }
}

fn parse_hh_mm(value: &str) -> Option<(u32, u32)> {
    let (h, m) = value.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour = h.parse::<u32>().ok()?;
    let minute = m.parse::<u32>().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

fn parse_offset(value: &str) -> Result<FixedOffset> {
    let invalid = || BenchError::InvalidUtcOffset {
        value: value.to_string(),
    };
    let trimmed = value.trim();
    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) if h.len() == 2 && m.len() == 2 => (
            h.parse::<i32>().map_err(|_| invalid())?,
            m.parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
