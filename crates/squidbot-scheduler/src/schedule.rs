use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SchedulerError};

/// One field of a five-field cron expression, expanded into a per-value
/// membership table at parse time so `is_due` is a handful of array reads.
#[derive(Debug, Clone)]
struct FieldMatch {
    min: u32,
    allowed: Vec<bool>,
}

impl FieldMatch {
    fn matches(&self, value: u32) -> bool {
        value >= self.min && self.allowed.get((value - self.min) as usize).copied().unwrap_or(false)
    }
}

/// A parsed `CronJob.schedule`: either five-field cron or the `every N`
/// interval form (N seconds).
#[derive(Debug, Clone)]
pub(crate) enum Schedule {
    Cron {
        minute: FieldMatch,
        hour: FieldMatch,
        day_of_month: FieldMatch,
        month: FieldMatch,
        day_of_week: FieldMatch,
    },
    Interval {
        seconds: i64,
    },
}

/// Parses a `CronJob.schedule` string. Accepts `every N` (interval seconds)
/// or a standard five-field `m h dom mon dow` cron expression with `*`,
/// lists (`a,b`), ranges (`a-b`), and steps (`*/n`, `a-b/n`).
pub(crate) fn parse_schedule(expr: &str) -> Result<Schedule> {
    let trimmed = expr.trim();
    if let Some(rest) = trimmed.strip_prefix("every ") {
        let seconds: i64 = rest.trim().parse().map_err(|_| SchedulerError::InvalidSchedule {
            expr: expr.to_string(),
            reason: format!("'{}' is not a valid interval in seconds", rest.trim()),
        })?;
        if seconds <= 0 {
            return Err(SchedulerError::InvalidSchedule {
                expr: expr.to_string(),
                reason: "interval must be positive".to_string(),
            });
        }
        return Ok(Schedule::Interval { seconds });
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(SchedulerError::InvalidSchedule {
            expr: expr.to_string(),
            reason: format!("expected 5 cron fields, found {}", fields.len()),
        });
    }

    Ok(Schedule::Cron {
        minute: parse_field(expr, fields[0], 0, 59)?,
        hour: parse_field(expr, fields[1], 0, 23)?,
        day_of_month: parse_field(expr, fields[2], 1, 31)?,
        month: parse_field(expr, fields[3], 1, 12)?,
        day_of_week: parse_field(expr, fields[4], 0, 6)?,
    })
}

fn parse_field(whole_expr: &str, spec: &str, min: u32, max: u32) -> Result<FieldMatch> {
    let mut allowed = vec![false; (max - min + 1) as usize];
    let invalid = |reason: String| SchedulerError::InvalidSchedule { expr: whole_expr.to_string(), reason };

    for part in spec.split(',') {
        let (range_part, step) = match part.split_once('/') {
            Some((r, s)) => {
                let step: u32 = s.parse().map_err(|_| invalid(format!("bad step in '{part}'")))?;
                (r, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range_part == "*" {
            (min, max)
        } else if let Some((a, b)) = range_part.split_once('-') {
            let a: u32 = a.parse().map_err(|_| invalid(format!("bad range start in '{part}'")))?;
            let b: u32 = b.parse().map_err(|_| invalid(format!("bad range end in '{part}'")))?;
            (a, b)
        } else {
            let v: u32 = range_part.parse().map_err(|_| invalid(format!("bad value '{part}'")))?;
            (v, v)
        };

        if start < min || end > max || start > end {
            return Err(invalid(format!("'{part}' out of range {min}-{max}")));
        }

        let step = step.unwrap_or(1).max(1);
        let mut v = start;
        while v <= end {
            allowed[(v - min) as usize] = true;
            v += step;
        }
    }

    Ok(FieldMatch { min, allowed })
}

fn truncate_to_minute<Tz: TimeZone>(dt: DateTime<Tz>) -> DateTime<Tz> {
    let tz = dt.timezone();
    tz.from_utc_datetime(&dt.naive_utc().date().and_hms_opt(dt.hour(), dt.minute(), 0).expect("valid time"))
}

/// Parses a `CronJob.timezone` string (e.g. `"UTC"`, `"America/New_York"`)
/// into a `chrono_tz::Tz`, falling back to UTC for an unrecognized name
/// rather than failing the whole tick.
pub(crate) fn parse_timezone(name: &str) -> Tz {
    name.parse().unwrap_or(chrono_tz::UTC)
}

/// Evaluates whether `schedule` fires at `now`, given the job's `last_run`
/// and `timezone`. Cron field matching and the once-per-minute dedup both
/// happen against `now`/`last_run` converted into `timezone`, per-job, so a
/// `0 9 * * *` job fires at 9am in the job's own zone rather than UTC.
pub(crate) fn is_due(schedule: &Schedule, now: DateTime<Utc>, last_run: Option<DateTime<Utc>>, timezone: Tz) -> bool {
    let now = now.with_timezone(&timezone);
    let last_run = last_run.map(|last| last.with_timezone(&timezone));

    match schedule {
        Schedule::Interval { seconds } => match last_run {
            None => true,
            Some(last) => (now - last).num_seconds() >= *seconds,
        },
        Schedule::Cron { minute, hour, day_of_month, month, day_of_week } => {
            if !minute.matches(now.minute())
                || !hour.matches(now.hour())
                || !day_of_month.matches(now.day())
                || !month.matches(now.month())
                || !day_of_week.matches(now.weekday().num_days_from_sunday())
            {
                return false;
            }
            match last_run {
                None => true,
                Some(last) => truncate_to_minute(last) < truncate_to_minute(now),
            }
        }
    }
}
