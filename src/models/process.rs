// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Process groups and scheduled processes.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::time_utils::{parse_date, parse_hhmm};

/// A named collection of users that processes are assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Member user IDs (Firebase UIDs)
    #[serde(default)]
    pub user_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Lifecycle of an uploaded process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// Written by an upload, no notifications generated yet
    Uploaded,
    /// Notification plans generated for the group members
    Assigned,
}

/// A plan scheduled for a group over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: String,
    /// Upload batch this process was created by
    pub batch_id: String,
    pub name: String,
    pub plan_id: String,
    pub group_id: String,
    /// First day (`YYYY-MM-DD`, inclusive)
    pub start_date: String,
    /// Last day (`YYYY-MM-DD`, inclusive)
    pub end_date: String,
    /// Local wall-clock time of the break (`HH:MM`)
    pub scheduled_time: String,
    #[serde(default)]
    pub include_weekends: bool,
    pub status: ProcessStatus,
    pub created_at: String,
    #[serde(default)]
    pub assigned_at: Option<String>,
}

impl Process {
    /// Every scheduled instant of this process, in UTC, in ascending order.
    ///
    /// Returns an empty list if the stored dates or time are malformed.
    pub fn occurrences(&self, offset: FixedOffset) -> Vec<DateTime<Utc>> {
        let (Some(start), Some(end), Some(time)) = (
            parse_date(&self.start_date),
            parse_date(&self.end_date),
            parse_hhmm(&self.scheduled_time),
        ) else {
            return Vec::new();
        };

        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.include_weekends || !is_weekend(*day))
            .filter_map(|day| day.and_time(time).and_local_timezone(offset).single())
            .map(|local| local.with_timezone(&Utc))
            .collect()
    }

    /// Occurrences strictly after `now`.
    pub fn future_occurrences(
        &self,
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        self.occurrences(offset)
            .into_iter()
            .filter(|at| *at > now)
            .collect()
    }

    /// Whether `day` falls inside the process date range.
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        match (parse_date(&self.start_date), parse_date(&self.end_date)) {
            (Some(start), Some(end)) => start <= day && day <= end,
            _ => false,
        }
    }
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}
