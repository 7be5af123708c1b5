//! Agricultural Seasons
//!
//! The three Indian cropping seasons and the calendar windows used to pick
//! historical weather for each of them.
//!
//! - Kharif (monsoon): June 1 to September 30
//! - Rabi (winter): October 1 to March 31, spanning the year boundary
//! - Zaid (summer): April 1 to June 30

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Kharif,
    Rabi,
    /// Also accepted as "summer"
    Zaid,
}

/// Inclusive date range of one occurrence of a season
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Season {
    pub const ALL: [Season; 3] = [Season::Kharif, Season::Rabi, Season::Zaid];

    /// Case-insensitive parse; "summer" is an alias for zaid
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kharif" => Some(Season::Kharif),
            "rabi" => Some(Season::Rabi),
            "zaid" | "summer" => Some(Season::Zaid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Kharif => "kharif",
            Season::Rabi => "rabi",
            Season::Zaid => "zaid",
        }
    }

    /// ((start_month, start_day), (end_month, end_day))
    fn bounds(self) -> ((u32, u32), (u32, u32)) {
        match self {
            Season::Kharif => ((6, 1), (9, 30)),
            Season::Rabi => ((10, 1), (3, 31)),
            Season::Zaid => ((4, 1), (6, 30)),
        }
    }

    /// True when the window starts in one calendar year and ends in the next
    pub fn spans_year_boundary(self) -> bool {
        let ((start_month, _), (end_month, _)) = self.bounds();
        start_month > end_month
    }

    /// The occurrence of this season whose end date falls in `year`
    pub fn window_ending_in(self, year: i32) -> Option<SeasonWindow> {
        let ((start_month, start_day), (end_month, end_day)) = self.bounds();
        let start_year = if self.spans_year_boundary() { year - 1 } else { year };

        Some(SeasonWindow {
            start: NaiveDate::from_ymd_opt(start_year, start_month, start_day)?,
            end: NaiveDate::from_ymd_opt(year, end_month, end_day)?,
        })
    }

    /// Latest occurrence of this season that ended strictly before `today`
    ///
    /// Historical archives only hold complete days, so a season still in
    /// progress falls back to the previous year's occurrence.
    pub fn last_completed_window(self, today: NaiveDate) -> Option<SeasonWindow> {
        let this_year = self.window_ending_in(today.year())?;
        if this_year.end < today {
            Some(this_year)
        } else {
            self.window_ending_in(today.year() - 1)
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Season {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Season::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown season '{}' (expected kharif, rabi or zaid)",
                raw
            ))
        })
    }
}
