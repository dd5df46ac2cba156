use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Category of an activity. Assigned once when a segment is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Game,
    Entertainment,
    Social,
    Browse,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Work,
        Category::Game,
        Category::Entertainment,
        Category::Social,
        Category::Browse,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Game => "game",
            Category::Entertainment => "entertainment",
            Category::Social => "social",
            Category::Browse => "browse",
            Category::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Game => "Games",
            Category::Entertainment => "Entertainment",
            Category::Social => "Social",
            Category::Browse => "Browsing",
            Category::Other => "Other",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Work => "💼",
            Category::Game => "🎮",
            Category::Entertainment => "🎬",
            Category::Social => "💬",
            Category::Browse => "🌐",
            Category::Other => "📁",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown category {s}"))
    }
}

/// A finished span of a single focused window, as produced by the window sampler. It becomes an
/// [ActivitySegment] once categorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSegment {
    pub window_title: String,
    pub process_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_seconds: i64,
}

/// Persisted form of a [WindowSegment].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySegment {
    pub window_title: String,
    pub process_name: String,
    pub category: Category,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_seconds: i64,
}

/// Keyboard and mouse activity for a single drain interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSnapshot {
    pub timestamp: NaiveDateTime,
    pub keyboard_count: u64,
    pub mouse_count: u64,
}

/// Minutes spent in every category for a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMinutes {
    pub work: i64,
    pub game: i64,
    pub entertainment: i64,
    pub social: i64,
    pub browse: i64,
    pub other: i64,
}

impl CategoryMinutes {
    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::Work => self.work,
            Category::Game => self.game,
            Category::Entertainment => self.entertainment,
            Category::Social => self.social,
            Category::Browse => self.browse,
            Category::Other => self.other,
        }
    }

    pub fn add(&mut self, category: Category, minutes: i64) {
        let slot = match category {
            Category::Work => &mut self.work,
            Category::Game => &mut self.game,
            Category::Entertainment => &mut self.entertainment,
            Category::Social => &mut self.social,
            Category::Browse => &mut self.browse,
            Category::Other => &mut self.other,
        };
        *slot += minutes;
    }

    pub fn total(&self) -> i64 {
        Category::ALL.iter().map(|v| self.get(*v)).sum()
    }
}

impl FromIterator<(Category, i64)> for CategoryMinutes {
    fn from_iter<T: IntoIterator<Item = (Category, i64)>>(iter: T) -> Self {
        let mut minutes = CategoryMinutes::default();
        for (category, value) in iter {
            minutes.add(category, value);
        }
        minutes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessUsage {
    pub process_name: String,
    pub category: Category,
    pub minutes: i64,
}

/// One row per date, always replaced as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub minutes: CategoryMinutes,
    pub total_active_minutes: i64,
    pub avg_activity_score: f64,
    pub mood_score: Option<f64>,
    pub stress_score: Option<f64>,
    pub summary_text: Option<String>,
    pub social_caption: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Amount of rows removed by a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub segments: usize,
    pub snapshots: usize,
}
