#![forbid(unsafe_code)]

//! Portfolio project records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use sitefx_core::Categorized;
use time::macros::format_description;
use time::{Date, Month};

/// Trade a project is filed under.
///
/// Wire names are the ones the content team publishes, including the
/// historical `"Weilding"` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum ProjectCategory {
    Construction,
    Infrastructure,
    #[serde(rename = "Boiler-Making")]
    BoilerMaking,
    #[serde(rename = "Weilding")]
    Welding,
}

impl ProjectCategory {
    /// Filter chips, in display order.
    pub const ALL: [Self; 4] = [
        Self::Construction,
        Self::Infrastructure,
        Self::BoilerMaking,
        Self::Welding,
    ];

    /// The published wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Construction => "Construction",
            Self::Infrastructure => "Infrastructure",
            Self::BoilerMaking => "Boiler-Making",
            Self::Welding => "Weilding",
        }
    }
}

impl fmt::Display for ProjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// A category name that matches no [`ProjectCategory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown project category `{}`", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Published,
    Draft,
}

/// Calendar date of a project, `YYYY-MM-DD` on the wire.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectDate(Date);

impl ProjectDate {
    /// `None` if the day does not exist in that month.
    #[must_use]
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = Month::try_from(month).ok()?;
        Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    #[must_use]
    pub fn month(&self) -> u8 {
        u8::from(self.0.month())
    }

    #[must_use]
    pub fn day(&self) -> u8 {
        self.0.day()
    }

    #[must_use]
    pub fn as_date(&self) -> Date {
        self.0
    }
}

impl From<Date> for ProjectDate {
    fn from(date: Date) -> Self {
        Self(date)
    }
}

/// A string that is not a valid `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDate(pub String);

impl fmt::Display for InvalidDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date `{}`, expected YYYY-MM-DD", self.0)
    }
}

impl std::error::Error for InvalidDate {}

impl FromStr for ProjectDate {
    type Err = InvalidDate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `[year]` would otherwise accept a leading sign.
        let unsigned = s.as_bytes().first().is_some_and(u8::is_ascii_digit)
            && s.bytes().all(|b| b.is_ascii_digit() || b == b'-');
        if !unsigned {
            return Err(InvalidDate(s.to_owned()));
        }
        Date::parse(s, format_description!("[year]-[month]-[day]"))
            .map(Self)
            .map_err(|_| InvalidDate(s.to_owned()))
    }
}

impl fmt::Display for ProjectDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year(),
            self.month(),
            self.day()
        )
    }
}

impl<'de> Deserialize<'de> for ProjectDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One portfolio entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    /// Route segment; unique within a catalog.
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    /// Pre-rendered HTML body.
    #[serde(default)]
    pub content: String,
    pub hero_image: String,
    pub category: ProjectCategory,
    #[serde(default)]
    pub author: String,
    pub date: ProjectDate,
    /// Pinned ahead of newer projects in featured lists.
    #[serde(rename = "isSticky", default)]
    pub sticky: bool,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    pub status: ProjectStatus,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub client: Option<String>,
}

impl Project {
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == ProjectStatus::Published
    }

    /// Gallery images, or the hero image alone when none are listed.
    #[must_use]
    pub fn images(&self) -> Vec<&str> {
        if self.gallery.is_empty() {
            vec![self.hero_image.as_str()]
        } else {
            self.gallery.iter().map(String::as_str).collect()
        }
    }
}

impl Categorized for Project {
    type Category = ProjectCategory;

    fn category(&self) -> &ProjectCategory {
        &self.category
    }
}
