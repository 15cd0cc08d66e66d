use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

mod paginated;
mod pattern;

pub use paginated::{search, SearchPage};
pub use pattern::search_by_pattern;

/// Name that turns a search into an unfiltered scan when it leads the query list.
pub const WILDCARD: &str = "*";

fn default_version_range() -> String {
    WILDCARD.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageQuery {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version", default = "default_version_range")]
    pub version: String,
}

impl PackageQuery {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Two-level pagination position: which 50-row page to read, and how many
/// matches on that page the caller has already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub page_offset: i64,
    pub within_page_offset: i64,
}

impl Cursor {
    /// Returned once storage has nothing left to scan.
    pub const EXHAUSTED: Cursor = Cursor {
        page_offset: -1,
        within_page_offset: -1,
    };

    pub fn new(page_offset: i64, within_page_offset: i64) -> Self {
        Self {
            page_offset,
            within_page_offset,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.page_offset < 0 || self.within_page_offset < 0
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.page_offset, self.within_page_offset)
    }
}

impl FromStr for Cursor {
    type Err = Error;

    /// Parses `{page}-{within}`, where either side may be negative (`-1--1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidQuery(format!("Invalid offset {:?}", s));

        let split = s
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '-')
            .map(|(index, _)| index)
            .ok_or_else(invalid)?;
        let (page, within) = (&s[..split], &s[split + 1..]);

        let page_offset = page.parse::<i64>().map_err(|_| invalid())?;
        let within_page_offset = within.parse::<i64>().map_err(|_| invalid())?;
        if page_offset < -1 || within_page_offset < -1 {
            return Err(invalid());
        }

        Ok(Self::new(page_offset, within_page_offset))
    }
}
