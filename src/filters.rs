use chrono::{Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

/// Input day syntax, e.g. `31-12-2020`
pub const DAY_FORMAT: &str = "%d-%m-%Y";

/// Recognized HTTP status codes, as inclusive ranges
const STATUS_CODE_RANGES: &[(u16, u16)] = &[
    (100, 103),
    (200, 208),
    (218, 218),
    (226, 226),
    (300, 308),
    (400, 431),
    (451, 451),
    (500, 511),
];

pub static VALID_STATUS_CODES: Lazy<Vec<u16>> = Lazy::new(|| {
    STATUS_CODE_RANGES
        .iter()
        .flat_map(|&(start, end)| start..=end)
        .collect()
});

/// A user status token resolved against the valid code table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMatch {
    /// Matched valid code, or the user token itself when nothing matched
    pub code: String,
    pub valid: bool,
}

/// Keeps entries whose final status matches one of the user tokens.
/// Tokens are regular expressions searched in each valid code, so `20`
/// selects 200-208 and `^4` every client error.
#[derive(Debug, Clone, Default)]
pub struct StatusFilter {
    matches: Vec<StatusMatch>,
}

impl StatusFilter {
    pub fn new(tokens: &[String]) -> Result<Self, ConfigError> {
        let mut matches = Vec::new();

        for token in tokens {
            let pattern = Regex::new(token).map_err(|e| ConfigError::InvalidStatusPattern {
                pattern: token.clone(),
                reason: e.to_string(),
            })?;

            let before = matches.len();
            matches.extend(
                VALID_STATUS_CODES
                    .iter()
                    .map(|code| code.to_string())
                    .filter(|code| pattern.is_match(code))
                    .map(|code| StatusMatch { code, valid: true }),
            );
            if matches.len() == before {
                matches.push(StatusMatch {
                    code: token.clone(),
                    valid: false,
                });
            }
        }

        Ok(Self { matches })
    }

    pub fn matches(&self) -> &[StatusMatch] {
        &self.matches
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn accepts(&self, status: u16) -> bool {
        if self.matches.is_empty() {
            return true;
        }
        self.matches
            .iter()
            .filter(|m| m.valid)
            .any(|m| m.code.parse::<u16>().ok() == Some(status))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CountryToken {
    name: String,
    negated: bool,
}

/// Country include/exclude list. `!Name` excludes, `Name` includes,
/// comparison ignores case.
#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    tokens: Vec<CountryToken>,
}

impl CountryFilter {
    pub fn new(tokens: &[String]) -> Self {
        let tokens = tokens
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| {
                // `\!Name` is what a shell leaves behind for an escaped `!`
                match t.strip_prefix("\\!").or_else(|| t.strip_prefix('!')) {
                    Some(name) => CountryToken {
                        name: name.to_lowercase(),
                        negated: true,
                    },
                    None => CountryToken {
                        name: t.to_lowercase(),
                        negated: false,
                    },
                }
            })
            .collect();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// A negated match excludes and stops; a positive match includes and
    /// stops; a negated token that doesn't match leans towards inclusion.
    pub fn accepts(&self, country: Option<&str>) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let country = country.unwrap_or_default().to_lowercase();

        let mut skip = true;
        for token in &self.tokens {
            if token.negated {
                if token.name == country {
                    skip = true;
                    break;
                }
                skip = false;
            } else if token.name == country {
                skip = false;
                break;
            }
        }
        !skip
    }
}

/// Excludes entries at or outside the configured days.
/// Bounds are midnight of the given day.
#[derive(Debug, Clone, Default)]
pub struct DateFilter {
    lower: Option<NaiveDateTime>,
    upper: Option<NaiveDateTime>,
}

pub fn parse_day(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT)
        .map_err(|_| ConfigError::InvalidDay(value.to_string()))
}

impl DateFilter {
    pub fn new(
        lower: Option<NaiveDate>,
        upper: Option<NaiveDate>,
        now: NaiveDateTime,
    ) -> Result<Self, ConfigError> {
        let lower = lower.and_then(|d| d.and_hms_opt(0, 0, 0));
        let upper = upper.and_then(|d| d.and_hms_opt(0, 0, 0));

        if let (Some(lower), Some(upper)) = (lower, upper) {
            if lower > upper {
                return Err(ConfigError::DayBoundsInverted);
            }
        }
        if upper.is_some_and(|u| u > now) || lower.is_some_and(|l| l > now) {
            return Err(ConfigError::DayInFuture);
        }

        Ok(Self { lower, upper })
    }

    /// Parse `DD-MM-YYYY` bounds and validate them against the current time
    pub fn from_days(lower: Option<&str>, upper: Option<&str>) -> Result<Self, ConfigError> {
        let lower = lower.map(parse_day).transpose()?;
        let upper = upper.map(parse_day).transpose()?;
        Self::new(lower, upper, Local::now().naive_local())
    }

    pub fn accepts(&self, time: NaiveDateTime) -> bool {
        if self.lower.is_some_and(|lower| time <= lower) {
            return false;
        }
        if self.upper.is_some_and(|upper| time >= upper) {
            return false;
        }
        true
    }
}

/// All per-entry predicates of a run
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    pub status: StatusFilter,
    pub country: CountryFilter,
    pub date: DateFilter,
}
