//! Output field registry and per-run projection.

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use std::fmt::{self, Write as _};

use crate::error::ConfigError;

/// Default rendering of the `time` field
pub const DEFAULT_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    LogFileName,
    HttpStatus,
    RemoteHost,
    Country,
    City,
    Time,
    TimeDiff,
    UserAgent,
    HttpRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub name: &'static str,
    /// Minimum table column width
    pub width: Option<usize>,
    pub human_name: &'static str,
    pub default_included: bool,
}

pub static FIELD_REGISTRY: [FieldSpec; 9] = [
    FieldSpec {
        key: FieldKey::LogFileName,
        name: "log_file_name",
        width: None,
        human_name: "Log file name",
        default_included: false,
    },
    FieldSpec {
        key: FieldKey::HttpStatus,
        name: "http_status",
        width: Some(3),
        human_name: "Status",
        default_included: true,
    },
    FieldSpec {
        key: FieldKey::RemoteHost,
        name: "remote_host",
        width: Some(15),
        human_name: "Remote IP",
        default_included: true,
    },
    FieldSpec {
        key: FieldKey::Country,
        name: "country",
        width: Some(20),
        human_name: "Country",
        default_included: false,
    },
    FieldSpec {
        key: FieldKey::City,
        name: "city",
        width: Some(15),
        human_name: "City",
        default_included: false,
    },
    FieldSpec {
        key: FieldKey::Time,
        name: "time",
        width: Some(20),
        human_name: "Date/Time",
        default_included: true,
    },
    FieldSpec {
        key: FieldKey::TimeDiff,
        name: "time_diff",
        width: Some(8),
        human_name: "Time diff",
        default_included: true,
    },
    FieldSpec {
        key: FieldKey::UserAgent,
        name: "user_agent",
        width: None,
        human_name: "User agent",
        default_included: true,
    },
    FieldSpec {
        key: FieldKey::HttpRequest,
        name: "http_request",
        width: None,
        human_name: "Request",
        default_included: true,
    },
];

impl FieldKey {
    pub fn spec(self) -> &'static FieldSpec {
        // Registry order follows the enum declaration order
        &FIELD_REGISTRY[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FIELD_REGISTRY
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.key)
    }

    fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::from_name(name).ok_or_else(|| ConfigError::UnknownField {
            field: name.to_string(),
            accepted: accepted_values(),
        })
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comma separated list of every accepted field name
pub fn accepted_values() -> String {
    std::iter::once("all")
        .chain(FIELD_REGISTRY.iter().map(|spec| spec.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn normalize(names: &[String]) -> Vec<String> {
    names
        .iter()
        .flat_map(|name| name.split(','))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Fields selected for output, in registry order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    columns: Vec<FieldKey>,
    geolocation: bool,
}

impl Projection {
    /// Resolve the included set (empty means the default set) minus the
    /// excluded set. Requesting geolocation forces `country` and `city` in,
    /// and including either of them turns geolocation on.
    pub fn resolve(
        included: &[String],
        excluded: &[String],
        geolocation: bool,
    ) -> Result<Self, ConfigError> {
        let included = normalize(included);
        let excluded = normalize(excluded);

        let listed = included
            .iter()
            .filter(|name| *name != "all")
            .map(|name| FieldKey::parse(name))
            .collect::<Result<Vec<_>, _>>()?;

        if excluded.iter().any(|name| name == "all") {
            return Err(ConfigError::NoOutputFields);
        }

        let mut selected: Vec<FieldKey> = if included.is_empty() {
            FIELD_REGISTRY
                .iter()
                .filter(|spec| spec.default_included)
                .map(|spec| spec.key)
                .collect()
        } else if included.iter().any(|name| name == "all") {
            FIELD_REGISTRY.iter().map(|spec| spec.key).collect()
        } else {
            listed
        };

        let excluded = excluded
            .iter()
            .map(|name| FieldKey::parse(name))
            .collect::<Result<Vec<_>, _>>()?;
        selected.retain(|key| !excluded.contains(key));

        if selected.is_empty() {
            return Err(ConfigError::NoOutputFields);
        }

        if geolocation {
            selected.push(FieldKey::Country);
            selected.push(FieldKey::City);
        }

        let columns: Vec<FieldKey> = FIELD_REGISTRY
            .iter()
            .map(|spec| spec.key)
            .filter(|key| selected.contains(key))
            .collect();
        let geolocation = columns
            .iter()
            .any(|key| matches!(key, FieldKey::Country | FieldKey::City));

        Ok(Self {
            columns,
            geolocation,
        })
    }

    pub fn columns(&self) -> &[FieldKey] {
        &self.columns
    }

    pub fn geolocation(&self) -> bool {
        self.geolocation
    }

    pub fn position(&self, key: FieldKey) -> Option<usize> {
        self.columns.iter().position(|k| *k == key)
    }

    pub fn human_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|key| key.spec().human_name).collect()
    }
}

/// Check a sort-by field name against the requested and resolved fields
pub fn validate_sort_by(
    sort_by: &str,
    included: &[String],
    projection: &Projection,
) -> Result<FieldKey, ConfigError> {
    let key = FieldKey::parse(sort_by.trim())?;
    let included = normalize(included);

    let explicitly_listed =
        included.is_empty() || included.iter().any(|name| name == "all" || name == key.name());
    if !explicitly_listed || projection.position(key).is_none() {
        return Err(ConfigError::SortFieldNotIncluded);
    }
    Ok(key)
}

/// Reject formats chrono can't parse, and formats a naive timestamp can't
/// render (`%z`, `%Z` need an offset).
pub fn validate_time_format(format: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidTimeFormat(format.to_string());
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }

    let mut rendered = String::new();
    write!(
        rendered,
        "{}",
        NaiveDateTime::default().format_with_items(items.iter())
    )
    .map_err(|_| invalid())
}

/// Time since the previous accepted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeDiff {
    /// First accepted entry of the run
    First,
    /// Host changed since the previous accepted entry
    NewConnection,
    Seconds(i64),
}

impl fmt::Display for TimeDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeDiff::First => f.write_str("0"),
            TimeDiff::NewConnection => f.write_str("NEW_CONN"),
            TimeDiff::Seconds(secs) if *secs > 0 => write!(f, "+{}", secs),
            TimeDiff::Seconds(secs) => write!(f, "{}", secs),
        }
    }
}

/// One typed cell of a result row. Variant order puts missing values first
/// when a column is sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    Missing,
    Status(u16),
    Time(NaiveDateTime),
    Diff(TimeDiff),
    Text(String),
}

impl FieldValue {
    pub fn render(&self, time_format: &str) -> String {
        match self {
            FieldValue::Missing => String::new(),
            FieldValue::Status(status) => status.to_string(),
            FieldValue::Time(time) => time.format(time_format).to_string(),
            FieldValue::Diff(diff) => diff.to_string(),
            FieldValue::Text(text) => text.clone(),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Text)
    }
}
