//! Remote host geolocation.
//!
//! Lookups go through the external `geoiplookup` tool. Private addresses are
//! answered locally and a missing tool or database simply yields no data.

use ipnet::Ipv4Net;
use once_cell::sync::Lazy;
use std::env;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// 127.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
static PRIVATE_NETWORKS: Lazy<Vec<Ipv4Net>> = Lazy::new(|| {
    ["127.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"]
        .iter()
        .map(|net| net.parse().expect("failed to parse private network"))
        .collect()
});

/// Whether the host is an IPv4 address in one of the private ranges.
/// Host names never are.
pub fn is_private_host(host: &str) -> bool {
    match host.parse::<Ipv4Addr>() {
        Ok(addr) => PRIVATE_NETWORKS.iter().any(|net| net.contains(&addr)),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeoResult {
    pub country: Option<String>,
    pub city: Option<String>,
}

impl GeoResult {
    pub fn local() -> Self {
        Self {
            country: Some("Local".to_string()),
            city: Some("Local".to_string()),
        }
    }
}

/// Map a remote host to its origin
pub trait GeoResolver {
    /// `None` when no geolocation data is available
    fn resolve(&mut self, host: &str) -> Option<GeoResult>;
}

impl<R: GeoResolver + ?Sized> GeoResolver for &mut R {
    fn resolve(&mut self, host: &str) -> Option<GeoResult> {
        (**self).resolve(host)
    }
}

/// Kind of file access to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Execute,
}

pub fn has_access(path: &Path, access: Access) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    match access {
        Access::Read => {
            if metadata.is_dir() {
                fs::read_dir(path).is_ok()
            } else {
                fs::File::open(path).is_ok()
            }
        }
        Access::Execute => {
            if !metadata.is_file() {
                return false;
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                metadata.permissions().mode() & 0o111 != 0
            }
            #[cfg(not(unix))]
            {
                true
            }
        }
    }
}

/// Locate an executable the way a shell would: names containing a path
/// separator are used as is, bare names are searched in `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return has_access(candidate, Access::Execute).then(|| candidate.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|path| has_access(path, Access::Execute))
}

pub const DEFAULT_GEOTOOL: &str = "geoiplookup";
pub const DEFAULT_GEO_DATABASE: &str = "/usr/share/GeoIP/";

/// Resolver backed by the `geoiplookup` executable
#[derive(Debug, Clone)]
pub struct GeoIpLookup {
    executable: String,
    database: PathBuf,
}

impl GeoIpLookup {
    pub fn new(executable: impl Into<String>, database: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            database: database.into(),
        }
    }
}

impl GeoResolver for GeoIpLookup {
    fn resolve(&mut self, host: &str) -> Option<GeoResult> {
        if is_private_host(host) {
            return Some(GeoResult::local());
        }

        let Some(executable) = find_executable(&self.executable) else {
            debug!(executable = %self.executable, "Geolocation tool not found");
            return None;
        };
        if !has_access(&self.database, Access::Read) {
            debug!(database = %self.database.display(), "Geolocation database not readable");
            return None;
        }

        let output = match Command::new(&executable)
            .arg("-d")
            .arg(&self.database)
            .arg(host)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                debug!(host, error = %e, "Geolocation lookup failed to start");
                return None;
            }
        };
        if !output.status.success() {
            debug!(host, status = %output.status, "Geolocation lookup failed");
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Some(parse_geoiplookup_output(&stdout))
    }
}

/// Parse `geoiplookup` output.
///
/// ```text
/// GeoIP Country Edition: FI, Finland
/// GeoIP City Edition, Rev 1: FI, 18, Uusimaa, Helsinki, 00100, 60.1708, 24.9375, 0, 0
/// ```
pub fn parse_geoiplookup_output(output: &str) -> GeoResult {
    let lines: Vec<&str> = output.trim_end().split('\n').collect();
    let first = lines.first().copied().unwrap_or_default();

    let country = match first.split(", ").nth(1) {
        Some(country) => Some(country.trim().to_string()),
        None if first.contains("Address not found") => Some("Unknown".to_string()),
        None => None,
    };

    let city = lines.get(1).and_then(|line| {
        let tokens: Vec<&str> = line.split(", ").collect();
        let city = tokens.get(4)?;
        if city.contains("N/A") {
            if let (Some(lat), Some(lon)) = (tokens.get(6), tokens.get(7)) {
                return Some(format!("Unknown: {}, {}", lat, lon));
            }
        }
        Some(city.to_string())
    });

    GeoResult { country, city }
}

/// Wraps a resolver and remembers the last looked-up host, so a consecutive
/// run of the same host costs one lookup. A different host in between
/// forces a fresh lookup.
#[derive(Debug, Clone)]
pub struct CachedResolver<R> {
    inner: R,
    last: Option<(String, Option<GeoResult>)>,
}

impl<R: GeoResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, last: None }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: GeoResolver> GeoResolver for CachedResolver<R> {
    fn resolve(&mut self, host: &str) -> Option<GeoResult> {
        if let Some((cached_host, result)) = &self.last {
            if cached_host == host {
                return result.clone();
            }
        }
        let result = self.inner.resolve(host);
        self.last = Some((host.to_string(), result.clone()));
        result
    }
}
