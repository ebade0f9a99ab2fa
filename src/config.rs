//! Connection context and tuning knobs.
//!
//! Connection resolution follows the Databricks unified config conventions:
//! an explicit profile reads that section of `~/.databrickscfg`, otherwise
//! `DATABRICKS_HOST`/`DATABRICKS_TOKEN` win when both are set, otherwise the
//! `DEFAULT` section is used.

use crate::{gateway::GatewayError, jobs::RetryPolicy};
use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// Where and as whom to talk to the workspace
#[derive(Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub token: String,
    /// Profile the values came from, `None` for environment variables
    pub profile: Option<String>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("token", &"***")
            .field("profile", &self.profile)
            .finish()
    }
}

/// Tuning constants, all overridable from flags or environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub cache_ttl: Duration,
    pub parallel: usize,
    pub poll: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            parallel: 5,
            poll: RetryPolicy::default(),
        }
    }
}

/// Remove the query string (`?o=123`) and trailing slashes from a host URL
#[must_use]
pub fn sanitize_host(host: &str) -> String {
    let host = host.split_once('?').map_or(host, |(base, _)| base);
    host.trim().trim_end_matches('/').to_string()
}

/// Parse an INI-style config file into sections of lowercase keys
#[must_use]
pub fn parse_profiles(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }
    sections
}

/// Default location of the profile file, `DATABRICKS_CONFIG_FILE` aside
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".databrickscfg"))
}

/// Resolve the connection from the process environment
///
/// # Errors
///
/// Returns `GatewayError::Auth` if no host and token can be found
pub fn resolve(profile: Option<&str>) -> Result<Connection, GatewayError> {
    let config_file = std::env::var_os("DATABRICKS_CONFIG_FILE")
        .map(PathBuf::from)
        .or_else(default_config_file);
    resolve_with(profile, |key| std::env::var(key).ok(), config_file.as_deref())
}

/// Resolve the connection from `env` and the profile file at `config_file`
///
/// # Errors
///
/// Returns `GatewayError::Auth` naming the profile if the host or token is
/// missing or the profile does not exist
pub fn resolve_with(
    profile: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
    config_file: Option<&Path>,
) -> Result<Connection, GatewayError> {
    let nonempty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if profile.is_none()
        && let (Some(host), Some(token)) = (nonempty("DATABRICKS_HOST"), nonempty("DATABRICKS_TOKEN"))
    {
        debug!("using connection from environment");
        return Ok(Connection {
            host: sanitize_host(&host),
            token,
            profile: None,
        });
    }

    let name = profile.unwrap_or(DEFAULT_PROFILE);
    let content = config_file
        .and_then(|path| fs::read_to_string(path).ok())
        .unwrap_or_default();
    let sections = parse_profiles(&content);

    let Some(section) = sections.get(name) else {
        return Err(auth_error(name, "profile not found"));
    };
    let host = section
        .get("host")
        .filter(|h| !h.is_empty())
        .ok_or_else(|| auth_error(name, "no host configured"))?;
    let token = section
        .get("token")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| auth_error(name, "no token configured"))?;

    debug!(profile = name, "using connection from profile");
    Ok(Connection {
        host: sanitize_host(host),
        token: token.clone(),
        profile: Some(name.to_string()),
    })
}

fn auth_error(profile: &str, reason: &str) -> GatewayError {
    GatewayError::Auth(format!(
        "{reason} for profile '{profile}'. Re-authenticate with:\n  $ databricks auth login --profile {profile}"
    ))
}
