//! Field extraction from RouterOS command output.
//!
//! Parsing is line oriented and case-sensitive on keys; the first line that
//! yields a value for a field wins. A field missing from the output is
//! `None`, never an empty string.
//!
//! `key: value` fields use the same rule RouterOS tooling has always used
//! here: split the line on `:` and take the segment after the first colon.
//! A value that itself contains a colon is therefore truncated at it. This
//! is kept as-is so results match what operators have been seeing.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

/// Field keys.
pub const INSTALLED_VERSION: &str = "installed-version";
pub const LATEST_VERSION: &str = "latest-version";
pub const STATUS: &str = "status";
pub const CURRENT_FIRMWARE: &str = "current-firmware";
pub const UPGRADE_FIRMWARE: &str = "upgrade-firmware";

/// Status prefix RouterOS reports when a package update can be installed.
const UPDATE_AVAILABLE: &str = "new version is available";

static INSTALLED_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"installed-version\s*:\s*(\S+)").expect("Invalid regex pattern")
});

/// Package version state, from `/system package update print` or
/// `/system package update check-for-updates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub update_status: Option<String>,
}

impl VersionInfo {
    /// Parse every version field present in `output`.
    pub fn parse(output: &str) -> Self {
        let fields = parse_fields(output, &[LATEST_VERSION, STATUS]);
        Self {
            installed_version: parse_installed_version(output),
            latest_version: fields.get(LATEST_VERSION).cloned(),
            update_status: fields.get(STATUS).cloned(),
        }
    }

    /// Whether the status reports an installable package update.
    pub fn update_available(&self) -> bool {
        self.update_status
            .as_deref()
            .is_some_and(|status| status.trim().to_lowercase().starts_with(UPDATE_AVAILABLE))
    }
}

/// RouterBOARD bootloader state, from `/system routerboard print`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirmwareInfo {
    pub current_firmware: Option<String>,
    pub upgrade_firmware: Option<String>,
}

impl FirmwareInfo {
    pub fn parse(output: &str) -> Self {
        let mut fields = parse_fields(output, &[CURRENT_FIRMWARE, UPGRADE_FIRMWARE]);
        Self {
            current_firmware: fields.shift_remove(CURRENT_FIRMWARE),
            upgrade_firmware: fields.shift_remove(UPGRADE_FIRMWARE),
        }
    }

    /// Both versions are known and differ.
    pub fn needs_upgrade(&self) -> bool {
        match (&self.current_firmware, &self.upgrade_firmware) {
            (Some(current), Some(upgrade)) => {
                !current.is_empty() && !upgrade.is_empty() && current != upgrade
            }
            _ => false,
        }
    }

    /// Both versions were found in the output.
    pub fn is_complete(&self) -> bool {
        self.current_firmware.is_some() && self.upgrade_firmware.is_some()
    }
}

/// Extract the first `installed-version` token.
pub fn parse_installed_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| INSTALLED_VERSION_RE.captures(line))
        .map(|caps| caps[1].to_string())
}

/// Extract `key: value` fields for the given keys.
///
/// A line containing a key anywhere is split on `:`; the text between the
/// first and second colon, trimmed, is the value. Lines without a colon are
/// skipped. The returned map lists fields in the order they were found.
pub fn parse_fields(output: &str, keys: &[&'static str]) -> IndexMap<&'static str, String> {
    let mut fields = IndexMap::new();

    for line in output.lines() {
        for &key in keys {
            if fields.contains_key(key) || !line.contains(key) {
                continue;
            }
            if let Some(value) = line.split(':').nth(1) {
                fields.insert(key, value.trim().to_string());
            }
        }
    }

    fields
}
