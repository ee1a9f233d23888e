//! MikroTik RouterOS platform definition.
//!
//! RouterOS has a single CLI level. The prompt shows the user, the identity
//! and the current menu path:
//!
//! ```text
//! [admin@MikroTik] >
//! [admin@core-rtr-01] /system>
//! ```
//!
//! Appending options to the login name changes terminal handling:
//! `c` disables colors, `t` disables terminal capability detection, and
//! `<n>w` / `<n>h` fix the terminal size so long `print` output is not
//! wrapped or paged.

use crate::platform::PlatformDefinition;

/// Platform name for MikroTik RouterOS.
pub const PLATFORM_NAME: &str = "mikrotik_routeros";

/// The fixed set of RouterOS commands the workflows issue.
pub mod commands {
    pub const PACKAGE_UPDATE_PRINT: &str = "/system package update print";
    pub const PACKAGE_UPDATE_CHECK: &str = "/system package update check-for-updates";
    pub const PACKAGE_UPDATE_INSTALL: &str = "/system package update install";
    pub const ROUTERBOARD_PRINT: &str = "/system routerboard print";
    pub const ROUTERBOARD_UPGRADE: &str = "/system routerboard upgrade";
    pub const SYSTEM_REBOOT: &str = "/system reboot";

    /// Question printed by `/system routerboard upgrade`.
    pub const YES_NO_PATTERN: &str = r"\[y/n\]";

    /// Affirmative answer written to the channel.
    pub const CONFIRM: &str = "y\n";
}

/// RouterOS prompt, with an optional menu path before the `>`.
const PROMPT_PATTERN: &str = r"\[[^\[\]\r\n]+@[^\[\]\r\n]+\]\s*(?:/[^>\r\n]*)?>\s*$";

/// Asked on the first login after a reset.
const LICENSE_PATTERN: &str = r"(?i)software license\?\s*\[Y/n\]:?\s*$";

/// Create the MikroTik RouterOS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(PLATFORM_NAME, PROMPT_PATTERN)
        .and_then(|p| p.with_login_dialog(LICENSE_PATTERN, "n"))
        .map(|p| {
            p.with_failure_pattern("bad command name")
                .with_failure_pattern("syntax error")
                .with_failure_pattern("expected end of command")
                .with_failure_pattern("no such item")
                .with_username_suffix("+ct511w4098h")
                .with_line_ending("\r\n")
                .with_terminal_size(511, 4098)
        })
        .expect("Invalid regex pattern")
}
