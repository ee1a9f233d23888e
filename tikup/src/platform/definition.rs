//! Platform definition for vendor-specific configurations.

use regex::bytes::Regex;

/// A question the device may ask right after login, and the reply to send.
#[derive(Debug, Clone)]
pub struct LoginDialog {
    /// Pattern matching the question at the tail of the output.
    pub pattern: Regex,

    /// Text sent back, followed by the line ending.
    pub reply: String,
}

/// Platform definition containing all vendor-specific configuration.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "mikrotik_routeros").
    pub name: String,

    /// Pattern matching the shell prompt at the end of output.
    pub prompt: Regex,

    /// Questions that can appear before the first prompt.
    pub login_dialogs: Vec<LoginDialog>,

    /// Patterns that indicate command failure.
    pub failed_when_contains: Vec<String>,

    /// Appended to the username at login. RouterOS reads terminal options
    /// from it.
    pub username_suffix: String,

    /// Line terminator for commands.
    pub line_ending: &'static str,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>, prompt: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            prompt: Regex::new(prompt)?,
            login_dialogs: vec![],
            failed_when_contains: vec![],
            username_suffix: String::new(),
            line_ending: "\n",
            terminal_width: 511,
            terminal_height: 24,
        })
    }

    /// Add a login dialog and the reply that dismisses it.
    pub fn with_login_dialog(
        mut self,
        pattern: &str,
        reply: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        self.login_dialogs.push(LoginDialog {
            pattern: Regex::new(pattern)?,
            reply: reply.into(),
        });
        Ok(self)
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Set the login username suffix.
    pub fn with_username_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.username_suffix = suffix.into();
        self
    }

    /// Set the command line terminator.
    pub fn with_line_ending(mut self, line_ending: &'static str) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Username to present at login.
    pub fn login_username(&self, username: &str) -> String {
        format!("{}{}", username, self.username_suffix)
    }

    /// Return the first failure pattern present in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }

    /// Strip the command echo and the trailing prompt from raw output.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        // Everything up to and including the echoed command line goes
        let output = match raw.find(command) {
            Some(pos) => {
                let rest = &raw[pos + command.len()..];
                match rest.find('\n') {
                    Some(nl) => &rest[nl + 1..],
                    None => "",
                }
            }
            None => raw,
        };

        // Strip trailing prompt (last line)
        let output = match self.prompt.find(output.as_bytes()) {
            Some(m) => &output[..m.start()],
            None => output,
        };

        output.trim_end().to_string()
    }
}
