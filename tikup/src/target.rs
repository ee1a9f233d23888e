//! Devices to operate on and the credentials used to log in.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use secrecy::SecretString;

use crate::error::{DriverError, Result};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Login credentials shared by every device of a run.
///
/// The password is only exposed when a session authenticates.
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The login name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password.
    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One managed router.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    address: String,
    port: u16,
    credentials: Arc<Credentials>,
}

impl DeviceTarget {
    /// Create a target on the default SSH port.
    pub fn new(address: impl Into<String>, credentials: Arc<Credentials>) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_PORT,
            credentials,
        }
    }

    /// Use a non-standard SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Hostname or IP address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// SSH port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Login credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == DEFAULT_PORT {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// Read a target list file: one address per line.
///
/// Blank lines and lines starting with `#` are ignored. A missing file or a
/// file without any address is an error.
pub fn read_target_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DriverError::TargetList {
        path: path.to_path_buf(),
        source,
    })?;

    let addresses = parse_target_list(&text);
    if addresses.is_empty() {
        return Err(DriverError::EmptyTargetList {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(addresses)
}

/// Parse target list text into addresses.
pub fn parse_target_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_parse_target_list() {
        let text = "10.0.0.1\n\n  10.0.0.2  \n# lab\n\t\nrouter.example.net\n";
        assert_eq!(
            parse_target_list(text),
            vec!["10.0.0.1", "10.0.0.2", "router.example.net"]
        );
    }

    #[test]
    fn test_read_missing_target_list() {
        let err = read_target_list("/nonexistent/tikup/targets.txt").unwrap_err();
        assert!(err.to_string().contains("Cannot read target list"));
    }

    #[test]
    fn test_read_empty_target_list() {
        let path = std::env::temp_dir().join(format!("tikup-empty-{}.txt", std::process::id()));
        std::fs::write(&path, "\n# nothing here\n").unwrap();
        let err = read_target_list(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("contains no addresses"));
    }

    #[test]
    fn test_credentials_redacted() {
        let creds = Credentials::new("admin", "hunter2");
        assert_eq!(creds.password().expose_secret(), "hunter2");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("admin"));
    }

    #[test]
    fn test_target_display() {
        let creds = Arc::new(Credentials::new("admin", "pw"));
        let target = DeviceTarget::new("10.0.0.1", creds.clone());
        assert_eq!(target.to_string(), "10.0.0.1");
        assert_eq!(target.with_port(2222).to_string(), "10.0.0.1:2222");
    }
}
