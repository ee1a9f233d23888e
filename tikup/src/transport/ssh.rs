//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use russh::Channel;
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use secrecy::ExposeSecret;

use super::config::{HostKeyVerification, SshConfig};
use crate::error::{Result, TransportError};

/// SSH transport wrapping russh client.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    terminal_width: u32,
    terminal_height: u32,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    ///
    /// The whole sequence (TCP connect, key exchange, authentication) is
    /// bounded by `config.connect_timeout`.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        tokio::time::timeout(config.connect_timeout, Self::establish(config))
            .await
            .map_err(|_| TransportError::Timeout(config.connect_timeout))?
    }

    async fn establish(config: &SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let rejection: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));
        let handler = SshHandler {
            policy: HostKeyPolicy::from_config(config),
            rejection: rejection.clone(),
        };

        debug!("connecting to {}", config.socket_addr());

        let mut session = client::connect(ssh_config, (config.host.as_str(), config.port), handler)
            .await
            .map_err(|e| {
                let rejected = rejection.lock().ok().and_then(|mut slot| slot.take());
                match (rejected, e) {
                    (Some(host_key), _) => host_key,
                    (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                        host: config.host.clone(),
                        port: config.port,
                        source,
                    },
                    (None, e) => TransportError::Ssh(e),
                }
            })?;

        let authenticated = session
            .authenticate_password(config.username.as_str(), config.password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !authenticated {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(Self {
            session,
            terminal_width: config.terminal_width,
            terminal_height: config.terminal_height,
        })
    }

    /// Open a new PTY channel on this connection.
    pub async fn open_channel(&self) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        // Request PTY
        channel
            .request_pty(
                true,
                "vt100",
                self.terminal_width,
                self.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        // Request shell
        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        if self.session.is_closed() {
            return Err(TransportError::Disconnected.into());
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Known-hosts policy for one connection.
struct HostKeyPolicy {
    host: String,
    port: u16,
    mode: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl HostKeyPolicy {
    fn from_config(config: &SshConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            mode: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }

    /// Accept or reject the key the server presented.
    fn verify(&self, key: &PublicKey) -> std::result::Result<(), TransportError> {
        if self.mode == HostKeyVerification::Disabled {
            return Ok(());
        }

        if self.is_known(key)? {
            return Ok(());
        }

        match self.mode {
            HostKeyVerification::Strict => Err(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            _ => {
                if let Err(e) = self.learn(key) {
                    warn!("Failed to save host key for {}: {}", self.host, e);
                } else {
                    debug!("learned host key for {}:{}", self.host, self.port);
                }
                Ok(())
            }
        }
    }

    /// `Ok(false)` when the host has no entry; a different key is an error.
    fn is_known(&self, key: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };

        result.map_err(|e| match e {
            russh::keys::Error::KeyChanged { line } => TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            },
            other => TransportError::KnownHosts(other.to_string()),
        })
    }

    fn learn(&self, key: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = match &self.known_hosts_path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }
}

/// russh callbacks. A rejected host key is parked in `rejection` so the
/// caller can report it instead of russh's generic unknown-key error.
struct SshHandler {
    policy: HostKeyPolicy,
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.policy.verify(server_public_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(e);
                }
                Ok(false)
            }
        }
    }
}
