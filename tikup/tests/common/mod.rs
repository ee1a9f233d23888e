//! Scripted in-memory sessions for driving the workflows without a network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, LazyLock, Mutex, Once};
use std::time::Duration;

use tikup::error::{ChannelError, DriverError, Error, TransportError};
use tikup::{Connector, Credentials, DeviceTarget, Driver, Response, Result, SessionTimeouts};

pub const CHECK_AVAILABLE: &str = "          channel: stable\n\
                                   installed-version: 7.1\n\
                                   \x20  latest-version: 7.2\n\
                                   \x20          status: New version is available";

pub const CHECK_UP_TO_DATE: &str = "          channel: stable\n\
                                    installed-version: 7.2\n\
                                    \x20  latest-version: 7.2\n\
                                    \x20          status: System is already up to date";

pub const PRINT_VERSION: &str = "          channel: stable\n\
                                 installed-version: 7.1";

pub const INSTALL_PROMPT: &str =
    "installing packages...\nDo you want to upgrade and reboot now? [y/N]";

pub const INSTALL_UP_TO_DATE: &str = "System is already up to date";

pub const INSTALL_SILENT: &str = "downloading... 100%";

pub const RB_CURRENT: &str = "       routerboard: yes\n\
                              \x20 current-firmware: 7.1\n\
                              \x20 upgrade-firmware: 7.1";

pub const RB_OUTDATED: &str = "       routerboard: yes\n\
                               \x20 current-firmware: 6.49.6\n\
                               \x20 upgrade-firmware: 7.1";

pub const RB_UPGRADE_QUESTION: &str = "Do you really want to upgrade firmware? [y/n]";

pub const REBOOT_QUESTION: &str = "Reboot, yes? [y/N]:";

/// What one `send_command*` call returns.
#[derive(Debug, Clone)]
pub enum Reply {
    Output(&'static str),
    Rejected(&'static str),
    ChannelClosed,
}

/// What one `connect` call does.
#[derive(Debug, Clone)]
pub enum Step {
    Refuse,
    Open(Session),
}

/// Replies for one session, consumed in order.
#[derive(Debug, Clone, Default)]
pub struct Session {
    replies: VecDeque<Reply>,
    drop_on_write: bool,
}

impl Session {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            drop_on_write: false,
        }
    }

    /// A session nothing is sent over, as opened by a reachability probe.
    pub fn probe() -> Self {
        Self::default()
    }

    /// The connection drops as soon as anything is written.
    pub fn dropping_on_write(mut self) -> Self {
        self.drop_on_write = true;
        self
    }
}

pub fn output(text: &'static str) -> Reply {
    Reply::Output(text)
}

/// Everything the workflows did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect,
    Refused,
    Command(String),
    Write(String),
    Close,
}

#[derive(Debug, Default)]
struct State {
    steps: VecDeque<Step>,
    events: Vec<Event>,
    connect_times: Vec<tokio::time::Instant>,
    opened: usize,
    closed: usize,
}

/// Hands out scripted sessions; once the script runs out every connect is
/// refused.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<State>>,
}

impl MockConnector {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().steps = steps.into_iter().collect();
        connector
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Command(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    /// Connect attempts, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.state.lock().unwrap().connect_times.len()
    }

    pub fn connect_times(&self) -> Vec<tokio::time::Instant> {
        self.state.lock().unwrap().connect_times.clone()
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn assert_sessions_closed(&self) {
        let state = self.state.lock().unwrap();
        assert_eq!(
            state.opened, state.closed,
            "sessions left open: {:?}",
            state.events
        );
    }
}

impl Connector for MockConnector {
    type Driver = MockDriver;

    async fn connect(&self, target: &DeviceTarget, _timeouts: SessionTimeouts) -> Result<MockDriver> {
        let mut state = self.state.lock().unwrap();
        state.connect_times.push(tokio::time::Instant::now());

        match state.steps.pop_front() {
            Some(Step::Open(session)) => {
                state.opened += 1;
                state.events.push(Event::Connect);
                Ok(MockDriver {
                    session,
                    state: self.state.clone(),
                })
            }
            Some(Step::Refuse) | None => {
                state.events.push(Event::Refused);
                Err(TransportError::ConnectionFailed {
                    host: target.address().to_string(),
                    port: target.port(),
                    source: io::Error::from(io::ErrorKind::ConnectionRefused),
                }
                .into())
            }
        }
    }
}

pub struct MockDriver {
    session: Session,
    state: Arc<Mutex<State>>,
}

impl MockDriver {
    fn reply(&mut self, command: &str) -> Result<Response> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(Event::Command(command.to_string()));

        match self.session.replies.pop_front() {
            Some(Reply::Output(text)) => Ok(Response::new(
                command,
                text,
                format!("{}\n{}\n[admin@MikroTik] > ", command, text),
                Duration::ZERO,
            )),
            Some(Reply::Rejected(message)) => Ok(Response::failed(
                command,
                message,
                message,
                Duration::ZERO,
                message,
            )),
            Some(Reply::ChannelClosed) => Err(ChannelError::Closed.into()),
            None => Err(Error::from(DriverError::CommandFailed {
                command: command.to_string(),
                message: "unscripted command".to_string(),
            })),
        }
    }
}

impl Driver for MockDriver {
    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.reply(command)
    }

    async fn send_command_expect(&mut self, command: &str, _pattern: &str) -> Result<Response> {
        self.reply(command)
    }

    async fn send_command_timing(&mut self, command: &str) -> Result<Response> {
        self.reply(command)
    }

    async fn write_channel(&mut self, input: &str) -> Result<()> {
        if self.session.drop_on_write {
            return Err(ChannelError::Closed.into());
        }
        self.state
            .lock()
            .unwrap()
            .events
            .push(Event::Write(input.to_string()));
        Ok(())
    }

    async fn close(self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closed += 1;
        state.events.push(Event::Close);
        Ok(())
    }
}

pub fn target(address: &str) -> DeviceTarget {
    DeviceTarget::new(address, Arc::new(Credentials::new("admin", "secret")))
}

static LOG_LINES: LazyLock<Arc<Mutex<Vec<u8>>>> = LazyLock::new(Arc::default);

/// Log sink collecting every formatted record in memory.
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route `log` records of this test binary into memory, as `LEVEL message`.
pub fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .format(|buf, record| writeln!(buf, "{} {}", record.level(), record.args()))
            .target(env_logger::Target::Pipe(Box::new(LogCapture(LOG_LINES.clone()))))
            .init();
    });
}

/// Captured lines mentioning `address`. Tests run concurrently, so each
/// test that inspects logs uses its own address.
pub fn logged_lines(address: &str) -> Vec<String> {
    let bytes = LOG_LINES.lock().unwrap();
    String::from_utf8_lossy(&bytes)
        .lines()
        .filter(|line| line.contains(address))
        .map(String::from)
        .collect()
}
