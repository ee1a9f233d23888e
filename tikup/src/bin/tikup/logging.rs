//! Log sink: every line goes to the log file and to stdout.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use env_logger::{Env, Target};

/// Writes everything to an append-only file and mirrors it to stdout.
struct Tee {
    file: File,
    stdout: io::Stdout,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.stdout.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.stdout.flush()
    }
}

/// Install the global logger. `RUST_LOG` overrides the default `info` level.
pub fn init(log_file: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("cannot open log file {}", log_file.display()))?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info,russh=warn"))
        .format(|buf, record| {
            writeln!(buf, "[{}] {}", buf.timestamp_seconds(), record.args())
        })
        .target(Target::Pipe(Box::new(Tee {
            file,
            stdout: io::stdout(),
        })))
        .try_init()
        .context("logger already initialized")?;

    Ok(())
}
