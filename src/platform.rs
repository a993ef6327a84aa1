use anyhow::Result;
use std::io::{self, Write};
use std::process;

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalPipe = 141, // 128 + SIGPIPE (13)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

/// Buffered stdout that exits quietly on a broken pipe
pub struct SafeStdout {
    stdout: io::BufWriter<io::Stdout>,
}

impl SafeStdout {
    pub fn new() -> Self {
        Self {
            stdout: io::BufWriter::new(io::stdout()),
        }
    }

    /// Flush stdout, handling a closed pipe as a normal end of output
    pub fn finish(&mut self) -> Result<()> {
        match self.stdout.flush() {
            Ok(()) => Ok(()),
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            Err(e) => Err(anyhow::anyhow!("Failed to flush stdout: {}", e)),
        }
    }
}

impl Default for SafeStdout {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for SafeStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stdout.write(buf) {
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            other => other,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stdout.flush() {
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            other => other,
        }
    }
}

fn is_broken_pipe(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
    }
    #[cfg(windows)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
            || e.raw_os_error() == Some(232) // ERROR_NO_DATA
            || e.raw_os_error() == Some(109) // ERROR_BROKEN_PIPE
    }
}
