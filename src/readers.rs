use anyhow::{Context, Result};
use std::io::{self, BufRead};

use crate::decompression::DecompressionReader;
use crate::line_index::FileWindow;

/// Count lines the way a line iterator sees them: a trailing line without
/// a newline still counts.
pub fn count_lines(path: &str) -> Result<usize> {
    let mut reader = DecompressionReader::new(path)?;
    let mut count = 0;
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Couldn't read input file {}", path))?;
        if n == 0 {
            break;
        }
        count += 1;
    }
    Ok(count)
}

/// Streams the lines of one window, yielding `(local line number, line)`.
///
/// Lines before `local_start` are read and discarded; reading stops after
/// `local_end`. The file handle is released when the reader is dropped.
pub struct WindowReader {
    reader: DecompressionReader,
    path: String,
    next_line: usize,
    local_end: usize,
    buf: Vec<u8>,
}

impl WindowReader {
    pub fn open(window: &FileWindow) -> Result<Self> {
        let reader = DecompressionReader::new(&window.path)?;
        let mut window_reader = Self {
            reader,
            path: window.path.clone(),
            next_line: 1,
            local_end: window.local_end,
            buf: Vec::with_capacity(1024),
        };
        while window_reader.next_line < window.local_start {
            if window_reader.read_raw()? == 0 {
                break;
            }
            window_reader.next_line += 1;
        }
        Ok(window_reader)
    }

    fn read_raw(&mut self) -> Result<usize> {
        self.buf.clear();
        self.reader
            .read_until(b'\n', &mut self.buf)
            .with_context(|| format!("Couldn't read input file {}", self.path))
    }
}

impl Iterator for WindowReader {
    type Item = Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_line > self.local_end {
            return None;
        }
        match self.read_raw() {
            Ok(0) => None,
            Ok(_) => {
                let line_number = self.next_line;
                self.next_line += 1;
                let line = String::from_utf8_lossy(&self.buf)
                    .trim_end_matches(&['\r', '\n'][..])
                    .to_string();
                Some(Ok((line_number, line)))
            }
            Err(e) => {
                // Stop after an I/O error instead of looping on it
                self.next_line = self.local_end + 1;
                Some(Err(e))
            }
        }
    }
}

/// Read a whole small text file line by line, used for directive discovery
pub fn read_text_lines<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    reader.lines().collect()
}
