//! Output plumbing for the monitor.
//!
//! Lines printed by the monitor pass through two writers. The repeat
//! writer collapses runs of identical lines into a `... repeats N
//! time(s)` summary. The console writer batches completed lines and
//! flushes them on a timer so a trace storm cannot outrun the
//! terminal; bursts over a maximum are elided with a notice.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Carriage return plus the ANSI erase-line sequence.
pub const ANSI_CLEAR_LINE: &str = "\r\x1b[2K";
pub const ANSI_RESET: &str = "\x1b[0m";
pub const ANSI_LIGHT_BLUE: &str = "\x1b[1;34m";
pub const ANSI_LIGHT_GREEN: &str = "\x1b[1;32m";

/// Delay before the first flush after quiet.
const FIRST_INTERVAL: Duration = Duration::from_millis(10);
/// Delay between flushes while output keeps arriving.
const BACKLOG_INTERVAL: Duration = Duration::from_millis(100);
/// Most lines emitted in one flush; the rest are elided.
const MAX_UPDATE: usize = 2000;

// ============================================================
// Output
// ============================================================

/// Cloneable line-oriented handle shared by the REPL, the machine
/// event printer, and memory watch callbacks.
#[derive(Clone)]
pub struct Output {
    w: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Output {
    #[must_use]
    pub fn new(w: Box<dyn Write + Send>) -> Self {
        Self {
            w: Arc::new(Mutex::new(w)),
        }
    }

    /// Write `text`, appending a newline when it does not end in one.
    /// Write errors are dropped; there is nowhere to report them.
    pub fn print(&self, text: &str) {
        if let Ok(mut w) = self.w.lock() {
            let _ = w.write_all(text.as_bytes());
            if !text.ends_with('\n') {
                let _ = w.write_all(b"\n");
            }
            let _ = w.flush();
        }
    }
}

// ============================================================
// Repeat writer
// ============================================================

/// Collapses consecutive identical lines. The first occurrence passes
/// through; the run is summarized when a different line arrives.
pub struct RepeatWriter<W: Write> {
    w: W,
    buf: Vec<u8>,
    prev: Vec<u8>,
    repeats: usize,
    ansi: bool,
}

impl<W: Write> RepeatWriter<W> {
    #[must_use]
    pub fn new(w: W) -> Self {
        Self {
            w,
            buf: Vec::new(),
            prev: Vec::new(),
            repeats: 0,
            ansi: true,
        }
    }

    /// With ANSI off, the running `... repeats` marker is not
    /// rewritten in place; the count goes on its own line.
    pub fn set_ansi(&mut self, ansi: bool) {
        self.ansi = ansi;
    }

    /// Flush the pending line and any unreported repeat count.
    pub fn close(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            if self.buf.last() != Some(&b'\n') {
                self.buf.push(b'\n');
            }
            self.eoln()?;
        }
        if self.repeats > 0 {
            if self.ansi {
                self.w.write_all(ANSI_CLEAR_LINE.as_bytes())?;
                self.w.write_all(b"... repeats ")?;
            }
            if self.repeats == 1 {
                self.w.write_all(b"1 time\n")?;
            } else {
                writeln!(self.w, "{} times", self.repeats)?;
            }
            self.repeats = 0;
        }
        Ok(())
    }

    fn eoln(&mut self) -> io::Result<()> {
        let line = std::mem::take(&mut self.buf);
        if line == self.prev {
            if self.repeats == 0 {
                self.w.write_all(b"... repeats ")?;
            }
            self.repeats += 1;
        } else {
            if self.repeats > 0 {
                if self.ansi {
                    self.w.write_all(ANSI_CLEAR_LINE.as_bytes())?;
                    self.w.write_all(b"... repeats ")?;
                }
                if self.repeats == 1 {
                    self.w.write_all(b"1 time\n")?;
                } else {
                    writeln!(self.w, "{} times", self.repeats)?;
                }
            }
            self.repeats = 0;
            self.w.write_all(&line)?;
        }
        self.prev = line;
        Ok(())
    }
}

impl<W: Write> Write for RepeatWriter<W> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        for &b in p {
            self.buf.push(b);
            if b == b'\n' {
                self.eoln()?;
            }
        }
        Ok(p.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.w.flush()
    }
}

// ============================================================
// Console writer
// ============================================================

struct Backlog<W: Write + Send> {
    w: W,
    line: Vec<u8>,
    backlog: Vec<u8>,
    armed: bool,
    max_update: usize,
    refresh: Option<Box<dyn Fn() + Send>>,
}

impl<W: Write + Send> Backlog<W> {
    fn emit(&mut self) -> io::Result<()> {
        if self.backlog.is_empty() {
            return Ok(());
        }
        let update = std::mem::take(&mut self.backlog);
        let lines = update.iter().filter(|&&b| b == b'\n').count();
        self.w.write_all(ANSI_CLEAR_LINE.as_bytes())?;
        if lines > self.max_update {
            let mut seen = 0;
            let mut start = 0;
            for i in (0..update.len()).rev() {
                if update[i] == b'\n' {
                    seen += 1;
                    if seen == self.max_update + 1 {
                        start = i + 1;
                        break;
                    }
                }
            }
            writeln!(self.w, "... omitted {} lines", lines - self.max_update)?;
            self.w.write_all(&update[start..])?;
        } else {
            self.w.write_all(&update)?;
        }
        if let Some(refresh) = &self.refresh {
            refresh();
        }
        self.w.flush()
    }
}

/// Buffers whole lines and flushes them on a timer from a background
/// thread. The first line after a quiet period appears almost at
/// once; sustained output is batched so the terminal is updated at a
/// readable rate.
pub struct ConsoleWriter<W: Write + Send + 'static> {
    inner: Arc<Mutex<Backlog<W>>>,
    first_interval: Duration,
    backlog_interval: Duration,
}

impl ConsoleWriter<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> ConsoleWriter<W> {
    #[must_use]
    pub fn new(w: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Backlog {
                w,
                line: Vec::new(),
                backlog: Vec::new(),
                armed: false,
                max_update: MAX_UPDATE,
                refresh: None,
            })),
            first_interval: FIRST_INTERVAL,
            backlog_interval: BACKLOG_INTERVAL,
        }
    }

    /// Called after each flush, to redraw the input prompt under the
    /// new output.
    pub fn set_refresh(&mut self, refresh: Box<dyn Fn() + Send>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.refresh = Some(refresh);
        }
    }
}

impl<W: Write + Send + 'static> Write for ConsoleWriter<W> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        let mut arm = false;
        {
            let Ok(mut inner) = self.inner.lock() else {
                return Ok(p.len());
            };
            for &b in p {
                inner.line.push(b);
                if b == b'\n' {
                    let line = std::mem::take(&mut inner.line);
                    inner.backlog.extend_from_slice(&line);
                    if !inner.armed {
                        inner.armed = true;
                        arm = true;
                    }
                }
            }
        }
        if arm {
            let inner = Arc::clone(&self.inner);
            let first = self.first_interval;
            let rest = self.backlog_interval;
            thread::spawn(move || {
                thread::sleep(first);
                loop {
                    {
                        let Ok(mut b) = inner.lock() else { return };
                        if b.backlog.is_empty() {
                            b.armed = false;
                            return;
                        }
                        let _ = b.emit();
                    }
                    thread::sleep(rest);
                }
            });
        }
        Ok(p.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
