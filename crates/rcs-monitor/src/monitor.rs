//! The monitor REPL.
//!
//! Commands lock the machine only for their duration, so the driver
//! thread keeps running between them. Asynchronous machine events
//! (trace lines, break banners, errors) arrive on a channel and are
//! printed by a dedicated thread; the machine invokes its callback
//! while locked, so the callback itself only forwards.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rcs_core::{
    format_stmt, CharDecoder, FormatOptions, Mach, MachCmd, MachEvent, Memory, Pointer, Status,
    ValueError,
};
use thiserror::Error;

use crate::complete::{complete, Candidates};
use crate::config::Config;
use crate::console::{Output, ANSI_LIGHT_BLUE, ANSI_LIGHT_GREEN, ANSI_RESET};

const MAX_ARGS: usize = 0x100;
const DEFAULT_MEM_LINES: usize = 16;
const DEFAULT_DASM_LINES: usize = 16;
const DEFAULT_SLEEP: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("no such command: {0}")]
    NoSuchCommand(String),
    #[error("not enough arguments")]
    NotEnoughArguments,
    #[error("too many arguments")]
    TooManyArguments,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("invalid core: {0}")]
    InvalidCore(String),
    #[error("machine is running; pause first")]
    Running,
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Per-core cursors and bookkeeping.
struct Core {
    /// Next memory dump address.
    ptr: Pointer,
    /// Next disassembly address.
    dasm: Pointer,
    /// Active watches, by address, for listing.
    watches: BTreeMap<usize, &'static str>,
}

pub struct Monitor {
    mach: Arc<Mutex<Mach>>,
    cmd: SyncSender<MachCmd>,
    out: Output,
    config: Config,
    cores: Vec<Core>,
    selected: Arc<Mutex<usize>>,
    encoding: String,
    mem_lines: usize,
    dasm_lines: usize,
    /// Repeated on an empty input line.
    last: Vec<String>,
    quit: bool,
    events: Option<JoinHandle<()>>,
}

impl Monitor {
    #[must_use]
    pub fn new(mach: Arc<Mutex<Mach>>, out: Output, config: Config) -> Self {
        let selected = Arc::new(Mutex::new(0));
        let (event_tx, event_rx) = mpsc::channel();
        let cmd;
        let encoding;
        let ncores;
        {
            let mut m = lock(&mach);
            cmd = m.command_sender();
            encoding = m.default_encoding.clone();
            ncores = m.cpus.len();
            m.set_callback(Box::new(move |evt| {
                let _ = event_tx.send(evt);
            }));
            for mem in &mut m.mems {
                let out = out.clone();
                let banks = mem.banks();
                mem.set_callback(Box::new(move |evt| {
                    let addr = if banks > 1 {
                        format!("{}:${:04x}", evt.bank, evt.addr)
                    } else {
                        format!("${:04x}", evt.addr)
                    };
                    if evt.read {
                        out.print(&format!("${:02x} <= mem[{addr}]", evt.value));
                    } else {
                        out.print(&format!("mem[{addr}] <= ${:02x}", evt.value));
                    }
                }));
            }
        }
        let events = spawn_event_printer(
            Arc::clone(&mach),
            Arc::clone(&selected),
            out.clone(),
            event_rx,
        );
        let cores = (0..ncores)
            .map(|_| Core {
                ptr: Pointer::new(),
                dasm: Pointer::new(),
                watches: BTreeMap::new(),
            })
            .collect();
        Self {
            mach,
            cmd,
            out,
            config,
            cores,
            selected,
            encoding,
            mem_lines: DEFAULT_MEM_LINES,
            dasm_lines: DEFAULT_DASM_LINES,
            last: Vec::new(),
            quit: false,
            events: Some(events),
        }
    }

    /// Read and execute lines until quit or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        while !self.quit {
            self.show_prompt()?;
            let Some(line) = lines.next() else {
                // End of input stops the machine too.
                let _ = self.dispatch(&["quit".to_string()]);
                break;
            };
            self.parse(&line?);
        }
        Ok(())
    }

    /// Detach from the machine and stop the event printer. Call once
    /// the driver thread has exited.
    pub fn shutdown(&mut self) {
        lock(&self.mach).set_callback(Box::new(|_| {}));
        if let Some(handle) = self.events.take() {
            let _ = handle.join();
        }
    }

    /// Execute one line of input. An empty line repeats the last
    /// repeatable command; `#` starts a comment; a line ending in a
    /// tab lists completions instead of executing. Errors are
    /// printed, not returned, so the REPL stays up.
    pub fn parse(&mut self, line: &str) {
        if line.ends_with('\t') {
            let matches = complete(line.trim_end_matches('\t'), &self.candidates());
            if !matches.is_empty() {
                self.out.print(&matches.join("  "));
            }
            return;
        }
        let args = split_args(line);
        if args.is_empty() {
            if line.trim().is_empty() && !self.last.is_empty() {
                let repeat = self.last.clone();
                self.run_args(&repeat);
            }
            return;
        }
        self.last.clear();
        self.run_args(&args);
    }

    /// Execute a script, echoing each line first. Used by tests and
    /// startup files.
    pub fn eval(&mut self, script: &str) {
        for line in script.lines() {
            let args = split_args(line);
            if args.is_empty() {
                continue;
            }
            self.out.print(&format!("+ {}", line.trim()));
            self.run_args(&args);
        }
    }

    fn run_args(&mut self, args: &[String]) {
        if let Err(err) = self.dispatch(args) {
            self.out.print(&err.to_string());
        }
    }

    fn dispatch(&mut self, args: &[String]) -> Result<(), MonitorError> {
        let rest = &args[1..];
        match args[0].as_str() {
            "b" | "break" => self.cmd_break(rest),
            "bp" => self.cmd_break_list(rest),
            "bpc" => self.cmd_break_clear(rest),
            "bpn" => self.cmd_break_clear_all(rest),
            "bps" => self.cmd_break_set(rest),
            "cpu" => self.cmd_cpu(rest),
            "d" => self.cmd_dasm_list(rest),
            "dasm" => self.cmd_dasm(rest),
            "export" => self.cmd_export(rest),
            "g" | "go" => self.cmd_go(rest),
            "import" => self.cmd_import(rest),
            "m" => self.cmd_mem_dump(rest),
            "mem" => self.cmd_mem(rest),
            "n" | "next" => self.cmd_next(rest),
            "p" | "pause" => self.cmd_pause(rest),
            "peek" => self.cmd_peek(rest),
            "poke" => self.cmd_poke(rest),
            "q" | "quit" => self.cmd_quit(rest),
            "s" | "step" => self.cmd_step(rest),
            "sleep" => self.cmd_sleep(rest),
            "t" | "trace" => self.cmd_trace(rest),
            "w" | "watch" => self.cmd_watch(rest),
            "wc" => self.cmd_watch_clear(rest),
            "wl" => self.cmd_watch_list(rest),
            "wn" => self.cmd_watch_clear_all(rest),
            "ws" => self.cmd_watch_set(rest),
            token => {
                if let Some(value) = parse_uint(token) {
                    self.out.print(&format_value(value));
                    Ok(())
                } else {
                    Err(MonitorError::NoSuchCommand(token.to_string()))
                }
            }
        }
    }

    /// Snapshot the names the completion engine cannot know on its
    /// own: registers and flags of the selected core, dump encodings,
    /// and files under the state directory.
    #[must_use]
    pub fn candidates(&self) -> Candidates {
        let sc = self.sc();
        let m = lock(&self.mach);
        let names = |list: &[&str]| list.iter().map(ToString::to_string).collect();
        let registers = names(m.cpus[sc].register_names());
        let flags = names(m.cpus[sc].flag_names());
        let encodings = m.char_decoders.keys().cloned().collect();
        drop(m);
        let mut state_files = Vec::new();
        if let Ok(entries) = fs::read_dir(self.config.var_dir()) {
            for entry in entries.flatten() {
                state_files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Candidates {
            registers,
            flags,
            encodings,
            state_files,
        }
    }

    fn sc(&self) -> usize {
        *lock(&self.selected)
    }

    fn show_prompt(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        let core = (self.cores.len() > 1).then(|| self.sc());
        write!(stdout, "{}", prompt(core))?;
        stdout.flush()
    }

    // ============================================================
    // Breakpoints
    // ============================================================

    fn cmd_break(&mut self, args: &[String]) -> Result<(), MonitorError> {
        match args.first().map(String::as_str) {
            None | Some("list") => self.cmd_break_list(tail(args)),
            Some("clear") => self.cmd_break_clear(&args[1..]),
            Some("clear-all") => self.cmd_break_clear_all(&args[1..]),
            Some("set") => self.cmd_break_set(&args[1..]),
            Some(other) => Err(MonitorError::NoSuchCommand(other.to_string())),
        }
    }

    fn cmd_break_set(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 1, 1)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        let addr = parse_address(&args[0], m.mems[sc].max_addr())?;
        m.breakpoints[sc].insert(addr);
        Ok(())
    }

    fn cmd_break_clear(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 1, 1)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        let addr = parse_address(&args[0], m.mems[sc].max_addr())?;
        m.breakpoints[sc].remove(&addr);
        Ok(())
    }

    fn cmd_break_clear_all(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        let sc = self.sc();
        lock(&self.mach).breakpoints[sc].clear();
        Ok(())
    }

    fn cmd_break_list(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        let sc = self.sc();
        let mut addrs: Vec<usize> = lock(&self.mach).breakpoints[sc].iter().copied().collect();
        if addrs.is_empty() {
            return Ok(());
        }
        addrs.sort_unstable();
        let list: Vec<String> = addrs.iter().map(|addr| format!("${addr:04x}")).collect();
        self.out.print(&list.join("\n"));
        Ok(())
    }

    // ============================================================
    // CPU
    // ============================================================

    fn cmd_cpu(&mut self, args: &[String]) -> Result<(), MonitorError> {
        if args.is_empty() {
            let sc = self.sc();
            let m = lock(&self.mach);
            let info = format!("[{}]\n{}", m.status, m.cpus[sc]);
            drop(m);
            self.out.print(&info);
            return Ok(());
        }
        match args[0].as_str() {
            "flag" => self.cmd_cpu_flag(&args[1..]),
            "reg" => self.cmd_cpu_reg(&args[1..]),
            "select" => self.cmd_cpu_select(&args[1..]),
            other => Err(MonitorError::NoSuchCommand(other.to_string())),
        }
    }

    fn cmd_cpu_reg(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 2)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        match args {
            [] => {
                let names = m.cpus[sc].register_names().join("\n");
                drop(m);
                self.out.print(&names);
            }
            [name] => {
                let value = m.cpus[sc].register(name)?;
                drop(m);
                self.out.print(&format_value(value.as_usize()));
            }
            [name, value] => {
                if m.status == Status::Run {
                    return Err(MonitorError::Running);
                }
                let v = parse_value(value)?;
                m.cpus[sc].set_register(name, v)?;
            }
            _ => return Err(MonitorError::TooManyArguments),
        }
        Ok(())
    }

    fn cmd_cpu_flag(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 2)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        match args {
            [] => {
                let names = m.cpus[sc].flag_names().join("\n");
                drop(m);
                self.out.print(&names);
            }
            [name] => {
                let value = m.cpus[sc].flag(name)?;
                drop(m);
                self.out.print(&value.to_string());
            }
            [name, value] => {
                if m.status == Status::Run {
                    return Err(MonitorError::Running);
                }
                let v = parse_bool(value)?;
                m.cpus[sc].set_flag(name, v)?;
            }
            _ => return Err(MonitorError::TooManyArguments),
        }
        Ok(())
    }

    fn cmd_cpu_select(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 1, 1)?;
        let core = parse_value(&args[0])?;
        if core >= self.cores.len() {
            return Err(MonitorError::InvalidCore(args[0].clone()));
        }
        *lock(&self.selected) = core;
        Ok(())
    }

    // ============================================================
    // Disassembly
    // ============================================================

    fn cmd_dasm(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 1, MAX_ARGS)?;
        match args[0].as_str() {
            "lines" => self.cmd_dasm_lines(&args[1..]),
            "list" => self.cmd_dasm_list(&args[1..]),
            other => Err(MonitorError::NoSuchCommand(other.to_string())),
        }
    }

    fn cmd_dasm_list(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 2)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        let max = m.mems[sc].max_addr();
        if let Some(arg) = args.first() {
            let addr = parse_address(arg, max)?;
            self.cores[sc].dasm.set_addr(addr);
        }
        let mut listing = Vec::new();
        if let Some(arg) = args.get(1) {
            let end = parse_address(arg, max)?;
            while self.cores[sc].dasm.addr() <= end {
                listing.push(dasm_next(&mut m, sc, &mut self.cores[sc].dasm));
            }
        } else {
            for _ in 0..self.dasm_lines {
                listing.push(dasm_next(&mut m, sc, &mut self.cores[sc].dasm));
            }
        }
        drop(m);
        self.out.print(&listing.join("\n"));
        self.last = vec!["d".to_string()];
        Ok(())
    }

    fn cmd_dasm_lines(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        match args.first() {
            None => self.out.print(&format_value(self.dasm_lines)),
            Some(arg) => {
                let lines = parse_value(arg)?;
                if lines == 0 {
                    return Err(MonitorError::InvalidValue(arg.clone()));
                }
                self.dasm_lines = lines;
            }
        }
        Ok(())
    }

    // ============================================================
    // Memory
    // ============================================================

    fn cmd_mem(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 1, MAX_ARGS)?;
        match args[0].as_str() {
            "dump" => self.cmd_mem_dump(&args[1..]),
            "encoding" => self.cmd_mem_encoding(&args[1..]),
            "fill" => self.cmd_mem_fill(&args[1..]),
            "lines" => self.cmd_mem_lines(&args[1..]),
            other => Err(MonitorError::NoSuchCommand(other.to_string())),
        }
    }

    fn cmd_mem_dump(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 2)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        let max = m.mems[sc].max_addr();
        let start = match args.first() {
            Some(arg) => parse_address(arg, max)?,
            None => self.cores[sc].ptr.addr(),
        };
        let end = match args.get(1) {
            Some(arg) => parse_address(arg, max)?,
            None => (start + self.mem_lines * 0x10).min(max),
        };
        let Some(decode) = m.char_decoders.get(&self.encoding).copied() else {
            return Err(MonitorError::InvalidValue(self.encoding.clone()));
        };
        let text = dump(&mut m.mems[sc], start, end, decode);
        drop(m);
        self.cores[sc].ptr.set_addr(end);
        self.out.print(&text);
        self.last = vec!["m".to_string()];
        Ok(())
    }

    fn cmd_mem_encoding(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        match args.first() {
            None => {
                let current = self.encoding.clone();
                self.out.print(&current);
            }
            Some(name) => {
                if !lock(&self.mach).char_decoders.contains_key(name.as_str()) {
                    return Err(MonitorError::InvalidValue(name.clone()));
                }
                self.encoding.clone_from(name);
            }
        }
        Ok(())
    }

    fn cmd_mem_fill(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 3, 3)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        if m.status == Status::Run {
            return Err(MonitorError::Running);
        }
        let max = m.mems[sc].max_addr();
        let start = parse_address(&args[0], max)?;
        let end = parse_address(&args[1], max)?;
        let value = parse_value8(&args[2])?;
        // Inverted ranges fill nothing.
        for addr in start..=end {
            m.mems[sc].write(addr, value);
        }
        Ok(())
    }

    fn cmd_mem_lines(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        match args.first() {
            None => self.out.print(&format_value(self.mem_lines)),
            Some(arg) => {
                let lines = parse_value(arg)?;
                if lines == 0 {
                    return Err(MonitorError::InvalidValue(arg.clone()));
                }
                self.mem_lines = lines;
            }
        }
        Ok(())
    }

    fn cmd_poke(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 2, MAX_ARGS)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        if m.status == Status::Run {
            return Err(MonitorError::Running);
        }
        let addr = parse_address(&args[0], m.mems[sc].max_addr())?;
        let mut values = Vec::with_capacity(args.len() - 1);
        for arg in &args[1..] {
            values.push(parse_value8(arg)?);
        }
        m.mems[sc].write_n(addr, &values);
        Ok(())
    }

    fn cmd_peek(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 1, 1)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        let addr = parse_address(&args[0], m.mems[sc].max_addr())?;
        let value = m.mems[sc].read(addr);
        drop(m);
        self.out.print(&format_value(usize::from(value)));
        Ok(())
    }

    // ============================================================
    // Watches
    // ============================================================

    fn cmd_watch(&mut self, args: &[String]) -> Result<(), MonitorError> {
        match args.first().map(String::as_str) {
            None | Some("list") => self.cmd_watch_list(tail(args)),
            Some("clear") => self.cmd_watch_clear(&args[1..]),
            Some("clear-all") => self.cmd_watch_clear_all(&args[1..]),
            Some("set") => self.cmd_watch_set(&args[1..]),
            Some(other) => Err(MonitorError::NoSuchCommand(other.to_string())),
        }
    }

    fn cmd_watch_set(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 2, 2)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        let addr = parse_address(&args[0], m.mems[sc].max_addr())?;
        let mode = match args[1].as_str() {
            "r" => {
                m.mems[sc].watch_ro(addr);
                "r"
            }
            "w" => {
                m.mems[sc].watch_wo(addr);
                "w"
            }
            "rw" => {
                m.mems[sc].watch_rw(addr);
                "rw"
            }
            other => return Err(MonitorError::InvalidValue(other.to_string())),
        };
        drop(m);
        self.cores[sc].watches.insert(addr, mode);
        Ok(())
    }

    fn cmd_watch_clear(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 1, 1)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        let addr = parse_address(&args[0], m.mems[sc].max_addr())?;
        if self.cores[sc].watches.remove(&addr).is_some() {
            m.mems[sc].unwatch(addr);
        }
        Ok(())
    }

    fn cmd_watch_clear_all(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        for &addr in self.cores[sc].watches.keys() {
            m.mems[sc].unwatch(addr);
        }
        drop(m);
        self.cores[sc].watches.clear();
        Ok(())
    }

    fn cmd_watch_list(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        let sc = self.sc();
        let watches = &self.cores[sc].watches;
        if watches.is_empty() {
            return Ok(());
        }
        let list: Vec<String> = watches
            .iter()
            .map(|(addr, mode)| format!("${addr:04x} {mode}"))
            .collect();
        self.out.print(&list.join("\n"));
        Ok(())
    }

    // ============================================================
    // Execution
    // ============================================================

    fn cmd_go(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        let _ = self.cmd.send(MachCmd::Start);
        self.last = vec!["g".to_string()];
        Ok(())
    }

    fn cmd_pause(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        let _ = self.cmd.send(MachCmd::Pause);
        Ok(())
    }

    fn cmd_step(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        if m.status == Status::Run {
            return Err(MonitorError::Running);
        }
        let mach = &mut *m;
        mach.cpus[sc].next(&mut mach.mems[sc]);
        let pc = mach.cpus[sc].pc();
        let mut ptr = Pointer::new();
        ptr.set_addr(pc);
        let line = dasm_next(mach, sc, &mut ptr);
        drop(m);
        self.out.print(&line);
        self.last = vec!["s".to_string()];
        Ok(())
    }

    fn cmd_next(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        let sc = self.sc();
        let mut m = lock(&self.mach);
        let pc = m.cpus[sc].pc();
        let mut ptr = Pointer::new();
        ptr.set_addr(pc);
        let line = dasm_next(&mut m, sc, &mut ptr);
        drop(m);
        self.out.print(&line);
        Ok(())
    }

    fn cmd_trace(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        let sc = self.sc();
        let mode = match args.first() {
            None => None,
            Some(arg) => Some(parse_bool(arg)?),
        };
        let _ = self.cmd.send(MachCmd::Trace(sc, mode));
        Ok(())
    }

    fn cmd_quit(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        self.quit = true;
        let _ = self.cmd.send(MachCmd::Quit);
        Ok(())
    }

    fn cmd_sleep(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        let duration = match args.first() {
            None => DEFAULT_SLEEP,
            Some(arg) => Duration::from_millis(parse_value(arg)? as u64),
        };
        thread::sleep(duration);
        Ok(())
    }

    // ============================================================
    // State transfer
    // ============================================================

    fn cmd_export(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        let name = args.first().map_or("state", String::as_str);
        let path = self.config.var_dir().join(name);
        let _ = self.cmd.send(MachCmd::Export(path));
        Ok(())
    }

    fn cmd_import(&mut self, args: &[String]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        let name = args.first().map_or("state", String::as_str);
        let path = self.config.var_dir().join(name);
        let _ = self.cmd.send(MachCmd::Import(path));
        Ok(())
    }
}

// ============================================================
// Event printing
// ============================================================

fn spawn_event_printer(
    mach: Arc<Mutex<Mach>>,
    selected: Arc<Mutex<usize>>,
    out: Output,
    rx: Receiver<MachEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for evt in rx {
            match evt {
                MachEvent::Trace { cpu, pc } => {
                    let mut m = lock(&mach);
                    let prefix = if m.cpus.len() > 1 {
                        format!("cpu{cpu}  ")
                    } else {
                        String::new()
                    };
                    let mut ptr = Pointer::new();
                    ptr.set_addr(pc);
                    let line = dasm_next(&mut m, cpu, &mut ptr);
                    drop(m);
                    out.print(&format!("{prefix}{line}"));
                }
                MachEvent::Status(Status::Break) => {
                    let sc = *lock(&selected);
                    let m = lock(&mach);
                    let banner = format!("\n[{}]\n{}", m.status, m.cpus[sc]);
                    drop(m);
                    out.print(&banner);
                }
                MachEvent::Status(_) => {}
                MachEvent::Error(msg) => out.print(&msg),
            }
        }
    })
}

/// The REPL prompt, with the core suffix on multi-CPU machines. Also
/// used to redraw the prompt after asynchronous output.
#[must_use]
pub fn prompt(core: Option<usize>) -> String {
    let core = match core {
        Some(n) => format!(":{ANSI_LIGHT_BLUE}cpu{n}{ANSI_RESET}"),
        None => String::new(),
    };
    format!("{ANSI_LIGHT_GREEN}monitor{ANSI_RESET}{core}> ")
}

fn dasm_next(m: &mut Mach, core: usize, ptr: &mut Pointer) -> String {
    let stmt = m.cpus[core].disassemble(&mut m.mems[core], ptr);
    format_stmt(
        &stmt,
        FormatOptions {
            bytes_width: m.cpus[core].dasm_bytes_width(),
        },
    )
}

/// Render memory as rows of 16 bytes: address, hex bytes with a gap
/// after the eighth column, and a decoded character gutter. Jagged
/// starts and ends are padded with blanks.
fn dump(mem: &mut Memory, start: usize, end: usize, decode: CharDecoder) -> String {
    let mut text = String::new();
    let mut chars = String::new();
    let a0 = start / 0x10 * 0x10;
    let mut a1 = end / 0x10 * 0x10;
    if a1 != end {
        a1 += 0x10;
    }
    for addr in a0..a1 {
        if addr % 0x10 == 0 {
            text.push_str(&format!("${addr:04x} "));
            chars.clear();
        }
        if addr < start || addr > end {
            text.push_str("   ");
            chars.push(' ');
        } else {
            let value = mem.read(addr);
            text.push_str(&format!(" {value:02x}"));
            let (ch, printable) = decode(value);
            chars.push(if printable { ch } else { '.' });
        }
        if addr % 0x10 == 7 {
            text.push(' ');
        }
        if addr % 0x10 == 0x0f {
            text.push_str("  ");
            text.push_str(&chars);
            if addr + 1 < end {
                text.push('\n');
            }
        }
    }
    text
}

// ============================================================
// Parsing
// ============================================================

/// Split a line into words. Comments and blank lines come back empty.
fn split_args(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Vec::new();
    }
    line.split_whitespace().map(ToString::to_string).collect()
}

fn check_len(args: &[String], min: usize, max: usize) -> Result<(), MonitorError> {
    if args.len() < min {
        return Err(MonitorError::NotEnoughArguments);
    }
    if args.len() > max {
        return Err(MonitorError::TooManyArguments);
    }
    Ok(())
}

/// Parse a number: `$` or `0x` for hex, `%` or `0b` for binary,
/// otherwise decimal.
fn parse_uint(text: &str) -> Option<usize> {
    let (digits, radix) = if let Some(t) = text.strip_prefix('$') {
        (t, 16)
    } else if let Some(t) = text.strip_prefix("0x") {
        (t, 16)
    } else if let Some(t) = text.strip_prefix('%') {
        (t, 2)
    } else if let Some(t) = text.strip_prefix("0b") {
        (t, 2)
    } else {
        (text, 10)
    };
    usize::from_str_radix(digits, radix).ok()
}

fn parse_value(text: &str) -> Result<usize, MonitorError> {
    parse_uint(text).ok_or_else(|| MonitorError::InvalidValue(text.to_string()))
}

fn parse_value8(text: &str) -> Result<u8, MonitorError> {
    parse_uint(text)
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| MonitorError::InvalidValue(text.to_string()))
}

fn parse_bool(text: &str) -> Result<bool, MonitorError> {
    match text {
        "true" | "yes" | "on" | "t" | "1" => Ok(true),
        "false" | "no" | "off" | "f" | "0" => Ok(false),
        _ => Err(MonitorError::InvalidValue(text.to_string())),
    }
}

fn parse_address(text: &str, max_addr: usize) -> Result<usize, MonitorError> {
    match parse_uint(text) {
        Some(addr) if addr <= max_addr => Ok(addr),
        _ => Err(MonitorError::InvalidAddress(text.to_string())),
    }
}

/// Render a value in decimal, hex, and binary.
#[must_use]
pub fn format_value(v: usize) -> String {
    format!("{v} ${v:x} %{v:b}")
}

fn tail(args: &[String]) -> &[String] {
    if args.is_empty() { args } else { &args[1..] }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcs_core::ascii_decoder;
    use rcs_core::mock::test_memory;

    #[test]
    fn parse_uint_radixes() {
        assert_eq!(parse_uint("42"), Some(42));
        assert_eq!(parse_uint("$2a"), Some(0x2a));
        assert_eq!(parse_uint("0x2a"), Some(0x2a));
        assert_eq!(parse_uint("%101010"), Some(0b10_1010));
        assert_eq!(parse_uint("0b101010"), Some(0b10_1010));
        assert_eq!(parse_uint("fish"), None);
        assert_eq!(parse_uint("$"), None);
    }

    #[test]
    fn format_value_shows_all_radixes() {
        assert_eq!(format_value(42), "42 $2a %101010");
        assert_eq!(format_value(0), "0 $0 %0");
    }

    #[test]
    fn split_args_skips_comments() {
        assert_eq!(split_args("  poke $10 $22 "), vec!["poke", "$10", "$22"]);
        assert!(split_args("# just a note").is_empty());
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn address_bounds() {
        assert_eq!(parse_address("$ffff", 0xffff), Ok(0xffff));
        assert_eq!(
            parse_address("$123456", 0xffff),
            Err(MonitorError::InvalidAddress("$123456".to_string()))
        );
    }

    // Rows padded on the right carry trailing gutter blanks; trim
    // them so the expectations stay readable.
    fn dump_lines(mem: &mut Memory, start: usize, end: usize) -> String {
        dump(mem, start, end, ascii_decoder)
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn dump_one_line() {
        let mut mem = test_memory();
        assert_eq!(
            dump_lines(&mut mem, 0x0000, 0x000f),
            "$0000  00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00  ................"
        );
    }

    #[test]
    fn dump_two_lines() {
        let mut mem = test_memory();
        let want = "\
$0000  00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00  ................
$0010  00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00  ................";
        assert_eq!(dump_lines(&mut mem, 0x0000, 0x001f), want);
    }

    #[test]
    fn dump_jagged_top() {
        let mut mem = test_memory();
        let want = "\
$0010              00 00 00 00  00 00 00 00 00 00 00 00      ............
$0020  00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00  ................";
        assert_eq!(dump_lines(&mut mem, 0x0014, 0x002f), want);
    }

    #[test]
    fn dump_jagged_bottom() {
        let mut mem = test_memory();
        let want = "\
$0000  00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00  ................
$0010  00 00 00 00 00                                    .....";
        assert_eq!(dump_lines(&mut mem, 0x0000, 0x0014), want);
    }

    #[test]
    fn dump_single_value() {
        let mut mem = test_memory();
        mem.write(0x0010, 0x41);
        let want = format!("$0010  41{}A", " ".repeat(48));
        assert_eq!(dump_lines(&mut mem, 0x0010, 0x0010), want);
    }

    #[test]
    fn dump_printable_gutter() {
        let mut mem = test_memory();
        for addr in 0x0040..=0x005f {
            let value = u8::try_from(addr).unwrap();
            mem.write(addr, value);
        }
        let want = "\
$0040  40 41 42 43 44 45 46 47  48 49 4a 4b 4c 4d 4e 4f  @ABCDEFGHIJKLMNO
$0050  50 51 52 53 54 55 56 57  58 59 5a 5b 5c 5d 5e 5f  PQRSTUVWXYZ[\\]^_";
        assert_eq!(dump_lines(&mut mem, 0x0040, 0x005f), want);
    }
}
