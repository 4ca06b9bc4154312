//! Machine container and driver loop.
//!
//! A `Mach` owns its CPUs and their memory views in parallel arrays and
//! steps them from a driver thread. The monitor interacts two ways: it
//! submits commands over a bounded channel (start, pause, trace, quit,
//! export, import), and it locks the machine directly for register and
//! memory edits while the status is halt or break.
//!
//! The driver wakes roughly every 16.67 ms (one jiffy), consumes pending
//! commands, and — while running — executes up to 20 000 instructions
//! per CPU before invoking the vblank callback.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::chardec::{ascii_decoder, CharDecoder};
use crate::state::{Snapshot, StateError};
use crate::{Cpu, Memory};

const JIFFY: Duration = Duration::from_micros(16_670);
const PER_JIFFY: usize = 20_000; // instructions per jiffy per CPU

/// Run state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Halt,
    Run,
    Break,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Halt => write!(f, "halt"),
            Status::Run => write!(f, "run"),
            Status::Break => write!(f, "break"),
        }
    }
}

/// Commands accepted by the driver.
#[derive(Debug)]
pub enum MachCmd {
    Start,
    Pause,
    /// Set or toggle tracing on one CPU.
    Trace(usize, Option<bool>),
    Quit,
    Export(PathBuf),
    Import(PathBuf),
}

/// Events emitted through the machine callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachEvent {
    Status(Status),
    Trace {
        cpu: usize,
        pc: usize,
    },
    Error(String),
}

/// Callback receiving [`MachEvent`]s.
pub type EventCallback = Box<dyn FnMut(MachEvent) + Send>;

/// Called once per jiffy while running; raises frame interrupts.
pub type VBlankFn = Box<dyn FnMut(&mut [Box<dyn Cpu>]) + Send>;

/// A machine: CPUs, memory views, and run control.
pub struct Mach {
    /// CPU cores; core `i` steps against `mems[i]`.
    pub cpus: Vec<Box<dyn Cpu>>,
    /// Memory views, parallel to `cpus`.
    pub mems: Vec<Memory>,
    /// Current run state.
    pub status: Status,
    /// Per-CPU breakpoint addresses, honored before stepping.
    pub breakpoints: Vec<HashSet<usize>>,
    /// Per-CPU trace enable.
    pub tracing: Vec<bool>,
    /// Character decoders by encoding name.
    pub char_decoders: BTreeMap<String, CharDecoder>,
    /// Encoding selected at startup.
    pub default_encoding: String,
    /// Invoked once per jiffy while running.
    pub vblank: Option<VBlankFn>,

    callback: Option<EventCallback>,
    cmd_tx: SyncSender<MachCmd>,
    cmd_rx: Receiver<MachCmd>,
    resume: bool,
    quit: bool,
}

impl Mach {
    /// Create a machine from parallel CPU and memory lists.
    ///
    /// # Panics
    ///
    /// Panics if there are more CPUs than memory views.
    #[must_use]
    pub fn new(mems: Vec<Memory>, cpus: Vec<Box<dyn Cpu>>) -> Self {
        assert!(
            cpus.len() <= mems.len(),
            "every CPU needs a memory view"
        );
        let cores = cpus.len();
        let (cmd_tx, cmd_rx) = sync_channel(10);
        let mut char_decoders: BTreeMap<String, CharDecoder> = BTreeMap::new();
        char_decoders.insert("ascii".to_string(), ascii_decoder);
        Self {
            cpus,
            mems,
            status: Status::Halt,
            breakpoints: vec![HashSet::new(); cores],
            tracing: vec![false; cores],
            char_decoders,
            default_encoding: "ascii".to_string(),
            vblank: None,
            callback: None,
            cmd_tx,
            cmd_rx,
            resume: false,
            quit: false,
        }
    }

    /// Sender half of the command channel. Cloneable; commands are
    /// observed between instructions in FIFO order.
    #[must_use]
    pub fn command_sender(&self) -> SyncSender<MachCmd> {
        self.cmd_tx.clone()
    }

    /// Install the event callback.
    pub fn set_callback(&mut self, callback: EventCallback) {
        self.callback = Some(callback);
    }

    /// True once a quit command has been consumed.
    #[must_use]
    pub fn quitting(&self) -> bool {
        self.quit
    }

    /// Run one driver iteration: consume pending commands, then execute
    /// a jiffy's worth of instructions if running.
    pub fn jiffy(&mut self) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            self.handle_command(cmd);
        }
        if self.quit || self.status != Status::Run {
            return;
        }
        self.execute();
        if self.status == Status::Run {
            if let Some(vblank) = self.vblank.as_mut() {
                vblank(&mut self.cpus);
            }
        }
    }

    fn execute(&mut self) {
        for _ in 0..PER_JIFFY {
            for core in 0..self.cpus.len() {
                let pc = self.cpus[core].pc();
                // Breakpoints stop the machine before the instruction
                // runs. The round right after a start is exempt so a
                // resume from a breakpoint makes progress.
                if !self.resume && self.breakpoints[core].contains(&pc) {
                    self.set_status(Status::Break);
                    return;
                }
                self.cpus[core].next(&mut self.mems[core]);
                // An unchanged PC means a halt-like instruction or a
                // trap; those produce no trace events.
                let stuck = self.cpus[core].pc() == pc;
                if self.tracing[core] && !stuck {
                    self.event(MachEvent::Trace { cpu: core, pc });
                }
            }
            self.resume = false;
        }
    }

    fn handle_command(&mut self, cmd: MachCmd) {
        match cmd {
            MachCmd::Start => {
                self.resume = true;
                self.set_status(Status::Run);
            }
            MachCmd::Pause => self.set_status(Status::Halt),
            MachCmd::Trace(core, enable) => {
                if let Some(t) = self.tracing.get_mut(core) {
                    *t = enable.unwrap_or(!*t);
                } else {
                    self.event(MachEvent::Error(format!("no such cpu: {core}")));
                }
            }
            MachCmd::Quit => self.quit = true,
            MachCmd::Export(path) => self.cmd_export(&path),
            MachCmd::Import(path) => self.cmd_import(&path),
        }
    }

    fn cmd_export(&mut self, path: &Path) {
        let result = self.snapshot().and_then(|snapshot| {
            let file = File::create(path)?;
            snapshot.write_to(file)
        });
        if let Err(err) = result {
            self.event(MachEvent::Error(format!("unable to export: {err}")));
        }
    }

    fn cmd_import(&mut self, path: &Path) {
        let result = File::open(path)
            .map_err(StateError::from)
            .and_then(Snapshot::read_from)
            .and_then(|snapshot| self.restore(&snapshot));
        if let Err(err) = result {
            self.event(MachEvent::Error(format!("unable to import: {err}")));
        }
    }

    /// Capture the state of every CPU and every writable RAM region.
    pub fn snapshot(&self) -> Result<Snapshot, StateError> {
        let mut snapshot = Snapshot::new();
        for cpu in &self.cpus {
            snapshot.cpus.push(cpu.save()?);
        }
        for mem in &self.mems {
            snapshot.ram.push(mem.ram_contents());
        }
        Ok(snapshot)
    }

    /// Restore a snapshot captured on an identically-shaped machine.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), StateError> {
        if snapshot.cpus.len() != self.cpus.len() {
            return Err(StateError::Mismatch(format!(
                "expected {} CPUs, found {}",
                self.cpus.len(),
                snapshot.cpus.len()
            )));
        }
        if snapshot.ram.len() != self.mems.len() {
            return Err(StateError::Mismatch(format!(
                "expected {} memories, found {}",
                self.mems.len(),
                snapshot.ram.len()
            )));
        }
        for (cpu, state) in self.cpus.iter_mut().zip(&snapshot.cpus) {
            cpu.load(state)?;
        }
        for (mem, regions) in self.mems.iter_mut().zip(&snapshot.ram) {
            mem.restore_ram(regions).map_err(StateError::Mismatch)?;
        }
        Ok(())
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        self.event(MachEvent::Status(status));
    }

    fn event(&mut self, event: MachEvent) {
        if let Some(callback) = self.callback.as_mut() {
            callback(event);
        }
    }

    /// Drive the machine until a quit command arrives. The lock is held
    /// for one jiffy at a time so a halted monitor can edit state
    /// between iterations.
    pub fn run(mach: &Arc<Mutex<Mach>>) {
        loop {
            let start = Instant::now();
            {
                let Ok(mut m) = mach.lock() else { return };
                m.jiffy();
                if m.quit {
                    return;
                }
            }
            if let Some(rest) = JIFFY.checked_sub(start.elapsed()) {
                thread::sleep(rest);
            }
        }
    }

    /// Spawn the driver thread.
    pub fn spawn(mach: Arc<Mutex<Mach>>) -> thread::JoinHandle<()> {
        thread::spawn(move || Mach::run(&mach))
    }
}
