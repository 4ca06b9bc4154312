//! Interactive monitor for retro computer systems.
//!
//! A line-oriented debugger over a machine: breakpoints, memory
//! watches, hex dumps, disassembly listings, register and flag
//! editing, and state export/import, driven from a REPL. The machine
//! runs on its own driver thread; the monitor locks it only while
//! executing a command.

mod complete;
mod config;
mod console;
mod monitor;

pub use complete::{complete, Candidates};
pub use config::Config;
pub use console::{
    ConsoleWriter, Output, RepeatWriter, ANSI_CLEAR_LINE, ANSI_LIGHT_BLUE, ANSI_LIGHT_GREEN,
    ANSI_RESET,
};
pub use monitor::{format_value, prompt, Monitor, MonitorError};
