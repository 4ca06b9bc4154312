//! Monitor binary: build a machine and drop into the REPL.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rcs_core::{petscii, Cpu, Mach, Memory};
use rcs_monitor::{prompt, Config, ConsoleWriter, Monitor, Output, RepeatWriter};

#[derive(Parser, Debug)]
#[command(name = "rcs-monitor")]
#[command(about = "Interactive monitor for retro computer systems")]
struct Args {
    /// CPU core: "6502" or "z80"
    #[arg(long, default_value = "6502")]
    cpu: String,

    /// Load a raw binary image, as file@addr with addr in hex
    #[arg(long)]
    load: Vec<String>,

    /// Load a CBM PRG file
    #[arg(long)]
    prg: Option<PathBuf>,

    /// Initial program counter, in hex
    #[arg(long)]
    pc: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let config = Config::from_env();
    config.ensure_var_dir().context("unable to create state directory")?;

    let mut mem = Memory::new(1, 0x10000);
    let ram = mem.ram(vec![0; 0x10000]);
    mem.map_ram(0, ram);

    for image in &args.load {
        let (file, addr) = image
            .rsplit_once('@')
            .with_context(|| format!("expected file@addr: {image}"))?;
        let addr = usize::from_str_radix(addr, 16)
            .with_context(|| format!("invalid load address: {addr}"))?;
        let data = fs::read(file).with_context(|| format!("unable to read {file}"))?;
        mem.write_n(addr, &data);
    }

    if let Some(path) = &args.prg {
        let data =
            fs::read(path).with_context(|| format!("unable to read {}", path.display()))?;
        let addr = format_prg::load(&mut mem, &data, true)?;
        tracing::info!("prg loaded at ${addr:04x}");
    }

    // The 6502 latches its reset vector, so build the CPU after the
    // images are in place.
    let mut cpu: Box<dyn Cpu> = match args.cpu.as_str() {
        "6502" => Box::new(mos_6502::Mos6502::new(&mut mem)),
        "z80" => Box::new(zilog_z80::Z80::new()),
        other => bail!("unknown cpu: {other}"),
    };

    if let Some(pc) = &args.pc {
        let addr =
            usize::from_str_radix(pc, 16).with_context(|| format!("invalid pc: {pc}"))?;
        cpu.set_pc(addr);
    }

    let mut mach = Mach::new(vec![mem], vec![cpu]);
    if args.cpu == "6502" {
        // CBM-flavored dump encodings.
        mach.char_decoders
            .insert("petscii".to_string(), petscii::petscii_decoder);
        mach.char_decoders
            .insert("petscii-shifted".to_string(), petscii::petscii_shifted_decoder);
        mach.char_decoders
            .insert("screen".to_string(), petscii::screen_decoder);
        mach.char_decoders
            .insert("screen-shifted".to_string(), petscii::screen_shifted_decoder);
    }
    let mach = Arc::new(Mutex::new(mach));
    let driver = Mach::spawn(Arc::clone(&mach));

    let mut console = ConsoleWriter::stdout();
    // Asynchronous output lands above a fresh prompt.
    console.set_refresh(Box::new(|| {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{}", prompt(None));
        let _ = stdout.flush();
    }));
    let out = Output::new(Box::new(RepeatWriter::new(console)));
    let mut mon = Monitor::new(Arc::clone(&mach), out, config);
    mon.run()?;
    let _ = driver.join();
    mon.shutdown();
    Ok(())
}
