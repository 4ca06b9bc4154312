//! Runs the zexdoc instruction exerciser. The binary is not
//! distributed with the source; place zexdoc.com under $RCS_HOME/ext/zex
//! and run with --ignored.

use std::env;
use std::fs;
use std::path::PathBuf;

use rcs_core::{Cpu, Memory};
use zilog_z80::Z80;

fn resource_dir() -> PathBuf {
    match env::var("RCS_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from(env::var("HOME").unwrap_or_default()).join("rcs"),
    }
}

/// Handle the two CP/M console output calls used by the exerciser:
/// C=2 writes the character in E, C=9 writes a $-terminated string
/// at DE.
fn syscall(cpu: &mut Z80, mem: &mut Memory, out: &mut String) {
    match cpu.c {
        2 => out.push(char::from(cpu.e)),
        9 => {
            let mut addr = usize::from(cpu.d) << 8 | usize::from(cpu.e);
            loop {
                let ch = mem.read(addr);
                if ch == b'$' {
                    break;
                }
                out.push(char::from(ch));
                addr += 1;
            }
        }
        c => panic!("unexpected syscall: c={c:02x}"),
    }
    // Return to the caller.
    let ret = mem.read_le(usize::from(cpu.sp));
    cpu.sp = cpu.sp.wrapping_add(2);
    cpu.set_pc(usize::from(ret));
}

#[test]
#[ignore = "needs zexdoc.com under $RCS_HOME/ext/zex"]
fn zexdoc() {
    let path = resource_dir().join("ext/zex/zexdoc.com");
    let code = fs::read(&path)
        .unwrap_or_else(|err| panic!("unable to load {}: {err}", path.display()));

    let mut mem = Memory::new(1, 0x10000);
    let mut image = vec![0; 0x10000];
    image[0x100..0x100 + code.len()].copy_from_slice(&code);
    let ram = mem.ram(image);
    mem.map_ram(0, ram);

    let mut cpu = Z80::new();
    cpu.set_pc(0x0100);
    let mut out = String::new();
    let mut line = String::new();
    loop {
        cpu.next(&mut mem);
        match cpu.pc() {
            // Warm boot: the exerciser is done.
            0x0000 => break,
            0x0005 => {
                let before = out.len();
                syscall(&mut cpu, &mut mem, &mut out);
                line.push_str(&out[before..]);
                if let Some(at) = line.rfind('\n') {
                    print!("{}", &line[..=at]);
                    line = line.split_off(at + 1);
                }
            }
            _ => {}
        }
    }
    assert!(!out.contains("ERROR"), "\n{out}");
}
