//! Z80 disassembler.
//!
//! Decodes structurally, mirroring the execution dispatch. Prefixed
//! opcodes that have no indexed meaning are shown as unknown, as are
//! stacked prefixes.

use rcs_core::{Memory, Pointer, Stmt};

use crate::cpu::Index;

const R: [&str; 8] = ["b", "c", "d", "e", "h", "l", "(hl)", "a"];
const RP: [&str; 4] = ["bc", "de", "hl", "sp"];
const RP2: [&str; 4] = ["bc", "de", "hl", "af"];
const CC: [&str; 8] = ["nz", "z", "nc", "c", "po", "pe", "p", "m"];
const ROT: [&str; 8] = ["rlc", "rrc", "rl", "rr", "sla", "sra", "sll", "srl"];
const BLOCK: [[&str; 4]; 4] = [
    ["ldi", "ldd", "ldir", "lddr"],
    ["cpi", "cpd", "cpir", "cpdr"],
    ["ini", "ind", "inir", "indr"],
    ["outi", "outd", "otir", "otdr"],
];

struct Decoder<'a> {
    mem: &'a mut Memory,
    ptr: &'a mut Pointer,
    bytes: Vec<u8>,
}

impl Decoder<'_> {
    fn fetch(&mut self) -> u8 {
        let v = self.ptr.fetch(self.mem);
        self.bytes.push(v);
        v
    }

    fn fetch2(&mut self) -> u16 {
        let lo = u16::from(self.fetch());
        let hi = u16::from(self.fetch());
        hi << 8 | lo
    }
}

/// Decode one statement, advancing the pointer past the instruction.
pub(crate) fn disassemble(mem: &mut Memory, ptr: &mut Pointer) -> Stmt {
    let addr = ptr.addr();
    let mut d = Decoder {
        mem,
        ptr,
        bytes: Vec::new(),
    };
    let opcode = d.fetch();
    let op = match opcode {
        0xcb => {
            let op = d.fetch();
            cb_text(&mut d, op, Index::Hl, None)
        }
        0xed => {
            let op = d.fetch();
            ed_text(&mut d, op).unwrap_or_else(|| format!("?ed{op:02x}"))
        }
        0xdd => prefix_text(&mut d, Index::Ix, "dd"),
        0xfd => prefix_text(&mut d, Index::Iy, "fd"),
        _ => main_text(&mut d, opcode, Index::Hl, addr),
    };
    Stmt {
        addr,
        op,
        bytes: d.bytes,
        ..Stmt::default()
    }
}

fn op_text(mnemonic: &str, args: &[String]) -> String {
    if args.is_empty() {
        mnemonic.to_string()
    } else {
        format!("{mnemonic:<4} {}", args.join(","))
    }
}

fn hl_name(idx: Index) -> &'static str {
    match idx {
        Index::Hl => "hl",
        Index::Ix => "ix",
        Index::Iy => "iy",
    }
}

fn reg_name(idx: Index, r: u8) -> &'static str {
    match (idx, r) {
        (Index::Ix, 4) => "ixh",
        (Index::Ix, 5) => "ixl",
        (Index::Iy, 4) => "iyh",
        (Index::Iy, 5) => "iyl",
        _ => R[usize::from(r)],
    }
}

/// The r operand as display text. Fetches the displacement byte for
/// the indexed memory forms.
fn r_token(d: &mut Decoder, idx: Index, r: u8) -> String {
    if r == 6 && idx != Index::Hl {
        let disp = d.fetch();
        format!("({}+${disp:02x})", hl_name(idx))
    } else {
        reg_name(idx, r).to_string()
    }
}

/// The HL slot name with p=2, one of the other pairs otherwise.
fn rp_name(idx: Index, p: u8) -> &'static str {
    if p == 2 {
        hl_name(idx)
    } else {
        RP[usize::from(p)]
    }
}

/// True if the opcode has an operand remapped by a DD or FD prefix.
fn uses_hl_slot(op: u8) -> bool {
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    let q = y & 1;
    match x {
        0 => match z {
            // ld hl,nn and add hl,rr
            1 => p == 2 || q == 1,
            // ld (nn),hl / ld hl,(nn); inc hl / dec hl
            2 | 3 => p == 2,
            // inc, dec, and ld n on h, l, or (hl)
            4..=6 => (4..=6).contains(&y),
            _ => false,
        },
        1 => op != 0x76 && ((4..=6).contains(&y) || (4..=6).contains(&z)),
        2 => (4..=6).contains(&z),
        _ => match z {
            // pop hl; jp (hl); ld sp,hl
            1 => (q == 0 && p == 2) || (q == 1 && p >= 2),
            // ex (sp),hl but never ex de,hl
            3 => y == 4,
            // push hl
            5 => q == 0 && p == 2,
            _ => false,
        },
    }
}

fn prefix_text(d: &mut Decoder, idx: Index, name: &str) -> String {
    let next = d.ptr.peek(d.mem);
    // A stacked prefix consumes only the first byte.
    if next == 0xdd || next == 0xed || next == 0xfd {
        return format!("?{name}");
    }
    let op = d.fetch();
    if op == 0xcb {
        let disp = d.fetch();
        let op = d.fetch();
        return cb_text(d, op, idx, Some(disp));
    }
    if !uses_hl_slot(op) {
        return format!("?{name}{op:02x}");
    }
    main_text(d, op, idx, 0)
}

#[allow(clippy::too_many_lines)]
fn main_text(d: &mut Decoder, op: u8, idx: Index, addr: usize) -> String {
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    let q = y & 1;

    let relative = |d: &mut Decoder| {
        let disp = d.fetch() as i8;
        let target = (addr as u16).wrapping_add(2).wrapping_add(disp as u16);
        format!("${target:04x}")
    };

    match x {
        0 => match z {
            0 => match y {
                0 => op_text("nop", &[]),
                1 => op_text("ex", &["af".to_string(), "af'".to_string()]),
                2 => {
                    let target = relative(d);
                    op_text("djnz", &[target])
                }
                3 => {
                    let target = relative(d);
                    op_text("jr", &[target])
                }
                _ => {
                    let target = relative(d);
                    op_text("jr", &[CC[usize::from(y - 4)].to_string(), target])
                }
            },
            1 => {
                if q == 0 {
                    let v = d.fetch2();
                    op_text("ld", &[rp_name(idx, p).to_string(), format!("${v:04x}")])
                } else {
                    op_text(
                        "add",
                        &[hl_name(idx).to_string(), rp_name(idx, p).to_string()],
                    )
                }
            }
            2 => match (q, p) {
                (0, 0) => op_text("ld", &["(bc)".to_string(), "a".to_string()]),
                (0, 1) => op_text("ld", &["(de)".to_string(), "a".to_string()]),
                (0, 2) => {
                    let v = d.fetch2();
                    op_text("ld", &[format!("(${v:04x})"), hl_name(idx).to_string()])
                }
                (0, _) => {
                    let v = d.fetch2();
                    op_text("ld", &[format!("(${v:04x})"), "a".to_string()])
                }
                (_, 0) => op_text("ld", &["a".to_string(), "(bc)".to_string()]),
                (_, 1) => op_text("ld", &["a".to_string(), "(de)".to_string()]),
                (_, 2) => {
                    let v = d.fetch2();
                    op_text("ld", &[hl_name(idx).to_string(), format!("(${v:04x})")])
                }
                (_, _) => {
                    let v = d.fetch2();
                    op_text("ld", &["a".to_string(), format!("(${v:04x})")])
                }
            },
            3 => {
                let m = if q == 0 { "inc" } else { "dec" };
                op_text(m, &[rp_name(idx, p).to_string()])
            }
            4 => {
                let t = r_token(d, idx, y);
                op_text("inc", &[t])
            }
            5 => {
                let t = r_token(d, idx, y);
                op_text("dec", &[t])
            }
            6 => {
                // Displacement before the immediate for the indexed form
                let t = r_token(d, idx, y);
                let v = d.fetch();
                op_text("ld", &[t, format!("${v:02x}")])
            }
            _ => {
                let m = ["rlca", "rrca", "rla", "rra", "daa", "cpl", "scf", "ccf"];
                op_text(m[usize::from(y)], &[])
            }
        },
        1 => {
            if op == 0x76 {
                op_text("halt", &[])
            } else if y == 6 {
                let t = r_token(d, idx, 6);
                op_text("ld", &[t, R[usize::from(z)].to_string()])
            } else if z == 6 {
                let t = r_token(d, idx, 6);
                op_text("ld", &[R[usize::from(y)].to_string(), t])
            } else {
                op_text(
                    "ld",
                    &[reg_name(idx, y).to_string(), reg_name(idx, z).to_string()],
                )
            }
        }
        2 => {
            let t = r_token(d, idx, z);
            alu_text(y, t)
        }
        _ => match z {
            0 => op_text("ret", &[CC[usize::from(y)].to_string()]),
            1 => {
                if q == 0 {
                    let name = if p == 2 { hl_name(idx) } else { RP2[usize::from(p)] };
                    op_text("pop", &[name.to_string()])
                } else {
                    match p {
                        0 => op_text("ret", &[]),
                        1 => op_text("exx", &[]),
                        2 => op_text("jp", &[format!("({})", hl_name(idx))]),
                        _ => op_text("ld", &["sp".to_string(), hl_name(idx).to_string()]),
                    }
                }
            }
            2 => {
                let v = d.fetch2();
                op_text("jp", &[CC[usize::from(y)].to_string(), format!("${v:04x}")])
            }
            3 => match y {
                0 => {
                    let v = d.fetch2();
                    op_text("jp", &[format!("${v:04x}")])
                }
                2 => {
                    let v = d.fetch();
                    op_text("out", &[format!("(${v:02x})"), "a".to_string()])
                }
                3 => {
                    let v = d.fetch();
                    op_text("in", &["a".to_string(), format!("(${v:02x})")])
                }
                4 => op_text("ex", &["(sp)".to_string(), hl_name(idx).to_string()]),
                5 => op_text("ex", &["de".to_string(), "hl".to_string()]),
                6 => op_text("di", &[]),
                7 => op_text("ei", &[]),
                _ => format!("?{op:02x}"),
            },
            4 => {
                let v = d.fetch2();
                op_text(
                    "call",
                    &[CC[usize::from(y)].to_string(), format!("${v:04x}")],
                )
            }
            5 => {
                if q == 0 {
                    let name = if p == 2 { hl_name(idx) } else { RP2[usize::from(p)] };
                    op_text("push", &[name.to_string()])
                } else if p == 0 {
                    let v = d.fetch2();
                    op_text("call", &[format!("${v:04x}")])
                } else {
                    // DD, ED, and FD are consumed before dispatch
                    format!("?{op:02x}")
                }
            }
            6 => {
                let v = d.fetch();
                alu_text(y, format!("${v:02x}"))
            }
            _ => {
                let target = u16::from(y) * 8;
                op_text("rst", &[format!("${target:02x}")])
            }
        },
    }
}

fn alu_text(op_i: u8, operand: String) -> String {
    match op_i {
        0 => op_text("add", &["a".to_string(), operand]),
        1 => op_text("adc", &["a".to_string(), operand]),
        2 => op_text("sub", &[operand]),
        3 => op_text("sbc", &["a".to_string(), operand]),
        4 => op_text("and", &[operand]),
        5 => op_text("xor", &[operand]),
        6 => op_text("or", &[operand]),
        _ => op_text("cp", &[operand]),
    }
}

fn cb_text(d: &mut Decoder, op: u8, idx: Index, disp: Option<u8>) -> String {
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;

    let operand = match disp {
        Some(disp) => format!("({}+${disp:02x})", hl_name(idx)),
        None => r_token(d, idx, z),
    };
    // The indexed forms with a register operand also copy the result
    // into that register.
    let copy = disp.is_some() && z != 6 && x != 1;

    let mut args = Vec::new();
    let mnemonic = match x {
        0 => ROT[usize::from(y)],
        1 => {
            args.push(y.to_string());
            "bit"
        }
        2 => {
            args.push(y.to_string());
            "res"
        }
        _ => {
            args.push(y.to_string());
            "set"
        }
    };
    args.push(operand);
    if copy {
        args.push(R[usize::from(z)].to_string());
    }
    op_text(mnemonic, &args)
}

fn ed_text(d: &mut Decoder, op: u8) -> Option<String> {
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    let q = y & 1;

    let text = match (x, z) {
        (1, 0) => {
            if y == 6 {
                op_text("in", &["(c)".to_string()])
            } else {
                op_text("in", &[R[usize::from(y)].to_string(), "(c)".to_string()])
            }
        }
        (1, 1) => {
            if y == 6 {
                op_text("out", &["(c)".to_string(), "$00".to_string()])
            } else {
                op_text("out", &["(c)".to_string(), R[usize::from(y)].to_string()])
            }
        }
        (1, 2) => {
            let m = if q == 0 { "sbc" } else { "adc" };
            op_text(m, &["hl".to_string(), RP[usize::from(p)].to_string()])
        }
        (1, 3) => {
            let v = d.fetch2();
            if q == 0 {
                op_text("ld", &[format!("(${v:04x})"), RP[usize::from(p)].to_string()])
            } else {
                op_text("ld", &[RP[usize::from(p)].to_string(), format!("(${v:04x})")])
            }
        }
        (1, 4) => op_text("neg", &[]),
        (1, 5) => {
            if y == 1 {
                op_text("reti", &[])
            } else {
                op_text("retn", &[])
            }
        }
        (1, 6) => {
            let mode = match y {
                2 | 6 => "1",
                3 | 7 => "2",
                _ => "0",
            };
            op_text("im", &[mode.to_string()])
        }
        (1, 7) => match y {
            0 => op_text("ld", &["i".to_string(), "a".to_string()]),
            1 => op_text("ld", &["r".to_string(), "a".to_string()]),
            2 => op_text("ld", &["a".to_string(), "i".to_string()]),
            3 => op_text("ld", &["a".to_string(), "r".to_string()]),
            4 => op_text("rrd", &[]),
            5 => op_text("rld", &[]),
            _ => return None,
        },
        (2, 0..=3) if y >= 4 => op_text(BLOCK[usize::from(z)][usize::from(y - 4)], &[]),
        _ => return None,
    };
    Some(text)
}
