//! 6502 disassembler.

use rcs_core::{Memory, Pointer, Stmt};

/// Addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Accumulator,
    Immediate,
    Implied,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
}

/// Number of operand bytes that follow the opcode.
const fn operand_len(mode: Mode) -> usize {
    match mode {
        Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 2,
        Mode::Immediate
        | Mode::IndirectX
        | Mode::IndirectY
        | Mode::Relative
        | Mode::ZeroPage
        | Mode::ZeroPageX
        | Mode::ZeroPageY => 1,
        Mode::Accumulator | Mode::Implied => 0,
    }
}

/// Decode one statement, advancing the pointer past the instruction.
pub(crate) fn disassemble(mem: &mut Memory, ptr: &mut Pointer) -> Stmt {
    let mut stmt = Stmt {
        addr: ptr.addr(),
        ..Stmt::default()
    };
    let opcode = ptr.fetch(mem);
    stmt.bytes.push(opcode);

    let Some((inst, mode)) = decode(opcode) else {
        stmt.op = format!("?{opcode:02x}");
        return stmt;
    };

    let value = match operand_len(mode) {
        1 => {
            let v = ptr.fetch(mem);
            stmt.bytes.push(v);
            u16::from(v)
        }
        2 => {
            let v = ptr.fetch_le(mem);
            stmt.bytes.push(v as u8);
            stmt.bytes.push((v >> 8) as u8);
            v
        }
        _ => 0,
    };

    let operand = match mode {
        Mode::Absolute => format!("${value:04x}"),
        Mode::AbsoluteX => format!("${value:04x},x"),
        Mode::AbsoluteY => format!("${value:04x},y"),
        Mode::Accumulator => "a".to_string(),
        Mode::Immediate => format!("#${value:02x}"),
        Mode::Implied => String::new(),
        Mode::Indirect => format!("(${value:04x})"),
        Mode::IndirectX => format!("(${value:02x},x)"),
        Mode::IndirectY => format!("(${value:02x}),y"),
        Mode::Relative => {
            // Displacement is relative to the end of the instruction.
            let disp = value as u8 as i8;
            let target = (stmt.addr as u16)
                .wrapping_add(2)
                .wrapping_add(disp as u16);
            format!("${target:04x}")
        }
        Mode::ZeroPage => format!("${value:02x}"),
        Mode::ZeroPageX => format!("${value:02x},x"),
        Mode::ZeroPageY => format!("${value:02x},y"),
    };

    stmt.op = if operand.is_empty() {
        inst.to_string()
    } else {
        format!("{inst} {operand}")
    };
    stmt
}

/// Instruction mnemonic and addressing mode for each legal opcode.
#[allow(clippy::too_many_lines)]
pub(crate) fn decode(opcode: u8) -> Option<(&'static str, Mode)> {
    use Mode::{
        Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, Indirect, IndirectX,
        IndirectY, Relative, ZeroPage, ZeroPageX, ZeroPageY,
    };

    let entry = match opcode {
        0x69 => ("adc", Immediate),
        0x65 => ("adc", ZeroPage),
        0x75 => ("adc", ZeroPageX),
        0x6d => ("adc", Absolute),
        0x7d => ("adc", AbsoluteX),
        0x79 => ("adc", AbsoluteY),
        0x61 => ("adc", IndirectX),
        0x71 => ("adc", IndirectY),

        0x29 => ("and", Immediate),
        0x25 => ("and", ZeroPage),
        0x35 => ("and", ZeroPageX),
        0x2d => ("and", Absolute),
        0x3d => ("and", AbsoluteX),
        0x39 => ("and", AbsoluteY),
        0x21 => ("and", IndirectX),
        0x31 => ("and", IndirectY),

        0x0a => ("asl", Accumulator),
        0x06 => ("asl", ZeroPage),
        0x16 => ("asl", ZeroPageX),
        0x0e => ("asl", Absolute),
        0x1e => ("asl", AbsoluteX),

        0x90 => ("bcc", Relative),
        0xb0 => ("bcs", Relative),
        0xf0 => ("beq", Relative),
        0x30 => ("bmi", Relative),
        0xd0 => ("bne", Relative),
        0x10 => ("bpl", Relative),
        0x50 => ("bvc", Relative),
        0x70 => ("bvs", Relative),

        0x24 => ("bit", ZeroPage),
        0x2c => ("bit", Absolute),

        0x00 => ("brk", Implied),

        0x18 => ("clc", Implied),
        0xd8 => ("cld", Implied),
        0x58 => ("cli", Implied),
        0xb8 => ("clv", Implied),

        0xc9 => ("cmp", Immediate),
        0xc5 => ("cmp", ZeroPage),
        0xd5 => ("cmp", ZeroPageX),
        0xcd => ("cmp", Absolute),
        0xdd => ("cmp", AbsoluteX),
        0xd9 => ("cmp", AbsoluteY),
        0xc1 => ("cmp", IndirectX),
        0xd1 => ("cmp", IndirectY),

        0xe0 => ("cpx", Immediate),
        0xe4 => ("cpx", ZeroPage),
        0xec => ("cpx", Absolute),

        0xc0 => ("cpy", Immediate),
        0xc4 => ("cpy", ZeroPage),
        0xcc => ("cpy", Absolute),

        0xc6 => ("dec", ZeroPage),
        0xd6 => ("dec", ZeroPageX),
        0xce => ("dec", Absolute),
        0xde => ("dec", AbsoluteX),

        0xca => ("dex", Implied),
        0x88 => ("dey", Implied),

        0x49 => ("eor", Immediate),
        0x45 => ("eor", ZeroPage),
        0x55 => ("eor", ZeroPageX),
        0x4d => ("eor", Absolute),
        0x5d => ("eor", AbsoluteX),
        0x59 => ("eor", AbsoluteY),
        0x41 => ("eor", IndirectX),
        0x51 => ("eor", IndirectY),

        0xe6 => ("inc", ZeroPage),
        0xf6 => ("inc", ZeroPageX),
        0xee => ("inc", Absolute),
        0xfe => ("inc", AbsoluteX),

        0xe8 => ("inx", Implied),
        0xc8 => ("iny", Implied),

        0x4c => ("jmp", Absolute),
        0x6c => ("jmp", Indirect),
        0x20 => ("jsr", Absolute),

        0xa9 => ("lda", Immediate),
        0xa5 => ("lda", ZeroPage),
        0xb5 => ("lda", ZeroPageX),
        0xad => ("lda", Absolute),
        0xbd => ("lda", AbsoluteX),
        0xb9 => ("lda", AbsoluteY),
        0xa1 => ("lda", IndirectX),
        0xb1 => ("lda", IndirectY),

        0xa2 => ("ldx", Immediate),
        0xa6 => ("ldx", ZeroPage),
        0xb6 => ("ldx", ZeroPageY),
        0xae => ("ldx", Absolute),
        0xbe => ("ldx", AbsoluteY),

        0xa0 => ("ldy", Immediate),
        0xa4 => ("ldy", ZeroPage),
        0xb4 => ("ldy", ZeroPageX),
        0xac => ("ldy", Absolute),
        0xbc => ("ldy", AbsoluteX),

        0x4a => ("lsr", Accumulator),
        0x46 => ("lsr", ZeroPage),
        0x56 => ("lsr", ZeroPageX),
        0x4e => ("lsr", Absolute),
        0x5e => ("lsr", AbsoluteX),

        0xea => ("nop", Implied),

        0x09 => ("ora", Immediate),
        0x05 => ("ora", ZeroPage),
        0x15 => ("ora", ZeroPageX),
        0x0d => ("ora", Absolute),
        0x1d => ("ora", AbsoluteX),
        0x19 => ("ora", AbsoluteY),
        0x01 => ("ora", IndirectX),
        0x11 => ("ora", IndirectY),

        0x48 => ("pha", Implied),
        0x08 => ("php", Implied),
        0x68 => ("pla", Implied),
        0x28 => ("plp", Implied),

        0x2a => ("rol", Accumulator),
        0x26 => ("rol", ZeroPage),
        0x36 => ("rol", ZeroPageX),
        0x2e => ("rol", Absolute),
        0x3e => ("rol", AbsoluteX),

        0x6a => ("ror", Accumulator),
        0x66 => ("ror", ZeroPage),
        0x76 => ("ror", ZeroPageX),
        0x6e => ("ror", Absolute),
        0x7e => ("ror", AbsoluteX),

        0x40 => ("rti", Implied),
        0x60 => ("rts", Implied),

        0xe9 => ("sbc", Immediate),
        0xe5 => ("sbc", ZeroPage),
        0xf5 => ("sbc", ZeroPageX),
        0xed => ("sbc", Absolute),
        0xfd => ("sbc", AbsoluteX),
        0xf9 => ("sbc", AbsoluteY),
        0xe1 => ("sbc", IndirectX),
        0xf1 => ("sbc", IndirectY),

        0x38 => ("sec", Implied),
        0xf8 => ("sed", Implied),
        0x78 => ("sei", Implied),

        0x85 => ("sta", ZeroPage),
        0x95 => ("sta", ZeroPageX),
        0x8d => ("sta", Absolute),
        0x9d => ("sta", AbsoluteX),
        0x99 => ("sta", AbsoluteY),
        0x81 => ("sta", IndirectX),
        0x91 => ("sta", IndirectY),

        0x86 => ("stx", ZeroPage),
        0x96 => ("stx", ZeroPageY),
        0x8e => ("stx", Absolute),

        0x84 => ("sty", ZeroPage),
        0x94 => ("sty", ZeroPageX),
        0x8c => ("sty", Absolute),

        0xaa => ("tax", Implied),
        0xa8 => ("tay", Implied),
        0xba => ("tsx", Implied),
        0x8a => ("txa", Implied),
        0x9a => ("txs", Implied),
        0x98 => ("tya", Implied),

        _ => return None,
    };
    Some(entry)
}
