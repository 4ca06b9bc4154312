//! Disassembler output tests.

use rcs_core::mock::test_memory;
use rcs_core::{format_stmt, Cpu, FormatOptions, Pointer};
use zilog_z80::Z80;

fn op(bytes: &[u8]) -> String {
    let mut mem = test_memory();
    mem.write_n(0x0200, bytes);
    let cpu = Z80::new();
    let mut ptr = Pointer::new();
    ptr.set_addr(0x0200);
    let stmt = cpu.disassemble(&mut mem, &mut ptr);
    assert_eq!(ptr.addr(), 0x0200 + stmt.bytes.len(), "pointer advance");
    stmt.op
}

fn line(bytes: &[u8]) -> String {
    let mut mem = test_memory();
    mem.write_n(0x0200, bytes);
    let cpu = Z80::new();
    let mut ptr = Pointer::new();
    ptr.set_addr(0x0200);
    let stmt = cpu.disassemble(&mut mem, &mut ptr);
    format_stmt(
        &stmt,
        FormatOptions {
            bytes_width: cpu.dasm_bytes_width(),
        },
    )
}

#[test]
fn no_operands() {
    assert_eq!(op(&[0x00]), "nop");
    assert_eq!(op(&[0x76]), "halt");
    assert_eq!(op(&[0xd9]), "exx");
    assert_eq!(op(&[0xf3]), "di");
    assert_eq!(op(&[0x27]), "daa");
}

#[test]
fn loads() {
    assert_eq!(op(&[0x3e, 0x56]), "ld   a,$56");
    assert_eq!(op(&[0x78]), "ld   a,b");
    assert_eq!(op(&[0x66]), "ld   h,(hl)");
    assert_eq!(op(&[0x01, 0x34, 0x12]), "ld   bc,$1234");
    assert_eq!(op(&[0x36, 0x99]), "ld   (hl),$99");
    assert_eq!(op(&[0x32, 0x00, 0x04]), "ld   ($0400),a");
    assert_eq!(op(&[0x2a, 0x00, 0x04]), "ld   hl,($0400)");
    assert_eq!(op(&[0x0a]), "ld   a,(bc)");
    assert_eq!(op(&[0xf9]), "ld   sp,hl");
}

#[test]
fn arithmetic() {
    assert_eq!(op(&[0x80]), "add  a,b");
    assert_eq!(op(&[0x8e]), "adc  a,(hl)");
    assert_eq!(op(&[0x96]), "sub  (hl)");
    assert_eq!(op(&[0xfe, 0x28]), "cp   $28");
    assert_eq!(op(&[0xe6, 0xf0]), "and  $f0");
    assert_eq!(op(&[0x09]), "add  hl,bc");
    assert_eq!(op(&[0x04]), "inc  b");
    assert_eq!(op(&[0x35]), "dec  (hl)");
    assert_eq!(op(&[0x0b]), "dec  bc");
}

#[test]
fn jumps_are_resolved_to_targets() {
    assert_eq!(op(&[0x18, 0xfe]), "jr   $0200");
    assert_eq!(op(&[0x18, 0x05]), "jr   $0207");
    assert_eq!(op(&[0x10, 0xfe]), "djnz $0200");
    assert_eq!(op(&[0x20, 0x02]), "jr   nz,$0204");
    assert_eq!(op(&[0xc3, 0x34, 0x12]), "jp   $1234");
    assert_eq!(op(&[0xca, 0x34, 0x12]), "jp   z,$1234");
    assert_eq!(op(&[0xe9]), "jp   (hl)");
    assert_eq!(op(&[0xcd, 0x00, 0x03]), "call $0300");
    assert_eq!(op(&[0xdc, 0x00, 0x03]), "call c,$0300");
    assert_eq!(op(&[0xc9]), "ret");
    assert_eq!(op(&[0xc0]), "ret  nz");
    assert_eq!(op(&[0xc7]), "rst  $00");
    assert_eq!(op(&[0xff]), "rst  $38");
}

#[test]
fn stack_and_exchange() {
    assert_eq!(op(&[0xc5]), "push bc");
    assert_eq!(op(&[0xf1]), "pop  af");
    assert_eq!(op(&[0x08]), "ex   af,af'");
    assert_eq!(op(&[0xeb]), "ex   de,hl");
    assert_eq!(op(&[0xe3]), "ex   (sp),hl");
}

#[test]
fn io() {
    assert_eq!(op(&[0xd3, 0x42]), "out  ($42),a");
    assert_eq!(op(&[0xdb, 0x42]), "in   a,($42)");
    assert_eq!(op(&[0xed, 0x50]), "in   d,(c)");
    assert_eq!(op(&[0xed, 0x59]), "out  (c),e");
}

#[test]
fn cb_prefix() {
    assert_eq!(op(&[0xcb, 0x00]), "rlc  b");
    assert_eq!(op(&[0xcb, 0x1e]), "rr   (hl)");
    assert_eq!(op(&[0xcb, 0x30]), "sll  b");
    assert_eq!(op(&[0xcb, 0x46]), "bit  0,(hl)");
    assert_eq!(op(&[0xcb, 0x7f]), "bit  7,a");
    assert_eq!(op(&[0xcb, 0x87]), "res  0,a");
    assert_eq!(op(&[0xcb, 0xc7]), "set  0,a");
}

#[test]
fn ed_prefix() {
    assert_eq!(op(&[0xed, 0x44]), "neg");
    assert_eq!(op(&[0xed, 0x45]), "retn");
    assert_eq!(op(&[0xed, 0x4d]), "reti");
    assert_eq!(op(&[0xed, 0x56]), "im   1");
    assert_eq!(op(&[0xed, 0x47]), "ld   i,a");
    assert_eq!(op(&[0xed, 0x5f]), "ld   a,r");
    assert_eq!(op(&[0xed, 0x52]), "sbc  hl,de");
    assert_eq!(op(&[0xed, 0x4a]), "adc  hl,bc");
    assert_eq!(op(&[0xed, 0x43, 0x00, 0x04]), "ld   ($0400),bc");
    assert_eq!(op(&[0xed, 0x5b, 0x00, 0x04]), "ld   de,($0400)");
    assert_eq!(op(&[0xed, 0x67]), "rrd");
    assert_eq!(op(&[0xed, 0xb0]), "ldir");
    assert_eq!(op(&[0xed, 0xa9]), "cpd");
    assert_eq!(op(&[0xed, 0xbb]), "otdr");
}

#[test]
fn index_prefixes() {
    assert_eq!(op(&[0xdd, 0x21, 0x34, 0x12]), "ld   ix,$1234");
    assert_eq!(op(&[0xfd, 0x21, 0x34, 0x12]), "ld   iy,$1234");
    assert_eq!(op(&[0xdd, 0x86, 0x05]), "add  a,(ix+$05)");
    assert_eq!(op(&[0xfd, 0x7e, 0x02]), "ld   a,(iy+$02)");
    assert_eq!(op(&[0xdd, 0x36, 0x03, 0x99]), "ld   (ix+$03),$99");
    assert_eq!(op(&[0xdd, 0x60]), "ld   ixh,b");
    assert_eq!(op(&[0xdd, 0x66, 0x02]), "ld   h,(ix+$02)");
    assert_eq!(op(&[0xdd, 0x09]), "add  ix,bc");
    assert_eq!(op(&[0xdd, 0xe9]), "jp   (ix)");
    assert_eq!(op(&[0xdd, 0xe5]), "push ix");
    assert_eq!(op(&[0xdd, 0xe3]), "ex   (sp),ix");
}

#[test]
fn index_with_cb() {
    assert_eq!(op(&[0xdd, 0xcb, 0x05, 0x06]), "rlc  (ix+$05)");
    assert_eq!(op(&[0xdd, 0xcb, 0x05, 0x00]), "rlc  (ix+$05),b");
    assert_eq!(op(&[0xfd, 0xcb, 0x01, 0x7e]), "bit  7,(iy+$01)");
    assert_eq!(op(&[0xdd, 0xcb, 0x02, 0xc7]), "set  0,(ix+$02),a");
}

#[test]
fn unknown_opcodes() {
    assert_eq!(op(&[0xed, 0x00]), "?ed00");
    assert_eq!(op(&[0xed, 0x77]), "?ed77");
    assert_eq!(op(&[0xdd, 0x00]), "?dd00");
    assert_eq!(op(&[0xfd, 0x04]), "?fd04");
    // Prefix with no indexed meaning: ex de,hl is never remapped
    assert_eq!(op(&[0xdd, 0xeb]), "?ddeb");
}

#[test]
fn stacked_prefix_consumes_one_byte() {
    let mut mem = test_memory();
    mem.write_n(0x0200, &[0xdd, 0xdd, 0x21, 0x34, 0x12]);
    let cpu = Z80::new();
    let mut ptr = Pointer::new();
    ptr.set_addr(0x0200);
    let stmt = cpu.disassemble(&mut mem, &mut ptr);
    assert_eq!(stmt.op, "?dd");
    assert_eq!(stmt.bytes, vec![0xdd]);
    assert_eq!(ptr.addr(), 0x0201);
    let stmt = cpu.disassemble(&mut mem, &mut ptr);
    assert_eq!(stmt.op, "ld   ix,$1234");
}

#[test]
fn formatted_line() {
    assert_eq!(line(&[0x21, 0x34, 0x12]), "$0200:  21 34 12     ld   hl,$1234");
    assert_eq!(
        line(&[0xdd, 0xcb, 0x05, 0x06]),
        "$0200:  dd cb 05 06  rlc  (ix+$05)"
    );
}
