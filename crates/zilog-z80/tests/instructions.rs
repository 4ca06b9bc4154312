//! Instruction behavior tests.

use rcs_core::mock::test_memory;
use rcs_core::{Cpu, Memory, Value};
use zilog_z80::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use zilog_z80::Z80;

fn test_cpu() -> (Z80, Memory) {
    let mut cpu = Z80::new();
    let mem = test_memory();
    cpu.set_pc(0x0200);
    cpu.sp = 0xff00;
    (cpu, mem)
}

fn flag_string(f: u8) -> String {
    format!("sz5h3vnc {f:08b}")
}

#[track_caller]
fn assert_f(want: u8, have: u8) {
    assert_eq!(flag_string(want), flag_string(have));
}

// ============================================================================
// 8-bit loads
// ============================================================================

#[test]
fn ld_a_n() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x3e, 0x56]); // ld a,$56
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x56);
    assert_eq!(cpu.pc(), 0x0202);
    assert_f(0, cpu.f);
}

#[test]
fn ld_a_b() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x78); // ld a,b
    cpu.b = 0x12;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x12);
}

#[test]
fn ld_mem_hl_n() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x36, 0x99]); // ld (hl),$99
    cpu.h = 0x12;
    cpu.l = 0x34;
    cpu.next(&mut mem);
    assert_eq!(mem.read(0x1234), 0x99);
}

#[test]
fn ld_a_indirect_bc() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x0a); // ld a,(bc)
    mem.write(0x0345, 0x42);
    cpu.b = 0x03;
    cpu.c = 0x45;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x42);
}

#[test]
fn ld_nn_a_and_back() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x32, 0x00, 0x04, 0x3a, 0x00, 0x04]);
    cpu.a = 0x77;
    cpu.next(&mut mem); // ld ($0400),a
    assert_eq!(mem.read(0x0400), 0x77);
    cpu.a = 0;
    cpu.next(&mut mem); // ld a,($0400)
    assert_eq!(cpu.a, 0x77);
}

// ============================================================================
// 16-bit loads
// ============================================================================

#[test]
fn ld_rr_nn() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x01, 0x34, 0x12]); // ld bc,$1234
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x12);
    assert_eq!(cpu.c, 0x34);
}

#[test]
fn ld_nn_hl_and_back() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x22, 0x00, 0x04, 0x2a, 0x00, 0x04]);
    cpu.h = 0xab;
    cpu.l = 0xcd;
    cpu.next(&mut mem); // ld ($0400),hl
    assert_eq!(mem.read_le(0x0400), 0xabcd);
    cpu.h = 0;
    cpu.l = 0;
    cpu.next(&mut mem); // ld hl,($0400)
    assert_eq!(cpu.h, 0xab);
    assert_eq!(cpu.l, 0xcd);
}

#[test]
fn ld_sp_hl() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xf9); // ld sp,hl
    cpu.h = 0x80;
    cpu.l = 0x00;
    cpu.next(&mut mem);
    assert_eq!(cpu.sp, 0x8000);
}

// ============================================================================
// 8-bit arithmetic
// ============================================================================

#[test]
fn add_a_b() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x80); // add a,b
    cpu.a = 0x08;
    cpu.b = 0x02;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x0a);
    assert_f(XF, cpu.f);
}

#[test]
fn add_half_carry() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x80);
    cpu.a = 0x0f;
    cpu.b = 0x01;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x10);
    assert_f(HF, cpu.f);
}

#[test]
fn add_carry_and_zero() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x80);
    cpu.a = 0xff;
    cpu.b = 0x01;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x00);
    assert_f(ZF | HF | CF, cpu.f);
}

#[test]
fn add_overflow() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x80);
    cpu.a = 0x7f;
    cpu.b = 0x01;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x80);
    assert_f(SF | HF | PF, cpu.f);
}

#[test]
fn adc_with_carry_in() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x88); // adc a,b
    cpu.a = 0x08;
    cpu.b = 0x02;
    cpu.f = CF;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x0b);
    assert_f(XF, cpu.f);
}

#[test]
fn sub_a_b() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x90); // sub b
    cpu.a = 0x0a;
    cpu.b = 0x02;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x08);
    assert_f(XF | NF, cpu.f);
}

#[test]
fn sub_borrow() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x90);
    cpu.a = 0x02;
    cpu.b = 0x0a;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0xf8);
    assert_f(SF | YF | HF | XF | NF | CF, cpu.f);
}

#[test]
fn sbc_with_borrow_in() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x98); // sbc a,b
    cpu.a = 0x10;
    cpu.b = 0x01;
    cpu.f = CF;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x0e);
    assert_f(HF | XF | NF, cpu.f);
}

#[test]
fn cp_takes_bits_5_3_from_operand() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xfe, 0x28]); // cp $28
    cpu.a = 0x10;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x10, "compare does not store");
    assert_f(SF | YF | HF | XF | NF | CF, cpu.f);
}

#[test]
fn and_sets_half_carry() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xe6, 0xf0]); // and $f0
    cpu.a = 0x0f;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x00);
    assert_f(ZF | HF | PF, cpu.f);
}

#[test]
fn xor_a_clears() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xaf); // xor a
    cpu.a = 0xff;
    cpu.f = 0xff;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x00);
    assert_f(ZF | PF, cpu.f);
}

#[test]
fn or_a_b() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xb0); // or b
    cpu.a = 0x11;
    cpu.b = 0x84;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x95);
    assert_f(SF | PF, cpu.f);
}

#[test]
fn inc_r_preserves_carry() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x04); // inc b
    cpu.b = 0x0f;
    cpu.f = CF;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x10);
    assert_f(HF | CF, cpu.f);
}

#[test]
fn inc_r_overflow() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x04);
    cpu.b = 0x7f;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x80);
    assert_f(SF | HF | PF, cpu.f);
}

#[test]
fn dec_r_sets_n() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x0d); // dec c
    cpu.c = 0x01;
    cpu.next(&mut mem);
    assert_eq!(cpu.c, 0x00);
    assert_f(ZF | NF, cpu.f);
}

#[test]
fn dec_r_wraps() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x0d);
    cpu.c = 0x00;
    cpu.next(&mut mem);
    assert_eq!(cpu.c, 0xff);
    assert_f(SF | YF | HF | XF | NF, cpu.f);
}

#[test]
fn inc_mem_hl() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x34); // inc (hl)
    mem.write(0x0400, 0x41);
    cpu.h = 0x04;
    cpu.l = 0x00;
    cpu.next(&mut mem);
    assert_eq!(mem.read(0x0400), 0x42);
}

#[test]
fn neg() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0x44]);
    cpu.a = 0x01;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0xff);
    assert_f(SF | YF | HF | XF | NF | CF, cpu.f);
}

#[test]
fn daa_after_add() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xc6, 0x27, 0x27]); // add a,$27 then daa
    cpu.a = 0x15;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x3c);
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x42);
    assert_f(HF | PF, cpu.f);
}

#[test]
fn daa_after_sub() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xd6, 0x15, 0x27]); // sub $15 then daa
    cpu.a = 0x42;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x2d);
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x27);
}

#[test]
fn cpl() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x2f);
    cpu.a = 0x55;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0xaa);
    assert_f(YF | HF | XF | NF, cpu.f);
}

#[test]
fn scf_then_ccf() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x37, 0x3f]);
    cpu.a = 0x28;
    cpu.next(&mut mem); // scf
    assert_f(YF | XF | CF, cpu.f);
    cpu.next(&mut mem); // ccf
    assert_f(YF | HF | XF, cpu.f);
}

// ============================================================================
// 16-bit arithmetic
// ============================================================================

#[test]
fn add_hl_bc() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x09); // add hl,bc
    cpu.h = 0x0f;
    cpu.l = 0xff;
    cpu.b = 0x00;
    cpu.c = 0x01;
    cpu.f = ZF; // survives
    cpu.next(&mut mem);
    assert_eq!(cpu.h, 0x10);
    assert_eq!(cpu.l, 0x00);
    assert_f(ZF | HF, cpu.f);
}

#[test]
fn adc_hl_zero_only_when_full_result_zero() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0x4a]); // adc hl,bc
    cpu.h = 0xff;
    cpu.l = 0xff;
    cpu.f = CF;
    cpu.next(&mut mem);
    assert_eq!(cpu.h, 0x00);
    assert_eq!(cpu.l, 0x00);
    assert_f(ZF | HF | CF, cpu.f);
}

#[test]
fn sbc_hl_de() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0x52]); // sbc hl,de
    cpu.d = 0x00;
    cpu.e = 0x01;
    cpu.next(&mut mem);
    assert_eq!(cpu.h, 0xff);
    assert_eq!(cpu.l, 0xff);
    assert_f(SF | YF | HF | XF | NF | CF, cpu.f);
}

#[test]
fn inc_rr_no_flags() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x03); // inc bc
    cpu.b = 0x00;
    cpu.c = 0xff;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x01);
    assert_eq!(cpu.c, 0x00);
    assert_f(0, cpu.f);
}

// ============================================================================
// Exchanges
// ============================================================================

#[test]
fn ex_af_shadow() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x08); // ex af,af'
    cpu.a = 0x01;
    cpu.f = 0x02;
    cpu.a1 = 0x03;
    cpu.f1 = 0x04;
    cpu.next(&mut mem);
    assert_eq!((cpu.a, cpu.f), (0x03, 0x04));
    assert_eq!((cpu.a1, cpu.f1), (0x01, 0x02));
}

#[test]
fn exx() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xd9);
    cpu.b = 0x11;
    cpu.h = 0x22;
    cpu.b1 = 0x33;
    cpu.h1 = 0x44;
    cpu.a = 0x55;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x33);
    assert_eq!(cpu.h, 0x44);
    assert_eq!(cpu.b1, 0x11);
    assert_eq!(cpu.h1, 0x22);
    assert_eq!(cpu.a, 0x55, "af not exchanged");
}

#[test]
fn ex_de_hl() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xeb);
    cpu.d = 0x12;
    cpu.e = 0x34;
    cpu.h = 0x56;
    cpu.l = 0x78;
    cpu.next(&mut mem);
    assert_eq!((cpu.d, cpu.e), (0x56, 0x78));
    assert_eq!((cpu.h, cpu.l), (0x12, 0x34));
}

#[test]
fn ex_sp_hl() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xe3);
    mem.write_le(0xff00, 0x1234);
    cpu.h = 0xab;
    cpu.l = 0xcd;
    cpu.next(&mut mem);
    assert_eq!((cpu.h, cpu.l), (0x12, 0x34));
    assert_eq!(mem.read_le(0xff00), 0xabcd);
}

// ============================================================================
// Stack, jumps, and calls
// ============================================================================

#[test]
fn push_pop() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xc5, 0xd1]); // push bc; pop de
    cpu.b = 0x12;
    cpu.c = 0x34;
    cpu.next(&mut mem);
    assert_eq!(cpu.sp, 0xfefe);
    cpu.next(&mut mem);
    assert_eq!((cpu.d, cpu.e), (0x12, 0x34));
    assert_eq!(cpu.sp, 0xff00);
}

#[test]
fn jr_backward() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x18, 0xfe]); // jr $0200
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0200);
}

#[test]
fn jr_nz_not_taken() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x20, 0x05]); // jr nz,$0207
    cpu.f = ZF;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0202);
}

#[test]
fn djnz_loops_until_zero() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x10, 0xfe]); // djnz $0200
    cpu.b = 0x03;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x02);
    assert_eq!(cpu.pc(), 0x0200);
    cpu.next(&mut mem);
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x00);
    assert_eq!(cpu.pc(), 0x0202);
}

#[test]
fn jp_cc_not_taken() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xca, 0x34, 0x12]); // jp z,$1234
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0203);
}

#[test]
fn jp_hl() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xe9); // jp (hl)
    cpu.h = 0x12;
    cpu.l = 0x34;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x1234);
}

#[test]
fn call_and_ret() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xcd, 0x00, 0x03]); // call $0300
    mem.write(0x0300, 0xc9); // ret
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0300);
    assert_eq!(mem.read_le(0xfefe), 0x0203);
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0203);
    assert_eq!(cpu.sp, 0xff00);
}

#[test]
fn ret_cc_taken() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xc8); // ret z
    cpu.sp = 0xfefe;
    mem.write_le(0xfefe, 0x0456);
    cpu.f = ZF;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0456);
}

#[test]
fn rst() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0xdf); // rst $18
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0018);
    assert_eq!(mem.read_le(0xfefe), 0x0201);
}

// ============================================================================
// Rotates, shifts, and bits
// ============================================================================

#[test]
fn rlca() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x07);
    cpu.a = 0x81;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x03);
    assert_f(CF, cpu.f);
}

#[test]
fn rra_through_carry() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x1f);
    cpu.a = 0x02;
    cpu.f = CF;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x81);
    assert_f(0, cpu.f);
}

#[test]
fn cb_rlc_b() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xcb, 0x00]);
    cpu.b = 0x80;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x01);
    assert_f(CF, cpu.f);
}

#[test]
fn cb_sll_shifts_in_one() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xcb, 0x30]); // sll b
    cpu.b = 0x01;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x03);
    assert_f(PF, cpu.f);
}

#[test]
fn cb_sra_keeps_sign() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xcb, 0x28]); // sra b
    cpu.b = 0x81;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0xc0);
    assert_f(SF | PF | CF, cpu.f);
}

#[test]
fn cb_bit_set() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xcb, 0x40]); // bit 0,b
    cpu.b = 0x01;
    cpu.f = CF;
    cpu.next(&mut mem);
    assert_f(HF | CF, cpu.f);
}

#[test]
fn cb_bit_clear() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xcb, 0x40]);
    cpu.b = 0x00;
    cpu.next(&mut mem);
    assert_f(ZF | HF | PF, cpu.f);
}

#[test]
fn cb_set_and_res() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xcb, 0xc7, 0xcb, 0x87]); // set 0,a; res 0,a
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x01);
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x00);
}

#[test]
fn cb_res_mem_hl() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xcb, 0xbe]); // res 7,(hl)
    mem.write(0x0400, 0xff);
    cpu.h = 0x04;
    cpu.l = 0x00;
    cpu.next(&mut mem);
    assert_eq!(mem.read(0x0400), 0x7f);
}

#[test]
fn rrd() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0x67]);
    mem.write(0x0300, 0x34);
    cpu.a = 0x12;
    cpu.h = 0x03;
    cpu.l = 0x00;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x14);
    assert_eq!(mem.read(0x0300), 0x23);
    assert_f(PF, cpu.f);
}

#[test]
fn rld() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0x6f]);
    mem.write(0x0300, 0x34);
    cpu.a = 0x12;
    cpu.h = 0x03;
    cpu.l = 0x00;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x13);
    assert_eq!(mem.read(0x0300), 0x42);
}

// ============================================================================
// Index registers
// ============================================================================

#[test]
fn dd_remaps_h_to_ixh() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xdd, 0x60]); // ld ixh,b
    cpu.b = 0x12;
    cpu.h = 0x34;
    cpu.next(&mut mem);
    assert_eq!(cpu.ixh, 0x12);
    assert_eq!(cpu.h, 0x34, "real h untouched");
}

#[test]
fn dd_add_a_indexed() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xdd, 0x86, 0x05]); // add a,(ix+$05)
    mem.write(0x0305, 0x07);
    cpu.ixh = 0x03;
    cpu.ixl = 0x00;
    cpu.a = 0x01;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x08);
    assert_eq!(cpu.pc(), 0x0203);
}

#[test]
fn dd_negative_displacement() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xdd, 0x86, 0xff]); // add a,(ix-$01)
    mem.write(0x02ff, 0x05);
    cpu.ixh = 0x03;
    cpu.ixl = 0x00;
    cpu.next(&mut mem);
    assert_eq!(cpu.a, 0x05);
}

#[test]
fn dd_ld_h_indexed_uses_real_h() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xdd, 0x66, 0x02]); // ld h,(ix+$02)
    mem.write(0x0302, 0x77);
    cpu.ixh = 0x03;
    cpu.ixl = 0x00;
    cpu.next(&mut mem);
    assert_eq!(cpu.h, 0x77);
    assert_eq!(cpu.ixh, 0x03);
}

#[test]
fn fd_add_iy_bc() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xfd, 0x09]); // add iy,bc
    cpu.iyh = 0x10;
    cpu.iyl = 0x00;
    cpu.b = 0x00;
    cpu.c = 0x10;
    cpu.next(&mut mem);
    assert_eq!((cpu.iyh, cpu.iyl), (0x10, 0x10));
}

#[test]
fn ddcb_rotate_copies_to_register() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xdd, 0xcb, 0x03, 0x00]); // rlc (ix+$03),b
    mem.write(0x0303, 0x80);
    cpu.ixh = 0x03;
    cpu.ixl = 0x00;
    cpu.next(&mut mem);
    assert_eq!(mem.read(0x0303), 0x01);
    assert_eq!(cpu.b, 0x01);
    assert_f(CF, cpu.f);
}

#[test]
fn ddcb_bit_indexed() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xdd, 0xcb, 0x01, 0x7e]); // bit 7,(ix+$01)
    mem.write(0x0301, 0x80);
    cpu.ixh = 0x03;
    cpu.ixl = 0x00;
    cpu.next(&mut mem);
    assert_f(SF | HF, cpu.f);
}

#[test]
fn dd_prefix_without_indexed_meaning() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xdd, 0x04]); // inc b under a prefix
    cpu.b = 0x41;
    cpu.next(&mut mem);
    assert_eq!(cpu.b, 0x42);
    assert_eq!(cpu.pc(), 0x0202);
}

// ============================================================================
// Block operations
// ============================================================================

#[test]
fn ldir() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0xb0]);
    mem.write_n(0x0300, &[0x01, 0x02, 0x03]);
    cpu.h = 0x03;
    cpu.l = 0x00;
    cpu.d = 0x04;
    cpu.e = 0x00;
    cpu.b = 0x00;
    cpu.c = 0x03;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0200, "repeats until bc is zero");
    cpu.next(&mut mem);
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0202);
    assert_eq!(mem.read(0x0400), 0x01);
    assert_eq!(mem.read(0x0402), 0x03);
    assert_eq!((cpu.b, cpu.c), (0x00, 0x00));
    assert_eq!((cpu.h, cpu.l), (0x03, 0x03));
    assert!(cpu.f & PF == 0, "parity clear once bc is zero");
}

#[test]
fn lddr_moves_backward() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0xb8]);
    mem.write_n(0x0300, &[0x01, 0x02]);
    cpu.h = 0x03;
    cpu.l = 0x01;
    cpu.d = 0x04;
    cpu.e = 0x01;
    cpu.b = 0x00;
    cpu.c = 0x02;
    cpu.next(&mut mem);
    cpu.next(&mut mem);
    assert_eq!(mem.read(0x0400), 0x01);
    assert_eq!(mem.read(0x0401), 0x02);
    assert_eq!((cpu.h, cpu.l), (0x02, 0xff));
}

#[test]
fn cpir_stops_on_match() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0xb1]);
    mem.write_n(0x0300, &[0x01, 0x02, 0x03]);
    cpu.a = 0x02;
    cpu.h = 0x03;
    cpu.l = 0x00;
    cpu.b = 0x00;
    cpu.c = 0x10;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0200);
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0202, "match found");
    assert!(cpu.f & ZF != 0);
    assert!(cpu.f & PF != 0, "bc still nonzero");
    assert_eq!((cpu.h, cpu.l), (0x03, 0x02));
    assert_eq!((cpu.b, cpu.c), (0x00, 0x0e));
}

// ============================================================================
// I/O ports
// ============================================================================

#[test]
fn out_and_in_immediate_port() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xd3, 0x42, 0xdb, 0x42]);
    cpu.a = 0x99;
    cpu.next(&mut mem); // out ($42),a
    assert_eq!(cpu.ports.read(0x42), 0x99);
    cpu.a = 0x00;
    cpu.next(&mut mem); // in a,($42)
    assert_eq!(cpu.a, 0x99);
}

#[test]
fn ed_in_r_c_sets_flags() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0x50]); // in d,(c)
    cpu.c = 0x10;
    cpu.ports.write(0x10, 0x80);
    cpu.next(&mut mem);
    assert_eq!(cpu.d, 0x80);
    assert_f(SF, cpu.f);
}

#[test]
fn ed_out_c_r() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0x59]); // out (c),e
    cpu.c = 0x20;
    cpu.e = 0x55;
    cpu.next(&mut mem);
    assert_eq!(cpu.ports.read(0x20), 0x55);
}

// ============================================================================
// Interrupts, halt, and reset
// ============================================================================

#[test]
fn halt_stops_execution() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x76);
    cpu.next(&mut mem);
    assert!(cpu.halt);
    assert_eq!(cpu.pc(), 0x0201);
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0201, "stays put while halted");
}

#[test]
fn irq_im1_leaves_halt() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x76);
    cpu.iff1 = true;
    cpu.im = 1;
    cpu.next(&mut mem);
    cpu.irq = true;
    cpu.next(&mut mem);
    assert!(!cpu.halt);
    assert_eq!(cpu.pc(), 0x0038);
    assert_eq!(mem.read_le(0xfefe), 0x0201);
    assert!(!cpu.iff1);
}

#[test]
fn irq_masked_when_iff1_clear() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x00, 0x00]);
    cpu.im = 1;
    cpu.irq = true;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0201);
    assert!(!cpu.irq, "request cleared even when masked");
}

#[test]
fn irq_im2_vector() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x00);
    mem.write_le(0x4010, 0x1234);
    cpu.iff1 = true;
    cpu.im = 2;
    cpu.i = 0x40;
    cpu.irq_data = 0x10;
    cpu.irq = true;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x1234);
    assert_eq!(mem.read_le(0xfefe), 0x0201);
}

#[test]
fn nmi() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x00);
    cpu.iff1 = true;
    cpu.iff2 = true;
    cpu.nmi = true;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0066);
    assert!(!cpu.iff1);
    assert!(cpu.iff2, "iff2 keeps the pre-interrupt state for retn");
}

#[test]
fn nmi_does_not_write_iff2() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x00);
    cpu.iff1 = true;
    cpu.nmi = true;
    cpu.next(&mut mem);
    assert!(!cpu.iff1);
    assert!(!cpu.iff2, "nmi must not copy iff1 into iff2");
}

#[test]
fn retn_restores_iff1() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xed, 0x45]); // retn
    cpu.sp = 0xfefe;
    mem.write_le(0xfefe, 0x0456);
    cpu.iff2 = true;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0456);
    assert!(cpu.iff1);
}

#[test]
fn reset_request() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write(0x0200, 0x00);
    cpu.i = 0x40;
    cpu.im = 2;
    cpu.iff1 = true;
    cpu.reset = true;
    cpu.next(&mut mem);
    assert_eq!(cpu.pc(), 0x0000);
    assert_eq!(cpu.i, 0x00);
    assert_eq!(cpu.im, 0);
    assert!(!cpu.iff1);
}

#[test]
fn ei_di() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0xfb, 0xf3]);
    cpu.next(&mut mem); // ei
    assert!(cpu.iff1 && cpu.iff2);
    cpu.next(&mut mem); // di
    assert!(!cpu.iff1 && !cpu.iff2);
}

#[test]
fn refresh_counter_keeps_bit_7() {
    let (mut cpu, mut mem) = test_cpu();
    mem.write_n(0x0200, &[0x00, 0x00]);
    cpu.r = 0xff;
    cpu.next(&mut mem);
    assert_eq!(cpu.r, 0x80);
    cpu.next(&mut mem);
    assert_eq!(cpu.r, 0x81);
}

// ============================================================================
// Register and flag editing
// ============================================================================

#[test]
fn register_editing() {
    let mut cpu = Z80::new();
    cpu.set_register("ix", 0x1234).unwrap();
    assert_eq!(cpu.register("ixh").unwrap(), Value::U8(0x12));
    assert_eq!(cpu.register("ix").unwrap(), Value::U16(0x1234));

    cpu.set_register("af1", 0xabcd).unwrap();
    assert_eq!(cpu.register("a1").unwrap(), Value::U8(0xab));

    assert!(cpu.set_register("xyz", 0).is_err());
    assert!(cpu.set_register("a", 0x100).is_err());
}

#[test]
fn flag_editing() {
    let mut cpu = Z80::new();
    cpu.set_flag("z", true).unwrap();
    assert_eq!(cpu.f, ZF);
    assert!(cpu.flag("z").unwrap());
    cpu.set_flag("v", true).unwrap();
    assert!(cpu.flag("p").unwrap(), "v and p share a bit");
    assert!(cpu.flag("x").is_err());
}

// ============================================================================
// Display and state
// ============================================================================

#[test]
fn display() {
    let mut cpu = Z80::new();
    cpu.pc = 0x1234;
    cpu.a = 0x56;
    cpu.f = 0xff;
    cpu.b = 0x78;
    cpu.c = 0x9a;
    cpu.d = 0xbc;
    cpu.e = 0xde;
    cpu.h = 0xf0;
    cpu.l = 0x0f;
    cpu.ixh = 0x11;
    cpu.ixl = 0x22;
    cpu.iyh = 0x33;
    cpu.iyl = 0x44;
    cpu.sp = 0xfedc;
    cpu.i = 0x55;
    cpu.r = 0x66;
    cpu.a1 = 0x01;
    cpu.f1 = 0x02;
    cpu.b1 = 0x03;
    cpu.c1 = 0x04;
    cpu.d1 = 0x05;
    cpu.e1 = 0x06;
    cpu.h1 = 0x07;
    cpu.l1 = 0x08;
    cpu.im = 2;
    cpu.iff1 = true;
    cpu.iff2 = true;
    assert_eq!(
        cpu.to_string(),
        " pc   af   bc   de   hl   ix   iy   sp   i  r\n\
         1234 56ff 789a bcde f00f 1122 3344 fedc  55 66 iff1\n\
         im 2 0102 0304 0506 0708      S Z 5 H 3 V N C  iff2"
    );
}

#[test]
fn save_load_round_trip() {
    let mut cpu = Z80::new();
    cpu.pc = 0x1234;
    cpu.a = 0x56;
    cpu.f = 0x9c;
    cpu.h1 = 0x77;
    cpu.ixh = 0x88;
    cpu.sp = 0xfffe;
    cpu.im = 2;
    cpu.iff1 = true;
    cpu.halt = true;
    cpu.ports.write(0x42, 0x99);
    let state = cpu.save().unwrap();

    let mut other = Z80::new();
    other.load(&state).unwrap();
    assert_eq!(other.to_string(), cpu.to_string());
    assert!(other.halt);
    assert_eq!(other.ports.read(0x42), 0x99);
}
