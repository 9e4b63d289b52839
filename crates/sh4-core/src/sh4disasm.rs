// src/sh4disasm.rs

//! Text rendering of decoded instructions.
//!
//! Templates are split into literal and placeholder segments once, when the
//! decode table is built. Formatting then walks the segments, so operand text
//! is never rescanned and one placeholder cannot be mistaken for part of
//! another.

use std::fmt::Write;

use crate::sh4dec::{decode_table, DecodeTable, Instr, InstrMask, InstrType, Op};

/// Default bound for a single formatted line.
pub const MAX_DISASM_LEN: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placeholder {
    RegN,
    RegM,
    FregN,
    FregM,
    DrN,
    DrM,
    FvN,
    FvM,
    BankN,
    BankM,
    Imm8,
    Disp4,
    GbrDisp8,
    PcDisp8,
    BDisp8,
    BDisp12,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operand {
    Rn,
    Rm,
    Imm,
    Disp,
}

impl Placeholder {
    pub fn from_name(name: &str) -> Option<Self> {
        let p = match name {
            "REG_N" => Placeholder::RegN,
            "REG_M" => Placeholder::RegM,
            "FREG_N" => Placeholder::FregN,
            "FREG_M" => Placeholder::FregM,
            "DR_N" => Placeholder::DrN,
            "DR_M" => Placeholder::DrM,
            "FV_N" => Placeholder::FvN,
            "FV_M" => Placeholder::FvM,
            "BANK_N" => Placeholder::BankN,
            "BANK_M" => Placeholder::BankM,
            "IMM8" => Placeholder::Imm8,
            "disp4" => Placeholder::Disp4,
            "GBRdisp8" => Placeholder::GbrDisp8,
            "PCdisp8" => Placeholder::PcDisp8,
            "bdisp8" => Placeholder::BDisp8,
            "bdisp12" => Placeholder::BDisp12,
            _ => return None,
        };
        Some(p)
    }

    fn operand(self) -> Operand {
        use Placeholder::*;
        match self {
            RegN | FregN | DrN | FvN | BankN => Operand::Rn,
            RegM | FregM | DrM | FvM | BankM => Operand::Rm,
            Imm8 => Operand::Imm,
            Disp4 | GbrDisp8 | PcDisp8 | BDisp8 | BDisp12 => Operand::Disp,
        }
    }

    // scaled by the access width of the mnemonic
    fn needs_width(self) -> bool {
        matches!(
            self,
            Placeholder::Disp4 | Placeholder::GbrDisp8 | Placeholder::PcDisp8
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    Field(Placeholder),
}

/// A tokenized disassembly template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    /// Access width in bytes, 0 when the mnemonic carries none.
    width: u32,
    pcmask: u32,
}

/// Access width implied by the mnemonic suffix. `mova` computes a long-word
/// address without accessing memory.
fn mnemonic_width(diss: &str) -> u32 {
    let mnemonic = diss.split(' ').next().unwrap_or("");
    if mnemonic == "mova" {
        return 4;
    }
    match mnemonic.rsplit_once('.') {
        Some((_, "b")) => 1,
        Some((_, "w")) => 2,
        Some((_, "l")) => 4,
        _ => 0,
    }
}

impl Template {
    /// Tokenizes `ty.diss` and checks it against the operand fields of its
    /// signature. Any mismatch is a broken table and panics.
    pub fn parse(ty: &InstrType, mask: &InstrMask) -> Self {
        let diss = ty.diss;
        let width = mnemonic_width(diss);
        let mut segments = Vec::new();
        let mut rest = diss;

        while !rest.is_empty() {
            let Some(open) = rest.find('<') else {
                segments.push(Segment::Literal(rest));
                break;
            };
            if open > 0 {
                segments.push(Segment::Literal(&rest[..open]));
            }

            let tail = &rest[open + 1..];
            let Some(close) = tail.find('>') else {
                panic!("{}: unterminated placeholder in {:?}", ty.op.name(), diss);
            };
            let name = &tail[..close];
            let Some(p) = Placeholder::from_name(name) else {
                panic!("{}: unknown placeholder <{}> in {:?}", ty.op.name(), name, diss);
            };

            let present = match p.operand() {
                Operand::Rn => mask.rn_mask != 0,
                Operand::Rm => mask.rm_mask != 0,
                Operand::Imm => mask.imm_mask != 0,
                Operand::Disp => mask.disp_mask != 0,
            };
            if !present {
                panic!("{}: <{}> has no field in {}", ty.op.name(), name, ty.sig);
            }
            if p.needs_width() && width == 0 {
                panic!("{}: <{}> needs a sized mnemonic in {:?}", ty.op.name(), name, diss);
            }

            segments.push(Segment::Field(p));
            rest = &tail[close + 1..];
        }

        Template {
            segments,
            width,
            pcmask: if width == 4 { 0xffff_fffc } else { 0xffff_ffff },
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    fn render(&self, p: Placeholder, i: &Instr, out: &mut String) {
        let rn = i.rn as u32;
        let rm = i.rm as u32;
        let disp = i.disp as u32;
        // writing into a String cannot fail
        let _ = match p {
            Placeholder::RegN => write!(out, "r{}", rn),
            Placeholder::RegM => write!(out, "r{}", rm),
            Placeholder::FregN => write!(out, "fr{}", rn),
            Placeholder::FregM => write!(out, "fr{}", rm),
            Placeholder::DrN => write!(out, "dr{}", rn * 2),
            Placeholder::DrM => write!(out, "dr{}", rm * 2),
            Placeholder::FvN => write!(out, "fv{}", rn * 4),
            Placeholder::FvM => write!(out, "fv{}", rm * 4),
            Placeholder::BankN => write!(out, "r{}_bank", rn),
            Placeholder::BankM => write!(out, "r{}_bank", rm),
            Placeholder::Imm8 => write!(out, "0x{:02x}", i.imm),
            Placeholder::Disp4 | Placeholder::GbrDisp8 => write!(out, "0x{:x}", disp * self.width),
            Placeholder::PcDisp8 => write!(
                out,
                "0x{:08x}",
                (disp * self.width)
                    .wrapping_add(i.addr & self.pcmask)
                    .wrapping_add(4)
            ),
            Placeholder::BDisp8 => write!(out, "0x{:08x}", branch_target(i.addr, disp as u8 as i8 as i32)),
            Placeholder::BDisp12 => {
                write!(out, "0x{:08x}", branch_target(i.addr, ((disp as i32) << 20) >> 20))
            }
        };
    }
}

#[inline]
fn branch_target(addr: u32, sdisp: i32) -> u32 {
    addr.wrapping_add((sdisp * 2) as u32).wrapping_add(4)
}

/// Appends `piece` only if it fits in what is left of `limit`.
fn push_bounded(out: &mut String, start: usize, limit: usize, piece: &str) -> bool {
    if out.len() - start + piece.len() > limit {
        return false;
    }
    out.push_str(piece);
    true
}

impl DecodeTable {
    /// Appends the text for `i` to `out`, writing at most `limit` bytes.
    /// Output stops at the last segment that fits.
    pub fn format_into(&self, i: &Instr, out: &mut String, limit: usize) {
        let start = out.len();
        let mut piece = String::with_capacity(16);

        let _ = write!(piece, "{:08x}  ", i.addr);
        if !push_bounded(out, start, limit, &piece) {
            return;
        }

        let template = match i.op {
            Op::Invalid => None,
            op => self.template(op),
        };
        let Some(template) = template else {
            piece.clear();
            let _ = write!(piece, ".word 0x{:04x}", i.opcode);
            push_bounded(out, start, limit, &piece);
            return;
        };

        for seg in template.segments() {
            let fits = match *seg {
                Segment::Literal(text) => push_bounded(out, start, limit, text),
                Segment::Field(p) => {
                    piece.clear();
                    template.render(p, i, &mut piece);
                    push_bounded(out, start, limit, &piece)
                }
            };
            if !fits {
                break;
            }
        }
    }

    pub fn format(&self, i: &Instr) -> String {
        let mut out = String::with_capacity(32);
        self.format_into(i, &mut out, MAX_DISASM_LEN);
        out
    }
}

pub fn format_into(i: &Instr, out: &mut String, limit: usize) {
    decode_table().format_into(i, out, limit)
}

pub fn format(i: &Instr) -> String {
    decode_table().format(i)
}

/// Decodes and formats one word in a single step.
pub fn disassemble(addr: u32, opcode: u16) -> String {
    let (i, _) = decode_table().decode(addr, opcode);
    format(&i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sh4dec::{decode, InstrFlags, SH4_INSTRS};

    fn dis(addr: u32, opcode: u16) -> String {
        disassemble(addr, opcode)
    }

    #[test]
    fn register_forms() {
        assert_eq!(dis(0x8C01_0000, 0x6353), "8c010000  mov r5,r3");
        assert_eq!(dis(0, 0x2126), "00000000  mov.l r2,@-r1");
        assert_eq!(dis(0, 0x0009), "00000000  nop");
    }

    #[test]
    fn immediates_are_two_hex_digits() {
        assert_eq!(dis(0, 0xE105), "00000000  mov 0x05,r1");
        assert_eq!(dis(0, 0xC8FF), "00000000  tst 0xff,R0");
    }

    #[test]
    fn displacement_scales_by_width() {
        // mov.l r3,@(4*4,r2)
        assert_eq!(dis(0, 0x1234), "00000000  mov.l r3,@(0x10,r2)");
        // mov.w @(2*6,r1),R0
        assert_eq!(dis(0, 0x8516), "00000000  mov.w @(0xc,r1),R0");
        // mov.b R0,@(0x20,GBR)
        assert_eq!(dis(0, 0xC020), "00000000  mov.b R0,@(0x20,GBR)");
    }

    #[test]
    fn pc_relative_loads() {
        // long loads align the pc down to 4 bytes
        assert_eq!(dis(0x1002, 0xD102), "00001002  mov.l @(0x0000100c),r1");
        assert_eq!(dis(0x1002, 0x9102), "00001002  mov.w @(0x0000100a),r1");
        assert_eq!(dis(0x1002, 0xC701), "00001002  mova @(0x00001008),R0");
    }

    #[test]
    fn branch_targets_are_signed() {
        assert_eq!(dis(0x1000, 0x8BFE), "00001000  bf 0x00001000");
        assert_eq!(dis(0x1000, 0x8910), "00001000  bt 0x00001024");
        assert_eq!(dis(0x1000, 0xAFFE), "00001000  bra 0x00001000");
        assert_eq!(dis(0x1000, 0xB800), "00001000  bsr 0x00000004");
    }

    #[test]
    fn fpu_register_pairs_and_vectors() {
        assert_eq!(dis(0, 0xF4AD), "00000000  fcnvsd FPUL,dr4");
        assert_eq!(dis(0, 0xF5ED), "00000000  fipr fv4,fv4");
        assert_eq!(dis(0, 0xF9ED), "00000000  fipr fv4,fv8");
        assert_eq!(dis(0, 0xF1FD), "00000000  ftrv XMTRX,fv0");
        assert_eq!(dis(0, 0xF12C), "00000000  fmov fr2,fr1");
    }

    #[test]
    fn banked_registers() {
        assert_eq!(dis(0, 0x41CE), "00000000  ldc r1,r4_bank");
        assert_eq!(dis(0, 0x03D2), "00000000  stc r5_bank,r3");
    }

    #[test]
    fn invalid_record_ignores_stale_fields() {
        let i = Instr {
            addr: 0x8C00_0010,
            opcode: 0xFFFD,
            op: Op::Invalid,
            cycles: 9,
            flags: InstrFlags::from_bits(0xff),
            rm: 7,
            rn: 3,
            disp: 0x55,
            imm: 0x12,
        };
        assert_eq!(format(&i), "8c000010  .word 0xfffd");
    }

    #[test]
    fn formatting_is_deterministic() {
        let (i, _) = decode(0x8C01_0000, 0xD102);
        assert_eq!(format(&i), format(&i));
    }

    #[test]
    fn bounded_output_cuts_at_segments() {
        let (i, _) = decode(0x8C01_0000, 0x1234);
        let full = format(&i);

        for limit in 0..=full.len() {
            let mut out = String::new();
            format_into(&i, &mut out, limit);
            assert!(out.len() <= limit);
            assert!(full.starts_with(&out));
        }

        let mut out = String::new();
        format_into(&i, &mut out, 9);
        assert_eq!(out, "");
        format_into(&i, &mut out, 10);
        assert_eq!(out, "8c010000  ");
    }

    #[test]
    fn format_into_appends() {
        let (i, _) = decode(0, 0x0009);
        let mut out = String::from("> ");
        format_into(&i, &mut out, MAX_DISASM_LEN);
        assert_eq!(out, "> 00000000  nop");
    }

    #[test]
    fn tokenizer_keeps_literals_intact() {
        let t = decode_table().template(Op::MovLsMd).cloned().unwrap_or_default();
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal("mov.l "),
                Segment::Field(Placeholder::RegM),
                Segment::Literal(",@("),
                Segment::Field(Placeholder::Disp4),
                Segment::Literal(","),
                Segment::Field(Placeholder::RegN),
                Segment::Literal(")"),
            ]
        );
        assert_eq!(t.width(), 4);
    }

    #[test]
    fn all_builtin_templates_parse() {
        for ty in SH4_INSTRS.iter().skip(1) {
            let t = Template::parse(ty, &InstrMask::from_sig(ty.sig));
            assert!(!t.segments().is_empty(), "{}", ty.op.name());
        }
    }

    fn bad(diss: &'static str, sig: &'static str) {
        let ty = InstrType {
            op: Op::Nop,
            diss,
            sig,
            cycles: 1,
            flags: InstrFlags::default(),
        };
        Template::parse(&ty, &InstrMask::from_sig(sig));
    }

    #[test]
    #[should_panic(expected = "unknown placeholder")]
    fn unknown_placeholder_panics() {
        bad("nop <REG_X>", "0000_nnnn_0000_1001");
    }

    #[test]
    #[should_panic(expected = "unterminated")]
    fn unterminated_placeholder_panics() {
        bad("nop <REG_N", "0000_nnnn_0000_1001");
    }

    #[test]
    #[should_panic(expected = "has no field")]
    fn missing_field_panics() {
        bad("nop <REG_M>", "0000_nnnn_0000_1001");
    }

    #[test]
    #[should_panic(expected = "sized mnemonic")]
    fn unsized_displacement_panics() {
        bad("mov @(<disp4>,<REG_N>)", "0000_nnnn_dddd_1001");
    }
}
