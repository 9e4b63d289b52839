// src/sh4dec.rs

//! SH4 opcode table and the 64k-entry decode lookup built from it.
//!
//! Every instruction is declared once with a field signature such as
//! `0110_nnnn_mmmm_0011`: literal `0`/`1` bits are the match pattern, `n`/`m`
//! are the register fields, `i` the immediate and `d` the displacement.
//! `DecodeTable::build` turns the signatures into masks, resolves every
//! possible 16-bit word to the first declared signature that matches it and
//! pre-tokenizes the disassembly templates.

use bitfield::bitfield;
use once_cell::sync::OnceCell;

use crate::sh4disasm::Template;

pub const FLAG_BRANCH: u32 = 1 << 0;
pub const FLAG_CONDITIONAL: u32 = 1 << 1;
pub const FLAG_DELAYED: u32 = 1 << 2;
pub const FLAG_SET_T: u32 = 1 << 3;
pub const FLAG_SET_SR: u32 = 1 << 4;
pub const FLAG_SET_FPSCR: u32 = 1 << 5;
pub const FLAG_LOAD: u32 = 1 << 6;
pub const FLAG_STORE: u32 = 1 << 7;
pub const FLAG_USE_FPSCR: u32 = 1 << 8;

bitfield! {
    #[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct InstrFlags(u32);
    impl Debug;

    pub u32, bits, _: 31, 0;
    pub branch, _: 0;
    pub conditional, _: 1;
    pub delayed, _: 2;
    pub writes_t, _: 3;
    pub writes_sr, _: 4;
    pub writes_fpscr, _: 5;
    pub load, _: 6;
    pub store, _: 7;
    pub uses_fpscr, _: 8;
}

impl InstrFlags {
    pub const fn from_bits(bits: u32) -> Self {
        InstrFlags(bits)
    }
}

/// Static description of one instruction kind.
#[derive(Clone, Copy, Debug)]
pub struct InstrType {
    pub op: Op,
    /// Disassembly template, see `sh4disasm` for the placeholder syntax.
    pub diss: &'static str,
    /// Field signature, most significant bit first. `_` is a separator.
    pub sig: &'static str,
    pub cycles: u32,
    pub flags: InstrFlags,
}

/// Number of bit positions described by a field signature.
pub const fn sig_bits(sig: &str) -> usize {
    let bytes = sig.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'_' {
            count += 1;
        }
        i += 1;
    }
    count
}

/// Extracts `(mask, shift)` for the bits of `sig` marked with `marker`.
///
/// `None` selects the fixed bits: every literal `1` lands in the mask, which
/// is then the value a word must equal once its operand bits are cleared.
/// The shift is the position of the lowest marked bit, so
/// `(word & mask) >> shift` yields the field. Unmarked signatures give `(0, 0)`.
pub const fn arg_mask(sig: &str, marker: Option<u8>) -> (u16, u16) {
    assert!(sig_bits(sig) == 16, "field signature must describe 16 bits");

    let bytes = sig.as_bytes();
    let mut mask: u16 = 0;
    let mut shift: u16 = 0;
    let mut bit = 16;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        i += 1;
        if c == b'_' {
            continue;
        }
        bit -= 1;

        let hit = match marker {
            Some(m) => c == m,
            None => c == b'1',
        };
        if hit {
            mask |= 1 << bit;
            shift = bit as u16;
        }
    }
    (mask, shift)
}

/// Operand masks derived from a signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstrMask {
    pub opcode_mask: u16,
    pub imm_mask: u16,
    pub imm_shift: u16,
    pub disp_mask: u16,
    pub disp_shift: u16,
    pub rm_mask: u16,
    pub rm_shift: u16,
    pub rn_mask: u16,
    pub rn_shift: u16,
}

impl InstrMask {
    pub const fn from_sig(sig: &str) -> Self {
        let (imm_mask, imm_shift) = arg_mask(sig, Some(b'i'));
        let (disp_mask, disp_shift) = arg_mask(sig, Some(b'd'));
        let (rm_mask, rm_shift) = arg_mask(sig, Some(b'm'));
        let (rn_mask, rn_shift) = arg_mask(sig, Some(b'n'));
        let (opcode_mask, _) = arg_mask(sig, None);

        InstrMask {
            opcode_mask,
            imm_mask,
            imm_shift,
            disp_mask,
            disp_shift,
            rm_mask,
            rm_shift,
            rn_mask,
            rn_shift,
        }
    }

    /// Union of all operand fields.
    #[inline(always)]
    pub const fn arg_mask(&self) -> u16 {
        self.imm_mask | self.disp_mask | self.rm_mask | self.rn_mask
    }

    #[inline(always)]
    pub const fn matches(&self, word: u16) -> bool {
        (word & !self.arg_mask()) == self.opcode_mask
    }
}

/// A decoded instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Instr {
    pub addr: u32,
    pub opcode: u16,
    pub op: Op,
    pub cycles: u32,
    pub flags: InstrFlags,
    pub rm: u16,
    pub rn: u16,
    pub disp: u16,
    pub imm: u16,
}

macro_rules! sh4_instrs {
    (
        $( ($op:ident, $diss:literal, $sig:literal, $cycles:expr, $flags:expr) ),* $(,)?
    ) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum Op {
            #[default]
            Invalid,
            $( $op, )*
        }

        impl Op {
            pub const ALL: &'static [Op] = &[Op::Invalid, $( Op::$op, )*];

            pub const fn name(self) -> &'static str {
                match self {
                    Op::Invalid => "Invalid",
                    $( Op::$op => stringify!($op), )*
                }
            }
        }

        $( const _: () = assert!(sig_bits($sig) == 16); )*

        /// Declaration order is the decode priority.
        pub static SH4_INSTRS: &[InstrType] = &[
            InstrType { op: Op::Invalid, diss: "", sig: "", cycles: 0, flags: InstrFlags(0) },
            $(
                InstrType {
                    op: Op::$op,
                    diss: $diss,
                    sig: $sig,
                    cycles: $cycles,
                    flags: InstrFlags($flags),
                },
            )*
        ];
    };
}

sh4_instrs! {
    // fixed-point transfer
    (MovI,          "mov <IMM8>,<REG_N>",                "1110_nnnn_iiii_iiii", 1, 0),
    (MovWlPc,       "mov.w @(<PCdisp8>),<REG_N>",        "1001_nnnn_dddd_dddd", 1, FLAG_LOAD),
    (MovLlPc,       "mov.l @(<PCdisp8>),<REG_N>",        "1101_nnnn_dddd_dddd", 1, FLAG_LOAD),
    (Mov,           "mov <REG_M>,<REG_N>",               "0110_nnnn_mmmm_0011", 1, 0),
    (MovBs,         "mov.b <REG_M>,@<REG_N>",            "0010_nnnn_mmmm_0000", 1, FLAG_STORE),
    (MovWs,         "mov.w <REG_M>,@<REG_N>",            "0010_nnnn_mmmm_0001", 1, FLAG_STORE),
    (MovLs,         "mov.l <REG_M>,@<REG_N>",            "0010_nnnn_mmmm_0010", 1, FLAG_STORE),
    (MovBl,         "mov.b @<REG_M>,<REG_N>",            "0110_nnnn_mmmm_0000", 1, FLAG_LOAD),
    (MovWl,         "mov.w @<REG_M>,<REG_N>",            "0110_nnnn_mmmm_0001", 1, FLAG_LOAD),
    (MovLl,         "mov.l @<REG_M>,<REG_N>",            "0110_nnnn_mmmm_0010", 1, FLAG_LOAD),
    (MovBm,         "mov.b <REG_M>,@-<REG_N>",           "0010_nnnn_mmmm_0100", 1, FLAG_STORE),
    (MovWm,         "mov.w <REG_M>,@-<REG_N>",           "0010_nnnn_mmmm_0101", 1, FLAG_STORE),
    (MovLm,         "mov.l <REG_M>,@-<REG_N>",           "0010_nnnn_mmmm_0110", 1, FLAG_STORE),
    (MovBp,         "mov.b @<REG_M>+,<REG_N>",           "0110_nnnn_mmmm_0100", 1, FLAG_LOAD),
    (MovWp,         "mov.w @<REG_M>+,<REG_N>",           "0110_nnnn_mmmm_0101", 1, FLAG_LOAD),
    (MovLp,         "mov.l @<REG_M>+,<REG_N>",           "0110_nnnn_mmmm_0110", 1, FLAG_LOAD),
    (MovBs0D,       "mov.b R0,@(<disp4>,<REG_N>)",       "1000_0000_nnnn_dddd", 1, FLAG_STORE),
    (MovWs0D,       "mov.w R0,@(<disp4>,<REG_N>)",       "1000_0001_nnnn_dddd", 1, FLAG_STORE),
    (MovLsMd,       "mov.l <REG_M>,@(<disp4>,<REG_N>)",  "0001_nnnn_mmmm_dddd", 1, FLAG_STORE),
    (MovBlD0,       "mov.b @(<disp4>,<REG_M>),R0",       "1000_0100_mmmm_dddd", 1, FLAG_LOAD),
    (MovWlD0,       "mov.w @(<disp4>,<REG_M>),R0",       "1000_0101_mmmm_dddd", 1, FLAG_LOAD),
    (MovLlDn,       "mov.l @(<disp4>,<REG_M>),<REG_N>",  "0101_nnnn_mmmm_dddd", 1, FLAG_LOAD),
    (MovBs0,        "mov.b <REG_M>,@(R0,<REG_N>)",       "0000_nnnn_mmmm_0100", 1, FLAG_STORE),
    (MovWs0,        "mov.w <REG_M>,@(R0,<REG_N>)",       "0000_nnnn_mmmm_0101", 1, FLAG_STORE),
    (MovLs0,        "mov.l <REG_M>,@(R0,<REG_N>)",       "0000_nnnn_mmmm_0110", 1, FLAG_STORE),
    (MovBl0,        "mov.b @(R0,<REG_M>),<REG_N>",       "0000_nnnn_mmmm_1100", 1, FLAG_LOAD),
    (MovWl0,        "mov.w @(R0,<REG_M>),<REG_N>",       "0000_nnnn_mmmm_1101", 1, FLAG_LOAD),
    (MovLl0,        "mov.l @(R0,<REG_M>),<REG_N>",       "0000_nnnn_mmmm_1110", 1, FLAG_LOAD),
    (MovBs0G,       "mov.b R0,@(<GBRdisp8>,GBR)",        "1100_0000_dddd_dddd", 1, FLAG_STORE),
    (MovWs0G,       "mov.w R0,@(<GBRdisp8>,GBR)",        "1100_0001_dddd_dddd", 1, FLAG_STORE),
    (MovLs0G,       "mov.l R0,@(<GBRdisp8>,GBR)",        "1100_0010_dddd_dddd", 1, FLAG_STORE),
    (MovBlG0,       "mov.b @(<GBRdisp8>,GBR),R0",        "1100_0100_dddd_dddd", 1, FLAG_LOAD),
    (MovWlG0,       "mov.w @(<GBRdisp8>,GBR),R0",        "1100_0101_dddd_dddd", 1, FLAG_LOAD),
    (MovLlG0,       "mov.l @(<GBRdisp8>,GBR),R0",        "1100_0110_dddd_dddd", 1, FLAG_LOAD),
    (Mova,          "mova @(<PCdisp8>),R0",              "1100_0111_dddd_dddd", 1, 0),
    (Movt,          "movt <REG_N>",                      "0000_nnnn_0010_1001", 1, 0),
    (SwapB,         "swap.b <REG_M>,<REG_N>",            "0110_nnnn_mmmm_1000", 1, 0),
    (SwapW,         "swap.w <REG_M>,<REG_N>",            "0110_nnnn_mmmm_1001", 1, 0),
    (Xtrct,         "xtrct <REG_M>,<REG_N>",             "0010_nnnn_mmmm_1101", 1, 0),

    // arithmetic
    (Add,           "add <REG_M>,<REG_N>",               "0011_nnnn_mmmm_1100", 1, 0),
    (AddI,          "add <IMM8>,<REG_N>",                "0111_nnnn_iiii_iiii", 1, 0),
    (AddC,          "addc <REG_M>,<REG_N>",              "0011_nnnn_mmmm_1110", 1, FLAG_SET_T),
    (AddV,          "addv <REG_M>,<REG_N>",              "0011_nnnn_mmmm_1111", 1, FLAG_SET_T),
    (CmpEqI,        "cmp/eq <IMM8>,R0",                  "1000_1000_iiii_iiii", 1, FLAG_SET_T),
    (CmpEq,         "cmp/eq <REG_M>,<REG_N>",            "0011_nnnn_mmmm_0000", 1, FLAG_SET_T),
    (CmpHs,         "cmp/hs <REG_M>,<REG_N>",            "0011_nnnn_mmmm_0010", 1, FLAG_SET_T),
    (CmpGe,         "cmp/ge <REG_M>,<REG_N>",            "0011_nnnn_mmmm_0011", 1, FLAG_SET_T),
    (CmpHi,         "cmp/hi <REG_M>,<REG_N>",            "0011_nnnn_mmmm_0110", 1, FLAG_SET_T),
    (CmpGt,         "cmp/gt <REG_M>,<REG_N>",            "0011_nnnn_mmmm_0111", 1, FLAG_SET_T),
    (CmpPz,         "cmp/pz <REG_N>",                    "0100_nnnn_0001_0001", 1, FLAG_SET_T),
    (CmpPl,         "cmp/pl <REG_N>",                    "0100_nnnn_0001_0101", 1, FLAG_SET_T),
    (CmpStr,        "cmp/str <REG_M>,<REG_N>",           "0010_nnnn_mmmm_1100", 1, FLAG_SET_T),
    (Div0S,         "div0s <REG_M>,<REG_N>",             "0010_nnnn_mmmm_0111", 1, FLAG_SET_T | FLAG_SET_SR),
    (Div0U,         "div0u",                             "0000_0000_0001_1001", 1, FLAG_SET_T | FLAG_SET_SR),
    (Div1,          "div1 <REG_M>,<REG_N>",              "0011_nnnn_mmmm_0100", 1, FLAG_SET_T | FLAG_SET_SR),
    (DmulS,         "dmuls.l <REG_M>,<REG_N>",           "0011_nnnn_mmmm_1101", 2, 0),
    (DmulU,         "dmulu.l <REG_M>,<REG_N>",           "0011_nnnn_mmmm_0101", 2, 0),
    (Dt,            "dt <REG_N>",                        "0100_nnnn_0001_0000", 1, FLAG_SET_T),
    (ExtsB,         "exts.b <REG_M>,<REG_N>",            "0110_nnnn_mmmm_1110", 1, 0),
    (ExtsW,         "exts.w <REG_M>,<REG_N>",            "0110_nnnn_mmmm_1111", 1, 0),
    (ExtuB,         "extu.b <REG_M>,<REG_N>",            "0110_nnnn_mmmm_1100", 1, 0),
    (ExtuW,         "extu.w <REG_M>,<REG_N>",            "0110_nnnn_mmmm_1101", 1, 0),
    (MacL,          "mac.l @<REG_M>+,@<REG_N>+",         "0000_nnnn_mmmm_1111", 2, FLAG_LOAD),
    (MacW,          "mac.w @<REG_M>+,@<REG_N>+",         "0100_nnnn_mmmm_1111", 2, FLAG_LOAD),
    (MulL,          "mul.l <REG_M>,<REG_N>",             "0000_nnnn_mmmm_0111", 2, 0),
    (MulS,          "muls.w <REG_M>,<REG_N>",            "0010_nnnn_mmmm_1111", 2, 0),
    (MulU,          "mulu.w <REG_M>,<REG_N>",            "0010_nnnn_mmmm_1110", 2, 0),
    (Neg,           "neg <REG_M>,<REG_N>",               "0110_nnnn_mmmm_1011", 1, 0),
    (NegC,          "negc <REG_M>,<REG_N>",              "0110_nnnn_mmmm_1010", 1, FLAG_SET_T),
    (Sub,           "sub <REG_M>,<REG_N>",               "0011_nnnn_mmmm_1000", 1, 0),
    (SubC,          "subc <REG_M>,<REG_N>",              "0011_nnnn_mmmm_1010", 1, FLAG_SET_T),
    (SubV,          "subv <REG_M>,<REG_N>",              "0011_nnnn_mmmm_1011", 1, FLAG_SET_T),

    // logic
    (And,           "and <REG_M>,<REG_N>",               "0010_nnnn_mmmm_1001", 1, 0),
    (AndI,          "and <IMM8>,R0",                     "1100_1001_iiii_iiii", 1, 0),
    (AndB,          "and.b <IMM8>,@(R0,GBR)",            "1100_1101_iiii_iiii", 4, FLAG_LOAD | FLAG_STORE),
    (Not,           "not <REG_M>,<REG_N>",               "0110_nnnn_mmmm_0111", 1, 0),
    (Or,            "or <REG_M>,<REG_N>",                "0010_nnnn_mmmm_1011", 1, 0),
    (OrI,           "or <IMM8>,R0",                      "1100_1011_iiii_iiii", 1, 0),
    (OrB,           "or.b <IMM8>,@(R0,GBR)",             "1100_1111_iiii_iiii", 4, FLAG_LOAD | FLAG_STORE),
    (Tas,           "tas.b @<REG_N>",                    "0100_nnnn_0001_1011", 5, FLAG_LOAD | FLAG_STORE | FLAG_SET_T),
    (Tst,           "tst <REG_M>,<REG_N>",               "0010_nnnn_mmmm_1000", 1, FLAG_SET_T),
    (TstI,          "tst <IMM8>,R0",                     "1100_1000_iiii_iiii", 1, FLAG_SET_T),
    (TstB,          "tst.b <IMM8>,@(R0,GBR)",            "1100_1100_iiii_iiii", 3, FLAG_LOAD | FLAG_SET_T),
    (Xor,           "xor <REG_M>,<REG_N>",               "0010_nnnn_mmmm_1010", 1, 0),
    (XorI,          "xor <IMM8>,R0",                     "1100_1010_iiii_iiii", 1, 0),
    (XorB,          "xor.b <IMM8>,@(R0,GBR)",            "1100_1110_iiii_iiii", 4, FLAG_LOAD | FLAG_STORE),

    // shift
    (RotL,          "rotl <REG_N>",                      "0100_nnnn_0000_0100", 1, FLAG_SET_T),
    (RotR,          "rotr <REG_N>",                      "0100_nnnn_0000_0101", 1, FLAG_SET_T),
    (RotCl,         "rotcl <REG_N>",                     "0100_nnnn_0010_0100", 1, FLAG_SET_T),
    (RotCr,         "rotcr <REG_N>",                     "0100_nnnn_0010_0101", 1, FLAG_SET_T),
    (Shad,          "shad <REG_M>,<REG_N>",              "0100_nnnn_mmmm_1100", 1, 0),
    (Shal,          "shal <REG_N>",                      "0100_nnnn_0010_0000", 1, FLAG_SET_T),
    (Shar,          "shar <REG_N>",                      "0100_nnnn_0010_0001", 1, FLAG_SET_T),
    (Shld,          "shld <REG_M>,<REG_N>",              "0100_nnnn_mmmm_1101", 1, 0),
    (Shll,          "shll <REG_N>",                      "0100_nnnn_0000_0000", 1, FLAG_SET_T),
    (Shlr,          "shlr <REG_N>",                      "0100_nnnn_0000_0001", 1, FLAG_SET_T),
    (Shll2,         "shll2 <REG_N>",                     "0100_nnnn_0000_1000", 1, 0),
    (Shlr2,         "shlr2 <REG_N>",                     "0100_nnnn_0000_1001", 1, 0),
    (Shll8,         "shll8 <REG_N>",                     "0100_nnnn_0001_1000", 1, 0),
    (Shlr8,         "shlr8 <REG_N>",                     "0100_nnnn_0001_1001", 1, 0),
    (Shll16,        "shll16 <REG_N>",                    "0100_nnnn_0010_1000", 1, 0),
    (Shlr16,        "shlr16 <REG_N>",                    "0100_nnnn_0010_1001", 1, 0),

    // branch
    (Bf,            "bf <bdisp8>",                       "1000_1011_dddd_dddd", 1, FLAG_BRANCH | FLAG_CONDITIONAL),
    (BfS,           "bf/s <bdisp8>",                     "1000_1111_dddd_dddd", 1, FLAG_BRANCH | FLAG_CONDITIONAL | FLAG_DELAYED),
    (Bt,            "bt <bdisp8>",                       "1000_1001_dddd_dddd", 1, FLAG_BRANCH | FLAG_CONDITIONAL),
    (BtS,           "bt/s <bdisp8>",                     "1000_1101_dddd_dddd", 1, FLAG_BRANCH | FLAG_CONDITIONAL | FLAG_DELAYED),
    (Bra,           "bra <bdisp12>",                     "1010_dddd_dddd_dddd", 1, FLAG_BRANCH | FLAG_DELAYED),
    (Braf,          "braf <REG_N>",                      "0000_nnnn_0010_0011", 2, FLAG_BRANCH | FLAG_DELAYED),
    (Bsr,           "bsr <bdisp12>",                     "1011_dddd_dddd_dddd", 1, FLAG_BRANCH | FLAG_DELAYED),
    (Bsrf,          "bsrf <REG_N>",                      "0000_nnnn_0000_0011", 2, FLAG_BRANCH | FLAG_DELAYED),
    (Jmp,           "jmp @<REG_N>",                      "0100_nnnn_0010_1011", 2, FLAG_BRANCH | FLAG_DELAYED),
    (Jsr,           "jsr @<REG_N>",                      "0100_nnnn_0000_1011", 2, FLAG_BRANCH | FLAG_DELAYED),
    (Rts,           "rts",                               "0000_0000_0000_1011", 2, FLAG_BRANCH | FLAG_DELAYED),

    // system control
    (ClrMac,        "clrmac",                            "0000_0000_0010_1000", 1, 0),
    (ClrS,          "clrs",                              "0000_0000_0100_1000", 1, FLAG_SET_SR),
    (ClrT,          "clrt",                              "0000_0000_0000_1000", 1, FLAG_SET_T),
    (LdcSr,         "ldc <REG_M>,SR",                    "0100_mmmm_0000_1110", 4, FLAG_SET_SR | FLAG_SET_T),
    (LdcGbr,        "ldc <REG_M>,GBR",                   "0100_mmmm_0001_1110", 3, 0),
    (LdcVbr,        "ldc <REG_M>,VBR",                   "0100_mmmm_0010_1110", 1, 0),
    (LdcSsr,        "ldc <REG_M>,SSR",                   "0100_mmmm_0011_1110", 1, 0),
    (LdcSpc,        "ldc <REG_M>,SPC",                   "0100_mmmm_0100_1110", 1, 0),
    (LdcDbr,        "ldc <REG_M>,DBR",                   "0100_mmmm_1111_1010", 1, 0),
    (LdcRbank,      "ldc <REG_M>,<BANK_N>",              "0100_mmmm_1nnn_1110", 1, 0),
    (LdcmSr,        "ldc.l @<REG_M>+,SR",                "0100_mmmm_0000_0111", 4, FLAG_LOAD | FLAG_SET_SR | FLAG_SET_T),
    (LdcmGbr,       "ldc.l @<REG_M>+,GBR",               "0100_mmmm_0001_0111", 3, FLAG_LOAD),
    (LdcmVbr,       "ldc.l @<REG_M>+,VBR",               "0100_mmmm_0010_0111", 1, FLAG_LOAD),
    (LdcmSsr,       "ldc.l @<REG_M>+,SSR",               "0100_mmmm_0011_0111", 1, FLAG_LOAD),
    (LdcmSpc,       "ldc.l @<REG_M>+,SPC",               "0100_mmmm_0100_0111", 1, FLAG_LOAD),
    (LdcmDbr,       "ldc.l @<REG_M>+,DBR",               "0100_mmmm_1111_0110", 1, FLAG_LOAD),
    (LdcmRbank,     "ldc.l @<REG_M>+,<BANK_N>",          "0100_mmmm_1nnn_0111", 1, FLAG_LOAD),
    (LdsMach,       "lds <REG_M>,MACH",                  "0100_mmmm_0000_1010", 1, 0),
    (LdsMacl,       "lds <REG_M>,MACL",                  "0100_mmmm_0001_1010", 1, 0),
    (LdsPr,         "lds <REG_M>,PR",                    "0100_mmmm_0010_1010", 1, 0),
    (LdsmMach,      "lds.l @<REG_M>+,MACH",              "0100_mmmm_0000_0110", 1, FLAG_LOAD),
    (LdsmMacl,      "lds.l @<REG_M>+,MACL",              "0100_mmmm_0001_0110", 1, FLAG_LOAD),
    (LdsmPr,        "lds.l @<REG_M>+,PR",                "0100_mmmm_0010_0110", 1, FLAG_LOAD),
    (Ldtlb,         "ldtlb",                             "0000_0000_0011_1000", 1, 0),
    (MovcaL,        "movca.l R0,@<REG_N>",               "0000_nnnn_1100_0011", 1, FLAG_STORE),
    (Nop,           "nop",                               "0000_0000_0000_1001", 1, 0),
    (Ocbi,          "ocbi @<REG_N>",                     "0000_nnnn_1001_0011", 1, 0),
    (Ocbp,          "ocbp @<REG_N>",                     "0000_nnnn_1010_0011", 1, 0),
    (Ocbwb,         "ocbwb @<REG_N>",                    "0000_nnnn_1011_0011", 1, 0),
    (Pref,          "pref @<REG_N>",                     "0000_nnnn_1000_0011", 1, 0),
    (Rte,           "rte",                               "0000_0000_0010_1011", 5, FLAG_BRANCH | FLAG_DELAYED | FLAG_SET_SR | FLAG_SET_T),
    (SetS,          "sets",                              "0000_0000_0101_1000", 1, FLAG_SET_SR),
    (SetT,          "sett",                              "0000_0000_0001_1000", 1, FLAG_SET_T),
    (Sleep,         "sleep",                             "0000_0000_0001_1011", 4, 0),
    (StcSr,         "stc SR,<REG_N>",                    "0000_nnnn_0000_0010", 2, 0),
    (StcGbr,        "stc GBR,<REG_N>",                   "0000_nnnn_0001_0010", 2, 0),
    (StcVbr,        "stc VBR,<REG_N>",                   "0000_nnnn_0010_0010", 2, 0),
    (StcSsr,        "stc SSR,<REG_N>",                   "0000_nnnn_0011_0010", 2, 0),
    (StcSpc,        "stc SPC,<REG_N>",                   "0000_nnnn_0100_0010", 2, 0),
    (StcSgr,        "stc SGR,<REG_N>",                   "0000_nnnn_0011_1010", 3, 0),
    (StcDbr,        "stc DBR,<REG_N>",                   "0000_nnnn_1111_1010", 2, 0),
    (StcRbank,      "stc <BANK_M>,<REG_N>",              "0000_nnnn_1mmm_0010", 2, 0),
    (StcmSr,        "stc.l SR,@-<REG_N>",                "0100_nnnn_0000_0011", 2, FLAG_STORE),
    (StcmGbr,       "stc.l GBR,@-<REG_N>",               "0100_nnnn_0001_0011", 2, FLAG_STORE),
    (StcmVbr,       "stc.l VBR,@-<REG_N>",               "0100_nnnn_0010_0011", 2, FLAG_STORE),
    (StcmSsr,       "stc.l SSR,@-<REG_N>",               "0100_nnnn_0011_0011", 2, FLAG_STORE),
    (StcmSpc,       "stc.l SPC,@-<REG_N>",               "0100_nnnn_0100_0011", 2, FLAG_STORE),
    (StcmSgr,       "stc.l SGR,@-<REG_N>",               "0100_nnnn_0011_0010", 3, FLAG_STORE),
    (StcmDbr,       "stc.l DBR,@-<REG_N>",               "0100_nnnn_1111_0010", 2, FLAG_STORE),
    (StcmRbank,     "stc.l <BANK_M>,@-<REG_N>",          "0100_nnnn_1mmm_0011", 2, FLAG_STORE),
    (StsMach,       "sts MACH,<REG_N>",                  "0000_nnnn_0000_1010", 1, 0),
    (StsMacl,       "sts MACL,<REG_N>",                  "0000_nnnn_0001_1010", 1, 0),
    (StsPr,         "sts PR,<REG_N>",                    "0000_nnnn_0010_1010", 1, 0),
    (StsmMach,      "sts.l MACH,@-<REG_N>",              "0100_nnnn_0000_0010", 1, FLAG_STORE),
    (StsmMacl,      "sts.l MACL,@-<REG_N>",              "0100_nnnn_0001_0010", 1, FLAG_STORE),
    (StsmPr,        "sts.l PR,@-<REG_N>",                "0100_nnnn_0010_0010", 1, FLAG_STORE),
    (Trapa,         "trapa <IMM8>",                      "1100_0011_iiii_iiii", 7, FLAG_BRANCH),

    // floating-point
    (FLdi0,         "fldi0 <FREG_N>",                    "1111_nnnn_1000_1101", 1, 0),
    (FLdi1,         "fldi1 <FREG_N>",                    "1111_nnnn_1001_1101", 1, 0),
    (FMov,          "fmov <FREG_M>,<FREG_N>",            "1111_nnnn_mmmm_1100", 1, FLAG_USE_FPSCR),
    (FMovLoad,      "fmov.s @<REG_M>,<FREG_N>",          "1111_nnnn_mmmm_1000", 1, FLAG_LOAD | FLAG_USE_FPSCR),
    (FMovIndexLoad, "fmov.s @(R0,<REG_M>),<FREG_N>",     "1111_nnnn_mmmm_0110", 1, FLAG_LOAD | FLAG_USE_FPSCR),
    (FMovStore,     "fmov.s <FREG_M>,@<REG_N>",          "1111_nnnn_mmmm_1010", 1, FLAG_STORE | FLAG_USE_FPSCR),
    (FMovIndexStore,"fmov.s <FREG_M>,@(R0,<REG_N>)",     "1111_nnnn_mmmm_0111", 1, FLAG_STORE | FLAG_USE_FPSCR),
    (FMovSave,      "fmov.s <FREG_M>,@-<REG_N>",         "1111_nnnn_mmmm_1011", 1, FLAG_STORE | FLAG_USE_FPSCR),
    (FMovRestore,   "fmov.s @<REG_M>+,<FREG_N>",         "1111_nnnn_mmmm_1001", 1, FLAG_LOAD | FLAG_USE_FPSCR),
    (FLds,          "flds <FREG_M>,FPUL",                "1111_mmmm_0001_1101", 1, 0),
    (FSts,          "fsts FPUL,<FREG_N>",                "1111_nnnn_0000_1101", 1, 0),
    (FAbs,          "fabs <FREG_N>",                     "1111_nnnn_0101_1101", 1, FLAG_USE_FPSCR),
    (FAdd,          "fadd <FREG_M>,<FREG_N>",            "1111_nnnn_mmmm_0000", 1, FLAG_USE_FPSCR),
    (FCmpEq,        "fcmp/eq <FREG_M>,<FREG_N>",         "1111_nnnn_mmmm_0100", 1, FLAG_SET_T | FLAG_USE_FPSCR),
    (FCmpGt,        "fcmp/gt <FREG_M>,<FREG_N>",         "1111_nnnn_mmmm_0101", 1, FLAG_SET_T | FLAG_USE_FPSCR),
    (FDiv,          "fdiv <FREG_M>,<FREG_N>",            "1111_nnnn_mmmm_0011", 12, FLAG_USE_FPSCR),
    (FLoat,         "float FPUL,<FREG_N>",               "1111_nnnn_0010_1101", 1, FLAG_USE_FPSCR),
    (FMac,          "fmac FR0,<FREG_M>,<FREG_N>",        "1111_nnnn_mmmm_1110", 1, FLAG_USE_FPSCR),
    (FMul,          "fmul <FREG_M>,<FREG_N>",            "1111_nnnn_mmmm_0010", 1, FLAG_USE_FPSCR),
    (FNeg,          "fneg <FREG_N>",                     "1111_nnnn_0100_1101", 1, FLAG_USE_FPSCR),
    (FSqrt,         "fsqrt <FREG_N>",                    "1111_nnnn_0110_1101", 12, FLAG_USE_FPSCR),
    (FSub,          "fsub <FREG_M>,<FREG_N>",            "1111_nnnn_mmmm_0001", 1, FLAG_USE_FPSCR),
    (FTrc,          "ftrc <FREG_M>,FPUL",                "1111_mmmm_0011_1101", 1, FLAG_USE_FPSCR),
    (FCnvDs,        "fcnvds <DR_M>,FPUL",                "1111_mmm0_1011_1101", 1, FLAG_USE_FPSCR),
    (FCnvSd,        "fcnvsd FPUL,<DR_N>",                "1111_nnn0_1010_1101", 1, FLAG_USE_FPSCR),
    (LdsFpscr,      "lds <REG_M>,FPSCR",                 "0100_mmmm_0110_1010", 1, FLAG_SET_FPSCR),
    (LdsFpul,       "lds <REG_M>,FPUL",                  "0100_mmmm_0101_1010", 1, 0),
    (LdsmFpscr,     "lds.l @<REG_M>+,FPSCR",             "0100_mmmm_0110_0110", 1, FLAG_LOAD | FLAG_SET_FPSCR),
    (LdsmFpul,      "lds.l @<REG_M>+,FPUL",              "0100_mmmm_0101_0110", 1, FLAG_LOAD),
    (StsFpscr,      "sts FPSCR,<REG_N>",                 "0000_nnnn_0110_1010", 1, 0),
    (StsFpul,       "sts FPUL,<REG_N>",                  "0000_nnnn_0101_1010", 1, 0),
    (StsmFpscr,     "sts.l FPSCR,@-<REG_N>",             "0100_nnnn_0110_0010", 1, FLAG_STORE),
    (StsmFpul,      "sts.l FPUL,@-<REG_N>",              "0100_nnnn_0101_0010", 1, FLAG_STORE),
    (FrChg,         "frchg",                             "1111_1011_1111_1101", 1, FLAG_SET_FPSCR),
    (FsChg,         "fschg",                             "1111_0011_1111_1101", 1, FLAG_SET_FPSCR),
    (FSrra,         "fsrra <FREG_N>",                    "1111_nnnn_0111_1101", 1, FLAG_USE_FPSCR),
    (FSca,          "fsca FPUL,<DR_N>",                  "1111_nnn0_1111_1101", 3, FLAG_USE_FPSCR),
    (FIpr,          "fipr <FV_M>,<FV_N>",                "1111_nnmm_1110_1101", 1, FLAG_USE_FPSCR),
    (FTrv,          "ftrv XMTRX,<FV_N>",                 "1111_nn01_1111_1101", 1, FLAG_USE_FPSCR),
}

/// Two signatures that both match the same words. `winner` was declared
/// first and owns them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overlap {
    pub winner: Op,
    pub shadowed: Op,
    pub first_word: u16,
    pub words: u32,
}

pub struct DecodeTable {
    types: Vec<InstrType>,
    masks: Vec<InstrMask>,
    templates: Vec<Template>,
    // 0 = no match, otherwise an index into `types`
    lookup: Box<[u16]>,
    by_op: Vec<u16>,
    overlaps: Vec<Overlap>,
}

impl DecodeTable {
    /// Builds the lookup for `types`, whose first entry must be `Op::Invalid`.
    ///
    /// Panics if a template does not fit its signature; templates are static
    /// data, so this is a table definition bug.
    pub fn build(types: &[InstrType]) -> Self {
        assert!(
            matches!(types.first(), Some(t) if t.op == Op::Invalid),
            "instruction table must start with the invalid entry"
        );
        assert!(types.len() <= u16::MAX as usize);

        let masks: Vec<InstrMask> = types
            .iter()
            .enumerate()
            .map(|(i, t)| if i == 0 { InstrMask::default() } else { InstrMask::from_sig(t.sig) })
            .collect();

        let templates: Vec<Template> = types
            .iter()
            .zip(&masks)
            .enumerate()
            .map(|(i, (t, m))| if i == 0 { Template::default() } else { Template::parse(t, m) })
            .collect();

        let mut by_op = vec![0u16; Op::ALL.len()];
        for (i, t) in types.iter().enumerate().skip(1).rev() {
            by_op[t.op as usize] = i as u16;
        }

        let mut lookup = vec![0u16; 0x10000].into_boxed_slice();
        let mut overlaps: Vec<Overlap> = Vec::new();

        for word in 0..=u16::MAX {
            let mut hits = (1..types.len()).filter(|&i| masks[i].matches(word));
            let Some(first) = hits.next() else {
                continue;
            };
            lookup[word as usize] = first as u16;

            for shadowed in hits {
                let winner = types[first].op;
                let shadowed = types[shadowed].op;
                match overlaps
                    .iter_mut()
                    .find(|o| o.winner == winner && o.shadowed == shadowed)
                {
                    Some(o) => o.words += 1,
                    None => overlaps.push(Overlap {
                        winner,
                        shadowed,
                        first_word: word,
                        words: 1,
                    }),
                }
            }
        }

        for o in &overlaps {
            log::warn!(
                "decode table: {} shadows {} on {} encoding(s), first {:04X}",
                o.winner.name(),
                o.shadowed.name(),
                o.words,
                o.first_word
            );
        }

        DecodeTable {
            types: types.to_vec(),
            masks,
            templates,
            lookup,
            by_op,
            overlaps,
        }
    }

    /// Resolves `opcode` fetched from `addr`. On failure the record carries
    /// `Op::Invalid` and zeroed operand fields.
    pub fn decode(&self, addr: u32, opcode: u16) -> (Instr, bool) {
        let idx = self.lookup[opcode as usize] as usize;
        if idx == 0 {
            return (
                Instr {
                    addr,
                    opcode,
                    ..Instr::default()
                },
                false,
            );
        }

        let ty = &self.types[idx];
        let m = &self.masks[idx];
        let instr = Instr {
            addr,
            opcode,
            op: ty.op,
            cycles: ty.cycles,
            flags: ty.flags,
            rm: (opcode & m.rm_mask) >> m.rm_shift,
            rn: (opcode & m.rn_mask) >> m.rn_shift,
            disp: (opcode & m.disp_mask) >> m.disp_shift,
            imm: (opcode & m.imm_mask) >> m.imm_shift,
        };
        (instr, true)
    }

    /// The instruction kind a word resolves to, if any.
    pub fn lookup(&self, opcode: u16) -> Option<&InstrType> {
        match self.lookup[opcode as usize] {
            0 => None,
            idx => Some(&self.types[idx as usize]),
        }
    }

    fn index_of(&self, op: Op) -> Option<usize> {
        match self.by_op[op as usize] {
            0 => None,
            idx => Some(idx as usize),
        }
    }

    pub fn instr_type(&self, op: Op) -> Option<&InstrType> {
        self.index_of(op).map(|i| &self.types[i])
    }

    pub fn mask(&self, op: Op) -> Option<&InstrMask> {
        self.index_of(op).map(|i| &self.masks[i])
    }

    pub(crate) fn template(&self, op: Op) -> Option<&Template> {
        self.index_of(op).map(|i| &self.templates[i])
    }

    pub fn types(&self) -> &[InstrType] {
        &self.types
    }

    pub fn overlaps(&self) -> &[Overlap] {
        &self.overlaps
    }
}

static DECODE_TABLE: OnceCell<DecodeTable> = OnceCell::new();

/// The process-wide table for `SH4_INSTRS`, built on first use.
pub fn decode_table() -> &'static DecodeTable {
    DECODE_TABLE.get_or_init(|| DecodeTable::build(SH4_INSTRS))
}

#[inline]
pub fn decode(addr: u32, opcode: u16) -> (Instr, bool) {
    decode_table().decode(addr, opcode)
}
