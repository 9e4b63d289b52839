//! SH4 instruction decoding, disassembly and physical memory dispatch.

pub mod sh4dec;
pub mod sh4disasm;
pub mod sh4mem;

pub use sh4dec::{
    DecodeTable, Instr, InstrFlags, InstrMask, InstrType, Op, Overlap, SH4_INSTRS, arg_mask,
    decode, decode_table,
};
pub use sh4disasm::{MAX_DISASM_LEN, disassemble, format, format_into};
pub use sh4mem::{
    AccessWidth, MapError, MemError, MemHandlers, MemoryData, MemoryMap, RegionHandle,
};
