use dreamcast::aica::{ARMRST_ADDR, AICA_REG_BEGIN, WAVE_RAM_BEGIN};
use dreamcast::{Arm7State, DEFAULT_LOAD_ADDR, Dreamcast, LoadError, P2_BASE};
use sh4_core::MemError;

fn dreamcast() -> Dreamcast {
    Dreamcast::new().expect("system map wiring")
}

#[test]
fn sysram_mirrors() {
    let dc = dreamcast();
    dc.map.write32(0x8C00_1000, 0x1234_5678).unwrap();
    assert_eq!(dc.map.read32(0x0C00_1000), Ok(0x1234_5678));
    assert_eq!(dc.map.read32(0xAC00_1000), Ok(0x1234_5678));
    assert_eq!(dc.sys_ram.lock().unwrap()[0x1000], 0x78);
}

#[test]
fn armrst_through_the_bus() {
    let dc = dreamcast();
    assert!(dc.arm7.is_halted());
    assert_eq!(dc.aica.lock().unwrap().arm7_state(), Arm7State::Suspended);

    dc.map.write32(AICA_REG_BEGIN + ARMRST_ADDR, 0).unwrap();
    assert!(!dc.arm7.is_halted());
    assert_eq!(dc.aica.lock().unwrap().arm7_state(), Arm7State::Running);

    // P2 mirror, byte write
    dc.map.write8(P2_BASE | AICA_REG_BEGIN | ARMRST_ADDR, 1).unwrap();
    assert!(dc.arm7.is_halted());
    assert_eq!(dc.map.read8(AICA_REG_BEGIN + ARMRST_ADDR), Ok(1));
}

#[test]
fn wave_quirk_through_the_bus() {
    let dc = dreamcast();
    dc.map.write32(WAVE_RAM_BEGIN + 0x284, 0xFFFF_FFFF).unwrap();
    dc.map.write32(WAVE_RAM_BEGIN + 0x280, 0xAAAA_AAAA).unwrap();

    assert_eq!(dc.map.read32(WAVE_RAM_BEGIN + 0x284), Ok(0x5449_4E49));
    assert_eq!(dc.map.read32(WAVE_RAM_BEGIN + 0x280), Ok(0xAAAA_AAAA));
    assert_eq!(dc.map.read16(WAVE_RAM_BEGIN + 0x284), Ok(0xFFFF));
}

#[test]
fn unmapped_hole_faults() {
    let dc = dreamcast();
    let err = dc.map.read32(0x0100_0000).unwrap_err();
    assert_eq!(err, MemError::Unmapped { addr: 0x0100_0000 });
    assert!(err.is_access_fault());
}

#[test]
fn disassembles_loaded_code() {
    let dc = dreamcast();
    // mov #5,r1; add r1,r2; rts; nop
    let code = [0x05, 0xE1, 0x1C, 0x32, 0x0B, 0x00, 0x09, 0x00];
    dc.load_raw(DEFAULT_LOAD_ADDR, &code).unwrap();

    let lines = dc.disassemble(DEFAULT_LOAD_ADDR, 4);
    let text: Vec<&str> = lines.iter().map(|l| l.disassembly.as_str()).collect();
    assert_eq!(
        text,
        [
            "8c010000  mov 0x05,r1",
            "8c010002  add r1,r2",
            "8c010004  rts",
            "8c010006  nop",
        ]
    );
    assert_eq!(lines[0].bytes, "E105");
    assert_eq!(lines[3].address, 0x8C01_0006);
}

#[test]
fn disassembly_survives_fetch_faults() {
    let dc = dreamcast();
    let lines = dc.disassemble(0x0CFF_FFFE, 2);
    assert_eq!(lines[0].disassembly, "0cfffffe  .word 0x0000");
    assert_eq!(lines[1].bytes, "????");
    assert_eq!(lines[1].disassembly, "0d000000  ??");
}

#[test]
fn read_memory_slice_spans_a_mount() {
    let dc = dreamcast();
    dc.load_raw(0x8C00_0100, b"SEGA").unwrap();
    assert_eq!(dc.read_memory_slice(0x0C00_0100, 4).unwrap(), b"SEGA");
    assert!(dc.read_memory_slice(0x0CFF_FFFE, 4).is_err());
}

/// Minimal 32-bit little-endian SH executable with one PT_LOAD segment.
fn sh_elf(entry: u32, vaddr: u32, code: &[u8], memsz: u32, machine: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&[0x7F, b'E', b'L', b'F', 1, 1, 1, 0]);
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    out.extend_from_slice(&machine.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&entry.to_le_bytes());
    out.extend_from_slice(&52u32.to_le_bytes()); // e_phoff
    out.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&52u16.to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
    out.extend_from_slice(&40u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    assert_eq!(out.len(), 52);

    let data_offset = 52 + 32;
    for field in [1u32, data_offset, vaddr, vaddr, code.len() as u32, memsz, 5, 4] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(code);
    out
}

#[test]
fn loads_elf_segments() {
    let dc = dreamcast();
    dc.load_raw(0x8C01_0004, &[0xFF; 4]).unwrap();

    let image = sh_elf(0x8C01_0000, 0x8C01_0000, &[0x09, 0x00, 0x0B, 0x00], 8, 42);
    let entry = dc.load_elf(&image).unwrap();
    assert_eq!(entry, 0x8C01_0000);

    let lines = dc.disassemble(entry, 2);
    assert_eq!(lines[0].disassembly, "8c010000  nop");
    assert_eq!(lines[1].disassembly, "8c010002  rts");
    // bss is cleared
    assert_eq!(dc.map.read32(0x8C01_0004), Ok(0));
}

#[test]
fn rejects_foreign_elf() {
    let dc = dreamcast();
    // EM_ARM
    let image = sh_elf(0x8C01_0000, 0x8C01_0000, &[0; 4], 4, 40);
    assert!(matches!(dc.load_elf(&image), Err(LoadError::WrongMachine(40))));
    assert!(matches!(dc.load_elf(b"not an elf"), Err(LoadError::Elf(_))));
}

#[test]
fn elf_outside_memory_is_a_load_error() {
    let dc = dreamcast();
    let image = sh_elf(0x0100_0000, 0x0100_0000, &[0; 4], 4, 42);
    assert!(matches!(
        dc.load_elf(&image),
        Err(LoadError::Mem(MemError::Unmapped { addr: 0x0100_0000 }))
    ));
}

#[test]
fn oversized_bss_fails_before_touching_memory() {
    let dc = dreamcast();
    dc.load_raw(0x8C01_0004, &[0xAA; 4]).unwrap();

    let image = sh_elf(0x8C01_0000, 0x8C01_0000, &[0x09, 0x00], 0xFFFF_0000, 42);
    assert!(matches!(
        dc.load_elf(&image),
        Err(LoadError::Mem(MemError::BlockOverrun { addr: 0x8C01_0002, len: 0xFFFE_FFFE }))
    ));
    assert_eq!(dc.map.read32(0x8C01_0004), Ok(0xAAAA_AAAA));
}

#[test]
fn bss_larger_than_one_chunk_is_cleared() {
    let dc = dreamcast();
    dc.load_raw(0x8C02_0000, &[0x55; 0x100]).unwrap();

    let image = sh_elf(0x8C01_0000, 0x8C01_0000, &[0x09, 0x00], 0x2_0000, 42);
    dc.load_elf(&image).unwrap();
    assert_eq!(dc.map.read32(0x8C02_0000), Ok(0));
    assert_eq!(dc.map.read32(0x8C02_00FC), Ok(0));
    assert_eq!(dc.map.read16(0x8C01_0000), Ok(0x0009));
}
