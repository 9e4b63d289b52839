//! Dreamcast physical address space: system RAM, the AICA and video RAM
//! wired into an SH4 memory map, plus program loading and disassembly over
//! that map.

use std::sync::{Arc, Mutex};

use goblin::elf::{Elf, header::EM_SH, program_header::PT_LOAD};
use thiserror::Error;

use sh4_core::{MapError, MemError, MemHandlers, MemoryMap, decode, sh4disasm};

pub mod aica;
pub mod arm7di;
pub mod pvr;

pub use aica::{Aica, AicaRegions, Arm7State};
pub use arm7di::{Arm7Gate, SecondaryCore};

pub const SYSRAM_BEGIN: u32 = 0x0C00_0000;
pub const SYSRAM_SIZE: u32 = 16 * 1024 * 1024;

/// P1 (cached) and P2 (uncached) views of the physical space.
pub const P1_BASE: u32 = 0x8000_0000;
pub const P2_BASE: u32 = 0xA000_0000;

/// Where raw binaries are loaded and started by default.
pub const DEFAULT_LOAD_ADDR: u32 = 0x8C01_0000;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed ELF: {0}")]
    Elf(#[from] goblin::error::Error),
    #[error("not an SH ELF (machine {0:#x})")]
    WrongMachine(u16),
    #[error("segment at {vaddr:08x} lies outside the file")]
    Truncated { vaddr: u32 },
    #[error("no loadable segments")]
    Empty,
    #[error(transparent)]
    Mem(#[from] MemError),
}

pub struct Dreamcast {
    pub map: MemoryMap,
    pub sys_ram: Arc<Mutex<Vec<u8>>>,
    pub video_ram: Arc<Mutex<Vec<u8>>>,
    pub aica: Arc<Mutex<Aica>>,
    /// ARM7 run gate, shared with the AICA.
    pub arm7: Arm7Gate,
}

impl Dreamcast {
    pub fn new() -> Result<Self, MapError> {
        let arm7 = Arm7Gate::new();
        let sys_ram = Arc::new(Mutex::new(vec![0u8; SYSRAM_SIZE as usize]));
        let video_ram = Arc::new(Mutex::new(vec![0u8; pvr::VRAM_SIZE as usize]));
        let aica = Arc::new(Mutex::new(Aica::new(Box::new(arm7.clone()))));

        let mut map = MemoryMap::new();

        // SYSRAM
        let ram = map.allocate(SYSRAM_BEGIN, SYSRAM_SIZE, MemHandlers::buffer(sys_ram.clone()))?;
        for base in [SYSRAM_BEGIN, P1_BASE | SYSRAM_BEGIN, P2_BASE | SYSRAM_BEGIN] {
            map.mount(ram, SYSRAM_SIZE, base)?;
        }

        // AICA
        let a = aica::map_physical_memory(&aica, &mut map)?;
        for area in [P1_BASE, P2_BASE] {
            map.mount(a.regs, aica::AICA_REG_SIZE, area | aica::AICA_REG_BEGIN)?;
            map.mount(a.wave_ram, aica::WAVE_RAM_SIZE, area | aica::WAVE_RAM_BEGIN)?;
        }

        // VRAM
        let v = pvr::map_physical_memory(&video_ram, &mut map)?;
        for area in [P1_BASE, P2_BASE] {
            map.mount(v.vram32, pvr::VRAM_SIZE, area | pvr::VRAM32_BEGIN)?;
            map.mount(v.vram64, pvr::VRAM_SIZE, area | pvr::VRAM64_BEGIN)?;
        }

        Ok(Self {
            map,
            sys_ram,
            video_ram,
            aica,
            arm7,
        })
    }

    pub fn load_raw(&self, addr: u32, data: &[u8]) -> Result<(), LoadError> {
        log::info!("loading {} bytes at {:08x}", data.len(), addr);
        self.map.write_block(addr, data)?;
        Ok(())
    }

    /// Copies the loadable segments of an SH ELF image into memory and
    /// returns its entry point.
    pub fn load_elf(&self, data: &[u8]) -> Result<u32, LoadError> {
        let elf = Elf::parse(data)?;
        if elf.header.e_machine != EM_SH {
            return Err(LoadError::WrongMachine(elf.header.e_machine));
        }

        let mut loaded = 0;
        for ph in elf.program_headers.iter().filter(|ph| ph.p_type == PT_LOAD) {
            if ph.p_memsz == 0 {
                continue;
            }
            let vaddr = ph.p_vaddr as u32;
            let start = ph.p_offset as usize;
            let bytes = start
                .checked_add(ph.p_filesz as usize)
                .and_then(|end| data.get(start..end))
                .ok_or(LoadError::Truncated { vaddr })?;

            log::info!(
                "segment {:08x}: {:x} bytes from file, {:x} in memory",
                vaddr,
                ph.p_filesz,
                ph.p_memsz
            );
            self.map.write_block(vaddr, bytes)?;
            if ph.p_memsz > ph.p_filesz {
                self.zero_fill(vaddr.wrapping_add(bytes.len() as u32), ph.p_memsz - ph.p_filesz)?;
            }
            loaded += 1;
        }

        if loaded == 0 {
            return Err(LoadError::Empty);
        }
        log::info!("entry point {:08x}", elf.entry);
        Ok(elf.entry as u32)
    }

    /// Clears `len` bytes at `addr`. The whole span must sit inside one
    /// mount; it is checked before anything is written.
    fn zero_fill(&self, addr: u32, len: u64) -> Result<(), MemError> {
        const CHUNK: u64 = 0x1_0000;

        let (mount, offset) = self.map.resolve(addr)?;
        if u64::from(offset) + len > u64::from(mount.size) {
            return Err(MemError::BlockOverrun {
                addr,
                len: usize::try_from(len).unwrap_or(usize::MAX),
            });
        }

        let zeros = vec![0u8; len.min(CHUNK) as usize];
        let mut done = 0;
        while done < len {
            let n = (len - done).min(CHUNK);
            self.map.write_block(addr + done as u32, &zeros[..n as usize])?;
            done += n;
        }
        Ok(())
    }

    pub fn read_memory_slice(&self, addr: u32, len: usize) -> Result<Vec<u8>, MemError> {
        let mut out = vec![0u8; len];
        self.map.read_block(addr, &mut out)?;
        Ok(out)
    }

    pub fn disassemble(&self, base: u32, count: usize) -> Vec<DisassemblyLine> {
        disassemble(&self.map, base, count)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisassemblyLine {
    pub address: u32,
    pub bytes: String,
    pub disassembly: String,
}

/// Fetches and formats `count` instructions starting at `base`. Words that
/// cannot be fetched produce a `??` line.
pub fn disassemble(map: &MemoryMap, base: u32, count: usize) -> Vec<DisassemblyLine> {
    let mut result = Vec::with_capacity(count);
    let mut addr = base;

    for _ in 0..count {
        let line = match map.read16(addr) {
            Ok(opcode) => {
                let (instr, _) = decode(addr, opcode);
                DisassemblyLine {
                    address: addr,
                    bytes: format!("{:04X}", opcode),
                    disassembly: sh4disasm::format(&instr),
                }
            }
            Err(e) => {
                log::warn!("disassemble: {}", e);
                DisassemblyLine {
                    address: addr,
                    bytes: "????".to_string(),
                    disassembly: format!("{:08x}  ??", addr),
                }
            }
        };
        result.push(line);
        addr = addr.wrapping_add(2);
    }

    result
}
