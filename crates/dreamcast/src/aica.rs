use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sh4_core::{AccessWidth, MapError, MemHandlers, MemoryData, MemoryMap, RegionHandle};

use crate::arm7di::SecondaryCore;

pub const AICA_REG_BEGIN: u32 = 0x0070_0000;
pub const AICA_REG_SIZE: u32 = 0x8000;
pub const WAVE_RAM_BEGIN: u32 = 0x0080_0000;
pub const WAVE_RAM_SIZE: u32 = 0x0020_0000;

/// ARM7 reset control. Nonzero holds the ARM7 in reset.
pub const ARMRST_ADDR: u32 = 0x2C00;

// "INIT"
const INIT_SENTINEL: u32 = 0x5449_4E49;

/// 32-bit wave memory reads that return a fixed value. Some games poll these
/// locations for a handshake with sound driver code that is not emulated.
pub const WAVE_READ_OVERRIDES: &[(u32, u32)] = &[
    // Crazy Taxi
    (0x0104, INIT_SENTINEL),
    (0x0284, INIT_SENTINEL),
    (0x0288, INIT_SENTINEL),
    // Crazy Taxi 2
    (0x005C, INIT_SENTINEL),
    // Prince of Persia
    (0xB200, 0),
    (0xB210, 0),
    (0xB220, 0),
    (0xB230, 0),
    (0xB240, 0),
    (0xB250, 0),
    (0xB260, 0),
    (0xB270, 0),
    (0xB280, 0),
    (0xB290, 0),
    (0xB2A0, 0),
    (0xB2B0, 0),
    (0xB2C0, 0),
    (0xB2D0, 0),
    (0xB2E0, 0),
    (0xB2F0, 0),
    (0xB300, 0),
    (0xB310, 0),
    (0xB320, 0),
    (0xB330, 0),
    (0xB340, 0),
    (0xB350, 0),
    (0xB360, 0),
    (0xB370, 0),
    (0xB380, 0),
    (0xB390, 0),
    (0xB3A0, 0),
    (0xB3B0, 0),
    (0xB3C0, 0),
    (0xB3D0, 0),
    (0xB3E0, 0),
    (0xB3F0, 0),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arm7State {
    Suspended,
    Running,
}

pub struct Aica {
    regs: Vec<u8>,
    wave_ram: Vec<u8>,
    arm7_state: Arm7State,
    arm7: Box<dyn SecondaryCore>,
}

impl std::fmt::Debug for Aica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aica")
            .field("arm7_state", &self.arm7_state)
            .finish_non_exhaustive()
    }
}

impl Aica {
    /// The ARM7 starts suspended.
    pub fn new(mut arm7: Box<dyn SecondaryCore>) -> Self {
        arm7.suspend();
        Self {
            regs: vec![0; AICA_REG_SIZE as usize],
            wave_ram: vec![0; WAVE_RAM_SIZE as usize],
            arm7_state: Arm7State::Suspended,
            arm7,
        }
    }

    pub fn arm7_state(&self) -> Arm7State {
        self.arm7_state
    }

    pub fn read_register<T: MemoryData>(&self, offset: u32) -> T {
        T::load(&self.regs, offset as usize)
    }

    pub fn write_register<T: MemoryData>(&mut self, offset: u32, value: T) {
        value.store(&mut self.regs, offset as usize);

        if offset == ARMRST_ADDR {
            if value.to_u32() != 0 {
                self.set_arm7_state(Arm7State::Suspended);
            } else {
                self.set_arm7_state(Arm7State::Running);
            }
        }
    }

    pub fn read_wave<T: MemoryData>(&self, offset: u32) -> T {
        if T::WIDTH == AccessWidth::Long {
            if let Some(&(_, value)) = WAVE_READ_OVERRIDES.iter().find(|(o, _)| *o == offset) {
                return T::from_u32(value);
            }
        }
        T::load(&self.wave_ram, offset as usize)
    }

    pub fn write_wave<T: MemoryData>(&mut self, offset: u32, value: T) {
        value.store(&mut self.wave_ram, offset as usize);
    }

    pub fn wave_ram(&self) -> &[u8] {
        &self.wave_ram
    }

    fn set_arm7_state(&mut self, state: Arm7State) {
        if self.arm7_state == state {
            return;
        }
        log::debug!("aica: ARM7 {:?} -> {:?}", self.arm7_state, state);
        self.arm7_state = state;
        match state {
            Arm7State::Suspended => self.arm7.suspend(),
            Arm7State::Running => self.arm7.resume(),
        }
    }

    pub fn update_arm_interrupts(&mut self) {}

    pub fn update_sh4_interrupts(&mut self) {}

    /// The sound pipeline is not emulated; the ARM7 itself is clocked by the
    /// scheduler through its gate.
    pub fn run(&mut self, _cycles: u64) {}
}

#[derive(Clone, Copy, Debug)]
pub struct AicaRegions {
    pub regs: RegionHandle,
    pub wave_ram: RegionHandle,
}

fn lock(aica: &Mutex<Aica>) -> MutexGuard<'_, Aica> {
    aica.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reg_read<T: MemoryData>(aica: &Arc<Mutex<Aica>>) -> impl Fn(u32) -> T + Send + Sync + 'static {
    let aica = aica.clone();
    move |offset| lock(&aica).read_register(offset)
}

fn reg_write<T: MemoryData>(aica: &Arc<Mutex<Aica>>) -> impl Fn(u32, T) + Send + Sync + 'static {
    let aica = aica.clone();
    move |offset, value| lock(&aica).write_register(offset, value)
}

fn wave_read<T: MemoryData>(aica: &Arc<Mutex<Aica>>) -> impl Fn(u32) -> T + Send + Sync + 'static {
    let aica = aica.clone();
    move |offset| lock(&aica).read_wave(offset)
}

fn wave_write<T: MemoryData>(aica: &Arc<Mutex<Aica>>) -> impl Fn(u32, T) + Send + Sync + 'static {
    let aica = aica.clone();
    move |offset, value| lock(&aica).write_wave(offset, value)
}

/// Allocates the register and wave memory regions and mounts them at their
/// physical addresses.
pub fn map_physical_memory(aica: &Arc<Mutex<Aica>>, map: &mut MemoryMap) -> Result<AicaRegions, MapError> {
    let regs = map.allocate(
        AICA_REG_BEGIN,
        AICA_REG_SIZE,
        MemHandlers::new()
            .with_read8(reg_read::<u8>(aica))
            .with_read16(reg_read::<u16>(aica))
            .with_read32(reg_read::<u32>(aica))
            .with_write8(reg_write::<u8>(aica))
            .with_write16(reg_write::<u16>(aica))
            .with_write32(reg_write::<u32>(aica)),
    )?;

    let wave_ram = map.allocate(
        WAVE_RAM_BEGIN,
        WAVE_RAM_SIZE,
        MemHandlers::new()
            .with_read8(wave_read::<u8>(aica))
            .with_read16(wave_read::<u16>(aica))
            .with_read32(wave_read::<u32>(aica))
            .with_write8(wave_write::<u8>(aica))
            .with_write16(wave_write::<u16>(aica))
            .with_write32(wave_write::<u32>(aica)),
    )?;

    map.mount(regs, AICA_REG_SIZE, AICA_REG_BEGIN)?;
    map.mount(wave_ram, WAVE_RAM_SIZE, WAVE_RAM_BEGIN)?;

    Ok(AicaRegions { regs, wave_ram })
}
