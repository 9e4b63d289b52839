//! PowerVR2 video RAM views.
//!
//! The 8 MiB of VRAM is split into two 4 MiB banks and reachable two ways:
//! `0x0400_0000` gives 32-bit sequential access, `0x0500_0000` gives 64-bit
//! interleaved access where consecutive 32-bit words alternate between the
//! banks.

use std::sync::{Arc, Mutex, PoisonError};

use sh4_core::{MapError, MemHandlers, MemoryData, MemoryMap, RegionHandle};

pub const VRAM_SIZE: u32 = 8 * 1024 * 1024;
pub const VRAM32_BEGIN: u32 = 0x0400_0000;
pub const VRAM64_BEGIN: u32 = 0x0500_0000;

/// Translates an offset in the 64-bit view to the sequential offset.
///
/// ```text
/// 0x000000 -> 0x000000    0x400000 -> 0x000004
/// 0x000004 -> 0x000008    0x400004 -> 0x00000c
/// ```
#[inline]
pub const fn map64(offset: u32) -> u32 {
    ((offset & 0x003F_FFFC) << 1) + ((offset & 0x0040_0000) >> 20) + (offset & 0x3)
}

#[derive(Clone, Copy, Debug)]
pub struct VramRegions {
    pub vram32: RegionHandle,
    pub vram64: RegionHandle,
}

fn interleaved_read<T: MemoryData>(vram: &Arc<Mutex<Vec<u8>>>) -> impl Fn(u32) -> T + Send + Sync + 'static {
    let vram = vram.clone();
    move |offset| {
        let mem = vram.lock().unwrap_or_else(PoisonError::into_inner);
        T::load(&mem, map64(offset) as usize)
    }
}

fn interleaved_write<T: MemoryData>(vram: &Arc<Mutex<Vec<u8>>>) -> impl Fn(u32, T) + Send + Sync + 'static {
    let vram = vram.clone();
    move |offset, value| {
        let mut mem = vram.lock().unwrap_or_else(PoisonError::into_inner);
        value.store(&mut mem, map64(offset) as usize)
    }
}

/// Mounts both views over `vram`, which must hold at least `VRAM_SIZE`
/// bytes.
///
/// The interleaved view has no byte writes; the bus does not generate them.
pub fn map_physical_memory(vram: &Arc<Mutex<Vec<u8>>>, map: &mut MemoryMap) -> Result<VramRegions, MapError> {
    let len = vram.lock().unwrap_or_else(PoisonError::into_inner).len();
    let vram32 = map.allocate(VRAM32_BEGIN, VRAM_SIZE, MemHandlers::buffer(vram.clone()))?;
    let vram64 = map.allocate(
        VRAM64_BEGIN,
        VRAM_SIZE,
        MemHandlers::new()
            .with_backing_len(len)
            .with_read8(interleaved_read::<u8>(vram))
            .with_read16(interleaved_read::<u16>(vram))
            .with_read32(interleaved_read::<u32>(vram))
            .with_write16(interleaved_write::<u16>(vram))
            .with_write32(interleaved_write::<u32>(vram)),
    )?;

    map.mount(vram32, VRAM_SIZE, VRAM32_BEGIN)?;
    map.mount(vram64, VRAM_SIZE, VRAM64_BEGIN)?;

    Ok(VramRegions { vram32, vram64 })
}
