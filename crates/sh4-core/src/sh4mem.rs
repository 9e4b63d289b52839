// src/sh4mem.rs

//! Physical address dispatch.
//!
//! A region is a span bound to one set of typed handlers. Allocating a region
//! does not place it in the address space; `mount` does, and the same region
//! may be mounted at several bases to mirror it. Handlers see the offset from
//! the mount base.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use paste::paste;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessWidth {
    Byte,
    Word,
    Long,
    Block,
}

impl fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessWidth::Byte => "8-bit",
            AccessWidth::Word => "16-bit",
            AccessWidth::Long => "32-bit",
            AccessWidth::Block => "block",
        };
        f.write_str(s)
    }
}

pub type ReadHandler<T> = Box<dyn Fn(u32) -> T + Send + Sync>;
pub type WriteHandler<T> = Box<dyn Fn(u32, T) + Send + Sync>;
pub type ReadBlockHandler = Box<dyn Fn(u32, &mut [u8]) + Send + Sync>;
pub type WriteBlockHandler = Box<dyn Fn(u32, &[u8]) + Send + Sync>;

/// Per-width handlers of a region. A missing handler means accesses of that
/// width fault; they are never built from another width.
#[derive(Default)]
pub struct MemHandlers {
    pub read8: Option<ReadHandler<u8>>,
    pub read16: Option<ReadHandler<u16>>,
    pub read32: Option<ReadHandler<u32>>,
    pub read_block: Option<ReadBlockHandler>,

    pub write8: Option<WriteHandler<u8>>,
    pub write16: Option<WriteHandler<u16>>,
    pub write32: Option<WriteHandler<u32>>,
    pub write_block: Option<WriteBlockHandler>,

    /// Length of the storage the handlers index, when they index one.
    /// Regions larger than this are rejected at allocation.
    pub backing_len: Option<usize>,
}

macro_rules! handler_builders {
    ($($bits:literal: $t:ty),*) => {
        paste! {
            $(
                pub fn [<with_read $bits>](mut self, f: impl Fn(u32) -> $t + Send + Sync + 'static) -> Self {
                    self.[<read $bits>] = Some(Box::new(f));
                    self
                }

                pub fn [<with_write $bits>](mut self, f: impl Fn(u32, $t) + Send + Sync + 'static) -> Self {
                    self.[<write $bits>] = Some(Box::new(f));
                    self
                }
            )*
        }
    };
}

impl MemHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    handler_builders!(8: u8, 16: u16, 32: u32);

    pub fn with_read_block(mut self, f: impl Fn(u32, &mut [u8]) + Send + Sync + 'static) -> Self {
        self.read_block = Some(Box::new(f));
        self
    }

    pub fn with_write_block(mut self, f: impl Fn(u32, &[u8]) + Send + Sync + 'static) -> Self {
        self.write_block = Some(Box::new(f));
        self
    }

    pub fn with_backing_len(mut self, len: usize) -> Self {
        self.backing_len = Some(len);
        self
    }

    /// Plain little-endian storage for every width, block access included.
    pub fn buffer(buf: Arc<Mutex<Vec<u8>>>) -> Self {
        fn rd<T: MemoryData>(buf: Arc<Mutex<Vec<u8>>>) -> impl Fn(u32) -> T + Send + Sync + 'static {
            move |offset| T::load(&lock(&buf), offset as usize)
        }
        fn wr<T: MemoryData>(buf: Arc<Mutex<Vec<u8>>>) -> impl Fn(u32, T) + Send + Sync + 'static {
            move |offset, value| value.store(&mut lock(&buf), offset as usize)
        }

        let len = lock(&buf).len();
        let rb = buf.clone();
        let wb = buf.clone();
        MemHandlers::new()
            .with_backing_len(len)
            .with_read8(rd::<u8>(buf.clone()))
            .with_read16(rd::<u16>(buf.clone()))
            .with_read32(rd::<u32>(buf.clone()))
            .with_write8(wr::<u8>(buf.clone()))
            .with_write16(wr::<u16>(buf.clone()))
            .with_write32(wr::<u32>(buf))
            .with_read_block(move |offset, out| {
                let offset = offset as usize;
                out.copy_from_slice(&lock(&rb)[offset..offset + out.len()]);
            })
            .with_write_block(move |offset, data| {
                let offset = offset as usize;
                lock(&wb)[offset..offset + data.len()].copy_from_slice(data);
            })
    }

    pub fn is_empty(&self) -> bool {
        !(self.read8.is_some()
            || self.read16.is_some()
            || self.read32.is_some()
            || self.read_block.is_some()
            || self.write8.is_some()
            || self.write16.is_some()
            || self.write32.is_some()
            || self.write_block.is_some())
    }
}

impl fmt::Debug for MemHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemHandlers")
            .field("read8", &self.read8.is_some())
            .field("read16", &self.read16.is_some())
            .field("read32", &self.read32.is_some())
            .field("read_block", &self.read_block.is_some())
            .field("write8", &self.write8.is_some())
            .field("write16", &self.write16.is_some())
            .field("write32", &self.write32.is_some())
            .field("write_block", &self.write_block.is_some())
            .field("backing_len", &self.backing_len)
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

mod sealed {
    pub trait IntType {}
    impl IntType for u8 {}
    impl IntType for u16 {}
    impl IntType for u32 {}
}

/// Integer widths the bus can move in a single access.
pub trait MemoryData: sealed::IntType + Copy + Default + fmt::LowerHex + Send + 'static {
    const WIDTH: AccessWidth;
    const SIZE: u32;

    fn from_u32(v: u32) -> Self;
    fn to_u32(self) -> u32;

    /// Little-endian load from a device buffer.
    fn load(buf: &[u8], offset: usize) -> Self;
    /// Little-endian store into a device buffer.
    fn store(self, buf: &mut [u8], offset: usize);

    fn reader(h: &MemHandlers) -> Option<&ReadHandler<Self>>;
    fn writer(h: &MemHandlers) -> Option<&WriteHandler<Self>>;
}

macro_rules! impl_memory_data {
    ($($t:ty => $width:ident, $bits:literal);* $(;)?) => {
        paste! {
            $(
                impl MemoryData for $t {
                    const WIDTH: AccessWidth = AccessWidth::$width;
                    const SIZE: u32 = std::mem::size_of::<$t>() as u32;

                    #[inline(always)]
                    fn from_u32(v: u32) -> Self {
                        v as $t
                    }

                    #[inline(always)]
                    fn to_u32(self) -> u32 {
                        self as u32
                    }

                    #[inline]
                    fn load(buf: &[u8], offset: usize) -> Self {
                        let mut bytes = [0u8; std::mem::size_of::<$t>()];
                        bytes.copy_from_slice(&buf[offset..offset + std::mem::size_of::<$t>()]);
                        <$t>::from_le_bytes(bytes)
                    }

                    #[inline]
                    fn store(self, buf: &mut [u8], offset: usize) {
                        let bytes = self.to_le_bytes();
                        buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
                    }

                    fn reader(h: &MemHandlers) -> Option<&ReadHandler<Self>> {
                        h.[<read $bits>].as_ref()
                    }

                    fn writer(h: &MemHandlers) -> Option<&WriteHandler<Self>> {
                        h.[<write $bits>].as_ref()
                    }
                }
            )*
        }
    };
}

impl_memory_data! {
    u8 => Byte, 8;
    u16 => Word, 16;
    u32 => Long, 32;
}

/// Region setup errors. These are wiring bugs in the system map.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("region at {base:08x} has zero size")]
    EmptyRegion { base: u32 },
    #[error("span {base:08x}+{size:x} wraps the 32-bit address space")]
    AddressOverflow { base: u32, size: u32 },
    #[error("region at {base:08x} has no handlers")]
    NoHandlers { base: u32 },
    #[error("region {base:08x}+{size:x} is larger than its {len:x} byte buffer")]
    BufferTooSmall { base: u32, size: u32, len: usize },
    #[error("unknown region handle {0}")]
    InvalidHandle(u32),
    #[error("mount of {size:x} bytes exceeds region size {region_size:x}")]
    MountTooLarge { size: u32, region_size: u32 },
    #[error("mount {base:08x}+{size:x} overlaps the mount at {existing:08x}")]
    Overlap { base: u32, size: u32, existing: u32 },
}

/// Access faults raised during dispatch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemError {
    #[error("unmapped address {addr:08x}")]
    Unmapped { addr: u32 },
    #[error("{width} access to {addr:08x} not supported by its region")]
    UnsupportedWidth { addr: u32, width: AccessWidth },
    #[error("{width} access at {addr:08x} runs past the end of its mount")]
    CrossesBoundary { addr: u32, width: AccessWidth },
    #[error("{len} byte block at {addr:08x} runs past the end of its mount")]
    BlockOverrun { addr: u32, len: usize },
}

impl MemError {
    /// Every dispatch error is reported to the guest as an access fault.
    pub fn is_access_fault(&self) -> bool {
        match self {
            MemError::Unmapped { .. }
            | MemError::UnsupportedWidth { .. }
            | MemError::CrossesBoundary { .. }
            | MemError::BlockOverrun { .. } => true,
        }
    }

    pub fn addr(&self) -> u32 {
        match *self {
            MemError::Unmapped { addr }
            | MemError::UnsupportedWidth { addr, .. }
            | MemError::CrossesBoundary { addr, .. }
            | MemError::BlockOverrun { addr, .. } => addr,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionHandle(u32);

impl RegionHandle {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
pub struct MemoryRegion {
    /// Physical address the region was allocated for.
    pub base: u32,
    pub size: u32,
    handlers: MemHandlers,
}

impl MemoryRegion {
    pub fn handlers(&self) -> &MemHandlers {
        &self.handlers
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mount {
    pub base: u32,
    pub size: u32,
    pub handle: RegionHandle,
}

impl Mount {
    #[inline]
    fn last(&self) -> u32 {
        self.base + (self.size - 1)
    }
}

/// Mounted regions, sorted by base with no two mounts overlapping.
///
/// Mounting takes `&mut self`; share a map between threads behind a lock if
/// it must change while others dispatch through it.
#[derive(Debug, Default)]
pub struct MemoryMap {
    regions: Vec<MemoryRegion>,
    mounts: Vec<Mount>,
}

macro_rules! typed_access {
    ($($bits:literal: $t:ty),*) => {
        paste! {
            $(
                #[inline]
                pub fn [<read $bits>](&self, addr: u32) -> Result<$t, MemError> {
                    self.read::<$t>(addr)
                }

                #[inline]
                pub fn [<write $bits>](&self, addr: u32, value: $t) -> Result<(), MemError> {
                    self.write::<$t>(addr, value)
                }
            )*
        }
    };
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(
        &mut self,
        base: u32,
        size: u32,
        handlers: MemHandlers,
    ) -> Result<RegionHandle, MapError> {
        if size == 0 {
            return Err(MapError::EmptyRegion { base });
        }
        if base.checked_add(size - 1).is_none() {
            return Err(MapError::AddressOverflow { base, size });
        }
        if handlers.is_empty() {
            return Err(MapError::NoHandlers { base });
        }
        if let Some(len) = handlers.backing_len {
            if size as usize > len {
                return Err(MapError::BufferTooSmall { base, size, len });
            }
        }

        let handle = RegionHandle(self.regions.len() as u32);
        self.regions.push(MemoryRegion {
            base,
            size,
            handlers,
        });
        Ok(handle)
    }

    pub fn region(&self, handle: RegionHandle) -> Option<&MemoryRegion> {
        self.regions.get(handle.0 as usize)
    }

    /// Binds the first `size` bytes of a region at `base`.
    pub fn mount(&mut self, handle: RegionHandle, size: u32, base: u32) -> Result<(), MapError> {
        let region = self
            .region(handle)
            .ok_or(MapError::InvalidHandle(handle.0))?;
        if size == 0 {
            return Err(MapError::EmptyRegion { base });
        }
        if size > region.size {
            return Err(MapError::MountTooLarge {
                size,
                region_size: region.size,
            });
        }
        if base.checked_add(size - 1).is_none() {
            return Err(MapError::AddressOverflow { base, size });
        }

        let new = Mount { base, size, handle };
        let idx = self.mounts.partition_point(|m| m.base < base);
        let neighbours = idx
            .checked_sub(1)
            .and_then(|i| self.mounts.get(i))
            .into_iter()
            .chain(self.mounts.get(idx));
        for m in neighbours {
            if m.base <= new.last() && new.base <= m.last() {
                return Err(MapError::Overlap {
                    base,
                    size,
                    existing: m.base,
                });
            }
        }

        log::debug!(
            "mount region {} ({:08x}) at {:08x}..={:08x}",
            handle.0,
            region.base,
            base,
            new.last()
        );
        self.mounts.insert(idx, new);
        Ok(())
    }

    /// Removes the mount starting exactly at `base`. The region stays
    /// allocated and can be mounted again.
    pub fn unmount(&mut self, base: u32) -> Option<Mount> {
        let idx = self.mounts.binary_search_by_key(&base, |m| m.base).ok()?;
        let m = self.mounts.remove(idx);
        log::debug!("unmount region {} from {:08x}", m.handle.0, base);
        Some(m)
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Finds the mount containing `addr` and the offset into it.
    pub fn resolve(&self, addr: u32) -> Result<(&Mount, u32), MemError> {
        let idx = self.mounts.partition_point(|m| m.base <= addr);
        let m = idx
            .checked_sub(1)
            .map(|i| &self.mounts[i])
            .ok_or(MemError::Unmapped { addr })?;
        let offset = addr - m.base;
        if offset >= m.size {
            return Err(MemError::Unmapped { addr });
        }
        Ok((m, offset))
    }

    fn resolve_region(&self, addr: u32, len: u32) -> Result<(&MemoryRegion, u32, bool), MemError> {
        let (m, offset) = self.resolve(addr)?;
        let fits = u64::from(offset) + u64::from(len) <= u64::from(m.size);
        Ok((&self.regions[m.handle.0 as usize], offset, fits))
    }

    pub fn read<T: MemoryData>(&self, addr: u32) -> Result<T, MemError> {
        let (region, offset, fits) = self.resolve_region(addr, T::SIZE)?;
        let Some(handler) = T::reader(&region.handlers) else {
            return Err(MemError::UnsupportedWidth { addr, width: T::WIDTH });
        };
        if !fits {
            return Err(MemError::CrossesBoundary { addr, width: T::WIDTH });
        }
        Ok(handler(offset))
    }

    pub fn write<T: MemoryData>(&self, addr: u32, value: T) -> Result<(), MemError> {
        let (region, offset, fits) = self.resolve_region(addr, T::SIZE)?;
        let Some(handler) = T::writer(&region.handlers) else {
            return Err(MemError::UnsupportedWidth { addr, width: T::WIDTH });
        };
        if !fits {
            return Err(MemError::CrossesBoundary { addr, width: T::WIDTH });
        }
        handler(offset, value);
        Ok(())
    }

    typed_access!(8: u8, 16: u16, 32: u32);

    /// Fills `out` from `addr`. The block must stay inside one mount.
    pub fn read_block(&self, addr: u32, out: &mut [u8]) -> Result<(), MemError> {
        if out.is_empty() {
            return self.resolve(addr).map(|_| ());
        }
        let len = u32::try_from(out.len()).map_err(|_| MemError::BlockOverrun { addr, len: out.len() })?;
        let (region, offset, fits) = self.resolve_region(addr, len)?;
        let Some(handler) = region.handlers.read_block.as_ref() else {
            return Err(MemError::UnsupportedWidth { addr, width: AccessWidth::Block });
        };
        if !fits {
            return Err(MemError::BlockOverrun { addr, len: out.len() });
        }
        handler(offset, out);
        Ok(())
    }

    pub fn write_block(&self, addr: u32, data: &[u8]) -> Result<(), MemError> {
        if data.is_empty() {
            return self.resolve(addr).map(|_| ());
        }
        let len = u32::try_from(data.len()).map_err(|_| MemError::BlockOverrun { addr, len: data.len() })?;
        let (region, offset, fits) = self.resolve_region(addr, len)?;
        let Some(handler) = region.handlers.write_block.as_ref() else {
            return Err(MemError::UnsupportedWidth { addr, width: AccessWidth::Block });
        };
        if !fits {
            return Err(MemError::BlockOverrun { addr, len: data.len() });
        }
        handler(offset, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(size: usize) -> (Arc<Mutex<Vec<u8>>>, MemHandlers) {
        let buf = Arc::new(Mutex::new(vec![0u8; size]));
        let h = MemHandlers::buffer(buf.clone());
        (buf, h)
    }

    #[test]
    fn little_endian_helpers() {
        let mut buf = [0u8; 8];
        0x1122_3344u32.store(&mut buf, 2);
        assert_eq!(buf, [0, 0, 0x44, 0x33, 0x22, 0x11, 0, 0]);
        assert_eq!(u16::load(&buf, 3), 0x2233);
        assert_eq!(u8::load(&buf, 5), 0x11);
        assert_eq!(<u16 as MemoryData>::from_u32(0x1_2345), 0x2345);
        assert_eq!(0xABu8.to_u32(), 0xAB);
    }

    #[test]
    fn allocate_rejects_bad_regions() {
        let mut map = MemoryMap::new();
        assert_eq!(
            map.allocate(0x1000, 0, ram(1).1).unwrap_err(),
            MapError::EmptyRegion { base: 0x1000 }
        );
        assert_eq!(
            map.allocate(0xFFFF_FF00, 0x200, ram(1).1).unwrap_err(),
            MapError::AddressOverflow { base: 0xFFFF_FF00, size: 0x200 }
        );
        assert_eq!(
            map.allocate(0x1000, 0x100, MemHandlers::new()).unwrap_err(),
            MapError::NoHandlers { base: 0x1000 }
        );
        // the top of the address space is still usable
        assert!(map.allocate(0xFFFF_FF00, 0x100, ram(0x100).1).is_ok());
    }

    #[test]
    fn mount_rejects_overlap_and_oversize() {
        let mut map = MemoryMap::new();
        let h = map.allocate(0x1000, 0x100, ram(0x100).1).unwrap();
        map.mount(h, 0x100, 0x1000).unwrap();

        assert_eq!(
            map.mount(h, 0x100, 0x10FF).unwrap_err(),
            MapError::Overlap { base: 0x10FF, size: 0x100, existing: 0x1000 }
        );
        assert_eq!(
            map.mount(h, 0x100, 0x0F01).unwrap_err(),
            MapError::Overlap { base: 0x0F01, size: 0x100, existing: 0x1000 }
        );
        assert_eq!(
            map.mount(h, 0x200, 0x4000).unwrap_err(),
            MapError::MountTooLarge { size: 0x200, region_size: 0x100 }
        );
        assert_eq!(
            map.mount(RegionHandle(7), 0x10, 0x4000).unwrap_err(),
            MapError::InvalidHandle(7)
        );

        // adjacent is fine
        map.mount(h, 0x100, 0x1100).unwrap();
        map.mount(h, 0x100, 0x0F00).unwrap();
        let bases: Vec<u32> = map.mounts().iter().map(|m| m.base).collect();
        assert_eq!(bases, [0x0F00, 0x1000, 0x1100]);
    }

    #[test]
    fn mirrors_share_storage() {
        let mut map = MemoryMap::new();
        let (buf, h) = ram(0x100);
        let h = map.allocate(0x0C00_0000, 0x100, h).unwrap();
        map.mount(h, 0x100, 0x0C00_0000).unwrap();
        map.mount(h, 0x100, 0x8C00_0000).unwrap();

        map.write32(0x0C00_0010, 0xDEAD_BEEF).unwrap();
        assert_eq!(map.read32(0x8C00_0010), Ok(0xDEAD_BEEF));
        assert_eq!(map.read8(0x8C00_0013), Ok(0xDE));
        assert_eq!(buf.lock().unwrap()[0x10], 0xEF);
    }

    #[test]
    fn partial_mount_limits_the_window() {
        let mut map = MemoryMap::new();
        let h = map.allocate(0, 0x100, ram(0x100).1).unwrap();
        map.mount(h, 0x10, 0x2000).unwrap();
        assert!(map.read8(0x200F).is_ok());
        assert_eq!(map.read8(0x2010), Err(MemError::Unmapped { addr: 0x2010 }));
        assert_eq!(
            map.read32(0x200E),
            Err(MemError::CrossesBoundary { addr: 0x200E, width: AccessWidth::Long })
        );
    }

    #[test]
    fn unsupported_width_is_not_synthesized() {
        let mut map = MemoryMap::new();
        let h = map
            .allocate(0x100, 0x10, MemHandlers::new().with_read32(|_| 0x1234_5678))
            .unwrap();
        map.mount(h, 0x10, 0x100).unwrap();

        assert_eq!(map.read32(0x104), Ok(0x1234_5678));
        let err = map.read8(0x104).unwrap_err();
        assert_eq!(err, MemError::UnsupportedWidth { addr: 0x104, width: AccessWidth::Byte });
        assert!(err.is_access_fault());
        assert_eq!(
            map.write32(0x104, 0),
            Err(MemError::UnsupportedWidth { addr: 0x104, width: AccessWidth::Long })
        );
        assert_eq!(
            map.read_block(0x100, &mut [0u8; 4]),
            Err(MemError::UnsupportedWidth { addr: 0x100, width: AccessWidth::Block })
        );
    }

    #[test]
    fn block_access_stays_inside_mount() {
        let mut map = MemoryMap::new();
        let h = map.allocate(0, 0x20, ram(0x20).1).unwrap();
        map.mount(h, 0x20, 0x4000).unwrap();

        map.write_block(0x4010, &[1, 2, 3, 4]).unwrap();
        assert_eq!(map.read32(0x4010), Ok(0x0403_0201));

        let mut out = [0u8; 4];
        map.read_block(0x4010, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);

        let err = map.write_block(0x401E, &[0; 4]).unwrap_err();
        assert_eq!(err, MemError::BlockOverrun { addr: 0x401E, len: 4 });
        assert!(map.read_block(0x4000, &mut []).is_ok());
        assert_eq!(map.read_block(0x5000, &mut []), Err(MemError::Unmapped { addr: 0x5000 }));
        assert_eq!(map.write_block(0x5000, &[]), Err(MemError::Unmapped { addr: 0x5000 }));
    }

    #[test]
    fn buffer_must_cover_the_region() {
        let mut map = MemoryMap::new();
        assert_eq!(
            map.allocate(0x1000, 0x100, ram(0x10).1).unwrap_err(),
            MapError::BufferTooSmall { base: 0x1000, size: 0x100, len: 0x10 }
        );
        assert!(map.mounts().is_empty());
        assert_eq!(map.read32(0x1050), Err(MemError::Unmapped { addr: 0x1050 }));

        // a larger buffer is fine, only its head is reachable
        let h = map.allocate(0x1000, 0x100, ram(0x200).1).unwrap();
        map.mount(h, 0x100, 0x1000).unwrap();
        assert_eq!(map.read32(0x10FC), Ok(0));
        assert_eq!(map.region(h).unwrap().handlers().backing_len, Some(0x200));
    }

    #[test]
    fn unmount_frees_the_range() {
        let mut map = MemoryMap::new();
        let h = map.allocate(0, 0x10, ram(0x10).1).unwrap();
        map.mount(h, 0x10, 0x100).unwrap();
        assert!(map.unmount(0x104).is_none());
        assert_eq!(map.unmount(0x100).map(|m| m.handle), Some(h));
        assert_eq!(map.read8(0x100), Err(MemError::Unmapped { addr: 0x100 }));
        map.mount(h, 0x10, 0x108).unwrap();
        assert!(map.read8(0x117).is_ok());
    }

    #[test]
    fn error_messages() {
        let e = MemError::UnsupportedWidth { addr: 0x00700000, width: AccessWidth::Word };
        assert_eq!(e.to_string(), "16-bit access to 00700000 not supported by its region");
        assert_eq!(e.addr(), 0x0070_0000);
        assert_eq!(MemError::Unmapped { addr: 0x20 }.to_string(), "unmapped address 00000020");
    }
}
