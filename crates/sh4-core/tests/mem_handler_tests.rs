use std::sync::{Arc, Mutex};

use sh4_core::{AccessWidth, MemError, MemHandlers, MemoryMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read(u32, u32),
    Write(u32, u32, u32),
}

type Log = Arc<Mutex<Vec<Access>>>;

fn recording_handlers(log: &Log) -> MemHandlers {
    let (r8, r16, r32) = (log.clone(), log.clone(), log.clone());
    let (w8, w16, w32) = (log.clone(), log.clone(), log.clone());
    MemHandlers::new()
        .with_read8(move |offset| {
            r8.lock().unwrap().push(Access::Read(8, offset));
            (offset & 0xFF) as u8
        })
        .with_read16(move |offset| {
            r16.lock().unwrap().push(Access::Read(16, offset));
            (offset & 0xFFFF) as u16
        })
        .with_read32(move |offset| {
            r32.lock().unwrap().push(Access::Read(32, offset));
            offset
        })
        .with_write8(move |offset, v| w8.lock().unwrap().push(Access::Write(8, offset, v as u32)))
        .with_write16(move |offset, v| w16.lock().unwrap().push(Access::Write(16, offset, v as u32)))
        .with_write32(move |offset, v| w32.lock().unwrap().push(Access::Write(32, offset, v)))
}

#[test]
fn dispatch_passes_region_offset() {
    let log: Log = Arc::default();
    let mut map = MemoryMap::new();
    let h = map.allocate(0x1000, 0x100, recording_handlers(&log)).unwrap();
    map.mount(h, 0x100, 0x1000).unwrap();

    assert_eq!(map.read32(0x1050), Ok(0x50));
    assert_eq!(map.read16(0x1050), Ok(0x50));
    assert_eq!(map.read8(0x10FF), Ok(0xFF));
    map.write8(0x1001, 0xAA).unwrap();
    map.write16(0x1002, 0xBBBB).unwrap();
    map.write32(0x1004, 0xCCCC_CCCC).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        [
            Access::Read(32, 0x50),
            Access::Read(16, 0x50),
            Access::Read(8, 0xFF),
            Access::Write(8, 0x01, 0xAA),
            Access::Write(16, 0x02, 0xBBBB),
            Access::Write(32, 0x04, 0xCCCC_CCCC),
        ]
    );
}

#[test]
fn unmounted_address_is_a_dispatch_miss() {
    let log: Log = Arc::default();
    let mut map = MemoryMap::new();
    let h = map.allocate(0x1000, 0x100, recording_handlers(&log)).unwrap();
    map.mount(h, 0x100, 0x1000).unwrap();

    let err = map.read32(0x2000).unwrap_err();
    assert_eq!(err, MemError::Unmapped { addr: 0x2000 });
    assert!(err.is_access_fault());
    assert_eq!(map.read8(0x0FFF), Err(MemError::Unmapped { addr: 0x0FFF }));
    assert_eq!(map.write16(0x1100, 0), Err(MemError::Unmapped { addr: 0x1100 }));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn allocation_alone_maps_nothing() {
    let log: Log = Arc::default();
    let mut map = MemoryMap::new();
    map.allocate(0x1000, 0x100, recording_handlers(&log)).unwrap();
    assert_eq!(map.read8(0x1000), Err(MemError::Unmapped { addr: 0x1000 }));
}

#[test]
fn mirrors_dispatch_to_the_same_handlers() {
    let log: Log = Arc::default();
    let mut map = MemoryMap::new();
    let h = map.allocate(0x0070_0000, 0x8000, recording_handlers(&log)).unwrap();
    for base in [0x0070_0000, 0x8070_0000, 0xA070_0000] {
        map.mount(h, 0x8000, base).unwrap();
    }

    for base in [0x0070_0000u32, 0x8070_0000, 0xA070_0000] {
        assert_eq!(map.read32(base + 0x2C00), Ok(0x2C00));
    }
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[test]
fn width_mismatch_is_its_own_fault() {
    let mut map = MemoryMap::new();
    let h = map
        .allocate(0x0500_0000, 0x10, MemHandlers::new().with_read32(|_| 0).with_write32(|_, _| ()))
        .unwrap();
    map.mount(h, 0x10, 0x0500_0000).unwrap();

    let err = map.write8(0x0500_0004, 1).unwrap_err();
    assert_eq!(
        err,
        MemError::UnsupportedWidth { addr: 0x0500_0004, width: AccessWidth::Byte }
    );
    assert!(err.is_access_fault());
    assert_ne!(err, MemError::Unmapped { addr: 0x0500_0004 });
}

#[test]
fn shared_map_dispatches_from_many_threads() {
    let buf = Arc::new(Mutex::new(vec![0u8; 0x1000]));
    let mut map = MemoryMap::new();
    let h = map.allocate(0, 0x1000, MemHandlers::buffer(buf.clone())).unwrap();
    map.mount(h, 0x1000, 0x0C00_0000).unwrap();
    let map = Arc::new(map);

    let threads: Vec<_> = (0..4u32)
        .map(|t| {
            let map = map.clone();
            std::thread::spawn(move || {
                for i in 0..64u32 {
                    let addr = 0x0C00_0000 + t * 0x400 + i * 4;
                    map.write32(addr, t << 16 | i).unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(map.read32(0x0C00_0C00 + 63 * 4), Ok(3 << 16 | 63));
    assert_eq!(buf.lock().unwrap()[0x400], 0);
    assert_eq!(buf.lock().unwrap()[0x402], 1);
}
