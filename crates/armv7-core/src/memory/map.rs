//! Fixed-capacity table of virtual-address windows over caller-owned buffers.

use std::fmt;

use crate::Fault;

/// Maximum number of windows a [`MemoryMap`] accepts.
pub const MAPPING_CAPACITY: usize = 16;

/// Validation applied by [`MemoryMap::add_mapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MappingPolicy {
    /// Accept any window; non-overlap and no-wrap are caller-enforced.
    #[default]
    Lenient,
    /// Reject windows that overlap an existing one or run past `0xFFFF_FFFF`.
    Strict,
}

/// One contiguous virtual window backed by a borrowed byte buffer.
pub struct Mapping<'a> {
    backing: &'a mut [u8],
    base: u32,
}

impl<'a> Mapping<'a> {
    /// Creates a window placing `backing[0]` at virtual address `base`.
    #[must_use]
    pub fn new(backing: &'a mut [u8], base: u32) -> Self {
        Self { backing, base }
    }

    /// Virtual address of the first backing byte.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Window length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.backing.len()
    }

    /// Returns `true` for a zero-length window, which never matches a lookup.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.backing.is_empty()
    }

    /// Exclusive end address, widened so that windows touching 2^32 do not wrap.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base as u64 + self.backing.len() as u64
    }

    /// Returns `true` when `[address, address + width)` lies inside this window.
    #[must_use]
    pub const fn covers(&self, address: u32, width: u32) -> bool {
        let start = address as u64;
        start >= self.base as u64 && start + width as u64 <= self.end()
    }

    fn overlaps(&self, base: u32, len: u64) -> bool {
        let start = u64::from(base);
        len != 0 && !self.is_empty() && start < self.end() && u64::from(self.base) < start + len
    }

    fn offset_of(&self, address: u32) -> usize {
        (address - self.base) as usize
    }
}

impl fmt::Debug for Mapping<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("base", &format_args!("{:#010x}", self.base))
            .field("len", &self.backing.len())
            .finish()
    }
}

/// Virtual-to-host translation table searched in insertion order.
///
/// Lookups are linear; the first window covering the whole access wins.
#[derive(Debug)]
pub struct MemoryMap<'a> {
    /// Windows in insertion order, valid up to `len`.
    slots: [Option<Mapping<'a>>; MAPPING_CAPACITY],
    len: usize,
    policy: MappingPolicy,
}

impl Default for MemoryMap<'_> {
    fn default() -> Self {
        Self::new(MappingPolicy::default())
    }
}

impl<'a> MemoryMap<'a> {
    /// Creates an empty table.
    #[must_use]
    pub fn new(policy: MappingPolicy) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            len: 0,
            policy,
        }
    }

    /// Validation policy applied to new windows.
    #[must_use]
    pub const fn policy(&self) -> MappingPolicy {
        self.policy
    }

    /// Number of registered windows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no window is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` when no further window can be added.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == MAPPING_CAPACITY
    }

    /// Registered windows in lookup order.
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping<'a>> {
        self.slots[..self.len].iter().flatten()
    }

    /// Registers `backing` at virtual address `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::CapacityExceeded`] when [`MAPPING_CAPACITY`] windows
    /// are already registered. Under [`MappingPolicy::Strict`] also returns
    /// [`Fault::AddressSpaceOverflow`] or [`Fault::MappingOverlap`].
    pub fn add_mapping(&mut self, backing: &'a mut [u8], address: u32) -> Result<(), Fault> {
        if self.is_full() {
            return Err(Fault::CapacityExceeded {
                capacity: MAPPING_CAPACITY,
            });
        }

        let len = backing.len() as u64;
        if self.policy == MappingPolicy::Strict {
            if u64::from(address) + len > 1 << 32 {
                return Err(Fault::AddressSpaceOverflow { address, len });
            }
            if self.mappings().any(|m| m.overlaps(address, len)) {
                return Err(Fault::MappingOverlap { address, len });
            }
        }

        tracing::debug!("Mapping added at {address:#010x} (+{len:#x})");
        self.slots[self.len] = Some(Mapping::new(backing, address));
        self.len += 1;
        Ok(())
    }

    /// Translates a host location inside some backing buffer to its virtual
    /// address.
    ///
    /// Returns `None` when `location` does not point into any registered
    /// buffer.
    #[must_use]
    pub fn translate_to_virtual(&self, location: *const u8) -> Option<u32> {
        self.mappings().find_map(|m| {
            let range = m.backing.as_ptr_range();
            if !range.contains(&location) {
                return None;
            }
            let offset = u32::try_from(location as usize - range.start as usize).ok()?;
            Some(m.base.wrapping_add(offset))
        })
    }

    fn find(&self, address: u32, width: u32) -> Result<usize, Fault> {
        self.mappings()
            .position(|m| m.covers(address, width))
            .ok_or_else(|| Self::unmapped(address, width))
    }

    fn unmapped(address: u32, width: u32) -> Fault {
        tracing::warn!("Invalid virtual address {address:#010x} ({width}-byte access)");
        Fault::UnmappedAddress { address, width }
    }

    /// Returns a shared view of `[address, address + width)`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when no single window covers the
    /// whole range.
    pub fn view(&self, address: u32, width: u32) -> Result<&[u8], Fault> {
        let index = self.find(address, width)?;
        let mapping = self.slots[index]
            .as_ref()
            .ok_or_else(|| Self::unmapped(address, width))?;
        let start = mapping.offset_of(address);
        Ok(&mapping.backing[start..start + width as usize])
    }

    /// Returns a mutable view of `[address, address + width)`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when no single window covers the
    /// whole range.
    pub fn resolve(&mut self, address: u32, width: u32) -> Result<&mut [u8], Fault> {
        let index = self.find(address, width)?;
        let mapping = self.slots[index]
            .as_mut()
            .ok_or_else(|| Self::unmapped(address, width))?;
        let start = mapping.offset_of(address);
        Ok(&mut mapping.backing[start..start + width as usize])
    }
}
