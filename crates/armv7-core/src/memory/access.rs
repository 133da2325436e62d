//! Little-endian width accessors layered on [`MemoryMap`] translation.

use crate::{Fault, MemoryMap};

/// Byte access width.
pub const BYTE: u32 = 1;
/// Halfword access width.
pub const HALFWORD: u32 = 2;
/// Word access width.
pub const WORD: u32 = 4;

impl MemoryMap<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn load<const N: usize>(&self, address: u32) -> Result<[u8; N], Fault> {
        let mut bytes = [0_u8; N];
        bytes.copy_from_slice(self.view(address, N as u32)?);
        Ok(bytes)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn store<const N: usize>(&mut self, address: u32, bytes: [u8; N]) -> Result<(), Fault> {
        self.resolve(address, N as u32)?.copy_from_slice(&bytes);
        Ok(())
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when `address` is not mapped.
    pub fn read_u8(&self, address: u32) -> Result<u8, Fault> {
        let [byte] = self.load::<1>(address)?;
        Ok(byte)
    }

    /// Reads a little-endian halfword.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when the two bytes are not covered
    /// by a single mapping.
    pub fn read_u16(&self, address: u32) -> Result<u16, Fault> {
        self.load(address).map(u16::from_le_bytes)
    }

    /// Reads a little-endian word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when the four bytes are not covered
    /// by a single mapping.
    pub fn read_u32(&self, address: u32) -> Result<u32, Fault> {
        self.load(address).map(u32::from_le_bytes)
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when `address` is not mapped.
    pub fn write_u8(&mut self, address: u32, value: u8) -> Result<(), Fault> {
        self.store(address, [value])
    }

    /// Writes a little-endian halfword.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when the two bytes are not covered
    /// by a single mapping.
    pub fn write_u16(&mut self, address: u32, value: u16) -> Result<(), Fault> {
        self.store(address, value.to_le_bytes())
    }

    /// Writes a little-endian word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when the four bytes are not covered
    /// by a single mapping.
    pub fn write_u32(&mut self, address: u32, value: u32) -> Result<(), Fault> {
        self.store(address, value.to_le_bytes())
    }
}
