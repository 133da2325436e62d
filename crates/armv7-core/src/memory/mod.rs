//! Segmented virtual memory over caller-owned buffers.

/// Width-typed little-endian accessors.
pub mod access;
/// Mapping table and virtual/host translation.
pub mod map;

pub use access::{BYTE, HALFWORD, WORD};
pub use map::{Mapping, MappingPolicy, MemoryMap, MAPPING_CAPACITY};
