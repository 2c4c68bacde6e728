use bitfield_struct::bitfield;
use inspector_addresses::PhysicalAddress;

/// A raw 64-bit leaf translation entry in its bitfield form.
///
/// Bit positions follow the hardware encoding that the mirrored table copies
/// verbatim from the target's real page table. Only a handful of bits matter
/// for inspection; the rest are modeled so the full word round-trips.
///
/// ### Bit layout
///
/// | Bits  | Name              | Meaning |
/// |-------|-------------------|----------|
/// | 0     | `present`         | Valid translation if set |
/// | 1     | `writable`        | Writes allowed |
/// | 2     | `user_access`     | User-mode accessible |
/// | 3     | `write_through`   | Write-through caching |
/// | 4     | `cache_disabled`  | Caching bypassed |
/// | 5     | `accessed`        | Set by hardware on first access ("young") |
/// | 6     | `dirty`           | Set by hardware on first write |
/// | 7     | `large_page`      | Large-page flag (always 0 at the leaf level) |
/// | 8     | `global_translation` | Survives address-space switches |
/// | 9–11  | OS available      | Ignored here |
/// | 12–45 | frame base        | Physical frame bits `[45:12]` |
/// | 46–62 | OS / reserved     | Ignored here |
/// | 63    | `no_execute`      | Instruction fetch disallowed |
///
/// The frame field spans bits `[12,46)`: reconstructing the physical address
/// as `frame << 12` is exactly "mask the raw value to 46 significant bits,
/// then align down to a 4 KiB boundary". A decoded physical address is
/// therefore always page-aligned.
///
/// ### Example
/// ```rust
/// # use inspector_pagetable::LeafEntryBits;
/// let e = LeafEntryBits::from(0x1067u64);
/// assert!(e.present() && e.writable() && e.user_access());
/// assert!(e.accessed() && e.dirty());
/// assert_eq!(e.physical_address().as_u64(), 0x1000);
/// ```
#[bitfield(u64)]
pub struct LeafEntryBits {
    /// Present (bit 0). Clear means the slot translates nothing.
    pub present: bool,

    /// Writable (bit 1).
    pub writable: bool,

    /// User/Supervisor (bit 2). Set allows user-mode access.
    pub user_access: bool,

    /// Page Write-Through (bit 3).
    pub write_through: bool,

    /// Page Cache Disable (bit 4).
    pub cache_disabled: bool,

    /// Accessed (bit 5). Hardware sets this on first access; also known as
    /// the "young" bit.
    pub accessed: bool,

    /// Dirty (bit 6). Hardware sets this on first write.
    pub dirty: bool,

    /// Page Size (bit 7). Leaf entries in a 4 KiB tree keep this clear.
    pub large_page: bool,

    /// Global (bit 8).
    pub global_translation: bool,

    /// OS-available (bits 9..=11). Not interpreted by the walker.
    #[bits(3)]
    pub os_available: u8,

    /// Physical frame bits `[45:12]` (bits 12..=45).
    #[bits(34)]
    frame_bits_45_12: u64,

    /// OS-available / reserved (bits 46..=62). Not interpreted by the walker.
    #[bits(17)]
    pub os_available_high: u32,

    /// No-Execute (bit 63).
    pub no_execute: bool,
}

impl LeafEntryBits {
    /// The page-aligned physical frame base encoded in this entry.
    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame_bits_45_12() << 12)
    }

    /// Store a frame base. Bits outside `[12,46)` of `phys` are discarded.
    #[inline]
    pub const fn set_physical_address(&mut self, phys: PhysicalAddress) {
        self.set_frame_bits_45_12((phys.as_u64() >> 12) & ((1 << 34) - 1));
    }

    /// Builder-style variant of [`set_physical_address`](Self::set_physical_address).
    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, phys: PhysicalAddress) -> Self {
        self.set_physical_address(phys);
        self
    }
}
