//! The 16-bit trace flag word.
//!
//! The word is split into two bytes that are never touched by the same memory access:
//!
//! * the *flags byte* holds the low-order bits 0-7: per-epoch tag bits and short-lived markers,
//!   written on hot paths by threads crossing instrumented sites;
//! * the *meta byte* holds the high-order bits 8-15: longer-lived classification bits.
//!
//! Each byte is its own atomic cell, so a read-modify-write of one byte can never lose an
//! update made concurrently to the other byte. Which storage index holds which byte depends on
//! the target endianness; [`FLAGS_BYTE_OFFSET`] and [`META_BYTE_OFFSET`] hide that from callers,
//! including code generators that emit single-byte loads and stores against the word.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// The value of a freshly constructed flag word: bits 8 and 9 set, meaning that the object has
/// not been tagged in either epoch.
pub const CLEARED_EPOCH_BITS: u16 = 512 | 256;

/// Shift from the word to its meta byte.
pub const META_SHIFT: u32 = 8;

/// Storage offset of the flags byte (the low-order byte) within the word.
#[cfg(target_endian = "little")]
pub const FLAGS_BYTE_OFFSET: usize = 0;
/// Storage offset of the flags byte (the low-order byte) within the word.
#[cfg(target_endian = "big")]
pub const FLAGS_BYTE_OFFSET: usize = 1;

/// Storage offset of the meta byte (the high-order byte) within the word.
pub const META_BYTE_OFFSET: usize = 1 - FLAGS_BYTE_OFFSET;

// Plain loads and stores: the flag word promises byte isolation, nothing more.
const ORDER: Ordering = Ordering::Relaxed;

/// A 16-bit flag word made of two independently addressable bytes.
///
/// All accessors take `&self`: tagging is an out-of-band annotation on otherwise immutable
/// runtime metadata.
#[repr(C, align(2))]
pub struct TraceFlag {
    bytes: [AtomicU8; 2],
}

static_assertions::assert_eq_size!(TraceFlag, u16);
static_assertions::assert_eq_align!(TraceFlag, u16);

impl TraceFlag {
    /// A flag word in the cleared state, [`CLEARED_EPOCH_BITS`].
    pub const fn new() -> Self {
        Self::with_flags(CLEARED_EPOCH_BITS)
    }

    /// A flag word holding `flags`.
    pub const fn with_flags(flags: u16) -> Self {
        let bytes = flags.to_ne_bytes();
        TraceFlag {
            bytes: [AtomicU8::new(bytes[0]), AtomicU8::new(bytes[1])],
        }
    }

    /// Are all the bits in `mask` set?
    #[inline(always)]
    pub fn is_set(&self, mask: u16) -> bool {
        self.flags() & mask == mask
    }

    /// The whole value. The two bytes are loaded separately, so the result may combine a
    /// flags byte and a meta byte that were never stored together.
    #[inline(always)]
    pub fn flags(&self) -> u16 {
        u16::from_ne_bytes([self.bytes[0].load(ORDER), self.bytes[1].load(ORDER)])
    }

    /// Overwrite the whole value.
    ///
    /// This stores both bytes and is not byte-isolated: a concurrent single-byte update may be
    /// lost. Only use it when no other writer can be active, e.g. at construction or during an
    /// exclusive rotation pass.
    #[inline(always)]
    pub fn set_flags(&self, flags: u16) {
        let bytes = flags.to_ne_bytes();
        self.bytes[0].store(bytes[0], ORDER);
        self.bytes[1].store(bytes[1], ORDER);
    }

    /// The cell of the flags byte (bits 0-7).
    #[inline(always)]
    pub fn flags_byte(&self) -> &AtomicU8 {
        &self.bytes[FLAGS_BYTE_OFFSET]
    }

    /// The cell of the meta byte (bits 8-15).
    #[inline(always)]
    pub fn meta_byte(&self) -> &AtomicU8 {
        &self.bytes[META_BYTE_OFFSET]
    }

    #[inline(always)]
    pub fn read_flags_byte(&self) -> u8 {
        self.flags_byte().load(ORDER)
    }

    #[inline(always)]
    pub fn write_flags_byte(&self, value: u8) {
        self.flags_byte().store(value, ORDER)
    }

    #[inline(always)]
    pub fn read_meta_byte(&self) -> u8 {
        self.meta_byte().load(ORDER)
    }

    #[inline(always)]
    pub fn write_meta_byte(&self, value: u8) {
        self.meta_byte().store(value, ORDER)
    }

    /// Set `bits` in the flags byte. Returns the previous flags byte.
    #[inline(always)]
    pub fn set_flags_bits(&self, bits: u8) -> u8 {
        self.flags_byte().fetch_or(bits, ORDER)
    }

    /// Clear `bits` in the flags byte. Returns the previous flags byte.
    #[inline(always)]
    pub fn clear_flags_bits(&self, bits: u8) -> u8 {
        self.flags_byte().fetch_and(!bits, ORDER)
    }

    /// Set `bits` in the meta byte. Returns the previous meta byte.
    #[inline(always)]
    pub fn set_meta_bits(&self, bits: u8) -> u8 {
        self.meta_byte().fetch_or(bits, ORDER)
    }

    /// Clear `bits` in the meta byte. Returns the previous meta byte.
    #[inline(always)]
    pub fn clear_meta_bits(&self, bits: u8) -> u8 {
        self.meta_byte().fetch_and(!bits, ORDER)
    }
}

impl Default for TraceFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TraceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TraceFlag(meta=0x{:02x}, flags=0x{:02x})",
            self.read_meta_byte(),
            self.read_flags_byte()
        )
    }
}

/// The flags byte of a whole word value.
pub const fn flags_byte_of(flags: u16) -> u8 {
    (flags & 0xff) as u8
}

/// The meta byte of a whole word value.
pub const fn meta_byte_of(flags: u16) -> u8 {
    (flags >> META_SHIFT) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn byte_at(flag: &TraceFlag, offset: usize) -> u8 {
        // Read the storage directly, the way emitted machine code would.
        let base = flag as *const TraceFlag as *const u8;
        unsafe { *base.add(offset) }
    }

    #[test]
    fn initial_value_is_cleared() {
        let flag = TraceFlag::new();
        assert_eq!(flag.flags(), 768);
        assert_eq!(flag.read_meta_byte(), 3);
        assert_eq!(flag.read_flags_byte(), 0);
        assert_eq!(TraceFlag::default().flags(), CLEARED_EPOCH_BITS);
    }

    #[test]
    fn round_trip_all_values() {
        let flag = TraceFlag::new();
        for v in 0..=u16::MAX {
            flag.set_flags(v);
            assert_eq!(flag.flags(), v);
        }
    }

    #[test]
    fn is_set_requires_all_bits() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let flag = TraceFlag::new();
        for _ in 0..10_000 {
            let v: u16 = rng.random();
            let m: u16 = rng.random();
            flag.set_flags(v);
            assert_eq!(flag.is_set(m), (flag.flags() & m) == m);
        }
    }

    #[test]
    fn byte_offsets_are_distinct_and_reconstruct_value() {
        assert_ne!(FLAGS_BYTE_OFFSET, META_BYTE_OFFSET);
        let flag = TraceFlag::with_flags(0xa55a);
        let base = &flag as *const TraceFlag as usize;
        assert_eq!(flag.flags_byte().as_ptr() as usize - base, FLAGS_BYTE_OFFSET);
        assert_eq!(flag.meta_byte().as_ptr() as usize - base, META_BYTE_OFFSET);

        let lo = byte_at(&flag, FLAGS_BYTE_OFFSET) as u16;
        let hi = byte_at(&flag, META_BYTE_OFFSET) as u16;
        assert_eq!(lo | (hi << 8), flag.flags());
        #[cfg(target_endian = "little")]
        assert_eq!(lo | (hi << 8), u16::from_le_bytes([byte_at(&flag, 0), byte_at(&flag, 1)]));
        #[cfg(target_endian = "big")]
        assert_eq!(lo | (hi << 8), u16::from_be_bytes([byte_at(&flag, 0), byte_at(&flag, 1)]));
    }

    #[test]
    fn flags_byte_writes_leave_meta_alone() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let flag = TraceFlag::new();
        for _ in 0..10_000 {
            let v: u16 = rng.random();
            let b: u8 = rng.random();
            flag.set_flags(v);
            flag.write_flags_byte(b);
            assert_eq!(meta_byte_of(flag.flags()), meta_byte_of(v));
            assert_eq!(flags_byte_of(flag.flags()), b);
        }
    }

    #[test]
    fn meta_byte_writes_leave_flags_alone() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let flag = TraceFlag::new();
        for _ in 0..10_000 {
            let v: u16 = rng.random();
            let b: u8 = rng.random();
            flag.set_flags(v);
            flag.write_meta_byte(b);
            assert_eq!(flags_byte_of(flag.flags()), flags_byte_of(v));
            assert_eq!(meta_byte_of(flag.flags()), b);
        }
    }

    #[test]
    fn tag_epoch_zero_through_flags_byte() {
        let flag = TraceFlag::new();
        let old = flag.read_flags_byte();
        flag.write_flags_byte(old | 1);
        assert_eq!(flag.read_meta_byte(), (768u16 >> 8) as u8);
        assert_eq!(flag.read_meta_byte(), 3);
        assert!(flag.is_set(1));
        assert!(!flag.is_set(2));
    }

    #[test]
    fn bit_updates_return_previous_byte() {
        let flag = TraceFlag::new();
        assert_eq!(flag.set_flags_bits(0b101), 0);
        assert_eq!(flag.clear_flags_bits(0b001), 0b101);
        assert_eq!(flag.read_flags_byte(), 0b100);
        assert_eq!(flag.clear_meta_bits(0b01), 0b11);
        assert_eq!(flag.set_meta_bits(0b100), 0b10);
        assert_eq!(flag.flags(), 0b110_0000_0100);
    }

    #[test]
    fn concurrent_byte_updates_are_isolated() {
        let flag = TraceFlag::new();
        crossbeam::scope(|s| {
            s.spawn(|_| {
                for i in 0..100_000u32 {
                    if i % 2 == 0 {
                        flag.set_flags_bits(1);
                    } else {
                        flag.clear_flags_bits(1);
                    }
                }
            });
            s.spawn(|_| {
                for _ in 0..100_000 {
                    assert_eq!(flag.read_meta_byte() & 0b11, 0b11);
                    flag.set_meta_bits(0b100);
                }
            });
        })
        .unwrap();
        assert_eq!(flag.read_meta_byte(), 0b111);
        assert_eq!(flag.read_flags_byte(), 0);
    }

    #[test]
    fn concurrent_whole_word_writes_are_not_atomic() {
        // Whole-word writes are two byte stores. Racing writers leave either one of the written
        // values, or a mix of one writer's flags byte with the other writer's meta byte. Any of
        // those outcomes is allowed; nothing else is.
        const A: u16 = 0x1234;
        const B: u16 = 0xabcd;
        let flag = TraceFlag::new();
        crossbeam::scope(|s| {
            s.spawn(|_| {
                for _ in 0..10_000 {
                    flag.set_flags(A)
                }
            });
            s.spawn(|_| {
                for _ in 0..10_000 {
                    flag.set_flags(B)
                }
            });
        })
        .unwrap();
        let result = flag.flags();
        let mixed = [(A & 0xff) | (B & 0xff00), (B & 0xff) | (A & 0xff00)];
        assert!(
            result == A || result == B || mixed.contains(&result),
            "unexpected value 0x{:x}",
            result
        );
    }
}
