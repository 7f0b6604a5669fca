//! Epoch-aware tagging of traceable objects.
//!
//! Every operation here touches exactly one byte of a flag word per memory access: per-epoch
//! tag bits live in the flags byte, markers live in the meta byte. Operations that update both
//! bytes do so with two separate single-byte read-modify-writes, and readers must not expect to
//! observe both updates together.

use crate::epoch::{Epoch, TraceIdEpoch};
use crate::extension::Traceable;
use crate::tag_bits::{LayoutError, TagBits};
use crate::util::options::Options;
use delegate::delegate;
use std::sync::atomic::Ordering;

/// Tags objects for the current epoch and clears them for the previous one.
#[derive(Debug)]
pub struct TraceTagger {
    bits: TagBits,
    epoch: TraceIdEpoch,
}

impl TraceTagger {
    pub fn new(bits: TagBits, initial: Epoch) -> Result<Self, LayoutError> {
        Ok(TraceTagger {
            bits: bits.validate()?,
            epoch: TraceIdEpoch::new(initial),
        })
    }

    pub fn from_options(bits: TagBits, options: &Options) -> Result<Self, LayoutError> {
        Self::new(bits, options.initial_epoch)
    }

    pub fn bits(&self) -> &TagBits {
        &self.bits
    }

    pub fn epoch(&self) -> &TraceIdEpoch {
        &self.epoch
    }

    delegate! {
        to self.epoch {
            pub fn current(&self) -> Epoch;
            pub fn previous(&self) -> Epoch;
            pub fn is_synchronizing(&self) -> bool;
            pub fn generation(&self) -> u16;
            pub fn begin_epoch_shift(&self);
            pub fn has_changed_tag_state(&self) -> bool;
            pub fn set_changed_tag_state(&self);
        }
    }

    pub fn end_epoch_shift(&self) {
        #[cfg(feature = "extreme_assertions")]
        assert!(self.bits.clone().validate().is_ok());
        self.epoch.end_epoch_shift()
    }

    /// Tag `object` as used in the current epoch.
    ///
    /// Returns `true` if this call tagged the object, i.e. it was not yet tagged in this epoch.
    /// The caller uses that to enqueue the object exactly once per epoch.
    #[inline(always)]
    pub fn tag<T: Traceable + ?Sized>(&self, object: &T) -> bool {
        let epoch = self.current();
        self.tag_bits(object, self.bits.used[epoch], epoch)
    }

    /// Tag `method` and its `holder` as having a method used in the current epoch.
    ///
    /// Returns `true` if this call tagged the method.
    pub fn tag_method<C, M>(&self, holder: &C, method: &M) -> bool
    where
        C: Traceable + ?Sized,
        M: Traceable + ?Sized,
    {
        let epoch = self.current();
        let bit = self.bits.method_used[epoch];
        let tagged = self.tag_bits(method, bit, epoch);
        if tagged {
            self.tag_bits(holder, bit, epoch);
        }
        tagged
    }

    #[inline(always)]
    fn tag_bits<T: Traceable + ?Sized>(&self, object: &T, bit: u8, epoch: Epoch) -> bool {
        let flags = object.trace_flags_byte();
        // Cheap check first, most objects are already tagged.
        if flags.load(Ordering::Relaxed) & bit != 0 {
            return false;
        }
        let old = flags.fetch_or(bit, Ordering::Relaxed);
        if old & bit != 0 {
            return false;
        }
        object
            .trace_meta_byte()
            .fetch_and(!self.bits.cleared[epoch], Ordering::Relaxed);
        self.set_changed_tag_state();
        true
    }

    pub fn is_used_this_epoch<T: Traceable + ?Sized>(&self, object: &T) -> bool {
        self.is_flags_bit_set(object, self.bits.used[self.current()])
    }

    pub fn is_used_previous_epoch<T: Traceable + ?Sized>(&self, object: &T) -> bool {
        self.is_flags_bit_set(object, self.bits.used[self.previous()])
    }

    pub fn is_method_used_this_epoch<T: Traceable + ?Sized>(&self, object: &T) -> bool {
        self.is_flags_bit_set(object, self.bits.method_used[self.current()])
    }

    pub fn is_method_used_previous_epoch<T: Traceable + ?Sized>(&self, object: &T) -> bool {
        self.is_flags_bit_set(object, self.bits.method_used[self.previous()])
    }

    /// Have `epoch`'s bits of `object` been cleared since it was last tagged in that epoch?
    pub fn is_epoch_cleared<T: Traceable + ?Sized>(&self, object: &T, epoch: Epoch) -> bool {
        self.is_meta_bit_set(object, self.bits.cleared[epoch])
    }

    /// Rotation pass over one object: clear the previous epoch's tag bits and mark the epoch as
    /// cleared.
    ///
    /// Returns whether the object had been used (directly or through a method) in that epoch.
    pub fn clear_previous_epoch<T: Traceable + ?Sized>(&self, object: &T) -> bool {
        let previous = self.previous();
        let mask = self.bits.used[previous] | self.bits.method_used[previous];
        let old = object
            .trace_flags_byte()
            .fetch_and(!mask, Ordering::Relaxed);
        object
            .trace_meta_byte()
            .fetch_or(self.bits.cleared[previous], Ordering::Relaxed);
        old & mask != 0
    }

    #[inline(always)]
    fn is_flags_bit_set<T: Traceable + ?Sized>(&self, object: &T, bit: u8) -> bool {
        object.trace_flags_byte().load(Ordering::Relaxed) & bit != 0
    }

    #[inline(always)]
    fn is_meta_bit_set<T: Traceable + ?Sized>(&self, object: &T, bit: u8) -> bool {
        object.trace_meta_byte().load(Ordering::Relaxed) & bit != 0
    }

    fn set_meta_bit<T: Traceable + ?Sized>(&self, object: &T, bit: u8) {
        object.trace_meta_byte().fetch_or(bit, Ordering::Relaxed);
    }

    fn clear_meta_bit<T: Traceable + ?Sized>(&self, object: &T, bit: u8) {
        object.trace_meta_byte().fetch_and(!bit, Ordering::Relaxed);
    }
}

// Set/clear/has accessors for each marker of the meta byte.
macro_rules! define_meta_markers {
    ($($field: ident: $set: ident, $clear: ident, $has: ident;)*) => {
        impl TraceTagger {
            $(
                pub fn $set<T: Traceable + ?Sized>(&self, object: &T) {
                    self.set_meta_bit(object, self.bits.$field)
                }

                pub fn $clear<T: Traceable + ?Sized>(&self, object: &T) {
                    self.clear_meta_bit(object, self.bits.$field)
                }

                pub fn $has<T: Traceable + ?Sized>(&self, object: &T) -> bool {
                    self.is_meta_bit_set(object, self.bits.$field)
                }
            )*
        }
    };
}

define_meta_markers! {
    leakp: set_leakp, clear_leakp, has_leakp;
    transient: set_transient, clear_transient, has_transient;
    serialized: set_serialized, clear_serialized, has_serialized;
    sticky: set_sticky, clear_sticky, has_sticky;
    timing: set_timing, clear_timing, has_timing;
}

impl Default for TraceTagger {
    fn default() -> Self {
        TraceTagger {
            bits: TagBits::default(),
            epoch: TraceIdEpoch::default(),
        }
    }
}
