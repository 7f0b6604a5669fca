//! The bit layout that gives the flag word its meaning.
//!
//! The flag word itself only guarantees byte isolation. Which bit of the flags byte marks
//! "used in epoch 0", which meta bit marks a sticky class, and so on, is decided by the recording
//! subsystem and handed to the tagger as a [`TagBits`]. Per-epoch bits come in pairs indexed by
//! [`Epoch`], so that flipping the epoch is enough to start tagging into the other half without
//! touching any object.

use crate::epoch::Epoch;
use crate::trace_flag::{meta_byte_of, CLEARED_EPOCH_BITS};
use enum_map::{enum_map, EnumMap};
use std::fmt;

/// A pair of bits, one per epoch.
pub type EpochBits = EnumMap<Epoch, u8>;

/// Bit assignments within the flags byte and the meta byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagBits {
    /// Flags byte: the object was used in the epoch.
    pub used: EpochBits,
    /// Flags byte: one of the object's methods (or the method itself) was used in the epoch.
    pub method_used: EpochBits,
    /// Meta byte: the epoch's bits of this object have been cleared since it was last used.
    pub cleared: EpochBits,
    /// Meta byte: the object is referenced by the leak profiler.
    pub leakp: u8,
    /// Meta byte: the object is about to be unloaded and was serialized on the way out.
    pub transient: u8,
    /// Meta byte: the object has been written to the current chunk.
    pub serialized: u8,
    /// Meta byte: the object is of interest to the method tracer across epochs.
    pub sticky: u8,
    /// Meta byte: the object carries timing instrumentation not yet published.
    pub timing: u8,
}

impl Default for TagBits {
    fn default() -> Self {
        TagBits {
            used: enum_map! { Epoch::Zero => 0x01, Epoch::One => 0x02 },
            method_used: enum_map! { Epoch::Zero => 0x04, Epoch::One => 0x08 },
            cleared: enum_map! { Epoch::Zero => 0x01, Epoch::One => 0x02 },
            leakp: 0x04,
            transient: 0x08,
            serialized: 0x10,
            sticky: 0x20,
            timing: 0x40,
        }
    }
}

/// Why a [`TagBits`] cannot be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// A role was given no bit.
    EmptyBit(&'static str),
    /// Two roles within the same byte share a bit.
    Overlap {
        first: &'static str,
        second: &'static str,
    },
    /// The cleared markers do not describe the initial value of a flag word.
    ClearedMarkers { expected: u8, found: u8 },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::EmptyBit(role) => write!(f, "tag bit '{}' is empty", role),
            LayoutError::Overlap { first, second } => {
                write!(f, "tag bits '{}' and '{}' overlap", first, second)
            }
            LayoutError::ClearedMarkers { expected, found } => write!(
                f,
                "cleared markers are 0x{:02x}, but a new flag word has meta byte 0x{:02x}",
                found, expected
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

impl TagBits {
    /// Check the layout and return it if it is usable.
    pub fn validate(self) -> Result<Self, LayoutError> {
        let flags_roles: [(&'static str, u8); 4] = [
            ("used_epoch_0", self.used[Epoch::Zero]),
            ("used_epoch_1", self.used[Epoch::One]),
            ("method_used_epoch_0", self.method_used[Epoch::Zero]),
            ("method_used_epoch_1", self.method_used[Epoch::One]),
        ];
        let meta_roles: [(&'static str, u8); 7] = [
            ("cleared_epoch_0", self.cleared[Epoch::Zero]),
            ("cleared_epoch_1", self.cleared[Epoch::One]),
            ("leakp", self.leakp),
            ("transient", self.transient),
            ("serialized", self.serialized),
            ("sticky", self.sticky),
            ("timing", self.timing),
        ];
        Self::check_disjoint(&flags_roles)?;
        Self::check_disjoint(&meta_roles)?;

        let expected = meta_byte_of(CLEARED_EPOCH_BITS);
        let found = self.cleared[Epoch::Zero] | self.cleared[Epoch::One];
        if found != expected {
            return Err(LayoutError::ClearedMarkers { expected, found });
        }
        Ok(self)
    }

    fn check_disjoint(roles: &[(&'static str, u8)]) -> Result<(), LayoutError> {
        for (i, &(name, bit)) in roles.iter().enumerate() {
            if bit == 0 {
                return Err(LayoutError::EmptyBit(name));
            }
            if let Some(&(other, _)) = roles[..i].iter().find(|(_, b)| b & bit != 0) {
                return Err(LayoutError::Overlap {
                    first: other,
                    second: name,
                });
            }
        }
        Ok(())
    }

    /// Both epochs' used bits, for clearing an object outright.
    pub fn all_used(&self) -> u8 {
        self.used[Epoch::Zero] | self.used[Epoch::One]
    }

    /// Both epochs' method-used bits.
    pub fn all_method_used(&self) -> u8 {
        self.method_used[Epoch::Zero] | self.method_used[Epoch::One]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_valid() {
        let bits = TagBits::default().validate().unwrap();
        assert_eq!(bits.all_used(), 0x03);
        assert_eq!(bits.all_method_used(), 0x0c);
        let cleared = (bits.cleared[Epoch::Zero] | bits.cleared[Epoch::One]) as u16;
        assert_eq!(cleared << 8, CLEARED_EPOCH_BITS);
    }

    #[test]
    fn empty_bit_is_rejected() {
        let bits = TagBits {
            timing: 0,
            ..TagBits::default()
        };
        assert_eq!(bits.validate(), Err(LayoutError::EmptyBit("timing")));
    }

    #[test]
    fn overlapping_epoch_pair_is_rejected() {
        let mut bits = TagBits::default();
        bits.used[Epoch::One] = bits.used[Epoch::Zero];
        assert_eq!(
            bits.validate(),
            Err(LayoutError::Overlap {
                first: "used_epoch_0",
                second: "used_epoch_1"
            })
        );
    }

    #[test]
    fn roles_in_different_bytes_may_share_positions() {
        // used (flags byte) and cleared (meta byte) both use 0x01 and 0x02 in the default layout.
        let bits = TagBits::default();
        assert_eq!(bits.used, bits.cleared);
        assert!(bits.validate().is_ok());
    }

    #[test]
    fn cleared_markers_must_match_initial_value() {
        let bits = TagBits {
            cleared: enum_map! { Epoch::Zero => 0x01, Epoch::One => 0x80 },
            ..TagBits::default()
        };
        let err = bits.validate().unwrap_err();
        assert_eq!(
            err,
            LayoutError::ClearedMarkers {
                expected: 0x03,
                found: 0x81
            }
        );
        assert!(err.to_string().contains("0x81"));
    }
}
