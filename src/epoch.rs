//! The epoch convention.
//!
//! Recording is divided into epochs that alternate between [`Epoch::Zero`] and [`Epoch::One`].
//! Tags for the current epoch go to the current half of each per-epoch bit pair, while a
//! rotation pass reads and clears the other half that belongs to the epoch just finished. The
//! epoch is process-wide state, not per-object state: flipping it retargets every subsequent
//! tag without rewriting any flag word.

use atomic::Atomic;
use bytemuck::NoUninit;
use enum_map::Enum;
use probe::probe;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// One of the two alternating recording epochs.
#[repr(u8)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, NoUninit, Enum, strum_macros::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Epoch {
    #[strum(serialize = "zero", serialize = "0")]
    Zero = 0,
    #[strum(serialize = "one", serialize = "1")]
    One = 1,
}

impl Epoch {
    /// The epoch that is not `self`.
    pub const fn other(self) -> Epoch {
        match self {
            Epoch::Zero => Epoch::One,
            Epoch::One => Epoch::Zero,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch {}", self.as_u8())
    }
}

/// Epoch state shared by instrumentation sites and the rotation thread.
///
/// A rotation is bracketed by [`TraceIdEpoch::begin_epoch_shift`] and
/// [`TraceIdEpoch::end_epoch_shift`]. Between the two, the state is *synchronizing*: tagging
/// threads still target the old epoch, and the recorder is expected to have brought them to a
/// stop before ending the shift.
#[derive(Debug)]
pub struct TraceIdEpoch {
    epoch: Atomic<Epoch>,
    synchronizing: AtomicBool,
    generation: AtomicU16,
    changed_tag_state: AtomicBool,
    method_tracer_tag_state: AtomicBool,
}

impl TraceIdEpoch {
    pub fn new(initial: Epoch) -> Self {
        TraceIdEpoch {
            epoch: Atomic::new(initial),
            synchronizing: AtomicBool::new(false),
            generation: AtomicU16::new(0),
            changed_tag_state: AtomicBool::new(false),
            method_tracer_tag_state: AtomicBool::new(false),
        }
    }

    #[inline(always)]
    pub fn current(&self) -> Epoch {
        self.epoch.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn previous(&self) -> Epoch {
        self.current().other()
    }

    pub fn is_synchronizing(&self) -> bool {
        self.synchronizing.load(Ordering::Acquire)
    }

    /// Number of completed epoch shifts, wrapping.
    pub fn generation(&self) -> u16 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn begin_epoch_shift(&self) {
        let was_synchronizing = self.synchronizing.swap(true, Ordering::SeqCst);
        assert!(!was_synchronizing, "An epoch shift is already in progress");
        trace!("Begin shift from {}", self.current());
    }

    pub fn end_epoch_shift(&self) {
        assert!(
            self.is_synchronizing(),
            "end_epoch_shift() called without begin_epoch_shift()"
        );
        let new_epoch = self.previous();
        self.epoch.store(new_epoch, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        self.synchronizing.store(false, Ordering::SeqCst);
        probe!(tracetag, epoch_shift, new_epoch.as_u8(), generation);
        debug!("Shifted to {} (generation {})", new_epoch, generation);
    }

    /// Was any object newly tagged since the last call? Reading resets the state.
    pub fn has_changed_tag_state(&self) -> bool {
        self.changed_tag_state.swap(false, Ordering::AcqRel)
    }

    pub fn set_changed_tag_state(&self) {
        self.changed_tag_state.store(true, Ordering::Release)
    }

    pub fn has_method_tracer_changed_tag_state(&self) -> bool {
        self.method_tracer_tag_state.load(Ordering::Acquire)
    }

    /// The method tracer has instrumented classes whose tags must survive rotations.
    pub fn set_method_tracer_tag_state(&self) {
        self.method_tracer_tag_state.store(true, Ordering::Release);
        self.set_changed_tag_state();
    }

    pub fn reset_method_tracer_tag_state(&self) {
        self.method_tracer_tag_state.store(false, Ordering::Release)
    }
}

impl Default for TraceIdEpoch {
    fn default() -> Self {
        Self::new(Epoch::Zero)
    }
}
