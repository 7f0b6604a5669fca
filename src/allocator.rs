//! The identifier allocator boundary.
//!
//! Which identifier an object gets, and what happens to it when the object is unloaded or
//! restored from an archived image, is decided by a [`TraceIdAllocator`]. The lifecycle hooks
//! here only call the allocator and store what it returns.

use crate::extension::Traceable;
use crate::trace_flag::CLEARED_EPOCH_BITS;
use crate::trace_id::{TraceId, UNASSIGNED_TRACE_ID};
use crate::util::options::Options;
use std::sync::atomic::{AtomicU64, Ordering};

/// Assigns, removes and restores trace identifiers.
pub trait TraceIdAllocator: Send + Sync {
    /// The identifier of a newly created object.
    fn assign(&self, object: &dyn Traceable) -> TraceId;
    /// The identifier an object keeps once it is unloaded (or stripped for archiving).
    fn remove(&self, object: &dyn Traceable) -> TraceId;
    /// The identifier of an object restored from an archived image.
    fn restore(&self, object: &dyn Traceable) -> TraceId;
}

/// Object creation hook.
pub fn init_id<A: TraceIdAllocator + ?Sized>(allocator: &A, object: &dyn Traceable) {
    object.set_trace_id(allocator.assign(object));
}

/// Object unloading hook.
pub fn remove_id<A: TraceIdAllocator + ?Sized>(allocator: &A, object: &dyn Traceable) {
    object.set_trace_id(allocator.remove(object));
}

/// Object restoration hook.
pub fn restore_id<A: TraceIdAllocator + ?Sized>(allocator: &A, object: &dyn Traceable) {
    object.set_trace_id(allocator.restore(object));
}

/// Method id numbers are 16 bits wide, class identifiers keep at least that many low bits free.
pub const MIN_TRACE_ID_SHIFT: u32 = u16::BITS;

/// The identifier of a method: its holder's identifier combined with the method's id number.
pub fn method_id(holder_id: TraceId, method_idnum: u16) -> TraceId {
    debug_assert_eq!(holder_id & (u16::MAX as TraceId), 0);
    holder_id | method_idnum as TraceId
}

/// Number of identifiers reserved below the first regular one for primitive classes.
pub const PRIMITIVE_CLASS_IDS: u64 = 9;

/// Hands out increasing class identifiers, shifted so that the low bits are free for the method
/// id numbers of the class's methods.
#[derive(Debug)]
pub struct SequentialTraceIdAllocator {
    shift: u32,
    next_class: AtomicU64,
    next_primitive: AtomicU64,
}

impl SequentialTraceIdAllocator {
    pub fn new(shift: u32, first_class_id: u64) -> Self {
        assert!(
            (MIN_TRACE_ID_SHIFT..64).contains(&shift),
            "trace id shift {} is out of range",
            shift
        );
        assert!(
            first_class_id > PRIMITIVE_CLASS_IDS,
            "class ids must start above the {} primitive ids",
            PRIMITIVE_CLASS_IDS
        );
        SequentialTraceIdAllocator {
            shift,
            next_class: AtomicU64::new(first_class_id),
            next_primitive: AtomicU64::new(1),
        }
    }

    pub fn from_options(options: &Options) -> Self {
        Self::new(options.trace_id_shift, options.first_class_id)
    }

    pub fn next_class_id(&self) -> TraceId {
        self.next_class.fetch_add(1, Ordering::Relaxed) << self.shift
    }

    /// A reserved identifier for a primitive class.
    pub fn assign_primitive_class_id(&self) -> TraceId {
        let id = self.next_primitive.fetch_add(1, Ordering::Relaxed);
        assert!(
            id <= PRIMITIVE_CLASS_IDS,
            "more than {} primitive classes",
            PRIMITIVE_CLASS_IDS
        );
        id << self.shift
    }

    pub fn method_id(&self, holder_id: TraceId, method_idnum: u16) -> TraceId {
        debug_assert_eq!(holder_id & self.low_mask(), 0);
        method_id(holder_id, method_idnum)
    }

    /// The holder identifier a method identifier was composed from.
    pub fn holder_id(&self, method_id: TraceId) -> TraceId {
        method_id & !self.low_mask()
    }

    fn low_mask(&self) -> u64 {
        (1u64 << self.shift) - 1
    }
}

impl Default for SequentialTraceIdAllocator {
    fn default() -> Self {
        Self::from_options(&Options::default())
    }
}

impl TraceIdAllocator for SequentialTraceIdAllocator {
    fn assign(&self, _object: &dyn Traceable) -> TraceId {
        self.next_class_id()
    }

    fn remove(&self, object: &dyn Traceable) -> TraceId {
        object.set_trace_flags(CLEARED_EPOCH_BITS);
        UNASSIGNED_TRACE_ID
    }

    fn restore(&self, object: &dyn Traceable) -> TraceId {
        object.set_trace_flags(CLEARED_EPOCH_BITS);
        self.next_class_id()
    }
}
