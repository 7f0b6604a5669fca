//! The inline trace identifier.

use std::sync::atomic::{AtomicU64, Ordering};

/// A trace identifier. Zero means "unassigned".
pub type TraceId = u64;

/// The identifier value of an object that has not been assigned one.
pub const UNASSIGNED_TRACE_ID: TraceId = 0;

/// Storage for a [`TraceId`].
///
/// Reads are safe from any thread at any time. Writers are expected to be serialized by the
/// identifier allocator; the field does not enforce it.
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct TraceIdField(AtomicU64);

impl TraceIdField {
    /// Size in bytes of a stored identifier, for collaborators that lay out serialized records.
    pub const SIZE: usize = std::mem::size_of::<TraceId>();

    pub const fn new() -> Self {
        TraceIdField(AtomicU64::new(UNASSIGNED_TRACE_ID))
    }

    #[inline(always)]
    pub fn trace_id(&self) -> TraceId {
        self.0.load(Ordering::Relaxed)
    }

    /// The cell holding the identifier, for bulk readers that want to load it in place.
    #[inline(always)]
    pub fn trace_id_cell(&self) -> &AtomicU64 {
        &self.0
    }

    #[inline(always)]
    pub fn set_trace_id(&self, id: TraceId) {
        self.0.store(id, Ordering::Relaxed)
    }
}

static_assertions::assert_eq_size!(TraceIdField, TraceId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unassigned() {
        let field = TraceIdField::new();
        assert_eq!(field.trace_id(), UNASSIGNED_TRACE_ID);
        assert_eq!(TraceIdField::SIZE, 8);
    }

    #[test]
    fn cell_aliases_field() {
        let field = TraceIdField::new();
        field.set_trace_id(42 << 16);
        assert_eq!(field.trace_id_cell().load(Ordering::Relaxed), 42 << 16);
        field.trace_id_cell().store(7, Ordering::Relaxed);
        assert_eq!(field.trace_id(), 7);
    }
}
