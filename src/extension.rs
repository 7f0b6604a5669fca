//! The trace extension embedded in every traceable runtime metadata kind.
//!
//! A kind becomes traceable by embedding a [`TraceExtension`] by value and implementing
//! [`Traceable`], usually through `#[derive(Traceable)]`:
//!
//! ```ignore
//! #[derive(Traceable)]
//! struct ClassDescriptor {
//!     name: String,
//!     #[trace_extension]
//!     trace: TraceExtension,
//! }
//! ```
//!
//! Every accessor is a provided trait method that resolves statically to a field access, so
//! traceable kinds do not need a common base type and pay no dispatch cost.

use crate::trace_flag::{TraceFlag, FLAGS_BYTE_OFFSET, META_BYTE_OFFSET};
use crate::trace_id::{TraceId, TraceIdField};
use delegate::delegate;
use memoffset::offset_of;
use std::sync::atomic::{AtomicU64, AtomicU8};

/// The identifier field and the flag word of one traceable object.
#[repr(C)]
#[derive(Debug, Default)]
pub struct TraceExtension {
    id: TraceIdField,
    flags: TraceFlag,
}

impl TraceExtension {
    /// An unassigned identifier and a cleared flag word.
    pub const fn new() -> Self {
        TraceExtension {
            id: TraceIdField::new(),
            flags: TraceFlag::new(),
        }
    }

    pub fn id_field(&self) -> &TraceIdField {
        &self.id
    }

    pub fn flag_word(&self) -> &TraceFlag {
        &self.flags
    }

    delegate! {
        to self.id {
            pub fn trace_id(&self) -> TraceId;
            pub fn set_trace_id(&self, id: TraceId);
            pub fn trace_id_cell(&self) -> &AtomicU64;
        }
        to self.flags {
            #[call(is_set)]
            pub fn is_trace_flag_set(&self, mask: u16) -> bool;
            #[call(flags)]
            pub fn trace_flags(&self) -> u16;
            #[call(set_flags)]
            pub fn set_trace_flags(&self, flags: u16);
            #[call(flags_byte)]
            pub fn trace_flags_byte(&self) -> &AtomicU8;
            #[call(meta_byte)]
            pub fn trace_meta_byte(&self) -> &AtomicU8;
        }
    }

    /// Offset of the identifier within the extension.
    pub fn trace_id_offset() -> usize {
        offset_of!(TraceExtension, id)
    }

    /// Offset of the flag word within the extension.
    pub fn trace_flags_offset() -> usize {
        offset_of!(TraceExtension, flags)
    }

    /// Offset of the flags byte within the extension, for single-byte stores from compiled code.
    pub fn trace_flags_byte_offset() -> usize {
        Self::trace_flags_offset() + FLAGS_BYTE_OFFSET
    }

    /// Offset of the meta byte within the extension.
    pub fn trace_meta_byte_offset() -> usize {
        Self::trace_flags_offset() + META_BYTE_OFFSET
    }
}

/// A runtime metadata kind carrying a [`TraceExtension`].
pub trait Traceable {
    /// The embedded extension. This is the only method an implementation provides.
    fn trace_extension(&self) -> &TraceExtension;

    #[inline(always)]
    fn trace_id(&self) -> TraceId {
        self.trace_extension().trace_id()
    }

    #[inline(always)]
    fn trace_id_cell(&self) -> &AtomicU64 {
        self.trace_extension().trace_id_cell()
    }

    /// Store `id`. Callers are responsible for synchronization between writers.
    #[inline(always)]
    fn set_trace_id(&self, id: TraceId) {
        self.trace_extension().set_trace_id(id)
    }

    /// Size in bytes of the identifier, for serialized-record layout.
    fn trace_id_size() -> usize
    where
        Self: Sized,
    {
        TraceIdField::SIZE
    }

    #[inline(always)]
    fn is_trace_flag_set(&self, mask: u16) -> bool {
        self.trace_extension().is_trace_flag_set(mask)
    }

    #[inline(always)]
    fn trace_flags(&self) -> u16 {
        self.trace_extension().trace_flags()
    }

    /// Overwrite the whole flag word. Not byte-isolated, see [`TraceFlag::set_flags`].
    #[inline(always)]
    fn set_trace_flags(&self, flags: u16) {
        self.trace_extension().set_trace_flags(flags)
    }

    #[inline(always)]
    fn trace_flags_byte(&self) -> &AtomicU8 {
        self.trace_extension().trace_flags_byte()
    }

    #[inline(always)]
    fn trace_meta_byte(&self) -> &AtomicU8 {
        self.trace_extension().trace_meta_byte()
    }

    /// Copy the whole flag word of `source` into this object, e.g. when an overriding
    /// definition takes over the tagging state of the one it replaces.
    ///
    /// `source` mirrors a nullable peer handed over by the runtime. Passing `None` is a caller
    /// bug and panics.
    fn copy_trace_flags(&self, source: Option<&Self>)
    where
        Self: Sized,
    {
        let Some(source) = source else {
            panic!("copy_trace_flags: the source object must not be null");
        };
        self.set_trace_flags(source.trace_flags());
        debug_assert_eq!(self.trace_flags(), source.trace_flags());
    }
}

impl Traceable for TraceExtension {
    #[inline(always)]
    fn trace_extension(&self) -> &TraceExtension {
        self
    }
}
