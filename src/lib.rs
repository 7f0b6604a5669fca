//! Trace identifiers and epoch-aware tag bits for runtime metadata.
//!
//! Every traceable metadata kind of a managed runtime (classes, methods, modules, packages,
//! class loaders) embeds a [`TraceExtension`]: a 64-bit trace identifier and a 16-bit flag word.
//! A recorder tags objects as they are used, and periodically rotates the epoch to write out
//! and clear what was tagged in the previous one.
//!
//! The flag word is split into two bytes that are only ever accessed one at a time:
//!
//! * the *flags byte* holds per-epoch tag bits, set by threads at instrumentation points;
//! * the *meta byte* holds markers (cleared epochs, sticky, timing, ...), set and cleared by the
//!   recorder.
//!
//! A tag in one byte never disturbs a concurrent update of the other. A new flag word has no
//! tags and both epochs marked as cleared ([`trace_flag::CLEARED_EPOCH_BITS`]).
//!
//! Bindings implement [`Traceable`] for their metadata kinds (usually with
//! `#[derive(Traceable)]`) and the traits in [`vm`] for classes and methods, then drive tagging
//! through the functions in [`trace_manager`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
// The derive macro names this crate by its absolute path, also from within this crate.
extern crate self as tracetag;

pub mod allocator;
pub mod build_info;
pub mod epoch;
pub mod extension;
pub mod method_tracer;
pub mod tag_bits;
pub mod tagging;
pub mod trace_flag;
pub mod trace_id;
pub mod trace_manager;
pub mod trace_state;
pub mod util;
pub mod vm;

pub use crate::allocator::{SequentialTraceIdAllocator, TraceIdAllocator};
pub use crate::epoch::{Epoch, TraceIdEpoch};
pub use crate::extension::{TraceExtension, Traceable};
pub use crate::tag_bits::{LayoutError, TagBits};
pub use crate::tagging::TraceTagger;
pub use crate::trace_flag::TraceFlag;
pub use crate::trace_id::{TraceId, TraceIdField};
pub use crate::trace_state::{TraceState, TraceStateBuilder};
pub use crate::util::options::Options;
pub use tracetag_macros::Traceable;
