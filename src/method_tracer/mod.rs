//! Instrumentation bookkeeping for the method tracer.
//!
//! The recorder installs a [`Filter`] that selects classes and methods. Classes matched by it
//! are rewritten by the binding. The tracer decides which methods are selected, keeps the
//! instrumented classes tagged across epochs, and reports unloaded ones.

mod filter;
mod filter_manager;
mod processor;
mod tagging;
mod tracer;

pub use self::filter::{combine, Filter, FilterEntry, FilterError, Modification};
pub use self::filter_manager::FilterManager;
pub use self::processor::{MethodProcessor, TracedMethodEntry};
pub use self::tagging::TraceTagging;
pub use self::tracer::{InstrumentedClass, Instrumentation, MethodTracer};
