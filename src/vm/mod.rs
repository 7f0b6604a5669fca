//! The binding boundary.
//!
//! The runtime that owns the class and method metadata implements these traits for its own
//! metadata kinds. The method tracer only ever reaches the runtime through them.

mod traced_class;
mod traced_method;

pub use self::traced_class::TracedClass;
pub use self::traced_method::TracedMethod;
