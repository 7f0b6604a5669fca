use crate::extension::Traceable;
use crate::vm::TracedMethod;

/// A class as seen by the method tracer.
///
/// The tracer holds instrumented classes through an `Arc`, so the binding must keep the
/// metadata valid for as long as the tracer can reach it, and report unloading through
/// [`TracedClass::is_unloaded`] instead of freeing it.
pub trait TracedClass: Traceable + Send + Sync + 'static {
    type Method: TracedMethod;

    /// The fully qualified class name.
    fn name(&self) -> &str;

    /// The name of the module that defines the class, if the class is in a named module.
    fn module_name(&self) -> Option<&str>;

    /// Fully qualified names of the annotation types present on the class.
    fn annotations(&self) -> &[String];

    /// The methods of the class. The position of a method in this slice is stable for the
    /// lifetime of the class.
    fn methods(&self) -> &[Self::Method];

    fn is_hidden(&self) -> bool;

    /// A subclass of the recorder's event base class. Those are instrumented by the recorder
    /// itself.
    fn is_recorder_event(&self) -> bool;

    /// A class of the runtime's continuation support, which must never be instrumented.
    fn is_continuation_support(&self) -> bool;

    /// Has the class been unloaded?
    fn is_unloaded(&self) -> bool;
}
