use crate::extension::Traceable;

/// A method as seen by the method tracer.
pub trait TracedMethod: Traceable + Send + Sync {
    /// The method name, without its signature.
    fn name(&self) -> &str;

    /// The id number of the method within its holder. It forms the low bits of the method's
    /// trace identifier.
    fn idnum(&self) -> u16;

    /// Fully qualified names of the annotation types present on the method.
    fn annotations(&self) -> &[String];

    fn is_abstract(&self) -> bool;

    /// Generated by the compiler rather than written in source.
    fn is_synthetic(&self) -> bool;

    fn is_native(&self) -> bool;

    /// A compiled lambda form. Instrumenting one would recurse into the instrumentation itself.
    fn is_compiled_lambda_form(&self) -> bool;
}
