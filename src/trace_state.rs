use crate::allocator::{SequentialTraceIdAllocator, TraceIdAllocator};
use crate::method_tracer::MethodTracer;
use crate::tag_bits::{LayoutError, TagBits};
use crate::tagging::TraceTagger;
use crate::util::options::Options;
use crate::vm::TracedClass;

/// Collects options and the tag layout before a [`TraceState`] is built.
pub struct TraceStateBuilder {
    pub options: Options,
    pub tag_bits: TagBits,
    allocator: Option<Box<dyn TraceIdAllocator>>,
}

impl TraceStateBuilder {
    /// Default options, overridden by `TRACETAG_*` environment variables.
    pub fn new() -> Self {
        TraceStateBuilder {
            options: Options::default(),
            tag_bits: TagBits::default(),
            allocator: None,
        }
    }

    /// Set an option by its camel case name. Returns false if the value is rejected.
    pub fn set_option(&mut self, name: &str, value: &str) -> bool {
        self.options.set_from_camelcase_str(name, value)
    }

    /// Set options from a string of whitespace separated `name=value` pairs. Returns false if
    /// any pair is malformed or rejected. The remaining pairs are still applied.
    pub fn set_options_bulk_by_str(&mut self, options: &str) -> bool {
        let mut all_ok = true;
        for pair in options.split_whitespace() {
            match pair.split_once('=') {
                Some((name, value)) => all_ok &= self.set_option(name, value),
                None => {
                    warn!("Malformed option {:?}, expected name=value", pair);
                    all_ok = false;
                }
            }
        }
        all_ok
    }

    pub fn set_tag_bits(&mut self, bits: TagBits) {
        self.tag_bits = bits;
    }

    /// Use `allocator` instead of a [`SequentialTraceIdAllocator`] configured by the options.
    pub fn set_allocator(&mut self, allocator: Box<dyn TraceIdAllocator>) {
        self.allocator = Some(allocator);
    }

    pub fn build<C: TracedClass>(self) -> Result<TraceState<C>, LayoutError> {
        let tagger = TraceTagger::from_options(self.tag_bits, &self.options)?;
        let allocator = self
            .allocator
            .unwrap_or_else(|| Box::new(SequentialTraceIdAllocator::from_options(&self.options)));
        Ok(TraceState {
            method_tracer: MethodTracer::new(&self.options),
            tagger,
            allocator,
            options: self.options,
        })
    }
}

impl Default for TraceStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the recorder keeps for tagging one runtime's metadata.
pub struct TraceState<C: TracedClass> {
    pub tagger: TraceTagger,
    pub allocator: Box<dyn TraceIdAllocator>,
    pub method_tracer: MethodTracer<C>,
    pub options: Options,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch::Epoch;
    use crate::util::test_util::mock_runtime::MockClass;
    use crate::util::test_util::serial_test;

    #[test]
    fn bulk_options() {
        serial_test(|| {
            let mut builder = TraceStateBuilder::new();
            assert!(builder.set_options_bulk_by_str("initialEpoch=1 firstClassId=64"));
            assert_eq!(builder.options.initial_epoch, Epoch::One);
            assert_eq!(builder.options.first_class_id, 64);

            assert!(!builder.set_options_bulk_by_str("traceIdShift=4 methodTracer"));
            assert_eq!(builder.options.trace_id_shift, 16);
        })
    }

    #[test]
    fn build_rejects_invalid_layout() {
        serial_test(|| {
            let mut builder = TraceStateBuilder::new();
            builder.set_tag_bits(TagBits {
                timing: TagBits::default().sticky,
                ..TagBits::default()
            });
            assert!(builder.build::<MockClass>().is_err());
        })
    }

    #[test]
    fn build_uses_options() {
        serial_test(|| {
            let mut builder = TraceStateBuilder::new();
            builder.set_option("initialEpoch", "one");
            let state = builder.build::<MockClass>().unwrap();
            assert_eq!(state.tagger.current(), Epoch::One);
            assert!(!state.method_tracer.in_use());
        })
    }
}
