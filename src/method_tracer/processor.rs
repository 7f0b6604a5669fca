use super::filter::{combine, Filter, Modification};
use crate::allocator::method_id;
use crate::tagging::TraceTagger;
use crate::trace_id::TraceId;
use crate::vm::{TracedClass, TracedMethod};

/// A method selected for instrumentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedMethodEntry {
    pub id: TraceId,
    pub name: String,
    /// The modification under the new filter. [`Modification::NONE`] removes earlier
    /// instrumentation.
    pub modification: Modification,
    /// Position of the method in [`TracedClass::methods`].
    pub methods_index: usize,
}

impl TracedMethodEntry {
    pub fn method<'a, C: TracedClass>(&self, class: &'a C) -> &'a C::Method {
        &class.methods()[self.methods_index]
    }
}

/// Selects the methods of one class that an installed or replaced filter touches.
#[derive(Debug, Default)]
pub struct MethodProcessor {
    methods: Vec<TracedMethodEntry>,
    has_timing: bool,
}

impl MethodProcessor {
    /// A method is selected if either filter matched it, so that methods instrumented under
    /// `previous` are rewritten even when `filter` no longer selects them.
    pub fn process<C: TracedClass>(
        class: &C,
        previous: Option<&Filter>,
        filter: &Filter,
        tagger: &TraceTagger,
    ) -> Self {
        let mut processor = MethodProcessor::default();
        if !filter.can_instrument_class(class, tagger) {
            return processor;
        }
        let class_modification = filter.class_modifications(class);
        // Class annotations of the previous filter, not the new one, decide what was
        // instrumented before. A method selected only through them is still reset.
        let previous_class_modification = previous.and_then(|p| p.class_modifications(class));

        for (index, method) in class.methods().iter().enumerate() {
            if !filter.can_instrument_method(method, tagger) {
                continue;
            }
            let modification = combine(
                class_modification,
                filter.method_modifications(class, method, tagger),
            );
            let previous_modification = previous.and_then(|p| {
                combine(
                    previous_class_modification,
                    p.method_modifications(class, method, tagger),
                )
            });
            if combine(previous_modification, modification).is_none() {
                continue;
            }
            let modification = modification.unwrap_or(Modification::NONE);
            if modification.is_timing() {
                processor.has_timing = true;
            }
            let entry = TracedMethodEntry {
                id: method_id(class.trace_id(), method.idnum()),
                name: method.name().to_string(),
                modification,
                methods_index: index,
            };
            debug!(
                "Method {}::{} (id {:#x}): {}",
                class.name(),
                entry.name,
                entry.id,
                entry.modification
            );
            processor.methods.push(entry);
        }
        processor
    }

    pub fn methods(&self) -> &[TracedMethodEntry] {
        &self.methods
    }

    pub fn into_methods(self) -> Vec<TracedMethodEntry> {
        self.methods
    }

    pub fn has_methods(&self) -> bool {
        !self.methods.is_empty()
    }

    /// Does any selected method get timing under the new filter?
    pub fn has_timing(&self) -> bool {
        self.has_timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method_tracer::filter::FilterEntry;
    use crate::util::options::ModuleList;
    use crate::util::test_util::mock_runtime::{MockClass, MockMethod};
    use crate::Traceable;

    fn by_method(method: &str, modification: Modification) -> Filter {
        Filter::new(
            vec![FilterEntry {
                class_name: Some("a.B".into()),
                method_name: Some(method.into()),
                annotation: None,
                modification,
            }],
            ModuleList::default(),
        )
    }

    fn class() -> MockClass {
        let class = MockClass::new("a.B")
            .with_method(MockMethod::new("run", 1))
            .with_method(MockMethod::new("stop", 2))
            .with_method(MockMethod::new("run", 3).synthetic());
        class.set_trace_id(10 << 16);
        class
    }

    #[test]
    fn selects_matching_methods() {
        let tagger = TraceTagger::default();
        let class = class();
        let processor =
            MethodProcessor::process(&class, None, &by_method("run", Modification::TIMING), &tagger);
        assert!(processor.has_timing());
        assert_eq!(
            processor.methods(),
            &[TracedMethodEntry {
                id: (10 << 16) | 1,
                name: "run".into(),
                modification: Modification::TIMING,
                methods_index: 0,
            }]
        );
        assert_eq!(processor.methods()[0].method(&class).idnum(), 1);
    }

    #[test]
    fn previously_matched_methods_are_reset() {
        let tagger = TraceTagger::default();
        let class = class();
        let previous = by_method("run", Modification::TIMING);
        let filter = by_method("stop", Modification::TRACING);
        let processor = MethodProcessor::process(&class, Some(&previous), &filter, &tagger);
        assert!(!processor.has_timing());
        let selected: Vec<_> = processor
            .methods()
            .iter()
            .map(|m| (m.methods_index, m.modification))
            .collect();
        assert_eq!(
            selected,
            vec![(0, Modification::NONE), (1, Modification::TRACING)]
        );
    }

    #[test]
    fn excluded_class_selects_nothing() {
        let tagger = TraceTagger::default();
        let class = MockClass::new("a.B")
            .hidden()
            .with_method(MockMethod::new("run", 1));
        let processor =
            MethodProcessor::process(&class, None, &by_method("run", Modification::TIMING), &tagger);
        assert!(!processor.has_methods());
    }
}
