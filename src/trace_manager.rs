//! Runtime-to-tracetag interface.
//!
//! A binding creates a [`TraceStateBuilder`], sets options with [`process`] or
//! [`process_bulk`], and calls [`tracetag_init`] once. The lifecycle hooks below are then
//! called from the runtime's class creation, unloading and restoration paths, and the epoch
//! functions from the recorder's rotation thread.

use crate::allocator;
use crate::build_info::TRACETAG_FULL_BUILD_INFO;
use crate::extension::Traceable;
use crate::tag_bits::LayoutError;
use crate::trace_state::{TraceState, TraceStateBuilder};
use crate::vm::TracedClass;

/// Initialize tracetag from `builder`.
///
/// This attempts to initialize a logger. A binding that wants its own logger should
/// initialize it before calling this function.
pub fn tracetag_init<C: TracedClass>(
    builder: TraceStateBuilder,
) -> Result<Box<TraceState<C>>, LayoutError> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("tracetag initialized the logger."),
        Err(_) => debug!(
            "tracetag failed to initialize the logger. Possibly a logger has been initialized by user."
        ),
    }
    info!("Initializing {}", *TRACETAG_FULL_BUILD_INFO);
    let state = builder.build()?;
    debug!("Options: {:?}", state.options);
    Ok(Box::new(state))
}

/// Process a run-time option. Returns true if the option is set successfully.
///
/// Arguments:
/// * `builder`: The builder the option is set on.
/// * `name`: The option name in camel case, e.g. `traceIdShift`.
/// * `value`: The option value as a string.
pub fn process(builder: &mut TraceStateBuilder, name: &str, value: &str) -> bool {
    builder.set_option(name, value)
}

/// Process multiple run-time options given as whitespace separated `name=value` pairs, e.g.
/// `"initialEpoch=1 traceIdShift=20"`. Returns true if all the options are set successfully.
pub fn process_bulk(builder: &mut TraceStateBuilder, options: &str) -> bool {
    builder.set_options_bulk_by_str(options)
}

/// A traceable object has been created.
pub fn on_object_created<C: TracedClass>(state: &TraceState<C>, object: &dyn Traceable) {
    allocator::init_id(&*state.allocator, object);
}

/// A traceable object is being unloaded.
pub fn on_object_unloaded<C: TracedClass>(state: &TraceState<C>, object: &dyn Traceable) {
    allocator::remove_id(&*state.allocator, object);
}

/// A traceable object has been restored from an archived image.
pub fn on_object_restored<C: TracedClass>(state: &TraceState<C>, object: &dyn Traceable) {
    allocator::restore_id(&*state.allocator, object);
}

/// Start an epoch shift. Instrumentation sites keep tagging into the old epoch until
/// [`end_epoch_shift`].
pub fn begin_epoch_shift<C: TracedClass>(state: &TraceState<C>) {
    state.tagger.begin_epoch_shift();
}

/// Complete an epoch shift. Filters retained for the epoch before the new one are dropped,
/// and unloaded instrumented classes are moved to the stale ids.
pub fn end_epoch_shift<C: TracedClass>(state: &TraceState<C>) {
    state.tagger.end_epoch_shift();
    state
        .method_tracer
        .filters()
        .clear_previous_filters(state.tagger.current());
    state.method_tracer.trim_instrumented_classes();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch::Epoch;
    use crate::trace_flag::CLEARED_EPOCH_BITS;
    use crate::trace_id::UNASSIGNED_TRACE_ID;
    use crate::util::test_util::mock_runtime::MockClass;
    use crate::util::test_util::serial_test;

    #[test]
    fn init_and_lifecycle() {
        serial_test(|| {
            let mut builder = TraceStateBuilder::new();
            assert!(process(&mut builder, "firstClassId", "20"));
            assert!(process_bulk(&mut builder, "traceIdShift=16"));
            let state = tracetag_init::<MockClass>(builder).unwrap();

            let class = MockClass::new("a.B");
            on_object_created(&state, &class);
            assert_eq!(class.trace_id(), 20 << 16);

            assert!(state.tagger.tag(&class));
            begin_epoch_shift(&state);
            end_epoch_shift(&state);
            assert_eq!(state.tagger.current(), Epoch::One);
            assert!(state.tagger.is_used_previous_epoch(&class));

            on_object_unloaded(&state, &class);
            assert_eq!(class.trace_id(), UNASSIGNED_TRACE_ID);
            assert_eq!(class.trace_flags(), CLEARED_EPOCH_BITS);

            on_object_restored(&state, &class);
            assert_eq!(class.trace_id(), 21 << 16);
        })
    }

    #[test]
    fn epoch_shift_trims_unloaded_classes() {
        serial_test(|| {
            let state = tracetag_init::<MockClass>(TraceStateBuilder::new()).unwrap();
            let filter = state
                .method_tracer
                .create_filter(vec![Some("a.B".into())], vec![None], vec![None], vec![1])
                .unwrap();
            state
                .method_tracer
                .set_filters(&state.tagger, filter, &[], |_| {})
                .unwrap();

            let class = std::sync::Arc::new(
                MockClass::new("a.B").with_method(
                    crate::util::test_util::mock_runtime::MockMethod::new("run", 1),
                ),
            );
            on_object_created(&state, &*class);
            assert!(state
                .method_tracer
                .on_class_creation(&state.tagger, &class, None)
                .is_some());

            class.unload();
            begin_epoch_shift(&state);
            end_epoch_shift(&state);
            assert_eq!(state.method_tracer.instrumented_count(), 0);
            assert_eq!(
                state.method_tracer.drain_stale_class_ids(),
                Some(vec![class.trace_id()])
            );
        })
    }
}
