use super::filter::{Filter, FilterError};
use super::filter_manager::FilterManager;
use super::processor::{MethodProcessor, TracedMethodEntry};
use super::tagging::TraceTagging;
use crate::tagging::TraceTagger;
use crate::trace_id::TraceId;
use crate::util::options::{ModuleList, Options};
use crate::vm::TracedClass;
use spin::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A class whose methods have been rewritten by the tracer.
pub struct InstrumentedClass<C: TracedClass> {
    trace_id: TraceId,
    class: Arc<C>,
}

impl<C: TracedClass> InstrumentedClass<C> {
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn class(&self) -> &Arc<C> {
        &self.class
    }

    pub fn unloaded(&self) -> bool {
        self.class.is_unloaded()
    }
}

struct InstrumentedClasses<C: TracedClass> {
    classes: Vec<InstrumentedClass<C>>,
    // Ids of unloaded instrumented classes not yet reported to the recorder.
    stale_ids: Vec<TraceId>,
}

/// What the binding must do for a class the tracer selected when it was created or redefined.
///
/// The binding rewrites the selected methods. If [`MethodProcessor::has_timing`] is set, it
/// also publishes timers for the class.
pub type Instrumentation = MethodProcessor;

/// Tracks filters and instrumented classes for the method tracer.
///
/// Filter installs are serialized by their own lock. The instrumented list has a separate lock
/// that is never held while calling back into the binding.
pub struct MethodTracer<C: TracedClass> {
    enabled: bool,
    excluded_modules: ModuleList,
    filters: FilterManager,
    filter_update: Mutex<()>,
    in_use: AtomicBool,
    instrumented: Mutex<InstrumentedClasses<C>>,
}

impl<C: TracedClass> MethodTracer<C> {
    pub fn new(options: &Options) -> Self {
        MethodTracer {
            enabled: options.method_tracer,
            excluded_modules: options.excluded_modules.clone(),
            filters: FilterManager::new(),
            filter_update: Mutex::new(()),
            in_use: AtomicBool::new(false),
            instrumented: Mutex::new(InstrumentedClasses {
                classes: vec![],
                stale_ids: vec![],
            }),
        }
    }

    /// Has a filter ever been installed?
    pub fn in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn filters(&self) -> &FilterManager {
        &self.filters
    }

    /// Build a filter from the recorder's parallel arrays, excluding the configured modules.
    pub fn create_filter(
        &self,
        classes: Vec<Option<String>>,
        methods: Vec<Option<String>>,
        annotations: Vec<Option<String>>,
        modifications: Vec<i32>,
    ) -> Result<Filter, FilterError> {
        Filter::from_arrays(
            classes,
            methods,
            annotations,
            modifications,
            self.excluded_modules.clone(),
        )
    }

    /// Replace the installed filter.
    ///
    /// Every loaded class matched by the old or the new filter is handed to `retransform` while
    /// both filters are visible, so that [`MethodTracer::on_class_redefinition`] sees the union.
    /// Returns the ids of the classes that need timers published.
    pub fn set_filters<'a, I, R>(
        &self,
        tagger: &TraceTagger,
        filter: Filter,
        loaded_classes: I,
        retransform: R,
    ) -> Result<Vec<TraceId>, FilterError>
    where
        I: IntoIterator<Item = &'a Arc<C>>,
        R: FnOnce(&[Arc<C>]),
    {
        if !self.enabled {
            return Err(FilterError::Disabled);
        }
        let _update = self.filter_update.lock();
        filter.log("New filter");
        let previous = self.filters.current();
        let to_modify: Vec<Arc<C>> = loaded_classes
            .into_iter()
            .filter(|class| {
                let class: &C = class;
                !class.is_unloaded()
                    && (previous.as_ref().is_some_and(|f| f.matches(class, tagger))
                        || filter.matches(class, tagger))
            })
            .cloned()
            .collect();
        debug!("Classes to retransform: {}", to_modify.len());

        {
            let mut instrumented = self.instrumented.lock();
            Self::clear(tagger, &mut instrumented.classes, true);
        }

        self.filters.begin_update(Arc::new(filter));
        self.in_use.store(true, Ordering::Release);
        if !to_modify.is_empty() {
            retransform(&to_modify);
        }
        self.filters.finish_update(tagger.current());
        Ok(self.collect_new_timing_entries(tagger))
    }

    /// A class is being created, or an `existing` class redefined from a new definition.
    ///
    /// Returns what to instrument, or `None` if no method is selected.
    pub fn on_class_creation(
        &self,
        tagger: &TraceTagger,
        class: &Arc<C>,
        existing: Option<&Arc<C>>,
    ) -> Option<Instrumentation> {
        if !self.in_use() {
            return None;
        }
        let target = existing.unwrap_or(class);
        let filter = self.filters.current()?;
        let previous = self.filters.previous();
        let processor = MethodProcessor::process(&**target, previous.as_deref(), &filter, tagger);
        if !processor.has_methods() {
            return None;
        }
        if existing.is_some() {
            // The class is added to the instrumented list once its redefinition completes.
            TraceTagging::new(tagger).install_sticky_bit_for_retransform_class(
                &**target,
                processor.methods(),
                processor.has_timing(),
            );
        } else {
            self.add_instrumented_class(tagger, class, processor.methods());
        }
        Some(processor)
    }

    /// A class marked by [`MethodTracer::on_class_creation`] has been redefined.
    ///
    /// If no recording is running any more, the instrumentation is abandoned.
    pub fn on_class_redefinition(&self, tagger: &TraceTagger, class: &Arc<C>, recording: bool) {
        debug_assert!(tagger.has_sticky(&**class));
        let tagging = TraceTagging::new(tagger);
        if !recording {
            tagging.clear_sticky_bit(&**class, false);
            return;
        }
        let mut instrumented = self.instrumented.lock();
        let trace_id = class.trace_id();
        if !instrumented.classes.iter().any(|c| c.trace_id == trace_id) {
            if instrumented.classes.is_empty() {
                tagger.epoch().set_method_tracer_tag_state();
            }
            instrumented.classes.push(InstrumentedClass {
                trace_id,
                class: class.clone(),
            });
            debug!("Added {} (id {:#x}) to instrumented classes", class.name(), trace_id);
            tagging.set_dynamic_tag_for_sticky_bit(&**class);
        }
    }

    /// Record `class` as instrumented with the selected `methods`.
    pub fn add_instrumented_class(
        &self,
        tagger: &TraceTagger,
        class: &Arc<C>,
        methods: &[TracedMethodEntry],
    ) {
        assert!(!methods.is_empty(), "an instrumented class has selected methods");
        let tagging = TraceTagging::new(tagger);
        let mut instrumented = self.instrumented.lock();
        tagging.set_dynamic_tag(&**class, methods);
        tagging.set_sticky_bit(&**class, methods);
        if instrumented.classes.is_empty() {
            tagger.epoch().set_method_tracer_tag_state();
        }
        instrumented.classes.push(InstrumentedClass {
            trace_id: class.trace_id(),
            class: class.clone(),
        });
        debug!(
            "Added {} (id {:#x}) with {} methods to instrumented classes",
            class.name(),
            class.trace_id(),
            methods.len()
        );
    }

    /// Ids of instrumented classes waiting for timers. Each is returned once.
    pub fn collect_new_timing_entries(&self, tagger: &TraceTagger) -> Vec<TraceId> {
        let instrumented = self.instrumented.lock();
        instrumented
            .classes
            .iter()
            .filter(|c| !c.unloaded())
            .filter(|c| {
                debug_assert!(tagger.has_sticky(&*c.class));
                if tagger.has_timing(&*c.class) {
                    tagger.clear_timing(&*c.class);
                    true
                } else {
                    false
                }
            })
            .map(|c| c.trace_id)
            .collect()
    }

    /// Move unloaded classes from the instrumented list to the stale ids.
    pub fn trim_instrumented_classes(&self) {
        let mut guard = self.instrumented.lock();
        let instrumented = &mut *guard;
        let before = instrumented.classes.len();
        let stale_ids = &mut instrumented.stale_ids;
        instrumented.classes.retain(|c| {
            if c.unloaded() {
                stale_ids.push(c.trace_id);
                false
            } else {
                true
            }
        });
        let trimmed = before - instrumented.classes.len();
        if trimmed > 0 {
            debug!("Trimmed {} unloaded instrumented classes", trimmed);
        }
    }

    /// Ids of unloaded instrumented classes since the last call, or `None` if there are none.
    pub fn drain_stale_class_ids(&self) -> Option<Vec<TraceId>> {
        if !self.in_use() {
            return None;
        }
        let mut instrumented = self.instrumented.lock();
        if instrumented.stale_ids.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut instrumented.stale_ids))
    }

    /// Forget every instrumented class, e.g. when recording stops.
    pub fn clear_instrumented_classes(&self, tagger: &TraceTagger) {
        let mut instrumented = self.instrumented.lock();
        Self::clear(tagger, &mut instrumented.classes, false);
    }

    pub fn instrumented_count(&self) -> usize {
        self.instrumented.lock().classes.len()
    }

    pub fn is_instrumented(&self, trace_id: TraceId) -> bool {
        self.instrumented
            .lock()
            .classes
            .iter()
            .any(|c| c.trace_id == trace_id)
    }

    fn clear(tagger: &TraceTagger, classes: &mut Vec<InstrumentedClass<C>>, dynamic_tag: bool) {
        if classes.is_empty() {
            return;
        }
        tagger.epoch().reset_method_tracer_tag_state();
        let tagging = TraceTagging::new(tagger);
        for c in classes.iter().filter(|c| !c.unloaded()) {
            tagging.clear_sticky_bit(&*c.class, dynamic_tag);
            trace!("Removed {} (id {:#x}) from instrumented classes", c.class.name(), c.trace_id);
        }
        classes.clear();
    }
}
