//! Tagging of instrumented classes and methods.
//!
//! Instrumented classes and methods carry the sticky marker for as long as they stay
//! instrumented, so that rotations do not lose them. The dynamic tag is an ordinary used tag in
//! the current epoch, which makes the recorder write them out in that epoch.

use super::processor::TracedMethodEntry;
use crate::tagging::TraceTagger;
use crate::vm::TracedClass;

/// Tagging operations the method tracer applies to a class and its selected methods.
pub struct TraceTagging<'a> {
    tagger: &'a TraceTagger,
}

impl<'a> TraceTagging<'a> {
    pub fn new(tagger: &'a TraceTagger) -> Self {
        TraceTagging { tagger }
    }

    /// Tag the selected methods and their class as used in the current epoch.
    pub fn set_dynamic_tag<C: TracedClass>(&self, class: &C, methods: &[TracedMethodEntry]) {
        for entry in methods {
            self.tagger.tag_method(class, entry.method(class));
        }
        self.tagger.tag(class);
    }

    /// Tag the sticky methods of a sticky class, and the class itself, as used in the current
    /// epoch.
    pub fn set_dynamic_tag_for_sticky_bit<C: TracedClass>(&self, class: &C) {
        debug_assert!(self.tagger.has_sticky(class));
        for method in class.methods() {
            if self.tagger.has_sticky(method) {
                self.tagger.tag_method(class, method);
            }
        }
        self.tagger.tag(class);
    }

    pub fn set_sticky_bit<C: TracedClass>(&self, class: &C, methods: &[TracedMethodEntry]) {
        for entry in methods {
            self.tag_sticky(entry.method(class));
        }
        self.tag_sticky(class);
    }

    /// Mark a class about to be retransformed. Timing is requested separately so that the
    /// recorder can publish timers for it once.
    pub fn install_sticky_bit_for_retransform_class<C: TracedClass>(
        &self,
        class: &C,
        methods: &[TracedMethodEntry],
        timing: bool,
    ) {
        self.set_sticky_bit(class, methods);
        if timing {
            self.tagger.set_timing(class);
        }
    }

    /// Remove the sticky and timing markers from a class, and the sticky marker from its methods.
    ///
    /// With `dynamic_tag`, the class and its formerly sticky methods are tagged once more, so
    /// that the current epoch still describes them.
    pub fn clear_sticky_bit<C: TracedClass>(&self, class: &C, dynamic_tag: bool) {
        debug_assert!(self.tagger.has_sticky(class));
        for method in class.methods() {
            if self.tagger.has_sticky(method) {
                self.tagger.clear_sticky(method);
                if dynamic_tag {
                    self.tagger.tag_method(class, method);
                }
            }
        }
        self.tagger.clear_sticky(class);
        if self.tagger.has_timing(class) {
            self.tagger.clear_timing(class);
        }
        if dynamic_tag {
            self.tagger.tag(class);
        }
        debug_assert!(!self.tagger.has_sticky(class));
        debug_assert!(!self.tagger.has_timing(class));
    }

    fn tag_sticky<T: crate::Traceable + ?Sized>(&self, object: &T) {
        debug_assert!(!self.tagger.has_sticky(object), "sticky bit set twice");
        self.tagger.set_sticky(object);
    }
}
