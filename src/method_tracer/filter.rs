use crate::tagging::TraceTagger;
use crate::util::options::ModuleList;
use crate::vm::{TracedClass, TracedMethod};
use itertools::Itertools;
use std::fmt;
use std::ops::BitOr;

/// What to do to a matched method.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Modification(u8);

impl Modification {
    /// Matched, but neither timed nor traced. Methods matched this way lose earlier
    /// instrumentation.
    pub const NONE: Modification = Modification(0);
    pub const TIMING: Modification = Modification(1);
    pub const TRACING: Modification = Modification(2);
    const ALL: u8 = Self::TIMING.0 | Self::TRACING.0;

    /// Convert the raw value handed over by the recorder.
    pub fn from_raw(raw: i32) -> Option<Modification> {
        if (0..=Self::ALL as i32).contains(&raw) {
            Some(Modification(raw as u8))
        } else {
            None
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Modification) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_timing(self) -> bool {
        self.contains(Self::TIMING)
    }

    pub fn is_tracing(self) -> bool {
        self.contains(Self::TRACING)
    }
}

impl BitOr for Modification {
    type Output = Modification;

    fn bitor(self, rhs: Modification) -> Modification {
        Modification(self.0 | rhs.0)
    }
}

impl fmt::Display for Modification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = |on: bool| if on { '+' } else { '-' };
        write!(
            f,
            "{}timing {}tracing",
            sign(self.is_timing()),
            sign(self.is_tracing())
        )
    }
}

/// Merge two lookups. `None` means "no match" and yields to the other side.
pub fn combine(a: Option<Modification>, b: Option<Modification>) -> Option<Modification> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(a), Some(b)) => Some(a | b),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The four arrays describing the entries differ in length.
    LengthMismatch {
        classes: usize,
        methods: usize,
        annotations: usize,
        modifications: usize,
    },
    /// A modification value outside the known bits.
    InvalidModification { index: usize, value: i32 },
    /// The method tracer is disabled by the `method_tracer` option.
    Disabled,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::LengthMismatch {
                classes,
                methods,
                annotations,
                modifications,
            } => write!(
                f,
                "filter arrays differ in length: {} classes, {} methods, {} annotations, {} modifications",
                classes, methods, annotations, modifications
            ),
            FilterError::InvalidModification { index, value } => {
                write!(f, "invalid modification {} for filter entry {}", value, index)
            }
            FilterError::Disabled => write!(f, "the method tracer is disabled"),
        }
    }
}

impl std::error::Error for FilterError {}

/// One filter entry. Either `annotation` is set, or a class name and/or a method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub class_name: Option<String>,
    pub method_name: Option<String>,
    pub annotation: Option<String>,
    pub modification: Modification,
}

impl fmt::Display for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(annotation) = &self.annotation {
            return write!(f, "@{} {}", annotation, self.modification);
        }
        write!(
            f,
            "{}::{} {}",
            self.class_name.as_deref().unwrap_or("*"),
            self.method_name.as_deref().unwrap_or("*"),
            self.modification
        )
    }
}

/// A set of filter entries selecting the classes and methods to instrument.
#[derive(Debug, Clone)]
pub struct Filter {
    entries: Vec<FilterEntry>,
    excluded_modules: ModuleList,
}

impl Filter {
    pub fn new(entries: Vec<FilterEntry>, excluded_modules: ModuleList) -> Self {
        Filter {
            entries,
            excluded_modules,
        }
    }

    /// Build a filter from the parallel arrays the recorder hands over. Entry `i` is made of
    /// the `i`th element of each array.
    pub fn from_arrays(
        classes: Vec<Option<String>>,
        methods: Vec<Option<String>>,
        annotations: Vec<Option<String>>,
        modifications: Vec<i32>,
        excluded_modules: ModuleList,
    ) -> Result<Self, FilterError> {
        let count = classes.len();
        if methods.len() != count || annotations.len() != count || modifications.len() != count {
            return Err(FilterError::LengthMismatch {
                classes: count,
                methods: methods.len(),
                annotations: annotations.len(),
                modifications: modifications.len(),
            });
        }
        let entries = classes
            .into_iter()
            .zip(methods)
            .zip(annotations)
            .zip(modifications)
            .enumerate()
            .map(|(index, (((class_name, method_name), annotation), value))| {
                let modification = Modification::from_raw(value)
                    .ok_or(FilterError::InvalidModification { index, value })?;
                Ok(FilterEntry {
                    class_name,
                    method_name,
                    annotation,
                    modification,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(entries, excluded_modules))
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_instrument_module(&self, module: Option<&str>) -> bool {
        module.map_or(true, |m| !self.excluded_modules.contains(m))
    }

    pub fn can_instrument_class<C: TracedClass>(&self, class: &C, tagger: &TraceTagger) -> bool {
        if tagger.has_sticky(class) {
            return true;
        }
        if class.is_hidden() || class.is_recorder_event() || class.is_continuation_support() {
            return false;
        }
        self.can_instrument_module(class.module_name())
    }

    pub fn can_instrument_method<M: TracedMethod>(&self, method: &M, tagger: &TraceTagger) -> bool {
        if tagger.has_sticky(method) {
            return true;
        }
        !(method.is_abstract()
            || method.is_synthetic()
            || method.is_native()
            || method.is_compiled_lambda_form())
    }

    /// Modifications selected for every method of `class` by annotation entries.
    pub fn class_modifications<C: TracedClass>(&self, class: &C) -> Option<Modification> {
        self.entries
            .iter()
            .filter(|e| {
                e.annotation
                    .as_deref()
                    .is_some_and(|a| has_annotation(class.annotations(), a))
            })
            .fold(None, |acc, e| combine(acc, Some(e.modification)))
    }

    /// Modifications selected for `method` of `class`.
    pub fn method_modifications<C: TracedClass>(
        &self,
        class: &C,
        method: &C::Method,
        tagger: &TraceTagger,
    ) -> Option<Modification> {
        self.entries
            .iter()
            .filter(|e| match &e.annotation {
                Some(annotation) => has_annotation(method.annotations(), annotation),
                None => {
                    e.class_name.as_deref().map_or(true, |c| c == class.name())
                        && e.method_name.as_deref().map_or(true, |m| {
                            m == method.name() && self.can_instrument_method(method, tagger)
                        })
                }
            })
            .fold(None, |acc, e| combine(acc, Some(e.modification)))
    }

    /// Does the filter select anything in `class`?
    pub fn matches<C: TracedClass>(&self, class: &C, tagger: &TraceTagger) -> bool {
        if !self.can_instrument_class(class, tagger) {
            return false;
        }
        if self.class_modifications(class).is_some() {
            return true;
        }
        class
            .methods()
            .iter()
            .any(|m| self.method_modifications(class, m, tagger).is_some())
    }

    pub fn log(&self, caption: &str) {
        debug!(
            "{} = {{\n{}\n}}",
            caption,
            self.entries.iter().map(|e| format!("  {}", e)).join("\n")
        );
    }
}

fn has_annotation(annotations: &[String], name: &str) -> bool {
    annotations.iter().any(|a| a == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::mock_runtime::{MockClass, MockMethod};

    fn entry(
        class: Option<&str>,
        method: Option<&str>,
        annotation: Option<&str>,
        modification: Modification,
    ) -> FilterEntry {
        FilterEntry {
            class_name: class.map(String::from),
            method_name: method.map(String::from),
            annotation: annotation.map(String::from),
            modification,
        }
    }

    fn filter(entries: Vec<FilterEntry>) -> Filter {
        Filter::new(entries, ModuleList::default())
    }

    #[test]
    fn combine_treats_none_as_no_match() {
        let t = Some(Modification::TIMING);
        let r = Some(Modification::TRACING);
        assert_eq!(combine(None, None), None);
        assert_eq!(combine(None, t), t);
        assert_eq!(combine(r, None), r);
        assert_eq!(
            combine(t, r),
            Some(Modification::TIMING | Modification::TRACING)
        );
        assert_eq!(
            combine(Some(Modification::NONE), None),
            Some(Modification::NONE)
        );
    }

    #[test]
    fn from_arrays_checks_lengths() {
        let err = Filter::from_arrays(
            vec![Some("a.B".into())],
            vec![None, None],
            vec![None],
            vec![1],
            ModuleList::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::LengthMismatch { methods: 2, .. }));

        let err = Filter::from_arrays(
            vec![None],
            vec![None],
            vec![Some("a.Timed".into())],
            vec![7],
            ModuleList::default(),
        )
        .unwrap_err();
        assert_eq!(err, FilterError::InvalidModification { index: 0, value: 7 });

        let ok = Filter::from_arrays(
            vec![Some("a.B".into()), None],
            vec![Some("run".into()), None],
            vec![None, Some("a.Timed".into())],
            vec![2, 1],
            ModuleList::default(),
        )
        .unwrap();
        assert_eq!(ok.entries().len(), 2);
        assert_eq!(ok.entries()[0].modification, Modification::TRACING);
    }

    #[test]
    fn excluded_classes_and_methods() {
        let tagger = TraceTagger::default();
        let f = filter(vec![entry(None, Some("run"), None, Modification::TIMING)]);

        assert!(f.can_instrument_class(&MockClass::new("a.B"), &tagger));
        assert!(!f.can_instrument_class(&MockClass::new("a.B").hidden(), &tagger));
        assert!(!f.can_instrument_class(&MockClass::new("a.E").recorder_event(), &tagger));
        assert!(!f.can_instrument_class(&MockClass::new("a.C").continuation_support(), &tagger));
        assert!(!f.can_instrument_class(&MockClass::new("jdk.jfr.X").in_module("jdk.jfr"), &tagger));
        assert!(f.can_instrument_class(&MockClass::new("a.B").in_module("app"), &tagger));

        let sticky = MockClass::new("a.B").hidden();
        tagger.set_sticky(&sticky);
        assert!(f.can_instrument_class(&sticky, &tagger));

        assert!(f.can_instrument_method(&MockMethod::new("run", 1), &tagger));
        assert!(!f.can_instrument_method(&MockMethod::new("run", 1).native(), &tagger));
        assert!(!f.can_instrument_method(&MockMethod::new("run", 1).abstract_method(), &tagger));
        assert!(!f.can_instrument_method(&MockMethod::new("run", 1).lambda_form(), &tagger));

        let sticky = MockMethod::new("run", 1).native();
        tagger.set_sticky(&sticky);
        assert!(f.can_instrument_method(&sticky, &tagger));
    }

    #[test]
    fn name_and_annotation_matching() {
        let tagger = TraceTagger::default();
        let class = MockClass::new("a.B")
            .with_annotation("a.Traced")
            .with_method(MockMethod::new("run", 1))
            .with_method(MockMethod::new("stop", 2).with_annotation("a.Timed"));
        let f = filter(vec![
            entry(Some("a.B"), Some("run"), None, Modification::TRACING),
            entry(None, None, Some("a.Timed"), Modification::TIMING),
            entry(None, None, Some("a.Traced"), Modification::NONE),
        ]);

        assert_eq!(f.class_modifications(&class), Some(Modification::NONE));
        let run = &class.methods()[0];
        let stop = &class.methods()[1];
        assert_eq!(
            f.method_modifications(&class, run, &tagger),
            Some(Modification::TRACING)
        );
        assert_eq!(
            f.method_modifications(&class, stop, &tagger),
            Some(Modification::TIMING)
        );
        assert!(f.matches(&class, &tagger));

        let other = MockClass::new("a.C").with_method(MockMethod::new("run", 1));
        assert_eq!(f.method_modifications(&other, &other.methods()[0], &tagger), None);
        assert!(!f.matches(&other, &tagger));
    }

    #[test]
    fn class_wildcard_matches_any_class() {
        let tagger = TraceTagger::default();
        let class = MockClass::new("x.Y").with_method(MockMethod::new("run", 1).native());
        let f = filter(vec![entry(None, Some("run"), None, Modification::TIMING)]);
        // Native methods are never selected by name.
        assert_eq!(f.method_modifications(&class, &class.methods()[0], &tagger), None);
        let class = MockClass::new("x.Y").with_method(MockMethod::new("run", 1));
        assert_eq!(
            f.method_modifications(&class, &class.methods()[0], &tagger),
            Some(Modification::TIMING)
        );
    }

    #[test]
    fn display() {
        assert_eq!(Modification::TIMING.to_string(), "+timing -tracing");
        assert_eq!(
            entry(Some("a.B"), None, None, Modification::TRACING).to_string(),
            "a.B::* -timing +tracing"
        );
        assert_eq!(
            entry(None, None, Some("a.Timed"), Modification::TIMING).to_string(),
            "@a.Timed +timing -tracing"
        );
    }
}
