//! A minimal runtime for tests: classes and methods with just enough metadata for the method
//! tracer to work on.

use crate::extension::TraceExtension;
use crate::vm::{TracedClass, TracedMethod};
use crate::Traceable;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Traceable, Default)]
pub struct MockMethod {
    pub name: String,
    pub idnum: u16,
    pub annotations: Vec<String>,
    pub is_abstract: bool,
    pub is_synthetic: bool,
    pub is_native: bool,
    pub is_lambda_form: bool,
    #[trace_extension]
    trace: TraceExtension,
}

impl MockMethod {
    pub fn new(name: &str, idnum: u16) -> Self {
        MockMethod {
            name: name.to_string(),
            idnum,
            ..Default::default()
        }
    }

    pub fn with_annotation(mut self, annotation: &str) -> Self {
        self.annotations.push(annotation.to_string());
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.is_synthetic = true;
        self
    }

    pub fn native(mut self) -> Self {
        self.is_native = true;
        self
    }

    pub fn lambda_form(mut self) -> Self {
        self.is_lambda_form = true;
        self
    }
}

impl TracedMethod for MockMethod {
    fn name(&self) -> &str {
        &self.name
    }

    fn idnum(&self) -> u16 {
        self.idnum
    }

    fn annotations(&self) -> &[String] {
        &self.annotations
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    fn is_synthetic(&self) -> bool {
        self.is_synthetic
    }

    fn is_native(&self) -> bool {
        self.is_native
    }

    fn is_compiled_lambda_form(&self) -> bool {
        self.is_lambda_form
    }
}

#[derive(Traceable, Default)]
pub struct MockClass {
    pub name: String,
    pub module: Option<String>,
    pub annotations: Vec<String>,
    pub methods: Vec<MockMethod>,
    pub is_hidden: bool,
    pub is_recorder_event: bool,
    pub is_continuation_support: bool,
    unloaded: AtomicBool,
    #[trace_extension]
    trace: TraceExtension,
}

impl MockClass {
    pub fn new(name: &str) -> Self {
        MockClass {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn in_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    pub fn with_annotation(mut self, annotation: &str) -> Self {
        self.annotations.push(annotation.to_string());
        self
    }

    pub fn with_method(mut self, method: MockMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    pub fn recorder_event(mut self) -> Self {
        self.is_recorder_event = true;
        self
    }

    pub fn continuation_support(mut self) -> Self {
        self.is_continuation_support = true;
        self
    }

    pub fn unload(&self) {
        self.unloaded.store(true, Ordering::Release);
    }
}

impl TracedClass for MockClass {
    type Method = MockMethod;

    fn name(&self) -> &str {
        &self.name
    }

    fn module_name(&self) -> Option<&str> {
        self.module.as_deref()
    }

    fn annotations(&self) -> &[String] {
        &self.annotations
    }

    fn methods(&self) -> &[MockMethod] {
        &self.methods
    }

    fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    fn is_recorder_event(&self) -> bool {
        self.is_recorder_event
    }

    fn is_continuation_support(&self) -> bool {
        self.is_continuation_support
    }

    fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::Acquire)
    }
}
