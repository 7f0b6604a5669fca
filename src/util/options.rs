use crate::allocator::{MIN_TRACE_ID_SHIFT, PRIMITIVE_CLASS_IDS};
use crate::epoch::Epoch;
use std::default::Default;
use std::str::FromStr;

/// Modules whose classes are never instrumented by the method tracer.
///
/// The format is a comma separated list of module names:
/// ```text
/// <modules> ::= <module-name> "," <modules> | <module-name> | ""
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleList {
    pub modules: Vec<String>,
}

impl ModuleList {
    fn parse_modules(modules: &str) -> Result<Vec<String>, String> {
        modules
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|m| {
                if m.chars().any(char::is_whitespace) {
                    Err(format!("Module name '{}' contains whitespace", m))
                } else {
                    Ok(m.to_string())
                }
            })
            .collect()
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }
}

impl FromStr for ModuleList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleList::parse_modules(s).map(|modules| ModuleList { modules })
    }
}

impl Default for ModuleList {
    fn default() -> Self {
        ModuleList {
            modules: DEFAULT_EXCLUDED_MODULES
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// The recorder's own module and the runtime's proxy module.
pub const DEFAULT_EXCLUDED_MODULES: [&str; 2] = ["jdk.jfr", "jdk.proxy1"];

/// The default number of low identifier bits left for method id numbers.
pub const DEFAULT_TRACE_ID_SHIFT: u32 = 16;

fn always_valid<T>(_: &T) -> bool {
    true
}

macro_rules! options {
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($name: $type[$validator] = $default),*);
    ];
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        #[derive(Debug, Clone)]
        pub struct Options {
            $(pub $name: $type),*
        }
        impl Options {
            pub fn set_from_str(&mut self, s: &str, val: &str)->bool {
                match s {
                    // Parse the given value from str (by env vars or by calling process()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => panic!("Invalid Options key: {}", s)
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Options {
                    $($name: $default),*
                };

                // If we have env vars that start with TRACETAG_ and match any option (such as TRACETAG_TRACE_ID_SHIFT),
                // we set the option to its value (if it is a valid value). Otherwise, use the default value.
                const PREFIX: &str = "TRACETAG_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}
options! {
    // The epoch a new tagger starts in.
    initial_epoch:     Epoch      [always_valid] = Epoch::Zero,
    // Low identifier bits reserved for method id numbers.
    trace_id_shift:    u32        [|v: &u32| *v >= MIN_TRACE_ID_SHIFT && *v < 64] = DEFAULT_TRACE_ID_SHIFT,
    // The first regular class identifier, before shifting. Lower values are reserved for primitive classes.
    first_class_id:    u64        [|v: &u64| *v > PRIMITIVE_CLASS_IDS] = PRIMITIVE_CLASS_IDS + 1,
    // Should the method tracer accept filters at all?
    method_tracer:     bool       [always_valid] = true,
    // Modules never instrumented by the method tracer.
    excluded_modules:  ModuleList [always_valid] = ModuleList::default(),
}

impl Options {
    /// Set an option by its camel case name, as a binding passes it on its command line.
    pub fn set_from_camelcase_str(&mut self, s: &str, val: &str) -> bool {
        trace!("Trying to process option pair: ({}, {})", s, val);

        let mut sr = String::with_capacity(s.len());
        for c in s.chars() {
            if c.is_uppercase() {
                sr.push('_');
                for c in c.to_lowercase() {
                    sr.push(c);
                }
            } else {
                sr.push(c)
            }
        }

        let result = self.set_from_str(sr.as_str(), val);

        if result {
            trace!("Validation passed");
        } else {
            trace!("Validation failed")
        }
        result
    }
}
