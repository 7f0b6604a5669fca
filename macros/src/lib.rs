extern crate proc_macro;
extern crate proc_macro_error;
extern crate quote;
extern crate syn;

use proc_macro::TokenStream;
use proc_macro_error::proc_macro_error;
use syn::parse_macro_input;
use syn::DeriveInput;

mod traceable_impl;
mod util;

const DEBUG_MACRO_OUTPUT: bool = false;

/// A runtime metadata kind needs to add these attributes in order to become traceable. The macro
/// generates an implementation of `tracetag::Traceable` whose only required method returns the
/// embedded extension; every other accessor comes from the trait's provided methods.
/// * add `#[derive(Traceable)]` to the struct.
/// * add `#[trace_extension]` to exactly one field of type `tracetag::TraceExtension`.
#[proc_macro_error]
#[proc_macro_derive(Traceable, attributes(trace_extension))]
pub fn derive_traceable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let output = traceable_impl::derive(input);

    // Debug the output - use the following code to debug the generated code (when cargo exapand is not working)
    if DEBUG_MACRO_OUTPUT {
        use quote::ToTokens;
        println!("{}", output.to_token_stream());
    }

    output.into()
}
