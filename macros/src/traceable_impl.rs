use proc_macro2::TokenStream as TokenStream2;
use proc_macro_error::abort_call_site;
use quote::quote;
use syn::DeriveInput;

use crate::util;

pub(crate) fn derive(input: DeriveInput) -> TokenStream2 {
    let ident = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let syn::Data::Struct(syn::DataStruct {
        fields: syn::Fields::Named(ref fields),
        ..
    }) = input.data
    else {
        abort_call_site!("`#[derive(Traceable)]` only supports structs with named fields.");
    };

    let Some(extension) = util::get_unique_field_with_attribute(fields, "trace_extension") else {
        abort_call_site!("`#[derive(Traceable)]` needs one field marked with #[trace_extension].");
    };
    let f_ident = extension.ident.as_ref().unwrap();

    quote! {
        impl #impl_generics ::tracetag::Traceable for #ident #ty_generics #where_clause {
            #[inline(always)]
            fn trace_extension(&self) -> &::tracetag::TraceExtension {
                &self.#f_ident
            }
        }
    }
}
