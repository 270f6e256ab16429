//! Derive macros for types that carry secret lattice material.
//!
//! Secret keys, NTRU bases and sampling trees must never end up in a log line or a panic
//! message. The derives in this crate produce formatting impls that print a fixed placeholder
//! naming the type, and nothing else.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

// HELPERS
// ================================================================================================

/// Builds an impl of the given `core::fmt` trait that writes `<elided secret for Name>`.
fn elided_fmt_impl(ast: &DeriveInput, fmt_trait: TokenStream2) -> TokenStream {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics #fmt_trait for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(concat!("<elided secret for ", stringify!(#name), ">"))
            }
        }
    };

    TokenStream::from(expanded)
}

// SILENT DEBUG
// ================================================================================================

/// Derives `Debug` so that it prints `<elided secret for TypeName>` instead of field values.
///
/// ```ignore
/// #[derive(SilentDebug)]
/// pub struct SecretKey {
///     basis: NtruBasis,
/// }
///
/// assert_eq!(format!("{sk:?}"), "<elided secret for SecretKey>");
/// ```
#[proc_macro_derive(SilentDebug)]
pub fn silent_debug(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    elided_fmt_impl(&ast, quote!(::core::fmt::Debug))
}

// SILENT DISPLAY
// ================================================================================================

/// Derives `Display` with the same placeholder as [`SilentDebug`](macro@SilentDebug).
///
/// Useful in generic contexts that require `Display` (error reports, CLI output) without
/// exposing the wrapped secret.
#[proc_macro_derive(SilentDisplay)]
pub fn silent_display(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    elided_fmt_impl(&ast, quote!(::core::fmt::Display))
}
