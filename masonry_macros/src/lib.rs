use proc_macro::TokenStream;
use quote::quote;
use syn::{Item, parse_macro_input};

extern crate proc_macro;

/// Marks a plain data record produced by a build run (ledger snapshots,
/// histories, reports) and derives the serde, comparison and debug set every
/// such record carries.
///
/// Works on both structs and enums.
#[proc_macro_attribute]
pub fn record(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as Item);
    match &ast {
        Item::Struct(_) | Item::Enum(_) => {}
        other => {
            return syn::Error::new_spanned(other, "#[record] only applies to structs and enums")
                .to_compile_error()
                .into();
        }
    }

    let expanded = quote! {
        #[derive(
            serde::Serialize,
            serde::Deserialize,
            std::cmp::PartialEq,
            std::cmp::Eq,
            std::fmt::Debug,
            std::clone::Clone
        )]
        #ast
    };

    TokenStream::from(expanded)
}
