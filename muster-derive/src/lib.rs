mod common;
mod generics;
mod unit;
mod value;

use proc_macro::TokenStream;

/// Derive `Fields` and `Unit` for a struct. See the `muster` crate docs for
/// the `#[muster(...)]` vocabulary.
#[proc_macro_derive(Unit, attributes(muster))]
pub fn derive_unit(item: TokenStream) -> TokenStream {
    match unit::derive_unit_result(item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derive `Scalar` for a unit-variant enum (each variant is one literal) or
/// for a single-field newtype (parsing is delegated to the field).
#[proc_macro_derive(Value, attributes(muster))]
pub fn derive_value(item: TokenStream) -> TokenStream {
    match value::derive_value_result(item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
