use syn::{Generics, spanned::Spanned};

/// Units and values can borrow, but they can't be generic over types: every
/// field needs a concrete kind.
pub fn check_generics(generics: &Generics) -> syn::Result<()> {
    if let Some(param) = generics.const_params().next() {
        return Err(syn::Error::new(
            param.span(),
            "const generics aren't (yet) supported by muster",
        ));
    }

    if let Some(param) = generics.type_params().next() {
        return Err(syn::Error::new(
            param.span(),
            "generic types aren't (yet) supported by muster",
        ));
    }

    Ok(())
}
