use darling::FromAttributes as _;
use heck::ToKebabCase as _;
use itertools::Itertools as _;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, Generics, Ident, Token, Variant,
    punctuated::Punctuated, spanned::Spanned as _,
};

use crate::generics::check_generics;

#[derive(darling::FromAttributes, Debug)]
#[darling(attributes(muster))]
struct RawParsedValueAttr {
    /// The label shown in help text
    name: Option<String>,
    validate: Option<()>,
}

#[derive(darling::FromAttributes, Debug)]
#[darling(attributes(muster))]
struct RawParsedVariantAttr {
    name: Option<String>,
}

/// The literal that selects this variant
fn variant_name(variant: &Variant) -> syn::Result<(String, &Ident)> {
    match variant.fields {
        Fields::Unit => {
            let attr = RawParsedVariantAttr::from_attributes(&variant.attrs)?;
            let name = attr
                .name
                .unwrap_or_else(|| variant.ident.to_string().to_kebab_case());

            Ok((name, &variant.ident))
        }
        _ => Err(syn::Error::new(
            variant.span(),
            "only unit variants can be derived as values",
        )),
    }
}

fn derive_value_enum(
    ident: &Ident,
    generics: &Generics,
    variants: &Punctuated<Variant, Token![,]>,
    attrs: &[Attribute],
) -> syn::Result<TokenStream2> {
    let attr = RawParsedValueAttr::from_attributes(attrs)?;

    if let Some(()) = attr.validate {
        return Err(syn::Error::new(
            ident.span(),
            "#[muster(validate)] is only supported on newtypes",
        ));
    }

    let label = attr
        .name
        .unwrap_or_else(|| ident.to_string().to_kebab_case());

    let variants: Vec<(String, &Ident)> = variants.iter().map(variant_name).try_collect()?;

    if let Some(((_, first), (name, duplicate))) = variants
        .iter()
        .tuple_combinations()
        .find(|((first, _), (second, _))| first == second)
    {
        let mut err = syn::Error::new(duplicate.span(), format!("duplicate value name {name:?}"));
        err.combine(syn::Error::new(first.span(), "original use here"));
        return Err(err);
    }

    let arms = variants.iter().map(|(name, variant)| {
        quote! {
            #name => ::core::result::Result::Ok(Self::#variant),
        }
    });

    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::muster::value::Scalar for #ident #type_generics #where_clause {
            const KIND: ::muster::value::ScalarKind = ::muster::value::ScalarKind::Custom(#label);

            fn parse_literal(
                literal: &str,
            ) -> ::core::result::Result<Self, ::muster::value::CoercionError> {
                match literal {
                    #(#arms)*
                    _ => ::core::result::Result::Err(::muster::value::CoercionError::invalid(
                        <Self as ::muster::value::Scalar>::KIND,
                        literal,
                    )),
                }
            }
        }
    })
}

fn derive_value_newtype(
    ident: &Ident,
    generics: &Generics,
    field: &Field,
    attrs: &[Attribute],
) -> syn::Result<TokenStream2> {
    let attr = RawParsedValueAttr::from_attributes(attrs)?;
    let ty = &field.ty;

    let (build, access) = match field.ident {
        Some(ref field) => (quote! { |value| Self { #field: value } }, quote! { #field }),
        None => (quote! { Self }, quote! { 0 }),
    };

    let kind = match attr.name {
        Some(label) => quote! { ::muster::value::ScalarKind::Custom(#label) },
        None => quote! { <#ty as ::muster::value::Scalar>::KIND },
    };

    let validate = match attr.validate {
        Some(()) => quote! { <Self as ::muster::unit::Validate>::validate(self) },
        None => quote! { <#ty as ::muster::value::Scalar>::validate(&self.#access) },
    };

    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::muster::value::Scalar for #ident #type_generics #where_clause {
            const KIND: ::muster::value::ScalarKind = #kind;

            fn parse_literal(
                literal: &str,
            ) -> ::core::result::Result<Self, ::muster::value::CoercionError> {
                <#ty as ::muster::value::Scalar>::parse_literal(literal).map(#build)
            }

            fn parse_default(
                literal: &str,
            ) -> ::core::result::Result<Self, ::muster::value::CoercionError> {
                <#ty as ::muster::value::Scalar>::parse_default(literal).map(#build)
            }

            fn validate(&self) -> ::core::result::Result<(), ::muster::value::BoxError> {
                #validate
            }
        }
    })
}

pub fn derive_value_result(item: TokenStream2) -> syn::Result<TokenStream2> {
    let input: DeriveInput = syn::parse2(item)?;
    check_generics(&input.generics)?;

    match input.data {
        Data::Struct(ref data) => {
            let field = data.fields.iter().exactly_one().map_err(|_| {
                syn::Error::new(
                    input.span(),
                    "can only derive `Value` on structs with exactly one field",
                )
            })?;

            derive_value_newtype(&input.ident, &input.generics, field, &input.attrs)
        }
        Data::Enum(ref data) => {
            derive_value_enum(&input.ident, &input.generics, &data.variants, &input.attrs)
        }
        Data::Union(_) => Err(syn::Error::new(
            input.span(),
            "can't derive `Value` on a union",
        )),
    }
}
