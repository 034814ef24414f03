use darling::FromAttributes as _;
use itertools::Itertools as _;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, DeriveInput, Field, Generics, Ident, Token, punctuated::Punctuated,
    spanned::Spanned as _,
};

use crate::{
    common::{
        FlattenFieldInfo, OptionFieldInfo, ParsedFieldInfo, SubcommandFieldInfo, compute_docs,
        optional_str,
    },
    generics::check_generics,
};

/// The capabilities a type declares it implements by hand
#[derive(darling::FromAttributes, Debug)]
#[darling(attributes(muster))]
struct RawParsedTypeAttr {
    group: Option<()>,
    command: Option<()>,
    simple: Option<()>,
    clap: Option<()>,
    validate: Option<()>,
    defaults: Option<()>,
    help: Option<()>,
    short_help: Option<()>,
}

fn describe_field(field: &ParsedFieldInfo<'_>) -> TokenStream2 {
    match *field {
        ParsedFieldInfo::Option(OptionFieldInfo {
            ref ident,
            ref docs,
            ref tags,
        }) => {
            let ident = ident.as_str();
            let name = optional_str(tags.name.as_ref());
            let help = optional_str(tags.help.as_ref());
            let default = optional_str(tags.default.as_ref());
            let short = optional_str(tags.short.as_ref());
            let long = optional_str(tags.long.as_ref());
            let position = optional_str(tags.position.as_ref());
            let ignore = tags.ignore;
            let repeated = tags.repeated;

            quote! {
                fields.push(::muster::descriptor::FieldMeta {
                    ident: #ident,
                    docs: #docs,
                    tags: ::muster::descriptor::Tags {
                        name: #name,
                        help: #help,
                        default: #default,
                        short: #short,
                        long: #long,
                        position: #position,
                        ignore: #ignore,
                        repeated: #repeated,
                    },
                });
            }
        }
        ParsedFieldInfo::Flatten(FlattenFieldInfo { ident, ty }) => quote! {
            <#ty as ::muster::descriptor::Fields>::describe(&self.#ident, fields);
        },
        ParsedFieldInfo::Subcommand(_) | ParsedFieldInfo::Skip => TokenStream2::new(),
    }
}

fn count_field(field: &ParsedFieldInfo<'_>) -> Option<TokenStream2> {
    match *field {
        ParsedFieldInfo::Option(_) => Some(quote! { 1 }),
        ParsedFieldInfo::Flatten(FlattenFieldInfo { ident, ty }) => Some(quote! {
            <#ty as ::muster::descriptor::Fields>::field_count(&self.#ident)
        }),
        ParsedFieldInfo::Subcommand(_) | ParsedFieldInfo::Skip => None,
    }
}

/// One step of the index countdown in `field` / `field_mut`: either this
/// field is the target, or its width is subtracted from `index`.
fn index_step(field: &ParsedFieldInfo<'_>, mutable: bool) -> TokenStream2 {
    let (reference, getter) = match mutable {
        true => (quote! { &mut }, quote! { field_mut }),
        false => (quote! { & }, quote! { field }),
    };

    match *field {
        ParsedFieldInfo::Option(OptionFieldInfo {
            ref ident,
            ref tags,
            ..
        }) => {
            let target = match tags.ignore {
                true => quote! { ::core::option::Option::None },
                false => quote! {
                    ::core::option::Option::Some(
                        #reference self.#ident as #reference dyn ::muster::value::Value
                    )
                },
            };

            quote! {
                if index == 0 {
                    return #target;
                }
                let index = index - 1;
            }
        }
        ParsedFieldInfo::Flatten(FlattenFieldInfo { ident, ty }) => quote! {
            let count = <#ty as ::muster::descriptor::Fields>::field_count(&self.#ident);
            if index < count {
                return <#ty as ::muster::descriptor::Fields>::#getter(#reference self.#ident, index);
            }
            let index = index - count;
        },
        ParsedFieldInfo::Subcommand(_) | ParsedFieldInfo::Skip => TokenStream2::new(),
    }
}

/// The group's own slot for this field, in the same walk order as `Fields`
fn group_slot(field: &ParsedFieldInfo<'_>) -> Option<TokenStream2> {
    match *field {
        ParsedFieldInfo::Option(OptionFieldInfo { ref tags, .. }) if tags.ignore => {
            Some(quote! { .ignored() })
        }
        ParsedFieldInfo::Option(OptionFieldInfo { ref ident, .. }) => {
            Some(quote! { .value(&mut self.#ident) })
        }
        ParsedFieldInfo::Flatten(FlattenFieldInfo { ident, .. }) => {
            Some(quote! { .nested(&mut self.#ident) })
        }
        ParsedFieldInfo::Subcommand(_) | ParsedFieldInfo::Skip => None,
    }
}

fn group_implementation(
    name: &Ident,
    generics: &Generics,
    fields: &[ParsedFieldInfo<'_>],
    subcommands: &[&SubcommandFieldInfo<'_>],
) -> TokenStream2 {
    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    let slots = fields.iter().filter_map(group_slot);
    let entries = subcommands.iter().map(|&&SubcommandFieldInfo { ident, ref name }| {
        quote! { .add(#name, &mut self.#ident) }
    });

    quote! {
        impl #impl_generics ::muster::unit::Group for #name #type_generics #where_clause {
            fn subcommands(&mut self) -> ::muster::unit::Subcommands<'_> {
                ::muster::unit::Subcommands::new()
                    .fields(::muster::unit::GroupFields::new() #(#slots)*)
                    #(#entries)*
            }
        }
    }
}

fn help_implementation(name: &Ident, generics: &Generics, docs: &str) -> TokenStream2 {
    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics ::muster::unit::Help for #name #type_generics #where_clause {
            fn help(&self) -> &str {
                #docs
            }
        }
    }
}

/// An `as_*` method that hands out `self` as the capability trait `tr`
fn capability(
    enabled: bool,
    method: TokenStream2,
    receiver: TokenStream2,
    tr: TokenStream2,
) -> Option<TokenStream2> {
    enabled.then(|| {
        quote! {
            #[inline]
            fn #method(#receiver self) -> ::core::option::Option<#receiver dyn #tr> {
                ::core::option::Option::Some(self)
            }
        }
    })
}

pub fn derive_unit_struct(
    name: &Ident,
    fields: &Punctuated<Field, Token![,]>,
    generics: &Generics,
    attrs: &[Attribute],
) -> syn::Result<TokenStream2> {
    let attr = RawParsedTypeAttr::from_attributes(attrs)?;
    let docs = compute_docs(attrs)?;

    let fields: Vec<ParsedFieldInfo> = fields
        .iter()
        .map(ParsedFieldInfo::from_field)
        .try_collect()?;

    let subcommands: Vec<&SubcommandFieldInfo> = fields
        .iter()
        .filter_map(|field| match field {
            ParsedFieldInfo::Subcommand(info) => Some(info),
            _ => None,
        })
        .collect();

    if let (Some(first), Some(())) = (subcommands.first(), attr.group) {
        return Err(syn::Error::new(
            first.ident.span(),
            "a struct with #[muster(subcommand)] fields gets a generated `Group`; \
             remove #[muster(group)] or the subcommand tags",
        ));
    }

    if let Some((first, duplicate)) = subcommands
        .iter()
        .tuple_combinations()
        .find(|(first, second)| first.name == second.name)
    {
        let mut err = syn::Error::new(
            duplicate.ident.span(),
            format!("duplicate subcommand name {:?}", duplicate.name),
        );
        err.combine(syn::Error::new(first.ident.span(), "original use here"));
        return Err(err);
    }

    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    let describe = fields.iter().map(describe_field);
    let counts = fields.iter().filter_map(count_field);
    let field_steps = fields.iter().map(|field| index_step(field, false));
    let field_mut_steps = fields.iter().map(|field| index_step(field, true));

    let fields_impl = quote! {
        impl #impl_generics ::muster::descriptor::Fields for #name #type_generics #where_clause {
            fn describe(&self, fields: &mut ::std::vec::Vec<::muster::descriptor::FieldMeta>) {
                #(#describe)*
            }

            fn field_count(&self) -> usize {
                0 #(+ #counts)*
            }

            fn field(&self, index: usize) -> ::core::option::Option<&dyn ::muster::value::Value> {
                #(#field_steps)*
                let _ = index;
                ::core::option::Option::None
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<&mut dyn ::muster::value::Value> {
                #(#field_mut_steps)*
                let _ = index;
                ::core::option::Option::None
            }
        }
    };

    let is_group = attr.group.is_some() || !subcommands.is_empty();
    let has_help = attr.help.is_some() || !docs.is_empty();

    let capabilities = [
        capability(is_group, quote! { as_group }, quote! { &mut }, quote! { ::muster::unit::Group }),
        capability(
            attr.command.is_some(),
            quote! { as_command },
            quote! { &mut },
            quote! { ::muster::unit::Command },
        ),
        capability(
            attr.simple.is_some(),
            quote! { as_simple_command },
            quote! { &mut },
            quote! { ::muster::unit::SimpleCommand },
        ),
        capability(
            attr.clap.is_some(),
            quote! { as_clap_command },
            quote! { &mut },
            quote! { ::muster::unit::ClapCommand },
        ),
        capability(
            attr.validate.is_some(),
            quote! { as_validate },
            quote! { & },
            quote! { ::muster::unit::Validate },
        ),
        capability(
            attr.defaults.is_some(),
            quote! { as_defaults },
            quote! { &mut },
            quote! { ::muster::unit::Defaults },
        ),
        capability(has_help, quote! { as_help }, quote! { & }, quote! { ::muster::unit::Help }),
        capability(
            attr.short_help.is_some(),
            quote! { as_short_help },
            quote! { & },
            quote! { ::muster::unit::ShortHelp },
        ),
    ];

    let capabilities = capabilities.into_iter().flatten();

    let unit_impl = quote! {
        impl #impl_generics ::muster::unit::Unit for #name #type_generics #where_clause {
            #(#capabilities)*
        }
    };

    let group_impl = (!subcommands.is_empty())
        .then(|| group_implementation(name, generics, &fields, &subcommands));

    let help_impl = (attr.help.is_none() && !docs.is_empty())
        .then(|| help_implementation(name, generics, &docs));

    Ok(quote! {
        #fields_impl
        #unit_impl
        #group_impl
        #help_impl
    })
}

pub fn derive_unit_result(item: TokenStream2) -> syn::Result<TokenStream2> {
    let input: DeriveInput = syn::parse2(item)?;
    check_generics(&input.generics)?;
    let no_fields = Punctuated::new();

    match input.data {
        syn::Data::Struct(ref data) => derive_unit_struct(
            &input.ident,
            match data.fields {
                syn::Fields::Named(ref fields) => &fields.named,
                syn::Fields::Unnamed(_) => {
                    return Err(syn::Error::new(
                        input.span(),
                        "units must be structs with named fields",
                    ));
                }
                syn::Fields::Unit => &no_fields,
            },
            &input.generics,
            &input.attrs,
        ),
        syn::Data::Enum(_) | syn::Data::Union(_) => Err(syn::Error::new(
            input.span(),
            "only structures can be commands",
        )),
    }
}
