use darling::{FromAttributes as _, FromMeta, util::Override};
use heck::ToKebabCase as _;
use itertools::Itertools as _;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::{Attribute, Expr, Field, Ident, Lit, Type, Visibility, spanned::Spanned as _};

pub struct IdentString<'a> {
    raw: &'a Ident,
    string: String,
}

impl<'a> IdentString<'a> {
    pub fn new(ident: &'a Ident) -> Self {
        Self {
            string: ident.to_string(),
            raw: ident,
        }
    }

    pub fn as_str(&self) -> &str {
        self.string.as_str()
    }
}

impl ToTokens for IdentString<'_> {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        self.raw.to_tokens(tokens);
    }
}

/// The text of a tag, however it was spelled: `default = 3`,
/// `default = "3"`, and `short = 'v'` are all recorded as strings.
#[derive(Debug, Clone)]
pub struct TagValue(pub String);

impl FromMeta for TagValue {
    fn from_value(value: &Lit) -> darling::Result<Self> {
        Ok(Self(match *value {
            Lit::Str(ref lit) => lit.value(),
            Lit::Char(ref lit) => lit.value().to_string(),
            Lit::Int(ref lit) => lit.base10_digits().to_owned(),
            Lit::Float(ref lit) => lit.base10_digits().to_owned(),
            Lit::Bool(ref lit) => lit.value.to_string(),
            _ => return Err(darling::Error::unexpected_lit_type(value)),
        }))
    }
}

/// A tag whose presence is all that matters: `ignore`, `ignore = true` and
/// `ignore = "false"` all mean the same thing.
#[derive(Debug, Clone, Copy)]
pub struct Present;

impl FromMeta for Present {
    fn from_word() -> darling::Result<Self> {
        Ok(Self)
    }

    fn from_value(_value: &Lit) -> darling::Result<Self> {
        Ok(Self)
    }

    fn from_expr(_expr: &Expr) -> darling::Result<Self> {
        Ok(Self)
    }
}

/// Render an optional tag as an `Option<&'static str>` expression
pub fn optional_str(value: Option<&TagValue>) -> TokenStream2 {
    match value {
        Some(TagValue(value)) => quote! { ::core::option::Option::Some(#value) },
        None => quote! { ::core::option::Option::None },
    }
}

#[derive(darling::FromAttributes, Debug, Default)]
#[darling(attributes(muster))]
struct RawParsedAttr {
    help: Option<TagValue>,
    default: Option<TagValue>,
    short: Option<TagValue>,
    long: Option<TagValue>,
    name: Option<TagValue>,
    position: Option<TagValue>,
    arg: Option<TagValue>,
    ignore: Option<Present>,
    repeated: Option<Present>,
    flatten: Option<()>,
    subcommand: Option<Override<String>>,
}

impl RawParsedAttr {
    fn is_empty(&self) -> bool {
        self.help.is_none()
            && self.default.is_none()
            && self.short.is_none()
            && self.long.is_none()
            && self.name.is_none()
            && self.position.is_none()
            && self.arg.is_none()
            && self.ignore.is_none()
            && self.repeated.is_none()
            && self.flatten.is_none()
            && self.subcommand.is_none()
    }
}

/// The tags of a single option field, recorded verbatim
pub struct OptionTags {
    pub help: Option<TagValue>,
    pub default: Option<TagValue>,
    pub short: Option<TagValue>,
    pub long: Option<TagValue>,
    pub name: Option<TagValue>,
    pub position: Option<TagValue>,
    pub ignore: bool,
    pub repeated: bool,
}

pub struct OptionFieldInfo<'a> {
    pub ident: IdentString<'a>,
    pub docs: String,
    pub tags: OptionTags,
}

pub struct FlattenFieldInfo<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
}

pub struct SubcommandFieldInfo<'a> {
    pub ident: &'a Ident,
    pub name: String,
}

pub enum ParsedFieldInfo<'a> {
    Option(OptionFieldInfo<'a>),
    Flatten(FlattenFieldInfo<'a>),
    Subcommand(SubcommandFieldInfo<'a>),

    /// Private fields are invisible
    Skip,
}

/// Join a set of `///` comments into a single string, with the leading space
/// of each line removed.
pub fn compute_docs(attrs: &[Attribute]) -> syn::Result<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter_map(|attr| match attr.meta {
            syn::Meta::NameValue(ref meta) => Some(meta),
            _ => None,
        })
        .filter(|meta| meta.path.is_ident("doc"))
        .map(|meta| match meta.value {
            Expr::Lit(ref lit) => match lit.lit {
                Lit::Str(ref lit) => Ok(lit.value()),
                _ => Err(syn::Error::new(meta.span(), "malformed #[doc] attribute")),
            },
            Expr::Macro(ref expr) => Err(syn::Error::new(
                expr.span(),
                "macro #[doc] attributes aren't supported",
            )),
            _ => Err(syn::Error::new(meta.span(), "malformed #[doc] attribute")),
        })
        .map_ok(|doc| doc.strip_prefix(' ').unwrap_or(&doc).trim_end().to_owned())
        .try_collect()?;

    Ok(lines.join("\n").trim().to_owned())
}

impl<'a> ParsedFieldInfo<'a> {
    pub fn from_field(field: &'a Field) -> syn::Result<Self> {
        let parsed = RawParsedAttr::from_attributes(&field.attrs)?;

        let ident = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new(field.span(), "units must be structs with named fields")
        })?;

        if let Some(subcommand) = parsed.subcommand {
            let name = match subcommand {
                Override::Explicit(name) => name,
                Override::Inherit => ident.to_string().trim_start_matches("r#").to_kebab_case(),
            };

            return Ok(Self::Subcommand(SubcommandFieldInfo { ident, name }));
        }

        if matches!(field.vis, Visibility::Inherited) {
            return match parsed.is_empty() {
                true => Ok(Self::Skip),
                false => Err(syn::Error::new(
                    ident.span(),
                    "private fields aren't options; make this field `pub` or remove its #[muster] tags",
                )),
            };
        }

        if let Some(()) = parsed.flatten {
            return Ok(Self::Flatten(FlattenFieldInfo {
                ident,
                ty: &field.ty,
            }));
        }

        let position = match (parsed.position, parsed.arg) {
            (Some(_), Some(arg)) => {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("`position` and `arg` are the same tag; got both (arg = {:?})", arg.0),
                ));
            }
            (position, arg) => position.or(arg),
        };

        Ok(Self::Option(OptionFieldInfo {
            docs: compute_docs(&field.attrs)?,
            ident: IdentString::new(ident),
            tags: OptionTags {
                help: parsed.help,
                default: parsed.default,
                short: parsed.short,
                long: parsed.long,
                name: parsed.name,
                position,
                ignore: parsed.ignore.is_some(),
                repeated: parsed.repeated.is_some(),
            },
        }))
    }
}
