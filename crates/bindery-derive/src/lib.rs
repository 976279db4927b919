//! Derive macro for bindery models.
//!
//! `#[derive(Model)]` generates, for a struct with named fields or an enum
//! of unit variants:
//! - `From<T> for Value` and `TryFrom<Value> for T`
//! - `bindery::Typed`, the type hint naming the model
//! - `bindery::Describe`, the catalog entry the retort builds shapes from
//!
//! # Example
//!
//! ```ignore
//! use bindery::Model;
//!
//! #[derive(Model)]
//! #[model(rename = "Account")]
//! struct User {
//!     name: String,
//!     #[model(default)]
//!     tags: Vec<String>,
//! }
//!
//! #[derive(Model)]
//! enum Role {
//!     #[model(value = "admin")]
//!     Admin,
//!     Guest,
//! }
//! ```
//!
//! # Attributes
//!
//! - `#[model(rename = "name")]` on the type: model name in the catalog
//! - `#[model(rename = "id")]` on a field: field id
//! - `#[model(default)]` on a field: missing input falls back to `Default::default()`
//! - `#[model(value = "text")]` or `#[model(value = 1)]` on a variant: the
//!   external value of the member, the variant name otherwise

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Lit, LitStr};

#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let expanded = match expand(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error(),
    };
    expanded.into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model cannot be derived for generic types; describe them with ModelDef",
        ));
    }
    let attrs = ModelAttrs::parse(&input.attrs)?;
    let model_name = attrs.rename.unwrap_or_else(|| input.ident.to_string());

    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => derive_struct(input, &model_name, fields.named.iter().collect()),
            _ => Err(syn::Error::new_spanned(input, "Model needs a struct with named fields")),
        },
        Data::Enum(data) => derive_enum(input, &model_name, data),
        Data::Union(_) => Err(syn::Error::new_spanned(input, "Model cannot be derived for unions")),
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Default)]
struct ModelAttrs {
    rename: Option<String>,
    default: bool,
    value: Option<Lit>,
}

impl ModelAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = ModelAttrs::default();
        for attr in attrs {
            if !attr.path().is_ident("model") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    out.rename = Some(value.value());
                } else if meta.path.is_ident("default") {
                    out.default = true;
                } else if meta.path.is_ident("value") {
                    out.value = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown model attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

// ============================================================================
// Structs
// ============================================================================

struct FieldInfo<'a> {
    ident: &'a syn::Ident,
    id: String,
    ty: &'a syn::Type,
    default: bool,
}

fn derive_struct(input: &DeriveInput, model_name: &str, fields: Vec<&syn::Field>) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let mut infos = Vec::with_capacity(fields.len());
    for f in fields {
        let ident = f
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(f, "expected named field"))?;
        let attrs = ModelAttrs::parse(&f.attrs)?;
        if attrs.value.is_some() {
            return Err(syn::Error::new_spanned(f, "`value` applies to enum variants"));
        }
        infos.push(FieldInfo {
            ident,
            id: attrs.rename.unwrap_or_else(|| ident.to_string()),
            ty: &f.ty,
            default: attrs.default,
        });
    }

    let to_value = infos.iter().map(|f| {
        let (ident, id) = (f.ident, &f.id);
        quote! {
            (::bindery::__private::String::from(#id), ::bindery::Value::from(value.#ident))
        }
    });

    let from_value = infos.iter().map(|f| {
        let (ident, id, ty) = (f.ident, &f.id, f.ty);
        quote! {
            #ident: {
                let field_value = fields
                    .iter()
                    .find(|(name, _)| name == #id)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| ::bindery::ConversionError::MissingField(
                        ::bindery::__private::String::from(#id)
                    ))?;
                <#ty as ::bindery::FromValue>::from_value(field_value)
                    .map_err(|e| ::bindery::ConversionError::FieldError(
                        ::bindery::__private::String::from(#id),
                        ::bindery::__private::Box::new(e),
                    ))?
            }
        }
    });

    let field_defs = infos.iter().map(|f| {
        let (id, ty) = (&f.id, f.ty);
        let def = quote! {
            ::bindery::FieldDef::new(#id, <#ty as ::bindery::Typed>::type_hint())
        };
        if f.default {
            quote! {
                #def.default_factory(|| ::bindery::Value::from(<#ty as ::bindery::__private::Default>::default()))
            }
        } else {
            def
        }
    });

    let field_types = infos.iter().map(|f| f.ty);

    Ok(quote! {
        impl ::bindery::__private::From<#name> for ::bindery::Value {
            fn from(value: #name) -> ::bindery::Value {
                ::bindery::Value::Record {
                    type_name: ::bindery::__private::String::from(#model_name),
                    fields: ::bindery::__private::vec![#(#to_value),*],
                }
            }
        }

        impl ::bindery::__private::TryFrom<::bindery::Value> for #name {
            type Error = ::bindery::ConversionError;

            fn try_from(value: ::bindery::Value) -> ::bindery::__private::Result<Self, Self::Error> {
                match value {
                    ::bindery::Value::Record { type_name, fields } if type_name == #model_name => {
                        ::bindery::__private::Ok(Self { #(#from_value),* })
                    }
                    ::bindery::Value::Record { type_name, .. } => {
                        ::bindery::__private::Err(::bindery::ConversionError::WrongRecord {
                            expected: ::bindery::__private::String::from(#model_name),
                            got: type_name,
                        })
                    }
                    other => ::bindery::__private::Err(::bindery::ConversionError::TypeMismatch {
                        expected: ::bindery::__private::String::from(#model_name),
                        got: other.kind(),
                    }),
                }
            }
        }

        impl ::bindery::Typed for #name {
            fn type_hint() -> ::bindery::TypeHint {
                ::bindery::TypeHint::model(#model_name)
            }

            fn collect_entries(entries: &mut ::bindery::__private::Vec<::bindery::CatalogEntry>) {
                if ::bindery::typed::push_entry::<Self>(entries) {
                    #(<#field_types as ::bindery::Typed>::collect_entries(entries);)*
                }
            }
        }

        impl ::bindery::Describe for #name {
            fn describe() -> ::bindery::CatalogEntry {
                ::bindery::CatalogEntry::Model(
                    ::bindery::ModelDef::new(#model_name)
                        #(.field(#field_defs))*
                )
            }
        }
    })
}

// ============================================================================
// Enums
// ============================================================================

fn derive_enum(input: &DeriveInput, model_name: &str, data: &syn::DataEnum) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(variant, "Model enums may only have unit variants"));
        }
        let attrs = ModelAttrs::parse(&variant.attrs)?;
        let member = attrs.rename.unwrap_or_else(|| variant.ident.to_string());
        let value = match attrs.value {
            None => quote! { #member },
            Some(Lit::Str(s)) => quote! { #s },
            Some(Lit::Int(n)) => quote! { #n as i64 },
            Some(Lit::Bool(b)) => quote! { #b },
            Some(other) => return Err(syn::Error::new_spanned(other, "member values are strings, integers or booleans")),
        };
        variants.push((&variant.ident, member, value));
    }

    let to_value = variants.iter().map(|(ident, member, _)| {
        quote! { #name::#ident => #member }
    });
    let from_value = variants.iter().map(|(ident, member, _)| {
        quote! { #member => ::bindery::__private::Ok(#name::#ident) }
    });
    let members = variants.iter().map(|(_, member, value)| {
        quote! { .member(#member, #value) }
    });

    Ok(quote! {
        impl ::bindery::__private::From<#name> for ::bindery::Value {
            fn from(value: #name) -> ::bindery::Value {
                let member = match value {
                    #(#to_value),*
                };
                ::bindery::Value::Enum {
                    type_name: ::bindery::__private::String::from(#model_name),
                    member: ::bindery::__private::String::from(member),
                }
            }
        }

        impl ::bindery::__private::TryFrom<::bindery::Value> for #name {
            type Error = ::bindery::ConversionError;

            fn try_from(value: ::bindery::Value) -> ::bindery::__private::Result<Self, Self::Error> {
                match value {
                    ::bindery::Value::Enum { type_name, member } if type_name == #model_name => {
                        match member.as_str() {
                            #(#from_value,)*
                            _ => ::bindery::__private::Err(::bindery::ConversionError::UnknownMember {
                                type_name,
                                member,
                            }),
                        }
                    }
                    other => ::bindery::__private::Err(::bindery::ConversionError::TypeMismatch {
                        expected: ::bindery::__private::String::from(#model_name),
                        got: other.kind(),
                    }),
                }
            }
        }

        impl ::bindery::Typed for #name {
            fn type_hint() -> ::bindery::TypeHint {
                ::bindery::TypeHint::model(#model_name)
            }

            fn collect_entries(entries: &mut ::bindery::__private::Vec<::bindery::CatalogEntry>) {
                ::bindery::typed::push_entry::<Self>(entries);
            }
        }

        impl ::bindery::Describe for #name {
            fn describe() -> ::bindery::CatalogEntry {
                ::bindery::CatalogEntry::Enum(::bindery::EnumDef::new(#model_name) #(#members)*)
            }
        }
    })
}
