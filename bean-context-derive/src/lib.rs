//! Derive macros for bean-context
//!
//! - `#[derive(Configuration)]` - implement `Configurable` so the struct can be
//!   bound from properties as a configuration bean
//!
//! # Example
//!
//! ```rust,ignore
//! use bean_context::{BeanDefinition, Configuration};
//!
//! #[derive(Default, Configuration)]
//! #[configuration(prefix = "server", default)]
//! struct ServerConfig {
//!     host: String,
//!     port: u16,
//!     #[configuration(rename = "max-connections")]
//!     max_connections: Option<u32>,
//!     #[configuration(nested)]
//!     tls: Option<TlsConfig>,
//!     #[configuration(skip)]
//!     started: bool,
//! }
//!
//! #[derive(Default, Configuration)]
//! #[configuration(default)]
//! struct TlsConfig {
//!     enabled: bool,
//!     certificate: String,
//! }
//!
//! let bean = BeanDefinition::<ServerConfig>::configuration();
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr, Type};

/// Derive `bean_context::Configurable`.
///
/// # Struct attributes
///
/// - `#[configuration(prefix = "server")]` - prefix used when bound as a bean
/// - `#[configuration(default)]` - the type may be built with `Default` when it
///   appears as an absent optional nested field
///
/// # Field attributes
///
/// - `#[configuration(nested)]` - the field is itself `Configurable` (or an
///   `Option` of one) and is bound below `prefix.field`
/// - `#[configuration(rename = "key")]` - property name for the field
/// - `#[configuration(skip)]` - never bind the field
///
/// Other fields must implement `bean_context::Scalar`.
#[proc_macro_derive(Configuration, attributes(configuration))]
pub fn derive_configuration(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Configuration can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Configuration can only be derived for structs",
            ));
        }
    };

    let options = StructOptions::parse(&input.attrs)?;

    let mut bindings = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let options = FieldOptions::parse(&field.attrs)?;
        if options.skip {
            continue;
        }

        let key = options.rename.unwrap_or_else(|| ident.to_string());
        let binding = if !options.nested {
            quote! { binder.scalar(&mut self.#ident, prefix, #key); }
        } else if is_option(&field.ty) {
            quote! { binder.nested_optional(&mut self.#ident, prefix, #key); }
        } else {
            quote! { binder.nested(&mut self.#ident, prefix, #key); }
        };
        bindings.push(binding);
    }

    let prefix_fn = options.prefix.map(|prefix| {
        quote! {
            fn prefix() -> &'static str {
                #prefix
            }
        }
    });

    let instantiate_fn = options.default.then(|| {
        quote! {
            fn instantiate() -> ::std::option::Option<Self> {
                ::std::option::Option::Some(::std::default::Default::default())
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::bean_context::Configurable for #name #ty_generics #where_clause {
            #prefix_fn

            fn bind(&mut self, binder: &mut ::bean_context::Binder<'_>, prefix: &str) {
                #(#bindings)*
            }

            #instantiate_fn
        }
    })
}

#[derive(Default)]
struct StructOptions {
    prefix: Option<String>,
    default: bool,
}

impl StructOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("configuration")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("prefix") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.prefix = Some(value.value());
                    Ok(())
                } else if meta.path.is_ident("default") {
                    options.default = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `prefix = \"...\"` or `default`"))
                }
            })?;
        }
        Ok(options)
    }
}

#[derive(Default)]
struct FieldOptions {
    nested: bool,
    skip: bool,
    rename: Option<String>,
}

impl FieldOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("configuration")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("nested") {
                    options.nested = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    options.skip = true;
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.rename = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `nested`, `skip` or `rename = \"...\"`"))
                }
            })?;
        }
        Ok(options)
    }
}

/// Whether the type is spelled `Option<...>`
fn is_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option"
                && matches!(segment.arguments, syn::PathArguments::AngleBracketed(_));
        }
    }
    false
}
