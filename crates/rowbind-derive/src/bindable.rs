use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Error, Expr, Field, Fields, LitStr, Type};

///
/// ContainerArgs
///

#[derive(Default)]
struct ContainerArgs {
    path: Option<LitStr>,
    fields: bool,
}

///
/// FieldArgs
///

#[derive(Default)]
struct FieldArgs {
    name: Option<LitStr>,
    default: Option<Expr>,
    skip: bool,
}

///
/// Slot
/// One field that takes part in binding.
///

struct Slot<'a> {
    ident: &'a syn::Ident,
    ty: &'a Type,
    name: String,
    default: Option<Expr>,
}

// derive_bindable
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    match expand(input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: TokenStream) -> Result<TokenStream, Error> {
    let input: DeriveInput = syn::parse2(input)?;
    let ident = &input.ident;

    // statics inside generic functions are shared by every instantiation
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Bindable cannot be derived for generic types",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            ident,
            "Bindable can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &data.fields,
            "Bindable can only be derived for structs with named fields",
        ));
    };

    let container = container_args(&input.attrs)?;
    let mut slots = Vec::new();
    let mut skipped = Vec::new();
    for field in &named.named {
        let args = field_args(field)?;
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;

        if args.skip {
            skipped.push(field_ident);
            continue;
        }

        slots.push(Slot {
            ident: field_ident,
            ty: &field.ty,
            name: args
                .name
                .map_or_else(|| field_ident.to_string(), |name| name.value()),
            default: args.default,
        });
    }

    let path = container.path.map_or_else(
        || {
            let name = ident.to_string();
            quote!(concat!(module_path!(), "::", #name))
        },
        |path| quote!(#path),
    );

    let body = if container.fields {
        if let Some(slot) = slots.iter().find(|slot| slot.default.is_some()) {
            return Err(Error::new_spanned(
                slot.ident,
                "`default` only applies to constructor parameters; remove `fields` or the default",
            ));
        }
        member_body(&slots)
    } else {
        constructor_body(&slots, &skipped)
    };

    Ok(quote! {
        impl ::rowbind::types::Bindable for #ident {
            fn type_ref() -> ::rowbind::types::TypeRef {
                static TYPE: ::std::sync::OnceLock<::rowbind::types::TypeRef> =
                    ::std::sync::OnceLock::new();

                TYPE.get_or_init(|| {
                    ::rowbind::types::TypeDescriptor::builder::<Self>(#path)
                        #body
                        .into_type_ref()
                })
                .clone()
            }

            fn from_value(
                _: ::rowbind::value::Value,
            ) -> ::std::result::Result<Self, ::rowbind::types::FromValueError> {
                ::std::result::Result::Err(::rowbind::types::FromValueError::not_scalar::<Self>())
            }
        }
    })
}

fn constructor_body(slots: &[Slot<'_>], skipped: &[&syn::Ident]) -> TokenStream {
    let params = slots.iter().map(|slot| {
        let ty = slot.ty;
        let name = &slot.name;
        let default = slot
            .default
            .as_ref()
            .map(|expr| quote!(.with_default(#expr)));

        quote! {
            ::rowbind::types::ParamDescriptor::of::<#ty>(#name) #default
        }
    });
    let takes = slots.iter().map(|slot| {
        let ident = slot.ident;
        quote!(#ident: args.take()?)
    });
    let defaults = skipped.iter().map(|ident| {
        quote!(#ident: ::std::default::Default::default())
    });
    let args = if slots.is_empty() {
        quote!(_)
    } else {
        quote!(args)
    };

    quote! {
        .constructor("new", ::std::vec![#(#params),*], |#args| {
            ::std::result::Result::Ok(Self {
                #(#takes,)*
                #(#defaults,)*
            })
        })
    }
}

fn member_body(slots: &[Slot<'_>]) -> TokenStream {
    let members = slots.iter().map(|slot| {
        let ident = slot.ident;
        let ty = slot.ty;
        let name = &slot.name;

        quote! {
            .field::<#ty, _>(#name, |target: &mut Self, value| target.#ident = value)
        }
    });

    quote! {
        .value_type()
        #(#members)*
    }
}

fn container_args(attrs: &[Attribute]) -> Result<ContainerArgs, Error> {
    let mut args = ContainerArgs::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("bindable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("path") {
                args.path = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("fields") {
                args.fields = true;
                Ok(())
            } else {
                Err(meta.error("unsupported bindable attribute; expected `path` or `fields`"))
            }
        })?;
    }

    Ok(args)
}

fn field_args(field: &Field) -> Result<FieldArgs, Error> {
    let mut args = FieldArgs::default();

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("bindable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("default") {
                args.default = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("skip") {
                args.skip = true;
                Ok(())
            } else {
                Err(meta.error(
                    "unsupported bindable attribute; expected `name`, `default` or `skip`",
                ))
            }
        })?;
    }

    if args.skip && (args.name.is_some() || args.default.is_some()) {
        return Err(Error::new_spanned(
            field,
            "a skipped field cannot also be renamed or defaulted",
        ));
    }

    Ok(args)
}
