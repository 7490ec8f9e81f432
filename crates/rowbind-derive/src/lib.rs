use proc_macro::TokenStream;

mod bindable;

/// Derive `rowbind::types::Bindable` for a struct with named fields.
///
/// By default the type gets one constructor, `new`, taking every field in
/// declaration order. With `#[bindable(fields)]` the type is default
/// initialized instead and every field is written as a member.
///
/// Container attributes: `path = "..."`, `fields`.
/// Field attributes: `name = "..."`, `default = <expr>`, `skip`.
#[proc_macro_derive(Bindable, attributes(bindable))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    bindable::derive_bindable(input.into()).into()
}
