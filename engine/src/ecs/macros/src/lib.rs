mod component;

use proc_macro::TokenStream;

/// Derive `rusty_ecs::ecs::Component` for a struct.
///
/// Every named field becomes an attribute, named after the field in PascalCase with a FourCC
/// taken from the first four letters of that name. Field options:
///
/// - `#[attribute(fourcc = "RANG")]` sets the code explicitly.
/// - `#[attribute(skip)]` keeps the field out of the attribute table.
///
/// The component name defaults to the struct name and can be set with
/// `#[component(name = "SpotLight")]`.
#[proc_macro_derive(Component, attributes(component, attribute))]
pub fn derive_component(item: TokenStream) -> TokenStream {
    component::derive_component(item)
}
