use proc_macro::TokenStream;
use proc_macro2::Literal;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Fields, Ident, LitStr, Type, ext::IdentExt, parse_macro_input,
};

/// One field exposed as a component attribute.
struct Field {
    ident: Ident,
    ty: Type,
    name: String,
    fourcc: String,
}

pub fn derive_component(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    match expand(&ast) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(ast: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    // Get the struct name we are annotating
    let struct_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let name = component_name(ast)?;
    let fields = attribute_fields(ast)?;

    let names = fields.iter().map(|f| &f.name);
    let codes = fields
        .iter()
        .map(|f| Literal::byte_string(f.fourcc.as_bytes()));
    let kinds = fields.iter().map(|f| &f.ty);
    let get_indices = (0..fields.len()).map(Literal::usize_unsuffixed);
    let set_indices = (0..fields.len()).map(Literal::usize_unsuffixed);
    let get_idents = fields.iter().map(|f| &f.ident);
    let set_idents = fields.iter().map(|f| &f.ident);
    let set_tys = fields.iter().map(|f| &f.ty);

    // Use ::rusty_ecs paths which work both inside and outside the crate.
    // Inside the crate, this works because of `extern crate self as rusty_ecs;` in lib.rs
    // Outside the crate, this naturally resolves to the rusty_ecs dependency.
    Ok(quote! {
        impl #impl_generics ::rusty_ecs::ecs::component::Component for #struct_name #ty_generics #where_clause {
            const NAME: &'static str = #name;

            const ATTRIBUTES: &'static [::rusty_ecs::ecs::attribute::Definition] = &[
                #(
                    ::rusty_ecs::ecs::attribute::Definition::new(
                        #names,
                        ::rusty_ecs::ecs::attribute::FourCC::new(*#codes),
                        <#kinds as ::rusty_ecs::ecs::attribute::Attribute>::KIND,
                    ),
                )*
            ];

            fn attribute(&self, index: usize) -> ::core::option::Option<::rusty_ecs::ecs::attribute::Value> {
                match index {
                    #(
                        #get_indices => ::core::option::Option::Some(
                            ::rusty_ecs::ecs::attribute::Attribute::to_value(&self.#get_idents),
                        ),
                    )*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_attribute(
                &mut self,
                index: usize,
                value: ::rusty_ecs::ecs::attribute::Value,
            ) -> ::rusty_ecs::ecs::error::Result<()> {
                match index {
                    #(
                        #set_indices => {
                            self.#set_idents =
                                <#set_tys as ::rusty_ecs::ecs::attribute::Attribute>::from_value(value)?;
                            ::core::result::Result::Ok(())
                        }
                    )*
                    _ => {
                        let _ = value;
                        ::core::result::Result::Err(::rusty_ecs::ecs::error::Error::AttributeIndex(index))
                    }
                }
            }
        }
    })
}

/// Read `#[component(name = "...")]`, defaulting to the struct name.
fn component_name(ast: &DeriveInput) -> syn::Result<String> {
    let mut name = ast.ident.unraw().to_string();
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("component")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = lit.value();
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

/// Collect the named fields that take part in the attribute table.
fn attribute_fields(ast: &DeriveInput) -> syn::Result<Vec<Field>> {
    let named = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            // Tuple and unit structs carry no named attributes.
            Fields::Unnamed(_) | Fields::Unit => Vec::new(),
        },
        _ => {
            return Err(Error::new_spanned(
                &ast.ident,
                "Component can only be derived for structs",
            ));
        }
    };

    let mut fields: Vec<Field> = Vec::new();
    for field in named {
        let Some(ident) = &field.ident else {
            continue;
        };

        let mut skip = false;
        let mut fourcc = None;
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("attribute")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else if meta.path.is_ident("fourcc") {
                    let lit: LitStr = meta.value()?.parse()?;
                    let code = lit.value();
                    if code.len() != 4 || !code.is_ascii() {
                        return Err(Error::new_spanned(
                            &lit,
                            "fourcc must be exactly four ASCII characters",
                        ));
                    }
                    fourcc = Some(code);
                    Ok(())
                } else {
                    Err(meta.error("expected `skip` or `fourcc = \"XXXX\"`"))
                }
            })?;
        }
        if skip {
            continue;
        }

        let name = pascal_case(&ident.unraw().to_string());
        let fourcc = match fourcc {
            Some(fourcc) => fourcc,
            None if name.is_ascii() => fourcc_from_name(&name),
            None => {
                return Err(Error::new_spanned(
                    ident,
                    "non-ASCII field names need an explicit `fourcc`",
                ));
            }
        };
        if let Some(previous) = fields.iter().find(|f| f.fourcc == fourcc) {
            return Err(Error::new_spanned(
                ident,
                format!(
                    "attribute code `{}` is already used by field `{}`",
                    fourcc, previous.ident
                ),
            ));
        }

        fields.push(Field {
            ident: ident.clone(),
            ty: field.ty.clone(),
            name,
            fourcc,
        });
    }
    Ok(fields)
}

/// `cast_shadows` -> `CastShadows`.
fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// First four characters of the name, upper-cased and space padded. Matches
/// `FourCC::from_name`.
fn fourcc_from_name(name: &str) -> String {
    let mut code: String = name
        .chars()
        .take(4)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while code.len() < 4 {
        code.push(' ');
    }
    code
}
