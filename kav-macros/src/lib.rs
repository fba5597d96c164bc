use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::Parse;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Path, Type};

/// Derives an async `execute()` method that routes each command variant to
/// its handler.
///
/// # Usage
///
/// ```ignore
/// #[derive(CommandRouter)]
/// #[router(state = AppState)]
/// enum Command {
///     #[router(handler = handlers::version)]
///     Version,
///
///     #[router(handler = handlers::access)]
///     Access(AccessArgs),
/// }
/// ```
///
/// This generates:
///
/// ```ignore
/// impl Command {
///     pub async fn execute(self, state: kav::State<AppState>) -> kav::Response {
///         match self {
///             Command::Version => handlers::version(state).await.into_response(),
///             Command::Access(args) => handlers::access(state, args).await.into_response(),
///         }
///     }
/// }
/// ```
///
/// Variants are either unit or carry exactly one argument value.
#[proc_macro_derive(CommandRouter, attributes(router))]
pub fn derive_command_router(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let enum_name = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            enum_name,
            "CommandRouter can only be derived for enums",
        ));
    };

    let state_type: Type = router_value(&input.attrs, "state")?.ok_or_else(|| {
        syn::Error::new_spanned(
            enum_name,
            "missing #[router(state = YourStateType)] attribute on enum",
        )
    })?;

    let match_arms = data
        .variants
        .iter()
        .map(|variant| {
            let variant_name = &variant.ident;
            let handler: Path = router_value(&variant.attrs, "handler")?.ok_or_else(|| {
                syn::Error::new_spanned(
                    variant_name,
                    format!(
                        "missing #[router(handler = path::to::handler)] attribute on variant {variant_name}"
                    ),
                )
            })?;

            match &variant.fields {
                Fields::Unit => Ok(quote! {
                    #enum_name::#variant_name => #handler(state).await.into_response(),
                }),
                Fields::Unnamed(fields) if fields.unnamed.len() == 1 => Ok(quote! {
                    #enum_name::#variant_name(args) => #handler(state, args).await.into_response(),
                }),
                Fields::Unnamed(fields) => Err(syn::Error::new_spanned(
                    fields,
                    "a command variant carries at most one argument value",
                )),
                Fields::Named(fields) => Err(syn::Error::new_spanned(
                    fields,
                    "named fields are not supported in CommandRouter; use a tuple variant wrapping an args struct",
                )),
            }
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #enum_name #ty_generics #where_clause {
            /// Run the handler for this command
            pub async fn execute(self, state: ::kav::State<#state_type>) -> ::kav::Response {
                use ::kav::IntoResponse;

                match self {
                    #(#match_arms)*
                }
            }
        }
    })
}

/// Value of `key` in `#[router(key = value)]`, if present
fn router_value<T: Parse>(attrs: &[Attribute], key: &str) -> syn::Result<Option<T>> {
    let mut found = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("router")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                found = Some(meta.value()?.parse::<T>()?);
                Ok(())
            } else {
                Err(meta.error(format!("unsupported router attribute, expected `{key}`")))
            }
        })?;
    }
    Ok(found)
}
