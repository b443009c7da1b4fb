use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::{DeriveInput, Fields, LitStr, Path, Type, ext::IdentExt, spanned::Spanned};

struct Keyword {
    ident: Ident,
    key: String,
    flag: bool,
}

pub fn derive_arg_extension(input: DeriveInput) -> syn::Result<TokenStream> {
    // retrieve struct field information
    let fields: Vec<_> = match &input.data {
        syn::Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields_named) => fields_named.named.iter().collect(),
            Fields::Unit => vec![],
            Fields::Unnamed(fields_unnamed) => {
                return Err(syn::Error::new(
                    fields_unnamed.span(),
                    "tuple structs are not supported by `ArgExtension` derive",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "`ArgExtension` can only be derived for structs",
            ));
        }
    };

    // parse arg_ext attributes
    let mut crate_name = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("arg_ext") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let value = meta.value()?;
                let s: LitStr = value.parse()?;
                crate_name = Some(s.parse::<Path>()?);
                Ok(())
            } else {
                Err(meta.error("unexpected attribute; supported is `crate`"))
            }
        })?;
    }
    // determine the base path for trait implementation
    let base_path = match crate_name {
        Some(path) => quote!(#path::arg),
        None => quote!(::kiln::arg),
    };

    let mut keywords = Vec::with_capacity(fields.len());
    for field in fields {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
        let mut key = ident.unraw().to_string();
        for attr in &field.attrs {
            if !attr.path().is_ident("arg_ext") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    key = s.value();
                    Ok(())
                } else {
                    Err(meta.error("unexpected attribute; supported is `rename`"))
                }
            })?;
        }
        let flag = matches!(&field.ty, Type::Path(ty) if ty.qself.is_none() && ty.path.is_ident("bool"));
        keywords.push(Keyword { ident, key, flag });
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let idents: Vec<_> = keywords.iter().map(|keyword| &keyword.ident).collect();
    let arms = keywords.iter().map(|Keyword { ident, key, flag }| {
        // a flag may also appear without value
        let flag_arm = flag.then(|| quote!((#key, None) => #ident = true,));
        quote! {
            #flag_arm
            (#key, Some(__value)) => {
                #ident = __value.parse().map_err(|_| #base_path::ExtensionError::Invalid {
                    key: #key.to_string(),
                    value: __value.to_string(),
                })?
            }
        }
    });

    Ok(quote! {
        impl #impl_generics #base_path::ArgExtension for #name #ty_generics #where_clause {
            fn parse_ext(
                __tokens: &mut #base_path::Tokens<'_>,
            ) -> ::core::result::Result<Self, #base_path::ExtensionError> {
                #(let mut #idents = ::core::default::Default::default();)*
                for __token in __tokens {
                    let (__key, __value) = match __token.split_once('=') {
                        ::core::option::Option::Some((__key, __value)) => {
                            (__key, ::core::option::Option::Some(__value))
                        }
                        ::core::option::Option::None => (__token, ::core::option::Option::None),
                    };
                    match (__key, __value) {
                        #(#arms)*
                        _ => {
                            return ::core::result::Result::Err(
                                #base_path::ExtensionError::Unexpected(__token.to_string()),
                            );
                        }
                    }
                }
                ::core::result::Result::Ok(Self { #(#idents),* })
            }
        }
    })
}
