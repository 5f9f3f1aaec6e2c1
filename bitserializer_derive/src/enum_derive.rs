//! `#[derive(BitSerializeEnum)]`: registers a C-like enum's value→token
//! table (spec §4.3 item 3, §4.4 "Enum tables") and derives both
//! [`bitserializer::dispatch::BitSerialize`] and
//! [`bitserializer::dispatch::BitDeserialize`] from it in one pass —
//! `Save` writes the registered token as a string, `Load` looks a token up
//! case-sensitively and leaves the target untouched (for the `Skip`
//! policy to flag via a `Required` validator) on no match.
//!
//! Rust's `match` over string literals *is* the "static descriptor table"
//! the spec describes (compiled to a decision tree, not an O(n) scan, but
//! observably equivalent); duplicate tokens are rejected by
//! [`crate::model::parse_variants`] at macro-expansion time, standing in
//! for the spec's "duplicate registrations are compile-time errors".

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::model::parse_variants;

pub fn derive(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let variants = parse_variants(&input.data)?;

    let save_arms = variants.iter().map(|v| {
        let ident = v.ident;
        let token = &v.token;
        quote! { #name::#ident => ::core::option::Option::Some(#token) }
    });

    let lookup_arms = variants.iter().map(|v| {
        let token = &v.token;
        quote! { #token => ::core::option::Option::Some(()) }
    });

    let assign_arms = variants.iter().map(|v| {
        let ident = v.ident;
        let token = &v.token;
        quote! { #token => #name::#ident }
    });

    Ok(quote! {
        #[automatically_derived]
        impl ::bitserializer::dispatch::BitSerialize for #name {
            fn bit_save<B, Site>(&self, site: Site) -> ::bitserializer::error::Result<()>
            where
                B: ::bitserializer::scope::Backend,
                Site: ::bitserializer::dispatch::SaveSite<B>,
            {
                let token = match self {
                    #(#save_arms,)*
                };
                ::bitserializer::dispatch::save_enum_token::<B, _>(site, token)
            }
        }

        #[automatically_derived]
        impl ::bitserializer::dispatch::BitDeserialize for #name {
            fn bit_load<B, Site>(&mut self, site: Site) -> ::bitserializer::error::Result<bool>
            where
                B: ::bitserializer::scope::Backend,
                Site: ::bitserializer::dispatch::LoadSite<B>,
            {
                let mut matched: ::core::option::Option<Self> = ::core::option::Option::None;
                let loaded = ::bitserializer::dispatch::load_enum_token::<B, _>(
                    site,
                    |token| match token {
                        #(#lookup_arms,)*
                        _ => ::core::option::Option::None,
                    },
                    |token| {
                        matched = ::core::option::Option::Some(match token {
                            #(#assign_arms,)*
                            _ => unreachable!("load_enum_token only assigns looked-up tokens"),
                        });
                    },
                )?;
                if let ::core::option::Option::Some(value) = matched {
                    *self = value;
                }
                ::core::result::Result::Ok(loaded)
            }
        }
    })
}
