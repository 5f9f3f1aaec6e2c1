//! `#[derive(BitDeserialize)]`: generates the `Load`-direction counterpart
//! of [`crate::serialize`], reading each non-`skip` field through
//! [`bitserializer::kv::KeyValue`] with the declared validators, refiners,
//! fallback, and attribute routing (spec §4.6).

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_quote, DeriveInput};

use crate::model::parse_fields;

pub fn derive(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let fields = parse_fields(&input.data)?;

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::bitserializer::dispatch::BitDeserialize));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let live_fields: Vec<_> = fields.iter().filter(|f| !f.skip).collect();
    let n_fields = live_fields.len();

    let reads: Vec<TokenStream> = live_fields
        .iter()
        .map(|field| {
            let ident = field.ident;
            let key = &field.key;
            if field.flatten {
                return quote! {
                    ::bitserializer::dispatch::FlattenLoad::flatten_load::<B>(&mut self.#ident, scope)?;
                };
            }
            let validators = field.validators.iter().map(|expr| quote! { .with_validator(#expr) });
            let refiners = field.refiners.iter().map(|expr| quote! { .with_refiner(#expr) });
            let fallback = field.fallback.as_ref().map(|expr| quote! { .with_fallback(#expr) });
            let attribute = field.attribute.then(|| quote! { .as_attribute() });
            quote! {
                ::bitserializer::kv::KeyValue::new(#key, &mut self.#ident)
                    #(#validators)*
                    #(#refiners)*
                    #fallback
                    #attribute
                    .load::<B, _>(scope)?;
            }
        })
        .collect();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::bitserializer::dispatch::BitDeserialize for #name #ty_generics #where_clause {
            fn bit_load<B, Site>(&mut self, site: Site) -> ::bitserializer::error::Result<bool>
            where
                B: ::bitserializer::scope::Backend,
                Site: ::bitserializer::dispatch::LoadSite<B>,
            {
                ::bitserializer::dispatch::load_as_object::<B, _>(site, #n_fields, |scope| {
                    #(#reads)*
                    Ok(())
                })
            }
        }

        #[automatically_derived]
        impl #impl_generics ::bitserializer::dispatch::FlattenLoad for #name #ty_generics #where_clause {
            fn flatten_load<B>(&mut self, scope: &mut B::ObjectLoad) -> ::bitserializer::error::Result<()>
            where
                B: ::bitserializer::scope::Backend,
            {
                #(#reads)*
                Ok(())
            }
        }
    })
}
