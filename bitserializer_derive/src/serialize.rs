//! `#[derive(BitSerialize)]`: generates a `Save`-direction aggregate impl
//! (spec §4.3 item 4c "has an internal `Serialize(archive)` method") that
//! opens one object scope and writes each non-`skip` field into it through
//! [`crate::model::FieldModel`]'s key and attribute routing.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_quote, DeriveInput};

use crate::model::parse_fields;

pub fn derive(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let fields = parse_fields(&input.data)?;

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::bitserializer::dispatch::BitSerialize));
        // `save_field`/`save_attribute_field` need a scratch copy to run
        // refiners against on `Save` (spec §4.6); required unconditionally
        // since a generic field's refine attributes aren't known here.
        param.bounds.push(parse_quote!(::core::clone::Clone));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let live_fields: Vec<_> = fields.iter().filter(|f| !f.skip).collect();
    let n_fields = live_fields.len();

    let writes: Vec<TokenStream> = live_fields
        .iter()
        .map(|field| {
            let ident = field.ident;
            let key = &field.key;
            let refiners: Vec<TokenStream> = field
                .refiners
                .iter()
                .map(|expr| quote! { ::std::boxed::Box::new(#expr) as ::std::boxed::Box<dyn ::bitserializer::refine::Refiner<_>> })
                .collect();
            if field.flatten {
                quote! {
                    ::bitserializer::dispatch::FlattenSave::flatten_save::<B>(&self.#ident, scope)?;
                }
            } else if field.attribute {
                quote! {
                    ::bitserializer::kv::save_attribute_field::<B, _, _>(scope, #key, &self.#ident, &[#(#refiners),*])?;
                }
            } else {
                quote! {
                    ::bitserializer::kv::save_field::<B, _, _>(scope, #key, &self.#ident, &[#(#refiners),*])?;
                }
            }
        })
        .collect();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::bitserializer::dispatch::BitSerialize for #name #ty_generics #where_clause {
            fn bit_save<B, Site>(&self, site: Site) -> ::bitserializer::error::Result<()>
            where
                B: ::bitserializer::scope::Backend,
                Site: ::bitserializer::dispatch::SaveSite<B>,
            {
                ::bitserializer::dispatch::save_as_object::<B, _>(site, #n_fields, |scope| {
                    #(#writes)*
                    Ok(())
                })
            }
        }

        #[automatically_derived]
        impl #impl_generics ::bitserializer::dispatch::FlattenSave for #name #ty_generics #where_clause {
            fn flatten_save<B>(&self, scope: &mut B::ObjectSave) -> ::bitserializer::error::Result<()>
            where
                B: ::bitserializer::scope::Backend,
            {
                #(#writes)*
                Ok(())
            }
        }
    })
}
