//! Procedural macros for `bitserializer`.
//!
//! Spec §4.3 item 4 lets a type participate as an object-shaped aggregate
//! by providing "an internal `Serialize(archive)` method" — in Rust that's
//! a hand-written `impl BitSerialize`/`impl BitDeserialize` pair, which
//! `#[derive(BitSerialize, BitDeserialize)]` generates for the common case
//! of "every named field becomes a keyed member" so application code writes
//! the data model once, as plain struct/enum definitions with
//! `#[bitserializer(...)]` field attributes, the same division of labor
//! `serde_derive` strikes for `serde`.
//!
//! `#[derive(BitSerializeEnum)]` covers spec §4.3 item 3 / §4.4's
//! registered token enums instead: a C-like enum whose variants round-trip
//! through a string token rather than through an object scope.

#![deny(rustdoc::broken_intra_doc_links, missing_docs, rustdoc::missing_crate_level_docs)]

mod deserialize;
mod enum_derive;
mod model;
mod serialize;

extern crate proc_macro;

use syn::{parse_macro_input, DeriveInput};

/// Derives [`bitserializer::dispatch::BitSerialize`] for a struct with
/// named fields.
///
/// # Attributes
///
/// Field-level `#[bitserializer(...)]` attributes:
///
/// - `rename = "..."`: the archive key, if different from the field's Rust
///   identifier.
/// - `attribute`: route this field through the object's attribute
///   sub-scope (spec §3 `AttributeValue`/`AutoAttributeValue`) instead of
///   the object itself. Backends with no attribute concept fail this field
///   with `MismatchedTypes` rather than silently falling back to the
///   object (see `bitserializer::kv::save_attribute_field`).
/// - `skip`: exclude this field entirely; it is never written on `Save`
///   and left untouched on `Load`.
/// - `validate(...)`: a comma-separated list of expressions implementing
///   `bitserializer::validate::Validator`, run in order on `Load`. Has no
///   effect on `Save` (validators are Load-only, spec §4.6).
/// - `refine(...)`: a comma-separated list of expressions implementing
///   `bitserializer::refine::Refiner`, run in order on `Save` (against a
///   scratch copy, before the write — see `bitserializer::kv::save_field`'s
///   doc comment) and on `Load` (against the field itself, after the read),
///   per spec §4.6.
/// - `fallback = expr`: the value substituted when the key is absent on
///   `Load` and no `Required` validator is present.
/// - `flatten`: spec §4.3 item 5 ("Base-class wrapper `BaseObject<B>`") —
///   the field's own fields are written/read directly into the *enclosing*
///   object scope instead of a nested keyed scope, standing in for the
///   original library's base-class inlining since Rust has no inheritance.
///   Mutually exclusive with `attribute`/`fallback`/`validate`/`refine` on
///   the same field.
///
/// `#[derive(BitSerialize, BitDeserialize)]` together cover spec §4.3 item
/// 4c ("the type has an internal `Serialize(archive)` method"); generic
/// struct type parameters get a `BitSerialize`/`BitDeserialize` bound added
/// automatically, matching the field-must-implement-it requirement every
/// aggregate impl has regardless of how it's written.
#[proc_macro_derive(BitSerialize, attributes(bitserializer))]
pub fn derive_bit_serialize(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match serialize::derive(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives [`bitserializer::dispatch::BitDeserialize`] for a struct with
/// named fields. See [`macro@BitSerialize`] for the shared
/// `#[bitserializer(...)]` field attributes.
#[proc_macro_derive(BitDeserialize, attributes(bitserializer))]
pub fn derive_bit_deserialize(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match deserialize::derive(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives both [`bitserializer::dispatch::BitSerialize`] and
/// [`bitserializer::dispatch::BitDeserialize`] for a C-like enum, registered
/// against a static value→token table (spec §4.3 item 3, §4.4 "Enum
/// tables").
///
/// Every variant must be a unit variant. Variant-level
/// `#[bitserializer(rename = "...")]` overrides the token written/looked up
/// for that variant; the default token is the variant's Rust identifier.
/// Two variants registering the same token is a compile error (spec §4.4:
/// "Duplicate registrations are compile-time errors").
#[proc_macro_derive(BitSerializeEnum, attributes(bitserializer))]
pub fn derive_bit_serialize_enum(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match enum_derive::derive(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
