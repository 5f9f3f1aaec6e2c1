//! Parses a struct's fields (or a token enum's variants) and their
//! `#[bitserializer(...)]` attributes into the shape the three derive
//! macros need, keeping attribute syntax in one place shared by
//! `BitSerialize`/`BitDeserialize`/`BitSerializeEnum`.

use syn::{Data, Expr, Fields, Ident, LitStr, Type};

/// One field of a struct being derived over, with its archive key and any
/// validator/refiner/fallback/attribute-routing directives collected from
/// its `#[bitserializer(...)]` attributes.
pub struct FieldModel<'a> {
    pub ident: &'a Ident,
    #[allow(dead_code)]
    pub ty: &'a Type,
    pub key: String,
    pub attribute: bool,
    pub skip: bool,
    /// Spec §4.3 item 5 "`BaseObject<B>`": the field's own fields are
    /// written/read directly into the enclosing object scope rather than
    /// under a nested key, via [`bitserializer::dispatch::FlattenSave`]/
    /// [`bitserializer::dispatch::FlattenLoad`].
    pub flatten: bool,
    pub validators: Vec<Expr>,
    pub refiners: Vec<Expr>,
    pub fallback: Option<Expr>,
}

/// Reads every named field out of a struct's [`Data`], applying field-level
/// `#[bitserializer(...)]` attributes. Errors on tuple/unit structs and on
/// enums — those aren't what `#[derive(BitSerialize, BitDeserialize)]`
/// models (see `BitSerializeEnum` for token enums).
pub fn parse_fields(data: &Data) -> syn::Result<Vec<FieldModel<'_>>> {
    let Data::Struct(data) = data else {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "BitSerialize/BitDeserialize can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "BitSerialize/BitDeserialize requires named fields (no tuple or unit structs)",
        ));
    };

    fields
        .named
        .iter()
        .map(|field| {
            let ident = field.ident.as_ref().expect("named field");
            let mut model = FieldModel {
                ident,
                ty: &field.ty,
                key: ident.to_string(),
                attribute: false,
                skip: false,
                flatten: false,
                validators: Vec::new(),
                refiners: Vec::new(),
                fallback: None,
            };
            for attr in &field.attrs {
                if !attr.path().is_ident("bitserializer") {
                    continue;
                }
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let value: LitStr = meta.value()?.parse()?;
                        model.key = value.value();
                    } else if meta.path.is_ident("attribute") {
                        model.attribute = true;
                    } else if meta.path.is_ident("skip") {
                        model.skip = true;
                    } else if meta.path.is_ident("flatten") {
                        model.flatten = true;
                    } else if meta.path.is_ident("fallback") {
                        model.fallback = Some(meta.value()?.parse()?);
                    } else if meta.path.is_ident("validate") {
                        let content;
                        syn::parenthesized!(content in meta.input);
                        let exprs = content.parse_terminated(Expr::parse, syn::Token![,])?;
                        model.validators.extend(exprs);
                    } else if meta.path.is_ident("refine") {
                        let content;
                        syn::parenthesized!(content in meta.input);
                        let exprs = content.parse_terminated(Expr::parse, syn::Token![,])?;
                        model.refiners.extend(exprs);
                    } else {
                        return Err(meta.error("unrecognized bitserializer field attribute"));
                    }
                    Ok(())
                })?;
            }
            if model.flatten
                && (model.attribute
                    || model.fallback.is_some()
                    || !model.validators.is_empty()
                    || !model.refiners.is_empty())
            {
                return Err(syn::Error::new(
                    proc_macro2::Span::call_site(),
                    "flatten cannot be combined with attribute/fallback/validate/refine",
                ));
            }
            Ok(model)
        })
        .collect()
}

/// One variant of a token enum being derived over (spec §4.3 item 3 / §4.4
/// "Enum tables"): its archive token, registered via `#[bitserializer(rename
/// = "...")]` or, by default, its Rust identifier.
pub struct VariantModel<'a> {
    pub ident: &'a Ident,
    pub token: String,
}

/// Reads every unit variant out of an enum's [`Data`], applying
/// variant-level `#[bitserializer(...)]` attributes. Errors on structs and
/// on variants carrying fields — `BitSerializeEnum` models the spec's
/// "registered via a static descriptor table mapping value→token" enums,
/// which are always C-like.
pub fn parse_variants(data: &Data) -> syn::Result<Vec<VariantModel<'_>>> {
    let Data::Enum(data) = data else {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "BitSerializeEnum can only be derived for enums",
        ));
    };

    let variants: Vec<VariantModel<'_>> = data
        .variants
        .iter()
        .map(|variant| {
            if !matches!(variant.fields, Fields::Unit) {
                return Err(syn::Error::new(
                    proc_macro2::Span::call_site(),
                    "BitSerializeEnum requires unit variants (no tuple or struct variants)",
                ));
            }
            let mut token = variant.ident.to_string();
            for attr in &variant.attrs {
                if !attr.path().is_ident("bitserializer") {
                    continue;
                }
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let value: LitStr = meta.value()?.parse()?;
                        token = value.value();
                    } else {
                        return Err(meta.error("unrecognized bitserializer variant attribute"));
                    }
                    Ok(())
                })?;
            }
            Ok(VariantModel { ident: &variant.ident, token })
        })
        .collect::<syn::Result<_>>()?;

    for (i, a) in variants.iter().enumerate() {
        for b in &variants[i + 1..] {
            if a.token == b.token {
                return Err(syn::Error::new(
                    proc_macro2::Span::call_site(),
                    format!("duplicate enum token {:?} registered for both {} and {}", a.token, a.ident, b.ident),
                ));
            }
        }
    }

    Ok(variants)
}
