//! Generic Dispatch (spec §4.3): the one overload set that decides, for any
//! field type, which [`crate::scope`] operation to call.
//!
//! C++ picks the operation by SFINAE/overload resolution at the call site.
//! Rust has no equivalent without specialization, so this module inverts the
//! problem the way `serde` does: instead of dispatch examining the type, the
//! type examines *where it's being written* through a [`SaveSite`]/
//! [`LoadSite`] — three tiny adapters (root/object/array) that present the
//! same three operations (`scalar`, `string`, `open_object`, `open_array`)
//! regardless of whether the underlying scope is keyed, positional, or
//! singular. [`BitSerialize`]/[`BitDeserialize`] are each a single trait with
//! a single method, implemented exactly once per concrete type — primitives
//! and `String` here, containers in [`crate::containers`], aggregates and
//! token enums by `#[derive(BitSerialize, BitDeserialize)]`. Because every
//! type gets exactly one impl, Rust's ordinary coherence rules already give
//! us spec §4.3's "exactly one of (a)/(b) may exist for the same type" for
//! free — no autoref-specialization trick needed (see DESIGN.md).

use crate::error::Error;
use crate::options::Policy;
use crate::scope::{
    ArrayLoadScope, ArraySaveScope, Backend, ObjectLoadScope, ObjectSaveScope, RootLoadScope,
    RootSaveScope, Scalar, ScopeCommon,
};

type Result<T> = crate::error::Result<T>;

fn mismatch(path: String, message: impl Into<String>) -> Error {
    Error::MismatchedTypes { path, message: message.into() }
}

/// Where a value is about to be written: the document root, a keyed slot in
/// an object, or the next slot in an array. Consumed by value — a site is
/// built for exactly one [`BitSerialize::bit_save`] call and dropped.
pub trait SaveSite<B: Backend> {
    /// The path of the *parent* scope this site writes into (used to build
    /// error messages when this site can't represent the value at all).
    fn parent_path(&self) -> String;

    /// Writes a primitive value.
    fn save_scalar<T: Scalar>(self, value: &T) -> Result<()>;

    /// Writes a string value.
    fn save_string(self, value: &str) -> Result<()>;

    /// Writes a null (spec §4.5: "On Save of an empty/null value, a null is
    /// emitted").
    fn save_null(self) -> Result<()>;

    /// Opens an object scope at this site, sized for `n_fields` (ignored by
    /// text backends; required by binary ones, spec §4.3).
    fn open_object(self, n_fields: usize) -> Result<Option<B::ObjectSave>>;

    /// Opens an array scope at this site, sized for `size`.
    fn open_array(self, size: usize) -> Result<Option<B::ArraySave>>;
}

/// The `Load`-direction counterpart of [`SaveSite`]. Every read method
/// reports whether the value was actually present (spec §4.1: object/array
/// scope reads return `false`/`None` for an absent or wrong-shaped key,
/// which the caller leaves untouched rather than treating as an error).
pub trait LoadSite<B: Backend> {
    /// The path of the parent scope this site reads from.
    fn parent_path(&self) -> String;

    /// The effective [`Policy`] for archive-value/target-type shape
    /// mismatches at this site, for callers (like
    /// [`load_enum_token`]) that must consult it before consuming `self`.
    fn mismatched_types_policy(&self) -> Policy;

    /// Reads a primitive value. `Ok(false)` means absent/untouched.
    fn load_scalar<T: Scalar>(self, value: &mut T) -> Result<bool>;

    /// Reads a string value. `Ok(false)` means absent/untouched.
    fn load_string(self, value: &mut String) -> Result<bool>;

    /// Opens an object scope at this site, or `None` if absent or the wrong
    /// shape under [`Policy::Skip`].
    fn open_object(self, n_fields: usize) -> Result<Option<B::ObjectLoad>>;

    /// Opens an array scope at this site, or `None` for the same reason.
    fn open_array(self, size: usize) -> Result<Option<B::ArrayLoad>>;
}

/// A value that knows how to write itself at any [`SaveSite`] — the whole
/// document, a field of an object, or an element of an array.
pub trait BitSerialize {
    /// Writes `self` at `site`.
    fn bit_save<B: Backend, Site: SaveSite<B>>(&self, site: Site) -> Result<()>;
}

/// A value that knows how to read itself from any [`LoadSite`], mutating
/// `self` in place. Returns whether anything was actually read; per spec
/// §4.1/§4.6, a `false` result must leave `*self` exactly as it was so the
/// caller (the [`crate::kv::KeyValue`] pipeline) can apply a fallback or a
/// `Required` validator.
pub trait BitDeserialize {
    /// Reads into `self` from `site`.
    fn bit_load<B: Backend, Site: LoadSite<B>>(&mut self, site: Site) -> Result<bool>;
}

macro_rules! impl_scalar_dispatch {
    ($($t:ty),* $(,)?) => {
        $(
            impl BitSerialize for $t {
                fn bit_save<B: Backend, Site: SaveSite<B>>(&self, site: Site) -> Result<()> {
                    site.save_scalar(self)
                }
            }

            impl BitDeserialize for $t {
                fn bit_load<B: Backend, Site: LoadSite<B>>(&mut self, site: Site) -> Result<bool> {
                    site.load_scalar(self)
                }
            }
        )*
    };
}

impl_scalar_dispatch!(bool, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64);

impl BitSerialize for String {
    fn bit_save<B: Backend, Site: SaveSite<B>>(&self, site: Site) -> Result<()> {
        site.save_string(self)
    }
}

impl BitDeserialize for String {
    fn bit_load<B: Backend, Site: LoadSite<B>>(&mut self, site: Site) -> Result<bool> {
        site.load_string(self)
    }
}

impl BitSerialize for str {
    fn bit_save<B: Backend, Site: SaveSite<B>>(&self, site: Site) -> Result<()> {
        site.save_string(self)
    }
}

/// Writes `self` as an object scope whose fields are filled by `write`, for
/// use by `#[derive(BitSerialize)]`-generated impls. `n_fields` is the
/// binary-archive field count hint (spec §4.3's "visiting" trait — the
/// derive macro emits it as a literal since the field count is known at
/// compile time for a struct).
pub fn save_as_object<B: Backend, Site: SaveSite<B>>(
    site: Site,
    n_fields: usize,
    write: impl FnOnce(&mut B::ObjectSave) -> Result<()>,
) -> Result<()> {
    let parent = site.parent_path();
    match site.open_object(n_fields)? {
        Some(mut scope) => write(&mut scope),
        None => Err(mismatch(parent, "backend cannot represent an object value at this site")),
    }
}

/// The `Load` counterpart of [`save_as_object`]. Returns `Ok(false)` without
/// calling `read` if the site has no object to offer (absent key, or wrong
/// shape under [`Policy::Skip`]).
pub fn load_as_object<B: Backend, Site: LoadSite<B>>(
    site: Site,
    n_fields: usize,
    read: impl FnOnce(&mut B::ObjectLoad) -> Result<()>,
) -> Result<bool> {
    match site.open_object(n_fields)? {
        Some(mut scope) => {
            read(&mut scope)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Writes an enum token string (spec §4.3 item 3), for use by
/// `#[derive(BitSerializeEnum)]`. `token` is `None` for an unregistered
/// variant, which is always a capability mismatch on `Save` (there's no
/// "skip the value" concept when writing — the policy only ever affects
/// *reading*, so this always raises regardless of
/// [`crate::options::SerializationOptions::mismatched_types_policy`]).
pub fn save_enum_token<B: Backend, Site: SaveSite<B>>(site: Site, token: Option<&str>) -> Result<()> {
    let parent = site.parent_path();
    match token {
        Some(token) => site.save_string(token),
        None => Err(mismatch(parent, "enum variant has no registered token")),
    }
}

/// Reads an enum token string and looks it up with `lookup`. An unrecognized
/// token is a hard [`Error::MismatchedTypes`] under
/// [`Policy::ThrowError`]; under [`Policy::Skip`] the field is left
/// unmodified so a `Required` validator can flag it, mirroring how a missing
/// key is handled (spec §4.3: "Unregistered enum variants cause ...  a
/// validation failure on Load, per policy").
pub fn load_enum_token<B: Backend, Site: LoadSite<B>>(
    site: Site,
    mut lookup: impl FnMut(&str) -> Option<()>,
    mut assign: impl FnMut(&str),
) -> Result<bool> {
    let parent = site.parent_path();
    let policy = site.mismatched_types_policy();
    let mut token = String::new();
    if !site.load_string(&mut token)? {
        return Ok(false);
    }
    if lookup(&token).is_some() {
        assign(&token);
        Ok(true)
    } else if policy.is_throw() {
        Err(mismatch(parent, format!("unrecognized enum token {token:?}")))
    } else {
        Ok(false)
    }
}

/// Base-class wrapper (spec §4.3 item 5 "`BaseObject<B>`"): writes `self`'s
/// fields directly into an already-open object scope instead of opening a
/// new one. `#[derive(BitSerialize)]` emits this for every struct it's
/// derived on (not only ones actually used as a base), so any aggregate can
/// be embedded into another via `#[bitserializer(flatten)]` the way a C++
/// type derives from `BaseObject<Base>` to inline the base's members.
pub trait FlattenSave {
    /// Writes every field of `self` into `scope`, which belongs to the
    /// *enclosing* aggregate — no new scope is opened for `self`.
    fn flatten_save<B: Backend>(&self, scope: &mut B::ObjectSave) -> Result<()>;
}

/// The `Load` counterpart of [`FlattenSave`].
pub trait FlattenLoad {
    /// Reads every field of `self` out of `scope`, which belongs to the
    /// enclosing aggregate.
    fn flatten_load<B: Backend>(&mut self, scope: &mut B::ObjectLoad) -> Result<()>;
}

/// Root scope, writing.
pub struct RootSaveSite<'a, B: Backend>(pub &'a mut B::RootSave);

impl<'a, B: Backend> SaveSite<B> for RootSaveSite<'a, B> {
    fn parent_path(&self) -> String {
        self.0.path()
    }

    fn save_scalar<T: Scalar>(self, value: &T) -> Result<()> {
        self.0.serialize_value(value)
    }

    fn save_string(self, value: &str) -> Result<()> {
        self.0.serialize_string(value)
    }

    fn save_null(self) -> Result<()> {
        self.0.write_null()
    }

    fn open_object(self, n_fields: usize) -> Result<Option<B::ObjectSave>> {
        Ok(Some(self.0.open_object_scope(n_fields)?))
    }

    fn open_array(self, size: usize) -> Result<Option<B::ArraySave>> {
        Ok(Some(self.0.open_array_scope(size)?))
    }
}

/// Root scope, reading.
pub struct RootLoadSite<'a, B: Backend>(pub &'a mut B::RootLoad);

impl<'a, B: Backend> LoadSite<B> for RootLoadSite<'a, B> {
    fn parent_path(&self) -> String {
        self.0.path()
    }

    fn mismatched_types_policy(&self) -> Policy {
        self.0.options().mismatched_types_policy
    }

    fn load_scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        self.0.serialize_value(value)
    }

    fn load_string(self, value: &mut String) -> Result<bool> {
        self.0.serialize_string(value)
    }

    fn open_object(self, n_fields: usize) -> Result<Option<B::ObjectLoad>> {
        self.0.open_object_scope(n_fields)
    }

    fn open_array(self, size: usize) -> Result<Option<B::ArrayLoad>> {
        self.0.open_array_scope(size)
    }
}

/// A keyed slot of an object scope, writing.
pub struct ObjectSaveSite<'a, B: Backend> {
    pub scope: &'a mut B::ObjectSave,
    pub key: &'a str,
}

impl<'a, B: Backend> SaveSite<B> for ObjectSaveSite<'a, B> {
    fn parent_path(&self) -> String {
        self.scope.path()
    }

    fn save_scalar<T: Scalar>(self, value: &T) -> Result<()> {
        self.scope.serialize_value(self.key, value)
    }

    fn save_string(self, value: &str) -> Result<()> {
        self.scope.serialize_string(self.key, value)
    }

    fn save_null(self) -> Result<()> {
        self.scope.write_null(self.key)
    }

    fn open_object(self, n_fields: usize) -> Result<Option<B::ObjectSave>> {
        self.scope.open_object_scope(self.key, n_fields)
    }

    fn open_array(self, size: usize) -> Result<Option<B::ArraySave>> {
        self.scope.open_array_scope(self.key, size)
    }
}

/// A keyed slot of an object scope, reading.
pub struct ObjectLoadSite<'a, B: Backend> {
    pub scope: &'a mut B::ObjectLoad,
    pub key: &'a str,
}

impl<'a, B: Backend> LoadSite<B> for ObjectLoadSite<'a, B> {
    fn parent_path(&self) -> String {
        self.scope.path()
    }

    fn mismatched_types_policy(&self) -> Policy {
        self.scope.options().mismatched_types_policy
    }

    fn load_scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        self.scope.serialize_value(self.key, value)
    }

    fn load_string(self, value: &mut String) -> Result<bool> {
        self.scope.serialize_string(self.key, value)
    }

    fn open_object(self, n_fields: usize) -> Result<Option<B::ObjectLoad>> {
        self.scope.open_object_scope(self.key, n_fields)
    }

    fn open_array(self, size: usize) -> Result<Option<B::ArrayLoad>> {
        self.scope.open_array_scope(self.key, size)
    }
}

/// The next positional slot of an array scope, writing.
pub struct ArraySaveSite<'a, B: Backend>(pub &'a mut B::ArraySave);

impl<'a, B: Backend> SaveSite<B> for ArraySaveSite<'a, B> {
    fn parent_path(&self) -> String {
        self.0.path()
    }

    fn save_scalar<T: Scalar>(self, value: &T) -> Result<()> {
        self.0.serialize_value(value)
    }

    fn save_string(self, value: &str) -> Result<()> {
        self.0.serialize_string(value)
    }

    fn save_null(self) -> Result<()> {
        self.0.write_null()
    }

    fn open_object(self, n_fields: usize) -> Result<Option<B::ObjectSave>> {
        self.0.open_object_scope(n_fields)
    }

    fn open_array(self, size: usize) -> Result<Option<B::ArraySave>> {
        self.0.open_array_scope(size)
    }
}

/// The next positional slot of an array scope, reading.
pub struct ArrayLoadSite<'a, B: Backend>(pub &'a mut B::ArrayLoad);

impl<'a, B: Backend> LoadSite<B> for ArrayLoadSite<'a, B> {
    fn parent_path(&self) -> String {
        self.0.path()
    }

    fn mismatched_types_policy(&self) -> Policy {
        self.0.options().mismatched_types_policy
    }

    fn load_scalar<T: Scalar>(self, value: &mut T) -> Result<bool> {
        self.0.serialize_value(value)?;
        Ok(true)
    }

    fn load_string(self, value: &mut String) -> Result<bool> {
        self.0.serialize_string(value)?;
        Ok(true)
    }

    fn open_object(self, n_fields: usize) -> Result<Option<B::ObjectLoad>> {
        self.0.open_object_scope(n_fields)
    }

    fn open_array(self, size: usize) -> Result<Option<B::ArrayLoad>> {
        self.0.open_array_scope(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializationContext;
    use crate::options::SerializationOptions;
    use crate::test_backend::{new_node, RootLoad, RootSave, TestBackend, TestValue};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fresh_context() -> Rc<RefCell<SerializationContext>> {
        Rc::new(RefCell::new(SerializationContext::new()))
    }

    #[test]
    fn scalar_round_trips_through_root_site() {
        let node = new_node(TestValue::Null);
        let mut save = RootSave::new(Rc::clone(&node), fresh_context(), SerializationOptions::new());
        42i32.bit_save::<TestBackend, _>(RootSaveSite(&mut save)).unwrap();

        let mut load = RootLoad::new(node, fresh_context(), SerializationOptions::new());
        let mut out = 0i32;
        assert!(out.bit_load::<TestBackend, _>(RootLoadSite(&mut load)).unwrap());
        assert_eq!(out, 42);
    }

    #[test]
    fn string_round_trips_through_root_site() {
        let node = new_node(TestValue::Null);
        let mut save = RootSave::new(Rc::clone(&node), fresh_context(), SerializationOptions::new());
        "hello".to_string().bit_save::<TestBackend, _>(RootSaveSite(&mut save)).unwrap();

        let mut load = RootLoad::new(node, fresh_context(), SerializationOptions::new());
        let mut out = String::new();
        assert!(out.bit_load::<TestBackend, _>(RootLoadSite(&mut load)).unwrap());
        assert_eq!(out, "hello");
    }
}
