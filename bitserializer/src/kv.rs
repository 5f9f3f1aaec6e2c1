//! Key-Value & Attribute Wrappers (spec §3 `KeyValue`, §4.6).
//!
//! [`KeyValue`] binds together everything one field needs on `Load`: its
//! key, a mutable reference to the field, the ordered validators/refiners,
//! and an optional fallback. It borrows the field for exactly one archive
//! read and is built fresh by derive-generated code (or by hand) every time
//! — nothing here outlives the call. `Save` has no mutable access to the
//! field (see [`save_field`]'s doc comment) so it's a pair of free
//! functions instead of a wrapper type.
//!
//! Rust collapses spec §3's four wrapper variants to two: every backend key
//! here is `&str` (see [`crate::dispatch`]'s doc comment), so `KeyValue` and
//! `AutoKeyValue` are the same type — any `impl Into<String>` key is
//! accepted directly, no separate "auto" adapter needed (DESIGN.md). The
//! remaining distinction that *does* matter is attribute routing
//! (`AttributeValue`), kept as a separate constructor/function rather than a
//! shadow type.

use std::borrow::Cow;

use crate::context::SerializationContext;
use crate::dispatch::{BitDeserialize, BitSerialize, ObjectLoadSite, ObjectSaveSite};
use crate::error::{Error, Result};
use crate::refine::Refiner;
use crate::scope::{Backend, ObjectLoadScope, ObjectSaveScope, ScopeCommon};
use crate::validate::Validator;

fn child_path(parent: &str, separator: char, key: &str) -> String {
    format!("{parent}{separator}{key}")
}

/// Where a [`KeyValue`] routes its read/write: the object itself, or (XML
/// only) the object's attribute sub-scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Route {
    #[default]
    Object,
    Attribute,
}

/// An ephemeral binding of (key, field reference, validators, refiners,
/// fallback) consumed by exactly one `Save`/`Load` call on an object scope.
pub struct KeyValue<'a, T> {
    key: Cow<'a, str>,
    value: &'a mut T,
    validators: Vec<Box<dyn Validator<T> + 'a>>,
    refiners: Vec<Box<dyn Refiner<T> + 'a>>,
    fallback: Option<T>,
    route: Route,
}

impl<'a, T> KeyValue<'a, T> {
    /// Binds `key` to `value` with no validators, refiners, or fallback.
    pub fn new(key: impl Into<Cow<'a, str>>, value: &'a mut T) -> Self {
        Self { key: key.into(), value, validators: Vec::new(), refiners: Vec::new(), fallback: None, route: Route::Object }
    }

    /// Appends a validator, run in declared order on `Load`.
    pub fn with_validator(mut self, validator: impl Validator<T> + 'a) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Appends a refiner, run (in declared order) on `Load` after the value
    /// is read and before validators see it. See [`save_field`]'s doc
    /// comment for why refiners don't also run on `Save`.
    pub fn with_refiner(mut self, refiner: impl Refiner<T> + 'a) -> Self {
        self.refiners.push(Box::new(refiner));
        self
    }

    /// Sets the value substituted when the key is absent on `Load` and no
    /// [`crate::validate::Required`] validator is present.
    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Routes this binding through the object's attribute sub-scope instead
    /// of the object itself (spec §3 `AttributeValue`/`AutoAttributeValue`).
    /// Backends without an attribute concept report no attribute scope
    /// (`open_attribute_scope` returns `None`), which surfaces as a
    /// mismatch here rather than silently falling back to the object.
    pub fn as_attribute(mut self) -> Self {
        self.route = Route::Attribute;
        self
    }
}

/// Writes `value` under `key` in `scope` (spec §3 `KeyValue`'s `Save`
/// direction), for use by `#[derive(BitSerialize)]`-generated code.
///
/// Takes `value` by shared reference rather than through [`KeyValue`]:
/// `BitSerialize::bit_save` only ever gets `&self`, so there's no `&mut T`
/// to run refiners against in place. Spec §4.6 still requires refiners to
/// run on `Save` ("apply refiners ... to the value reference; emit"), so
/// when `refiners` is non-empty this clones `value` into a scratch copy,
/// refines the copy, and writes *that* — the original field is left
/// untouched, matching every other read-only `Save` path in this crate.
/// `T: Clone` is therefore required unconditionally (not just when a field
/// actually declares `refine(...)`), the price of keeping one signature
/// for both cases.
pub fn save_field<B: Backend, S: ObjectSaveScope<B>, T: BitSerialize + Clone>(
    scope: &mut S,
    key: &str,
    value: &T,
    refiners: &[Box<dyn Refiner<T>>],
) -> Result<()> {
    if refiners.is_empty() {
        return value.bit_save::<B, _>(ObjectSaveSite { scope, key });
    }
    let mut refined = value.clone();
    for refiner in refiners {
        refiner.refine(&mut refined);
    }
    refined.bit_save::<B, _>(ObjectSaveSite { scope, key })
}

/// The attribute-routed counterpart of [`save_field`] (spec §3
/// `AttributeValue`/`AutoAttributeValue`). Fails with
/// [`Error::MismatchedTypes`] if the backend has no attribute sub-scope.
pub fn save_attribute_field<B: Backend, S: ObjectSaveScope<B>, T: BitSerialize + Clone>(
    scope: &mut S,
    key: &str,
    value: &T,
    refiners: &[Box<dyn Refiner<T>>],
) -> Result<()> {
    let parent = scope.path();
    let mut attrs = scope.open_attribute_scope()?.ok_or_else(|| Error::MismatchedTypes {
        path: parent,
        message: "backend has no attribute sub-scope".to_string(),
    })?;
    if refiners.is_empty() {
        return value.bit_save::<B, _>(ObjectSaveSite { scope: &mut attrs, key });
    }
    let mut refined = value.clone();
    for refiner in refiners {
        refiner.refine(&mut refined);
    }
    refined.bit_save::<B, _>(ObjectSaveSite { scope: &mut attrs, key })
}

impl<'a, T: BitDeserialize> KeyValue<'a, T> {
    /// Reads the field from `scope` (applying [`Self::with_fallback`] if the
    /// key was absent), then refines and validates it, recording any
    /// validator failures in the scope's [`SerializationContext`].
    pub fn load<B: Backend, S: ObjectLoadScope<B>>(mut self, scope: &mut S) -> Result<()> {
        let path = child_path(&scope.path(), B::PATH_SEPARATOR, &self.key);

        let mut was_loaded = if self.route == Route::Attribute {
            match scope.open_attribute_scope()? {
                Some(mut attrs) => self.value.bit_load::<B, _>(ObjectLoadSite { scope: &mut attrs, key: &self.key })?,
                None => false,
            }
        } else {
            self.value.bit_load::<B, _>(ObjectLoadSite { scope, key: &self.key })?
        };

        if !was_loaded {
            if let Some(fallback) = self.fallback.take() {
                *self.value = fallback;
                was_loaded = true;
            }
        }

        for refiner in &self.refiners {
            refiner.refine(self.value);
        }

        let messages: Vec<String> =
            self.validators.iter().filter_map(|v| v.validate(self.value, was_loaded)).collect();
        if !messages.is_empty() {
            let ctx = scope.context();
            let mut ctx = ctx.borrow_mut();
            for message in messages {
                ctx.add_error(path.clone(), message);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SerializationOptions;
    use crate::test_backend::{new_node, ObjectScope, RootLoad, RootSave, TestBackend, TestValue};
    use crate::validate::Required;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fresh_context() -> Rc<RefCell<SerializationContext>> {
        Rc::new(RefCell::new(SerializationContext::new()))
    }

    fn new_object_pair() -> (ObjectScope, ObjectScope, Rc<RefCell<SerializationContext>>) {
        let node = new_node(TestValue::Null);
        let options = SerializationOptions::new();
        let ctx = fresh_context();
        let mut save = RootSave::new(Rc::clone(&node), Rc::clone(&ctx), options);
        let save_obj = save.open_object_scope(0).unwrap();
        drop(save);
        let mut load = RootLoad::new(node, Rc::clone(&ctx), options);
        let load_obj = load.open_object_scope(0).unwrap().unwrap();
        (save_obj, load_obj, ctx)
    }

    #[test]
    fn missing_required_field_records_validation_error() {
        let (_save_obj, mut load_obj, ctx) = new_object_pair();
        let mut age = 0i32;
        KeyValue::new("age", &mut age).with_validator(Required).load::<TestBackend, _>(&mut load_obj).unwrap();
        assert!(ctx.borrow().has_errors());
    }

    #[test]
    fn fallback_applies_when_absent_and_not_required() {
        let (_save_obj, mut load_obj, ctx) = new_object_pair();
        let mut age = 0i32;
        KeyValue::new("age", &mut age).with_fallback(18).load::<TestBackend, _>(&mut load_obj).unwrap();
        assert_eq!(age, 18);
        assert!(!ctx.borrow().has_errors());
    }

    #[test]
    fn present_field_round_trips_and_passes_validation() {
        let node = new_node(TestValue::Null);
        let options = SerializationOptions::new();
        let ctx = fresh_context();
        let mut save = RootSave::new(Rc::clone(&node), Rc::clone(&ctx), options);
        let mut save_obj = save.open_object_scope(1).unwrap();
        let name = "Ada".to_string();
        save_field::<TestBackend, _, _>(&mut save_obj, "name", &name, &[]).unwrap();
        drop(save);

        let mut load = RootLoad::new(node, Rc::clone(&ctx), options);
        let mut load_obj = load.open_object_scope(0).unwrap().unwrap();
        let mut loaded = String::new();
        KeyValue::new("name", &mut loaded).with_validator(Required).load::<TestBackend, _>(&mut load_obj).unwrap();
        assert_eq!(loaded, "Ada");
        assert!(!ctx.borrow().has_errors());
    }
}
