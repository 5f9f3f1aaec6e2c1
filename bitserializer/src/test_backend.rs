//! An in-memory [`Backend`] used only by this crate's own unit and property
//! tests, grounded on the original library's binary archive stub
//! (`testing_tools/bin_archive_stub.h`): a tree of shared, reference-counted
//! nodes that lets the dispatch engine be exercised without pulling in a
//! real wire format.
//!
//! `bin_archive_stub.h` builds its tree from `shared_ptr<variant<...>>`
//! nodes so that parent and child scopes can both hold a handle to the same
//! node without fighting C++'s ownership rules; `Rc<RefCell<TestValue>>` is
//! the direct Rust analogue; spec §5 rules out concurrent use of one archive
//! instance, so `Rc`/`RefCell` (not `Arc`/`Mutex`) is the right-sized match.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::convert::Number;
use crate::error::Error;
use crate::options::SerializationOptions;
use crate::scope::{
    ArrayLoadScope, ArraySaveScope, Backend, Mode, ObjectLoadScope, ObjectSaveScope, RootLoadScope,
    RootSaveScope, Scalar, ScalarNumberConv, ScopeCommon, SharedContext, Unsupported,
};

/// One node of the in-memory value tree, mirroring `BinTestIoData`'s
/// `std::variant`.
#[derive(Debug, Clone)]
pub enum TestValue {
    Null,
    Number(Number),
    Str(String),
    Array(Vec<Node>),
    Object(BTreeMap<String, Node>),
}

/// A shared handle to one tree node.
pub type Node = Rc<RefCell<TestValue>>;

pub fn new_node(value: TestValue) -> Node {
    Rc::new(RefCell::new(value))
}

fn child_path(parent_path: &str, segment: &str) -> String {
    format!("{parent_path}{}{segment}", TestBackend::PATH_SEPARATOR)
}

fn overflow_or_skip<T>(options: SerializationOptions, path: &str, found: Number) -> Result<Option<T>, Error> {
    if options.overflow_number_policy.is_throw() {
        Err(Error::Overflow { path: path.to_string(), message: format!("{found:?} does not fit the target type") })
    } else {
        Ok(None)
    }
}

fn mismatched_or_skip<T>(options: SerializationOptions, path: &str, message: &str) -> Result<Option<T>, Error> {
    if options.mismatched_types_policy.is_throw() {
        Err(Error::MismatchedTypes { path: path.to_string(), message: message.to_string() })
    } else {
        Ok(None)
    }
}

/// Reads a scalar of type `T` out of `value`, applying the relevant policy
/// when the archive value is present but the wrong shape or out of range.
///
/// A `Null` value is never treated as a mismatch (spec: "Null value is
/// excluded from MismatchedTypesPolicy processing" in the original stub) —
/// it simply means the field wasn't loaded, same as a missing key.
fn load_scalar<T: Scalar>(value: &TestValue, options: SerializationOptions, path: &str) -> Result<Option<T>, Error> {
    match value {
        TestValue::Null => Ok(None),
        TestValue::Number(n) => match T::try_from_number(*n) {
            Some(v) => Ok(Some(v)),
            None => overflow_or_skip(options, path, *n),
        },
        TestValue::Str(_) | TestValue::Array(_) | TestValue::Object(_) => {
            mismatched_or_skip(options, path, "expected a number or bool")
        }
    }
}

fn load_string(value: &TestValue, options: SerializationOptions, path: &str) -> Result<Option<String>, Error> {
    match value {
        TestValue::Null => Ok(None),
        TestValue::Str(s) => Ok(Some(s.clone())),
        TestValue::Number(_) | TestValue::Array(_) | TestValue::Object(_) => {
            if options.mismatched_types_policy.is_throw() {
                Err(Error::MismatchedTypes { path: path.to_string(), message: "expected a string".to_string() })
            } else {
                Ok(None)
            }
        }
    }
}

/// The zero-sized [`Backend`] token for the in-memory test tree.
pub struct TestBackend;

impl Backend for TestBackend {
    const ARCHIVE_TYPE: &'static str = "test";
    const PATH_SEPARATOR: char = '/';
    const IS_BINARY: bool = true;

    type RootSave = RootSave;
    type RootLoad = RootLoad;
    type ObjectSave = ObjectScope;
    type ObjectLoad = ObjectScope;
    type ArraySave = ArrayScope;
    type ArrayLoad = ArrayScope;
    type BinarySave = Unsupported;
    type BinaryLoad = Unsupported;
}

impl crate::traits::SupportsKey<String> for TestBackend {
    const SUPPORTED: bool = true;
}

impl crate::traits::SupportsBinTimestampKey for TestBackend {}
impl crate::traits::SupportsBinary for TestBackend {}
impl crate::traits::SupportsAttribute for TestBackend {}
impl crate::traits::SupportsRootArray for TestBackend {}

/// Common state every real scope carries: its node, its path, and the
/// shared context/options for the operation it belongs to.
struct State {
    node: Node,
    path: String,
    context: SharedContext,
    options: SerializationOptions,
}

impl State {
    fn child(&self, node: Node, segment: &str) -> State {
        State {
            node,
            path: child_path(&self.path, segment),
            context: Rc::clone(&self.context),
            options: self.options,
        }
    }
}

macro_rules! impl_scope_common {
    ($ty:ident, $mode:expr) => {
        impl ScopeCommon for $ty {
            fn path(&self) -> String {
                self.state.path.clone()
            }

            fn context(&self) -> SharedContext {
                Rc::clone(&self.state.context)
            }

            fn options(&self) -> SerializationOptions {
                self.state.options
            }

            fn mode(&self) -> Mode {
                $mode
            }
        }
    };
}

/// Root scope, writing. Constructed once per `Save` with an empty node that
/// the first call (`serialize_value`/`open_object_scope`/`open_array_scope`)
/// fills in.
pub struct RootSave {
    state: State,
}

impl RootSave {
    pub fn new(node: Node, context: SharedContext, options: SerializationOptions) -> Self {
        Self { state: State { node, path: String::new(), context, options } }
    }
}

impl_scope_common!(RootSave, Mode::Save);

impl RootSaveScope<TestBackend> for RootSave {
    fn serialize_value<T: Scalar>(&mut self, value: &T) -> Result<(), Error> {
        *self.state.node.borrow_mut() = TestValue::Number(value.to_number());
        Ok(())
    }

    fn serialize_string(&mut self, value: &str) -> Result<(), Error> {
        *self.state.node.borrow_mut() = TestValue::Str(value.to_string());
        Ok(())
    }

    fn open_object_scope(&mut self, _n_fields_hint: usize) -> Result<ObjectScope, Error> {
        *self.state.node.borrow_mut() = TestValue::Object(BTreeMap::new());
        Ok(ObjectScope { state: State { node: Rc::clone(&self.state.node), path: self.state.path.clone(), context: Rc::clone(&self.state.context), options: self.state.options } })
    }

    fn open_array_scope(&mut self, arr_size: usize) -> Result<ArrayScope, Error> {
        *self.state.node.borrow_mut() = TestValue::Array(Vec::with_capacity(arr_size));
        Ok(ArrayScope { state: State { node: Rc::clone(&self.state.node), path: self.state.path.clone(), context: Rc::clone(&self.state.context), options: self.state.options }, load_index: 0 })
    }

    fn finalize(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Root scope, reading.
pub struct RootLoad {
    state: State,
}

impl RootLoad {
    pub fn new(node: Node, context: SharedContext, options: SerializationOptions) -> Self {
        Self { state: State { node, path: String::new(), context, options } }
    }
}

impl_scope_common!(RootLoad, Mode::Load);

impl RootLoadScope<TestBackend> for RootLoad {
    fn serialize_value<T: Scalar>(&mut self, value: &mut T) -> Result<bool, Error> {
        let loaded = load_scalar::<T>(&self.state.node.borrow(), self.state.options, &self.state.path)?;
        Ok(match loaded {
            Some(v) => {
                *value = v;
                true
            }
            None => false,
        })
    }

    fn serialize_string(&mut self, value: &mut String) -> Result<bool, Error> {
        let loaded = load_string(&self.state.node.borrow(), self.state.options, &self.state.path)?;
        Ok(match loaded {
            Some(s) => {
                *value = s;
                true
            }
            None => false,
        })
    }

    fn open_object_scope(&mut self, _n_fields_hint: usize) -> Result<Option<ObjectScope>, Error> {
        let is_object = matches!(&*self.state.node.borrow(), TestValue::Object(_));
        if !is_object {
            return mismatched_or_skip(self.state.options, &self.state.path, "expected an object");
        }
        Ok(Some(ObjectScope { state: State { node: Rc::clone(&self.state.node), path: self.state.path.clone(), context: Rc::clone(&self.state.context), options: self.state.options } }))
    }

    fn open_array_scope(&mut self, _arr_size: usize) -> Result<Option<ArrayScope>, Error> {
        let is_array = matches!(&*self.state.node.borrow(), TestValue::Array(_));
        if !is_array {
            return mismatched_or_skip(self.state.options, &self.state.path, "expected an array");
        }
        Ok(Some(ArrayScope { state: State { node: Rc::clone(&self.state.node), path: self.state.path.clone(), context: Rc::clone(&self.state.context), options: self.state.options }, load_index: 0 }))
    }
}

/// Object scope, both directions: the tree representation doesn't
/// distinguish Save from Load, so one struct serves [`ObjectSaveScope`] and
/// [`ObjectLoadScope`] (the direction is fixed by which trait the caller
/// uses it through, tracked only for [`ScopeCommon::mode`] via the node's
/// own shape — an object scope never changes shape mid-traversal, so
/// `Mode` here is reported from how it was opened).
pub struct ObjectScope {
    state: State,
}

impl ObjectScope {
    fn with_object<R>(&self, f: impl FnOnce(&BTreeMap<String, Node>) -> R) -> R {
        match &*self.state.node.borrow() {
            TestValue::Object(map) => f(map),
            _ => unreachable!("ObjectScope node is always TestValue::Object"),
        }
    }

    fn with_object_mut<R>(&self, f: impl FnOnce(&mut BTreeMap<String, Node>) -> R) -> R {
        match &mut *self.state.node.borrow_mut() {
            TestValue::Object(map) => f(map),
            _ => unreachable!("ObjectScope node is always TestValue::Object"),
        }
    }

    fn entry(&self, key: &str) -> Option<Node> {
        self.with_object(|map| map.get(key).cloned())
    }

    fn insert(&self, key: &str, value: TestValue) -> Node {
        let node = new_node(value);
        self.with_object_mut(|map| {
            map.insert(key.to_string(), Rc::clone(&node));
        });
        node
    }
}

impl ScopeCommon for ObjectScope {
    fn path(&self) -> String {
        self.state.path.clone()
    }

    fn context(&self) -> SharedContext {
        Rc::clone(&self.state.context)
    }

    fn options(&self) -> SerializationOptions {
        self.state.options
    }

    fn mode(&self) -> Mode {
        Mode::Save
    }
}

impl ObjectSaveScope<TestBackend> for ObjectScope {
    fn serialize_value<T: Scalar>(&mut self, key: &str, value: &T) -> Result<(), Error> {
        self.insert(key, TestValue::Number(value.to_number()));
        Ok(())
    }

    fn serialize_string(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.insert(key, TestValue::Str(value.to_string()));
        Ok(())
    }

    fn open_object_scope(&mut self, key: &str, _n_fields: usize) -> Result<Option<ObjectScope>, Error> {
        let node = self.insert(key, TestValue::Object(BTreeMap::new()));
        Ok(Some(ObjectScope { state: self.state.child(node, key) }))
    }

    fn open_array_scope(&mut self, key: &str, size: usize) -> Result<Option<ArrayScope>, Error> {
        let node = self.insert(key, TestValue::Array(Vec::with_capacity(size)));
        Ok(Some(ArrayScope { state: self.state.child(node, key), load_index: 0 }))
    }
}

impl ObjectLoadScope<TestBackend> for ObjectScope {
    fn serialize_value<T: Scalar>(&mut self, key: &str, value: &mut T) -> Result<bool, Error> {
        let Some(node) = self.entry(key) else { return Ok(false) };
        let path = child_path(&self.state.path, key);
        let loaded = load_scalar::<T>(&node.borrow(), self.state.options, &path)?;
        Ok(match loaded {
            Some(v) => {
                *value = v;
                true
            }
            None => false,
        })
    }

    fn serialize_string(&mut self, key: &str, value: &mut String) -> Result<bool, Error> {
        let Some(node) = self.entry(key) else { return Ok(false) };
        let path = child_path(&self.state.path, key);
        let loaded = load_string(&node.borrow(), self.state.options, &path)?;
        Ok(match loaded {
            Some(s) => {
                *value = s;
                true
            }
            None => false,
        })
    }

    fn open_object_scope(&mut self, key: &str, _n_fields: usize) -> Result<Option<ObjectScope>, Error> {
        let Some(node) = self.entry(key) else { return Ok(None) };
        if !matches!(&*node.borrow(), TestValue::Object(_)) {
            return mismatched_or_skip(self.state.options, &child_path(&self.state.path, key), "expected an object");
        }
        Ok(Some(ObjectScope { state: self.state.child(node, key) }))
    }

    fn open_array_scope(&mut self, key: &str, _size: usize) -> Result<Option<ArrayScope>, Error> {
        let Some(node) = self.entry(key) else { return Ok(None) };
        if !matches!(&*node.borrow(), TestValue::Array(_)) {
            return mismatched_or_skip(self.state.options, &child_path(&self.state.path, key), "expected an array");
        }
        Ok(Some(ArrayScope { state: self.state.child(node, key), load_index: 0 }))
    }

    fn visit_keys(&self, visit: &mut dyn FnMut(&str)) {
        self.with_object(|map| {
            for key in map.keys() {
                visit(key);
            }
        });
    }

    fn estimated_size(&self) -> usize {
        self.with_object(|map| map.len())
    }
}

/// Array scope, both directions. `load_index` tracks the next element to
/// read; it is unused on `Save`, where elements are always appended.
pub struct ArrayScope {
    state: State,
    load_index: usize,
}

impl ArrayScope {
    fn with_array<R>(&self, f: impl FnOnce(&[Node]) -> R) -> R {
        match &*self.state.node.borrow() {
            TestValue::Array(items) => f(items),
            _ => unreachable!("ArrayScope node is always TestValue::Array"),
        }
    }

    fn push(&self, value: TestValue) -> Node {
        let node = new_node(value);
        match &mut *self.state.node.borrow_mut() {
            TestValue::Array(items) => items.push(Rc::clone(&node)),
            _ => unreachable!("ArrayScope node is always TestValue::Array"),
        }
        node
    }

    /// Returns the node at `load_index` and advances it, or an
    /// [`Error::OutOfRange`] if the array has been fully consumed (spec
    /// §4.1: reading past the declared end of an array is always an error,
    /// never subject to a policy).
    fn next_for_load(&mut self) -> Result<Node, Error> {
        let size = self.get_size();
        if self.load_index >= size {
            return Err(Error::OutOfRange { path: self.state.path.clone(), index: self.load_index, size });
        }
        let node = self.with_array(|items| Rc::clone(&items[self.load_index]));
        self.load_index += 1;
        Ok(node)
    }
}

impl ScopeCommon for ArrayScope {
    fn path(&self) -> String {
        self.state.path.clone()
    }

    fn context(&self) -> SharedContext {
        Rc::clone(&self.state.context)
    }

    fn options(&self) -> SerializationOptions {
        self.state.options
    }

    fn mode(&self) -> Mode {
        Mode::Save
    }
}

impl ArraySaveScope<TestBackend> for ArrayScope {
    fn serialize_value<T: Scalar>(&mut self, value: &T) -> Result<(), Error> {
        self.push(TestValue::Number(value.to_number()));
        Ok(())
    }

    fn serialize_string(&mut self, value: &str) -> Result<(), Error> {
        self.push(TestValue::Str(value.to_string()));
        Ok(())
    }

    fn open_object_scope(&mut self, _n_fields: usize) -> Result<Option<ObjectScope>, Error> {
        let index = self.with_array(|items| items.len());
        let node = self.push(TestValue::Object(BTreeMap::new()));
        Ok(Some(ObjectScope { state: self.state.child(node, &index.to_string()) }))
    }

    fn open_array_scope(&mut self, size: usize) -> Result<Option<ArrayScope>, Error> {
        let index = self.with_array(|items| items.len());
        let node = self.push(TestValue::Array(Vec::with_capacity(size)));
        Ok(Some(ArrayScope { state: self.state.child(node, &index.to_string()), load_index: 0 }))
    }
}

impl ArrayLoadScope<TestBackend> for ArrayScope {
    fn serialize_value<T: Scalar>(&mut self, value: &mut T) -> Result<(), Error> {
        let node = self.next_for_load()?;
        let index = self.load_index - 1;
        let path = child_path(&self.state.path, &index.to_string());
        match load_scalar::<T>(&node.borrow(), self.state.options, &path)? {
            Some(v) => *value = v,
            None => {}
        }
        Ok(())
    }

    fn serialize_string(&mut self, value: &mut String) -> Result<(), Error> {
        let node = self.next_for_load()?;
        let index = self.load_index - 1;
        let path = child_path(&self.state.path, &index.to_string());
        match load_string(&node.borrow(), self.state.options, &path)? {
            Some(s) => *value = s,
            None => {}
        }
        Ok(())
    }

    fn open_object_scope(&mut self, _n_fields: usize) -> Result<Option<ObjectScope>, Error> {
        let node = self.next_for_load()?;
        let index = self.load_index - 1;
        if !matches!(&*node.borrow(), TestValue::Object(_)) {
            return mismatched_or_skip(self.state.options, &child_path(&self.state.path, &index.to_string()), "expected an object");
        }
        Ok(Some(ObjectScope { state: self.state.child(node, &index.to_string()) }))
    }

    fn open_array_scope(&mut self, _size: usize) -> Result<Option<ArrayScope>, Error> {
        let node = self.next_for_load()?;
        let index = self.load_index - 1;
        if !matches!(&*node.borrow(), TestValue::Array(_)) {
            return mismatched_or_skip(self.state.options, &child_path(&self.state.path, &index.to_string()), "expected an array");
        }
        Ok(Some(ArrayScope { state: self.state.child(node, &index.to_string()), load_index: 0 }))
    }

    fn is_end(&self) -> bool {
        self.load_index >= self.get_size()
    }

    fn get_size(&self) -> usize {
        self.with_array(|items| items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializationContext;

    // `ObjectScope`/`ArrayScope` implement both the `*Save` and `*Load`
    // variant of their trait, so call sites here disambiguate with
    // fully-qualified syntax the way a generic `B::ObjectSave` caller never
    // has to (it only ever has one of the two bounds in scope).

    fn fresh_context() -> SharedContext {
        Rc::new(RefCell::new(SerializationContext::new()))
    }

    #[test]
    fn round_trips_a_scalar_root() {
        let node = new_node(TestValue::Null);
        let mut save = RootSave::new(Rc::clone(&node), fresh_context(), SerializationOptions::new());
        save.serialize_value(&42i32).unwrap();

        let mut load = RootLoad::new(node, fresh_context(), SerializationOptions::new());
        let mut out = 0i32;
        assert!(load.serialize_value(&mut out).unwrap());
        assert_eq!(out, 42);
    }

    #[test]
    fn object_scope_round_trips_fields_and_reports_missing() {
        let node = new_node(TestValue::Null);
        let mut root_save = RootSave::new(Rc::clone(&node), fresh_context(), SerializationOptions::new());
        let mut obj = root_save.open_object_scope(2).unwrap();
        ObjectSaveScope::<TestBackend>::serialize_value(&mut obj, "age", &30u8).unwrap();
        ObjectSaveScope::<TestBackend>::serialize_string(&mut obj, "name", "Ada").unwrap();

        let mut root_load = RootLoad::new(node, fresh_context(), SerializationOptions::new());
        let mut obj_load = root_load.open_object_scope(0).unwrap().unwrap();

        let mut age = 0u8;
        assert!(ObjectLoadScope::<TestBackend>::serialize_value(&mut obj_load, "age", &mut age).unwrap());
        assert_eq!(age, 30);

        let mut name = String::new();
        assert!(ObjectLoadScope::<TestBackend>::serialize_string(&mut obj_load, "name", &mut name).unwrap());
        assert_eq!(name, "Ada");

        let mut missing = 0u8;
        assert!(!ObjectLoadScope::<TestBackend>::serialize_value(&mut obj_load, "nope", &mut missing).unwrap());
    }

    #[test]
    fn array_scope_reports_out_of_range_past_declared_size() {
        let node = new_node(TestValue::Array(Vec::new()));
        let mut arr = ArrayScope {
            state: State { node, path: String::new(), context: fresh_context(), options: SerializationOptions::new() },
            load_index: 0,
        };
        ArraySaveScope::<TestBackend>::serialize_value(&mut arr, &1i32).unwrap();
        ArraySaveScope::<TestBackend>::serialize_value(&mut arr, &2i32).unwrap();

        let mut out = 0i32;
        assert!(ArrayLoadScope::<TestBackend>::serialize_value(&mut arr, &mut out).is_ok());
        assert_eq!(out, 1);
        assert!(ArrayLoadScope::<TestBackend>::serialize_value(&mut arr, &mut out).is_ok());
        assert_eq!(out, 2);
        assert!(arr.is_end());

        let err = ArrayLoadScope::<TestBackend>::serialize_value(&mut arr, &mut out).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { index: 2, size: 2, .. }));
    }

    #[test]
    fn nested_object_in_array_round_trips() {
        let node = new_node(TestValue::Null);
        let mut root_save = RootSave::new(Rc::clone(&node), fresh_context(), SerializationOptions::new());
        let mut arr = root_save.open_array_scope(1).unwrap();
        let mut elem = ArraySaveScope::<TestBackend>::open_object_scope(&mut arr, 1).unwrap().unwrap();
        ObjectSaveScope::<TestBackend>::serialize_value(&mut elem, "n", &7i64).unwrap();

        let mut root_load = RootLoad::new(node, fresh_context(), SerializationOptions::new());
        let mut arr_load = root_load.open_array_scope(0).unwrap().unwrap();
        let mut elem_load = ArrayLoadScope::<TestBackend>::open_object_scope(&mut arr_load, 0).unwrap().unwrap();
        let mut n = 0i64;
        assert!(ObjectLoadScope::<TestBackend>::serialize_value(&mut elem_load, "n", &mut n).unwrap());
        assert_eq!(n, 7);
        assert_eq!(elem_load.path(), "/0");
    }
}
