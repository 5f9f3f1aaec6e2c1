//! A JSON [`Backend`] over `serde_json::Value`, a worked example of the
//! Backend Contract (spec §6, SPEC_FULL.md §4.9).
//!
//! Grounded directly on `bitserializer::test_backend`'s tree-of-shared-nodes
//! shape — a `Rc<RefCell<serde_json::Value>>` tree stands in for
//! `Rc<RefCell<TestValue>>`, with `serde_json::Value`'s own
//! `Object`/`Array`/`Number`/`String`/`Bool`/`Null` variants replacing the
//! test double's bespoke `TestValue` enum. `serde_json` does the actual
//! text parsing/printing; this crate only adapts its `Value` tree to the
//! Scope Protocol and wires BOM/encoding handling through
//! [`bitserializer::facade::encode_stream`]/`decode_stream`.
//!
//! JSON has no binary-blob or attribute concept, so
//! [`Backend::BinarySave`]/[`Backend::BinaryLoad`] are
//! [`bitserializer::scope::Unsupported`] and `open_binary_scope`/
//! `open_attribute_scope` fall back to their `Ok(None)` defaults.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Number as JsonNumber, Value};

use bitserializer::convert::Number;
use bitserializer::error::{Error, ParseLocation, Result};
use bitserializer::facade::{decode_stream, encode_stream, Medium};
use bitserializer::options::SerializationOptions;
use bitserializer::scope::{
    ArrayLoadScope, ArraySaveScope, Backend, Mode, ObjectLoadScope, ObjectSaveScope, RootLoadScope,
    RootSaveScope, Scalar, ScalarNumberConv, ScopeCommon, SharedContext, Unsupported,
};

type Node = Rc<RefCell<Value>>;

fn new_node(value: Value) -> Node {
    Rc::new(RefCell::new(value))
}

fn child_path(parent: &str, segment: &str) -> String {
    format!("{parent}/{segment}")
}

fn number_to_value(number: Number) -> Value {
    match number {
        Number::Int(v) => Value::Number(JsonNumber::from(v)),
        Number::UInt(v) => Value::Number(JsonNumber::from(v)),
        Number::Float(v) => JsonNumber::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
        Number::Bool(b) => Value::Bool(b),
    }
}

fn value_to_number(value: &Value) -> Option<Number> {
    match value {
        Value::Bool(b) => Some(Number::Bool(*b)),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Some(Number::Int(v))
            } else if let Some(v) = n.as_u64() {
                Some(Number::UInt(v))
            } else {
                n.as_f64().map(Number::Float)
            }
        }
        _ => None,
    }
}

fn overflow_or_skip<T>(options: SerializationOptions, path: &str, found: Number) -> Result<Option<T>> {
    if options.overflow_number_policy.is_throw() {
        Err(Error::Overflow { path: path.to_string(), message: format!("{found:?} does not fit the target type") })
    } else {
        Ok(None)
    }
}

fn mismatched_or_skip<T>(options: SerializationOptions, path: &str, message: &str) -> Result<Option<T>> {
    if options.mismatched_types_policy.is_throw() {
        Err(Error::MismatchedTypes { path: path.to_string(), message: message.to_string() })
    } else {
        Ok(None)
    }
}

/// A `null` archive value is never a mismatch (spec §3: "Null values are
/// always excluded from mismatched-type processing"); it just means the
/// field was not loaded, same as a missing key.
fn load_scalar<T: Scalar>(value: &Value, options: SerializationOptions, path: &str) -> Result<Option<T>> {
    match value {
        Value::Null => Ok(None),
        _ => match value_to_number(value) {
            Some(n) => match T::try_from_number(n) {
                Some(v) => Ok(Some(v)),
                None => overflow_or_skip(options, path, n),
            },
            None => mismatched_or_skip(options, path, "expected a JSON number or boolean"),
        },
    }
}

fn load_string(value: &Value, options: SerializationOptions, path: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => mismatched_or_skip(options, path, "expected a JSON string"),
    }
}

/// The zero-sized [`Backend`] token for JSON.
pub struct Json;

impl Backend for Json {
    const ARCHIVE_TYPE: &'static str = "json";
    const PATH_SEPARATOR: char = '/';
    const IS_BINARY: bool = false;

    type RootSave = RootSave;
    type RootLoad = RootLoad;
    type ObjectSave = ObjectScope;
    type ObjectLoad = ObjectScope;
    type ArraySave = ArrayScope;
    type ArrayLoad = ArrayScope;
    type BinarySave = Unsupported;
    type BinaryLoad = Unsupported;
}

impl bitserializer::traits::SupportsKey<String> for Json {
    const SUPPORTED: bool = true;
}

impl bitserializer::traits::SupportsRootArray for Json {}

impl Medium for Json {
    fn new_root_save(options: SerializationOptions) -> Result<Self::RootSave> {
        Ok(RootSave::new(new_node(Value::Null), Rc::new(RefCell::new(bitserializer::context::SerializationContext::new())), options))
    }

    fn finish_root_save(scope: Self::RootSave, options: SerializationOptions) -> Result<Vec<u8>> {
        let value = scope.state.node.borrow();
        // `serde_json`'s pretty printer is fixed at two-space indentation;
        // `FormatOptions::padding_char`/`padding_char_num` (aimed at formats
        // whose writer exposes a custom indent unit) have no effect here.
        let text = if options.format_options.enable_format {
            serde_json::to_string_pretty(&*value)
        } else {
            serde_json::to_string(&*value)
        }
        .map_err(|err| Error::Parsing { path: String::new(), location: ParseLocation::UNKNOWN, message: err.to_string() })?;
        Ok(encode_stream(&text, options))
    }

    fn new_root_load(bytes: &[u8], options: SerializationOptions) -> Result<Self::RootLoad> {
        let text = decode_stream(bytes, options)?;
        let value: Value = serde_json::from_str(&text).map_err(|err| Error::Parsing {
            path: String::new(),
            location: ParseLocation::at_line_col(err.line(), err.column()),
            message: err.to_string(),
        })?;
        Ok(RootLoad::new(new_node(value), Rc::new(RefCell::new(bitserializer::context::SerializationContext::new())), options))
    }
}

struct State {
    node: Node,
    path: String,
    context: SharedContext,
    options: SerializationOptions,
}

impl State {
    fn child(&self, node: Node, segment: &str) -> State {
        State { node, path: child_path(&self.path, segment), context: Rc::clone(&self.context), options: self.options }
    }

    /// Root scope opens don't add a path segment — the root scope *is* the
    /// object/array, not a keyed member of it.
    fn same(&self, node: Node) -> State {
        State { node, path: self.path.clone(), context: Rc::clone(&self.context), options: self.options }
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

/// Root scope, writing.
pub struct RootSave {
    state: State,
}

impl RootSave {
    fn new(node: Node, context: SharedContext, options: SerializationOptions) -> Self {
        Self { state: State { node, path: String::new(), context, options } }
    }
}

impl_scope_common!(RootSave, Mode::Save);

impl RootSaveScope<Json> for RootSave {
    fn serialize_value<T: Scalar>(&mut self, value: &T) -> Result<()> {
        *self.state.node.borrow_mut() = number_to_value(value.to_number());
        Ok(())
    }

    fn serialize_string(&mut self, value: &str) -> Result<()> {
        *self.state.node.borrow_mut() = Value::String(value.to_string());
        Ok(())
    }

    fn write_null(&mut self) -> Result<()> {
        *self.state.node.borrow_mut() = Value::Null;
        Ok(())
    }

    fn open_object_scope(&mut self, _n_fields_hint: usize) -> Result<ObjectScope> {
        *self.state.node.borrow_mut() = Value::Object(Map::new());
        Ok(ObjectScope { state: self.state.same(Rc::clone(&self.state.node)) })
    }

    fn open_array_scope(&mut self, arr_size: usize) -> Result<ArrayScope> {
        *self.state.node.borrow_mut() = Value::Array(Vec::with_capacity(arr_size));
        Ok(ArrayScope { state: self.state.same(Rc::clone(&self.state.node)), load_index: 0 })
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Root scope, reading.
pub struct RootLoad {
    state: State,
}

impl RootLoad {
    fn new(node: Node, context: SharedContext, options: SerializationOptions) -> Self {
        Self { state: State { node, path: String::new(), context, options } }
    }
}

impl_scope_common!(RootLoad, Mode::Load);

impl RootLoadScope<Json> for RootLoad {
    fn serialize_value<T: Scalar>(&mut self, value: &mut T) -> Result<bool> {
        Ok(match load_scalar::<T>(&self.state.node.borrow(), self.state.options, &self.state.path)? {
            Some(v) => {
                *value = v;
                true
            }
            None => false,
        })
    }

    fn serialize_string(&mut self, value: &mut String) -> Result<bool> {
        Ok(match load_string(&self.state.node.borrow(), self.state.options, &self.state.path)? {
            Some(s) => {
                *value = s;
                true
            }
            None => false,
        })
    }

    fn open_object_scope(&mut self, _n_fields_hint: usize) -> Result<Option<ObjectScope>> {
        if !matches!(&*self.state.node.borrow(), Value::Object(_)) {
            return mismatched_or_skip(self.state.options, &self.state.path, "expected a JSON object");
        }
        Ok(Some(ObjectScope { state: self.state.same(Rc::clone(&self.state.node)) }))
    }

    fn open_array_scope(&mut self, _arr_size: usize) -> Result<Option<ArrayScope>> {
        if !matches!(&*self.state.node.borrow(), Value::Array(_)) {
            return mismatched_or_skip(self.state.options, &self.state.path, "expected a JSON array");
        }
        Ok(Some(ArrayScope { state: self.state.same(Rc::clone(&self.state.node)), load_index: 0 }))
    }
}

/// Object scope, both directions (the `Value` tree doesn't distinguish
/// Save from Load; the direction is fixed by which trait the caller uses).
pub struct ObjectScope {
    state: State,
}

impl ObjectScope {
    fn with_object<R>(&self, f: impl FnOnce(&Map<String, Value>) -> R) -> R {
        match &*self.state.node.borrow() {
            Value::Object(map) => f(map),
            _ => unreachable!("ObjectScope node is always Value::Object"),
        }
    }

    fn entry(&self, key: &str) -> Option<Node> {
        self.with_object(|map| map.get(key).cloned()).map(new_node)
    }

    fn insert(&self, key: &str, value: Value) -> Node {
        let node = new_node(value.clone());
        match &mut *self.state.node.borrow_mut() {
            Value::Object(map) => {
                map.insert(key.to_string(), value);
            }
            _ => unreachable!("ObjectScope node is always Value::Object"),
        }
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

impl ObjectSaveScope<Json> for ObjectScope {
    fn serialize_value<T: Scalar>(&mut self, key: &str, value: &T) -> Result<()> {
        self.insert(key, number_to_value(value.to_number()));
        Ok(())
    }

    fn serialize_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.insert(key, Value::String(value.to_string()));
        Ok(())
    }

    fn write_null(&mut self, key: &str) -> Result<()> {
        self.insert(key, Value::Null);
        Ok(())
    }

    fn open_object_scope(&mut self, key: &str, _n_fields: usize) -> Result<Option<ObjectScope>> {
        let node = self.insert(key, Value::Object(Map::new()));
        Ok(Some(ObjectScope { state: self.state.child(node, key) }))
    }

    fn open_array_scope(&mut self, key: &str, size: usize) -> Result<Option<ArrayScope>> {
        let node = self.insert(key, Value::Array(Vec::with_capacity(size)));
        Ok(Some(ArrayScope { state: self.state.child(node, key), load_index: 0 }))
    }
}

impl ObjectLoadScope<Json> for ObjectScope {
    fn serialize_value<T: Scalar>(&mut self, key: &str, value: &mut T) -> Result<bool> {
        let Some(node) = self.entry(key) else { return Ok(false) };
        let path = child_path(&self.state.path, key);
        Ok(match load_scalar::<T>(&node.borrow(), self.state.options, &path)? {
            Some(v) => {
                *value = v;
                true
            }
            None => false,
        })
    }

    fn serialize_string(&mut self, key: &str, value: &mut String) -> Result<bool> {
        let Some(node) = self.entry(key) else { return Ok(false) };
        let path = child_path(&self.state.path, key);
        Ok(match load_string(&node.borrow(), self.state.options, &path)? {
            Some(s) => {
                *value = s;
                true
            }
            None => false,
        })
    }

    fn open_object_scope(&mut self, key: &str, _n_fields: usize) -> Result<Option<ObjectScope>> {
        let Some(node) = self.entry(key) else { return Ok(None) };
        if !matches!(&*node.borrow(), Value::Object(_)) {
            return mismatched_or_skip(self.state.options, &child_path(&self.state.path, key), "expected a JSON object");
        }
        Ok(Some(ObjectScope { state: self.state.child(node, key) }))
    }

    fn open_array_scope(&mut self, key: &str, _size: usize) -> Result<Option<ArrayScope>> {
        let Some(node) = self.entry(key) else { return Ok(None) };
        if !matches!(&*node.borrow(), Value::Array(_)) {
            return mismatched_or_skip(self.state.options, &child_path(&self.state.path, key), "expected a JSON array");
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
/// read; unused on `Save`, where elements are always appended.
pub struct ArrayScope {
    state: State,
    load_index: usize,
}

impl ArrayScope {
    fn with_array<R>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        match &*self.state.node.borrow() {
            Value::Array(items) => f(items),
            _ => unreachable!("ArrayScope node is always Value::Array"),
        }
    }

    fn push(&self, value: Value) -> Node {
        let node = new_node(value.clone());
        match &mut *self.state.node.borrow_mut() {
            Value::Array(items) => items.push(value),
            _ => unreachable!("ArrayScope node is always Value::Array"),
        }
        node
    }

    /// Reading past the declared end is always an error (spec §4.1), never
    /// subject to a policy.
    fn next_for_load(&mut self) -> Result<Node> {
        let size = self.get_size();
        if self.load_index >= size {
            return Err(Error::OutOfRange { path: self.state.path.clone(), index: self.load_index, size });
        }
        let node = self.with_array(|items| new_node(items[self.load_index].clone()));
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

impl ArraySaveScope<Json> for ArrayScope {
    fn serialize_value<T: Scalar>(&mut self, value: &T) -> Result<()> {
        self.push(number_to_value(value.to_number()));
        Ok(())
    }

    fn serialize_string(&mut self, value: &str) -> Result<()> {
        self.push(Value::String(value.to_string()));
        Ok(())
    }

    fn write_null(&mut self) -> Result<()> {
        self.push(Value::Null);
        Ok(())
    }

    fn open_object_scope(&mut self, _n_fields: usize) -> Result<Option<ObjectScope>> {
        let index = self.with_array(|items| items.len());
        let node = self.push(Value::Object(Map::new()));
        Ok(Some(ObjectScope { state: self.state.child(node, &index.to_string()) }))
    }

    fn open_array_scope(&mut self, size: usize) -> Result<Option<ArrayScope>> {
        let index = self.with_array(|items| items.len());
        let node = self.push(Value::Array(Vec::with_capacity(size)));
        Ok(Some(ArrayScope { state: self.state.child(node, &index.to_string()), load_index: 0 }))
    }
}

impl ArrayLoadScope<Json> for ArrayScope {
    fn serialize_value<T: Scalar>(&mut self, value: &mut T) -> Result<()> {
        let node = self.next_for_load()?;
        let index = self.load_index - 1;
        let path = child_path(&self.state.path, &index.to_string());
        if let Some(v) = load_scalar::<T>(&node.borrow(), self.state.options, &path)? {
            *value = v;
        }
        Ok(())
    }

    fn serialize_string(&mut self, value: &mut String) -> Result<()> {
        let node = self.next_for_load()?;
        let index = self.load_index - 1;
        let path = child_path(&self.state.path, &index.to_string());
        if let Some(s) = load_string(&node.borrow(), self.state.options, &path)? {
            *value = s;
        }
        Ok(())
    }

    fn open_object_scope(&mut self, _n_fields: usize) -> Result<Option<ObjectScope>> {
        let node = self.next_for_load()?;
        let index = self.load_index - 1;
        if !matches!(&*node.borrow(), Value::Object(_)) {
            return mismatched_or_skip(self.state.options, &child_path(&self.state.path, &index.to_string()), "expected a JSON object");
        }
        Ok(Some(ObjectScope { state: self.state.child(node, &index.to_string()) }))
    }

    fn open_array_scope(&mut self, _size: usize) -> Result<Option<ArrayScope>> {
        let node = self.next_for_load()?;
        let index = self.load_index - 1;
        if !matches!(&*node.borrow(), Value::Array(_)) {
            return mismatched_or_skip(self.state.options, &child_path(&self.state.path, &index.to_string()), "expected a JSON array");
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
