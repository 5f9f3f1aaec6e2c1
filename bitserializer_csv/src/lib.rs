//! A row-shaped [`bitserializer::scope::Backend`] over the `csv` crate.
//!
//! CSV has exactly one legal top-level shape: a table of records, one row
//! per aggregate, one column per field. Unlike `bitserializer_json`'s
//! tree-shaped `Value`, there is no nested-object/nested-array concept below
//! one record — the root scope only ever opens an array, and that array's
//! elements only ever open flat object scopes whose fields are plain
//! scalars/strings (no further nesting). Every other shape a caller might
//! request (a bare scalar document, a bare object document, a field nested
//! inside a record) is a [`bitserializer::error::Error::MismatchedTypes`],
//! which is exactly how the original library's CSV archive reports asking
//! it for something it cannot represent.

use std::cell::RefCell;
use std::rc::Rc;

use bitserializer::context::SerializationContext;
use bitserializer::convert::Number;
use bitserializer::error::{Error, ParseLocation, Result};
use bitserializer::facade::{decode_stream, encode_stream, Medium};
use bitserializer::options::SerializationOptions;
use bitserializer::scope::{
    ArrayLoadScope, ArraySaveScope, Backend, Mode, ObjectLoadScope, ObjectSaveScope, RootLoadScope,
    RootSaveScope, Scalar, ScalarNumberConv, ScopeCommon, SharedContext, Unsupported,
};

/// One record's fields, in the order they were first written (`Save`) or the
/// order the file's header declared them (`Load`).
type Row = Rc<RefCell<Vec<(String, String)>>>;
/// The table: every record of the document, in file/write order.
type Rows = Rc<RefCell<Vec<Row>>>;

fn new_row() -> Row {
    Rc::new(RefCell::new(Vec::new()))
}

fn child_path(parent: &str, segment: &str) -> String {
    format!("{parent}{}{segment}", Csv::PATH_SEPARATOR)
}

fn number_to_field(number: Number) -> String {
    match number {
        Number::Int(v) => v.to_string(),
        Number::UInt(v) => v.to_string(),
        Number::Float(v) => v.to_string(),
        Number::Bool(v) => v.to_string(),
    }
}

/// Parses a CSV cell into [`Number`], trying the narrowest category that
/// fits (signed, then unsigned, then float, then the two boolean literals),
/// mirroring `serde_json`'s own integer-then-float preference on the JSON
/// side of this workspace.
fn field_to_number(raw: &str) -> Option<Number> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(Number::Int(v));
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Some(Number::UInt(v));
    }
    if let Ok(v) = raw.parse::<f64>() {
        return Some(Number::Float(v));
    }
    match raw {
        "true" => Some(Number::Bool(true)),
        "false" => Some(Number::Bool(false)),
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

fn mismatched_or_skip_bool(options: SerializationOptions, path: &str, message: &str) -> Result<bool> {
    if options.mismatched_types_policy.is_throw() {
        Err(Error::MismatchedTypes { path: path.to_string(), message: message.to_string() })
    } else {
        Ok(false)
    }
}

/// An empty cell is never loaded rather than mismatched — same "null is
/// excluded from mismatched-type processing" rule the JSON backend applies
/// to `Value::Null` (spec §3).
fn load_scalar<T: Scalar>(raw: &str, options: SerializationOptions, path: &str) -> Result<Option<T>> {
    if raw.is_empty() {
        return Ok(None);
    }
    match field_to_number(raw) {
        Some(n) => match T::try_from_number(n) {
            Some(v) => Ok(Some(v)),
            None => overflow_or_skip(options, path, n),
        },
        None => mismatched_or_skip(options, path, "expected a number or bool"),
    }
}

/// The zero-sized [`Backend`] token for the CSV format.
pub struct Csv;

impl Backend for Csv {
    const ARCHIVE_TYPE: &'static str = "csv";
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

impl bitserializer::traits::SupportsKey<String> for Csv {
    const SUPPORTED: bool = true;
}

impl bitserializer::traits::SupportsRootArray for Csv {}

impl Medium for Csv {
    fn new_root_save(options: SerializationOptions) -> Result<Self::RootSave> {
        Ok(RootSave::new(Rc::new(RefCell::new(Vec::new())), Rc::new(RefCell::new(SerializationContext::new())), options))
    }

    fn finish_root_save(scope: Self::RootSave, options: SerializationOptions) -> Result<Vec<u8>> {
        let rows = scope.state.rows.borrow();

        // Header = union of every row's keys, in first-seen order: one user
        // type serialized uniformly produces the same columns every row, but
        // nothing here assumes that in order to build a legal file.
        let mut header: Vec<String> = Vec::new();
        for row in rows.iter() {
            for (key, _) in row.borrow().iter() {
                if !header.contains(key) {
                    header.push(key.clone());
                }
            }
        }

        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        let parse_err = |err: csv::Error| Error::Parsing { path: String::new(), location: ParseLocation::UNKNOWN, message: err.to_string() };
        writer.write_record(&header).map_err(parse_err)?;
        for row in rows.iter() {
            let row = row.borrow();
            let record: Vec<String> =
                header.iter().map(|col| row.iter().find(|(k, _)| k == col).map(|(_, v)| v.clone()).unwrap_or_default()).collect();
            writer.write_record(&record).map_err(parse_err)?;
        }
        let bytes = writer.into_inner().map_err(|err| Error::InputOutputError(err.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|err| Error::InputOutputError(err.to_string()))?;
        Ok(encode_stream(&text, options))
    }

    fn new_root_load(bytes: &[u8], options: SerializationOptions) -> Result<Self::RootLoad> {
        let text = decode_stream(bytes, options)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        let parse_err = |err: csv::Error| Error::Parsing { path: String::new(), location: ParseLocation::UNKNOWN, message: err.to_string() };
        let header = reader.headers().map_err(parse_err)?.clone();

        let mut rows: Vec<Row> = Vec::new();
        for result in reader.records() {
            let record = result.map_err(parse_err)?;
            let fields = header.iter().zip(record.iter()).map(|(k, v)| (k.to_string(), v.to_string())).collect();
            rows.push(Rc::new(RefCell::new(fields)));
        }

        Ok(RootLoad::new(Rc::new(RefCell::new(rows)), Rc::new(RefCell::new(SerializationContext::new())), options))
    }
}

/// State shared by the root scope and the root-level array scope: both just
/// view the whole table, never a single record.
struct RowsState {
    rows: Rows,
    path: String,
    context: SharedContext,
    options: SerializationOptions,
}

/// State owned by one record's object scope.
struct ObjectState {
    row: Row,
    path: String,
    context: SharedContext,
    options: SerializationOptions,
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

const ROOT_SHAPE_MESSAGE: &str = "csv backend only supports an array of records at the root";

pub struct RootSave {
    state: RowsState,
}

impl RootSave {
    pub fn new(rows: Rows, context: SharedContext, options: SerializationOptions) -> Self {
        Self { state: RowsState { rows, path: String::new(), context, options } }
    }
}

impl_scope_common!(RootSave, Mode::Save);

impl RootSaveScope<Csv> for RootSave {
    fn serialize_value<T: Scalar>(&mut self, _value: &T) -> Result<()> {
        Err(Error::MismatchedTypes { path: self.state.path.clone(), message: ROOT_SHAPE_MESSAGE.to_string() })
    }

    fn serialize_string(&mut self, _value: &str) -> Result<()> {
        Err(Error::MismatchedTypes { path: self.state.path.clone(), message: ROOT_SHAPE_MESSAGE.to_string() })
    }

    fn open_object_scope(&mut self, _n_fields_hint: usize) -> Result<ObjectScope> {
        Err(Error::MismatchedTypes { path: self.state.path.clone(), message: ROOT_SHAPE_MESSAGE.to_string() })
    }

    fn open_array_scope(&mut self, _arr_size: usize) -> Result<ArrayScope> {
        Ok(ArrayScope {
            state: RowsState {
                rows: Rc::clone(&self.state.rows),
                path: self.state.path.clone(),
                context: Rc::clone(&self.state.context),
                options: self.state.options,
            },
            load_index: 0,
        })
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct RootLoad {
    state: RowsState,
}

impl RootLoad {
    pub fn new(rows: Rows, context: SharedContext, options: SerializationOptions) -> Self {
        Self { state: RowsState { rows, path: String::new(), context, options } }
    }
}

impl_scope_common!(RootLoad, Mode::Load);

impl RootLoadScope<Csv> for RootLoad {
    fn serialize_value<T: Scalar>(&mut self, _value: &mut T) -> Result<bool> {
        mismatched_or_skip_bool(self.state.options, &self.state.path, ROOT_SHAPE_MESSAGE)
    }

    fn serialize_string(&mut self, _value: &mut String) -> Result<bool> {
        mismatched_or_skip_bool(self.state.options, &self.state.path, ROOT_SHAPE_MESSAGE)
    }

    fn open_object_scope(&mut self, _n_fields_hint: usize) -> Result<Option<ObjectScope>> {
        mismatched_or_skip(self.state.options, &self.state.path, ROOT_SHAPE_MESSAGE)
    }

    fn open_array_scope(&mut self, _arr_size: usize) -> Result<Option<ArrayScope>> {
        Ok(Some(ArrayScope {
            state: RowsState {
                rows: Rc::clone(&self.state.rows),
                path: self.state.path.clone(),
                context: Rc::clone(&self.state.context),
                options: self.state.options,
            },
            load_index: 0,
        }))
    }
}

/// One CSV record, both directions: there is no distinct tree shape between
/// `Save` and `Load` here either, same reasoning as the in-crate test
/// backend's `ObjectScope`.
pub struct ObjectScope {
    state: ObjectState,
}

impl ObjectScope {
    fn set(&self, key: &str, value: String) {
        let mut row = self.state.row.borrow_mut();
        match row.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => row.push((key.to_string(), value)),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.state.row.borrow().iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
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

const NO_NESTED_SCOPE_MESSAGE: &str = "csv records have no nested object or array scope";

impl ObjectSaveScope<Csv> for ObjectScope {
    fn serialize_value<T: Scalar>(&mut self, key: &str, value: &T) -> Result<()> {
        self.set(key, number_to_field(value.to_number()));
        Ok(())
    }

    fn serialize_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set(key, value.to_string());
        Ok(())
    }

    fn open_object_scope(&mut self, key: &str, _n_fields: usize) -> Result<Option<ObjectScope>> {
        mismatched_or_skip(self.state.options, &child_path(&self.state.path, key), NO_NESTED_SCOPE_MESSAGE)
    }

    fn open_array_scope(&mut self, key: &str, _size: usize) -> Result<Option<ArrayScope>> {
        mismatched_or_skip(self.state.options, &child_path(&self.state.path, key), NO_NESTED_SCOPE_MESSAGE)
    }
}

impl ObjectLoadScope<Csv> for ObjectScope {
    fn serialize_value<T: Scalar>(&mut self, key: &str, value: &mut T) -> Result<bool> {
        let Some(raw) = self.get(key) else { return Ok(false) };
        let path = child_path(&self.state.path, key);
        Ok(match load_scalar::<T>(&raw, self.state.options, &path)? {
            Some(v) => {
                *value = v;
                true
            }
            None => false,
        })
    }

    fn serialize_string(&mut self, key: &str, value: &mut String) -> Result<bool> {
        match self.get(key) {
            Some(raw) => {
                *value = raw;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn open_object_scope(&mut self, key: &str, _n_fields: usize) -> Result<Option<ObjectScope>> {
        mismatched_or_skip(self.state.options, &child_path(&self.state.path, key), NO_NESTED_SCOPE_MESSAGE)
    }

    fn open_array_scope(&mut self, key: &str, _size: usize) -> Result<Option<ArrayScope>> {
        mismatched_or_skip(self.state.options, &child_path(&self.state.path, key), NO_NESTED_SCOPE_MESSAGE)
    }

    fn visit_keys(&self, visit: &mut dyn FnMut(&str)) {
        for (key, _) in self.state.row.borrow().iter() {
            visit(key);
        }
    }

    fn estimated_size(&self) -> usize {
        self.state.row.borrow().len()
    }
}

/// The root-level array of records. `load_index` tracks the next record to
/// read; unused on `Save`, where records are always appended.
pub struct ArrayScope {
    state: RowsState,
    load_index: usize,
}

impl ArrayScope {
    fn next_for_load(&mut self) -> Result<Row> {
        let size = self.get_size();
        if self.load_index >= size {
            return Err(Error::OutOfRange { path: self.state.path.clone(), index: self.load_index, size });
        }
        let row = Rc::clone(&self.state.rows.borrow()[self.load_index]);
        self.load_index += 1;
        Ok(row)
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

const RECORD_MUST_BE_OBJECT_MESSAGE: &str = "csv rows must be records (objects), not bare scalars or strings";

impl ArraySaveScope<Csv> for ArrayScope {
    fn serialize_value<T: Scalar>(&mut self, _value: &T) -> Result<()> {
        Err(Error::MismatchedTypes { path: self.state.path.clone(), message: RECORD_MUST_BE_OBJECT_MESSAGE.to_string() })
    }

    fn serialize_string(&mut self, _value: &str) -> Result<()> {
        Err(Error::MismatchedTypes { path: self.state.path.clone(), message: RECORD_MUST_BE_OBJECT_MESSAGE.to_string() })
    }

    fn open_object_scope(&mut self, _n_fields: usize) -> Result<Option<ObjectScope>> {
        let row = new_row();
        self.state.rows.borrow_mut().push(Rc::clone(&row));
        let index = self.state.rows.borrow().len() - 1;
        Ok(Some(ObjectScope {
            state: ObjectState {
                row,
                path: child_path(&self.state.path, &index.to_string()),
                context: Rc::clone(&self.state.context),
                options: self.state.options,
            },
        }))
    }

    fn open_array_scope(&mut self, _size: usize) -> Result<Option<ArrayScope>> {
        mismatched_or_skip(self.state.options, &self.state.path, "csv has no nested array scope inside a record's array")
    }
}

impl ArrayLoadScope<Csv> for ArrayScope {
    fn serialize_value<T: Scalar>(&mut self, _value: &mut T) -> Result<()> {
        Err(Error::MismatchedTypes { path: self.state.path.clone(), message: RECORD_MUST_BE_OBJECT_MESSAGE.to_string() })
    }

    fn serialize_string(&mut self, _value: &mut String) -> Result<()> {
        Err(Error::MismatchedTypes { path: self.state.path.clone(), message: RECORD_MUST_BE_OBJECT_MESSAGE.to_string() })
    }

    fn open_object_scope(&mut self, _n_fields: usize) -> Result<Option<ObjectScope>> {
        let row = self.next_for_load()?;
        let index = self.load_index - 1;
        Ok(Some(ObjectScope {
            state: ObjectState {
                row,
                path: child_path(&self.state.path, &index.to_string()),
                context: Rc::clone(&self.state.context),
                options: self.state.options,
            },
        }))
    }

    fn open_array_scope(&mut self, _size: usize) -> Result<Option<ArrayScope>> {
        mismatched_or_skip(self.state.options, &self.state.path, "csv has no nested array scope inside a record's array")
    }

    fn is_end(&self) -> bool {
        self.load_index >= self.get_size()
    }

    fn get_size(&self) -> usize {
        self.state.rows.borrow().len()
    }
}
