use std::marker::PhantomData;

use crate::value::Value;

/// Declared scalar/composite kind of a field, captured once at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Bool,
    String,
    DocumentId,
    /// Ordered sequence over a scalar kind, round-tripped as JSON text.
    Sequence,
    /// String-keyed mapping over a scalar kind, round-tripped as JSON text.
    Mapping,
}

/// The kind of a registered type's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyKind {
    Int64,
    String,
    /// Native document-store object id.
    DocumentId,
}

/// Immutable per-field metadata plus the zero-reflection accessor pair
/// captured once at registration time.
///
/// Field offsets in the original design are raw byte offsets walked via
/// pointer arithmetic; here the equivalent "capture once, no reflection on
/// the hot path" contract is met with plain function pointers bound to the
/// concrete record type `T` at registration — see `DESIGN.md` for why this
/// is the idiomatic Rust rendition rather than unsafe offset arithmetic.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub wire_name_sql: &'static str,
    pub wire_name_doc: &'static str,
    pub kind: FieldKind,
    pub declared_type: &'static str,
    pub ignore: bool,
    pub is_date: bool,
    pub primary: bool,
    get: fn(&T) -> Value,
    set: fn(&mut T, &[u8]) -> twinstore_common::err::CoreResult<()>,
    _marker: PhantomData<T>,
}

impl<T> FieldDescriptor<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        wire_name_sql: &'static str,
        wire_name_doc: &'static str,
        kind: FieldKind,
        declared_type: &'static str,
        is_date: bool,
        primary: bool,
        get: fn(&T) -> Value,
        set: fn(&mut T, &[u8]) -> twinstore_common::err::CoreResult<()>,
    ) -> Self {
        FieldDescriptor {
            name,
            wire_name_sql,
            wire_name_doc,
            kind,
            declared_type,
            ignore: false,
            is_date,
            primary,
            get,
            set,
            _marker: PhantomData,
        }
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn read(&self, record: &T) -> Value {
        (self.get)(record)
    }

    pub fn write(&self, record: &mut T, raw: &[u8]) -> twinstore_common::err::CoreResult<()> {
        (self.set)(record, raw)
    }
}

/// Descriptor for the registered type's primary key: wire name, in-memory
/// accessor pair, kind, and the two lifecycle flags (auto-generate,
/// mirror-to-doc-store).
pub struct PrimaryKeyDescriptor<T> {
    pub name: &'static str,
    pub kind: PrimaryKeyKind,
    pub auto_id: bool,
    pub mirror_to_doc_store: bool,
    get: fn(&T) -> Value,
    set_i64: fn(&mut T, i64),
    set_string: fn(&mut T, String),
}

impl<T> PrimaryKeyDescriptor<T> {
    pub fn new_i64(
        name: &'static str,
        auto_id: bool,
        mirror_to_doc_store: bool,
        get: fn(&T) -> Value,
        set_i64: fn(&mut T, i64),
    ) -> Self {
        PrimaryKeyDescriptor {
            name,
            kind: PrimaryKeyKind::Int64,
            auto_id,
            mirror_to_doc_store,
            get,
            set_i64,
            set_string: |_, _| {},
        }
    }

    pub fn new_string(
        name: &'static str,
        auto_id: bool,
        mirror_to_doc_store: bool,
        get: fn(&T) -> Value,
        set_string: fn(&mut T, String),
    ) -> Self {
        PrimaryKeyDescriptor {
            name,
            kind: PrimaryKeyKind::String,
            auto_id,
            mirror_to_doc_store,
            get,
            set_i64: |_, _| {},
            set_string,
        }
    }

    pub fn new_document_id(
        name: &'static str,
        mirror_to_doc_store: bool,
        get: fn(&T) -> Value,
        set_string: fn(&mut T, String),
    ) -> Self {
        PrimaryKeyDescriptor {
            name,
            kind: PrimaryKeyKind::DocumentId,
            auto_id: false,
            mirror_to_doc_store,
            get,
            set_i64: |_, _| {},
            set_string,
        }
    }

    pub fn read(&self, record: &T) -> Value {
        (self.get)(record)
    }

    pub fn is_zero(&self, record: &T) -> bool {
        self.read(record).is_zero()
    }

    pub fn write_i64(&self, record: &mut T, v: i64) {
        (self.set_i64)(record, v)
    }

    pub fn write_string(&self, record: &mut T, v: String) {
        (self.set_string)(record, v)
    }
}

/// Immutable per-type descriptor, built once at registration and never
/// mutated. `new_one`/`append_one` are the polymorphic-constructor
/// capability the core holds instead of runtime reflection on the decode
/// path.
pub struct RecordDescriptor<T> {
    pub table_name: &'static str,
    pub model_name: &'static str,
    pub primary_key: PrimaryKeyDescriptor<T>,
    pub fields: Vec<FieldDescriptor<T>>,
    new_one: fn() -> T,
    append_one: fn(&mut Vec<T>, T),
}

impl<T> RecordDescriptor<T> {
    pub fn new(
        table_name: &'static str,
        model_name: &'static str,
        primary_key: PrimaryKeyDescriptor<T>,
        fields: Vec<FieldDescriptor<T>>,
        new_one: fn() -> T,
        append_one: fn(&mut Vec<T>, T),
    ) -> Self {
        RecordDescriptor {
            table_name,
            model_name,
            primary_key,
            fields,
            new_one,
            append_one,
        }
    }

    pub fn new_one(&self) -> T {
        (self.new_one)()
    }

    pub fn append_one(&self, container: &mut Vec<T>, one: T) {
        (self.append_one)(container, one)
    }

    pub fn field_by_wire_sql(&self, wire_name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.wire_name_sql == wire_name)
    }

    pub fn field_by_wire_doc(&self, wire_name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.wire_name_doc == wire_name)
    }

    /// Non-primary, non-ignored fields in declared order — the column list
    /// used by INSERT and the projection used by a plain SELECT *.
    pub fn insertable_fields(&self) -> impl Iterator<Item = &FieldDescriptor<T>> {
        self.fields.iter().filter(|f| !f.ignore)
    }
}
