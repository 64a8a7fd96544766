use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use twinstore_common::err::{CoreError, CoreResult};

use crate::descriptor::{PrimaryKeyKind, RecordDescriptor};

/// Type-erased summary of a registered model, for diagnostics/admin tooling
/// that has no reason to know the concrete Rust type — mirrors the
/// teacher's `TableCache::table_map_len`/`contains_table_map` introspection
/// surface, which likewise reports on registered tables without handing
/// back the typed row struct.
#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    pub table_name: &'static str,
    pub model_name: &'static str,
    pub primary_key_kind: PrimaryKeyKind,
    pub auto_id: bool,
    pub mirror_to_doc_store: bool,
}

/// A user-defined record type: one table/collection, describing its own
/// field layout and primary key once.
///
/// There is no derive macro here — field discovery happens once at
/// registration rather than by reflecting over the type at query time,
/// and a type that implements `Model` by hand is the idiomatic Rust way to
/// get "registration-time reflection, execution-time offset access"
/// without unsafe pointer arithmetic: the descriptor's function pointers
/// are captured once, here, and every later read/write is a direct call
/// through them.
pub trait Model: Sized + Send + Sync + 'static {
    fn descriptor() -> RecordDescriptor<Self>;
}

/// Process-wide registry of record-type descriptors, keyed by table name.
/// Effectively immutable after registration: no synchronization is needed
/// on the hot (decode) path beyond the initial concurrent-map lookup.
#[derive(Default)]
pub struct ModelRegistry {
    descriptors: DashMap<&'static str, Arc<dyn Any + Send + Sync>>,
    infos: DashMap<&'static str, ModelInfo>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry {
            descriptors: DashMap::new(),
            infos: DashMap::new(),
        }
    }

    /// Registers `T` once. A second registration for the same table name
    /// replaces the descriptor — callers are expected to register each type
    /// exactly once at startup, but re-registration is not treated as an
    /// error since process restarts in test harnesses commonly re-run
    /// `register_model`.
    pub fn register<T: Model>(&self) {
        let descriptor = T::descriptor();
        let table_name = descriptor.table_name;
        tracing::debug!(table = table_name, "registering model");
        self.infos.insert(
            table_name,
            ModelInfo {
                table_name,
                model_name: descriptor.model_name,
                primary_key_kind: descriptor.primary_key.kind,
                auto_id: descriptor.primary_key.auto_id,
                mirror_to_doc_store: descriptor.primary_key.mirror_to_doc_store,
            },
        );
        self.descriptors.insert(table_name, Arc::new(descriptor));
    }

    pub fn get<T: Model>(&self, table_name: &str) -> CoreResult<Arc<RecordDescriptor<T>>> {
        let entry = self
            .descriptors
            .get(table_name)
            .ok_or_else(|| CoreError::model_not_registered(table_name))?;

        entry
            .clone()
            .downcast::<RecordDescriptor<T>>()
            .map_err(|_| {
                CoreError::model_not_registered(format!(
                    "{table_name} is registered under a different type"
                ))
            })
    }

    pub fn table_names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|e| *e.key()).collect()
    }

    pub fn is_registered(&self, table_name: &str) -> bool {
        self.descriptors.contains_key(table_name)
    }

    /// Type-erased lookup for diagnostics/admin tooling (spec-adjacent
    /// `describe`, see `twinstore-cli`). Never used on the decode hot path.
    pub fn describe(&self, table_name: &str) -> Option<ModelInfo> {
        self.infos.get(table_name).map(|e| *e.value())
    }
}

/// Process-wide singleton: every registered type lives here for the life
/// of the process.
pub static MODEL_REGISTRY: Lazy<ModelRegistry> = Lazy::new(ModelRegistry::new);

/// Registers one record type with the process-wide registry.
pub fn register_model<T: Model>() {
    MODEL_REGISTRY.register::<T>();
}
