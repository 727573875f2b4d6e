use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CODIGO_FIELD: &str = "codigo";
pub const NOMBRE_FIELD: &str = "nombre";
pub const CATEGORIA_FIELD: &str = "categoria";
pub const ID_FIELD: &str = "_id";

/// A garment record. The store is schemaless, so every field the caller sends is kept
/// verbatim; only `codigo`, `nombre` and `categoria` have accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prenda(Map<String, Value>);

impl Prenda {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn codigo(&self) -> Option<i64> {
        self.0.get(CODIGO_FIELD).and_then(Value::as_i64)
    }

    pub fn nombre(&self) -> Option<&str> {
        self.0.get(NOMBRE_FIELD).and_then(Value::as_str)
    }

    pub fn categoria(&self) -> Option<&str> {
        self.0.get(CATEGORIA_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrites every field present in `patch`, leaving the rest untouched.
    pub fn merge(&mut self, patch: &Prenda) {
        for (field, value) in &patch.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// True when the stored `codigo` is numerically equal to `codigo`, so `5.0` matches `5`.
    pub fn has_codigo(&self, codigo: i64) -> bool {
        self.0
            .get(CODIGO_FIELD)
            .and_then(Value::as_f64)
            .is_some_and(|value| value == codigo as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Nombre,
    Categoria,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nombre => NOMBRE_FIELD,
            Self::Categoria => CATEGORIA_FIELD,
        }
    }
}
