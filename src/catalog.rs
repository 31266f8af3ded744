//! Dataset kinds, descriptors and their declarative target schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::StorageUri;
use crate::types::DataType;

/// The three datasets handled by the pipeline, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Customers,
    Suppliers,
    Transactions,
}

impl DatasetKind {
    /// All kinds in the fixed run order.
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Customers,
        DatasetKind::Suppliers,
        DatasetKind::Transactions,
    ];

    /// Directory (and raw file stem) used for this dataset in both zones.
    pub fn dir_name(self) -> &'static str {
        match self {
            DatasetKind::Customers => "clientes",
            DatasetKind::Suppliers => "proveedores",
            DatasetKind::Transactions => "transacciones",
        }
    }

    /// Target schema the normalizer applies to this dataset.
    pub fn target_schema(self) -> TargetSchema {
        use CoercionRule::{Identity, LowercaseText, ParseInteger};

        match self {
            DatasetKind::Customers => TargetSchema::Columns(vec![
                ColumnMapping::same("cliente_id", Identity),
                ColumnMapping::same("tipo_identificacion", Identity),
                ColumnMapping::renamed("nombre_cliente", "nombre", LowercaseText),
                ColumnMapping::same("ciudad", Identity),
            ]),
            // No projection is defined for suppliers; cleaned columns pass through.
            DatasetKind::Suppliers => TargetSchema::PassThrough,
            DatasetKind::Transactions => TargetSchema::Columns(vec![
                ColumnMapping::same("transaccion_id", Identity),
                ColumnMapping::same("tipo_transaccion", Identity),
                ColumnMapping::same("id_cliente_proveedor", Identity),
                ColumnMapping::same("cantidad_comprada", ParseInteger),
                ColumnMapping::same("precio", ParseInteger),
                ColumnMapping::same("tipo_energia", Identity),
            ]),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKind::Customers => "customers",
            DatasetKind::Suppliers => "suppliers",
            DatasetKind::Transactions => "transactions",
        };
        f.pad(name)
    }
}

/// Deterministic value transform applied during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionRule {
    /// Value passes through unchanged.
    Identity,
    /// Text is lowercased (Unicode, locale independent).
    LowercaseText,
    /// Text is parsed as a base-10 integer.
    ParseInteger,
}

impl CoercionRule {
    /// Output type for a source column of type `source`.
    pub fn output_type(self, source: DataType) -> DataType {
        match self {
            CoercionRule::Identity => source,
            CoercionRule::LowercaseText => DataType::Utf8,
            CoercionRule::ParseInteger => DataType::Int64,
        }
    }
}

/// One output column: where it comes from and how it is transformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Output column name.
    pub output: String,
    /// Source column name in the cleaned row-set.
    pub source: String,
    pub rule: CoercionRule,
}

impl ColumnMapping {
    /// Output column with the same name as its source.
    pub fn same(name: impl Into<String>, rule: CoercionRule) -> Self {
        let name = name.into();
        Self {
            output: name.clone(),
            source: name,
            rule,
        }
    }

    /// Output column renamed from `source`.
    pub fn renamed(output: impl Into<String>, source: impl Into<String>, rule: CoercionRule) -> Self {
        Self {
            output: output.into(),
            source: source.into(),
            rule,
        }
    }
}

/// Curated shape of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSchema {
    /// Ordered projection with per-column coercion.
    Columns(Vec<ColumnMapping>),
    /// Keep every cleaned column as is.
    PassThrough,
}

/// Static configuration of one dataset pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub kind: DatasetKind,
    /// Raw delimited-text object.
    pub source: StorageUri,
    /// Curated partition replaced by the writer.
    pub destination: StorageUri,
    pub schema: TargetSchema,
}

impl DatasetDescriptor {
    /// Descriptor using the built-in target schema for `kind`.
    pub fn new(kind: DatasetKind, source: StorageUri, destination: StorageUri) -> Self {
        Self {
            kind,
            source,
            destination,
            schema: kind.target_schema(),
        }
    }
}
