//! Unity Catalog objects, enumeration and the safe-deletion workflow.

pub mod delete;
pub mod enumerate;

pub use delete::{
    DeleteOptions, DeletionResult, DeletionStep, DeletionSummary, Outcome, delete_schema,
    delete_tables, drop_empty_schemas, set_tables_owner,
};
pub use enumerate::{TableFilter, TypeFilter, find_empty_schemas, list_catalogs, list_schemas, list_tables};

use crate::error::InputError;
use std::{fmt, str::FromStr};

/// Kind of a Unity Catalog securable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Catalog,
    Schema,
    Table,
    View,
}

impl ObjectKind {
    /// Map a catalog `table_type` (MANAGED, EXTERNAL, VIEW, ...) onto a kind
    #[must_use]
    pub fn from_table_type(table_type: &str) -> Self {
        if table_type.to_uppercase().ends_with("VIEW") {
            Self::View
        } else {
            Self::Table
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "CATALOG",
            Self::Schema => "SCHEMA",
            Self::Table => "TABLE",
            Self::View => "VIEW",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "catalog" => Ok(Self::Catalog),
            "schema" => Ok(Self::Schema),
            "table" => Ok(Self::Table),
            "view" => Ok(Self::View),
            _ => Err(InputError::UnknownKind(s.to_string())),
        }
    }
}

/// A catalog, schema, table or view, fetched fresh from the catalog service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UcObject {
    pub catalog: String,
    pub schema: Option<String>,
    pub name: Option<String>,
    pub kind: ObjectKind,
    pub owner: Option<String>,
    /// Raw table type as reported by the service (MANAGED, EXTERNAL, VIEW, ...)
    pub table_type: Option<String>,
}

impl UcObject {
    #[must_use]
    pub fn catalog(name: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            catalog: name.into(),
            schema: None,
            name: None,
            kind: ObjectKind::Catalog,
            owner,
            table_type: None,
        }
    }

    #[must_use]
    pub fn schema(catalog: impl Into<String>, schema: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            catalog: catalog.into(),
            schema: Some(schema.into()),
            name: None,
            kind: ObjectKind::Schema,
            owner,
            table_type: None,
        }
    }

    #[must_use]
    pub fn table(schema: &SchemaName, name: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            catalog: schema.catalog.clone(),
            schema: Some(schema.schema.clone()),
            name: Some(name.into()),
            kind: ObjectKind::Table,
            owner,
            table_type: None,
        }
    }

    #[must_use]
    pub fn with_table_type(mut self, table_type: impl Into<String>) -> Self {
        let table_type = table_type.into();
        self.kind = ObjectKind::from_table_type(&table_type);
        self.table_type = Some(table_type);
        self
    }

    /// Dotted name: `catalog`, `catalog.schema` or `catalog.schema.table`
    #[must_use]
    pub fn full_name(&self) -> String {
        [Some(self.catalog.as_str()), self.schema.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The schema this object lives in, if any
    #[must_use]
    pub fn schema_name(&self) -> Option<SchemaName> {
        self.schema.as_ref().map(|schema| SchemaName {
            catalog: self.catalog.clone(),
            schema: schema.clone(),
        })
    }
}

impl fmt::Display for UcObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A `catalog.schema` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaName {
    pub catalog: String,
    pub schema: String,
}

impl FromStr for SchemaName {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split('.').collect::<Vec<_>>().as_slice() {
            [catalog, schema] if !catalog.is_empty() && !schema.is_empty() => Ok(Self {
                catalog: (*catalog).to_string(),
                schema: (*schema).to_string(),
            }),
            _ => Err(InputError::SchemaName(s.to_string())),
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.catalog, self.schema)
    }
}
