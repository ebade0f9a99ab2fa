use super::{ObjectKind, SchemaName, UcObject};
use crate::{
    error::InputError,
    gateway::{Gateway, GatewayError},
    jobs::search::{SelectorError, compile},
};
use regex::Regex;
use std::str::FromStr;
use tracing::debug;

/// Table types reported by the catalog service that `--type` accepts verbatim
const TABLE_TYPES: &[&str] = &[
    "MANAGED",
    "EXTERNAL",
    "MATERIALIZED_VIEW",
    "STREAMING_TABLE",
    "FOREIGN",
];

/// What `--type` selects: a kind, or one exact table type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    Kind(ObjectKind),
    /// Upper-cased table type, compared case-insensitively
    TableType(String),
}

impl TypeFilter {
    #[must_use]
    pub fn matches(&self, object: &UcObject) -> bool {
        match self {
            Self::Kind(kind) => object.kind == *kind,
            Self::TableType(table_type) => object
                .table_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(table_type)),
        }
    }
}

impl FromStr for TypeFilter {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "TABLE" => Ok(Self::Kind(ObjectKind::Table)),
            "VIEW" => Ok(Self::Kind(ObjectKind::View)),
            other if TABLE_TYPES.contains(&other) => Ok(Self::TableType(other.to_string())),
            _ => Err(InputError::UnknownKind(s.to_string())),
        }
    }
}

/// Client-side filter over a table listing
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    /// Unanchored regex on the dotted full name
    pub name: Option<Regex>,
    /// Exact owner principal
    pub owner: Option<String>,
    pub kind: Option<TypeFilter>,
}

impl TableFilter {
    /// # Errors
    ///
    /// Returns `SelectorError::InvalidPattern` if `name` does not compile
    pub fn new(
        name: Option<&str>,
        owner: Option<&str>,
        kind: Option<TypeFilter>,
    ) -> Result<Self, SelectorError> {
        Ok(Self {
            name: name.map(compile).transpose()?,
            owner: owner.map(str::to_string),
            kind,
        })
    }

    #[must_use]
    pub fn matches(&self, object: &UcObject) -> bool {
        self.name
            .as_ref()
            .is_none_or(|rx| rx.is_match(&object.full_name()))
            && self
                .owner
                .as_ref()
                .is_none_or(|owner| object.owner.as_ref() == Some(owner))
            && self.kind.as_ref().is_none_or(|kind| kind.matches(object))
    }
}

/// # Errors
///
/// Returns the gateway error unchanged
pub async fn list_catalogs(gateway: &dyn Gateway) -> Result<Vec<UcObject>, GatewayError> {
    let catalogs = gateway.list_catalogs().await?;
    debug!(count = catalogs.len(), "listed catalogs");
    Ok(catalogs)
}

/// # Errors
///
/// Returns the gateway error unchanged
pub async fn list_schemas(
    gateway: &dyn Gateway,
    catalog: &str,
) -> Result<Vec<UcObject>, GatewayError> {
    let schemas = gateway.list_schemas(catalog).await?;
    debug!(catalog, count = schemas.len(), "listed schemas");
    Ok(schemas)
}

/// Tables and views of `schema` passing `filter`, in listing order
///
/// # Errors
///
/// Returns the gateway error unchanged
pub async fn list_tables(
    gateway: &dyn Gateway,
    schema: &SchemaName,
    filter: &TableFilter,
) -> Result<Vec<UcObject>, GatewayError> {
    let tables = gateway.list_tables(&schema.catalog, &schema.schema).await?;
    let listed = tables.len();
    let tables: Vec<_> = tables.into_iter().filter(|t| filter.matches(t)).collect();
    debug!(%schema, listed, kept = tables.len(), "listed tables");
    Ok(tables)
}

/// Schemas of `catalog` that currently hold no tables, optionally narrowed
/// by a regex on the schema's full name
///
/// # Errors
///
/// Returns the first gateway error
pub async fn find_empty_schemas(
    gateway: &dyn Gateway,
    catalog: &str,
    name: Option<&Regex>,
) -> Result<Vec<UcObject>, GatewayError> {
    let mut empty = Vec::new();
    for schema in list_schemas(gateway, catalog).await? {
        let Some(schema_name) = schema.schema_name() else {
            continue;
        };
        if name.is_some_and(|rx| !rx.is_match(&schema.full_name())) {
            continue;
        }
        if gateway
            .list_tables(&schema_name.catalog, &schema_name.schema)
            .await?
            .is_empty()
        {
            empty.push(schema);
        }
    }
    Ok(empty)
}
