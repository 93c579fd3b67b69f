//! Distribution metadata for sharded tables.
//!
//! The router planner never talks to a concrete catalog; it asks a
//! [`TableMetadataProvider`] for a [`TableMetadata`] snapshot. The
//! [`DistributionCatalog`] here is the in-process metadata cache that
//! implements that contract.

use std::{fs, path::Path};

use ahash::RandomState;
use common::{ColumnId, DbError, DbResult, RangeTableIndex, TableId};
use expr::ColumnRef;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use types::SqlType;

type Map<K, V> = HashMap<K, V, RandomState>;

/// How a table's rows are spread over shards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionMethod {
    Hash,
    Range,
    Append,
    /// Reference table: every shard holds all rows.
    None,
}

impl PartitionMethod {
    /// Whether tables of this method are partitioned by a column.
    pub fn has_distribution_column(self) -> bool {
        !matches!(self, PartitionMethod::None)
    }
}

/// Point-in-time distribution metadata of one table.
///
/// Providers hand this out by value so that method, distribution column and
/// shard count always come from the same snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub table_id: TableId,
    pub method: PartitionMethod,
    pub distribution_column: Option<ColumnId>,
    pub shard_count: u32,
}

impl TableMetadata {
    /// The distribution column as it appears in a single-table query, where
    /// the table sits in range-table slot 1.
    pub fn distribution_key(&self) -> Option<ColumnRef> {
        self.distribution_column
            .map(|column| ColumnRef::new(RangeTableIndex::FIRST, column))
    }
}

/// Source of table distribution metadata.
pub trait TableMetadataProvider {
    /// Look up the metadata of a distributed table.
    ///
    /// Fails only for identifiers that are not registered.
    fn lookup(&self, table_id: TableId) -> DbResult<TableMetadata>;
}

impl<P: TableMetadataProvider + ?Sized> TableMetadataProvider for &P {
    fn lookup(&self, table_id: TableId) -> DbResult<TableMetadata> {
        (**self).lookup(table_id)
    }
}

/// Registration request for [`DistributionCatalog::register_table`].
#[derive(Clone, Debug, bon::Builder)]
pub struct TableDistribution {
    #[builder(into)]
    pub name: String,
    pub columns: Vec<Column>,
    pub method: PartitionMethod,
    #[builder(into)]
    pub distribution_column: Option<String>,
    #[builder(default = 32)]
    pub shard_count: u32,
}

/// In-memory metadata cache of distributed tables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributionCatalog {
    tables: Vec<DistributedTable>,
    next_table_id: u64,
    #[serde(skip)]
    #[serde(default)]
    table_name_index: Map<String, usize>,
    #[serde(skip)]
    #[serde(default)]
    table_id_index: Map<TableId, usize>,
}

impl DistributionCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            next_table_id: 1,
            table_name_index: Map::default(),
            table_id_index: Map::default(),
        }
    }

    /// Load a catalog from disk, returning an empty catalog if the file does not exist.
    pub fn load(path: &Path) -> DbResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = fs::read_to_string(path)?;
        let mut catalog: DistributionCatalog = serde_json::from_str(&data)
            .map_err(|err| DbError::Catalog(format!("invalid catalog file: {err}")))?;
        catalog.rebuild_indexes();
        Ok(catalog)
    }

    /// Persist the catalog contents as pretty JSON.
    pub fn save(&self, path: &Path) -> DbResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| DbError::Catalog(format!("serialize failed: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Register a distributed or reference table, returning its identifier.
    pub fn register_table(&mut self, request: TableDistribution) -> DbResult<TableId> {
        let TableDistribution {
            name,
            columns,
            method,
            distribution_column,
            shard_count,
        } = request;
        if self.table_name_index.contains_key(&name) {
            return Err(DbError::Catalog(format!("table '{name}' already exists")));
        }
        let schema = TableSchema::try_new(columns)?;
        let distribution_column = match (method.has_distribution_column(), distribution_column) {
            (true, Some(col)) => Some(schema.column_index(&col).ok_or_else(|| {
                DbError::Catalog(format!(
                    "unknown distribution column '{col}' on table '{name}'"
                ))
            })?),
            (true, None) => {
                return Err(DbError::Catalog(format!(
                    "{method:?} distributed table '{name}' needs a distribution column"
                )));
            }
            (false, Some(col)) => {
                return Err(DbError::Catalog(format!(
                    "reference table '{name}' cannot have distribution column '{col}'"
                )));
            }
            (false, None) => None,
        };

        let table_id = TableId(self.next_table_id);
        self.next_table_id += 1;
        self.tables.push(DistributedTable {
            id: table_id,
            name,
            schema,
            method,
            distribution_column,
            shard_count,
        });
        self.rebuild_indexes();
        Ok(table_id)
    }

    /// Remove a table from the cache.
    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        let idx = self
            .table_name_index
            .get(name)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))?;
        self.tables.remove(idx);
        self.rebuild_indexes();
        Ok(())
    }

    /// Replace the shard count of a table, e.g. after shards were created.
    pub fn set_shard_count(&mut self, name: &str, shard_count: u32) -> DbResult<()> {
        let idx = self
            .table_name_index
            .get(name)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))?;
        self.tables[idx].shard_count = shard_count;
        Ok(())
    }

    /// Returns an immutable reference to a table by name.
    pub fn table(&self, name: &str) -> DbResult<&DistributedTable> {
        let idx = self
            .table_name_index
            .get(name)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))?;
        self.tables
            .get(idx)
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))
    }

    /// Returns an immutable reference to a table by identifier.
    pub fn table_by_id(&self, id: TableId) -> DbResult<&DistributedTable> {
        let idx = self
            .table_id_index
            .get(&id)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table id {}", id.0)))?;
        self.tables
            .get(idx)
            .ok_or_else(|| DbError::Catalog(format!("unknown table id {}", id.0)))
    }

    /// Immutable iterator over all tables.
    pub fn tables(&self) -> impl Iterator<Item = &DistributedTable> {
        self.tables.iter()
    }

    fn rebuild_indexes(&mut self) {
        self.table_name_index.clear();
        self.table_id_index.clear();
        for (idx, table) in self.tables.iter().enumerate() {
            self.table_name_index.insert(table.name.clone(), idx);
            self.table_id_index.insert(table.id, idx);
        }
    }
}

impl Default for DistributionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TableMetadataProvider for DistributionCatalog {
    fn lookup(&self, table_id: TableId) -> DbResult<TableMetadata> {
        self.table_by_id(table_id).map(DistributedTable::metadata)
    }
}

/// Catalog entry of a distributed table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributedTable {
    pub id: TableId,
    pub name: String,
    pub schema: TableSchema,
    pub method: PartitionMethod,
    pub distribution_column: Option<ColumnId>,
    pub shard_count: u32,
}

impl DistributedTable {
    /// Snapshot of the routing-relevant fields.
    pub fn metadata(&self) -> TableMetadata {
        TableMetadata {
            table_id: self.id,
            method: self.method,
            distribution_column: self.distribution_column,
            shard_count: self.shard_count,
        }
    }
}

/// Column layout for a table, along with helpful lookup structures.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
    pub name_to_ordinal: Map<String, ColumnId>,
}

impl TableSchema {
    pub fn try_new(columns: Vec<Column>) -> DbResult<Self> {
        if columns.is_empty() {
            return Err(DbError::Catalog(
                "table must contain at least one column".into(),
            ));
        }
        if columns.len() > u16::MAX as usize {
            return Err(DbError::Catalog(
                "too many columns for a single table".into(),
            ));
        }
        let mut name_to_ordinal = Map::default();
        for (idx, column) in columns.iter().enumerate() {
            let ordinal = idx as ColumnId;
            if name_to_ordinal
                .insert(column.name.clone(), ordinal)
                .is_some()
            {
                return Err(DbError::Catalog(format!(
                    "duplicate column '{}' found while building schema",
                    column.name
                )));
            }
        }
        Ok(Self {
            columns,
            name_to_ordinal,
        })
    }

    /// Returns the ordinal for a column name.
    pub fn column_index(&self, name: &str) -> Option<ColumnId> {
        self.name_to_ordinal.get(name).copied()
    }

    /// Returns the SQL type for the provided ordinal.
    pub fn column_type(&self, ordinal: ColumnId) -> Option<&SqlType> {
        self.columns.get(ordinal as usize).map(|c| &c.ty)
    }
}

/// Describes a logical column within a table schema.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}
