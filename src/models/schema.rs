//! Schema-related data models.
//!
//! This module defines the descriptors returned by table and index introspection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One column of a table, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Base type (e.g., int, varchar, decimal)
    pub data_type: String,
    /// Full declared type (e.g., varchar(30), int unsigned, decimal(10,2))
    pub column_type: String,
    pub nullable: bool,
    /// Key flag from the column definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<ColumnKey>,
    pub is_primary_key: bool,
    /// Default value as declared by the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// e.g., auto_increment, DEFAULT_GENERATED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// Maximum length in characters for string types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        column_type: impl Into<String>,
        nullable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            column_type: column_type.into(),
            nullable,
            key: None,
            is_primary_key: false,
            default_value: None,
            extra: None,
            length: None,
            comment: None,
        }
    }

    /// Set the key flag. Also sets `is_primary_key`.
    pub fn with_key(mut self, key: Option<ColumnKey>) -> Self {
        self.is_primary_key = key == Some(ColumnKey::Primary);
        self.key = key;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Key flag reported in `information_schema.COLUMNS.COLUMN_KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKey {
    /// Part of the primary key (PRI)
    Primary,
    /// First column of a unique index (UNI)
    Unique,
    /// First column of a non-unique index (MUL)
    Multiple,
}

impl ColumnKey {
    /// Parse the server's key flag. Empty or unknown flags yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PRI" => Some(Self::Primary),
            "UNI" => Some(Self::Unique),
            "MUL" => Some(Self::Multiple),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Unique => write!(f, "unique"),
            Self::Multiple => write!(f, "multiple"),
        }
    }
}

/// A column participating in an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexColumn {
    /// None for functional key parts
    pub name: Option<String>,
    /// 1-based position within the index
    pub seq_in_index: u64,
}

/// An index definition, with its columns in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexDescriptor {
    pub name: String,
    pub is_primary: bool,
    pub is_unique: bool,
    /// BTREE, HASH, FULLTEXT, SPATIAL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_type: Option<String>,
    pub columns: Vec<IndexColumn>,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>, is_unique: bool) -> Self {
        let name = name.into();
        Self {
            is_primary: name == "PRIMARY",
            name,
            is_unique,
            index_type: None,
            columns: Vec::new(),
        }
    }

    pub fn with_index_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = Some(index_type.into());
        self
    }
}

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyColumn {
    pub column: String,
    pub references: String,
}

/// A foreign-key constraint from a source table to a target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyDescriptor {
    /// Constraint name
    pub name: String,
    pub source_schema: String,
    pub source_table: String,
    pub target_schema: String,
    pub target_table: String,
    pub columns: Vec<ForeignKeyColumn>,
}

/// Indexes plus foreign keys in both directions for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableIndexes {
    pub indexes: Vec<IndexDescriptor>,
    /// Constraints declared on this table
    pub foreign_keys_outbound: Vec<ForeignKeyDescriptor>,
    /// Constraints on other tables that reference this table
    pub foreign_keys_inbound: Vec<ForeignKeyDescriptor>,
}
