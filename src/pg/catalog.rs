//! Typed row sets returned by the catalog queries.
//!
//! Rows reference each other only by OID or attribute number, exactly as the
//! catalog does; resolving them into a tree is the builder's job. Every
//! `acl` field holds the text form of an `aclitem[]` (`None` when the object
//! still has default privileges).

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRow {
    pub oid: i64,
    pub name: String,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub oid: i64,
    pub schema_oid: i64,
    pub name: String,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRow {
    pub table_oid: i64,
    /// `attnum`, 1-based.
    pub number: i16,
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    /// `attidentity`: `a`, `d`, or `\0` when not an identity column.
    pub identity: char,
    pub generated: Option<String>,
    pub collation: Option<String>,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    pub table_oid: i64,
    pub name: String,
    /// `contype`: `p`, `u`, `c` or `f`.
    pub kind: char,
    pub columns: Vec<i16>,
    pub ref_table_oid: Option<i64>,
    pub ref_columns: Vec<i16>,
    pub on_update: char,
    pub on_delete: char,
    pub match_type: char,
    pub deferrable: bool,
    pub deferred: bool,
    pub expression: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub table_oid: i64,
    pub name: String,
    pub keys: Vec<String>,
    pub include: Vec<String>,
    pub unique: bool,
    pub access_method: String,
    pub predicate: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRow {
    pub table_oid: i64,
    pub name: String,
    pub tgtype: i16,
    /// `tgattr`: columns of an `UPDATE OF` trigger.
    pub columns: Vec<i16>,
    /// `pg_get_triggerdef` output, the source of the `WHEN` condition and of
    /// the function call with its arguments.
    pub definition: String,
    pub enabled: char,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRow {
    pub schema_oid: i64,
    pub name: String,
    pub data_type: String,
    pub start: i64,
    pub increment: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub cache: i64,
    pub cycle: bool,
    pub owner_table_oid: Option<i64>,
    pub owner_column: Option<i16>,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRow {
    pub schema_oid: i64,
    pub name: String,
    /// `prokind`: `f` or `p`.
    pub kind: char,
    pub arguments: String,
    pub returns: Option<String>,
    pub language: String,
    pub source: String,
    /// `probin`, set only for C-language functions.
    pub obj_file: Option<String>,
    pub volatility: char,
    pub strict: bool,
    pub security_definer: bool,
    pub leakproof: bool,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub schema_oid: i64,
    pub name: String,
    pub definition: String,
    pub materialized: bool,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumTypeRow {
    pub schema_oid: i64,
    pub name: String,
    pub labels: Vec<String>,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionRow {
    pub name: String,
    pub schema: String,
    pub version: String,
    pub owner: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRow {
    pub name: String,
    pub trusted: bool,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignDataWrapperRow {
    pub oid: i64,
    pub name: String,
    pub handler: Option<String>,
    pub validator: Option<String>,
    pub options: Vec<String>,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignServerRow {
    pub fdw_oid: i64,
    pub name: String,
    pub server_type: Option<String>,
    pub version: Option<String>,
    pub options: Vec<String>,
    pub owner: String,
    pub acl: Option<Vec<String>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastRow {
    pub source: String,
    pub target: String,
    pub function: Option<String>,
    /// `castcontext`: `e`, `a` or `i`.
    pub context: char,
    /// `castmethod`: `f`, `i` or `b`.
    pub method: char,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventTriggerRow {
    pub name: String,
    pub event: String,
    pub procedure: String,
    pub tags: Vec<String>,
    pub enabled: char,
    pub owner: String,
    pub description: Option<String>,
}

/// A relation named by a foreign key or by a sequence's `OWNED BY`, with its
/// column names. Covers targets that are not extracted themselves, such as
/// extension member tables and foreign tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedRelationRow {
    pub oid: i64,
    pub schema: String,
    pub name: String,
    /// Parallel to `column_names`.
    pub column_numbers: Vec<i16>,
    pub column_names: Vec<String>,
}

/// Everything read from one catalog snapshot, one row set per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub schemas: Vec<SchemaRow>,
    pub tables: Vec<TableRow>,
    pub columns: Vec<ColumnRow>,
    pub constraints: Vec<ConstraintRow>,
    pub indexes: Vec<IndexRow>,
    pub triggers: Vec<TriggerRow>,
    pub sequences: Vec<SequenceRow>,
    pub functions: Vec<FunctionRow>,
    pub views: Vec<ViewRow>,
    pub enum_types: Vec<EnumTypeRow>,
    pub extensions: Vec<ExtensionRow>,
    pub languages: Vec<LanguageRow>,
    pub foreign_data_wrappers: Vec<ForeignDataWrapperRow>,
    pub foreign_servers: Vec<ForeignServerRow>,
    pub casts: Vec<CastRow>,
    pub event_triggers: Vec<EventTriggerRow>,
    pub referenced_relations: Vec<ReferencedRelationRow>,
}

impl CatalogSnapshot {
    /// Appends the row sets of `other`; used to join the results of
    /// concurrently fetched query groups.
    pub fn merge(&mut self, other: CatalogSnapshot) {
        self.schemas.extend(other.schemas);
        self.tables.extend(other.tables);
        self.columns.extend(other.columns);
        self.constraints.extend(other.constraints);
        self.indexes.extend(other.indexes);
        self.triggers.extend(other.triggers);
        self.sequences.extend(other.sequences);
        self.functions.extend(other.functions);
        self.views.extend(other.views);
        self.enum_types.extend(other.enum_types);
        self.extensions.extend(other.extensions);
        self.languages.extend(other.languages);
        self.foreign_data_wrappers.extend(other.foreign_data_wrappers);
        self.foreign_servers.extend(other.foreign_servers);
        self.casts.extend(other.casts);
        self.event_triggers.extend(other.event_triggers);
        self.referenced_relations.extend(other.referenced_relations);
    }

    pub fn row_count(&self) -> usize {
        self.schemas.len()
            + self.tables.len()
            + self.columns.len()
            + self.constraints.len()
            + self.indexes.len()
            + self.triggers.len()
            + self.sequences.len()
            + self.functions.len()
            + self.views.len()
            + self.enum_types.len()
            + self.extensions.len()
            + self.languages.len()
            + self.foreign_data_wrappers.len()
            + self.foreign_servers.len()
            + self.casts.len()
            + self.event_triggers.len()
            + self.referenced_relations.len()
    }
}
