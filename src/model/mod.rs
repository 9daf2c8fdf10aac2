//! In-memory object model of an extracted database.
//!
//! The model is a tree rooted at [`Database`]. Every non-root object is owned
//! by exactly one parent, and sibling maps are keyed by name so that lookups
//! and iteration are deterministic. Cross-links that are not ownership edges
//! (foreign-key targets, sequence owners) point at a shared
//! [`RelationName`] created once per relation by the builder.

mod acl;

pub use acl::{parse_acl, parse_aclitem, Grant, Privilege, PrivilegeScope};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Owner and access-control metadata composed into every object that has them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Access {
    pub owner: Option<String>,
    pub privileges: Vec<Grant>,
}

impl Access {
    pub fn new(owner: Option<String>, privileges: Vec<Grant>) -> Self {
        Access { owner, privileges }
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.privileges.is_empty()
    }
}

/// Identity of a table, shared by the table's schema entry and by every
/// object that references it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationName {
    pub schema: String,
    pub name: String,
}

impl RelationName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        RelationName {
            schema: schema.into(),
            name: name.into(),
        }
    }

    pub fn qualified(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }
}

pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{schema}.{name}")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub schemas: BTreeMap<String, Schema>,
    pub extensions: BTreeMap<String, Extension>,
    pub languages: BTreeMap<String, Language>,
    pub foreign_data_wrappers: BTreeMap<String, ForeignDataWrapper>,
    /// Keyed by `(source AS target)`.
    pub casts: BTreeMap<String, Cast>,
    pub event_triggers: BTreeMap<String, EventTrigger>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    pub tables: BTreeMap<String, Table>,
    pub sequences: BTreeMap<String, Sequence>,
    /// Keyed by signature, `name(identity arguments)`.
    pub functions: BTreeMap<String, Function>,
    pub views: BTreeMap<String, View>,
    pub types: BTreeMap<String, EnumType>,
    pub description: Option<String>,
    pub access: Access,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    pub schema: String,
    pub name: String,
    /// Ordered by ordinal position.
    pub columns: Vec<Column>,
    pub constraints: BTreeMap<String, Constraint>,
    pub indexes: BTreeMap<String, Index>,
    pub triggers: BTreeMap<String, Trigger>,
    pub description: Option<String>,
    pub access: Access,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Table {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            constraints: BTreeMap::new(),
            indexes: BTreeMap::new(),
            triggers: BTreeMap::new(),
            description: None,
            access: Access::default(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub position: i16,
    pub data_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub identity: Option<IdentityKind>,
    pub generated: Option<String>,
    pub collation: Option<String>,
    pub description: Option<String>,
    /// Column-level grants; the owner is always the table's.
    pub access: Access,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IdentityKind {
    Always,
    ByDefault,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub deferrable: bool,
    pub deferred: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey { columns: Vec<String> },
    Unique { columns: Vec<String> },
    Check { expression: String, columns: Vec<String> },
    ForeignKey(ForeignKey),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub references: Arc<RelationName>,
    pub referenced_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "no action",
            ReferentialAction::Restrict => "restrict",
            ReferentialAction::Cascade => "cascade",
            ReferentialAction::SetNull => "set null",
            ReferentialAction::SetDefault => "set default",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchType {
    Simple,
    Full,
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    /// Key columns or expressions, in index order.
    pub keys: Vec<String>,
    pub include: Vec<String>,
    pub unique: bool,
    pub access_method: String,
    pub predicate: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trigger {
    pub name: String,
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    pub columns: Vec<String>,
    pub for_each_row: bool,
    /// Qualified function call, e.g. `public.audit()`.
    pub procedure: String,
    pub condition: Option<String>,
    pub enabled: TriggerEnabled,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "before",
            TriggerTiming::After => "after",
            TriggerTiming::InsteadOf => "instead of",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
    Truncate,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "insert",
            TriggerEvent::Update => "update",
            TriggerEvent::Delete => "delete",
            TriggerEvent::Truncate => "truncate",
        }
    }
}

/// `pg_trigger.tgenabled` / `pg_event_trigger.evtenabled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TriggerEnabled {
    Origin,
    Disabled,
    Replica,
    Always,
}

impl TriggerEnabled {
    pub fn from_catalog(code: char) -> Self {
        match code {
            'D' => TriggerEnabled::Disabled,
            'R' => TriggerEnabled::Replica,
            'A' => TriggerEnabled::Always,
            _ => TriggerEnabled::Origin,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEnabled::Origin => "origin",
            TriggerEnabled::Disabled => "disabled",
            TriggerEnabled::Replica => "replica",
            TriggerEnabled::Always => "always",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sequence {
    pub schema: String,
    pub name: String,
    pub data_type: String,
    pub start: i64,
    pub increment: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub cache: i64,
    pub cycle: bool,
    pub owned_by: Option<SequenceOwner>,
    pub description: Option<String>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequenceOwner {
    pub table: Arc<RelationName>,
    pub column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Function {
    pub schema: String,
    pub name: String,
    pub kind: FunctionKind,
    /// Identity arguments as rendered by `pg_get_function_identity_arguments`.
    pub arguments: String,
    pub returns: Option<String>,
    pub language: String,
    pub body: FunctionBody,
    pub volatility: Volatility,
    pub strict: bool,
    pub security_definer: bool,
    pub leakproof: bool,
    pub description: Option<String>,
    pub access: Access,
}

impl Function {
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.arguments)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Procedure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FunctionBody {
    Source(String),
    /// C-language functions: shared object file and symbol.
    Object { obj_file: String, link_symbol: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
}

impl Volatility {
    pub fn from_catalog(code: char) -> Self {
        match code {
            'i' => Volatility::Immutable,
            's' => Volatility::Stable,
            _ => Volatility::Volatile,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Volatility::Immutable => "immutable",
            Volatility::Stable => "stable",
            Volatility::Volatile => "volatile",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct View {
    pub schema: String,
    pub name: String,
    pub definition: String,
    pub materialized: bool,
    pub description: Option<String>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumType {
    pub schema: String,
    pub name: String,
    pub labels: Vec<String>,
    pub description: Option<String>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub schema: String,
    pub version: String,
    pub description: Option<String>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Language {
    pub name: String,
    pub trusted: bool,
    pub description: Option<String>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignDataWrapper {
    pub name: String,
    pub handler: Option<String>,
    pub validator: Option<String>,
    pub options: Vec<String>,
    pub servers: BTreeMap<String, ForeignServer>,
    pub description: Option<String>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignServer {
    pub name: String,
    pub server_type: Option<String>,
    pub version: Option<String>,
    pub options: Vec<String>,
    pub description: Option<String>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cast {
    pub source: String,
    pub target: String,
    /// `regprocedure` text of the cast function, if any.
    pub function: Option<String>,
    pub context: CastContext,
    pub method: CastMethod,
    pub description: Option<String>,
}

impl Cast {
    pub fn key(&self) -> String {
        cast_key(&self.source, &self.target)
    }
}

pub fn cast_key(source: &str, target: &str) -> String {
    format!("({source} AS {target})")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CastContext {
    Explicit,
    Assignment,
    Implicit,
}

impl CastContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            CastContext::Explicit => "explicit",
            CastContext::Assignment => "assignment",
            CastContext::Implicit => "implicit",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CastMethod {
    Function,
    InOut,
    Binary,
}

impl CastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CastMethod::Function => "function",
            CastMethod::InOut => "inout",
            CastMethod::Binary => "binary",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventTrigger {
    pub name: String,
    pub event: String,
    pub procedure: String,
    pub tags: Vec<String>,
    pub enabled: TriggerEnabled,
    pub description: Option<String>,
    pub access: Access,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.schemas.get(schema).and_then(|s| s.tables.get(name))
    }

    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let json = serde_json::to_string(self).expect("Database must serialize");
        let hash = Sha256::digest(json.as_bytes());
        hex::encode(hash)
    }
}
