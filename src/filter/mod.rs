use glob::Pattern;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::model::{qualified_name, Database, Schema, Table};
use crate::util::{Result, SchemaError};

/// Database-level object categories that can be dropped wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectCategory {
    Schemas,
    Casts,
    Extensions,
    Languages,
    ForeignDataWrappers,
    EventTriggers,
}

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 6] = [
        ObjectCategory::Schemas,
        ObjectCategory::Casts,
        ObjectCategory::Extensions,
        ObjectCategory::Languages,
        ObjectCategory::ForeignDataWrappers,
        ObjectCategory::EventTriggers,
    ];
}

impl FromStr for ObjectCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "schemas" => Ok(ObjectCategory::Schemas),
            "casts" => Ok(ObjectCategory::Casts),
            "extensions" => Ok(ObjectCategory::Extensions),
            "languages" => Ok(ObjectCategory::Languages),
            "foreign-data-wrappers" | "fdwrappers" => Ok(ObjectCategory::ForeignDataWrappers),
            "event-triggers" | "eventtrigs" => Ok(ObjectCategory::EventTriggers),
            _ => Err(format!(
                "Invalid object category '{s}'. Valid categories: schemas, casts, extensions, languages, foreign-data-wrappers, event-triggers"
            )),
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectCategory::Schemas => "schemas",
            ObjectCategory::Casts => "casts",
            ObjectCategory::Extensions => "extensions",
            ObjectCategory::Languages => "languages",
            ObjectCategory::ForeignDataWrappers => "foreign-data-wrappers",
            ObjectCategory::EventTriggers => "event-triggers",
        };
        write!(f, "{s}")
    }
}

/// Glob include/exclude lists. A name passes when it matches no exclude
/// pattern and, if any include pattern is given, at least one of those.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Filter {
    pub fn new(include: &[String], exclude: &[String]) -> std::result::Result<Self, glob::PatternError> {
        let include_patterns = include
            .iter()
            .map(|s| Pattern::new(s))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let exclude_patterns = exclude
            .iter()
            .map(|s| Pattern::new(s))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Filter {
            include: include_patterns,
            exclude: exclude_patterns,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn should_include(&self, name: &str) -> bool {
        self.should_include_with_both(name, name)
    }

    pub fn should_include_with_both(&self, qualified_name: &str, unqualified_name: &str) -> bool {
        let matches = |pattern: &Pattern| {
            pattern_matches(pattern, qualified_name) || pattern_matches(pattern, unqualified_name)
        };

        if self.exclude.iter().any(matches) {
            return false;
        }
        if !self.include.is_empty() {
            return self.include.iter().any(matches);
        }
        true
    }

    /// Patterns that match none of `candidates` (pairs of qualified and
    /// unqualified names).
    fn unmatched<'a>(&'a self, candidates: &[(String, String)]) -> Vec<&'a str> {
        self.include
            .iter()
            .chain(self.exclude.iter())
            .filter(|pattern| {
                !candidates
                    .iter()
                    .any(|(qualified, name)| {
                        pattern_matches(pattern, qualified) || pattern_matches(pattern, name)
                    })
            })
            .map(Pattern::as_str)
            .collect()
    }
}

/// Glob match, or the pattern text equal to the name. Identifiers may
/// contain `[`, `*` or `?`.
fn pattern_matches(pattern: &Pattern, name: &str) -> bool {
    pattern.matches(name) || pattern.as_str() == name
}

/// Immutable filter configuration threaded through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub excluded_categories: BTreeSet<ObjectCategory>,
    pub schemas: Filter,
    pub tables: Filter,
}

impl FilterSpec {
    /// Compiles the name lists; a malformed pattern is a configuration error.
    pub fn new(
        excluded_categories: impl IntoIterator<Item = ObjectCategory>,
        include_schemas: &[String],
        exclude_schemas: &[String],
        include_tables: &[String],
        exclude_tables: &[String],
    ) -> Result<Self> {
        let schemas = Filter::new(include_schemas, exclude_schemas)
            .map_err(|e| SchemaError::ConfigError(format!("Invalid schema pattern: {e}")))?;
        let tables = Filter::new(include_tables, exclude_tables)
            .map_err(|e| SchemaError::ConfigError(format!("Invalid table pattern: {e}")))?;

        Ok(FilterSpec {
            excluded_categories: excluded_categories.into_iter().collect(),
            schemas,
            tables,
        })
    }

    pub fn excludes(&self, category: ObjectCategory) -> bool {
        self.excluded_categories.contains(&category)
    }
}

/// Returns the part of `db` selected by `spec`.
///
/// Category exclusions apply first. Schema and table lists then select by
/// name, exclude winning over include; a dropped schema or table takes all
/// of its children with it, including the sequences it owns. Schemas left
/// without tables are kept.
pub fn filter_database(db: &Database, spec: &FilterSpec) -> Database {
    let schemas = if spec.excludes(ObjectCategory::Schemas) {
        Default::default()
    } else {
        warn_unmatched(
            "schema",
            &spec.schemas,
            db.schemas.keys().map(|name| (name.clone(), name.clone())).collect(),
        );
        warn_unmatched(
            "table",
            &spec.tables,
            db.schemas
                .values()
                .flat_map(|schema| {
                    schema
                        .tables
                        .keys()
                        .map(|name| (qualified_name(&schema.name, name), name.clone()))
                })
                .collect(),
        );

        db.schemas
            .iter()
            .filter(|(name, _)| spec.schemas.should_include(name))
            .map(|(name, schema)| (name.clone(), filter_schema(schema, &spec.tables)))
            .collect()
    };

    Database {
        schemas,
        extensions: keep_unless(spec, ObjectCategory::Extensions, &db.extensions),
        languages: keep_unless(spec, ObjectCategory::Languages, &db.languages),
        foreign_data_wrappers: keep_unless(
            spec,
            ObjectCategory::ForeignDataWrappers,
            &db.foreign_data_wrappers,
        ),
        casts: keep_unless(spec, ObjectCategory::Casts, &db.casts),
        event_triggers: keep_unless(spec, ObjectCategory::EventTriggers, &db.event_triggers),
    }
}

fn filter_schema(schema: &Schema, tables: &Filter) -> Schema {
    let kept: BTreeMap<String, Table> = schema
        .tables
        .iter()
        .filter(|(name, _)| tables.should_include_with_both(&qualified_name(&schema.name, name), name))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    // An owned sequence lives in its table's schema and goes with the table.
    let sequences = schema
        .sequences
        .iter()
        .filter(|(_, sequence)| match &sequence.owned_by {
            Some(owner) if owner.table.schema == schema.name => {
                !schema.tables.contains_key(&owner.table.name) || kept.contains_key(&owner.table.name)
            }
            _ => true,
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Schema {
        tables: kept,
        sequences,
        ..schema.clone()
    }
}

fn keep_unless<T: Clone + Default>(spec: &FilterSpec, category: ObjectCategory, objects: &T) -> T {
    if spec.excludes(category) {
        T::default()
    } else {
        objects.clone()
    }
}

fn warn_unmatched(kind: &str, filter: &Filter, candidates: Vec<(String, String)>) {
    if filter.is_empty() {
        return;
    }
    for pattern in filter.unmatched(&candidates) {
        warn!(pattern, "{kind} pattern matches nothing");
    }
}
