//! Object model builder: turns catalog row sets into a rooted [`Database`].
//!
//! Rows refer to each other by OID and attribute number. The builder first
//! indexes schemas, relations and column numbers, then attaches every child
//! to its parent and resolves cross-references against those indexes. A
//! reference that cannot be resolved is reported as
//! [`SchemaError::IncompleteCatalogData`]; nothing is built partially.

use crate::model::*;
use crate::pg::catalog::*;
use crate::util::{Result, SchemaError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

const TRIGGER_TYPE_ROW: i16 = 0x0001;
const TRIGGER_TYPE_BEFORE: i16 = 0x0002;
const TRIGGER_TYPE_INSERT: i16 = 0x0004;
const TRIGGER_TYPE_DELETE: i16 = 0x0008;
const TRIGGER_TYPE_UPDATE: i16 = 0x0010;
const TRIGGER_TYPE_TRUNCATE: i16 = 0x0020;
const TRIGGER_TYPE_INSTEAD: i16 = 0x0040;

/// Lookup tables built before any child is attached.
struct Directory {
    schemas: HashMap<i64, String>,
    relations: HashMap<i64, Arc<RelationName>>,
    /// Column names per relation, by attribute number.
    attributes: HashMap<i64, BTreeMap<i16, String>>,
}

impl Directory {
    fn schema(&self, oid: i64, object: impl FnOnce() -> String) -> Result<&str> {
        self.schemas
            .get(&oid)
            .map(String::as_str)
            .ok_or_else(|| SchemaError::incomplete(object(), format!("schema {oid}")))
    }

    fn relation(&self, oid: i64, object: impl FnOnce() -> String) -> Result<&Arc<RelationName>> {
        self.relations
            .get(&oid)
            .ok_or_else(|| SchemaError::incomplete(object(), format!("relation {oid}")))
    }

    fn column_names(&self, relation: i64, numbers: &[i16], object: &str) -> Result<Vec<String>> {
        numbers
            .iter()
            .map(|number| {
                self.attributes
                    .get(&relation)
                    .and_then(|columns| columns.get(number))
                    .cloned()
                    .ok_or_else(|| {
                        SchemaError::incomplete(object, format!("column {number} of relation {relation}"))
                    })
            })
            .collect()
    }
}

pub fn build_database(catalog: &CatalogSnapshot) -> Result<Database> {
    let mut db = Database::new();
    let directory = index_catalog(catalog)?;

    for row in &catalog.schemas {
        let mut schema = Schema::new(&row.name);
        schema.description = row.description.clone();
        schema.access = access(&row.owner, &row.acl)?;
        db.schemas.insert(row.name.clone(), schema);
    }

    let tables = build_tables(catalog, &directory)?;
    for table in tables.into_values() {
        schema_mut(&mut db, &table.schema)?
            .tables
            .insert(table.name.clone(), table);
    }

    for row in &catalog.sequences {
        let schema = directory.schema(row.schema_oid, || format!("sequence {}", row.name))?;
        let sequence = build_sequence(row, schema, &directory)?;
        schema_mut(&mut db, schema)?
            .sequences
            .insert(sequence.name.clone(), sequence);
    }

    for row in &catalog.functions {
        let schema = directory.schema(row.schema_oid, || format!("function {}", row.name))?;
        let function = build_function(row, schema)?;
        schema_mut(&mut db, schema)?
            .functions
            .insert(function.signature(), function);
    }

    for row in &catalog.views {
        let schema = directory.schema(row.schema_oid, || format!("view {}", row.name))?;
        let view = View {
            schema: schema.to_string(),
            name: row.name.clone(),
            definition: row.definition.clone(),
            materialized: row.materialized,
            description: row.description.clone(),
            access: access(&row.owner, &row.acl)?,
        };
        schema_mut(&mut db, schema)?
            .views
            .insert(view.name.clone(), view);
    }

    for row in &catalog.enum_types {
        let schema = directory.schema(row.schema_oid, || format!("type {}", row.name))?;
        let enum_type = EnumType {
            schema: schema.to_string(),
            name: row.name.clone(),
            labels: row.labels.clone(),
            description: row.description.clone(),
            access: access(&row.owner, &row.acl)?,
        };
        schema_mut(&mut db, schema)?
            .types
            .insert(enum_type.name.clone(), enum_type);
    }

    build_database_objects(catalog, &mut db)?;

    debug!(
        schemas = db.schemas.len(),
        extensions = db.extensions.len(),
        casts = db.casts.len(),
        "built object model"
    );
    Ok(db)
}

fn index_catalog(catalog: &CatalogSnapshot) -> Result<Directory> {
    let schemas: HashMap<i64, String> = catalog
        .schemas
        .iter()
        .map(|row| (row.oid, row.name.clone()))
        .collect();

    let mut relations = HashMap::new();
    for row in &catalog.tables {
        let schema = schemas
            .get(&row.schema_oid)
            .ok_or_else(|| SchemaError::incomplete(format!("table {}", row.name), format!("schema {}", row.schema_oid)))?;
        relations.insert(row.oid, Arc::new(RelationName::new(schema.clone(), row.name.clone())));
    }

    let mut attributes: HashMap<i64, BTreeMap<i16, String>> = HashMap::new();
    for row in &catalog.columns {
        attributes
            .entry(row.table_oid)
            .or_default()
            .insert(row.number, row.name.clone());
    }

    // Reference targets outside the extracted set: extension members,
    // foreign tables. Extracted tables keep their own rows.
    for row in &catalog.referenced_relations {
        if relations.contains_key(&row.oid) {
            continue;
        }
        relations.insert(row.oid, Arc::new(RelationName::new(row.schema.clone(), row.name.clone())));
        attributes.insert(
            row.oid,
            row.column_numbers
                .iter()
                .copied()
                .zip(row.column_names.iter().cloned())
                .collect(),
        );
    }

    Ok(Directory {
        schemas,
        relations,
        attributes,
    })
}

fn schema_mut<'a>(db: &'a mut Database, name: &str) -> Result<&'a mut Schema> {
    db.schemas
        .get_mut(name)
        .ok_or_else(|| SchemaError::incomplete(format!("schema entry {name}"), "schema row"))
}

fn access(owner: &str, acl: &Option<Vec<String>>) -> Result<Access> {
    let privileges = match acl {
        Some(items) => parse_acl(items)?,
        None => Vec::new(),
    };
    Ok(Access::new(Some(owner.to_string()), privileges))
}

fn build_tables(catalog: &CatalogSnapshot, directory: &Directory) -> Result<HashMap<i64, Table>> {
    let mut tables = HashMap::new();
    for row in &catalog.tables {
        let relation = directory.relation(row.oid, || format!("table {}", row.name))?;
        let mut table = Table::new(relation.schema.clone(), relation.name.clone());
        table.description = row.description.clone();
        table.access = access(&row.owner, &row.acl)?;
        tables.insert(row.oid, table);
    }

    let mut columns: Vec<&ColumnRow> = catalog.columns.iter().collect();
    columns.sort_by_key(|row| (row.table_oid, row.number));
    for row in columns {
        let table = tables.get_mut(&row.table_oid).ok_or_else(|| {
            SchemaError::incomplete(format!("column {}", row.name), format!("relation {}", row.table_oid))
        })?;
        table.columns.push(build_column(row)?);
    }

    for row in &catalog.constraints {
        let relation = directory.relation(row.table_oid, || format!("constraint {}", row.name))?;
        let object = format!("constraint {}.{}", relation.qualified(), row.name);
        let constraint = build_constraint(row, &object, directory)?;
        if let Some(table) = tables.get_mut(&row.table_oid) {
            table.constraints.insert(constraint.name.clone(), constraint);
        }
    }

    for row in &catalog.indexes {
        directory.relation(row.table_oid, || format!("index {}", row.name))?;
        let index = Index {
            name: row.name.clone(),
            keys: row.keys.clone(),
            include: row.include.clone(),
            unique: row.unique,
            access_method: row.access_method.clone(),
            predicate: row.predicate.clone(),
            description: row.description.clone(),
        };
        if let Some(table) = tables.get_mut(&row.table_oid) {
            table.indexes.insert(index.name.clone(), index);
        }
    }

    for row in &catalog.triggers {
        let relation = directory.relation(row.table_oid, || format!("trigger {}", row.name))?;
        let object = format!("trigger {}.{}", relation.qualified(), row.name);
        let trigger = build_trigger(row, &object, directory)?;
        if let Some(table) = tables.get_mut(&row.table_oid) {
            table.triggers.insert(trigger.name.clone(), trigger);
        }
    }

    Ok(tables)
}

fn build_column(row: &ColumnRow) -> Result<Column> {
    let identity = match row.identity {
        'a' => Some(IdentityKind::Always),
        'd' => Some(IdentityKind::ByDefault),
        _ => None,
    };
    Ok(Column {
        name: row.name.clone(),
        position: row.number,
        data_type: row.data_type.clone(),
        not_null: row.not_null,
        default: row.default.clone(),
        identity,
        generated: row.generated.clone(),
        collation: row.collation.clone(),
        description: row.description.clone(),
        access: Access::new(None, row.acl.as_deref().map(parse_acl).transpose()?.unwrap_or_default()),
    })
}

fn build_constraint(row: &ConstraintRow, object: &str, directory: &Directory) -> Result<Constraint> {
    let columns = directory.column_names(row.table_oid, &row.columns, object)?;
    let kind = match row.kind {
        'p' => ConstraintKind::PrimaryKey { columns },
        'u' => ConstraintKind::Unique { columns },
        'c' => ConstraintKind::Check {
            expression: row
                .expression
                .clone()
                .ok_or_else(|| SchemaError::incomplete(object, "check expression"))?,
            columns,
        },
        'f' => {
            let target_oid = row
                .ref_table_oid
                .ok_or_else(|| SchemaError::incomplete(object, "referenced relation"))?;
            let references = Arc::clone(directory.relation(target_oid, || object.to_string())?);
            let referenced_columns = directory.column_names(target_oid, &row.ref_columns, object)?;
            ConstraintKind::ForeignKey(ForeignKey {
                columns,
                references,
                referenced_columns,
                on_update: referential_action(row.on_update, object)?,
                on_delete: referential_action(row.on_delete, object)?,
                match_type: match row.match_type {
                    'f' => MatchType::Full,
                    'p' => MatchType::Partial,
                    _ => MatchType::Simple,
                },
            })
        }
        other => {
            return Err(SchemaError::incomplete(object, format!("constraint type '{other}'")));
        }
    };

    Ok(Constraint {
        name: row.name.clone(),
        kind,
        deferrable: row.deferrable,
        deferred: row.deferred,
        description: row.description.clone(),
    })
}

fn referential_action(code: char, object: &str) -> Result<ReferentialAction> {
    match code {
        'a' => Ok(ReferentialAction::NoAction),
        'r' => Ok(ReferentialAction::Restrict),
        'c' => Ok(ReferentialAction::Cascade),
        'n' => Ok(ReferentialAction::SetNull),
        'd' => Ok(ReferentialAction::SetDefault),
        other => Err(SchemaError::incomplete(object, format!("referential action '{other}'"))),
    }
}

fn build_trigger(row: &TriggerRow, object: &str, directory: &Directory) -> Result<Trigger> {
    let tgtype = row.tgtype;
    let timing = if tgtype & TRIGGER_TYPE_INSTEAD != 0 {
        TriggerTiming::InsteadOf
    } else if tgtype & TRIGGER_TYPE_BEFORE != 0 {
        TriggerTiming::Before
    } else {
        TriggerTiming::After
    };

    let mut events = Vec::new();
    if tgtype & TRIGGER_TYPE_INSERT != 0 {
        events.push(TriggerEvent::Insert);
    }
    if tgtype & TRIGGER_TYPE_UPDATE != 0 {
        events.push(TriggerEvent::Update);
    }
    if tgtype & TRIGGER_TYPE_DELETE != 0 {
        events.push(TriggerEvent::Delete);
    }
    if tgtype & TRIGGER_TYPE_TRUNCATE != 0 {
        events.push(TriggerEvent::Truncate);
    }

    let tail = parse_trigger_definition(&row.definition)
        .ok_or_else(|| SchemaError::incomplete(object, "function call in trigger definition"))?;

    Ok(Trigger {
        name: row.name.clone(),
        timing,
        events,
        columns: directory.column_names(row.table_oid, &row.columns, object)?,
        for_each_row: tgtype & TRIGGER_TYPE_ROW != 0,
        procedure: tail.call,
        condition: tail.condition,
        enabled: TriggerEnabled::from_catalog(row.enabled),
        description: row.description.clone(),
    })
}

/// The clauses of a `pg_get_triggerdef` result that follow
/// `FOR EACH ROW`/`FOR EACH STATEMENT`.
#[derive(Debug, PartialEq)]
struct TriggerTail {
    condition: Option<String>,
    /// Function call with its arguments, e.g. `public.stamp('created')`.
    call: String,
}

/// Splits the trailing `WHEN (...)` and `EXECUTE FUNCTION ...` clauses off a
/// trigger definition. Quoted names earlier in the text may contain the same
/// keywords, so every `FOR EACH` occurrence is tried in order and the first
/// one followed by a well-formed tail wins.
fn parse_trigger_definition(definition: &str) -> Option<TriggerTail> {
    let mut positions: Vec<(usize, usize)> = [" FOR EACH ROW ", " FOR EACH STATEMENT "]
        .iter()
        .flat_map(|level| {
            definition
                .match_indices(level)
                .map(move |(position, _)| (position, position + level.len()))
        })
        .collect();
    positions.sort_unstable();

    positions
        .into_iter()
        .find_map(|(_, start)| parse_trigger_tail(&definition[start..]))
}

fn parse_trigger_tail(tail: &str) -> Option<TriggerTail> {
    let (condition, rest) = match tail.strip_prefix("WHEN (") {
        Some(after) => {
            let end = closing_paren(after)?;
            (Some(after[..end].to_string()), after[end + 1..].trim_start())
        }
        None => (None, tail),
    };
    let call = rest
        .strip_prefix("EXECUTE FUNCTION ")
        .or_else(|| rest.strip_prefix("EXECUTE PROCEDURE "))?
        .trim_end();
    if call.is_empty() {
        return None;
    }
    Some(TriggerTail {
        condition,
        call: call.to_string(),
    })
}

/// Byte offset of the parenthesis closing an already opened one. String
/// literals and quoted identifiers are skipped.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 1;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn build_sequence(row: &SequenceRow, schema: &str, directory: &Directory) -> Result<Sequence> {
    let object = format!("sequence {schema}.{}", row.name);
    let owned_by = match (row.owner_table_oid, row.owner_column) {
        (Some(table_oid), Some(number)) => {
            let table = Arc::clone(directory.relation(table_oid, || object.clone())?);
            let column = directory
                .column_names(table_oid, &[number], &object)?
                .remove(0);
            Some(SequenceOwner { table, column })
        }
        _ => None,
    };

    Ok(Sequence {
        schema: schema.to_string(),
        name: row.name.clone(),
        data_type: row.data_type.clone(),
        start: row.start,
        increment: row.increment,
        min_value: row.min_value,
        max_value: row.max_value,
        cache: row.cache,
        cycle: row.cycle,
        owned_by,
        description: row.description.clone(),
        access: access(&row.owner, &row.acl)?,
    })
}

fn build_function(row: &FunctionRow, schema: &str) -> Result<Function> {
    let body = match &row.obj_file {
        Some(obj_file) if row.language == "c" => FunctionBody::Object {
            obj_file: obj_file.clone(),
            link_symbol: row.source.clone(),
        },
        _ => FunctionBody::Source(row.source.clone()),
    };

    Ok(Function {
        schema: schema.to_string(),
        name: row.name.clone(),
        kind: if row.kind == 'p' {
            FunctionKind::Procedure
        } else {
            FunctionKind::Function
        },
        arguments: row.arguments.clone(),
        returns: row.returns.clone(),
        language: row.language.clone(),
        body,
        volatility: Volatility::from_catalog(row.volatility),
        strict: row.strict,
        security_definer: row.security_definer,
        leakproof: row.leakproof,
        description: row.description.clone(),
        access: access(&row.owner, &row.acl)?,
    })
}

fn build_database_objects(catalog: &CatalogSnapshot, db: &mut Database) -> Result<()> {
    for row in &catalog.extensions {
        db.extensions.insert(
            row.name.clone(),
            Extension {
                name: row.name.clone(),
                schema: row.schema.clone(),
                version: row.version.clone(),
                description: row.description.clone(),
                access: Access::new(Some(row.owner.clone()), Vec::new()),
            },
        );
    }

    for row in &catalog.languages {
        db.languages.insert(
            row.name.clone(),
            Language {
                name: row.name.clone(),
                trusted: row.trusted,
                description: row.description.clone(),
                access: access(&row.owner, &row.acl)?,
            },
        );
    }

    let mut wrappers: HashMap<i64, ForeignDataWrapper> = HashMap::new();
    for row in &catalog.foreign_data_wrappers {
        wrappers.insert(
            row.oid,
            ForeignDataWrapper {
                name: row.name.clone(),
                handler: row.handler.clone(),
                validator: row.validator.clone(),
                options: row.options.clone(),
                servers: BTreeMap::new(),
                description: row.description.clone(),
                access: access(&row.owner, &row.acl)?,
            },
        );
    }
    for row in &catalog.foreign_servers {
        let wrapper = wrappers.get_mut(&row.fdw_oid).ok_or_else(|| {
            SchemaError::incomplete(
                format!("foreign server {}", row.name),
                format!("foreign data wrapper {}", row.fdw_oid),
            )
        })?;
        wrapper.servers.insert(
            row.name.clone(),
            ForeignServer {
                name: row.name.clone(),
                server_type: row.server_type.clone(),
                version: row.version.clone(),
                options: row.options.clone(),
                description: row.description.clone(),
                access: access(&row.owner, &row.acl)?,
            },
        );
    }
    db.foreign_data_wrappers = wrappers
        .into_values()
        .map(|wrapper| (wrapper.name.clone(), wrapper))
        .collect();

    for row in &catalog.casts {
        let cast = Cast {
            source: row.source.clone(),
            target: row.target.clone(),
            function: row.function.clone(),
            context: match row.context {
                'a' => CastContext::Assignment,
                'i' => CastContext::Implicit,
                _ => CastContext::Explicit,
            },
            method: match row.method {
                'i' => CastMethod::InOut,
                'b' => CastMethod::Binary,
                _ => CastMethod::Function,
            },
            description: row.description.clone(),
        };
        db.casts.insert(cast.key(), cast);
    }

    for row in &catalog.event_triggers {
        db.event_triggers.insert(
            row.name.clone(),
            EventTrigger {
                name: row.name.clone(),
                event: row.event.clone(),
                procedure: row.procedure.clone(),
                tags: row.tags.clone(),
                enabled: TriggerEnabled::from_catalog(row.enabled),
                description: row.description.clone(),
                access: Access::new(Some(row.owner.clone()), Vec::new()),
            },
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pg::catalog::fixtures::{self, CUSTOMERS, DAILY_TOTALS, ORDERS, PUBLIC, REPORTING};

    fn names(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn builds_schema_tree() {
        let db = build_database(&fixtures::sample()).unwrap();
        assert_eq!(
            db.schemas.keys().collect::<Vec<_>>(),
            vec!["public", "reporting"]
        );
        let public = &db.schemas["public"];
        assert_eq!(
            public.tables.keys().collect::<Vec<_>>(),
            vec!["customers", "orders"]
        );
        assert!(public.sequences.contains_key("orders_id_seq"));
        assert!(public.functions.contains_key("audit()"));
        assert!(public.types.contains_key("order_status"));
        assert!(db.schemas["reporting"].views.contains_key("recent"));
    }

    #[test]
    fn columns_follow_attribute_numbers() {
        let db = build_database(&fixtures::sample()).unwrap();
        let orders = db.table("public", "orders").unwrap();
        assert_eq!(names(&orders.columns), vec!["id", "customer_id", "total", "day"]);
        assert_eq!(
            orders.columns.iter().map(|c| c.position).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn foreign_keys_resolve_to_shared_relation() {
        let db = build_database(&fixtures::sample()).unwrap();
        let orders = db.table("public", "orders").unwrap();
        let ConstraintKind::ForeignKey(fk) = &orders.constraints["orders_customer_id_fkey"].kind else {
            panic!("expected a foreign key");
        };
        assert_eq!(fk.references.qualified(), "public.customers");
        assert_eq!(fk.columns, vec!["customer_id"]);
        assert_eq!(fk.referenced_columns, vec!["id"]);
        assert_eq!(fk.on_delete, ReferentialAction::Cascade);
        assert_eq!(fk.on_update, ReferentialAction::NoAction);

        let ConstraintKind::ForeignKey(cross) = &orders.constraints["orders_day_fkey"].kind else {
            panic!("expected a foreign key");
        };
        assert_eq!(cross.references.qualified(), "reporting.daily_totals");
    }

    #[test]
    fn sequence_owner_shares_table_identity() {
        let db = build_database(&fixtures::sample()).unwrap();
        let sequence = &db.schemas["public"].sequences["orders_id_seq"];
        let owner = sequence.owned_by.as_ref().unwrap();
        assert_eq!(owner.table.qualified(), "public.orders");
        assert_eq!(owner.column, "id");
    }

    #[test]
    fn missing_foreign_key_target_is_incomplete() {
        let mut catalog = fixtures::sample();
        catalog.tables.retain(|t| t.oid != DAILY_TOTALS);
        catalog.columns.retain(|c| c.table_oid != DAILY_TOTALS);
        catalog.constraints.retain(|c| c.table_oid != DAILY_TOTALS);
        catalog.referenced_relations.retain(|r| r.oid != DAILY_TOTALS);

        let err = build_database(&catalog).unwrap_err();
        match err {
            SchemaError::IncompleteCatalogData { object, missing } => {
                assert!(object.contains("orders_day_fkey"), "{object}");
                assert_eq!(missing, format!("relation {DAILY_TOTALS}"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn references_resolve_outside_extracted_tables() {
        const SPATIAL_REF_SYS: i64 = 16500;
        const REMOTE_TOTALS: i64 = 16510;
        let mut catalog = fixtures::sample();
        catalog.constraints.push(fixtures::foreign_key(
            ORDERS,
            "orders_srid_fkey",
            vec![2],
            SPATIAL_REF_SYS,
            vec![1],
        ));
        catalog.referenced_relations.push(fixtures::referenced(
            SPATIAL_REF_SYS,
            "public",
            "spatial_ref_sys",
            &["srid", "auth_name"],
        ));
        let mut remote_seq = catalog.sequences[0].clone();
        remote_seq.schema_oid = REPORTING;
        remote_seq.name = "remote_totals_id_seq".to_string();
        remote_seq.owner_table_oid = Some(REMOTE_TOTALS);
        remote_seq.owner_column = Some(2);
        catalog.sequences.push(remote_seq);
        catalog.referenced_relations.push(fixtures::referenced(
            REMOTE_TOTALS,
            "reporting",
            "remote_totals",
            &["day", "id"],
        ));

        let db = build_database(&catalog).unwrap();
        let orders = db.table("public", "orders").unwrap();
        let ConstraintKind::ForeignKey(fk) = &orders.constraints["orders_srid_fkey"].kind else {
            panic!("expected a foreign key");
        };
        assert_eq!(fk.references.qualified(), "public.spatial_ref_sys");
        assert_eq!(fk.referenced_columns, vec!["srid"]);
        assert!(db.table("public", "spatial_ref_sys").is_none());

        let owner = db.schemas["reporting"].sequences["remote_totals_id_seq"]
            .owned_by
            .as_ref()
            .unwrap();
        assert_eq!(owner.table.qualified(), "reporting.remote_totals");
        assert_eq!(owner.column, "id");
    }

    #[test]
    fn extracted_tables_take_precedence_over_referenced_rows() {
        let mut catalog = fixtures::sample();
        catalog
            .referenced_relations
            .push(fixtures::referenced(CUSTOMERS, "public", "stale_name", &["x", "y"]));
        let db = build_database(&catalog).unwrap();
        let orders = db.table("public", "orders").unwrap();
        let ConstraintKind::ForeignKey(fk) = &orders.constraints["orders_customer_id_fkey"].kind else {
            panic!("expected a foreign key");
        };
        assert_eq!(fk.references.qualified(), "public.customers");
        assert_eq!(fk.referenced_columns, vec!["id"]);
    }

    #[test]
    fn missing_referenced_column_is_incomplete() {
        let mut catalog = fixtures::sample();
        catalog
            .columns
            .retain(|c| !(c.table_oid == CUSTOMERS && c.number == 1));
        let err = build_database(&catalog).unwrap_err();
        assert!(matches!(err, SchemaError::IncompleteCatalogData { .. }));
    }

    #[test]
    fn table_in_unknown_schema_is_incomplete() {
        let mut catalog = fixtures::sample();
        catalog.schemas.retain(|s| s.oid != PUBLIC);
        let err = build_database(&catalog).unwrap_err();
        assert!(matches!(err, SchemaError::IncompleteCatalogData { .. }));
    }

    #[test]
    fn column_of_unknown_table_is_incomplete() {
        let mut catalog = fixtures::sample();
        catalog.columns.push(fixtures::column(99999, 1, "ghost", "text"));
        let err = build_database(&catalog).unwrap_err();
        assert!(err.to_string().contains("relation 99999"));
    }

    #[test]
    fn malformed_acl_is_incomplete() {
        let mut catalog = fixtures::sample();
        catalog.tables[0].acl = Some(vec!["garbage".to_string()]);
        let err = build_database(&catalog).unwrap_err();
        assert!(matches!(err, SchemaError::IncompleteCatalogData { .. }));
    }

    #[test]
    fn server_without_wrapper_is_incomplete() {
        let mut catalog = fixtures::sample();
        catalog.foreign_data_wrappers.clear();
        let err = build_database(&catalog).unwrap_err();
        assert!(err.to_string().contains("foreign server archive"));
    }

    #[test]
    fn decodes_trigger_type_bits() {
        let db = build_database(&fixtures::sample()).unwrap();
        let trigger = &db.table("public", "orders").unwrap().triggers["orders_audit"];
        assert_eq!(trigger.timing, TriggerTiming::After);
        assert_eq!(trigger.events, vec![TriggerEvent::Insert, TriggerEvent::Update]);
        assert!(trigger.for_each_row);
        assert_eq!(trigger.condition, None);
    }

    #[test]
    fn update_of_columns_resolve() {
        let mut catalog = fixtures::sample();
        catalog.triggers[0].columns = vec![3];
        let db = build_database(&catalog).unwrap();
        let trigger = &db.table("public", "orders").unwrap().triggers["orders_audit"];
        assert_eq!(trigger.columns, vec!["total"]);

        catalog.triggers[0].columns = vec![42];
        assert!(build_database(&catalog).is_err());
    }

    #[test]
    fn splits_when_clause_with_nested_parens() {
        let def = "CREATE TRIGGER t BEFORE UPDATE ON public.orders FOR EACH ROW WHEN ((old.total IS DISTINCT FROM new.total)) EXECUTE FUNCTION public.audit()";
        assert_eq!(
            parse_trigger_definition(def),
            Some(TriggerTail {
                condition: Some("(old.total IS DISTINCT FROM new.total)".to_string()),
                call: "public.audit()".to_string(),
            })
        );
        assert_eq!(parse_trigger_definition("CREATE TRIGGER t AFTER INSERT"), None);
    }

    #[test]
    fn keeps_trigger_function_arguments() {
        let def = "CREATE TRIGGER stamp BEFORE INSERT ON public.orders FOR EACH STATEMENT EXECUTE FUNCTION public.stamp('created', '42')";
        let tail = parse_trigger_definition(def).unwrap();
        assert_eq!(tail.condition, None);
        assert_eq!(tail.call, "public.stamp('created', '42')");
    }

    #[test]
    fn non_ascii_trigger_names_keep_condition() {
        let long = format!("\"{}\"", "ŉ".repeat(11));
        for name in ["\"ııı\"", long.as_str(), "\"été\""] {
            let def = format!(
                "CREATE TRIGGER {name} AFTER UPDATE ON public.orders FOR EACH ROW WHEN ((old.total <> new.total)) EXECUTE FUNCTION public.audit()"
            );
            let tail = parse_trigger_definition(&def).unwrap();
            assert_eq!(tail.condition.as_deref(), Some("(old.total <> new.total)"), "{name}");
            assert_eq!(tail.call, "public.audit()");
        }
    }

    #[test]
    fn keywords_inside_quoted_names_are_skipped() {
        let def = "CREATE TRIGGER \" FOR EACH ROW WHEN (x\" AFTER INSERT ON public.orders FOR EACH ROW EXECUTE FUNCTION public.audit()";
        let tail = parse_trigger_definition(def).unwrap();
        assert_eq!(tail.condition, None);
        assert_eq!(tail.call, "public.audit()");
    }

    #[test]
    fn parentheses_inside_literals_do_not_close_condition() {
        let def = "CREATE TRIGGER t AFTER UPDATE ON public.orders FOR EACH ROW WHEN ((new.note <> ')')) EXECUTE FUNCTION public.audit()";
        let tail = parse_trigger_definition(def).unwrap();
        assert_eq!(tail.condition.as_deref(), Some("(new.note <> ')')"));
    }

    #[test]
    fn trigger_without_function_call_is_incomplete() {
        let mut catalog = fixtures::sample();
        catalog.triggers[0].definition = "CREATE TRIGGER orders_audit".to_string();
        let err = build_database(&catalog).unwrap_err();
        assert!(err.to_string().contains("trigger public.orders.orders_audit"), "{err}");
    }

    #[test]
    fn column_attributes_carry_over() {
        let db = build_database(&fixtures::sample()).unwrap();
        let customers = db.table("public", "customers").unwrap();
        assert_eq!(customers.columns[0].identity, Some(IdentityKind::Always));
        assert_eq!(
            customers.column("email").unwrap().description.as_deref(),
            Some("Primary contact")
        );

        let orders = db.table("public", "orders").unwrap();
        let total = orders.column("total").unwrap();
        assert_eq!(total.access.owner, None);
        assert_eq!(total.access.privileges[0].grantee, "auditor");
    }

    #[test]
    fn database_level_objects() {
        let db = build_database(&fixtures::sample()).unwrap();
        assert!(db.extensions.contains_key("plpgsql"));
        assert!(db.languages["plperl"].trusted);
        assert!(db.foreign_data_wrappers["files"].servers.contains_key("archive"));
        let cast = &db.casts["(text AS public.order_status)"];
        assert_eq!(cast.method, CastMethod::InOut);
        assert_eq!(cast.context, CastContext::Explicit);
        assert_eq!(db.event_triggers["ddl_log"].tags, vec!["CREATE TABLE"]);
    }

    #[test]
    fn c_functions_keep_object_file() {
        let mut catalog = fixtures::sample();
        let row = &mut catalog.functions[0];
        row.language = "c".to_string();
        row.obj_file = Some("$libdir/audit".to_string());
        row.source = "audit_trigger".to_string();
        let db = build_database(&catalog).unwrap();
        assert_eq!(
            db.schemas["public"].functions["audit()"].body,
            FunctionBody::Object {
                obj_file: "$libdir/audit".to_string(),
                link_symbol: "audit_trigger".to_string(),
            }
        );
    }

    #[test]
    fn owner_is_recorded() {
        let db = build_database(&fixtures::sample()).unwrap();
        assert_eq!(db.schemas["public"].access.owner.as_deref(), Some("postgres"));
        assert_eq!(
            db.table("public", "orders").unwrap().access.owner.as_deref(),
            Some("app")
        );
    }
}
