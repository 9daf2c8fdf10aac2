//! Map projector: renders the object model as an ordered YAML mapping.
//!
//! Key order is fixed per object kind and sibling collections come out of
//! the model's name-keyed maps, so the same model always produces the same
//! mapping. Empty collections, absent values and `false` flags are left out.

use crate::model::*;
use serde_yaml::{Mapping, Value};

/// A top-level slice of the document; in multiple-files mode each section
/// is written to its own file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Schema(String),
    Extensions,
    Languages,
    Casts,
    ForeignDataWrappers,
    EventTriggers,
}

/// Projects the whole database into one mapping.
pub fn project(db: &Database) -> Mapping {
    let mut document = Mapping::new();
    for (_, section) in project_sections(db) {
        document.extend(section);
    }
    document
}

/// Projects the database section by section, schemas first. Concatenating
/// the returned mappings in order yields [`project`]'s result.
pub fn project_sections(db: &Database) -> Vec<(Section, Mapping)> {
    let mut sections = Vec::new();

    for schema in db.schemas.values() {
        let mut section = Mapping::new();
        section.insert(
            key(format!("schema {}", schema.name)),
            Value::Mapping(schema_map(schema)),
        );
        sections.push((Section::Schema(schema.name.clone()), section));
    }

    let mut push = |kind: Section, entries: Vec<(String, Mapping)>| {
        if !entries.is_empty() {
            let section = entries
                .into_iter()
                .map(|(k, v)| (key(k), Value::Mapping(v)))
                .collect();
            sections.push((kind, section));
        }
    };

    push(
        Section::Extensions,
        db.extensions
            .values()
            .map(|e| (format!("extension {}", e.name), extension_map(e)))
            .collect(),
    );
    push(
        Section::Languages,
        db.languages
            .values()
            .map(|l| (format!("language {}", l.name), language_map(l)))
            .collect(),
    );
    push(
        Section::Casts,
        db.casts
            .values()
            .map(|c| (format!("cast {}", c.key()), cast_map(c)))
            .collect(),
    );
    push(
        Section::ForeignDataWrappers,
        db.foreign_data_wrappers
            .values()
            .map(|w| (format!("foreign data wrapper {}", w.name), wrapper_map(w)))
            .collect(),
    );
    push(
        Section::EventTriggers,
        db.event_triggers
            .values()
            .map(|t| (format!("event trigger {}", t.name), event_trigger_map(t)))
            .collect(),
    );

    sections
}

fn key(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

/// Insertion-ordered field writer that drops empty values.
struct Fields(Mapping);

impl Fields {
    fn new() -> Self {
        Fields(Mapping::new())
    }

    fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.0.insert(key(name), key(value));
        self
    }

    fn opt_text(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.text(name, value);
        }
        self
    }

    fn flag(&mut self, name: &str, value: bool) -> &mut Self {
        if value {
            self.0.insert(key(name), Value::Bool(true));
        }
        self
    }

    fn int(&mut self, name: &str, value: i64) -> &mut Self {
        self.0.insert(key(name), Value::Number(value.into()));
        self
    }

    fn list(&mut self, name: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            let items = values.iter().map(|v| key(v.as_str())).collect();
            self.0.insert(key(name), Value::Sequence(items));
        }
        self
    }

    fn map(&mut self, name: &str, value: Mapping) -> &mut Self {
        if !value.is_empty() {
            self.0.insert(key(name), Value::Mapping(value));
        }
        self
    }

    fn value(&mut self, name: &str, value: Option<Value>) -> &mut Self {
        if let Some(value) = value {
            self.0.insert(key(name), value);
        }
        self
    }

    fn access(&mut self, access: &Access, scope: PrivilegeScope) -> &mut Self {
        self.opt_text("owner", access.owner.as_deref());
        self.value("privileges", privileges(&access.privileges, scope))
    }

    fn finish(&mut self) -> Mapping {
        std::mem::take(&mut self.0)
    }
}

/// `[{grantee: [privilege, {privilege: {grantable: true}}]}]`, by grantee.
fn privileges(grants: &[Grant], scope: PrivilegeScope) -> Option<Value> {
    if grants.is_empty() {
        return None;
    }
    let mut sorted: Vec<&Grant> = grants.iter().collect();
    sorted.sort_by(|a, b| a.grantee.cmp(&b.grantee));

    let entries = sorted
        .into_iter()
        .map(|grant| {
            let items = grant
                .summarize(scope)
                .into_iter()
                .map(|(name, grantable)| {
                    if grantable {
                        let mut option = Mapping::new();
                        option.insert(key("grantable"), Value::Bool(true));
                        let mut item = Mapping::new();
                        item.insert(key(name), Value::Mapping(option));
                        Value::Mapping(item)
                    } else {
                        key(name)
                    }
                })
                .collect();
            let mut entry = Mapping::new();
            entry.insert(key(grant.grantee.as_str()), Value::Sequence(items));
            Value::Mapping(entry)
        })
        .collect();
    Some(Value::Sequence(entries))
}

fn schema_map(schema: &Schema) -> Mapping {
    let mut fields = Fields::new();
    fields
        .opt_text("description", schema.description.as_deref())
        .access(&schema.access, PrivilegeScope::Schema);
    let mut map = fields.finish();

    for table in schema.tables.values() {
        map.insert(key(format!("table {}", table.name)), Value::Mapping(table_map(table)));
    }
    for sequence in schema.sequences.values() {
        map.insert(
            key(format!("sequence {}", sequence.name)),
            Value::Mapping(sequence_map(sequence)),
        );
    }
    for view in schema.views.values() {
        let label = if view.materialized { "materialized view" } else { "view" };
        map.insert(key(format!("{label} {}", view.name)), Value::Mapping(view_map(view)));
    }
    for (signature, function) in &schema.functions {
        let label = match function.kind {
            FunctionKind::Function => "function",
            FunctionKind::Procedure => "procedure",
        };
        map.insert(key(format!("{label} {signature}")), Value::Mapping(function_map(function)));
    }
    for enum_type in schema.types.values() {
        map.insert(key(format!("type {}", enum_type.name)), Value::Mapping(enum_map(enum_type)));
    }
    map
}

fn table_map(table: &Table) -> Mapping {
    let columns: Vec<Value> = table
        .columns
        .iter()
        .map(|column| {
            let mut entry = Mapping::new();
            entry.insert(key(column.name.as_str()), Value::Mapping(column_map(column)));
            Value::Mapping(entry)
        })
        .collect();

    let mut primary_key = Mapping::new();
    let mut foreign_keys = Mapping::new();
    let mut unique = Mapping::new();
    let mut checks = Mapping::new();
    for constraint in table.constraints.values() {
        let name = key(constraint.name.as_str());
        let mut fields = Fields::new();
        let target = match &constraint.kind {
            ConstraintKind::PrimaryKey { columns } => {
                fields.list("columns", columns);
                &mut primary_key
            }
            ConstraintKind::Unique { columns } => {
                fields.list("columns", columns);
                &mut unique
            }
            ConstraintKind::Check { expression, columns } => {
                fields.list("columns", columns).text("expression", expression);
                &mut checks
            }
            ConstraintKind::ForeignKey(fk) => {
                foreign_key_fields(&mut fields, fk);
                &mut foreign_keys
            }
        };
        fields
            .flag("deferrable", constraint.deferrable)
            .flag("deferred", constraint.deferred)
            .opt_text("description", constraint.description.as_deref());
        target.insert(name, Value::Mapping(fields.finish()));
    }

    let indexes = table
        .indexes
        .values()
        .map(|index| (key(index.name.as_str()), Value::Mapping(index_map(index))))
        .collect();
    let triggers = table
        .triggers
        .values()
        .map(|trigger| (key(trigger.name.as_str()), Value::Mapping(trigger_map(trigger))))
        .collect();

    let mut fields = Fields::new();
    if !columns.is_empty() {
        fields.value("columns", Some(Value::Sequence(columns)));
    }
    fields
        .map("primary_key", primary_key)
        .map("foreign_keys", foreign_keys)
        .map("unique_constraints", unique)
        .map("check_constraints", checks)
        .map("indexes", indexes)
        .map("triggers", triggers)
        .opt_text("description", table.description.as_deref())
        .access(&table.access, PrivilegeScope::Relation);
    fields.finish()
}

fn column_map(column: &Column) -> Mapping {
    let identity = column.identity.map(|kind| match kind {
        IdentityKind::Always => "always",
        IdentityKind::ByDefault => "by default",
    });
    let mut fields = Fields::new();
    fields
        .text("type", &column.data_type)
        .flag("not_null", column.not_null)
        .opt_text("default", column.default.as_deref())
        .opt_text("identity", identity)
        .opt_text("generated", column.generated.as_deref())
        .opt_text("collation", column.collation.as_deref())
        .opt_text("description", column.description.as_deref())
        .value("privileges", privileges(&column.access.privileges, PrivilegeScope::Column));
    fields.finish()
}

fn foreign_key_fields(fields: &mut Fields, fk: &ForeignKey) {
    let mut references = Fields::new();
    references
        .text("schema", &fk.references.schema)
        .text("table", &fk.references.name)
        .list("columns", &fk.referenced_columns);

    let action = |action: ReferentialAction| {
        (action != ReferentialAction::NoAction).then(|| action.as_str())
    };
    let match_type = match fk.match_type {
        MatchType::Simple => None,
        MatchType::Full => Some("full"),
        MatchType::Partial => Some("partial"),
    };

    fields
        .list("columns", &fk.columns)
        .map("references", references.finish())
        .opt_text("on_update", action(fk.on_update))
        .opt_text("on_delete", action(fk.on_delete))
        .opt_text("match", match_type);
}

fn index_map(index: &Index) -> Mapping {
    let mut fields = Fields::new();
    fields
        .list("keys", &index.keys)
        .list("include", &index.include)
        .flag("unique", index.unique)
        .opt_text(
            "access_method",
            (index.access_method != "btree").then_some(index.access_method.as_str()),
        )
        .opt_text("predicate", index.predicate.as_deref())
        .opt_text("description", index.description.as_deref());
    fields.finish()
}

fn trigger_map(trigger: &Trigger) -> Mapping {
    let events: Vec<String> = trigger.events.iter().map(|e| e.as_str().to_string()).collect();
    let level = if trigger.for_each_row { "row" } else { "statement" };
    let mut fields = Fields::new();
    fields
        .text("timing", trigger.timing.as_str())
        .list("events", &events)
        .list("columns", &trigger.columns)
        .text("level", level)
        .text("procedure", &trigger.procedure)
        .opt_text("condition", trigger.condition.as_deref())
        .opt_text(
            "enabled",
            (trigger.enabled != TriggerEnabled::Origin).then(|| trigger.enabled.as_str()),
        )
        .opt_text("description", trigger.description.as_deref());
    fields.finish()
}

fn sequence_map(sequence: &Sequence) -> Mapping {
    let owned_by = sequence
        .owned_by
        .as_ref()
        .map(|owner| format!("{}.{}", owner.table.qualified(), owner.column));
    let mut fields = Fields::new();
    fields
        .text("data_type", &sequence.data_type)
        .int("start_value", sequence.start)
        .int("increment_by", sequence.increment)
        .int("min_value", sequence.min_value)
        .int("max_value", sequence.max_value)
        .int("cache_value", sequence.cache)
        .flag("cycle", sequence.cycle)
        .opt_text("owned_by", owned_by.as_deref())
        .opt_text("description", sequence.description.as_deref())
        .access(&sequence.access, PrivilegeScope::Sequence);
    fields.finish()
}

fn function_map(function: &Function) -> Mapping {
    let mut fields = Fields::new();
    fields
        .text("language", &function.language)
        .opt_text("returns", function.returns.as_deref());
    match &function.body {
        FunctionBody::Source(source) => {
            fields.text("source", source);
        }
        FunctionBody::Object { obj_file, link_symbol } => {
            fields.text("obj_file", obj_file).text("link_symbol", link_symbol);
        }
    }
    fields
        .opt_text(
            "volatility",
            (function.volatility != Volatility::Volatile).then(|| function.volatility.as_str()),
        )
        .flag("strict", function.strict)
        .flag("security_definer", function.security_definer)
        .flag("leakproof", function.leakproof)
        .opt_text("description", function.description.as_deref())
        .access(&function.access, PrivilegeScope::Function);
    fields.finish()
}

fn view_map(view: &View) -> Mapping {
    let mut fields = Fields::new();
    fields
        .text("definition", &view.definition)
        .opt_text("description", view.description.as_deref())
        .access(&view.access, PrivilegeScope::Relation);
    fields.finish()
}

fn enum_map(enum_type: &EnumType) -> Mapping {
    let mut fields = Fields::new();
    fields
        .list("labels", &enum_type.labels)
        .opt_text("description", enum_type.description.as_deref())
        .access(&enum_type.access, PrivilegeScope::Type);
    fields.finish()
}

fn extension_map(extension: &Extension) -> Mapping {
    let mut fields = Fields::new();
    fields
        .text("schema", &extension.schema)
        .text("version", &extension.version)
        .opt_text("description", extension.description.as_deref())
        .opt_text("owner", extension.access.owner.as_deref());
    fields.finish()
}

fn language_map(language: &Language) -> Mapping {
    let mut fields = Fields::new();
    fields
        .flag("trusted", language.trusted)
        .opt_text("description", language.description.as_deref())
        .access(&language.access, PrivilegeScope::Language);
    fields.finish()
}

fn cast_map(cast: &Cast) -> Mapping {
    let mut fields = Fields::new();
    fields
        .opt_text("function", cast.function.as_deref())
        .text("context", cast.context.as_str())
        .text("method", cast.method.as_str())
        .opt_text("description", cast.description.as_deref());
    fields.finish()
}

fn wrapper_map(wrapper: &ForeignDataWrapper) -> Mapping {
    let mut fields = Fields::new();
    fields
        .opt_text("handler", wrapper.handler.as_deref())
        .opt_text("validator", wrapper.validator.as_deref())
        .list("options", &wrapper.options);
    for server in wrapper.servers.values() {
        fields.value(
            &format!("server {}", server.name),
            Some(Value::Mapping(server_map(server))),
        );
    }
    fields
        .opt_text("description", wrapper.description.as_deref())
        .access(&wrapper.access, PrivilegeScope::ForeignDataWrapper);
    fields.finish()
}

fn server_map(server: &ForeignServer) -> Mapping {
    let mut fields = Fields::new();
    fields
        .opt_text("type", server.server_type.as_deref())
        .opt_text("version", server.version.as_deref())
        .list("options", &server.options)
        .opt_text("description", server.description.as_deref())
        .access(&server.access, PrivilegeScope::ForeignServer);
    fields.finish()
}

fn event_trigger_map(trigger: &EventTrigger) -> Mapping {
    let mut fields = Fields::new();
    fields
        .text("event", &trigger.event)
        .text("procedure", &trigger.procedure)
        .list("tags", &trigger.tags)
        .opt_text(
            "enabled",
            (trigger.enabled != TriggerEnabled::Origin).then(|| trigger.enabled.as_str()),
        )
        .opt_text("description", trigger.description.as_deref())
        .opt_text("owner", trigger.access.owner.as_deref());
    fields.finish()
}
