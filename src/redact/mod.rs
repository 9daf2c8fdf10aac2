use crate::model::{Access, Database};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedactOptions {
    pub no_owner: bool,
    pub no_privileges: bool,
}

impl RedactOptions {
    pub fn is_noop(&self) -> bool {
        !self.no_owner && !self.no_privileges
    }
}

/// Returns a copy of `db` with owners and/or privileges removed from every
/// object. Names, structure and all other attributes are left as they are.
pub fn redact(db: &Database, options: RedactOptions) -> Database {
    let mut redacted = db.clone();
    if options.is_noop() {
        return redacted;
    }

    let strip = |access: &mut Access| {
        if options.no_owner {
            access.owner = None;
        }
        if options.no_privileges {
            access.privileges.clear();
        }
    };

    for schema in redacted.schemas.values_mut() {
        strip(&mut schema.access);
        for table in schema.tables.values_mut() {
            strip(&mut table.access);
            for column in &mut table.columns {
                strip(&mut column.access);
            }
        }
        for sequence in schema.sequences.values_mut() {
            strip(&mut sequence.access);
        }
        for function in schema.functions.values_mut() {
            strip(&mut function.access);
        }
        for view in schema.views.values_mut() {
            strip(&mut view.access);
        }
        for enum_type in schema.types.values_mut() {
            strip(&mut enum_type.access);
        }
    }

    for extension in redacted.extensions.values_mut() {
        strip(&mut extension.access);
    }
    for language in redacted.languages.values_mut() {
        strip(&mut language.access);
    }
    for wrapper in redacted.foreign_data_wrappers.values_mut() {
        strip(&mut wrapper.access);
        for server in wrapper.servers.values_mut() {
            strip(&mut server.access);
        }
    }
    for trigger in redacted.event_triggers.values_mut() {
        strip(&mut trigger.access);
    }

    redacted
}
