//! High-level API for embedding pgshape in other applications.
//!
//! This module provides the extraction pipeline with structured inputs and
//! outputs: connect, read the catalogs, build the object model, filter,
//! redact and project it into a YAML document.
//!
//! # Example
//!
//! ```no_run
//! use pgshape::api::{extract_blocking, ExtractOptions};
//!
//! let result = extract_blocking(
//!     ExtractOptions::new("postgres://localhost/mydb")
//!         .with_schemas(vec!["public".into()], vec![])
//!         .without_owner(),
//! )
//! .unwrap();
//!
//! print!("{}", result.yaml);
//! ```
//!
//! # Async vs Blocking
//!
//! Every entry point has an async and a blocking variant. Use async when you
//! already have a tokio runtime. Use blocking variants for simple scripts
//! or when embedding in non-async code.
//!
//! Note: Blocking variants create a new tokio runtime per call. For
//! high-frequency usage, prefer the async API with a shared runtime.

mod error;
mod options;
mod results;

pub use error::Error;
pub use options::ExtractOptions;
pub use results::ExtractResult;

use crate::build::build_database;
use crate::filter::{filter_database, FilterSpec};
use crate::output::{render_sections, write_document, OutputTarget};
use crate::pg::{fetch_catalog, CatalogSnapshot, PgConnection};
use crate::project::project_sections;
use crate::redact::{redact, RedactOptions};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Helper functions
// ============================================================================

async fn connect_and_fetch(database_url: &str, parallel: bool) -> Result<CatalogSnapshot, Error> {
    let connection = PgConnection::new(database_url)
        .await
        .map_err(|e| Error::connection(e.to_string()))?;

    let version = connection
        .ensure_supported_version()
        .await
        .map_err(|e| Error::connection(e.to_string()))?;
    info!(server_version = version, parallel, "reading catalogs");

    fetch_catalog(&connection, parallel)
        .await
        .map_err(|e| Error::introspection(e.to_string()))
}

fn run_pipeline(
    catalog: &CatalogSnapshot,
    filter: &FilterSpec,
    redaction: RedactOptions,
) -> Result<ExtractResult, Error> {
    let database = build_database(catalog)?;
    let database = redact(&filter_database(&database, filter), redaction);

    let sections = project_sections(&database);
    let yaml = render_sections(&sections)?;
    let fingerprint = hex::encode(Sha256::digest(yaml.as_bytes()));

    Ok(ExtractResult {
        database,
        sections,
        yaml,
        fingerprint,
    })
}

fn create_runtime() -> Result<tokio::runtime::Runtime, Error> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::runtime(format!("Failed to create runtime: {e}")))
}

// ============================================================================
// Public API functions
// ============================================================================

/// Extract the schema of a live database.
///
/// Filter patterns are compiled before connecting, so a malformed pattern
/// fails without touching the server.
pub async fn extract(options: ExtractOptions) -> Result<ExtractResult, Error> {
    let filter = options.filter_spec()?;
    let catalog = connect_and_fetch(&options.database_url, options.parallel).await?;
    run_pipeline(&catalog, &filter, options.redact_options())
}

/// Run the offline part of the pipeline over catalog rows already read.
/// The connection settings in `options` are ignored.
pub fn extract_snapshot(
    catalog: &CatalogSnapshot,
    options: &ExtractOptions,
) -> Result<ExtractResult, Error> {
    run_pipeline(catalog, &options.filter_spec()?, options.redact_options())
}

/// Extract the schema and write it to `target`. Returns the files written.
pub async fn extract_to(
    options: ExtractOptions,
    target: &OutputTarget,
) -> Result<Vec<PathBuf>, Error> {
    let result = extract(options).await?;
    Ok(write_document(target, &result.sections)?)
}

// ============================================================================
// Blocking variants
// ============================================================================

/// Blocking version of [`extract`].
///
/// Creates a new tokio runtime for each call.
pub fn extract_blocking(options: ExtractOptions) -> Result<ExtractResult, Error> {
    create_runtime()?.block_on(extract(options))
}

/// Blocking version of [`extract_to`].
///
/// Creates a new tokio runtime for each call.
pub fn extract_to_blocking(
    options: ExtractOptions,
    target: &OutputTarget,
) -> Result<Vec<PathBuf>, Error> {
    create_runtime()?.block_on(extract_to(options, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ObjectCategory;
    use crate::pg::catalog::*;
    use proptest::strategy::{Just, Strategy};

    fn options() -> ExtractOptions {
        ExtractOptions::new("postgres://unused/db")
    }

    #[test]
    fn snapshot_pipeline_renders_document() {
        let result = extract_snapshot(&fixtures::sample(), &options()).unwrap();
        assert!(result.yaml.starts_with("schema public:\n"));
        assert_eq!(result.fingerprint.len(), 64);
        assert_eq!(
            serde_yaml::from_str::<serde_yaml::Mapping>(&result.yaml).unwrap(),
            result.document()
        );
    }

    #[test]
    fn fingerprint_tracks_document() {
        let catalog = fixtures::sample();
        let full = extract_snapshot(&catalog, &options()).unwrap();
        let again = extract_snapshot(&catalog, &options()).unwrap();
        let no_owner = extract_snapshot(&catalog, &options().without_owner()).unwrap();

        assert_eq!(full.fingerprint, again.fingerprint);
        assert_ne!(full.fingerprint, no_owner.fingerprint);
        assert!(!no_owner.yaml.contains("owner:"));
    }

    #[test]
    fn filters_apply_before_projection() {
        let result = extract_snapshot(
            &fixtures::sample(),
            &options()
                .with_schemas(vec![], vec!["reporting".into()])
                .without_category(ObjectCategory::Casts),
        )
        .unwrap();
        assert!(!result.yaml.contains("schema reporting:"));
        assert!(!result.yaml.contains("cast ("));
        assert!(result.database.casts.is_empty());
    }

    #[test]
    fn incomplete_catalog_is_reported() {
        let mut catalog = fixtures::sample();
        catalog.tables.retain(|t| t.name != "customers");
        assert!(matches!(
            extract_snapshot(&catalog, &options()),
            Err(Error::IncompleteCatalog { .. })
        ));
    }

    #[test]
    fn everything_filtered_gives_empty_document() {
        let mut options = options().with_schemas(vec!["nothing_*".into()], vec![]);
        for category in ObjectCategory::ALL {
            options = options.without_category(category);
        }
        let result = extract_snapshot(&fixtures::sample(), &options).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.yaml, "");
    }

    fn trigger(table_oid: i64, table: &str, name: &str, tgtype: i16, tail: &str) -> TriggerRow {
        TriggerRow {
            table_oid,
            name: name.to_string(),
            tgtype,
            columns: Vec::new(),
            definition: format!("CREATE TRIGGER {name} AFTER INSERT ON {table} {tail}"),
            enabled: 'O',
            description: None,
        }
    }

    /// The shared fixture with at least two rows in every row set and two
    /// triggers on every table, so that every set has an order to lose.
    fn varied_sample() -> CatalogSnapshot {
        let mut catalog = fixtures::sample();
        let first = catalog.triggers[0].clone();

        catalog.triggers.extend([
            trigger(
                fixtures::CUSTOMERS,
                "public.customers",
                "customers_stamp",
                0x0001 | 0x0004,
                "FOR EACH ROW EXECUTE FUNCTION public.audit('stamp')",
            ),
            trigger(
                fixtures::CUSTOMERS,
                "public.customers",
                "customers_log",
                0x0004 | 0x0008,
                "FOR EACH STATEMENT EXECUTE FUNCTION public.audit()",
            ),
            trigger(
                fixtures::DAILY_TOTALS,
                "reporting.daily_totals",
                "daily_totals_check",
                0x0001 | 0x0002 | 0x0004,
                "FOR EACH ROW WHEN ((new.day IS NOT NULL)) EXECUTE FUNCTION public.audit()",
            ),
            trigger(
                fixtures::DAILY_TOTALS,
                "reporting.daily_totals",
                "daily_totals_refresh",
                0x0020,
                "FOR EACH STATEMENT EXECUTE FUNCTION public.audit('refresh')",
            ),
        ]);
        catalog.triggers.push(TriggerRow {
            name: "orders_shipped".to_string(),
            definition: first.definition.replace("orders_audit", "orders_shipped"),
            ..first
        });

        catalog.indexes.push(IndexRow {
            table_oid: fixtures::CUSTOMERS,
            name: "customers_email_idx".to_string(),
            keys: vec!["lower(email)".to_string()],
            ..catalog.indexes[0].clone()
        });

        let sequence = catalog.sequences[0].clone();
        catalog.sequences.push(SequenceRow {
            name: "invoice_numbers".to_string(),
            owner_table_oid: None,
            owner_column: None,
            ..sequence
        });

        let function = catalog.functions[0].clone();
        catalog.functions.push(FunctionRow {
            name: "audit".to_string(),
            arguments: "reason text".to_string(),
            returns: Some("void".to_string()),
            ..function.clone()
        });
        catalog.functions.push(FunctionRow {
            name: "stamp".to_string(),
            ..function
        });

        let view = catalog.views[0].clone();
        catalog.views.push(ViewRow {
            name: "totals".to_string(),
            materialized: true,
            ..view
        });

        let enum_type = catalog.enum_types[0].clone();
        catalog.enum_types.push(EnumTypeRow {
            schema_oid: fixtures::REPORTING,
            name: "period".to_string(),
            labels: vec!["day".to_string(), "week".to_string()],
            ..enum_type
        });

        let extension = catalog.extensions[0].clone();
        catalog.extensions.push(ExtensionRow {
            name: "pgcrypto".to_string(),
            schema: "public".to_string(),
            version: "1.3".to_string(),
            ..extension
        });

        let language = catalog.languages[0].clone();
        catalog.languages.push(LanguageRow {
            name: "pltcl".to_string(),
            ..language
        });

        let wrapper = catalog.foreign_data_wrappers[0].clone();
        catalog.foreign_data_wrappers.push(ForeignDataWrapperRow {
            oid: fixtures::FDW + 1,
            name: "remote".to_string(),
            ..wrapper
        });
        let server = catalog.foreign_servers[0].clone();
        catalog.foreign_servers.push(ForeignServerRow {
            name: "mirror".to_string(),
            ..server.clone()
        });
        catalog.foreign_servers.push(ForeignServerRow {
            fdw_oid: fixtures::FDW + 1,
            name: "warehouse".to_string(),
            ..server
        });

        let cast = catalog.casts[0].clone();
        catalog.casts.push(CastRow {
            target: "reporting.period".to_string(),
            ..cast
        });

        let event_trigger = catalog.event_triggers[0].clone();
        catalog.event_triggers.push(EventTriggerRow {
            name: "ddl_guard".to_string(),
            event: "ddl_command_start".to_string(),
            ..event_trigger
        });

        catalog
    }

    /// Independently shuffles every row set of `catalog`.
    fn shuffled(catalog: CatalogSnapshot) -> impl Strategy<Value = CatalogSnapshot> {
        let relations = (
            Just(catalog.schemas).prop_shuffle(),
            Just(catalog.tables).prop_shuffle(),
            Just(catalog.columns).prop_shuffle(),
            Just(catalog.constraints).prop_shuffle(),
            Just(catalog.indexes).prop_shuffle(),
            Just(catalog.triggers).prop_shuffle(),
            Just(catalog.referenced_relations).prop_shuffle(),
        );
        let schema_objects = (
            Just(catalog.sequences).prop_shuffle(),
            Just(catalog.functions).prop_shuffle(),
            Just(catalog.views).prop_shuffle(),
            Just(catalog.enum_types).prop_shuffle(),
        );
        let database_objects = (
            Just(catalog.extensions).prop_shuffle(),
            Just(catalog.languages).prop_shuffle(),
            Just(catalog.foreign_data_wrappers).prop_shuffle(),
            Just(catalog.foreign_servers).prop_shuffle(),
            Just(catalog.casts).prop_shuffle(),
            Just(catalog.event_triggers).prop_shuffle(),
        );
        (relations, schema_objects, database_objects).prop_map(
            |(
                (schemas, tables, columns, constraints, indexes, triggers, referenced_relations),
                (sequences, functions, views, enum_types),
                (extensions, languages, foreign_data_wrappers, foreign_servers, casts, event_triggers),
            )| CatalogSnapshot {
                schemas,
                tables,
                columns,
                constraints,
                indexes,
                triggers,
                sequences,
                functions,
                views,
                enum_types,
                extensions,
                languages,
                foreign_data_wrappers,
                foreign_servers,
                casts,
                event_triggers,
                referenced_relations,
            },
        )
    }

    #[test]
    fn varied_sample_has_room_to_reorder() {
        let catalog = varied_sample();
        let result = extract_snapshot(&catalog, &options()).unwrap();
        for table in result.database.schemas.values().flat_map(|s| s.tables.values()) {
            assert!(table.triggers.len() >= 2, "{}", table.name);
        }
        assert!(catalog.sequences.len() >= 2 && catalog.casts.len() >= 2);
        assert!(catalog.event_triggers.len() >= 2 && catalog.foreign_servers.len() >= 2);
    }

    proptest::proptest! {
        #[test]
        fn row_order_does_not_change_document(catalog in shuffled(varied_sample())) {
            let expected = extract_snapshot(&varied_sample(), &options()).unwrap();
            let shuffled = extract_snapshot(&catalog, &options()).unwrap();

            proptest::prop_assert_eq!(shuffled.yaml, expected.yaml);
            proptest::prop_assert_eq!(shuffled.fingerprint, expected.fingerprint);
            proptest::prop_assert_eq!(
                shuffled.database.fingerprint(),
                expected.database.fingerprint()
            );
        }
    }
}
