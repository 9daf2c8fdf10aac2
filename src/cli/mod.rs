use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use pgshape::api::{extract, ExtractOptions};
use pgshape::filter::ObjectCategory;
use pgshape::output::{write_document, OutputTarget};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgshape", version)]
#[command(about = "Extract the schema of a PostgreSQL database as YAML", long_about = None)]
struct Cli {
    /// Database connection URL
    #[arg(short = 'd', long = "database", env = "DATABASE_URL")]
    database: String,

    /// Write the document to this file instead of standard output
    #[arg(short = 'o', long, conflicts_with = "multiple_files")]
    output: Option<PathBuf>,

    /// Write one file per schema and per object category
    #[arg(short = 'm', long)]
    multiple_files: bool,

    /// Directory used in multiple-files mode
    #[arg(long, requires = "multiple_files")]
    directory: Option<PathBuf>,

    /// Omit object owners
    #[arg(short = 'O', long)]
    no_owner: bool,

    /// Omit access privileges
    #[arg(short = 'x', long)]
    no_privileges: bool,

    /// Leave out schemas and everything in them
    #[arg(long)]
    no_schemas: bool,

    /// Leave out casts
    #[arg(long)]
    no_casts: bool,

    /// Leave out extensions
    #[arg(long)]
    no_extensions: bool,

    /// Leave out procedural languages
    #[arg(long)]
    no_languages: bool,

    /// Leave out foreign data wrappers and their servers
    #[arg(long)]
    no_fdwrappers: bool,

    /// Leave out event triggers
    #[arg(long)]
    no_eventtrigs: bool,

    /// Only include schemas matching this pattern (repeatable). Patterns are
    /// globs (`*`, `?`, `[...]`) and also match a name spelled exactly like them
    #[arg(short = 'n', long = "schema", value_name = "PATTERN")]
    schemas: Vec<String>,

    /// Exclude schemas matching this pattern (repeatable)
    #[arg(short = 'N', long = "exclude-schema", value_name = "PATTERN")]
    exclude_schemas: Vec<String>,

    /// Only include tables matching this pattern, as `table` or
    /// `schema.table` (repeatable). Same glob rules as --schema
    #[arg(short = 't', long = "table", value_name = "PATTERN")]
    tables: Vec<String>,

    /// Exclude tables matching this pattern (repeatable)
    #[arg(short = 'T', long = "exclude-table", value_name = "PATTERN")]
    exclude_tables: Vec<String>,

    /// Read the catalogs over a single connection
    #[arg(long)]
    no_parallel: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn excluded_categories(&self) -> Vec<ObjectCategory> {
        [
            (self.no_schemas, ObjectCategory::Schemas),
            (self.no_casts, ObjectCategory::Casts),
            (self.no_extensions, ObjectCategory::Extensions),
            (self.no_languages, ObjectCategory::Languages),
            (self.no_fdwrappers, ObjectCategory::ForeignDataWrappers),
            (self.no_eventtrigs, ObjectCategory::EventTriggers),
        ]
        .into_iter()
        .filter_map(|(excluded, category)| excluded.then_some(category))
        .collect()
    }

    fn extract_options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::new(self.database.clone())
            .with_schemas(self.schemas.clone(), self.exclude_schemas.clone())
            .with_tables(self.tables.clone(), self.exclude_tables.clone());
        for category in self.excluded_categories() {
            options = options.without_category(category);
        }
        if self.no_owner {
            options = options.without_owner();
        }
        if self.no_privileges {
            options = options.without_privileges();
        }
        if self.no_parallel {
            options = options.sequential();
        }
        options
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Everything that can be checked offline is checked before connecting.
    let target = OutputTarget::from_args(cli.output.clone(), cli.multiple_files, cli.directory.clone())?;
    let options = cli.extract_options();
    options.filter_spec()?;

    let result = extract(options).await?;
    let written = write_document(&target, &result.sections).context("Failed to write output")?;
    info!(
        files = written.len(),
        fingerprint = %result.fingerprint,
        "extraction complete"
    );
    Ok(())
}
