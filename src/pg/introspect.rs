use crate::pg::catalog::*;
use crate::pg::connection::PgConnection;
use crate::util::{Result, SchemaError};
use regex::Regex;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info};

/// Predicate that drops objects created by an extension script.
macro_rules! not_extension_member {
    ($catalog:literal, $alias:literal) => {
        concat!(
            "NOT EXISTS (SELECT 1 FROM pg_depend dep WHERE dep.classid = '",
            $catalog,
            "'::regclass AND dep.objid = ",
            $alias,
            ".oid AND dep.deptype = 'e')"
        )
    };
}

/// Predicate on a `pg_namespace` alias that keeps user schemas only.
macro_rules! user_schema {
    ($n:literal) => {
        concat!(
            $n, ".nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast') AND ",
            $n, ".nspname !~ '^pg_(toast_)?temp_' AND ",
            not_extension_member!("pg_namespace", $n)
        )
    };
}

/// Predicate on `pg_class`/`pg_namespace` aliases selecting extracted tables.
/// Child queries (columns, constraints, indexes, triggers) share it so that
/// every child row has a parent table row.
macro_rules! user_table {
    ($c:literal, $n:literal) => {
        concat!(
            $c, ".relkind IN ('r', 'p') AND ",
            user_schema!($n), " AND ",
            not_extension_member!("pg_class", $c)
        )
    };
}

const SET_SNAPSHOT_ISOLATION: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

/// Reads every extracted category from one consistent snapshot.
///
/// The leader transaction pins the snapshot. With `parallel`, it exports the
/// snapshot and three worker transactions import it to run the schema,
/// relation and database query groups concurrently; otherwise all groups run
/// in the leader transaction.
pub async fn fetch_catalog(connection: &PgConnection, parallel: bool) -> Result<CatalogSnapshot> {
    let pool = connection.pool();
    let mut leader = begin_repeatable_read(pool).await?;

    let mut catalog = CatalogSnapshot::default();
    if parallel {
        let snapshot_id: String = sqlx::query_scalar("SELECT pg_export_snapshot()")
            .fetch_one(&mut *leader)
            .await
            .map_err(|e| SchemaError::DatabaseError(format!("Failed to export snapshot: {e}")))?;
        debug!(snapshot = %snapshot_id, "exported catalog snapshot");

        let (schema_objects, relation_objects, database_objects) = tokio::try_join!(
            schema_objects_worker(pool, &snapshot_id),
            relation_objects_worker(pool, &snapshot_id),
            database_objects_worker(pool, &snapshot_id),
        )?;
        catalog.merge(schema_objects);
        catalog.merge(relation_objects);
        catalog.merge(database_objects);
    } else {
        catalog.merge(fetch_schema_objects(&mut leader).await?);
        catalog.merge(fetch_relation_objects(&mut leader).await?);
        catalog.merge(fetch_database_objects(&mut leader).await?);
    }

    leader
        .commit()
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to end snapshot transaction: {e}")))?;

    info!(rows = catalog.row_count(), parallel, "fetched catalog");
    Ok(catalog)
}

async fn begin_repeatable_read(pool: &Pool<Postgres>) -> Result<Transaction<'static, Postgres>> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to begin transaction: {e}")))?;
    sqlx::query(SET_SNAPSHOT_ISOLATION)
        .execute(&mut *tx)
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to set isolation level: {e}")))?;
    Ok(tx)
}

async fn join_snapshot(pool: &Pool<Postgres>, snapshot_id: &str) -> Result<Transaction<'static, Postgres>> {
    let valid = Regex::new(r"^[0-9A-Fa-f]+(-[0-9A-Fa-f]+)+$").unwrap();
    if !valid.is_match(snapshot_id) {
        return Err(SchemaError::DatabaseError(format!(
            "Unexpected snapshot identifier: {snapshot_id}"
        )));
    }

    let mut tx = begin_repeatable_read(pool).await?;
    sqlx::query(&format!("SET TRANSACTION SNAPSHOT '{snapshot_id}'"))
        .execute(&mut *tx)
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to import snapshot: {e}")))?;
    Ok(tx)
}

async fn schema_objects_worker(pool: &Pool<Postgres>, snapshot_id: &str) -> Result<CatalogSnapshot> {
    let mut tx = join_snapshot(pool, snapshot_id).await?;
    let catalog = fetch_schema_objects(&mut tx).await?;
    tx.rollback()
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to end worker transaction: {e}")))?;
    Ok(catalog)
}

async fn relation_objects_worker(pool: &Pool<Postgres>, snapshot_id: &str) -> Result<CatalogSnapshot> {
    let mut tx = join_snapshot(pool, snapshot_id).await?;
    let catalog = fetch_relation_objects(&mut tx).await?;
    tx.rollback()
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to end worker transaction: {e}")))?;
    Ok(catalog)
}

async fn database_objects_worker(pool: &Pool<Postgres>, snapshot_id: &str) -> Result<CatalogSnapshot> {
    let mut tx = join_snapshot(pool, snapshot_id).await?;
    let catalog = fetch_database_objects(&mut tx).await?;
    tx.rollback()
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to end worker transaction: {e}")))?;
    Ok(catalog)
}

async fn fetch_schema_objects(conn: &mut sqlx::PgConnection) -> Result<CatalogSnapshot> {
    Ok(CatalogSnapshot {
        schemas: fetch_schemas(conn).await?,
        sequences: fetch_sequences(conn).await?,
        functions: fetch_functions(conn).await?,
        views: fetch_views(conn).await?,
        enum_types: fetch_enum_types(conn).await?,
        ..Default::default()
    })
}

async fn fetch_relation_objects(conn: &mut sqlx::PgConnection) -> Result<CatalogSnapshot> {
    Ok(CatalogSnapshot {
        tables: fetch_tables(conn).await?,
        columns: fetch_columns(conn).await?,
        constraints: fetch_constraints(conn).await?,
        indexes: fetch_indexes(conn).await?,
        triggers: fetch_triggers(conn).await?,
        referenced_relations: fetch_referenced_relations(conn).await?,
        ..Default::default()
    })
}

async fn fetch_database_objects(conn: &mut sqlx::PgConnection) -> Result<CatalogSnapshot> {
    Ok(CatalogSnapshot {
        extensions: fetch_extensions(conn).await?,
        languages: fetch_languages(conn).await?,
        foreign_data_wrappers: fetch_foreign_data_wrappers(conn).await?,
        foreign_servers: fetch_foreign_servers(conn).await?,
        casts: fetch_casts(conn).await?,
        event_triggers: fetch_event_triggers(conn).await?,
        ..Default::default()
    })
}

async fn fetch_rows(conn: &mut sqlx::PgConnection, sql: &str, what: &str) -> Result<Vec<PgRow>> {
    let rows = sqlx::query(sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| SchemaError::DatabaseError(format!("Failed to fetch {what}: {e}")))?;
    debug!(category = what, rows = rows.len(), "fetched catalog rows");
    Ok(rows)
}

/// Reads a `"char"` column, which the driver decodes as `i8`.
fn catalog_char(row: &PgRow, column: &str) -> char {
    row.get::<i8, _>(column) as u8 as char
}

async fn fetch_schemas(conn: &mut sqlx::PgConnection) -> Result<Vec<SchemaRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                n.oid::int8 AS oid,
                n.nspname AS name,
                pg_get_userbyid(n.nspowner) AS owner,
                n.nspacl::text[] AS acl,
                obj_description(n.oid, 'pg_namespace') AS description
            FROM pg_namespace n
            WHERE "#,
            user_schema!("n")
        ),
        "schemas",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| SchemaRow {
            oid: row.get("oid"),
            name: row.get("name"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_tables(conn: &mut sqlx::PgConnection) -> Result<Vec<TableRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                c.oid::int8 AS oid,
                c.relnamespace::int8 AS schema_oid,
                c.relname AS name,
                pg_get_userbyid(c.relowner) AS owner,
                c.relacl::text[] AS acl,
                obj_description(c.oid, 'pg_class') AS description
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE "#,
            user_table!("c", "n")
        ),
        "tables",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| TableRow {
            oid: row.get("oid"),
            schema_oid: row.get("schema_oid"),
            name: row.get("name"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_columns(conn: &mut sqlx::PgConnection) -> Result<Vec<ColumnRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                a.attrelid::int8 AS table_oid,
                a.attnum AS number,
                a.attname AS name,
                format_type(a.atttypid, a.atttypmod) AS data_type,
                a.attnotnull AS not_null,
                CASE WHEN a.attgenerated = '' THEN pg_get_expr(d.adbin, d.adrelid) END AS column_default,
                a.attidentity AS identity,
                CASE WHEN a.attgenerated <> '' THEN pg_get_expr(d.adbin, d.adrelid) END AS generated_expr,
                CASE WHEN a.attcollation <> 0 AND a.attcollation <> t.typcollation
                     THEN co.collname::text END AS collation,
                a.attacl::text[] AS acl,
                col_description(a.attrelid, a.attnum) AS description
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_type t ON t.oid = a.atttypid
            LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            LEFT JOIN pg_collation co ON co.oid = a.attcollation
            WHERE a.attnum > 0 AND NOT a.attisdropped AND "#,
            user_table!("c", "n")
        ),
        "columns",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| ColumnRow {
            table_oid: row.get("table_oid"),
            number: row.get("number"),
            name: row.get("name"),
            data_type: row.get("data_type"),
            not_null: row.get("not_null"),
            default: row.get("column_default"),
            identity: catalog_char(row, "identity"),
            generated: row.get("generated_expr"),
            collation: row.get("collation"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_constraints(conn: &mut sqlx::PgConnection) -> Result<Vec<ConstraintRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                con.conrelid::int8 AS table_oid,
                con.conname AS name,
                con.contype AS kind,
                COALESCE(con.conkey, '{}'::int2[]) AS columns,
                CASE WHEN con.contype = 'f' THEN con.confrelid::int8 END AS ref_table_oid,
                COALESCE(con.confkey, '{}'::int2[]) AS ref_columns,
                con.confupdtype AS on_update,
                con.confdeltype AS on_delete,
                con.confmatchtype AS match_type,
                con.condeferrable AS deferrable,
                con.condeferred AS deferred,
                CASE WHEN con.contype = 'c' THEN pg_get_expr(con.conbin, con.conrelid) END AS expression,
                obj_description(con.oid, 'pg_constraint') AS description
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE con.contype IN ('p', 'u', 'c', 'f')
              AND con.conparentid = 0
              AND "#,
            user_table!("c", "n")
        ),
        "constraints",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| ConstraintRow {
            table_oid: row.get("table_oid"),
            name: row.get("name"),
            kind: catalog_char(row, "kind"),
            columns: row.get("columns"),
            ref_table_oid: row.get("ref_table_oid"),
            ref_columns: row.get("ref_columns"),
            on_update: catalog_char(row, "on_update"),
            on_delete: catalog_char(row, "on_delete"),
            match_type: catalog_char(row, "match_type"),
            deferrable: row.get("deferrable"),
            deferred: row.get("deferred"),
            expression: row.get("expression"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_indexes(conn: &mut sqlx::PgConnection) -> Result<Vec<IndexRow>> {
    // Indexes backing primary key and unique constraints are part of the
    // constraint entry.
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                i.indrelid::int8 AS table_oid,
                ic.relname AS name,
                ARRAY(
                    SELECT pg_get_indexdef(i.indexrelid, k, true)
                    FROM generate_series(1, i.indnkeyatts::int) AS k
                    ORDER BY k
                ) AS keys,
                ARRAY(
                    SELECT pg_get_indexdef(i.indexrelid, k, true)
                    FROM generate_series(i.indnkeyatts::int + 1, i.indnatts::int) AS k
                    ORDER BY k
                ) AS include,
                i.indisunique AS is_unique,
                am.amname::text AS access_method,
                pg_get_expr(i.indpred, i.indrelid, true) AS predicate,
                obj_description(i.indexrelid, 'pg_class') AS description
            FROM pg_index i
            JOIN pg_class ic ON ic.oid = i.indexrelid
            JOIN pg_am am ON am.oid = ic.relam
            JOIN pg_class c ON c.oid = i.indrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE NOT EXISTS (
                    SELECT 1 FROM pg_constraint k
                    WHERE k.conindid = i.indexrelid AND k.contype IN ('p', 'u')
                  )
              AND "#,
            user_table!("c", "n")
        ),
        "indexes",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| IndexRow {
            table_oid: row.get("table_oid"),
            name: row.get("name"),
            keys: row.get("keys"),
            include: row.get("include"),
            unique: row.get("is_unique"),
            access_method: row.get("access_method"),
            predicate: row.get("predicate"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_triggers(conn: &mut sqlx::PgConnection) -> Result<Vec<TriggerRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                t.tgrelid::int8 AS table_oid,
                t.tgname AS name,
                t.tgtype AS tgtype,
                t.tgattr::int2[] AS columns,
                pg_get_triggerdef(t.oid) AS definition,
                t.tgenabled AS enabled,
                obj_description(t.oid, 'pg_trigger') AS description
            FROM pg_trigger t
            JOIN pg_class c ON c.oid = t.tgrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE NOT t.tgisinternal AND "#,
            user_table!("c", "n")
        ),
        "triggers",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| TriggerRow {
            table_oid: row.get("table_oid"),
            name: row.get("name"),
            tgtype: row.get("tgtype"),
            columns: row.get("columns"),
            definition: row.get("definition"),
            enabled: catalog_char(row, "enabled"),
            description: row.get("description"),
        })
        .collect())
}

/// Names and columns of every foreign key target and sequence owner,
/// whether or not that relation is extracted itself.
async fn fetch_referenced_relations(conn: &mut sqlx::PgConnection) -> Result<Vec<ReferencedRelationRow>> {
    let rows = fetch_rows(
        conn,
        r#"
        WITH referenced AS (
            SELECT con.confrelid AS oid
            FROM pg_constraint con
            WHERE con.contype = 'f'
            UNION
            SELECT own.refobjid
            FROM pg_depend own
            JOIN pg_class s ON s.oid = own.objid AND s.relkind = 'S'
            WHERE own.classid = 'pg_class'::regclass
              AND own.refclassid = 'pg_class'::regclass
              AND own.refobjsubid > 0
              AND own.deptype = 'a'
        )
        SELECT
            c.oid::int8 AS oid,
            n.nspname AS schema,
            c.relname AS name,
            COALESCE(array_agg(a.attnum ORDER BY a.attnum) FILTER (WHERE a.attnum IS NOT NULL), '{}'::int2[]) AS column_numbers,
            COALESCE(array_agg(a.attname::text ORDER BY a.attnum) FILTER (WHERE a.attnum IS NOT NULL), '{}'::text[]) AS column_names
        FROM referenced r
        JOIN pg_class c ON c.oid = r.oid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
        GROUP BY c.oid, n.nspname, c.relname
        "#,
        "referenced relations",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| ReferencedRelationRow {
            oid: row.get("oid"),
            schema: row.get("schema"),
            name: row.get("name"),
            column_numbers: row.get("column_numbers"),
            column_names: row.get("column_names"),
        })
        .collect())
}

async fn fetch_sequences(conn: &mut sqlx::PgConnection) -> Result<Vec<SequenceRow>> {
    // Identity sequences (deptype 'i') belong to their column.
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                c.relnamespace::int8 AS schema_oid,
                c.relname AS name,
                format_type(s.seqtypid, NULL) AS data_type,
                s.seqstart AS start_value,
                s.seqincrement AS increment_by,
                s.seqmin AS min_value,
                s.seqmax AS max_value,
                s.seqcache AS cache_value,
                s.seqcycle AS cycle,
                own.refobjid::int8 AS owner_table_oid,
                own.refobjsubid::int2 AS owner_column,
                pg_get_userbyid(c.relowner) AS owner,
                c.relacl::text[] AS acl,
                obj_description(c.oid, 'pg_class') AS description
            FROM pg_sequence s
            JOIN pg_class c ON c.oid = s.seqrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_depend own ON own.classid = 'pg_class'::regclass
                AND own.objid = c.oid
                AND own.refclassid = 'pg_class'::regclass
                AND own.refobjsubid > 0
                AND own.deptype = 'a'
            WHERE NOT EXISTS (
                    SELECT 1 FROM pg_depend idn
                    WHERE idn.classid = 'pg_class'::regclass AND idn.objid = c.oid AND idn.deptype = 'i'
                  )
              AND "#,
            user_schema!("n"),
            " AND ",
            not_extension_member!("pg_class", "c")
        ),
        "sequences",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| SequenceRow {
            schema_oid: row.get("schema_oid"),
            name: row.get("name"),
            data_type: row.get("data_type"),
            start: row.get("start_value"),
            increment: row.get("increment_by"),
            min_value: row.get("min_value"),
            max_value: row.get("max_value"),
            cache: row.get("cache_value"),
            cycle: row.get("cycle"),
            owner_table_oid: row.get("owner_table_oid"),
            owner_column: row.get("owner_column"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_functions(conn: &mut sqlx::PgConnection) -> Result<Vec<FunctionRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                p.pronamespace::int8 AS schema_oid,
                p.proname AS name,
                p.prokind AS kind,
                pg_get_function_identity_arguments(p.oid) AS arguments,
                CASE WHEN p.prokind = 'f' THEN pg_get_function_result(p.oid) END AS returns,
                l.lanname::text AS language,
                p.prosrc AS source,
                CASE WHEN l.lanname = 'c' THEN p.probin END AS obj_file,
                p.provolatile AS volatility,
                p.proisstrict AS strict,
                p.prosecdef AS security_definer,
                p.proleakproof AS leakproof,
                pg_get_userbyid(p.proowner) AS owner,
                p.proacl::text[] AS acl,
                obj_description(p.oid, 'pg_proc') AS description
            FROM pg_proc p
            JOIN pg_namespace n ON n.oid = p.pronamespace
            JOIN pg_language l ON l.oid = p.prolang
            WHERE p.prokind IN ('f', 'p') AND "#,
            user_schema!("n"),
            " AND ",
            not_extension_member!("pg_proc", "p")
        ),
        "functions",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| FunctionRow {
            schema_oid: row.get("schema_oid"),
            name: row.get("name"),
            kind: catalog_char(row, "kind"),
            arguments: row.get("arguments"),
            returns: row.get("returns"),
            language: row.get("language"),
            source: row.get("source"),
            obj_file: row.get("obj_file"),
            volatility: catalog_char(row, "volatility"),
            strict: row.get("strict"),
            security_definer: row.get("security_definer"),
            leakproof: row.get("leakproof"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_views(conn: &mut sqlx::PgConnection) -> Result<Vec<ViewRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                c.relnamespace::int8 AS schema_oid,
                c.relname AS name,
                pg_get_viewdef(c.oid, true) AS definition,
                c.relkind = 'm' AS materialized,
                pg_get_userbyid(c.relowner) AS owner,
                c.relacl::text[] AS acl,
                obj_description(c.oid, 'pg_class') AS description
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind IN ('v', 'm') AND "#,
            user_schema!("n"),
            " AND ",
            not_extension_member!("pg_class", "c")
        ),
        "views",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| ViewRow {
            schema_oid: row.get("schema_oid"),
            name: row.get("name"),
            definition: row.get("definition"),
            materialized: row.get("materialized"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_enum_types(conn: &mut sqlx::PgConnection) -> Result<Vec<EnumTypeRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                t.typnamespace::int8 AS schema_oid,
                t.typname AS name,
                ARRAY(
                    SELECT e.enumlabel::text FROM pg_enum e
                    WHERE e.enumtypid = t.oid
                    ORDER BY e.enumsortorder
                ) AS labels,
                pg_get_userbyid(t.typowner) AS owner,
                t.typacl::text[] AS acl,
                obj_description(t.oid, 'pg_type') AS description
            FROM pg_type t
            JOIN pg_namespace n ON n.oid = t.typnamespace
            WHERE t.typtype = 'e' AND "#,
            user_schema!("n"),
            " AND ",
            not_extension_member!("pg_type", "t")
        ),
        "enum types",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| EnumTypeRow {
            schema_oid: row.get("schema_oid"),
            name: row.get("name"),
            labels: row.get("labels"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_extensions(conn: &mut sqlx::PgConnection) -> Result<Vec<ExtensionRow>> {
    let rows = fetch_rows(
        conn,
        r#"
        SELECT
            e.extname AS name,
            n.nspname AS schema,
            e.extversion AS version,
            pg_get_userbyid(e.extowner) AS owner,
            obj_description(e.oid, 'pg_extension') AS description
        FROM pg_extension e
        JOIN pg_namespace n ON n.oid = e.extnamespace
        "#,
        "extensions",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| ExtensionRow {
            name: row.get("name"),
            schema: row.get("schema"),
            version: row.get("version"),
            owner: row.get("owner"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_languages(conn: &mut sqlx::PgConnection) -> Result<Vec<LanguageRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                l.lanname AS name,
                l.lanpltrusted AS trusted,
                pg_get_userbyid(l.lanowner) AS owner,
                l.lanacl::text[] AS acl,
                obj_description(l.oid, 'pg_language') AS description
            FROM pg_language l
            WHERE l.lanispl AND "#,
            not_extension_member!("pg_language", "l")
        ),
        "languages",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| LanguageRow {
            name: row.get("name"),
            trusted: row.get("trusted"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_foreign_data_wrappers(conn: &mut sqlx::PgConnection) -> Result<Vec<ForeignDataWrapperRow>> {
    // Wrappers are kept even when an extension created them, since user
    // servers nest under them.
    let rows = fetch_rows(
        conn,
        r#"
        SELECT
            w.oid::int8 AS oid,
            w.fdwname AS name,
            CASE WHEN w.fdwhandler <> 0 THEN w.fdwhandler::regproc::text END AS handler,
            CASE WHEN w.fdwvalidator <> 0 THEN w.fdwvalidator::regproc::text END AS validator,
            COALESCE(w.fdwoptions, '{}'::text[]) AS options,
            pg_get_userbyid(w.fdwowner) AS owner,
            w.fdwacl::text[] AS acl,
            obj_description(w.oid, 'pg_foreign_data_wrapper') AS description
        FROM pg_foreign_data_wrapper w
        "#,
        "foreign data wrappers",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| ForeignDataWrapperRow {
            oid: row.get("oid"),
            name: row.get("name"),
            handler: row.get("handler"),
            validator: row.get("validator"),
            options: row.get("options"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_foreign_servers(conn: &mut sqlx::PgConnection) -> Result<Vec<ForeignServerRow>> {
    let rows = fetch_rows(
        conn,
        r#"
        SELECT
            s.srvfdw::int8 AS fdw_oid,
            s.srvname AS name,
            s.srvtype AS server_type,
            s.srvversion AS version,
            COALESCE(s.srvoptions, '{}'::text[]) AS options,
            pg_get_userbyid(s.srvowner) AS owner,
            s.srvacl::text[] AS acl,
            obj_description(s.oid, 'pg_foreign_server') AS description
        FROM pg_foreign_server s
        "#,
        "foreign servers",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| ForeignServerRow {
            fdw_oid: row.get("fdw_oid"),
            name: row.get("name"),
            server_type: row.get("server_type"),
            version: row.get("version"),
            options: row.get("options"),
            owner: row.get("owner"),
            acl: row.get("acl"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_casts(conn: &mut sqlx::PgConnection) -> Result<Vec<CastRow>> {
    // OIDs below 16384 are assigned at initdb time.
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                format_type(c.castsource, NULL) AS source,
                format_type(c.casttarget, NULL) AS target,
                CASE WHEN c.castfunc <> 0 THEN c.castfunc::regprocedure::text END AS function,
                c.castcontext AS context,
                c.castmethod AS method,
                obj_description(c.oid, 'pg_cast') AS description
            FROM pg_cast c
            WHERE c.oid >= 16384 AND "#,
            not_extension_member!("pg_cast", "c")
        ),
        "casts",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| CastRow {
            source: row.get("source"),
            target: row.get("target"),
            function: row.get("function"),
            context: catalog_char(row, "context"),
            method: catalog_char(row, "method"),
            description: row.get("description"),
        })
        .collect())
}

async fn fetch_event_triggers(conn: &mut sqlx::PgConnection) -> Result<Vec<EventTriggerRow>> {
    let rows = fetch_rows(
        conn,
        concat!(
            r#"
            SELECT
                e.evtname AS name,
                e.evtevent AS event,
                quote_ident(pn.nspname) || '.' || quote_ident(p.proname) || '()' AS procedure,
                COALESCE(e.evttags, '{}'::text[]) AS tags,
                e.evtenabled AS enabled,
                pg_get_userbyid(e.evtowner) AS owner,
                obj_description(e.oid, 'pg_event_trigger') AS description
            FROM pg_event_trigger e
            JOIN pg_proc p ON p.oid = e.evtfoid
            JOIN pg_namespace pn ON pn.oid = p.pronamespace
            WHERE "#,
            not_extension_member!("pg_event_trigger", "e")
        ),
        "event triggers",
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| EventTriggerRow {
            name: row.get("name"),
            event: row.get("event"),
            procedure: row.get("procedure"),
            tags: row.get("tags"),
            enabled: catalog_char(row, "enabled"),
            owner: row.get("owner"),
            description: row.get("description"),
        })
        .collect())
}
