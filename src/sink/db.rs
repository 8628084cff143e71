use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use super::{Sink, SinkError};
use crate::record::Record;
use crate::settings::InsertMode;

pub fn connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pokemon (
            id                 INTEGER PRIMARY KEY,
            ordinal            INTEGER NOT NULL,
            catalog_index      INTEGER NOT NULL,
            name               TEXT NOT NULL CHECK(length(name) <= 20),
            variant_label      TEXT CHECK(length(variant_label) <= 40),
            category_primary   TEXT NOT NULL CHECK(length(category_primary) <= 10),
            category_secondary TEXT CHECK(length(category_secondary) <= 10),
            species            TEXT NOT NULL CHECK(length(species) <= 40),
            height             REAL,
            weight             REAL,
            ability_primary    TEXT CHECK(length(ability_primary) <= 25),
            ability_secondary  TEXT CHECK(length(ability_secondary) <= 25),
            ability_hidden     TEXT CHECK(length(ability_hidden) <= 25),
            hp                 INTEGER NOT NULL,
            attack             INTEGER NOT NULL,
            defence            INTEGER NOT NULL,
            sp_attack          INTEGER NOT NULL,
            sp_defence         INTEGER NOT NULL,
            speed              INTEGER NOT NULL,
            total              INTEGER NOT NULL,
            generation         TEXT CHECK(length(generation) <= 10),
            scraped_at         TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pokemon_index ON pokemon(catalog_index, variant_label);
        ",
    )?;
    Ok(())
}

// ── Writes ──

const INSERT_SQL: &str = "INSERT INTO pokemon
     (ordinal, catalog_index, name, variant_label, category_primary, category_secondary,
      species, height, weight, ability_primary, ability_secondary, ability_hidden,
      hp, attack, defence, sp_attack, sp_defence, speed, total, generation)
     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)";

fn execute_insert(conn: &Connection, r: &Record) -> rusqlite::Result<usize> {
    conn.execute(
        INSERT_SQL,
        params![
            r.ordinal, r.catalog_index, r.name, r.variant_label, r.category_primary,
            r.category_secondary, r.species, r.height, r.weight, r.ability_primary,
            r.ability_secondary, r.ability_hidden, r.hp, r.attack, r.defence,
            r.sp_attack, r.sp_defence, r.speed, r.total, r.generation,
        ],
    )
}

/// Plain insert, committed on its own.
pub fn insert_record(conn: &Connection, record: &Record) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    execute_insert(&tx, record)?;
    tx.commit()
}

/// Replace any row with the same (catalog_index, variant_label). A missing
/// label matches a missing label.
pub fn upsert_record(conn: &Connection, record: &Record) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM pokemon WHERE catalog_index = ?1 AND variant_label IS ?2",
        params![record.catalog_index, record.variant_label],
    )?;
    execute_insert(&tx, record)?;
    tx.commit()
}

// ── Stats ──

pub struct Stats {
    pub rows: usize,
    pub entries: usize,
    pub variants: usize,
    pub missing_measures: usize,
    pub no_ability: usize,
    pub total_mismatches: usize,
}

pub fn get_stats(conn: &Connection) -> rusqlite::Result<Stats> {
    let count = |sql: &str| conn.query_row(sql, [], |r| r.get::<_, usize>(0));
    Ok(Stats {
        rows: count("SELECT COUNT(*) FROM pokemon")?,
        entries: count("SELECT COUNT(DISTINCT catalog_index) FROM pokemon")?,
        variants: count("SELECT COUNT(*) FROM pokemon WHERE variant_label IS NOT NULL")?,
        missing_measures: count("SELECT COUNT(*) FROM pokemon WHERE height IS NULL OR weight IS NULL")?,
        no_ability: count(
            "SELECT COUNT(*) FROM pokemon
             WHERE ability_primary IS NULL AND ability_secondary IS NULL AND ability_hidden IS NULL",
        )?,
        total_mismatches: count(
            "SELECT COUNT(*) FROM pokemon
             WHERE total != hp + attack + defence + sp_attack + sp_defence + speed",
        )?,
    })
}

/// Relational sink: every record is written and committed before the next
/// one is extracted.
pub struct SqliteSink {
    conn: Connection,
    path: PathBuf,
    mode: InsertMode,
}

impl SqliteSink {
    pub fn open(path: &Path, mode: InsertMode) -> Result<Self, SinkError> {
        let conn = connect(path)?;
        Self::with_connection(conn, path.to_path_buf(), mode)
    }

    pub fn with_connection(conn: Connection, path: PathBuf, mode: InsertMode) -> Result<Self, SinkError> {
        init_schema(&conn)?;
        Ok(SqliteSink { conn, path, mode })
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Sink for SqliteSink {
    fn persist(&mut self, record: Record) -> Result<(), SinkError> {
        match self.mode {
            InsertMode::Insert => insert_record(&self.conn, &record)?,
            InsertMode::Upsert => upsert_record(&self.conn, &record)?,
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn describe(&self) -> String {
        let mode = match self.mode {
            InsertMode::Insert => "insert",
            InsertMode::Upsert => "upsert",
        };
        format!("sqlite {} ({})", self.path.display(), mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample;

    fn sink(mode: InsertMode) -> SqliteSink {
        let conn = Connection::open_in_memory().unwrap();
        SqliteSink::with_connection(conn, PathBuf::from(":memory:"), mode).unwrap()
    }

    fn write_run(s: &mut SqliteSink) {
        s.persist(sample(0, 3, None)).unwrap();
        s.persist(sample(1, 3, Some("Mega Venusaur"))).unwrap();
        s.finish().unwrap();
    }

    fn rows(s: &SqliteSink) -> usize {
        get_stats(s.connection()).unwrap().rows
    }

    #[test]
    fn insert_mode_duplicates_on_rerun() {
        let mut s = sink(InsertMode::Insert);
        write_run(&mut s);
        write_run(&mut s);
        assert_eq!(rows(&s), 4);
    }

    #[test]
    fn upsert_mode_replaces_on_rerun() {
        let mut s = sink(InsertMode::Upsert);
        write_run(&mut s);
        write_run(&mut s);
        let stats = get_stats(s.connection()).unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.variants, 1);
    }

    #[test]
    fn upsert_keeps_latest_values() {
        let mut s = sink(InsertMode::Upsert);
        s.persist(sample(0, 3, None)).unwrap();
        let mut updated = sample(5, 3, None);
        updated.species = "Seed Pokemon".to_string();
        s.persist(updated).unwrap();
        let (ordinal, species): (u32, String) = s
            .connection()
            .query_row("SELECT ordinal, species FROM pokemon", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!((ordinal, species.as_str()), (5, "Seed Pokemon"));
    }

    #[test]
    fn null_measures_are_stored_as_null() {
        let mut s = sink(InsertMode::Insert);
        let mut r = sample(0, 3, None);
        r.height = None;
        s.persist(r).unwrap();
        let height: Option<f64> = s
            .connection()
            .query_row("SELECT height FROM pokemon", [], |r| r.get(0))
            .unwrap();
        assert_eq!(height, None);
        assert_eq!(get_stats(s.connection()).unwrap().missing_measures, 1);
    }

    #[test]
    fn over_long_name_is_rejected() {
        let mut s = sink(InsertMode::Insert);
        let mut r = sample(0, 3, None);
        r.name = "A".repeat(21);
        assert!(matches!(s.persist(r), Err(SinkError::Db(_))));
        assert_eq!(rows(&s), 0);
    }

    #[test]
    fn schema_is_idempotent() {
        let s = sink(InsertMode::Insert);
        init_schema(s.connection()).unwrap();
    }
}
