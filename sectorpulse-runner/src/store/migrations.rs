//! Schema migrations, each applied once and recorded by name.

use rusqlite::{params, Connection};

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    run_migration(conn, "001_create_stock_daily", MIGRATION_001_STOCK_DAILY)?;
    run_migration(conn, "002_create_sector_performance", MIGRATION_002_SECTOR_PERFORMANCE)?;
    run_migration(conn, "003_create_trend_scores", MIGRATION_003_TREND_SCORES)?;
    run_migration(conn, "004_create_benchmark_daily", MIGRATION_004_BENCHMARK_DAILY)?;
    run_migration(conn, "005_create_collection_log", MIGRATION_005_COLLECTION_LOG)?;
    run_migration(conn, "006_create_indexes", MIGRATION_006_INDEXES)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> rusqlite::Result<()> {
    let applied: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !applied {
        tracing::debug!(migration = name, "applying migration");
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", params![name])?;
    }

    Ok(())
}

const MIGRATION_001_STOCK_DAILY: &str = r#"
CREATE TABLE IF NOT EXISTS stock_daily (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    ticker TEXT NOT NULL,
    name TEXT NOT NULL,
    country TEXT NOT NULL,
    sector TEXT NOT NULL,
    market_cap REAL,
    close_price REAL NOT NULL,
    daily_return REAL,
    volume REAL,
    avg_volume_20d REAL,
    is_filtered INTEGER NOT NULL DEFAULT 0,
    is_abnormal INTEGER NOT NULL DEFAULT 0,
    UNIQUE(date, ticker)
);
"#;

const MIGRATION_002_SECTOR_PERFORMANCE: &str = r#"
CREATE TABLE IF NOT EXISTS sector_performance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    country TEXT NOT NULL,
    sector TEXT NOT NULL,
    daily_return REAL,
    weekly_return REAL,
    breadth REAL NOT NULL,
    volume_change REAL NOT NULL,
    stock_count INTEGER NOT NULL,
    top_gainers TEXT NOT NULL,
    top_losers TEXT NOT NULL,
    collected_at TEXT NOT NULL,
    UNIQUE(date, country, sector)
);
"#;

const MIGRATION_003_TREND_SCORES: &str = r#"
CREATE TABLE IF NOT EXISTS trend_scores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    sector TEXT NOT NULL,
    trend_score REAL NOT NULL,
    countries_positive INTEGER NOT NULL,
    countries_negative INTEGER NOT NULL,
    global_avg_return REAL NOT NULL,
    global_breadth REAL NOT NULL,
    momentum_signal TEXT NOT NULL,
    UNIQUE(date, sector)
);
"#;

const MIGRATION_004_BENCHMARK_DAILY: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_daily (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    ticker TEXT NOT NULL,
    name TEXT NOT NULL,
    country TEXT NOT NULL,
    sector TEXT,
    close_price REAL NOT NULL,
    daily_return REAL,
    weekly_return REAL,
    UNIQUE(date, ticker)
);
"#;

const MIGRATION_005_COLLECTION_LOG: &str = r#"
CREATE TABLE IF NOT EXISTS collection_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    market TEXT NOT NULL,
    status TEXT NOT NULL,
    total_stocks INTEGER NOT NULL DEFAULT 0,
    filtered_stocks INTEGER NOT NULL DEFAULT 0,
    abnormal_stocks INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);
"#;

const MIGRATION_006_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_stock_daily_date ON stock_daily(date);
CREATE INDEX IF NOT EXISTS idx_stock_daily_country ON stock_daily(date, country);
CREATE INDEX IF NOT EXISTS idx_sector_perf_date ON sector_performance(date);
CREATE INDEX IF NOT EXISTS idx_trend_scores_date ON trend_scores(date);
CREATE INDEX IF NOT EXISTS idx_benchmark_date ON benchmark_daily(date);
"#;
