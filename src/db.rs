// ==========================================
// 成衣产线排产系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 统一建表入口，保证测试库与正式库 schema 一致
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启（款式删除保护依赖外键）
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 所有权约束:
/// - orders → styles: ON DELETE CASCADE
/// - styles → materials / line_allocations / production_entries: ON DELETE RESTRICT
///   （被引用的款式不可删除，杜绝孤儿记录）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS buyers (
            buyer_id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            contact_person TEXT,
            email TEXT,
            phone TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS orders (
            order_id TEXT PRIMARY KEY,
            po_number TEXT NOT NULL UNIQUE,
            buyer_id TEXT REFERENCES buyers(buyer_id) ON DELETE SET NULL,
            order_date TEXT NOT NULL,
            delivery_date TEXT NOT NULL,
            manual_status TEXT,
            total_quantity INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            CHECK (delivery_date >= order_date)
        );

        CREATE TABLE IF NOT EXISTS styles (
            style_id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(order_id) ON DELETE CASCADE,
            style_number TEXT NOT NULL,
            description TEXT,
            category TEXT,
            color TEXT,
            size_breakdown TEXT NOT NULL DEFAULT '{}',
            quantity INTEGER NOT NULL DEFAULT 0,
            manual_status TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (order_id, style_number)
        );
        CREATE INDEX IF NOT EXISTS idx_styles_order ON styles(order_id);
        CREATE INDEX IF NOT EXISTS idx_styles_number ON styles(style_number);

        CREATE TABLE IF NOT EXISTS materials (
            material_id TEXT PRIMARY KEY,
            style_id TEXT NOT NULL REFERENCES styles(style_id) ON DELETE RESTRICT,
            name TEXT NOT NULL,
            material_type TEXT NOT NULL,
            unit TEXT,
            required_quantity REAL NOT NULL DEFAULT 0,
            received_quantity REAL NOT NULL DEFAULT 0,
            issued_quantity REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'Pending',
            po_number TEXT,
            po_date TEXT,
            expected_delivery TEXT,
            actual_delivery TEXT,
            remarks TEXT,
            created_at TEXT NOT NULL,
            CHECK (issued_quantity >= 0 AND issued_quantity <= received_quantity)
        );
        CREATE INDEX IF NOT EXISTS idx_materials_style ON materials(style_id);

        CREATE TABLE IF NOT EXISTS production_lines (
            line_id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            capacity INTEGER NOT NULL CHECK (capacity > 0),
            active INTEGER NOT NULL DEFAULT 1,
            supervisor TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS line_allocations (
            allocation_id TEXT PRIMARY KEY,
            line_id TEXT NOT NULL REFERENCES production_lines(line_id) ON DELETE RESTRICT,
            style_id TEXT NOT NULL REFERENCES styles(style_id) ON DELETE RESTRICT,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            planned_quantity INTEGER NOT NULL CHECK (planned_quantity > 0),
            remarks TEXT,
            created_at TEXT NOT NULL,
            CHECK (end_date >= start_date)
        );
        CREATE INDEX IF NOT EXISTS idx_allocations_line_dates
            ON line_allocations(line_id, start_date, end_date);

        CREATE TABLE IF NOT EXISTS production_entries (
            entry_id TEXT PRIMARY KEY,
            entry_date TEXT NOT NULL,
            style_id TEXT NOT NULL REFERENCES styles(style_id) ON DELETE RESTRICT,
            line_id TEXT NOT NULL REFERENCES production_lines(line_id) ON DELETE RESTRICT,
            process TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            efficiency REAL CHECK (efficiency IS NULL OR (efficiency >= 0 AND efficiency <= 100)),
            defects INTEGER NOT NULL DEFAULT 0,
            delay_reason TEXT,
            remarks TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_entries_style_process
            ON production_entries(style_id, process);
        CREATE INDEX IF NOT EXISTS idx_entries_date ON production_entries(entry_date);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
