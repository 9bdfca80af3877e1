// ==========================================
// 表格数据交换引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::exchange_config_trait::ExchangeConfigReader;
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::importer::encoding_detector::{TextEncoding, DEFAULT_SAMPLE_BYTES};
use crate::repository::error::{StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| StoreError::LockError(e.to_string()))?;
            configure_sqlite_connection(&conn_guard)?;
            init_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> StoreResult<BTreeMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> StoreResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置，格式错误时回退默认值
    fn get_usize_or_default(&self, key: &str, default: usize) -> StoreResult<usize> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        Ok(value.trim().parse::<usize>().unwrap_or_else(|_| {
            warn!(config_key = key, raw_value = %value, "配置格式错误，使用默认值");
            default
        }))
    }
}

// ==========================================
// ExchangeConfigReader 实现
// ==========================================
#[async_trait]
impl ExchangeConfigReader for ConfigManager {
    async fn get_encoding_sample_bytes(&self) -> StoreResult<usize> {
        let value = self.get_usize_or_default(config_keys::ENCODING_SAMPLE_BYTES, DEFAULT_SAMPLE_BYTES)?;
        Ok(value.max(4))
    }

    async fn get_platform_default_encoding(&self) -> StoreResult<TextEncoding> {
        let default = TextEncoding::platform_default();
        let value = self.get_config_or_default(config_keys::PLATFORM_DEFAULT_ENCODING, default.name())?;
        Ok(value.parse::<TextEncoding>().unwrap_or_else(|e| {
            warn!(config_key = config_keys::PLATFORM_DEFAULT_ENCODING, error = %e, "使用平台默认编码");
            default
        }))
    }

    async fn get_min_valid_year(&self) -> StoreResult<i32> {
        let value = self.get_config_or_default(config_keys::MIN_VALID_YEAR, "1900")?;
        Ok(value.trim().parse::<i32>().unwrap_or(1900))
    }

    async fn get_bool_display(&self) -> StoreResult<(String, String)> {
        let true_text = self.get_config_or_default(config_keys::BOOL_TRUE_DISPLAY, "是")?;
        let false_text = self.get_config_or_default(config_keys::BOOL_FALSE_DISPLAY, "否")?;
        Ok((true_text, false_text))
    }

    async fn get_default_max_error_count(&self) -> StoreResult<usize> {
        self.get_usize_or_default(config_keys::DEFAULT_MAX_ERROR_COUNT, 100)
    }

    async fn get_import_batch_size(&self) -> StoreResult<usize> {
        let value = self.get_usize_or_default(config_keys::IMPORT_BATCH_SIZE, 500)?;
        Ok(value.max(1))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 编码探测
    pub const ENCODING_SAMPLE_BYTES: &str = "encoding_sample_bytes";
    pub const PLATFORM_DEFAULT_ENCODING: &str = "platform_default_encoding";

    // 值转换
    pub const MIN_VALID_YEAR: &str = "min_valid_year";
    pub const BOOL_TRUE_DISPLAY: &str = "bool_true_display";
    pub const BOOL_FALSE_DISPLAY: &str = "bool_false_display";

    // 导入控制
    pub const DEFAULT_MAX_ERROR_COUNT: &str = "default_max_error_count";
    pub const IMPORT_BATCH_SIZE: &str = "import_batch_size";
}
