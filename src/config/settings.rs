// ==========================================
// 表格数据交换引擎 - 引擎配置快照
// ==========================================
// 职责: 将 ExchangeConfigReader 的异步读取结果固化为普通结构体
// 说明: 转换/解析流程是同步的，只依赖这份快照
// ==========================================

use crate::config::exchange_config_trait::ExchangeConfigReader;
use crate::importer::encoding_detector::{TextEncoding, DEFAULT_SAMPLE_BYTES};
use crate::repository::error::StoreResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSettings {
    pub encoding_sample_bytes: usize,
    pub platform_default_encoding: TextEncoding,
    pub min_valid_year: i32,
    pub bool_true_display: String,
    pub bool_false_display: String,
    pub default_max_error_count: usize, // 0 = 不限制
    pub import_batch_size: usize,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            encoding_sample_bytes: DEFAULT_SAMPLE_BYTES,
            platform_default_encoding: TextEncoding::platform_default(),
            min_valid_year: 1900,
            bool_true_display: "是".to_string(),
            bool_false_display: "否".to_string(),
            default_max_error_count: 100,
            import_batch_size: 500,
        }
    }
}

impl ExchangeSettings {
    /// 从配置读取器加载快照
    pub async fn load(reader: &dyn ExchangeConfigReader) -> StoreResult<Self> {
        let (bool_true_display, bool_false_display) = reader.get_bool_display().await?;

        Ok(Self {
            encoding_sample_bytes: reader.get_encoding_sample_bytes().await?,
            platform_default_encoding: reader.get_platform_default_encoding().await?,
            min_valid_year: reader.get_min_valid_year().await?,
            bool_true_display,
            bool_false_display,
            default_max_error_count: reader.get_default_max_error_count().await?,
            import_batch_size: reader.get_import_batch_size().await?,
        })
    }
}
