// ==========================================
// 表格数据交换引擎 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义数据交换引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::encoding_detector::TextEncoding;
use crate::repository::error::StoreResult;
use async_trait::async_trait;

// ==========================================
// ExchangeConfigReader Trait
// ==========================================
// 用途: 导入/导出前读取一次，快照为 ExchangeSettings
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ExchangeConfigReader: Send + Sync {
    // ===== 编码探测 =====

    /// 获取编码探测采样窗口（字节）
    ///
    /// # 默认值
    /// - 8192
    async fn get_encoding_sample_bytes(&self) -> StoreResult<usize>;

    /// 获取平台默认编码（探测兜底时使用）
    ///
    /// # 默认值
    /// - Windows: GBK
    /// - 其他平台: UTF-8
    async fn get_platform_default_encoding(&self) -> StoreResult<TextEncoding>;

    // ===== 值转换 =====

    /// 获取有效日期的最小年份（早于该年份的日期视为缺失）
    ///
    /// # 默认值
    /// - 1900
    async fn get_min_valid_year(&self) -> StoreResult<i32>;

    /// 获取布尔值导出显示文本
    ///
    /// # 返回
    /// - (真值文本, 假值文本)
    ///
    /// # 默认值
    /// - ("是", "否")
    async fn get_bool_display(&self) -> StoreResult<(String, String)>;

    // ===== 导入控制 =====

    /// 获取默认错误上限（0 表示不限制）
    ///
    /// # 默认值
    /// - 100
    async fn get_default_max_error_count(&self) -> StoreResult<usize>;

    /// 获取导入批大小（进度日志间隔）
    ///
    /// # 默认值
    /// - 500
    async fn get_import_batch_size(&self) -> StoreResult<usize>;
}
