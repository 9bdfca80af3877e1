// ==========================================
// 表格数据交换引擎 - 导入 Trait
// ==========================================
// 职责: 定义导入管道的接口（不包含实现）
// ==========================================

use crate::config::options::ImportOptions;
use crate::domain::outcome::ImportOutcome;
use crate::error::ExchangeResult;
use crate::importer::file_parser::{ParseOptions, ParsedFile};
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// TabularImporter Trait
// ==========================================
// 用途: 表格导入主接口
// 实现者: DataExchangeApi
#[async_trait]
pub trait TabularImporter: Send + Sync {
    /// 从文件导入指定类型的记录
    ///
    /// # 参数
    /// - type_name: 已注册的记录类型
    /// - file_path: .csv / .xlsx 文件路径
    /// - options: 导入选项
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 导入汇总（行级错误在其中，不走 Err）
    /// - Err: 类型未注册、导入未启用、文件不可读、提交失败
    ///
    /// # 导入流程
    /// 1. 读取字节
    /// 2. 编码探测（CSV）与表格解析
    /// 3. 逐行校验、转换、对账
    /// 4. 明细表导入（多工作表）
    /// 5. 提交或回滚工作单元
    async fn import_file(
        &self,
        type_name: &str,
        file_path: &Path,
        options: &ImportOptions,
    ) -> ExchangeResult<ImportOutcome>;

    /// 从内存字节导入
    async fn import_bytes(
        &self,
        type_name: &str,
        bytes: &[u8],
        options: &ImportOptions,
    ) -> ExchangeResult<ImportOutcome>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 字节流 -> 行记录
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析字节流
    ///
    /// # 返回
    /// - Ok(ParsedFile): 单表或多工作表行集，附带行级解析错误
    /// - Err: 整个文件无法解析
    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> ExchangeResult<ParsedFile>;
}
