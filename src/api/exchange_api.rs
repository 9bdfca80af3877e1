// ==========================================
// 表格数据交换引擎 - 数据交换 API
// ==========================================
// 职责: 对外的导入/导出入口，串起 解析 -> 对账 -> 提交 与 查询 -> 编排 -> 写出
// 提交策略: 每次调用一个工作单元
//   - 正常结束（含部分失败）: 提交
//   - ReplaceAll 中途终止: 整体回滚，旧数据保留
//   - 提交失败: 回滚并返回 Err
// 并发: 存储由 Mutex 保护，同一实例上的导入按调用串行执行
// ==========================================

use crate::config::exchange_config_trait::ExchangeConfigReader;
use crate::config::options::{ExportOptions, ImportOptions};
use crate::config::settings::ExchangeSettings;
use crate::domain::outcome::ImportOutcome;
use crate::domain::types::ImportMode;
use crate::domain::value::Record;
use crate::error::{ExchangeError, ExchangeResult};
use crate::exporter::export_composer::{ExportComposer, TabularDocument};
use crate::exporter::file_writer::write_document;
use crate::importer::converter_registry::ConverterRegistry;
use crate::importer::encoding_detector::{EncodingDetectionResult, EncodingDetector};
use crate::importer::file_parser::{ParseOptions, ParsedFile, UniversalFileParser};
use crate::importer::importer_trait::{FileParser, TabularImporter};
use crate::importer::reconciler::{ImportReconciler, ReconcilePolicy};
use crate::importer::value_converter::ValueConverter;
use crate::repository::error::StoreError;
use crate::repository::object_store::{Criteria, PersistentObjectStore};
use crate::schema::registry::TypeRegistry;
use crate::schema::type_config::TypeConfiguration;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// 数据交换 API
pub struct DataExchangeApi<S: PersistentObjectStore + Send + 'static> {
    store: Arc<Mutex<S>>,
    registry: Arc<TypeRegistry>,
    converters: Arc<ConverterRegistry>,
    settings: ExchangeSettings,
}

impl<S: PersistentObjectStore + Send + 'static> DataExchangeApi<S> {
    /// 创建 API 实例
    ///
    /// # 参数
    /// - store: 对象存储
    /// - registry: 启动时注册好的类型配置
    /// - converters: 自定义转换器
    /// - settings: 引擎配置快照
    pub fn new(
        store: S,
        registry: TypeRegistry,
        converters: ConverterRegistry,
        settings: ExchangeSettings,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            registry: Arc::new(registry),
            converters: Arc::new(converters),
            settings,
        }
    }

    /// 从配置读取器加载引擎配置后创建实例
    pub async fn with_config_reader(
        store: S,
        registry: TypeRegistry,
        converters: ConverterRegistry,
        reader: &dyn ExchangeConfigReader,
    ) -> ExchangeResult<Self> {
        let settings = ExchangeSettings::load(reader).await?;
        info!(settings = ?settings, "引擎配置加载完成");
        Ok(Self::new(store, registry, converters, settings))
    }

    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    /// 探测字节流编码（不导入）
    pub fn detect_encoding(&self, bytes: &[u8]) -> EncodingDetectionResult {
        EncodingDetector::from_settings(&self.settings).detect(bytes)
    }

    /// 按类型配置解析字节流（不导入）
    pub fn parse_bytes(
        &self,
        type_name: &str,
        bytes: &[u8],
        options: &ImportOptions,
    ) -> ExchangeResult<ParsedFile> {
        let config = self.registry.get(type_name)?;
        self.parse_for(&config, bytes, options)
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 导出满足条件的记录为字节
    #[instrument(skip(self, criteria, options), fields(format = ?options.format))]
    pub fn export_bytes(
        &self,
        type_name: &str,
        criteria: &Criteria,
        options: &ExportOptions,
    ) -> ExchangeResult<Vec<u8>> {
        let config = self.export_config(type_name)?;
        let store = self.lock_store()?;
        let records = store.get_objects(type_name, criteria)?;
        let document = self.compose(&config, &*store, &records, options)?;
        drop(store);

        let bytes = write_document(&document, options)?;
        info!(records = records.len(), bytes = bytes.len(), "导出完成");
        Ok(bytes)
    }

    /// 导出指定记录（调用方已查询）
    pub fn export_records(
        &self,
        type_name: &str,
        records: &[Record],
        options: &ExportOptions,
    ) -> ExchangeResult<Vec<u8>> {
        let config = self.export_config(type_name)?;
        let store = self.lock_store()?;
        let document = self.compose(&config, &*store, records, options)?;
        drop(store);
        write_document(&document, options)
    }

    /// 导出到文件
    ///
    /// # 返回
    /// - Ok(usize): 写出的字节数
    pub async fn export_file(
        &self,
        type_name: &str,
        criteria: &Criteria,
        file_path: &Path,
        options: &ExportOptions,
    ) -> ExchangeResult<usize> {
        let bytes = self.export_bytes(type_name, criteria, options)?;
        tokio::fs::write(file_path, &bytes)
            .await
            .map_err(|e| ExchangeError::FileReadError(format!("{}: {}", file_path.display(), e)))?;
        info!(file = %file_path.display(), bytes = bytes.len(), "导出文件已写出");
        Ok(bytes.len())
    }

    // ==========================================
    // 内部
    // ==========================================

    fn import_config(&self, type_name: &str) -> ExchangeResult<Arc<TypeConfiguration>> {
        let config = self.registry.get(type_name)?;
        if !config.import_enabled {
            return Err(ExchangeError::ImportDisabled(type_name.to_string()));
        }
        Ok(config)
    }

    fn export_config(&self, type_name: &str) -> ExchangeResult<Arc<TypeConfiguration>> {
        let config = self.registry.get(type_name)?;
        if !config.export_enabled {
            return Err(ExchangeError::ExportDisabled(type_name.to_string()));
        }
        Ok(config)
    }

    fn lock_store(&self) -> ExchangeResult<MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|e| ExchangeError::Store(StoreError::LockError(e.to_string())))
    }

    fn parse_for(
        &self,
        config: &TypeConfiguration,
        bytes: &[u8],
        options: &ImportOptions,
    ) -> ExchangeResult<ParsedFile> {
        let parser = UniversalFileParser::new(EncodingDetector::from_settings(&self.settings));
        parser.parse(bytes, &ParseOptions::for_type(config, options.has_header_row))
    }

    fn compose(
        &self,
        config: &TypeConfiguration,
        store: &S,
        records: &[Record],
        options: &ExportOptions,
    ) -> ExchangeResult<TabularDocument> {
        let converter = ValueConverter::new(&self.settings, &self.converters);
        let composer = ExportComposer::new(&self.registry, converter, store);
        composer.compose(config, records, options.sheet_name.as_deref())
    }

    /// 解析 + 对账 + 提交（同步，持锁期间无挂起点）
    fn run_import(
        &self,
        config: &TypeConfiguration,
        bytes: &[u8],
        options: &ImportOptions,
    ) -> ExchangeResult<ImportOutcome> {
        let started = Instant::now();

        let parsed = self.parse_for(config, bytes, options)?;
        info!(
            sheets = parsed.document.sheets().len(),
            rows = parsed.document.main_sheet().map(|s| s.rows.len()).unwrap_or(0),
            parse_errors = parsed.row_errors.len(),
            encoding = ?parsed.encoding.as_ref().map(|e| e.encoding),
            "文件解析完成"
        );

        let policy = ReconcilePolicy::resolve(config, options, &self.settings);
        let mode = policy.mode;

        let mut store = self.lock_store()?;
        let outcome = {
            let reconciler =
                ImportReconciler::new(&self.registry, &self.settings, &self.converters, &mut *store, policy);
            match reconciler.run(config, &parsed) {
                Ok(outcome) => outcome,
                Err(e) => {
                    store.rollback();
                    error!(error = %e, "导入对账失败，已回滚");
                    return Err(e);
                }
            }
        };

        if outcome.aborted && mode == ImportMode::ReplaceAll {
            store.rollback();
            warn!(
                type_name = %config.type_name,
                failed = outcome.failure_count,
                "ReplaceAll 导入中止，已回滚，原有数据保留"
            );
        } else {
            match store.commit() {
                Ok(changes) => info!(changes = changes, "工作单元已提交"),
                Err(e) => {
                    store.rollback();
                    error!(error = %e, "提交失败，已回滚");
                    return Err(e.into());
                }
            }
        }

        info!(
            type_name = %config.type_name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            success = outcome.success_count,
            failed = outcome.failure_count,
            "导入完成"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl<S: PersistentObjectStore + Send + 'static> TabularImporter for DataExchangeApi<S> {
    #[instrument(skip(self, options), fields(mode = ?options.mode))]
    async fn import_file(
        &self,
        type_name: &str,
        file_path: &Path,
        options: &ImportOptions,
    ) -> ExchangeResult<ImportOutcome> {
        UniversalFileParser::check_extension(file_path)?;
        let bytes = tokio::fs::read(file_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExchangeError::FileNotFound(file_path.display().to_string()),
            _ => ExchangeError::FileReadError(format!("{}: {}", file_path.display(), e)),
        })?;
        info!(file = %file_path.display(), bytes = bytes.len(), "读取导入文件");

        self.import_bytes(type_name, &bytes, options).await
    }

    async fn import_bytes(
        &self,
        type_name: &str,
        bytes: &[u8],
        options: &ImportOptions,
    ) -> ExchangeResult<ImportOutcome> {
        let config = self.import_config(type_name)?;
        self.run_import(&config, bytes, options)
    }
}
