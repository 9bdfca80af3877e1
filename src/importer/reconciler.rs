// ==========================================
// 表格数据交换引擎 - 导入对账
// ==========================================
// 职责: 逐行 校验 -> 转换 -> 引用解析 -> 按导入模式与存储对账
// 模式:
//   CreateOnly     已存在 -> 跳过+警告；不存在 -> 新增
//   UpdateOnly     已存在 -> 更新；不存在 -> 跳过+警告
//   CreateOrUpdate 已存在 -> 更新；不存在 -> 新增
//   ReplaceAll     开始前删除该类型全部记录（含明细），再逐行新增
// 顺序: 严格按行顺序处理，明细依赖本轮已处理的主表对象
// 终止: 严格模式首个失败行 / 失败行数达到上限
// 存储: 所有修改暂存在同一工作单元，由调用方提交或回滚
// ==========================================

use crate::config::options::ImportOptions;
use crate::config::settings::ExchangeSettings;
use crate::domain::outcome::{ImportMessage, ImportOutcome, RowRecord};
use crate::domain::types::{ErrorKind, ImportMode, ValidationMode, ValueKind};
use crate::domain::value::{FieldValue, Record, RecordId};
use crate::error::ExchangeResult;
use crate::importer::converter_registry::ConverterRegistry;
use crate::importer::field_validator::FieldValidator;
use crate::importer::file_parser::ParsedFile;
use crate::importer::lookup_resolver::{LookupOutcome, LookupResolver};
use crate::importer::value_converter::ValueConverter;
use crate::repository::error::StoreResult;
use crate::repository::object_store::{Criteria, PersistentObjectStore};
use crate::schema::field_config::FieldConfiguration;
use crate::schema::registry::TypeRegistry;
use crate::schema::type_config::TypeConfiguration;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

// ==========================================
// ReconcilePolicy - 单次导入的生效策略
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePolicy {
    pub mode: ImportMode,
    pub validation_mode: ValidationMode,
    pub max_errors: Option<usize>,
    pub skip_duplicates: bool,
    pub has_header: bool,
    pub progress_interval: usize,
}

impl ReconcilePolicy {
    /// 合并 调用选项 > 类型配置 > 引擎配置
    pub fn resolve(
        config: &TypeConfiguration,
        options: &ImportOptions,
        settings: &ExchangeSettings,
    ) -> Self {
        Self {
            mode: options.mode.unwrap_or(config.default_import_mode),
            validation_mode: options.validation_mode.unwrap_or(config.validation_mode),
            max_errors: options.effective_max_errors(settings),
            skip_duplicates: options.skip_duplicates,
            has_header: options.has_header_row,
            progress_interval: options.effective_batch_size(settings),
        }
    }
}

/// 单行处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RowResult {
    Created(RecordId),
    Updated(RecordId),
    /// 按模式跳过；Some 表示已存在的对象
    Skipped(Option<RecordId>),
    Failed,
}

impl RowResult {
    /// 本轮中可作为明细父对象的记录
    pub(crate) fn record_id(&self) -> Option<RecordId> {
        match self {
            RowResult::Created(id) | RowResult::Updated(id) | RowResult::Skipped(Some(id)) => {
                Some(*id)
            }
            _ => None,
        }
    }
}

/// 校验与转换后的行
#[derive(Debug, Clone)]
pub(crate) struct MappedRow {
    pub values: Vec<(String, FieldValue)>,
    pub identity: Option<FieldValue>,
}

// ==========================================
// ImportReconciler
// ==========================================
pub struct ImportReconciler<'a, S: PersistentObjectStore + ?Sized> {
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) converters: &'a ConverterRegistry,
    pub(crate) converter: ValueConverter<'a>,
    pub(crate) store: &'a mut S,
    pub(crate) lookups: LookupResolver<'a>,
    pub(crate) policy: ReconcilePolicy,
    pub(crate) outcome: ImportOutcome,
    warned_no_identity: HashSet<String>,
    processed: usize,
}

impl<'a, S: PersistentObjectStore + ?Sized> ImportReconciler<'a, S> {
    pub fn new(
        registry: &'a TypeRegistry,
        settings: &'a ExchangeSettings,
        converters: &'a ConverterRegistry,
        store: &'a mut S,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            registry,
            converters,
            converter: ValueConverter::new(settings, converters),
            store,
            lookups: LookupResolver::new(registry),
            policy,
            outcome: ImportOutcome::default(),
            warned_no_identity: HashSet::new(),
            processed: 0,
        }
    }

    /// 执行一次导入对账
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 行级问题都在其中
    /// - Err: ReplaceAll 清空阶段的存储错误（尚未处理任何行）
    pub fn run(mut self, config: &TypeConfiguration, parsed: &ParsedFile) -> ExchangeResult<ImportOutcome> {
        info!(
            type_name = %config.type_name,
            mode = %self.policy.mode,
            strict = self.policy.validation_mode == ValidationMode::Strict,
            "开始导入对账"
        );

        // 步骤 1: 解析阶段的结果
        self.outcome.encoding = parsed.encoding.clone();
        for warning in &parsed.warnings {
            self.outcome.record_warning(warning.clone());
        }
        for error in &parsed.row_errors {
            if self.outcome.aborted {
                break;
            }
            self.outcome.total_rows += 1;
            self.outcome.record_error(error.clone());
            self.finish_row(RowResult::Failed);
        }

        // 步骤 2: ReplaceAll 清空
        if self.policy.mode == ImportMode::ReplaceAll {
            let deleted = self.clear_existing(config)?;
            info!(type_name = %config.type_name, deleted = deleted, "ReplaceAll 已暂存删除");
        }

        // 步骤 3: 主表
        let mut parents: HashMap<String, RecordId> = HashMap::new();
        if let Some(sheet) = parsed.document.main_sheet() {
            debug!(sheet = %sheet.name, rows = sheet.rows.len(), "步骤 3: 主表对账");
            for row in &sheet.rows {
                if self.outcome.aborted {
                    break;
                }
                self.outcome.total_rows += 1;

                let result = self.import_main_row(config, row, &sheet.name);
                if let Some(id) = result.record_id() {
                    if let Some(key) = self.identity_key_of(config, id) {
                        parents.insert(key, id);
                    }
                }
                self.finish_row(result);
            }
        }

        // 步骤 4: 明细表
        if !self.outcome.aborted && parsed.document.is_multi_sheet() {
            debug!("步骤 4: 明细表对账");
            self.import_details(config, &parsed.document, &parents);
        }

        if self.lookups.created_count() > 0 {
            info!(created = self.lookups.created_count(), "自动创建引用对象");
        }

        info!(
            type_name = %config.type_name,
            total = self.outcome.total_rows,
            success = self.outcome.success_count,
            failed = self.outcome.failure_count,
            created = self.outcome.created,
            updated = self.outcome.updated,
            skipped = self.outcome.skipped,
            warnings = self.outcome.warnings.len(),
            aborted = self.outcome.aborted,
            "导入对账完成"
        );

        Ok(self.outcome)
    }

    // ==========================================
    // ReplaceAll
    // ==========================================

    /// 暂存删除该类型全部对象及其多表明细
    fn clear_existing(&mut self, config: &TypeConfiguration) -> StoreResult<usize> {
        let existing = self.store.get_objects(&config.type_name, &Criteria::All)?;
        let mut deleted: HashSet<RecordId> = HashSet::new();

        for record in &existing {
            for field in config.multi_sheet_collections() {
                let mut children: Vec<RecordId> = record.get(&field.property).as_collection().to_vec();

                if let Some(item_type) = field.item_type() {
                    if let Ok(item_config) = self.registry.get(item_type) {
                        if let Some(back_ref) = item_config.back_reference_to(&config.type_name) {
                            let criteria =
                                Criteria::equals(back_ref.property.clone(), FieldValue::Reference(record.id));
                            children.extend(
                                self.store
                                    .get_objects(item_type, &criteria)?
                                    .into_iter()
                                    .map(|r| r.id),
                            );
                        }
                    }
                }

                for child in children {
                    if !deleted.contains(&child) && self.store.get_object(child)?.is_some() {
                        self.store.delete_object(child)?;
                        deleted.insert(child);
                    }
                }
            }

            self.store.delete_object(record.id)?;
            deleted.insert(record.id);
        }

        Ok(deleted.len())
    }

    // ==========================================
    // 行处理
    // ==========================================

    fn import_main_row(&mut self, config: &TypeConfiguration, row: &RowRecord, sheet: &str) -> RowResult {
        let Some(mapped) = self.map_row(config, row, sheet, None) else {
            return RowResult::Failed;
        };

        let existing = match (config.identity(), &mapped.identity) {
            (Some(identity), Some(value)) => {
                match self.store.find_object(&config.type_name, &identity.property, value) {
                    Ok(found) => found,
                    Err(e) => {
                        self.error(row.row_number, sheet, None, ErrorKind::SystemError, format!("查找已有记录失败: {}", e));
                        return RowResult::Failed;
                    }
                }
            }
            _ => None,
        };

        self.reconcile(config, mapped, existing, row.row_number, sheet)
    }

    /// 校验、转换并解析引用
    ///
    /// # 参数
    /// - skip_property: 不从单元格读取的属性（明细表的回指字段）
    ///
    /// # 返回
    /// - None: 行失败，错误已记录
    pub(crate) fn map_row(
        &mut self,
        config: &TypeConfiguration,
        row: &RowRecord,
        sheet: &str,
        skip_property: Option<&str>,
    ) -> Option<MappedRow> {
        let fields: Vec<&FieldConfiguration> = config
            .import_fields()
            .filter(|f| Some(f.property.as_str()) != skip_property)
            .collect();

        // 校验
        let mut failures = Vec::new();
        {
            let validator = FieldValidator::new(&self.converter, self.converters);
            for field in &fields {
                let raw = self.cell(config, row, field);
                let result = validator.validate(raw, field, row.row_number);
                if !result.is_valid {
                    failures.push(result);
                }
            }
        }
        if !failures.is_empty() {
            for failure in failures {
                let message = ImportMessage::from(failure).with_sheet(Some(sheet));
                self.outcome.record_error(message);
            }
            return None;
        }

        // 转换
        let mut values = Vec::with_capacity(fields.len());
        let mut failed = false;
        for field in &fields {
            let raw = self.cell(config, row, field).to_string();
            let result = self.converter.import_value(&raw, field);

            if let Some(warning) = result.warning {
                self.warning(row.row_number, sheet, Some(field.property.as_str()), ErrorKind::DataTypeConversion, warning);
            }
            if !result.success {
                let message = result
                    .error
                    .unwrap_or_else(|| format!("无法转换为 {}", field.kind));
                self.error(
                    row.row_number,
                    sheet,
                    Some(field.property.as_str()),
                    ErrorKind::DataTypeConversion,
                    format!("{}: {}", field.column(), message),
                );
                failed = true;
                continue;
            }
            values.push((field.property.clone(), result.value));
        }
        if failed {
            return None;
        }

        // 引用解析
        let mut resolved = Vec::with_capacity(values.len());
        for (property, value) in values {
            let Some(field) = config.field(&property) else {
                continue;
            };
            let is_lookup = matches!(field.kind, ValueKind::Reference(_)) && field.import_converter.is_none();
            let raw = match (&value, is_lookup) {
                (FieldValue::Text(raw), true) => raw.clone(),
                _ => {
                    resolved.push((property, value));
                    continue;
                }
            };

            match self.lookups.resolve(&mut *self.store, field, &raw) {
                LookupOutcome::Found(id) | LookupOutcome::Created(id) => {
                    resolved.push((property, FieldValue::Reference(id)));
                }
                LookupOutcome::Missing(message) => {
                    self.warning(row.row_number, sheet, Some(property.as_str()), ErrorKind::LookupError, message);
                }
                LookupOutcome::Failed(message) => {
                    self.error(row.row_number, sheet, Some(property.as_str()), ErrorKind::LookupError, message);
                    return None;
                }
            }
        }

        let identity = config.identity().and_then(|identity| {
            resolved
                .iter()
                .find(|(p, _)| *p == identity.property)
                .map(|(_, v)| v.clone())
                .filter(|v| v.identity_key().is_some())
        });

        Some(MappedRow {
            values: resolved,
            identity,
        })
    }

    /// 按导入模式应用一行
    pub(crate) fn reconcile(
        &mut self,
        config: &TypeConfiguration,
        mapped: MappedRow,
        existing: Option<Record>,
        row_number: usize,
        sheet: &str,
    ) -> RowResult {
        if config.identity().is_none() && self.warned_no_identity.insert(config.type_name.clone()) {
            warn!(type_name = %config.type_name, "类型没有标识字段，所有行按新增处理");
        }

        let identity_text = mapped
            .identity
            .as_ref()
            .and_then(|v| v.identity_key())
            .unwrap_or_default();

        match (self.policy.mode, existing) {
            (ImportMode::CreateOnly | ImportMode::ReplaceAll, Some(record)) => {
                let message = format!("{} 已存在", identity_text);
                if self.policy.skip_duplicates {
                    self.warning(row_number, sheet, None, ErrorKind::DuplicateData, format!("{}，已跳过", message));
                    RowResult::Skipped(Some(record.id))
                } else {
                    self.error(row_number, sheet, None, ErrorKind::DuplicateData, message);
                    RowResult::Failed
                }
            }
            (ImportMode::UpdateOnly, None) => {
                self.warning(
                    row_number,
                    sheet,
                    None,
                    ErrorKind::DuplicateData,
                    format!("{} 不存在，已跳过", identity_text),
                );
                RowResult::Skipped(None)
            }
            (_, Some(mut record)) => {
                apply_values(&mut record, mapped.values);
                let id = record.id;
                match self.store.save_object(record) {
                    Ok(()) => RowResult::Updated(id),
                    Err(e) => {
                        self.error(row_number, sheet, None, ErrorKind::SystemError, format!("更新失败: {}", e));
                        RowResult::Failed
                    }
                }
            }
            (_, None) => match self.create_record(&config.type_name, mapped.values) {
                Ok(id) => RowResult::Created(id),
                Err(e) => {
                    self.error(row_number, sheet, None, ErrorKind::SystemError, format!("新增失败: {}", e));
                    RowResult::Failed
                }
            },
        }
    }

    fn create_record(&mut self, type_name: &str, values: Vec<(String, FieldValue)>) -> StoreResult<RecordId> {
        let mut record = self.store.create_object(type_name)?;
        apply_values(&mut record, values);
        let id = record.id;
        self.store.save_object(record)?;
        Ok(id)
    }

    /// 统计并检查终止条件
    pub(crate) fn finish_row(&mut self, result: RowResult) {
        match result {
            RowResult::Created(_) => {
                self.outcome.created += 1;
                self.outcome.success_count += 1;
            }
            RowResult::Updated(_) => {
                self.outcome.updated += 1;
                self.outcome.success_count += 1;
            }
            RowResult::Skipped(_) => self.outcome.skipped += 1,
            RowResult::Failed => self.outcome.failure_count += 1,
        }

        self.processed += 1;
        if self.processed % self.policy.progress_interval == 0 {
            info!(
                processed = self.processed,
                success = self.outcome.success_count,
                failed = self.outcome.failure_count,
                "导入进度"
            );
        }

        if result == RowResult::Failed && self.policy.validation_mode == ValidationMode::Strict {
            warn!(processed = self.processed, "严格模式下出现失败行，终止导入");
            self.outcome.aborted = true;
        }
        if let Some(max) = self.policy.max_errors {
            if self.outcome.failure_count >= max {
                warn!(failed = self.outcome.failure_count, max_errors = max, "失败行数达到上限，终止导入");
                self.outcome.aborted = true;
            }
        }
    }

    // ==========================================
    // 辅助
    // ==========================================

    /// 取字段对应的单元格
    ///
    /// 有表头时按列名（忽略大小写）取；无表头时按主表导出列的顺序取。
    /// 显式列序号只参与导出排序，两种情况下读写位置一致
    pub(crate) fn cell<'r>(&self, config: &TypeConfiguration, row: &'r RowRecord, field: &FieldConfiguration) -> &'r str {
        if !self.policy.has_header {
            return config
                .main_sheet_fields()
                .position(|f| f.property == field.property)
                .map(|index| row.get_at(index))
                .unwrap_or("");
        }

        let column = field.column();
        if let Some(value) = row.values.get(column) {
            return value;
        }
        row.values
            .iter()
            .find(|(header, _)| header.trim().eq_ignore_ascii_case(column.trim()))
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    /// 记录的标识文本（用于明细关联）
    pub(crate) fn identity_key_of(&self, config: &TypeConfiguration, id: RecordId) -> Option<String> {
        let identity = config.identity()?;
        let record = self.store.get_object(id).ok()??;
        record.get(&identity.property).identity_key()
    }

    pub(crate) fn error(
        &mut self,
        row_number: usize,
        sheet: &str,
        field: Option<&str>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) {
        let message = message.into();
        debug!(row_number = row_number, sheet = %sheet, kind = %kind, message = %message, "行错误");
        let mut entry = ImportMessage::new(row_number, kind, message).with_sheet(Some(sheet));
        if let Some(field) = field {
            entry = entry.with_field(field);
        }
        self.outcome.record_error(entry);
    }

    pub(crate) fn warning(
        &mut self,
        row_number: usize,
        sheet: &str,
        field: Option<&str>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) {
        let mut entry = ImportMessage::new(row_number, kind, message).with_sheet(Some(sheet));
        if let Some(field) = field {
            entry = entry.with_field(field);
        }
        self.outcome.record_warning(entry);
    }
}

pub(crate) fn apply_values(record: &mut Record, values: Vec<(String, FieldValue)>) {
    for (property, value) in values {
        record.set(property, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::SheetRows;
    use crate::importer::file_parser::ParsedDocument;
    use crate::repository::memory_store::InMemoryObjectStore;
    use crate::schema::type_config::TypeDescriptor;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                TypeDescriptor::new("Employee")
                    .field(FieldConfiguration::new("code", ValueKind::Text).column_name("工号").unique().required())
                    .field(FieldConfiguration::new("name", ValueKind::Text).column_name("姓名"))
                    .field(FieldConfiguration::new("age", ValueKind::Integer).column_name("年龄").nullable()),
            )
            .unwrap();
        registry
    }

    fn parsed(rows: &[(&str, &str, &str)]) -> ParsedFile {
        let headers = vec!["工号".to_string(), "姓名".to_string(), "年龄".to_string()];
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, (code, name, age))| {
                let mut row = RowRecord::new(i + 2);
                row.values.insert("工号".to_string(), code.to_string());
                row.values.insert("姓名".to_string(), name.to_string());
                row.values.insert("年龄".to_string(), age.to_string());
                row
            })
            .collect();

        ParsedFile {
            document: ParsedDocument::SingleTable(SheetRows {
                name: "Sheet1".to_string(),
                headers,
                rows,
            }),
            encoding: None,
            row_errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn run(store: &mut InMemoryObjectStore, options: ImportOptions, file: &ParsedFile) -> ImportOutcome {
        let registry = registry();
        let settings = ExchangeSettings::default();
        let converters = ConverterRegistry::new();
        let config = registry.get("Employee").unwrap();
        let policy = ReconcilePolicy::resolve(&config, &options, &settings);

        ImportReconciler::new(&registry, &settings, &converters, store, policy)
            .run(&config, file)
            .unwrap()
    }

    #[test]
    fn test_create_only_skips_duplicate_in_same_file() {
        let mut store = InMemoryObjectStore::new();
        let outcome = run(
            &mut store,
            ImportOptions::with_mode(ImportMode::CreateOnly),
            &parsed(&[("E100", "张三", "30"), ("E100", "张三丰", "31")]),
        );

        assert_eq!(outcome.total_rows, 2);
        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.warnings[0].kind, ErrorKind::DuplicateData);
    }

    #[test]
    fn test_duplicates_become_errors_when_not_skipped() {
        let mut store = InMemoryObjectStore::new();
        let options = ImportOptions {
            skip_duplicates: false,
            ..ImportOptions::with_mode(ImportMode::CreateOnly)
        };
        let outcome = run(&mut store, options, &parsed(&[("E100", "张三", ""), ("E100", "李四", "")]));

        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.failure_count, 1);
        assert_eq!(outcome.errors[0].kind, ErrorKind::DuplicateData);
    }

    #[test]
    fn test_upsert_updates_existing() {
        let mut store = InMemoryObjectStore::new();
        store.seed(
            Record::new("Employee")
                .with("code", FieldValue::Text("E100".to_string()))
                .with("name", FieldValue::Text("旧名".to_string())),
        );

        let outcome = run(&mut store, ImportOptions::default(), &parsed(&[("E100", "张三", "30")]));
        assert_eq!(outcome.updated, 1);

        let records = store.get_objects("Employee", &Criteria::All).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("name"), &FieldValue::Text("张三".to_string()));
        assert_eq!(records[0].get("age"), &FieldValue::Integer(30));
    }

    #[test]
    fn test_strict_mode_aborts_on_first_failure() {
        let mut store = InMemoryObjectStore::new();
        let options = ImportOptions {
            validation_mode: Some(ValidationMode::Strict),
            ..ImportOptions::default()
        };
        let outcome = run(
            &mut store,
            options,
            &parsed(&[("E100", "张三", "abc"), ("E101", "李四", "20")]),
        );

        assert!(outcome.aborted);
        assert_eq!(outcome.total_rows, 1);
        assert_eq!(outcome.failure_count, 1);
        assert_eq!(outcome.errors[0].kind, ErrorKind::DataTypeConversion);
    }

    #[test]
    fn test_strict_mode_aborts_on_malformed_row() {
        let mut store = InMemoryObjectStore::new();
        let mut file = parsed(&[("E100", "张三", "30"), ("E101", "李四", "20")]);
        file.row_errors
            .push(ImportMessage::new(3, ErrorKind::ParseError, "列数与表头不一致"));

        let options = ImportOptions {
            validation_mode: Some(ValidationMode::Strict),
            ..ImportOptions::default()
        };
        let outcome = run(&mut store, options, &file);

        assert!(outcome.aborted);
        assert_eq!(outcome.failure_count, 1);
        assert_eq!(outcome.success_count, 0);
        assert_eq!(outcome.errors[0].kind, ErrorKind::ParseError);
        assert!(store.get_objects("Employee", &Criteria::All).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_rows_count_towards_max_errors() {
        let mut store = InMemoryObjectStore::new();
        let mut file = parsed(&[("E100", "张三", "30")]);
        for row in [3, 4] {
            file.row_errors
                .push(ImportMessage::new(row, ErrorKind::ParseError, "引号未闭合"));
        }

        let options = ImportOptions {
            max_error_count: Some(2),
            ..ImportOptions::default()
        };
        let outcome = run(&mut store, options, &file);

        assert!(outcome.aborted);
        assert_eq!(outcome.failure_count, 2);
        assert_eq!(outcome.total_rows, 2);
    }

    #[test]
    fn test_header_lookup_ignores_column_index() {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                TypeDescriptor::new("Employee")
                    .field(FieldConfiguration::new("code", ValueKind::Text).column_name("工号").unique().index(0))
                    .field(FieldConfiguration::new("name", ValueKind::Text).column_name("姓名").index(1))
                    .field(FieldConfiguration::new("remark", ValueKind::Text).column_name("备注")),
            )
            .unwrap();
        let config = registry.get("Employee").unwrap();
        let order: Vec<&str> = config.main_sheet_fields().map(|f| f.column()).collect();
        assert_eq!(order, vec!["备注", "工号", "姓名"]);

        let settings = ExchangeSettings::default();
        let converters = ConverterRegistry::new();
        let name = config.field("name").unwrap();

        // 表头顺序与列序号不一致时按列名取
        let mut row = RowRecord::new(2);
        row.values.insert("备注".to_string(), "note".to_string());
        row.values.insert("工号".to_string(), "E1".to_string());
        row.values.insert("姓名".to_string(), "Alice".to_string());
        {
            let mut store = InMemoryObjectStore::new();
            let policy = ReconcilePolicy::resolve(&config, &ImportOptions::default(), &settings);
            let reconciler = ImportReconciler::new(&registry, &settings, &converters, &mut store, policy);
            assert_eq!(reconciler.cell(&config, &row, name), "Alice");
        }

        // 无表头时按导出列顺序取
        let options = ImportOptions {
            has_header_row: false,
            ..ImportOptions::default()
        };
        let mut positional = RowRecord::new(1);
        for (i, value) in ["note", "E1", "Alice"].iter().enumerate() {
            positional.values.insert(format!("Column{}", i + 1), value.to_string());
        }
        let mut store = InMemoryObjectStore::new();
        let policy = ReconcilePolicy::resolve(&config, &options, &settings);
        let reconciler = ImportReconciler::new(&registry, &settings, &converters, &mut store, policy);
        assert_eq!(reconciler.cell(&config, &positional, name), "Alice");
    }

    #[test]
    fn test_max_error_count_stops_processing() {
        let mut store = InMemoryObjectStore::new();
        let options = ImportOptions {
            max_error_count: Some(2),
            ..ImportOptions::default()
        };
        let outcome = run(
            &mut store,
            options,
            &parsed(&[("", "a", ""), ("", "b", ""), ("E102", "c", "")]),
        );

        assert!(outcome.aborted);
        assert_eq!(outcome.failure_count, 2);
        assert_eq!(outcome.success_count, 0);
        assert_eq!(outcome.errors[0].kind, ErrorKind::RequiredFieldEmpty);
    }
}
