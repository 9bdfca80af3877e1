// ==========================================
// 表格数据交换引擎 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls/.ods) / CSV (.csv)
// 列对齐: 按位置，不压缩空列；空表头列以 Column{n} 占位
// 容错: 电子表格解析失败时按 CSV 重新解析；坏行记为 ParseError 不中断
// ==========================================

use crate::domain::outcome::{ImportMessage, RowRecord, SheetRows};
use crate::domain::types::ErrorKind;
use crate::error::{ExchangeError, ExchangeResult};
use crate::importer::encoding_detector::{decode, EncodingDetectionResult, EncodingDetector};
use crate::importer::importer_trait::FileParser;
use crate::schema::type_config::TypeConfiguration;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::NaiveTime;
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tracing::{info, warn};

const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// CSV 单表的默认工作表名
pub const CSV_SHEET_NAME: &str = "Sheet1";

// ==========================================
// ParseOptions - 解析选项
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    pub has_header: bool,
    pub header_row: usize,     // 1 起
    pub data_start_row: usize, // 1 起
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            header_row: 1,
            data_start_row: 2,
        }
    }
}

impl ParseOptions {
    pub fn for_type(config: &TypeConfiguration, has_header: bool) -> Self {
        Self {
            has_header,
            header_row: config.header_row,
            data_start_row: config.data_start_row,
        }
    }

    /// 第一行数据的行号；无表头时从表头行开始即为数据
    fn first_data_row(&self) -> usize {
        if self.has_header {
            self.data_start_row.max(self.header_row + 1)
        } else {
            self.header_row
        }
    }
}

// ==========================================
// 解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    SingleTable(SheetRows),
    MultiSheet(Vec<SheetRows>), // 第一个为主表
}

impl ParsedDocument {
    pub fn sheets(&self) -> &[SheetRows] {
        match self {
            ParsedDocument::SingleTable(sheet) => std::slice::from_ref(sheet),
            ParsedDocument::MultiSheet(sheets) => sheets.as_slice(),
        }
    }

    pub fn main_sheet(&self) -> Option<&SheetRows> {
        self.sheets().first()
    }

    /// 按名称查找工作表（忽略首尾空白与 ASCII 大小写）
    pub fn find_sheet(&self, name: &str) -> Option<&SheetRows> {
        let name = name.trim();
        self.sheets()
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(name))
    }

    pub fn is_multi_sheet(&self) -> bool {
        matches!(self, ParsedDocument::MultiSheet(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub document: ParsedDocument,
    pub encoding: Option<EncodingDetectionResult>, // 仅 CSV
    pub row_errors: Vec<ImportMessage>,
    pub warnings: Vec<ImportMessage>,
}

// ==========================================
// CSV Parser 实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CsvParser {
    detector: EncodingDetector,
}

impl CsvParser {
    pub fn new(detector: EncodingDetector) -> Self {
        Self { detector }
    }
}

impl FileParser for CsvParser {
    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> ExchangeResult<ParsedFile> {
        let detection = self.detector.detect(bytes);
        let (text, had_errors) = decode(bytes, detection.encoding);

        let mut warnings = Vec::new();
        if had_errors {
            warnings.push(ImportMessage::new(
                0,
                ErrorKind::ParseError,
                format!("部分字节无法按 {} 解码，已替换为占位字符", detection.encoding),
            ));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(text.as_bytes());

        let mut raw_rows = Vec::new();
        let mut row_errors = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 1;
            match result {
                Ok(record) => {
                    raw_rows.push((row_number, record.iter().map(|c| c.to_string()).collect()));
                }
                Err(e) => {
                    row_errors.push(ImportMessage::new(
                        row_number,
                        ErrorKind::ParseError,
                        format!("CSV 行解析失败: {}", e),
                    ));
                }
            }
        }

        let sheet = assemble_sheet(CSV_SHEET_NAME, raw_rows, options);
        info!(
            encoding = %detection.encoding,
            confidence = detection.confidence,
            rows = sheet.rows.len(),
            row_errors = row_errors.len(),
            "CSV 解析完成"
        );

        Ok(ParsedFile {
            document: ParsedDocument::SingleTable(sheet),
            encoding: Some(detection),
            row_errors,
            warnings,
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> ExchangeResult<ParsedFile> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ExchangeError::ExcelParseError(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ExchangeError::ExcelParseError("Excel 文件无工作表".to_string()));
        }

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in sheet_names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ExchangeError::ExcelParseError(format!("工作表 {}: {}", name, e)))?;

            // 区域可能不从 A1 开始，按绝对行列号对齐
            let (start_row, start_col) = range.start().unwrap_or((0, 0));
            let mut raw_rows = Vec::with_capacity(range.height());
            for (offset, row) in range.rows().enumerate() {
                let row_number = start_row as usize + offset + 1;
                let mut cells = vec![String::new(); start_col as usize];
                cells.extend(row.iter().map(cell_to_string));
                raw_rows.push((row_number, cells));
            }

            sheets.push(assemble_sheet(&name, raw_rows, options));
        }

        info!(
            sheets = sheets.len(),
            main_rows = sheets.first().map(|s| s.rows.len()).unwrap_or(0),
            "Excel 解析完成"
        );

        let document = if sheets.len() > 1 {
            ParsedDocument::MultiSheet(sheets)
        } else {
            ParsedDocument::SingleTable(sheets.remove(0))
        };

        Ok(ParsedFile {
            document,
            encoding: None,
            row_errors: Vec::new(),
            warnings: Vec::new(),
        })
    }
}

// ==========================================
// 通用文件解析器（根据文件头自动选择）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct UniversalFileParser {
    csv: CsvParser,
    excel: ExcelParser,
}

impl UniversalFileParser {
    pub fn new(detector: EncodingDetector) -> Self {
        Self {
            csv: CsvParser::new(detector),
            excel: ExcelParser,
        }
    }

    /// 文件头是否为电子表格包（zip / OLE）
    pub fn is_spreadsheet(bytes: &[u8]) -> bool {
        bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
    }

    /// 按扩展名检查是否为支持的输入格式
    pub fn check_extension(path: &Path) -> ExchangeResult<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" | "xlsx" | "xlsm" | "xls" | "ods" => Ok(()),
            _ => Err(ExchangeError::UnsupportedFormat(ext)),
        }
    }
}

impl FileParser for UniversalFileParser {
    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> ExchangeResult<ParsedFile> {
        if !Self::is_spreadsheet(bytes) {
            return self.csv.parse(bytes, options);
        }

        match self.excel.parse(bytes, options) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!(error = %e, "电子表格解析失败，改按 CSV 解析");
                let mut parsed = self.csv.parse(bytes, options)?;
                parsed.warnings.insert(
                    0,
                    ImportMessage::new(
                        0,
                        ErrorKind::ParseError,
                        format!("电子表格解析失败，已按 CSV 解析: {}", e),
                    ),
                );
                Ok(parsed)
            }
        }
    }
}

// ==========================================
// 内部工具
// ==========================================

/// 原始行 -> 带表头的行集
fn assemble_sheet(name: &str, raw_rows: Vec<(usize, Vec<String>)>, options: &ParseOptions) -> SheetRows {
    let mut headers = if options.has_header {
        raw_rows
            .iter()
            .find(|(row_number, _)| *row_number == options.header_row)
            .map(|(_, cells)| normalize_headers(cells))
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let first_data_row = options.first_data_row();
    let mut rows = Vec::new();

    for (row_number, cells) in raw_rows {
        if row_number < first_data_row {
            continue;
        }
        // 跳过完全空白的行
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        // 数据比表头宽时补位置列名
        while headers.len() < cells.len() {
            let name = unique_name(&headers, format!("Column{}", headers.len() + 1));
            headers.push(name);
        }

        let mut record = RowRecord::new(row_number);
        for (idx, header) in headers.iter().enumerate() {
            let value = cells.get(idx).map(|c| c.trim().to_string()).unwrap_or_default();
            record.values.insert(header.clone(), value);
        }
        rows.push(record);
    }

    SheetRows {
        name: name.to_string(),
        headers,
        rows,
    }
}

/// 表头清洗：空白列补 Column{n}，重名列追加序号，保证位置不变
fn normalize_headers(cells: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(cells.len());
    for (idx, cell) in cells.iter().enumerate() {
        let trimmed = cell.trim().trim_start_matches('\u{FEFF}');
        let base = if trimmed.is_empty() {
            format!("Column{}", idx + 1)
        } else {
            trimmed.to_string()
        };
        let name = unique_name(&headers, base);
        headers.push(name);
    }
    headers
}

fn unique_name(existing: &[String], base: String) -> String {
    let taken: HashSet<&str> = existing.iter().map(|h| h.as_str()).collect();
    if !taken.contains(base.as_str()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::encoding_detector::TextEncoding;
    use rust_xlsxwriter::Workbook;

    fn utf8_parser() -> UniversalFileParser {
        UniversalFileParser::new(EncodingDetector::new(8192, TextEncoding::Utf8))
    }

    #[test]
    fn test_csv_with_quotes_and_blank_rows() {
        let csv = "工号,姓名,备注\nE100,张三,\"含逗号, 以及 \"\"引号\"\"\"\n,,\nE101,李四,\n";
        let parsed = utf8_parser().parse(csv.as_bytes(), &ParseOptions::default()).unwrap();

        let sheet = parsed.document.main_sheet().unwrap();
        assert_eq!(sheet.headers, vec!["工号", "姓名", "备注"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].get("备注"), "含逗号, 以及 \"引号\"");
        assert_eq!(sheet.rows[0].row_number, 2);
        assert_eq!(sheet.rows[1].row_number, 4);
        assert_eq!(parsed.encoding.unwrap().encoding, TextEncoding::Utf8);
    }

    #[test]
    fn test_csv_blank_and_duplicate_headers_keep_positions() {
        let csv = "工号,,备注,备注\nE100,X,A,B\n";
        let parsed = utf8_parser().parse(csv.as_bytes(), &ParseOptions::default()).unwrap();

        let sheet = parsed.document.main_sheet().unwrap();
        assert_eq!(sheet.headers, vec!["工号", "Column2", "备注", "备注_2"]);
        assert_eq!(sheet.rows[0].get_at(3), "B");
        assert_eq!(sheet.rows[0].get("Column2"), "X");
    }

    #[test]
    fn test_csv_without_header_synthesizes_columns() {
        let options = ParseOptions {
            has_header: false,
            ..ParseOptions::default()
        };
        let parsed = utf8_parser().parse(b"E100,Alice\nE101,Bob,extra\n", &options).unwrap();

        let sheet = parsed.document.main_sheet().unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].get("Column1"), "E100");
        assert_eq!(sheet.rows[1].get("Column3"), "extra");
    }

    #[test]
    fn test_csv_header_and_data_start_rows() {
        let options = ParseOptions {
            has_header: true,
            header_row: 2,
            data_start_row: 4,
        };
        let csv = "员工导出\ncode,name\n说明行,忽略\nE1,Alice\n";
        let parsed = utf8_parser().parse(csv.as_bytes(), &options).unwrap();

        let sheet = parsed.document.main_sheet().unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].get("name"), "Alice");
    }

    #[test]
    fn test_gbk_csv_is_decoded() {
        let (bytes, _, _) = encoding_rs::GBK.encode("工号,姓名,部门\nE100,张三,研发部\nE101,李四,市场部\n");
        let parsed = utf8_parser().parse(&bytes, &ParseOptions::default()).unwrap();

        let sheet = parsed.document.main_sheet().unwrap();
        assert_eq!(sheet.rows[1].get("姓名"), "李四");
        assert_eq!(parsed.encoding.unwrap().encoding, TextEncoding::Gbk);
    }

    #[test]
    fn test_xlsx_sparse_cells_do_not_shift() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "工号").unwrap();
        worksheet.write_string(0, 2, "姓名").unwrap();
        worksheet.write_string(1, 0, "E100").unwrap();
        worksheet.write_string(1, 2, "张三").unwrap();
        worksheet.write_number(2, 0, 42).unwrap();
        worksheet.write_string(2, 2, "李四").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = utf8_parser().parse(&bytes, &ParseOptions::default()).unwrap();
        assert!(!parsed.document.is_multi_sheet());

        let sheet = parsed.document.main_sheet().unwrap();
        assert_eq!(sheet.headers, vec!["工号", "Column2", "姓名"]);
        assert_eq!(sheet.rows[0].get("姓名"), "张三");
        assert_eq!(sheet.rows[1].get("工号"), "42");
    }

    #[test]
    fn test_xlsx_multi_sheet() {
        let mut workbook = Workbook::new();
        let main = workbook.add_worksheet();
        main.set_name("员工").unwrap();
        main.write_string(0, 0, "工号").unwrap();
        main.write_string(1, 0, "E100").unwrap();

        let detail = workbook.add_worksheet();
        detail.set_name("技能明细").unwrap();
        detail.write_string(0, 0, "所属工号").unwrap();
        detail.write_string(0, 1, "技能").unwrap();
        detail.write_string(1, 0, "E100").unwrap();
        detail.write_string(1, 1, "焊接").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = utf8_parser().parse(&bytes, &ParseOptions::default()).unwrap();
        assert!(parsed.document.is_multi_sheet());
        assert_eq!(parsed.document.main_sheet().unwrap().name, "员工");

        let detail = parsed.document.find_sheet("技能明细").unwrap();
        assert_eq!(detail.rows[0].get("技能"), "焊接");
    }

    #[test]
    fn test_broken_package_falls_back_to_csv() {
        let mut bytes = ZIP_MAGIC.to_vec();
        bytes.extend_from_slice(b"garbage\nmore\n");

        let parsed = utf8_parser().parse(&bytes, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.warnings[0].kind, ErrorKind::ParseError);
        assert!(parsed.encoding.is_some());
    }

    #[test]
    fn test_check_extension() {
        assert!(UniversalFileParser::check_extension(Path::new("a.xlsx")).is_ok());
        assert!(UniversalFileParser::check_extension(Path::new("a.CSV")).is_ok());
        assert!(matches!(
            UniversalFileParser::check_extension(Path::new("a.pdf")),
            Err(ExchangeError::UnsupportedFormat(_))
        ));
    }
}
