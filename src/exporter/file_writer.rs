// ==========================================
// 表格数据交换引擎 - 文件写出
// ==========================================
// CSV: 只写主表；按 ExportOptions 的编码与 BOM 设置编码
// XLSX: 每个 TabularSheet 一个工作表，表头加粗
// 工作表名: 最长 31 字符，去掉 []:*?/\，重名追加序号
// ==========================================

use crate::config::options::ExportOptions;
use crate::domain::types::ExportFormat;
use crate::error::{ExchangeError, ExchangeResult};
use crate::exporter::export_composer::{TabularDocument, TabularSheet};
use crate::importer::encoding_detector::encode;
use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashSet;
use tracing::{debug, warn};

const MAX_SHEET_NAME_CHARS: usize = 31;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// 按导出格式写出字节
pub fn write_document(document: &TabularDocument, options: &ExportOptions) -> ExchangeResult<Vec<u8>> {
    match options.format {
        ExportFormat::Csv => {
            let Some(main) = document.main_sheet() else {
                return Err(ExchangeError::InternalError("导出文档没有工作表".to_string()));
            };
            if document.sheets.len() > 1 {
                warn!(dropped = document.sheets.len() - 1, "CSV 只写出主表，明细表已忽略");
            }
            write_csv(main, options)
        }
        ExportFormat::Xlsx => write_xlsx(document, options),
    }
}

pub fn write_csv(sheet: &TabularSheet, options: &ExportOptions) -> ExchangeResult<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    if options.include_headers {
        writer.write_record(&sheet.headers)?;
    }
    for row in &sheet.rows {
        writer.write_record(row)?;
    }

    let buffer = writer
        .into_inner()
        .map_err(|e| ExchangeError::CsvParseError(e.to_string()))?;
    let text = String::from_utf8(buffer).map_err(|e| ExchangeError::InternalError(e.to_string()))?;

    let bytes = encode(&text, options.encoding, options.include_bom)?;
    debug!(
        rows = sheet.rows.len(),
        encoding = %options.encoding,
        bytes = bytes.len(),
        "CSV 写出完成"
    );
    Ok(bytes)
}

pub fn write_xlsx(document: &TabularDocument, options: &ExportOptions) -> ExchangeResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let mut used_names = HashSet::new();

    for (index, sheet) in document.sheets.iter().enumerate() {
        let name = sanitize_sheet_name(&sheet.name, index, &mut used_names);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;

        let mut row_index: u32 = 0;
        if options.include_headers {
            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string_with_format(0, column(col)?, header, &header_format)?;
            }
            row_index = 1;
        }

        for row in &sheet.rows {
            for (col, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    worksheet.write_string(row_index, column(col)?, value)?;
                }
            }
            row_index += 1;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(sheets = document.sheets.len(), bytes = bytes.len(), "XLSX 写出完成");
    Ok(bytes)
}

fn column(index: usize) -> ExchangeResult<u16> {
    u16::try_from(index).map_err(|_| ExchangeError::XlsxWriteError(format!("列数超出上限: {}", index)))
}

/// 去掉非法字符并截断到 31 个字符（不去重）
///
/// 导入时按同一规则定位写出后的明细表
pub fn clean_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !INVALID_SHEET_CHARS.contains(c))
        .collect();
    cleaned
        .trim()
        .trim_matches('\'')
        .trim()
        .chars()
        .take(MAX_SHEET_NAME_CHARS)
        .collect()
}

/// 生成合法且不重复的工作表名
pub fn sanitize_sheet_name(name: &str, index: usize, used: &mut HashSet<String>) -> String {
    let cleaned = clean_sheet_name(name);
    let base: String = if cleaned.is_empty() {
        format!("Sheet{}", index + 1)
    } else {
        cleaned
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!("({})", n);
        let keep = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.chars().count());
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }

    used.insert(candidate.to_lowercase());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::encoding_detector::TextEncoding;
    use calamine::{open_workbook_auto_from_rs, Reader};
    use std::io::Cursor;

    fn sheet(name: &str) -> TabularSheet {
        TabularSheet {
            name: name.to_string(),
            headers: vec!["工号".to_string(), "备注".to_string()],
            rows: vec![
                vec!["E100".to_string(), "含逗号, 以及\"引号\"".to_string()],
                vec!["E101".to_string(), String::new()],
            ],
        }
    }

    #[test]
    fn test_csv_quoting_and_bom() {
        let bytes = write_csv(&sheet("员工"), &ExportOptions::csv()).unwrap();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));

        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text, "工号,备注\nE100,\"含逗号, 以及\"\"引号\"\"\"\nE101,\n");
    }

    #[test]
    fn test_csv_utf16_without_headers() {
        let options = ExportOptions {
            include_headers: false,
            encoding: TextEncoding::Utf16Be,
            ..ExportOptions::csv()
        };
        let bytes = write_csv(&sheet("员工"), &options).unwrap();
        assert!(bytes.starts_with(&[0xFE, 0xFF]));
        assert_eq!(&bytes[2..4], &[0x00, b'E']);
    }

    #[test]
    fn test_xlsx_multi_sheet() {
        let document = TabularDocument {
            sheets: vec![sheet("员工"), sheet("技能:明细")],
        };
        let bytes = write_xlsx(&document, &ExportOptions::xlsx()).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["员工".to_string(), "技能明细".to_string()]);

        let range = workbook.worksheet_range("员工").unwrap();
        assert_eq!(range.get_value((1, 0)).map(|c| c.to_string()), Some("E100".to_string()));
    }

    #[test]
    fn test_sanitize_sheet_name() {
        let mut used = HashSet::new();
        assert_eq!(sanitize_sheet_name("a/b?c", 0, &mut used), "abc");
        assert_eq!(sanitize_sheet_name("ABC", 1, &mut used), "ABC(2)");
        assert_eq!(sanitize_sheet_name("  ", 2, &mut used), "Sheet3");

        let long = "x".repeat(40);
        assert_eq!(sanitize_sheet_name(&long, 3, &mut used).chars().count(), 31);
    }
}
