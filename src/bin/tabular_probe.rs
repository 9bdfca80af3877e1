// Small dev utility: inspect a CSV/XLSX file the way the importer sees it.
//
// Usage:
//   cargo run --bin tabular_probe -- detect <file>
//   cargo run --bin tabular_probe -- preview <file> [rows]
//
// Nothing is written; no type configuration is needed.
// TABULAR_LOG_FORMAT=json switches logs to JSON lines.

use tabular_exchange::importer::{EncodingDetector, FileParser, ParseOptions, UniversalFileParser};
use tabular_exchange::logging;

const DEFAULT_PREVIEW_ROWS: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match std::env::var("TABULAR_LOG_FORMAT").as_deref() {
        Ok("json") => logging::init_json(),
        _ => logging::init(),
    }

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();
    let path = args.next().ok_or("usage: tabular_probe <detect|preview> <file> [rows]")?;
    let bytes = std::fs::read(&path)?;

    match command.as_str() {
        "detect" => {
            if UniversalFileParser::is_spreadsheet(&bytes) {
                println!("format=spreadsheet");
                return Ok(());
            }
            let result = EncodingDetector::default().detect(&bytes);
            println!(
                "encoding={} confidence={} method={} bom={}",
                result.encoding, result.confidence, result.method, result.bom_length
            );
            for trial in &result.trials {
                println!("  {}", trial);
            }
        }
        "preview" => {
            let limit = args
                .next()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(DEFAULT_PREVIEW_ROWS);

            let parser = UniversalFileParser::default();
            let parsed = parser.parse(&bytes, &ParseOptions::default())?;
            if let Some(encoding) = &parsed.encoding {
                println!("encoding={}", encoding.encoding);
            }
            for sheet in parsed.document.sheets() {
                println!("[{}] {} rows", sheet.name, sheet.rows.len());
                println!("  {}", sheet.headers.join(" | "));
                for row in sheet.rows.iter().take(limit) {
                    let cells: Vec<&str> = row.values.values().map(String::as_str).collect();
                    println!("  #{} {}", row.row_number, cells.join(" | "));
                }
            }
            for error in &parsed.row_errors {
                println!("row {}: {}", error.row_number, error.message);
            }
        }
        other => return Err(format!("unknown command: {}", other).into()),
    }

    Ok(())
}
