// ==========================================
// 表格数据交换引擎 - 文本编码探测
// ==========================================
// 职责: 推断 CSV 原始字节的文本编码，并按探测结果解码
// 优先级:
//   1. BOM 扫描（置信度 100）
//   2. 严格 UTF-8 校验（含多字节序列时，置信度 95）
//   3. 候选编码逐一解码打分，CJK 占比 > 5% 直接采用
//   4. 非 UTF-8 候选零替换字符而 UTF-8 有替换时采用（置信度 60）
//   5. UTF-8 结构校验（有效字节 ≥ 80% 且非法序列 < 10%）
//   6. 兜底: 有效字节 ≥ 50% 取 UTF-8，否则平台默认编码（置信度 30）
// 红线: 探测永不失败，只降低置信度
// ==========================================

use crate::config::settings::ExchangeSettings;
use crate::error::{ExchangeError, ExchangeResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// 默认采样窗口（字节）
pub const DEFAULT_SAMPLE_BYTES: usize = 8 * 1024;

const CJK_RATIO_THRESHOLD: f64 = 0.05;
const UTF8_STRICT_CONFIDENCE: u8 = 95;
const CLEAN_DECODE_CONFIDENCE: u8 = 60;
const FALLBACK_CONFIDENCE: u8 = 30;

// ==========================================
// TextEncoding - 支持的文本编码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    Gbk, // GB2312 按 GBK 解码
    Gb18030,
    Big5,
    Windows1252,
}

impl TextEncoding {
    /// 平台默认编码（Windows 为 GBK，其余为 UTF-8）
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            TextEncoding::Gbk
        } else {
            TextEncoding::Utf8
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Utf32Le => "UTF-32LE",
            TextEncoding::Utf32Be => "UTF-32BE",
            TextEncoding::Gbk => "GBK",
            TextEncoding::Gb18030 => "GB18030",
            TextEncoding::Big5 => "Big5",
            TextEncoding::Windows1252 => "Windows-1252",
        }
    }

    /// 该编码的字节序标记
    pub fn bom(&self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            TextEncoding::Utf16Le => &[0xFF, 0xFE],
            TextEncoding::Utf16Be => &[0xFE, 0xFF],
            TextEncoding::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            TextEncoding::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
            _ => &[],
        }
    }

    /// encoding_rs 中对应的编码（UTF-32 不在其支持范围内）
    fn codec(&self) -> Option<&'static encoding_rs::Encoding> {
        match self {
            TextEncoding::Utf8 => Some(encoding_rs::UTF_8),
            TextEncoding::Utf16Le => Some(encoding_rs::UTF_16LE),
            TextEncoding::Utf16Be => Some(encoding_rs::UTF_16BE),
            TextEncoding::Gbk => Some(encoding_rs::GBK),
            TextEncoding::Gb18030 => Some(encoding_rs::GB18030),
            TextEncoding::Big5 => Some(encoding_rs::BIG5),
            TextEncoding::Windows1252 => Some(encoding_rs::WINDOWS_1252),
            TextEncoding::Utf32Le | TextEncoding::Utf32Be => None,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(&['_', ' '][..], "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-16le" | "utf-16-le" | "utf-16" | "unicode" => Ok(TextEncoding::Utf16Le),
            "utf-16be" | "utf-16-be" => Ok(TextEncoding::Utf16Be),
            "utf-32le" | "utf-32-le" | "utf-32" => Ok(TextEncoding::Utf32Le),
            "utf-32be" | "utf-32-be" => Ok(TextEncoding::Utf32Be),
            "gbk" | "gb2312" | "cp936" => Ok(TextEncoding::Gbk),
            "gb18030" => Ok(TextEncoding::Gb18030),
            "big5" | "cp950" => Ok(TextEncoding::Big5),
            "windows-1252" | "cp1252" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Windows1252),
            other => Err(format!("不支持的文本编码: {}", other)),
        }
    }
}

// ==========================================
// EncodingDetectionResult - 探测结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingDetectionResult {
    pub encoding: TextEncoding,
    pub confidence: u8,        // 0-100
    pub method: String,        // 采用的探测手段
    pub bom_length: usize,     // 解码时需跳过的 BOM 字节数
    pub trials: Vec<String>,   // 按顺序记录的尝试日志
}

impl EncodingDetectionResult {
    fn new(encoding: TextEncoding, confidence: u8, method: &str, trials: Vec<String>) -> Self {
        Self {
            encoding,
            confidence,
            method: method.to_string(),
            bom_length: 0,
            trials,
        }
    }
}

/// 单个候选编码的打分
#[derive(Debug, Clone)]
struct CandidateScore {
    encoding: TextEncoding,
    score: i64,
    replacements: usize,
    cjk: usize,
    chars: usize,
}

// ==========================================
// EncodingDetector
// ==========================================
#[derive(Debug, Clone)]
pub struct EncodingDetector {
    sample_bytes: usize,
    platform_default: TextEncoding,
}

impl Default for EncodingDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_BYTES, TextEncoding::platform_default())
    }
}

impl EncodingDetector {
    pub fn new(sample_bytes: usize, platform_default: TextEncoding) -> Self {
        Self {
            sample_bytes: sample_bytes.max(4),
            platform_default,
        }
    }

    pub fn from_settings(settings: &ExchangeSettings) -> Self {
        Self::new(
            settings.encoding_sample_bytes,
            settings.platform_default_encoding,
        )
    }

    /// 探测字节流的文本编码
    ///
    /// # 参数
    /// - bytes: 原始字节（只取前 sample_bytes 字节参与探测）
    ///
    /// # 返回
    /// - EncodingDetectionResult（永不失败）
    pub fn detect(&self, bytes: &[u8]) -> EncodingDetectionResult {
        let mut trials = Vec::new();

        if bytes.is_empty() {
            trials.push("空数据: 使用 UTF-8".to_string());
            return EncodingDetectionResult::new(TextEncoding::Utf8, 50, "空数据", trials);
        }

        // 1. BOM 扫描
        if let Some(encoding) = detect_bom(bytes) {
            trials.push(format!("BOM: 识别为 {}", encoding));
            let mut result = EncodingDetectionResult::new(encoding, 100, "BOM", trials);
            result.bom_length = encoding.bom().len();
            return result;
        }
        trials.push("BOM: 未发现".to_string());

        let truncated = bytes.len() > self.sample_bytes;
        let sample = &bytes[..bytes.len().min(self.sample_bytes)];

        // 2. 严格 UTF-8
        let has_multibyte = sample.iter().any(|b| *b >= 0x80);
        if has_multibyte && is_strict_utf8(sample, truncated) {
            trials.push("严格 UTF-8 校验: 通过".to_string());
            return EncodingDetectionResult::new(
                TextEncoding::Utf8,
                UTF8_STRICT_CONFIDENCE,
                "严格 UTF-8 校验",
                trials,
            );
        }

        // 3. 候选编码打分
        let scores: Vec<CandidateScore> = self
            .candidates()
            .into_iter()
            .map(|encoding| score_candidate(sample, encoding))
            .collect();

        for s in &scores {
            trials.push(format!(
                "{}: 得分={} 替换字符={} CJK={} 字符数={}",
                s.encoding, s.score, s.replacements, s.cjk, s.chars
            ));
        }

        // 同分保留靠前的候选
        let best = scores
            .iter()
            .fold(None::<&CandidateScore>, |acc, s| match acc {
                Some(b) if b.score >= s.score => Some(b),
                _ => Some(s),
            });

        if let Some(best) = best {
            let ratio = if best.chars == 0 {
                0.0
            } else {
                best.cjk as f64 / best.chars as f64
            };
            if ratio > CJK_RATIO_THRESHOLD {
                let confidence = (ratio * 100.0).round().clamp(1.0, 100.0) as u8;
                trials.push(format!("CJK 占比 {:.1}% 超过阈值: 采用 {}", ratio * 100.0, best.encoding));
                return EncodingDetectionResult::new(best.encoding, confidence, "CJK 字符占比", trials);
            }

            // 4. 零替换的非 UTF-8 候选
            let utf8_replacements = scores
                .iter()
                .find(|s| s.encoding == TextEncoding::Utf8)
                .map(|s| s.replacements)
                .unwrap_or(0);
            if best.encoding != TextEncoding::Utf8 && best.replacements == 0 && utf8_replacements > 0
            {
                trials.push(format!("{} 解码无替换字符而 UTF-8 有 {} 处", best.encoding, utf8_replacements));
                return EncodingDetectionResult::new(
                    best.encoding,
                    CLEAN_DECODE_CONFIDENCE,
                    "无替换字符解码",
                    trials,
                );
            }
        }

        // 5. UTF-8 结构校验
        let structure = utf8_structure(sample, truncated);
        trials.push(format!(
            "UTF-8 结构校验: 有效字节占比 {:.1}% 非法序列 {}",
            structure.valid_ratio * 100.0,
            structure.invalid_sequences
        ));
        let confidence = (structure.valid_ratio * 100.0).round() as u8;
        if structure.valid_ratio >= 0.8
            && (structure.invalid_sequences as f64) < sample.len() as f64 * 0.1
        {
            return EncodingDetectionResult::new(TextEncoding::Utf8, confidence, "UTF-8 结构校验", trials);
        }

        // 6. 兜底
        if structure.valid_ratio >= 0.5 {
            trials.push("兜底: 有效字节过半，采用 UTF-8".to_string());
            return EncodingDetectionResult::new(TextEncoding::Utf8, confidence, "UTF-8 宽松接受", trials);
        }

        trials.push(format!("兜底: 采用平台默认编码 {}", self.platform_default));
        debug!(encoding = %self.platform_default, "编码探测退回平台默认编码");
        EncodingDetectionResult::new(self.platform_default, FALLBACK_CONFIDENCE, "平台默认编码", trials)
    }

    /// 候选列表（去重，保持顺序）
    fn candidates(&self) -> Vec<TextEncoding> {
        let mut list = vec![
            TextEncoding::Utf8,
            TextEncoding::Gbk,
            TextEncoding::Gb18030,
            TextEncoding::Big5,
            TextEncoding::Windows1252,
        ];
        if !list.contains(&self.platform_default) && self.platform_default.codec().is_some() {
            list.push(self.platform_default);
        }
        list
    }
}

// ==========================================
// 解码
// ==========================================

/// 按指定编码解码（存在对应 BOM 时跳过）
///
/// # 返回
/// - (文本, 是否出现无法解码的字节)
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> (String, bool) {
    let bom = encoding.bom();
    let body = if !bom.is_empty() && bytes.starts_with(bom) {
        &bytes[bom.len()..]
    } else {
        bytes
    };

    match encoding.codec() {
        Some(codec) => {
            let (text, had_errors) = codec.decode_without_bom_handling(body);
            (text.into_owned(), had_errors)
        }
        None => decode_utf32(body, encoding == TextEncoding::Utf32Be),
    }
}

/// 按指定编码编码文本（导出 CSV 用）
///
/// UTF-16/32 总是写 BOM；UTF-8 由 include_bom 决定；其余编码没有 BOM
///
/// # 返回
/// - Err(EncodingError): 文本含目标编码无法表示的字符
pub fn encode(text: &str, encoding: TextEncoding, include_bom: bool) -> ExchangeResult<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() + 4);

    match encoding {
        TextEncoding::Utf8 => {
            if include_bom {
                out.extend_from_slice(encoding.bom());
            }
            out.extend_from_slice(text.as_bytes());
        }
        // encoding_rs 的 UTF-16 编码输出为 UTF-8，这里手工编码
        TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
            out.extend_from_slice(encoding.bom());
            for unit in text.encode_utf16() {
                let bytes = if encoding == TextEncoding::Utf16Be {
                    unit.to_be_bytes()
                } else {
                    unit.to_le_bytes()
                };
                out.extend_from_slice(&bytes);
            }
        }
        TextEncoding::Utf32Le | TextEncoding::Utf32Be => {
            out.extend_from_slice(encoding.bom());
            for c in text.chars() {
                let bytes = if encoding == TextEncoding::Utf32Be {
                    (c as u32).to_be_bytes()
                } else {
                    (c as u32).to_le_bytes()
                };
                out.extend_from_slice(&bytes);
            }
        }
        _ => {
            let Some(codec) = encoding.codec() else {
                return Err(ExchangeError::EncodingError {
                    encoding: encoding.to_string(),
                    message: "不支持的编码".to_string(),
                });
            };
            let (bytes, _, had_unmappable) = codec.encode(text);
            if had_unmappable {
                return Err(ExchangeError::EncodingError {
                    encoding: encoding.to_string(),
                    message: "文本包含该编码无法表示的字符".to_string(),
                });
            }
            out.extend_from_slice(&bytes);
        }
    }

    Ok(out)
}

fn decode_utf32(body: &[u8], big_endian: bool) -> (String, bool) {
    let mut text = String::with_capacity(body.len() / 4);
    let mut had_errors = false;

    for chunk in body.chunks(4) {
        if chunk.len() < 4 {
            text.push(char::REPLACEMENT_CHARACTER);
            had_errors = true;
            break;
        }
        let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let code = if big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        };
        match char::from_u32(code) {
            Some(c) => text.push(c),
            None => {
                text.push(char::REPLACEMENT_CHARACTER);
                had_errors = true;
            }
        }
    }

    (text, had_errors)
}

// ==========================================
// 内部工具
// ==========================================

fn detect_bom(bytes: &[u8]) -> Option<TextEncoding> {
    // UTF-32LE 的 BOM 以 UTF-16LE 的 BOM 开头，需先判断
    [
        TextEncoding::Utf32Le,
        TextEncoding::Utf32Be,
        TextEncoding::Utf8,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
    ]
    .into_iter()
    .find(|enc| bytes.starts_with(enc.bom()))
}

/// 严格 UTF-8 校验；采样截断处的不完整序列不计为错误
fn is_strict_utf8(sample: &[u8], truncated: bool) -> bool {
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        Err(e) => truncated && e.error_len().is_none(),
    }
}

fn score_candidate(sample: &[u8], encoding: TextEncoding) -> CandidateScore {
    let text: Cow<'_, str> = match encoding.codec() {
        Some(codec) => codec.decode_without_bom_handling(sample).0,
        None => Cow::Owned(decode(sample, encoding).0),
    };

    let mut replacements = 0usize;
    let mut cjk = 0usize;
    let mut ascii = 0usize;
    let mut chars = 0usize;

    for c in text.chars() {
        chars += 1;
        if c == char::REPLACEMENT_CHARACTER || is_private_use(c) {
            replacements += 1;
        } else if is_cjk(c) {
            cjk += 1;
        } else if (' '..='~').contains(&c) {
            ascii += 1;
        }
    }

    CandidateScore {
        encoding,
        score: -100 * replacements as i64 + 10 * cjk as i64 + ascii as i64,
        replacements,
        cjk,
        chars,
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3000}'..='\u{303F}'
        | '\u{FF00}'..='\u{FFEF}')
}

fn is_private_use(c: char) -> bool {
    ('\u{E000}'..='\u{F8FF}').contains(&c)
}

struct Utf8Structure {
    valid_ratio: f64,
    invalid_sequences: usize,
}

/// 按字节遍历校验 UTF-8 续字节（10xxxxxx）模式
fn utf8_structure(sample: &[u8], truncated: bool) -> Utf8Structure {
    let len = sample.len();
    let mut valid = 0usize;
    let mut invalid_sequences = 0usize;
    let mut i = 0usize;

    while i < len {
        let lead = sample[i];
        let continuation = if lead < 0x80 {
            0
        } else if lead & 0xE0 == 0xC0 {
            1
        } else if lead & 0xF0 == 0xE0 {
            2
        } else if lead & 0xF8 == 0xF0 {
            3
        } else {
            invalid_sequences += 1;
            i += 1;
            continue;
        };

        if i + continuation >= len && continuation > 0 {
            // 采样窗口截断了最后一个序列
            if truncated {
                valid += len - i;
            } else {
                invalid_sequences += 1;
            }
            break;
        }

        let ok = sample[i + 1..=i + continuation]
            .iter()
            .all(|b| b & 0xC0 == 0x80);
        if ok {
            valid += continuation + 1;
            i += continuation + 1;
        } else {
            invalid_sequences += 1;
            i += 1;
        }
    }

    Utf8Structure {
        valid_ratio: if len == 0 { 1.0 } else { valid as f64 / len as f64 },
        invalid_sequences,
    }
}
