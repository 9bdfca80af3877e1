// ==========================================
// 表格数据交换引擎 - 日期时间容错修正
// ==========================================
// 职责: 识别"年在前"的日期时间文本，修正越界分量
// 规则（带进位）:
//   秒 ≥ 60 -> 进位到分；分 ≥ 60 -> 进位到时；时 ≥ 24 -> 进位到日
//   日 > 当月天数 -> 截到当月最后一天
// 全零日期（0000-00-00）视为缺失
// ==========================================

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub enum DateCorrection {
    /// 非"年-月-日"形式，交给格式解析
    NotApplicable,
    /// 全零哨兵值
    Absent,
    Parsed {
        value: NaiveDateTime,
        has_time: bool,
        adjustments: Vec<String>,
    },
}

fn date_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^(\d{4})[-/.年](\d{1,2})[-/.月](\d{1,2})日?(?:[ T]+(\d{1,2}):(\d{1,2})(?::(\d{1,2}))?(?:\.\d+)?)?$",
            )
            .ok()
        })
        .as_ref()
}

/// 尝试修正日期时间文本
pub fn correct(raw: &str) -> DateCorrection {
    let Some(caps) = date_pattern().and_then(|re| re.captures(raw.trim())) else {
        return DateCorrection::NotApplicable;
    };

    let number = |idx: usize| -> u32 {
        caps.get(idx)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };

    let year = number(1) as i32;
    let month = number(2);
    let mut day = number(3);
    let has_time = caps.get(4).is_some();
    let mut hour = number(4);
    let mut minute = number(5);
    let mut second = number(6);

    if year == 0 {
        return DateCorrection::Absent;
    }
    if !(1..=12).contains(&month) || day == 0 {
        return DateCorrection::NotApplicable;
    }

    let mut adjustments = Vec::new();

    if second >= 60 {
        adjustments.push(format!("秒 {} 越界，进位到分", second));
        minute += second / 60;
        second %= 60;
    }
    if minute >= 60 {
        adjustments.push(format!("分 {} 越界，进位到时", minute));
        hour += minute / 60;
        minute %= 60;
    }
    if hour >= 24 {
        adjustments.push(format!("时 {} 越界，进位到日", hour));
        day += hour / 24;
        hour %= 24;
    }

    let last_day = last_day_of_month(year, month);
    if day > last_day {
        adjustments.push(format!("日 {} 超出 {}-{:02} 的天数，修正为 {}", day, year, month, last_day));
        day = last_day;
    }

    let value = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second));

    match value {
        Some(value) => DateCorrection::Parsed {
            value,
            has_time,
            adjustments,
        },
        None => DateCorrection::NotApplicable,
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrected(raw: &str) -> (String, Vec<String>) {
        match correct(raw) {
            DateCorrection::Parsed {
                value, adjustments, ..
            } => (value.format("%Y-%m-%d %H:%M:%S").to_string(), adjustments),
            other => panic!("expected parsed value, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_day_clamps_to_month_end() {
        let (value, adjustments) = corrected("2023-02-30 09:15:00");
        assert_eq!(value, "2023-02-28 09:15:00");
        assert_eq!(adjustments.len(), 1);

        let (value, _) = corrected("2024-02-31");
        assert_eq!(value, "2024-02-29 00:00:00");
    }

    #[test]
    fn test_seconds_carry_into_minutes() {
        let (value, _) = corrected("2024-01-01 10:00:65");
        assert_eq!(value, "2024-01-01 10:01:05");
    }

    #[test]
    fn test_cascading_carry() {
        let (value, adjustments) = corrected("2024-01-01 23:59:60");
        assert_eq!(value, "2024-01-02 00:00:00");
        assert_eq!(adjustments.len(), 3);
    }

    #[test]
    fn test_valid_value_has_no_adjustments() {
        let (value, adjustments) = corrected("2024/3/5 8:05");
        assert_eq!(value, "2024-03-05 08:05:00");
        assert!(adjustments.is_empty());
    }

    #[test]
    fn test_chinese_separators() {
        let (value, _) = corrected("2024年3月5日");
        assert_eq!(value, "2024-03-05 00:00:00");
    }

    #[test]
    fn test_zero_sentinel_and_unrelated_text() {
        assert_eq!(correct("0000-00-00 00:00:00"), DateCorrection::Absent);
        assert_eq!(correct("05/03/2024"), DateCorrection::NotApplicable);
        assert_eq!(correct("2024-13-01"), DateCorrection::NotApplicable);
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2023, 2), 28);
        assert_eq!(last_day_of_month(2024, 2), 29);
        assert_eq!(last_day_of_month(2024, 12), 31);
    }
}
