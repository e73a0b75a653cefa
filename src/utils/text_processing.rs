// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 数值文本处理
//!
//! 页面上的价格和数量以多种格式渲染，例如 `1,234.56`、`3.67 AED`、
//! `12,500.00 USDT`。这里集中处理这些格式的解析和输出格式化。

use once_cell::sync::Lazy;
use regex::Regex;

/// 通用数值记号
static NUMERIC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid numeric token regex"));

/// 第一个由数字、逗号、点组成的片段
static NUMERIC_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d,.]+").expect("valid numeric run regex"));

/// 解析十进制数值
///
/// 去掉首尾空白和千分位逗号后按浮点数解析。
/// 非有限值和负数返回 `None`。
pub fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// 只保留数字和小数点后解析
pub fn parse_digits_only(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    parse_decimal(&cleaned)
}

/// 取第一个空白分隔的记号解析
pub fn parse_leading_token(text: &str) -> Option<f64> {
    text.split_whitespace().next().and_then(parse_decimal)
}

/// 取第一个数字片段解析
pub fn parse_first_number(text: &str) -> Option<f64> {
    NUMERIC_RUN
        .find(text)
        .and_then(|m| parse_decimal(m.as_str()))
}

/// 在文本中搜索第一个大于0的数值记号
pub fn first_positive_token(text: &str) -> Option<f64> {
    NUMERIC_TOKEN
        .find_iter(text)
        .filter_map(|m| parse_decimal(m.as_str()))
        .find(|v| *v > 0.0)
}

/// 按 `#,##0.00` 格式输出数值
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}
