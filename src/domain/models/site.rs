// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::{TargetSpec, TargetSpecError};
use crate::utils::text_processing::{parse_digits_only, parse_first_number, parse_leading_token};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 交易所站点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    Binance,
    Bybit,
    Okx,
}

impl SiteKind {
    pub const ALL: [SiteKind; 3] = [SiteKind::Binance, SiteKind::Bybit, SiteKind::Okx];
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SiteKind::Binance => write!(f, "binance"),
            SiteKind::Bybit => write!(f, "bybit"),
            SiteKind::Okx => write!(f, "okx"),
        }
    }
}

impl FromStr for SiteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binance" => Ok(SiteKind::Binance),
            "bybit" => Ok(SiteKind::Bybit),
            "okx" => Ok(SiteKind::Okx),
            _ => Err(format!("Unknown site: {}", s)),
        }
    }
}

/// 数值文本格式
///
/// 各站点对价格、数量的渲染方式不同，抽取时按格式选择解析方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// 删除数字和小数点以外的所有字符
    DigitsOnly,
    /// 取第一个空白分隔的记号
    LeadingToken,
    /// 取第一个数字片段
    FirstNumber,
}

impl NumberFormat {
    pub fn parse(&self, text: &str) -> Option<f64> {
        match self {
            NumberFormat::DigitsOnly => parse_digits_only(text),
            NumberFormat::LeadingToken => parse_leading_token(text),
            NumberFormat::FirstNumber => parse_first_number(text),
        }
    }
}

/// 数值字段的一种抽取策略
#[derive(Debug, Clone, PartialEq)]
pub struct NumericStrategy {
    pub selector: String,
    pub format: NumberFormat,
}

impl NumericStrategy {
    pub fn new(selector: &str, format: NumberFormat) -> Self {
        Self {
            selector: selector.to_string(),
            format,
        }
    }
}

/// 数值字段
///
/// 按顺序尝试 `strategies`，都未得到正数时在 `fallback_candidates`
/// 匹配的元素中做通用数值搜索
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericField {
    pub strategies: Vec<NumericStrategy>,
    pub fallback_candidates: Option<String>,
}

/// 行内字段选择器
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldSelectors {
    /// 广告主名称，按优先级排列
    pub advertiser: Vec<String>,
    pub price: NumericField,
    pub quantity: NumericField,
    /// 支付方式，取第一个有结果的选择器
    pub payment_methods: Vec<String>,
}

/// 下一页按钮禁用标记
#[derive(Debug, Clone, PartialEq)]
pub enum DisabledMarker {
    /// class 属性包含指定类名
    ClassContains(String),
    /// 属性等于指定值
    AttributeEquals { name: String, value: String },
    /// 属性存在
    AttributePresent(String),
}

/// 下一页控件
#[derive(Debug, Clone, PartialEq)]
pub struct NextPageControl {
    pub selector: String,
    pub disabled: Option<DisabledMarker>,
}

/// 遮挡物类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstructionKind {
    CookieBanner,
    Promotional,
    ConfirmationDialog,
}

impl fmt::Display for ObstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ObstructionKind::CookieBanner => write!(f, "cookie banner"),
            ObstructionKind::Promotional => write!(f, "promotional interstitial"),
            ObstructionKind::ConfirmationDialog => write!(f, "confirmation dialog"),
        }
    }
}

/// 遮挡物及其关闭控件
#[derive(Debug, Clone, PartialEq)]
pub struct ObstructionSpec {
    pub kind: ObstructionKind,
    /// 关闭/确认控件的选择器
    pub selector: String,
    /// 设置时只处理文本完全相同的控件
    pub text: Option<String>,
}

/// 汇总表中的完成时间戳位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLocation {
    pub table: String,
    pub column: String,
    pub first_row: u32,
}

impl Default for SummaryLocation {
    fn default() -> Self {
        Self {
            table: "Main".to_string(),
            column: "D".to_string(),
            first_row: 2,
        }
    }
}

/// 站点策略
///
/// 引擎只面向这组能力编写，每个站点是一份配置加上数值格式的差异
#[derive(Debug, Clone, PartialEq)]
pub struct SiteProfile {
    pub kind: SiteKind,
    /// 列表页URL模板，`{currency}` 为占位符
    pub url_template: String,
    /// 货币代码，顺序即处理顺序
    pub currencies: Vec<String>,
    pub row_selector: String,
    /// 跳过的表头行数
    pub skip_leading_rows: usize,
    pub fields: FieldSelectors,
    pub next_page: NextPageControl,
    /// 列表行渲染完成的标记元素
    pub page_loaded_marker: String,
    /// 页码元素，`None` 表示站点不提供总页数
    pub page_count_selector: Option<String>,
    pub obstructions: Vec<ObstructionSpec>,
    pub summary: SummaryLocation,
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

const BINANCE_CURRENCIES: &[&str] = &[
    "AED", "AMD", "AOA", "ARS", "AUD", "AZN", "BDT", "BHD", "BIF", "BND", "BOB", "BRL", "BWP",
    "BYN", "CAD", "CDF", "CHF", "CLP", "CNY", "COP", "CRC", "CZK", "DOP", "DZD", "EGP", "ETB",
    "EUR", "GBP", "GEL", "GHS", "GMD", "GNF", "GTQ", "HKD", "HNL", "HUF", "IDR", "INR", "IQD",
    "JOD", "JPY", "KES", "KGS", "KHR", "KWD", "KZT", "LAK", "LBP", "LKR", "MAD", "MDL", "MGA",
    "MOP", "MRU", "MXN", "MZN", "NIO", "NOK", "NPR", "OMR", "PAB", "PEN", "PGK", "PHP", "PKR",
    "PLN", "PYG", "QAR", "RON", "RSD", "RWF", "SAR", "SDG", "SEK", "SLL", "THB", "TJS", "TND",
    "TRY", "TWD", "TZS", "UAH", "UGX", "USD", "UYU", "UZS", "VES", "VND", "XAF", "XOF", "YER",
    "ZAR", "ZMW",
];

const BYBIT_CURRENCIES: &[&str] = &[
    "AED", "AMD", "ARS", "AUD", "AZN", "BDT", "BGN", "BRL", "BYN", "CAD", "CLP", "COP", "CZK",
    "DZD", "EGP", "EUR", "GBP", "GEL", "GHS", "HKD", "HUF", "IDR", "ILS", "INR", "JOD", "JPY",
    "KES", "KGS", "KHR", "KWD", "KZT", "LBP", "LKR", "MAD", "MDL", "MXN", "MYR", "NGN", "NOK",
    "NPR", "NZD", "PEN", "PHP", "PKR", "PLN", "RON", "RSD", "RUB", "SAR", "SEK", "THB", "TJS",
    "TRY", "TWD", "UAH", "USD", "UZS", "VES", "VND", "ZAR",
];

const OKX_CURRENCIES: &[&str] = &[
    "AED", "AMD", "ARS", "AUD", "AZN", "BGN", "BHD", "BRL", "BWP", "BYN", "CAD", "CHF", "CLP",
    "CNY", "COP", "CZK", "DKK", "DOP", "EGP", "ETB", "EUR", "GBP", "GEL", "GHS", "HUF", "IDR",
    "ILS", "INR", "IQD", "ISK", "JMD", "JOD", "JPY", "KES", "KGS", "KWD", "KZT", "LAK", "LBP",
    "LKR", "MAD", "MDL", "MOP", "MXN", "MZN", "NOK", "NPR", "NZD", "OMR", "PAB", "PEN", "PKR",
    "PLN", "PYG", "QAR", "RON", "RSD", "RWF", "SAR", "SDG", "SEK", "THB", "TJS", "TND", "TRY",
    "TTD", "TZS", "UAH", "UGX", "USD", "UYU", "UZS", "VES", "VND", "XAF", "XOF", "ZAR", "ZMW",
];

impl SiteProfile {
    /// 内置站点配置
    pub fn preset(kind: SiteKind) -> Self {
        match kind {
            SiteKind::Binance => Self::binance(),
            SiteKind::Bybit => Self::bybit(),
            SiteKind::Okx => Self::okx(),
        }
    }

    pub fn binance() -> Self {
        Self {
            kind: SiteKind::Binance,
            url_template: "https://p2p.binance.com/en/trade/all-payments/USDT?fiat={currency}"
                .to_string(),
            currencies: codes(BINANCE_CURRENCIES),
            row_selector: "tr".to_string(),
            skip_leading_rows: 0,
            fields: FieldSelectors {
                advertiser: vec!["a[href^='/advertiserDetail']".to_string()],
                price: NumericField {
                    strategies: vec![NumericStrategy::new(
                        "td:nth-child(2) .headline5",
                        NumberFormat::DigitsOnly,
                    )],
                    fallback_candidates: Some("td:nth-child(2) div".to_string()),
                },
                quantity: NumericField {
                    strategies: vec![NumericStrategy::new(
                        "td:nth-child(3) .body3",
                        NumberFormat::DigitsOnly,
                    )],
                    fallback_candidates: None,
                },
                payment_methods: vec!["td:nth-child(4) .PaymentMethodItem__text".to_string()],
            },
            next_page: NextPageControl {
                selector: "div.bn-pagination-next".to_string(),
                disabled: Some(DisabledMarker::AttributeEquals {
                    name: "aria-disabled".to_string(),
                    value: "true".to_string(),
                }),
            },
            page_loaded_marker: "a[href^='/advertiserDetail']".to_string(),
            page_count_selector: Some("a.bn-pagination-item".to_string()),
            obstructions: vec![ObstructionSpec {
                kind: ObstructionKind::CookieBanner,
                selector: "#onetrust-close-btn-container".to_string(),
                text: None,
            }],
            summary: SummaryLocation::default(),
        }
    }

    pub fn bybit() -> Self {
        Self {
            kind: SiteKind::Bybit,
            url_template:
                "https://www.bybit.com/fiat/trade/otc?actionType=1&token=USDT&fiat={currency}&paymentMethod="
                    .to_string(),
            currencies: codes(BYBIT_CURRENCIES),
            row_selector: "tr".to_string(),
            skip_leading_rows: 1,
            fields: FieldSelectors {
                advertiser: vec![".advertiser-name".to_string()],
                price: NumericField {
                    strategies: vec![
                        NumericStrategy::new(".price-amount", NumberFormat::LeadingToken),
                        NumericStrategy::new(
                            r".text-\[var\(--bds-gray-t1-title\)\]",
                            NumberFormat::LeadingToken,
                        ),
                    ],
                    fallback_candidates: Some(
                        "span[class*='moly-text'], span[class*='price-amount']".to_string(),
                    ),
                },
                quantity: NumericField {
                    strategies: vec![NumericStrategy::new(
                        "div.ql-value",
                        NumberFormat::FirstNumber,
                    )],
                    fallback_candidates: None,
                },
                payment_methods: vec![".trade-list-tag".to_string()],
            },
            next_page: NextPageControl {
                selector: "li.pagination-next button[aria-label='next page']".to_string(),
                disabled: Some(DisabledMarker::AttributePresent("disabled".to_string())),
            },
            page_loaded_marker: ".advertiser-name".to_string(),
            page_count_selector: None,
            obstructions: vec![
                ObstructionSpec {
                    kind: ObstructionKind::Promotional,
                    selector: ".otc-ad-close".to_string(),
                    text: None,
                },
                ObstructionSpec {
                    kind: ObstructionKind::ConfirmationDialog,
                    selector: "button.ant-btn-primary".to_string(),
                    text: Some("Confirm".to_string()),
                },
            ],
            summary: SummaryLocation::default(),
        }
    }

    pub fn okx() -> Self {
        Self {
            kind: SiteKind::Okx,
            url_template: "https://www.okx.com/p2p-markets/{currency}/buy-usdt".to_string(),
            currencies: codes(OKX_CURRENCIES),
            row_selector: "tr.custom-table-row".to_string(),
            skip_leading_rows: 1,
            fields: FieldSelectors {
                advertiser: vec![".merchant-name a".to_string()],
                price: NumericField {
                    strategies: vec![NumericStrategy::new(".price", NumberFormat::DigitsOnly)],
                    fallback_candidates: None,
                },
                quantity: NumericField {
                    strategies: vec![NumericStrategy::new(
                        ".quantity-and-limit .show-item:first-child",
                        NumberFormat::DigitsOnly,
                    )],
                    fallback_candidates: None,
                },
                payment_methods: vec![".payment-item .pay-method".to_string()],
            },
            next_page: NextPageControl {
                selector: "li.okui-pagination-next".to_string(),
                disabled: Some(DisabledMarker::ClassContains(
                    "okui-pagination-disabled".to_string(),
                )),
            },
            page_loaded_marker: ".merchant-name".to_string(),
            page_count_selector: None,
            obstructions: Vec::new(),
            summary: SummaryLocation::default(),
        }
    }

    /// 按货币顺序构造所有目标
    pub fn targets(&self) -> Result<Vec<TargetSpec>, TargetSpecError> {
        self.currencies
            .iter()
            .map(|code| TargetSpec::from_template(&self.url_template, code))
            .collect()
    }
}
