// =============================================================================
// Shared types used across the quote chart engine
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the base price series is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Candlestick,
    Line,
    Area,
}

impl Default for ChartType {
    fn default() -> Self {
        Self::Candlestick
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Candlestick => write!(f, "candlestick"),
            Self::Line => write!(f, "line"),
            Self::Area => write!(f, "area"),
        }
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "candlestick" | "candle" => Ok(Self::Candlestick),
            "line" => Ok(Self::Line),
            "area" => Ok(Self::Area),
            other => Err(format!("unknown chart type: {other}")),
        }
    }
}

/// Lookback window requested from the data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1M", alias = "1mo")]
    OneMonth,
    #[serde(rename = "3M", alias = "3mo")]
    ThreeMonths,
    #[serde(rename = "6M", alias = "6mo")]
    SixMonths,
    #[serde(rename = "1Y", alias = "1y")]
    OneYear,
    #[serde(rename = "2Y", alias = "2y")]
    TwoYears,
    #[serde(rename = "5Y", alias = "5y")]
    FiveYears,
    #[serde(rename = "MAX", alias = "max")]
    Max,
}

impl Default for Period {
    fn default() -> Self {
        Self::SixMonths
    }
}

impl Period {
    /// Value of the `period` query parameter understood by the stock API.
    pub fn query_value(&self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
            Self::TwoYears => "2Y",
            Self::FiveYears => "5Y",
            Self::Max => "MAX",
        };
        write!(f, "{label}")
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" | "1mo" => Ok(Self::OneMonth),
            "3m" | "3mo" => Ok(Self::ThreeMonths),
            "6m" | "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            "max" => Ok(Self::Max),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// Indicator the user can switch on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndicatorKind {
    Vol,
    Ma,
    Bb,
    Rsi,
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vol => write!(f, "VOL"),
            Self::Ma => write!(f, "MA"),
            Self::Bb => write!(f, "BB"),
            Self::Rsi => write!(f, "RSI"),
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VOL" | "VOLUME" => Ok(Self::Vol),
            "MA" | "SMA" => Ok(Self::Ma),
            "BB" | "BOLLINGER" => Ok(Self::Bb),
            "RSI" => Ok(Self::Rsi),
            other => Err(format!("unknown indicator: {other}")),
        }
    }
}

/// Name of a single derived series. Bollinger bands expand into three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeriesKey {
    Ma,
    BbUpper,
    BbMiddle,
    BbLower,
    Rsi,
    Volume,
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ma => write!(f, "MA"),
            Self::BbUpper => write!(f, "BB_UPPER"),
            Self::BbMiddle => write!(f, "BB_MIDDLE"),
            Self::BbLower => write!(f, "BB_LOWER"),
            Self::Rsi => write!(f, "RSI"),
            Self::Volume => write!(f, "VOLUME"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_accepts_both_spellings() {
        assert_eq!("6M".parse::<Period>().unwrap(), Period::SixMonths);
        assert_eq!("6mo".parse::<Period>().unwrap(), Period::SixMonths);
        assert_eq!("max".parse::<Period>().unwrap(), Period::Max);
        assert!("7w".parse::<Period>().is_err());
    }

    #[test]
    fn period_serde_uses_short_labels() {
        let json = serde_json::to_string(&Period::OneYear).unwrap();
        assert_eq!(json, "\"1Y\"");
        let back: Period = serde_json::from_str("\"3mo\"").unwrap();
        assert_eq!(back, Period::ThreeMonths);
    }

    #[test]
    fn series_key_wire_names() {
        let json = serde_json::to_string(&SeriesKey::BbUpper).unwrap();
        assert_eq!(json, "\"BB_UPPER\"");
        assert_eq!(SeriesKey::BbLower.to_string(), "BB_LOWER");
    }

    #[test]
    fn indicator_kind_parses_aliases() {
        assert_eq!("sma".parse::<IndicatorKind>().unwrap(), IndicatorKind::Ma);
        assert_eq!("Volume".parse::<IndicatorKind>().unwrap(), IndicatorKind::Vol);
        let json = serde_json::to_string(&IndicatorKind::Rsi).unwrap();
        assert_eq!(json, "\"RSI\"");
    }
}
