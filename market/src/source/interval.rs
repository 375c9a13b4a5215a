use std::str::FromStr;

/// Candle granularity, translated per venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    Min1,
    #[default]
    Min5,
    Min15,
    Min30,
    Min60,
    Hour4,
    Day1,
}

impl Interval {
    pub fn mexc_str(&self) -> &'static str {
        match self {
            Self::Min1 => "Min1",
            Self::Min5 => "Min5",
            Self::Min15 => "Min15",
            Self::Min30 => "Min30",
            Self::Min60 => "Min60",
            Self::Hour4 => "Hour4",
            Self::Day1 => "Day1",
        }
    }

    pub fn binance_str(&self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Min60 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
        }
    }
}

impl FromStr for Interval {
    type Err = String;

    /// Accepts either venue's spelling (`Min5` or `5m`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Min1" | "1m" => Ok(Self::Min1),
            "Min5" | "5m" => Ok(Self::Min5),
            "Min15" | "15m" => Ok(Self::Min15),
            "Min30" | "30m" => Ok(Self::Min30),
            "Min60" | "1h" | "60m" => Ok(Self::Min60),
            "Hour4" | "4h" => Ok(Self::Hour4),
            "Day1" | "1d" => Ok(Self::Day1),
            other => Err(format!("unknown interval `{other}`")),
        }
    }
}
