use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// 奖项名称，仅允许两种固定组合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PrizeName {
    #[serde(rename = "組合A")]
    ComboA,
    #[serde(rename = "組合B")]
    ComboB,
}

impl PrizeName {
    pub const ALL: [PrizeName; 2] = [PrizeName::ComboA, PrizeName::ComboB];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrizeName::ComboA => "組合A",
            PrizeName::ComboB => "組合B",
        }
    }
}

impl fmt::Display for PrizeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPrizeName(pub String);

impl fmt::Display for UnknownPrizeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown prize name: {}", self.0)
    }
}

impl FromStr for PrizeName {
    type Err = UnknownPrizeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrizeName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownPrizeName(s.to_string()))
    }
}

/// 中奖记录模型(创建后不可修改)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Prize {
    /// 自增序号
    pub id: i64,
    /// 中奖会员ID
    pub winner_id: String,
    pub prize_name: PrizeName,
    /// 创建时间(毫秒时间戳)
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prize_name() {
        assert_eq!("組合A".parse::<PrizeName>().unwrap(), PrizeName::ComboA);
        assert_eq!("組合B".parse::<PrizeName>().unwrap(), PrizeName::ComboB);
        assert!("組合C".parse::<PrizeName>().is_err());
        assert!("".parse::<PrizeName>().is_err());
    }

    #[test]
    fn test_prize_name_serializes_as_label() {
        let json = serde_json::to_string(&PrizeName::ComboB).unwrap();
        assert_eq!(json, "\"組合B\"");

        let parsed: Result<PrizeName, _> = serde_json::from_str("\"組合Z\"");
        assert!(parsed.is_err());
    }
}
