use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// 分润最多追溯的代数
pub const MAX_COMMISSION_LEVEL: i32 = 3;

/// 默认分润规则: 第一代150 / 第二代100 / 第三代50
pub const DEFAULT_COMMISSION_RULES: [(i32, i64); 3] = [(1, 150), (2, 100), (3, 50)];

/// 分润规则(代数 -> 金额)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommissionRule {
    pub level: i32,
    pub amount: i64,
}

impl CommissionRule {
    pub fn defaults() -> Vec<CommissionRule> {
        DEFAULT_COMMISSION_RULES
            .iter()
            .map(|&(level, amount)| CommissionRule { level, amount })
            .collect()
    }
}

/// 某一时刻的分润规则快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommissionSchedule {
    amounts: BTreeMap<i32, i64>,
}

impl CommissionSchedule {
    /// 超出 1..=MAX_COMMISSION_LEVEL 的规则会被忽略
    pub fn from_rules(rules: &[CommissionRule]) -> Self {
        let amounts = rules
            .iter()
            .filter(|rule| (1..=MAX_COMMISSION_LEVEL).contains(&rule.level))
            .map(|rule| (rule.level, rule.amount))
            .collect();

        Self { amounts }
    }

    pub fn amount_for(&self, level: i32) -> Option<i64> {
        self.amounts.get(&level).copied()
    }

    /// 从第一代开始连续配置的代数
    pub fn depth(&self) -> i32 {
        (1..=MAX_COMMISSION_LEVEL)
            .take_while(|level| self.amounts.contains_key(level))
            .count() as i32
    }
}
