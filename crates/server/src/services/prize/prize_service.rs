use crate::dtos::prize_dto::{PrizeRegistration, PrizeView};
use async_trait::async_trait;
use database::{
    commission::model::CommissionDraft,
    commission_rule::{
        model::{CommissionSchedule, MAX_COMMISSION_LEVEL},
        repository::DynCommissionRuleRepository,
    },
    prize::{model::PrizeName, repository::DynPrizeRepository},
    user::{model::User, repository::DynUserRepository},
};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};
use utils::{AppError, AppResult};

pub type DynPrizeService = Arc<dyn PrizeServiceTrait + Send + Sync>;

#[async_trait]
pub trait PrizeServiceTrait {
    /// 登记中奖，并为中奖者往上最多三代的推荐人建立分润
    async fn register_prize(&self, winner_id: &str, prize_name: &str) -> AppResult<PrizeRegistration>;

    async fn list_prizes(&self) -> AppResult<Vec<PrizeView>>;
}

/// 分润引擎
///
/// 沿推荐链往上逐代查找，每找到一位上线就按该代的规则金额生成一笔分润。
/// 上线不足或规则缺少该代时提前结束。中奖记录与全部分润在同一次写入中提交。
#[derive(Clone)]
pub struct PrizeService {
    users: DynUserRepository,
    prizes: DynPrizeRepository,
    rules: DynCommissionRuleRepository,
}

impl PrizeService {
    pub fn new(users: DynUserRepository, prizes: DynPrizeRepository, rules: DynCommissionRuleRepository) -> Self {
        Self { users, prizes, rules }
    }

    /// 计算分润，结果按代数升序(第一代为直接推荐人)
    pub async fn plan_commissions(&self, winner: &User, schedule: &CommissionSchedule) -> AppResult<Vec<CommissionDraft>> {
        let mut drafts = Vec::new();
        let mut current = winner.referrer_id.clone();
        let mut level = 1;

        while level <= MAX_COMMISSION_LEVEL {
            let Some(ancestor_id) = current.take() else {
                break;
            };
            let Some(amount) = schedule.amount_for(level) else {
                break;
            };
            let Some(ancestor) = self.users.get_user(&ancestor_id).await? else {
                warn!("⚠️ 会员 {} 的推荐链中断: 上线 {} 不存在", winner.id, ancestor_id);
                break;
            };

            drafts.push(CommissionDraft {
                user_id: ancestor.id,
                level,
                amount,
            });

            current = ancestor.referrer_id;
            level += 1;
        }

        Ok(drafts)
    }
}

#[async_trait]
impl PrizeServiceTrait for PrizeService {
    async fn register_prize(&self, winner_id: &str, prize_name: &str) -> AppResult<PrizeRegistration> {
        let winner_id = winner_id.trim();
        if winner_id.is_empty() || prize_name.is_empty() {
            return Err(AppError::BadRequest("Winner ID and prize name are required".to_string()));
        }

        let prize_name: PrizeName = prize_name
            .parse()
            .map_err(|_| AppError::BadRequest("Prize name must be 組合A or 組合B".to_string()))?;

        let winner = self
            .users
            .get_user(winner_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Winner not found".to_string()))?;

        // 每次登记都读取当前规则，金额在写入时快照
        let schedule = CommissionSchedule::from_rules(&self.rules.list_rules().await?);
        let drafts = self.plan_commissions(&winner, &schedule).await?;

        let (prize, commissions) = self
            .prizes
            .insert_prize_with_commissions(&winner.id, prize_name, drafts)
            .await?;

        info!(
            "🏆 会员 {} 中奖 {}，已为 {} 位上线建立分润",
            winner.id,
            prize_name,
            commissions.len()
        );

        Ok(PrizeRegistration { prize, commissions })
    }

    async fn list_prizes(&self) -> AppResult<Vec<PrizeView>> {
        let prizes = self.prizes.list_prizes().await?;

        let mut winner_ids: Vec<String> = prizes.iter().map(|p| p.winner_id.clone()).collect();
        winner_ids.sort();
        winner_ids.dedup();

        let names: HashMap<String, String> = self
            .users
            .get_users_by_ids(&winner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(prizes
            .into_iter()
            .map(|prize| {
                let winner_name = names.get(&prize.winner_id).cloned();
                PrizeView { prize, winner_name }
            })
            .collect())
    }
}
