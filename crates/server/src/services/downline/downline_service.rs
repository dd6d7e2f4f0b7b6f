use crate::dtos::commission_dto::DownlineEntry;
use async_trait::async_trait;
use database::{
    commission_rule::{model::CommissionSchedule, repository::DynCommissionRuleRepository},
    user::repository::DynUserRepository,
};
use std::sync::Arc;
use tracing::debug;
use utils::AppResult;

pub type DynDownlineService = Arc<dyn DownlineServiceTrait + Send + Sync>;

#[async_trait]
pub trait DownlineServiceTrait {
    /// 逐代展开下线，只展开能获得分润的代数
    async fn get_downline(&self, user_id: &str) -> AppResult<Vec<DownlineEntry>>;
}

#[derive(Clone)]
pub struct DownlineService {
    users: DynUserRepository,
    rules: DynCommissionRuleRepository,
}

impl DownlineService {
    pub fn new(users: DynUserRepository, rules: DynCommissionRuleRepository) -> Self {
        Self { users, rules }
    }
}

#[async_trait]
impl DownlineServiceTrait for DownlineService {
    async fn get_downline(&self, user_id: &str) -> AppResult<Vec<DownlineEntry>> {
        let depth = CommissionSchedule::from_rules(&self.rules.list_rules().await?).depth();

        let mut downline = Vec::new();
        let mut parents = vec![user_id.to_string()];

        for level in 1..=depth {
            let generation = self.users.list_children(&parents).await?;
            if generation.is_empty() {
                break;
            }

            parents = generation.iter().map(|u| u.id.clone()).collect();
            downline.extend(generation.into_iter().map(|u| DownlineEntry::from_user(u, level)));
        }

        debug!("会员 {} 的下线共 {} 人(最多 {} 代)", user_id, downline.len(), depth);
        Ok(downline)
    }
}
