use crate::{commission_rule::model::CommissionRule, Database};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions};
use std::sync::Arc;
use tracing::info;
use utils::AppResult;

pub type DynCommissionRuleRepository = Arc<dyn CommissionRuleRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait CommissionRuleRepositoryTrait {
    // 分润规则，按代数升序
    async fn list_rules(&self) -> AppResult<Vec<CommissionRule>>;

    // 规则为空时写入默认规则，返回写入的条数
    async fn seed_default_rules(&self) -> AppResult<usize>;
}

#[async_trait]
impl CommissionRuleRepositoryTrait for Database {
    async fn list_rules(&self) -> AppResult<Vec<CommissionRule>> {
        let options = FindOptions::builder().sort(doc! { "level": 1 }).build();
        let cursor = self.commission_rules.find(None, options).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn seed_default_rules(&self) -> AppResult<usize> {
        let existing = self.commission_rules.count_documents(None, None).await?;
        if existing > 0 {
            info!("📊 已有{}条分润规则，跳过默认规则写入", existing);
            return Ok(0);
        }

        let rules = CommissionRule::defaults();
        let result = self.commission_rules.insert_many(&rules, None).await?;

        info!("🔧 已写入{}条默认分润规则", result.inserted_ids.len());
        Ok(result.inserted_ids.len())
    }
}
