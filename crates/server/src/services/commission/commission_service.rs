use crate::dtos::commission_dto::{CommissionView, Stats};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use database::{
    commission::{model::Commission, repository::DynCommissionRepository},
    prize::repository::DynPrizeRepository,
    user::repository::DynUserRepository,
};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;
use utils::{AppError, AppResult};

pub type DynCommissionService = Arc<dyn CommissionServiceTrait + Send + Sync>;

/// 后台最近分润默认条数
pub const DEFAULT_RECENT_LIMIT: i64 = 50;
/// 后台最近分润最大条数
pub const MAX_RECENT_LIMIT: i64 = 500;

#[async_trait]
pub trait CommissionServiceTrait {
    /// 会员获得的分润，最新的在前
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<CommissionView>>;

    async fn list_recent(&self, limit: Option<i64>) -> AppResult<Vec<CommissionView>>;

    async fn stats(&self) -> AppResult<Stats>;
}

/// 当天 00:00 (UTC) 的毫秒时间戳
pub fn today_start_millis(now: DateTime<Utc>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight).timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

fn resolve_limit(limit: Option<i64>) -> AppResult<i64> {
    match limit {
        None => Ok(DEFAULT_RECENT_LIMIT),
        Some(limit) if limit <= 0 => Err(AppError::BadRequest("Limit must be a positive number".to_string())),
        Some(limit) => Ok(limit.min(MAX_RECENT_LIMIT)),
    }
}

#[derive(Clone)]
pub struct CommissionService {
    users: DynUserRepository,
    prizes: DynPrizeRepository,
    commissions: DynCommissionRepository,
}

impl CommissionService {
    pub fn new(users: DynUserRepository, prizes: DynPrizeRepository, commissions: DynCommissionRepository) -> Self {
        Self {
            users,
            prizes,
            commissions,
        }
    }

    // 补上会员名称与奖项名称，关联记录不存在时留空
    async fn decorate(&self, commissions: Vec<Commission>) -> AppResult<Vec<CommissionView>> {
        if commissions.is_empty() {
            return Ok(Vec::new());
        }

        let mut user_ids: Vec<String> = commissions
            .iter()
            .flat_map(|c| [c.user_id.clone(), c.winner_id.clone()])
            .collect();
        user_ids.sort();
        user_ids.dedup();

        let mut prize_ids: Vec<i64> = commissions.iter().map(|c| c.prize_id).collect();
        prize_ids.sort_unstable();
        prize_ids.dedup();

        let names: HashMap<String, String> = self
            .users
            .get_users_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();
        let prizes: HashMap<i64, _> = self
            .prizes
            .get_prizes_by_ids(&prize_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.prize_name))
            .collect();

        Ok(commissions
            .into_iter()
            .map(|commission| CommissionView {
                user_name: names.get(&commission.user_id).cloned(),
                winner_name: names.get(&commission.winner_id).cloned(),
                prize_name: prizes.get(&commission.prize_id).copied(),
                commission,
            })
            .collect())
    }
}

#[async_trait]
impl CommissionServiceTrait for CommissionService {
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<CommissionView>> {
        let commissions = self.commissions.list_commissions_for_user(user_id).await?;
        self.decorate(commissions).await
    }

    async fn list_recent(&self, limit: Option<i64>) -> AppResult<Vec<CommissionView>> {
        let limit = resolve_limit(limit)?;
        let commissions = self.commissions.list_recent_commissions(limit).await?;
        self.decorate(commissions).await
    }

    async fn stats(&self) -> AppResult<Stats> {
        let today = today_start_millis(Utc::now());

        let stats = Stats {
            total_users: self.users.count_users(None).await?,
            total_commissions: self.commissions.sum_commission_amount(None, None).await?,
            today_users: self.users.count_users(Some(today)).await?,
            today_commissions: self.commissions.sum_commission_amount(None, Some(today)).await?,
        };

        debug!("📊 统计: {:?}", stats);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{
        commission::model::CommissionDraft,
        prize::{model::PrizeName, repository::PrizeRepositoryTrait},
        user::repository::UserRepositoryTrait,
        MemoryStore,
    };

    fn service(store: &Arc<MemoryStore>) -> CommissionService {
        CommissionService::new(store.clone(), store.clone(), store.clone())
    }

    fn draft(user_id: &str, level: i32, amount: i64) -> CommissionDraft {
        CommissionDraft {
            user_id: user_id.to_string(),
            level,
            amount,
        }
    }

    #[test]
    fn test_today_start_millis() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 17, 42, 9).unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();

        assert_eq!(today_start_millis(now), midnight.timestamp_millis());
        assert_eq!(today_start_millis(midnight), midnight.timestamp_millis());
    }

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None).unwrap(), DEFAULT_RECENT_LIMIT);
        assert_eq!(resolve_limit(Some(10)).unwrap(), 10);
        assert_eq!(resolve_limit(Some(10_000)).unwrap(), MAX_RECENT_LIMIT);
        assert!(matches!(resolve_limit(Some(0)), Err(AppError::BadRequest(_))));
        assert!(matches!(resolve_limit(Some(-5)), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_commission_views_are_decorated() {
        let store = Arc::new(MemoryStore::with_default_rules());
        store.create_user("AAAAAAAA", "A", None).await.unwrap();
        store.create_user("BBBBBBBB", "B", Some("AAAAAAAA")).await.unwrap();
        store
            .insert_prize_with_commissions("BBBBBBBB", PrizeName::ComboB, vec![draft("AAAAAAAA", 1, 150)])
            .await
            .unwrap();

        let views = service(&store).list_for_user("AAAAAAAA").await.unwrap();

        assert_eq!(views.len(), 1);
        assert_eq!(views[0].user_name.as_deref(), Some("A"));
        assert_eq!(views[0].winner_name.as_deref(), Some("B"));
        assert_eq!(views[0].prize_name, Some(PrizeName::ComboB));
        assert_eq!(views[0].commission.amount, 150);

        assert!(service(&store).list_for_user("NOBODY00").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_commissions_respect_limit() {
        let store = Arc::new(MemoryStore::with_default_rules());
        store.create_user("AAAAAAAA", "A", None).await.unwrap();
        store.create_user("BBBBBBBB", "B", Some("AAAAAAAA")).await.unwrap();
        for _ in 0..3 {
            store
                .insert_prize_with_commissions("BBBBBBBB", PrizeName::ComboA, vec![draft("AAAAAAAA", 1, 150)])
                .await
                .unwrap();
        }

        let service = service(&store);
        assert_eq!(service.list_recent(None).await.unwrap().len(), 3);

        let recent = service.list_recent(Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].commission.id > recent[1].commission.id);
    }

    #[tokio::test]
    async fn test_stats_totals() {
        let store = Arc::new(MemoryStore::with_default_rules());
        store.create_user("AAAAAAAA", "A", None).await.unwrap();
        store.create_user("BBBBBBBB", "B", Some("AAAAAAAA")).await.unwrap();
        store.create_user("CCCCCCCC", "C", Some("BBBBBBBB")).await.unwrap();
        store
            .insert_prize_with_commissions(
                "CCCCCCCC",
                PrizeName::ComboA,
                vec![draft("BBBBBBBB", 1, 150), draft("AAAAAAAA", 2, 100)],
            )
            .await
            .unwrap();

        let stats = service(&store).stats().await.unwrap();

        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.total_commissions, 250);
        assert!(stats.today_users <= stats.total_users);
        assert!(stats.today_commissions <= stats.total_commissions);
    }
}
