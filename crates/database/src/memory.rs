//! 进程内存储
//!
//! 与 `Database` 实现同一组仓库Trait，供单元测试、集成测试与本地调试使用。
//! 所有写入都先作用在状态副本上，成功后整体替换，因此与 MongoDB 事务一样是全有或全无。

use crate::{
    commission::{
        model::{Commission, CommissionDraft},
        repository::CommissionRepositoryTrait,
    },
    commission_rule::{model::CommissionRule, repository::CommissionRuleRepositoryTrait},
    prize::{
        model::{Prize, PrizeName},
        repository::PrizeRepositoryTrait,
    },
    user::{
        model::{User, UserDeletion},
        repository::UserRepositoryTrait,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};
use utils::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    prizes: Vec<Prize>,
    commissions: Vec<Commission>,
    rules: Vec<CommissionRule>,
    prize_seq: i64,
    commission_seq: i64,
    last_timestamp: i64,
}

impl MemoryState {
    // 严格递增的毫秒时间戳，保证"新的在前"排序稳定
    fn now(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis().max(self.last_timestamp + 1);
        self.last_timestamp = now;
        now
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    // 第 N 笔(从0开始)分润写入时模拟存储故障
    fail_commission_write_at: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 带默认分润规则(150/100/50)的存储
    pub fn with_default_rules() -> Self {
        Self::with_rules(CommissionRule::defaults())
    }

    pub fn with_rules(rules: Vec<CommissionRule>) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.rules = rules;
        }
        store
    }

    /// 替换分润规则，只影响之后的中奖登记
    pub fn replace_rules(&self, rules: Vec<CommissionRule>) -> AppResult<()> {
        self.state()?.rules = rules;
        Ok(())
    }

    /// 下一次登记中奖时，写到第 `index` 笔分润即失败
    pub fn fail_commission_write_at(&self, index: usize) {
        if let Ok(mut fail_at) = self.fail_commission_write_at.lock() {
            *fail_at = Some(index);
        }
    }

    /// 直接写入一条会员记录，不做任何校验(用于构造异常数据)
    pub fn insert_raw_user(&self, user: User) -> AppResult<()> {
        self.state()?.users.push(user);
        Ok(())
    }

    fn state(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::InternalServerErrorWithContext("memory store lock poisoned".to_string()))
    }

    fn take_commission_failure(&self) -> AppResult<Option<usize>> {
        let mut fail_at = self
            .fail_commission_write_at
            .lock()
            .map_err(|_| AppError::InternalServerErrorWithContext("memory store lock poisoned".to_string()))?;
        Ok(fail_at.take())
    }
}

fn name_conflict(name: &str) -> AppError {
    AppError::Conflict(format!("User name {} already exists", name))
}

fn sort_newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserRepositoryTrait for MemoryStore {
    async fn user_id_exists(&self, id: &str) -> AppResult<bool> {
        Ok(self.state()?.users.iter().any(|u| u.id == id))
    }

    async fn create_user(&self, id: &str, name: &str, referrer_id: Option<&str>) -> AppResult<User> {
        let mut state = self.state()?;

        if state.users.iter().any(|u| u.name == name) {
            return Err(name_conflict(name));
        }
        if state.users.iter().any(|u| u.id == id) {
            return Err(AppError::UserIdTaken(id.to_string()));
        }

        let user = User {
            id: id.to_string(),
            name: name.to_string(),
            referrer_id: referrer_id.map(str::to_string),
            created_at: state.now(),
        };
        state.users.push(user.clone());

        Ok(user)
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.state()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_name(&self, name: &str) -> AppResult<Option<User>> {
        Ok(self.state()?.users.iter().find(|u| u.name == name).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut users = self.state()?.users.clone();
        sort_newest_first(&mut users, |u| (u.created_at, u.id.clone()));
        Ok(users)
    }

    async fn get_users_by_ids(&self, ids: &[String]) -> AppResult<Vec<User>> {
        let wanted: HashSet<&String> = ids.iter().collect();
        Ok(self
            .state()?
            .users
            .iter()
            .filter(|u| wanted.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: &str, name: &str, referrer_id: Option<&str>) -> AppResult<Option<User>> {
        let mut state = self.state()?;

        if state.users.iter().any(|u| u.name == name && u.id != id) {
            return Err(name_conflict(name));
        }

        Ok(state.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.name = name.to_string();
            user.referrer_id = referrer_id.map(str::to_string);
            user.clone()
        }))
    }

    async fn delete_user_cascade(&self, id: &str) -> AppResult<Option<UserDeletion>> {
        let mut state = self.state()?;

        if !state.users.iter().any(|u| u.id == id) {
            return Ok(None);
        }

        let mut staged = state.clone();

        let commissions_before = staged.commissions.len();
        staged.commissions.retain(|c| c.user_id != id && c.winner_id != id);
        let prizes_before = staged.prizes.len();
        staged.prizes.retain(|p| p.winner_id != id);

        let mut detached_referees = 0;
        for user in staged.users.iter_mut().filter(|u| u.referrer_id.as_deref() == Some(id)) {
            user.referrer_id = None;
            detached_referees += 1;
        }
        staged.users.retain(|u| u.id != id);

        let deletion = UserDeletion {
            deleted_prizes: (prizes_before - staged.prizes.len()) as u64,
            deleted_commissions: (commissions_before - staged.commissions.len()) as u64,
            detached_referees,
        };
        *state = staged;

        Ok(Some(deletion))
    }

    async fn list_children(&self, referrer_ids: &[String]) -> AppResult<Vec<User>> {
        let parents: HashSet<&str> = referrer_ids.iter().map(String::as_str).collect();
        Ok(self
            .state()?
            .users
            .iter()
            .filter(|u| u.referrer_id.as_deref().is_some_and(|r| parents.contains(r)))
            .cloned()
            .collect())
    }

    async fn count_children(&self, id: &str) -> AppResult<u64> {
        Ok(self
            .state()?
            .users
            .iter()
            .filter(|u| u.referrer_id.as_deref() == Some(id))
            .count() as u64)
    }

    async fn count_users(&self, since: Option<i64>) -> AppResult<u64> {
        Ok(self
            .state()?
            .users
            .iter()
            .filter(|u| since.map_or(true, |ts| u.created_at >= ts))
            .count() as u64)
    }
}

#[async_trait]
impl PrizeRepositoryTrait for MemoryStore {
    async fn insert_prize_with_commissions(
        &self,
        winner_id: &str,
        prize_name: PrizeName,
        commissions: Vec<CommissionDraft>,
    ) -> AppResult<(Prize, Vec<Commission>)> {
        let fail_at = self.take_commission_failure()?;
        let mut state = self.state()?;
        let mut staged = state.clone();

        let created_at = staged.now();
        staged.prize_seq += 1;
        let prize = Prize {
            id: staged.prize_seq,
            winner_id: winner_id.to_string(),
            prize_name,
            created_at,
        };
        staged.prizes.push(prize.clone());

        let mut written = Vec::with_capacity(commissions.len());
        for (index, draft) in commissions.into_iter().enumerate() {
            if fail_at == Some(index) {
                return Err(AppError::InternalServerErrorWithContext(format!(
                    "simulated failure writing commission #{} of prize #{}",
                    index, prize.id
                )));
            }

            staged.commission_seq += 1;
            let commission = draft.into_commission(staged.commission_seq, prize.id, winner_id, created_at);
            staged.commissions.push(commission.clone());
            written.push(commission);
        }

        *state = staged;
        Ok((prize, written))
    }

    async fn list_prizes(&self) -> AppResult<Vec<Prize>> {
        let mut prizes = self.state()?.prizes.clone();
        sort_newest_first(&mut prizes, |p| (p.created_at, p.id));
        Ok(prizes)
    }

    async fn get_prizes_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Prize>> {
        Ok(self
            .state()?
            .prizes
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommissionRepositoryTrait for MemoryStore {
    async fn list_commissions_for_user(&self, user_id: &str) -> AppResult<Vec<Commission>> {
        let mut commissions: Vec<Commission> = self
            .state()?
            .commissions
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        sort_newest_first(&mut commissions, |c| (c.created_at, c.id));
        Ok(commissions)
    }

    async fn list_recent_commissions(&self, limit: i64) -> AppResult<Vec<Commission>> {
        let mut commissions = self.state()?.commissions.clone();
        sort_newest_first(&mut commissions, |c| (c.created_at, c.id));
        commissions.truncate(limit.max(0) as usize);
        Ok(commissions)
    }

    async fn sum_commission_amount(&self, user_id: Option<&str>, since: Option<i64>) -> AppResult<i64> {
        Ok(self
            .state()?
            .commissions
            .iter()
            .filter(|c| user_id.map_or(true, |id| c.user_id == id))
            .filter(|c| since.map_or(true, |ts| c.created_at >= ts))
            .map(|c| c.amount)
            .sum())
    }
}

#[async_trait]
impl CommissionRuleRepositoryTrait for MemoryStore {
    async fn list_rules(&self) -> AppResult<Vec<CommissionRule>> {
        let mut rules = self.state()?.rules.clone();
        rules.sort_by_key(|r| r.level);
        Ok(rules)
    }

    async fn seed_default_rules(&self) -> AppResult<usize> {
        let mut state = self.state()?;
        if !state.rules.is_empty() {
            return Ok(0);
        }

        state.rules = CommissionRule::defaults();
        Ok(state.rules.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(user_id: &str, level: i32, amount: i64) -> CommissionDraft {
        CommissionDraft {
            user_id: user_id.to_string(),
            level,
            amount,
        }
    }

    #[tokio::test]
    async fn test_unique_user_name() {
        let store = MemoryStore::new();
        store.create_user("AAAAAAAA", "alice", None).await.unwrap();

        let result = store.create_user("BBBBBBBB", "alice", None).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let result = store.create_user("AAAAAAAA", "carol", None).await;
        assert!(matches!(result, Err(AppError::UserIdTaken(id)) if id == "AAAAAAAA"));

        store.create_user("BBBBBBBB", "bob", None).await.unwrap();
        let result = store.update_user("BBBBBBBB", "alice", None).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_prize_write_is_all_or_nothing() {
        let store = MemoryStore::with_default_rules();
        store.fail_commission_write_at(1);

        let result = store
            .insert_prize_with_commissions("WINNER01", PrizeName::ComboA, vec![draft("P1", 1, 150), draft("P2", 2, 100)])
            .await;

        assert!(result.is_err());
        assert!(store.list_prizes().await.unwrap().is_empty());
        assert!(store.list_recent_commissions(10).await.unwrap().is_empty());

        // 故障只注入一次
        let (prize, commissions) = store
            .insert_prize_with_commissions("WINNER01", PrizeName::ComboA, vec![draft("P1", 1, 150), draft("P2", 2, 100)])
            .await
            .unwrap();
        assert_eq!(prize.id, 1);
        assert_eq!(commissions.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_cascade_delete() {
        let store = MemoryStore::with_default_rules();
        store.create_user("PARENT01", "parent", None).await.unwrap();
        store.create_user("CHILD001", "child", Some("PARENT01")).await.unwrap();
        store.create_user("GRAND001", "grand", Some("CHILD001")).await.unwrap();

        store
            .insert_prize_with_commissions("CHILD001", PrizeName::ComboB, vec![draft("PARENT01", 1, 150)])
            .await
            .unwrap();
        store
            .insert_prize_with_commissions("GRAND001", PrizeName::ComboA, vec![draft("CHILD001", 1, 150), draft("PARENT01", 2, 100)])
            .await
            .unwrap();

        let deletion = store.delete_user_cascade("CHILD001").await.unwrap().unwrap();
        assert_eq!(deletion.deleted_prizes, 1);
        assert_eq!(deletion.deleted_commissions, 2);
        assert_eq!(deletion.detached_referees, 1);

        let remaining = store.list_recent_commissions(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, "PARENT01");
        assert_eq!(remaining[0].winner_id, "GRAND001");

        let grand = store.get_user("GRAND001").await.unwrap().unwrap();
        assert_eq!(grand.referrer_id, None);

        assert!(store.delete_user_cascade("CHILD001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sum_commission_amount_filters() {
        let store = MemoryStore::with_default_rules();
        store
            .insert_prize_with_commissions("W1", PrizeName::ComboA, vec![draft("A", 1, 150), draft("B", 2, 100)])
            .await
            .unwrap();

        assert_eq!(store.sum_commission_amount(None, None).await.unwrap(), 250);
        assert_eq!(store.sum_commission_amount(Some("B"), None).await.unwrap(), 100);
        assert_eq!(store.sum_commission_amount(None, Some(i64::MAX)).await.unwrap(), 0);
    }
}
