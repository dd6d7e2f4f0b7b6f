use crate::dtos::user_dto::{UserProfile, UserView};
use async_trait::async_trait;
use database::{
    commission::repository::DynCommissionRepository,
    user::{
        model::{User, UserDeletion},
        repository::DynUserRepository,
    },
};
use rand::{distributions::Alphanumeric, Rng};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};
use utils::{AppError, AppResult};

pub type DynUserService = Arc<dyn UserServiceTrait + Send + Sync>;

/// 会员ID长度
pub const USER_ID_LENGTH: usize = 8;
/// 生成不重复会员ID的最大尝试次数
pub const MAX_USER_ID_ATTEMPTS: u32 = 10;

#[async_trait]
pub trait UserServiceTrait {
    async fn create_user(&self, name: &str, referrer_id: Option<&str>) -> AppResult<User>;
    async fn list_users(&self) -> AppResult<Vec<UserView>>;
    async fn get_user_profile(&self, id: &str) -> AppResult<UserProfile>;
    async fn update_user(&self, id: &str, name: &str, referrer_id: Option<&str>) -> AppResult<User>;
    async fn delete_user(&self, id: &str) -> AppResult<UserDeletion>;
}

/// 随机 8 码大小写英数混合ID
pub fn generate_user_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(USER_ID_LENGTH)
        .map(char::from)
        .collect()
}

// 空字符串等同于未设置推荐人
fn normalize_referrer(referrer_id: Option<&str>) -> Option<&str> {
    referrer_id.map(str::trim).filter(|r| !r.is_empty())
}

fn required_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    Ok(name)
}

#[derive(Clone)]
pub struct UserService {
    users: DynUserRepository,
    commissions: DynCommissionRepository,
    id_generator: fn() -> String,
}

impl UserService {
    pub fn new(users: DynUserRepository, commissions: DynCommissionRepository) -> Self {
        Self::with_id_generator(users, commissions, generate_user_id)
    }

    pub fn with_id_generator(
        users: DynUserRepository,
        commissions: DynCommissionRepository,
        id_generator: fn() -> String,
    ) -> Self {
        Self {
            users,
            commissions,
            id_generator,
        }
    }

    // 以随机ID插入会员，ID撞上已有会员时换一个重试；唯一索引保证并发插入也不会重复
    async fn insert_with_fresh_id(&self, name: &str, referrer_id: Option<&str>) -> AppResult<User> {
        for attempt in 1..=MAX_USER_ID_ATTEMPTS {
            let id = (self.id_generator)();
            match self.users.create_user(&id, name, referrer_id).await {
                Err(AppError::UserIdTaken(_)) => {
                    warn!("⚠️ 会员ID {} 已存在，重新生成 ({}/{})", id, attempt, MAX_USER_ID_ATTEMPTS);
                }
                result => return result,
            }
        }

        Err(AppError::IdGenerationExhausted(MAX_USER_ID_ATTEMPTS))
    }

    async fn ensure_referrer_exists(&self, referrer_id: &str) -> AppResult<()> {
        if self.users.user_id_exists(referrer_id).await? {
            Ok(())
        } else {
            Err(AppError::BadRequest("Referrer ID does not exist".to_string()))
        }
    }
}

#[async_trait]
impl UserServiceTrait for UserService {
    async fn create_user(&self, name: &str, referrer_id: Option<&str>) -> AppResult<User> {
        let name = required_name(name)?;
        let referrer_id = normalize_referrer(referrer_id);

        if let Some(referrer_id) = referrer_id {
            self.ensure_referrer_exists(referrer_id).await?;
        }

        if self.users.get_user_by_name(name).await?.is_some() {
            return Err(AppError::Conflict("User name already exists".to_string()));
        }

        let user = self.insert_with_fresh_id(name, referrer_id).await?;

        info!("👤 新会员 {}({}) 已注册, 推荐人: {:?}", user.name, user.id, user.referrer_id);
        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<UserView>> {
        let users = self.users.list_users().await?;
        let names: HashMap<String, String> = users.iter().map(|u| (u.id.clone(), u.name.clone())).collect();

        Ok(users
            .into_iter()
            .map(|user| {
                let referrer_name = user.referrer_id.as_ref().and_then(|r| names.get(r).cloned());
                UserView { user, referrer_name }
            })
            .collect())
    }

    async fn get_user_profile(&self, id: &str) -> AppResult<UserProfile> {
        let user = self
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let referrer_name = match user.referrer_id.as_deref() {
            Some(referrer_id) => self.users.get_user(referrer_id).await?.map(|r| r.name),
            None => None,
        };
        let total_commission = self.commissions.sum_commission_amount(Some(id), None).await?;
        let downline_count = self.users.count_children(id).await?;

        Ok(UserProfile {
            user,
            referrer_name,
            total_commission,
            downline_count,
        })
    }

    async fn update_user(&self, id: &str, name: &str, referrer_id: Option<&str>) -> AppResult<User> {
        let name = required_name(name)?;
        let referrer_id = normalize_referrer(referrer_id);

        if referrer_id == Some(id) {
            return Err(AppError::BadRequest("Cannot set self as referrer".to_string()));
        }

        if !self.users.user_id_exists(id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        if let Some(referrer_id) = referrer_id {
            self.ensure_referrer_exists(referrer_id).await?;
        }

        if let Some(existing) = self.users.get_user_by_name(name).await? {
            if existing.id != id {
                return Err(AppError::Conflict("User name already exists".to_string()));
            }
        }

        self.users
            .update_user(id, name, referrer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn delete_user(&self, id: &str) -> AppResult<UserDeletion> {
        self.users
            .delete_user_cascade(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{
        commission::model::CommissionDraft, prize::model::PrizeName, prize::repository::PrizeRepositoryTrait,
        user::repository::UserRepositoryTrait, MemoryStore,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service(store: &Arc<MemoryStore>) -> UserService {
        UserService::new(store.clone(), store.clone())
    }

    #[test]
    fn test_generate_user_id_format() {
        for _ in 0..50 {
            let id = generate_user_id();
            assert_eq!(id.len(), USER_ID_LENGTH);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[tokio::test]
    async fn test_create_user_with_referrer() {
        let store = Arc::new(MemoryStore::with_default_rules());
        let service = service(&store);

        let alice = service.create_user("alice", None).await.unwrap();
        let bob = service.create_user("  bob ", Some(&alice.id)).await.unwrap();

        assert_eq!(bob.name, "bob");
        assert_eq!(bob.referrer_id.as_deref(), Some(alice.id.as_str()));

        // 空字符串推荐人视为无推荐人
        let carol = service.create_user("carol", Some("")).await.unwrap();
        assert_eq!(carol.referrer_id, None);
    }

    #[tokio::test]
    async fn test_create_user_rejects_bad_input() {
        let store = Arc::new(MemoryStore::with_default_rules());
        let service = service(&store);
        service.create_user("alice", None).await.unwrap();

        assert!(matches!(service.create_user("   ", None).await, Err(AppError::BadRequest(_))));
        assert!(matches!(
            service.create_user("bob", Some("NOPE0000")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(service.create_user("alice", None).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_id_generation_exhausted() {
        let store = Arc::new(MemoryStore::with_default_rules());
        let service = UserService::with_id_generator(store.clone(), store.clone(), || "SAMEID01".to_string());

        service.create_user("first", None).await.unwrap();
        let result = service.create_user("second", None).await;

        assert!(matches!(result, Err(AppError::IdGenerationExhausted(MAX_USER_ID_ATTEMPTS))));
    }

    #[tokio::test]
    async fn test_taken_id_is_regenerated() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        // 第一次返回已被占用的ID，之后返回新的ID
        fn taken_then_fresh() -> String {
            match CALLS.fetch_add(1, Ordering::SeqCst) {
                0 => "TAKEN001".to_string(),
                n => format!("FRESH{:03}", n),
            }
        }

        let store = Arc::new(MemoryStore::with_default_rules());
        store.create_user("TAKEN001", "first", None).await.unwrap();
        let service = UserService::with_id_generator(store.clone(), store.clone(), taken_then_fresh);

        let user = service.create_user("second", None).await.unwrap();

        assert_eq!(user.id, "FRESH001");
        assert_eq!(store.get_user("TAKEN001").await.unwrap().unwrap().name, "first");
        assert_eq!(store.get_user("FRESH001").await.unwrap().unwrap().name, "second");
    }

    #[tokio::test]
    async fn test_update_user() {
        let store = Arc::new(MemoryStore::with_default_rules());
        let service = service(&store);
        let alice = service.create_user("alice", None).await.unwrap();
        let bob = service.create_user("bob", None).await.unwrap();

        let result = service.update_user(&bob.id, "bob", Some(&bob.id)).await;
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "Cannot set self as referrer"));

        let result = service.update_user(&bob.id, "alice", None).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let result = service.update_user("MISSING0", "ghost", None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let updated = service.update_user(&bob.id, "bobby", Some(&alice.id)).await.unwrap();
        assert_eq!(updated.name, "bobby");
        assert_eq!(updated.referrer_id.as_deref(), Some(alice.id.as_str()));

        let cleared = service.update_user(&bob.id, "bobby", Some("")).await.unwrap();
        assert_eq!(cleared.referrer_id, None);
    }

    #[tokio::test]
    async fn test_profile_and_listing() {
        let store = Arc::new(MemoryStore::with_default_rules());
        let service = service(&store);
        let alice = service.create_user("alice", None).await.unwrap();
        let bob = service.create_user("bob", Some(&alice.id)).await.unwrap();
        service.create_user("carol", Some(&alice.id)).await.unwrap();

        store
            .insert_prize_with_commissions(
                &bob.id,
                PrizeName::ComboA,
                vec![CommissionDraft {
                    user_id: alice.id.clone(),
                    level: 1,
                    amount: 150,
                }],
            )
            .await
            .unwrap();

        let profile = service.get_user_profile(&alice.id).await.unwrap();
        assert_eq!(profile.total_commission, 150);
        assert_eq!(profile.downline_count, 2);
        assert_eq!(profile.referrer_name, None);

        let profile = service.get_user_profile(&bob.id).await.unwrap();
        assert_eq!(profile.referrer_name.as_deref(), Some("alice"));

        let users = service.list_users().await.unwrap();
        assert_eq!(users.iter().map(|u| u.user.name.as_str()).collect::<Vec<_>>(), vec!["carol", "bob", "alice"]);
        assert_eq!(users[1].referrer_name.as_deref(), Some("alice"));

        assert!(matches!(service.get_user_profile("MISSING0").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let store = Arc::new(MemoryStore::with_default_rules());
        let service = service(&store);
        let alice = service.create_user("alice", None).await.unwrap();

        service.delete_user(&alice.id).await.unwrap();

        assert!(matches!(service.delete_user(&alice.id).await, Err(AppError::NotFound(_))));
    }
}
