use crate::{
    user::model::{User, UserDeletion},
    Database, MAX_TRANSACTION_ATTEMPTS, USER_ID_INDEX,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    ClientSession,
};
use std::sync::Arc;
use tracing::{info, warn};
use utils::{duplicate_key_message, is_duplicate_key, AppError, AppResult};

pub type DynUserRepository = Arc<dyn UserRepositoryTrait + Send + Sync>;

// 主要用于Service中，表示提供了该Trait功能
#[async_trait]
pub trait UserRepositoryTrait {
    async fn user_id_exists(&self, id: &str) -> AppResult<bool>;

    // 建立会员(ID由服务层生成)
    async fn create_user(&self, id: &str, name: &str, referrer_id: Option<&str>) -> AppResult<User>;

    async fn get_user(&self, id: &str) -> AppResult<Option<User>>;

    async fn get_user_by_name(&self, name: &str) -> AppResult<Option<User>>;

    // 所有会员，新建的在前
    async fn list_users(&self) -> AppResult<Vec<User>>;

    async fn get_users_by_ids(&self, ids: &[String]) -> AppResult<Vec<User>>;

    async fn update_user(&self, id: &str, name: &str, referrer_id: Option<&str>) -> AppResult<Option<User>>;

    // 删除会员并级联删除其中奖与分润记录；会员不存在时返回 None
    async fn delete_user_cascade(&self, id: &str) -> AppResult<Option<UserDeletion>>;

    // 推荐人属于 referrer_ids 之一的所有会员
    async fn list_children(&self, referrer_ids: &[String]) -> AppResult<Vec<User>>;

    async fn count_children(&self, id: &str) -> AppResult<u64>;

    // since: 毫秒时间戳，None 表示全部
    async fn count_users(&self, since: Option<i64>) -> AppResult<u64>;
}

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": -1, "id": -1 }).build()
}

fn name_conflict(name: &str) -> AppError {
    AppError::Conflict(format!("User name {} already exists", name))
}

#[async_trait]
impl UserRepositoryTrait for Database {
    async fn user_id_exists(&self, id: &str) -> AppResult<bool> {
        let count = self.users.count_documents(doc! { "id": id }, None).await?;

        Ok(count > 0)
    }

    async fn create_user(&self, id: &str, name: &str, referrer_id: Option<&str>) -> AppResult<User> {
        let new_doc = User {
            id: id.to_string(),
            name: name.to_string(),
            referrer_id: referrer_id.map(str::to_string),
            created_at: Utc::now().timestamp_millis(),
        };

        match self.users.insert_one(&new_doc, None).await {
            Ok(_) => Ok(new_doc),
            Err(e) => match duplicate_key_message(&e) {
                Some(message) if message.contains(USER_ID_INDEX) => Err(AppError::UserIdTaken(id.to_string())),
                Some(_) => Err(name_conflict(name)),
                None => Err(e.into()),
            },
        }
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        let user = self.users.find_one(doc! { "id": id }, None).await?;

        Ok(user)
    }

    async fn get_user_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let user = self.users.find_one(doc! { "name": name }, None).await?;

        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let cursor = self.users.find(None, newest_first()).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn get_users_by_ids(&self, ids: &[String]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self.users.find(doc! { "id": { "$in": ids.to_vec() } }, None).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn update_user(&self, id: &str, name: &str, referrer_id: Option<&str>) -> AppResult<Option<User>> {
        let referrer = referrer_id.map_or(Bson::Null, |r| Bson::String(r.to_string()));
        let update = doc! { "$set": { "name": name, "referrer_id": referrer } };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        match self.users.find_one_and_update(doc! { "id": id }, update, options).await {
            Ok(user) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(name_conflict(name)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_user_cascade(&self, id: &str) -> AppResult<Option<UserDeletion>> {
        let mut attempt = 1;
        loop {
            let mut session = self.start_transaction().await?;

            let result = match self.delete_user_in_session(id, &mut session).await {
                Ok(Some(deletion)) => Self::commit_with_retry(&mut session).await.map(|_| Some(deletion)),
                Ok(None) => {
                    Self::abort_quietly(&mut session).await;
                    Ok(None)
                }
                Err(e) => {
                    Self::abort_quietly(&mut session).await;
                    Err(e)
                }
            };

            match result {
                Ok(Some(deletion)) => {
                    info!(
                        "🗑️ 会员 {} 已删除: prizes={}, commissions={}, referees={}",
                        id, deletion.deleted_prizes, deletion.deleted_commissions, deletion.detached_referees
                    );
                    return Ok(Some(deletion));
                }
                Ok(None) => return Ok(None),
                Err(e) if e.is_transient_transaction_error() && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    warn!("🔁 删除会员 {} 事务冲突，重试({}/{}): {}", id, attempt, MAX_TRANSACTION_ATTEMPTS, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_children(&self, referrer_ids: &[String]) -> AppResult<Vec<User>> {
        if referrer_ids.is_empty() {
            return Ok(Vec::new());
        }

        let options = FindOptions::builder().sort(doc! { "created_at": 1, "id": 1 }).build();
        let cursor = self
            .users
            .find(doc! { "referrer_id": { "$in": referrer_ids.to_vec() } }, options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn count_children(&self, id: &str) -> AppResult<u64> {
        let count = self.users.count_documents(doc! { "referrer_id": id }, None).await?;

        Ok(count)
    }

    async fn count_users(&self, since: Option<i64>) -> AppResult<u64> {
        let filter = since.map(|ts| doc! { "created_at": { "$gte": ts } });
        let count = self.users.count_documents(filter, None).await?;

        Ok(count)
    }
}

impl Database {
    async fn delete_user_in_session(&self, id: &str, session: &mut ClientSession) -> AppResult<Option<UserDeletion>> {
        let exists = self
            .users
            .find_one_with_session(doc! { "id": id }, None, session)
            .await?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let commission_filter: Document = doc! { "$or": [{ "user_id": id }, { "winner_id": id }] };
        let commissions = self
            .commissions
            .delete_many_with_session(commission_filter, None, session)
            .await?;

        let prizes = self
            .prizes
            .delete_many_with_session(doc! { "winner_id": id }, None, session)
            .await?;

        let referees = self
            .users
            .update_many_with_session(
                doc! { "referrer_id": id },
                doc! { "$set": { "referrer_id": Bson::Null } },
                None,
                session,
            )
            .await?;

        self.users
            .delete_one_with_session(doc! { "id": id }, None, session)
            .await?;

        Ok(Some(UserDeletion {
            deleted_prizes: prizes.deleted_count,
            deleted_commissions: commissions.deleted_count,
            detached_referees: referees.modified_count,
        }))
    }
}
