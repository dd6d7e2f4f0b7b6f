////////////////////////////////////////////////////////////////////////
//
// 1. 每个Domain(Entity)单独一个文件夹
// 2. 每个Domain由两部分组成:
//    - model: 定义Schema
//    - repository: 仓库Trait以及MongoDB上的实现
// 3. memory: 同一组仓库Trait的进程内实现(测试/本地调试)
//
//////////////////////////////////////////////////////////////////////

use mongodb::{
    bson::doc,
    error::UNKNOWN_TRANSACTION_COMMIT_RESULT,
    options::{IndexOptions, TransactionOptions},
    Client, ClientSession, Collection, IndexModel,
};
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppConfig, AppResult};

pub mod commission;
pub mod commission_rule;
pub mod counter;
pub mod memory;
pub mod prize;
pub mod user;

pub use memory::MemoryStore;

/// 事务遇到 TransientTransactionError 时整笔重试的上限(含首次)
pub(crate) const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// users 集合上唯一索引的名称，插入冲突时据此区分是ID还是名称重复
pub const USER_ID_INDEX: &str = "users_id_unique";
pub const USER_NAME_INDEX: &str = "users_name_unique";

use commission::repository::CommissionRepositoryTrait;
use commission_rule::repository::CommissionRuleRepositoryTrait;
use prize::repository::PrizeRepositoryTrait;
use user::repository::UserRepositoryTrait;

/// 服务层所需的全部仓库能力
pub trait ReferralStore:
    UserRepositoryTrait + PrizeRepositoryTrait + CommissionRepositoryTrait + CommissionRuleRepositoryTrait + Send + Sync
{
}

impl<T> ReferralStore for T where
    T: UserRepositoryTrait + PrizeRepositoryTrait + CommissionRepositoryTrait + CommissionRuleRepositoryTrait + Send + Sync
{
}

#[derive(Clone, Debug)]
pub struct Database {
    client: Client,
    pub users: Collection<user::model::User>,
    pub prizes: Collection<prize::model::Prize>,
    pub commissions: Collection<commission::model::Commission>,
    pub commission_rules: Collection<commission_rule::model::CommissionRule>,
    pub counters: Collection<counter::Counter>,
}

impl Database {
    pub async fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let client = Client::with_uri_str(&config.mongo_uri).await?;
        let db: mongodb::Database = client.database(&config.mongo_db);

        let users = db.collection("users");
        let prizes = db.collection("prizes");
        let commissions = db.collection("commissions");
        let commission_rules = db.collection("commission_rules");
        let counters = db.collection("counters");

        info!("🧱 database({:#}) connected.", &config.mongo_db);

        Ok(Database {
            client,
            users,
            prizes,
            commissions,
            commission_rules,
            counters,
        })
    }

    /// 初始化唯一索引与查询索引
    pub async fn init_indexes(&self) -> AppResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();
        let named_unique = |name: &str| IndexOptions::builder().unique(true).name(name.to_string()).build();

        self.users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "id": 1 })
                    .options(named_unique(USER_ID_INDEX))
                    .build(),
                None,
            )
            .await?;
        self.users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(named_unique(USER_NAME_INDEX))
                    .build(),
                None,
            )
            .await?;
        self.users
            .create_index(IndexModel::builder().keys(doc! { "referrer_id": 1 }).build(), None)
            .await?;

        self.prizes
            .create_index(IndexModel::builder().keys(doc! { "id": 1 }).options(unique()).build(), None)
            .await?;
        self.prizes
            .create_index(IndexModel::builder().keys(doc! { "winner_id": 1 }).build(), None)
            .await?;

        self.commissions
            .create_index(IndexModel::builder().keys(doc! { "id": 1 }).options(unique()).build(), None)
            .await?;
        self.commissions
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1, "created_at": -1 }).build(), None)
            .await?;
        self.commissions
            .create_index(IndexModel::builder().keys(doc! { "winner_id": 1 }).build(), None)
            .await?;

        self.commission_rules
            .create_index(IndexModel::builder().keys(doc! { "level": 1 }).options(unique()).build(), None)
            .await?;

        info!("✅ 索引初始化完成");
        Ok(())
    }

    /// 开启一个事务会话，调用方负责 commit / abort
    pub(crate) async fn start_transaction(&self) -> AppResult<ClientSession> {
        let mut session = self.client.start_session(None).await?;
        session
            .start_transaction(TransactionOptions::builder().build())
            .await?;
        Ok(session)
    }

    /// 提交事务；提交结果未知时重试提交本身
    pub(crate) async fn commit_with_retry(session: &mut ClientSession) -> AppResult<()> {
        let mut attempt = 1;
        loop {
            match session.commit_transaction().await {
                Ok(()) => return Ok(()),
                Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    warn!("🔁 事务提交结果未知，重试提交({}/{}): {}", attempt, MAX_TRANSACTION_ATTEMPTS, e);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// 中止事务；中止失败只记录日志，保留原始错误返回给调用方
    pub(crate) async fn abort_quietly(session: &mut ClientSession) {
        if let Err(e) = session.abort_transaction().await {
            warn!("⚠️ 事务中止失败: {}", e);
        }
    }
}
