////////////////////////////////////////////////////////////////////////
//
// 1. 每个业务单独一个文件夹
// 2. 服务只依赖仓库Trait，MongoDB 与内存实现可以互换
//
//////////////////////////////////////////////////////////////////////

pub mod commission;
pub mod downline;
pub mod prize;
pub mod user;

use commission::commission_service::{CommissionService, DynCommissionService};
use database::{Database, ReferralStore};
use downline::downline_service::{DownlineService, DynDownlineService};
use prize::prize_service::{DynPrizeService, PrizeService};
use std::sync::Arc;
use tracing::info;
use user::user_service::{DynUserService, UserService};

#[derive(Clone)]
pub struct Services {
    pub user: DynUserService,
    pub prize: DynPrizeService,
    pub downline: DynDownlineService,
    pub commission: DynCommissionService,
}

impl Services {
    pub fn new(db: Database) -> Self {
        let services = Self::with_store(Arc::new(db));
        info!("🧠 services initialized with mongodb store");
        services
    }

    /// 用任意实现了全部仓库Trait的存储构建服务
    pub fn with_store<S: ReferralStore + 'static>(store: Arc<S>) -> Self {
        let user = Arc::new(UserService::new(store.clone(), store.clone())) as DynUserService;
        let prize = Arc::new(PrizeService::new(store.clone(), store.clone(), store.clone())) as DynPrizeService;
        let downline = Arc::new(DownlineService::new(store.clone(), store.clone())) as DynDownlineService;
        let commission =
            Arc::new(CommissionService::new(store.clone(), store.clone(), store)) as DynCommissionService;

        Self {
            user,
            prize,
            downline,
            commission,
        }
    }
}
