use crate::Database;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use utils::{AppError, AppResult};

pub const PRIZE_SEQUENCE: &str = "prizes";
pub const COMMISSION_SEQUENCE: &str = "commissions";

/// 自增序号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub name: String,
    pub seq: i64,
}

impl Database {
    /// 一次预留 `count` 个连续序号，返回第一个
    ///
    /// 不参与事务；事务中止时预留的序号作废，序号允许出现空洞。
    pub(crate) async fn reserve_sequence(&self, name: &str, count: i64) -> AppResult<i64> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": count } }, options)
            .await?
            .ok_or_else(|| AppError::InternalServerErrorWithContext(format!("sequence {} missing after upsert", name)))?;

        Ok(counter.seq - count + 1)
    }
}
