use crate::{
    commission::model::{Commission, CommissionDraft},
    counter::{COMMISSION_SEQUENCE, PRIZE_SEQUENCE},
    prize::model::{Prize, PrizeName},
    Database, MAX_TRANSACTION_ATTEMPTS,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, ClientSession};
use std::sync::Arc;
use tracing::{info, warn};
use utils::AppResult;

pub type DynPrizeRepository = Arc<dyn PrizeRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait PrizeRepositoryTrait {
    /// 写入中奖记录以及该笔中奖产生的全部分润
    ///
    /// 要么全部写入，要么全部不写入；返回的分润顺序与 `commissions` 一致。
    async fn insert_prize_with_commissions(
        &self,
        winner_id: &str,
        prize_name: PrizeName,
        commissions: Vec<CommissionDraft>,
    ) -> AppResult<(Prize, Vec<Commission>)>;

    // 所有中奖记录，新的在前
    async fn list_prizes(&self) -> AppResult<Vec<Prize>>;

    async fn get_prizes_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Prize>>;
}

#[async_trait]
impl PrizeRepositoryTrait for Database {
    async fn insert_prize_with_commissions(
        &self,
        winner_id: &str,
        prize_name: PrizeName,
        commissions: Vec<CommissionDraft>,
    ) -> AppResult<(Prize, Vec<Commission>)> {
        // 序号在事务外预留，重试时沿用同一批序号
        let prize_id = self.reserve_sequence(PRIZE_SEQUENCE, 1).await?;
        let first_commission_id = if commissions.is_empty() {
            0
        } else {
            self.reserve_sequence(COMMISSION_SEQUENCE, commissions.len() as i64)
                .await?
        };

        let mut attempt = 1;
        loop {
            let mut session = self.start_transaction().await?;

            let result = match self
                .write_prize_in_session(
                    prize_id,
                    first_commission_id,
                    winner_id,
                    prize_name,
                    commissions.clone(),
                    &mut session,
                )
                .await
            {
                Ok(written) => Self::commit_with_retry(&mut session).await.map(|_| written),
                Err(e) => {
                    Self::abort_quietly(&mut session).await;
                    Err(e)
                }
            };

            match result {
                Ok(written) => {
                    info!(
                        "🏆 中奖记录 #{} 已提交，分润 {} 笔",
                        written.0.id,
                        written.1.len()
                    );
                    return Ok(written);
                }
                Err(e) if e.is_transient_transaction_error() && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    warn!("🔁 中奖记录 #{} 事务冲突，重试({}/{}): {}", prize_id, attempt, MAX_TRANSACTION_ATTEMPTS, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_prizes(&self) -> AppResult<Vec<Prize>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1, "id": -1 }).build();
        let cursor = self.prizes.find(None, options).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn get_prizes_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Prize>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self.prizes.find(doc! { "id": { "$in": ids.to_vec() } }, None).await?;

        Ok(cursor.try_collect().await?)
    }
}

impl Database {
    async fn write_prize_in_session(
        &self,
        prize_id: i64,
        first_commission_id: i64,
        winner_id: &str,
        prize_name: PrizeName,
        drafts: Vec<CommissionDraft>,
        session: &mut ClientSession,
    ) -> AppResult<(Prize, Vec<Commission>)> {
        let created_at = Utc::now().timestamp_millis();

        let prize = Prize {
            id: prize_id,
            winner_id: winner_id.to_string(),
            prize_name,
            created_at,
        };
        self.prizes.insert_one_with_session(&prize, None, session).await?;

        if drafts.is_empty() {
            return Ok((prize, Vec::new()));
        }

        let commissions: Vec<Commission> = drafts
            .into_iter()
            .enumerate()
            .map(|(offset, draft)| draft.into_commission(first_commission_id + offset as i64, prize.id, winner_id, created_at))
            .collect();

        self.commissions
            .insert_many_with_session(&commissions, None, session)
            .await?;

        Ok((prize, commissions))
    }
}
