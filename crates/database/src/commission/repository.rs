use crate::{commission::model::Commission, Database};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::FindOptions,
};
use std::sync::Arc;
use utils::{AppError, AppResult};

pub type DynCommissionRepository = Arc<dyn CommissionRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait CommissionRepositoryTrait {
    // 某个会员获得的分润，新的在前
    async fn list_commissions_for_user(&self, user_id: &str) -> AppResult<Vec<Commission>>;

    // 最近的分润记录(后台)
    async fn list_recent_commissions(&self, limit: i64) -> AppResult<Vec<Commission>>;

    // 分润金额合计；user_id / since(毫秒时间戳) 为空时不过滤
    async fn sum_commission_amount(&self, user_id: Option<&str>, since: Option<i64>) -> AppResult<i64>;
}

fn newest_first(limit: Option<i64>) -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "created_at": -1, "id": -1 })
        .limit(limit)
        .build()
}

#[async_trait]
impl CommissionRepositoryTrait for Database {
    async fn list_commissions_for_user(&self, user_id: &str) -> AppResult<Vec<Commission>> {
        let cursor = self
            .commissions
            .find(doc! { "user_id": user_id }, newest_first(None))
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn list_recent_commissions(&self, limit: i64) -> AppResult<Vec<Commission>> {
        let cursor = self.commissions.find(None, newest_first(Some(limit))).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn sum_commission_amount(&self, user_id: Option<&str>, since: Option<i64>) -> AppResult<i64> {
        let mut filter = Document::new();
        if let Some(user_id) = user_id {
            filter.insert("user_id", user_id);
        }
        if let Some(since) = since {
            filter.insert("created_at", doc! { "$gte": since });
        }

        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$amount" } } },
        ];

        let mut cursor = self.commissions.aggregate(pipeline, None).await?;
        match cursor.try_next().await? {
            Some(group) => read_total(&group),
            None => Ok(0),
        }
    }
}

// $sum 的结果类型取决于参与求和的数值类型
fn read_total(group: &Document) -> AppResult<i64> {
    match group.get("total") {
        Some(Bson::Int64(v)) => Ok(*v),
        Some(Bson::Int32(v)) => Ok(i64::from(*v)),
        Some(Bson::Double(v)) => Ok(*v as i64),
        other => Err(AppError::MalformedRecord(format!(
            "unexpected commission total: {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_total_numeric_types() {
        assert_eq!(read_total(&doc! { "total": 300_i64 }).unwrap(), 300);
        assert_eq!(read_total(&doc! { "total": 150_i32 }).unwrap(), 150);
        assert_eq!(read_total(&doc! { "total": 50.0_f64 }).unwrap(), 50);
        assert!(matches!(
            read_total(&doc! { "total": "abc" }),
            Err(AppError::MalformedRecord(_))
        ));
    }
}
