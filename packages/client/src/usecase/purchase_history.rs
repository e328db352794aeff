//! UseCase: 購入履歴の取得

use std::sync::Arc;

use crate::{domain::PurchaseRecord, session::SessionContext};

use super::error::HistoryError;

/// 購入履歴取得のユースケース
pub struct PurchaseHistoryUseCase {
    context: Arc<SessionContext>,
}

impl PurchaseHistoryUseCase {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self { context }
    }

    /// 読み込み済みの購入者の履歴を新しい順で返す
    pub async fn execute(&self) -> Result<Vec<PurchaseRecord>, HistoryError> {
        let Some(buyer) = self.context.buyer.read().await.clone() else {
            return Err(HistoryError::NoBuyer);
        };

        let mut records = self.context.api.purchase_history(&buyer).await?;
        records.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        tracing::debug!("Loaded {} past purchases", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ApiError, Buyer, EventId, MockTicketApi, Money, Timestamp},
        session::test_support::context_with,
    };

    fn record(purchased_at: i64) -> PurchaseRecord {
        PurchaseRecord {
            invoice_id: None,
            event_id: EventId::new(3),
            tickets: Vec::new(),
            subtotal: Money::ZERO,
            tax: Money::ZERO,
            total: Money::ZERO,
            purchased_at: Some(Timestamp::new(purchased_at)),
        }
    }

    #[tokio::test]
    async fn test_history_sorted_newest_first() {
        // テスト項目: 購入履歴が新しい順に並ぶ
        // given (前提条件):
        let mut api = MockTicketApi::new();
        api.expect_purchase_history()
            .withf(|buyer| buyer.national_id.as_str() == "1712345678")
            .times(1)
            .returning(|_| Ok(vec![record(1_000), record(3_000), record(2_000)]));
        let (context, _rx) = context_with(api);
        *context.buyer.write().await = Some(Buyer::new("Ana", "Pérez", "1712345678").unwrap());
        let usecase = PurchaseHistoryUseCase::new(context);

        // when (操作):
        let records = usecase.execute().await.unwrap();

        // then (期待する結果):
        let dates: Vec<_> = records.iter().map(|r| r.purchased_at.unwrap().value()).collect();
        assert_eq!(dates, vec![3_000, 2_000, 1_000]);
    }

    #[tokio::test]
    async fn test_history_requires_buyer() {
        // テスト項目: 購入者が未設定の場合はエラーになる
        // given (前提条件):
        let mut api = MockTicketApi::new();
        api.expect_purchase_history().never();
        let (context, _rx) = context_with(api);
        let usecase = PurchaseHistoryUseCase::new(context);

        // when (操作):
        let result = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(result, Err(HistoryError::NoBuyer));
    }

    #[tokio::test]
    async fn test_history_propagates_api_error() {
        // テスト項目: サービスのエラーがそのまま返る
        // given (前提条件):
        let mut api = MockTicketApi::new();
        api.expect_purchase_history()
            .returning(|_| Err(ApiError::Transport("connection refused".to_string())));
        let (context, _rx) = context_with(api);
        *context.buyer.write().await = Some(Buyer::new("Ana", "Pérez", "1712345678").unwrap());
        let usecase = PurchaseHistoryUseCase::new(context);

        // when (操作):
        let result = usecase.execute().await;

        // then (期待する結果):
        assert!(matches!(result, Err(HistoryError::Api(ApiError::Transport(_)))));
    }
}
