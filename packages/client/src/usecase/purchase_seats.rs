//! UseCase: 選択中の座席の購入
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PurchaseSeatsUseCase::execute() メソッド
//! - 事前条件（選択あり・購入者あり・単価あり・購入処理中でない）
//!
//! ### なぜこのテストが必要か
//! - 購入成功で選択が空になり、確認情報が記録されることを保証
//! - 失敗時にサーバーのメッセージがそのまま返り、自動リトライしないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 席の購入
//! - 異常系：サーバーが購入を拒否
//! - エッジケース：選択なし・購入者なし・二重送信

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    domain::PurchaseRequest,
    session::{PurchaseConfirmation, Route, SessionContext, SessionEvent},
    sync::trigger::SyncReason,
};

use super::error::PurchaseError;

/// Why the purchase action is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseDisabled {
    EmptySelection,
    NoBuyer,
    UnknownPrice,
    InFlight,
    SessionClosed,
}

impl fmt::Display for PurchaseDisabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::EmptySelection => "no seats selected",
            Self::NoBuyer => "buyer details not loaded",
            Self::UnknownPrice => "unit price unknown",
            Self::InFlight => "a purchase is already being processed",
            Self::SessionClosed => "session closed",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Purchased(PurchaseConfirmation),
    Disabled(PurchaseDisabled),
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 座席購入のユースケース
pub struct PurchaseSeatsUseCase {
    context: Arc<SessionContext>,
}

impl PurchaseSeatsUseCase {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self { context }
    }

    /// 購入を実行
    ///
    /// # Returns
    ///
    /// * `Ok(PurchaseOutcome::Purchased)` - 購入成功（選択は空、リダイレクト予約済み）
    /// * `Ok(PurchaseOutcome::Disabled)` - 事前条件を満たさずリクエストしなかった
    /// * `Err(PurchaseError)` - サービスが購入を拒否した（リトライしない）
    pub async fn execute(&self) -> Result<PurchaseOutcome, PurchaseError> {
        let context = &self.context;
        if context.is_disposed() {
            return Ok(PurchaseOutcome::Disabled(PurchaseDisabled::SessionClosed));
        }
        if context.purchase_in_flight.swap(true, Ordering::AcqRel) {
            return Ok(self.disable(PurchaseDisabled::InFlight));
        }
        let _guard = InFlightGuard(&context.purchase_in_flight);

        // 1. 事前条件チェック
        let seats = context.state.lock().await.map.selected();
        if seats.is_empty() {
            return Ok(self.disable(PurchaseDisabled::EmptySelection));
        }
        let Some(buyer) = context.buyer.read().await.clone() else {
            return Ok(self.disable(PurchaseDisabled::NoBuyer));
        };
        let Some(unit_price) = *context.unit_price.read().await else {
            return Ok(self.disable(PurchaseDisabled::UnknownPrice));
        };

        // 2. サービスに購入をリクエスト
        tracing::info!("Purchasing seats {:?} of event {}", seats, context.event_id);
        let seat_count = seats.len();
        let result = context
            .api
            .purchase(PurchaseRequest {
                event_id: context.event_id,
                seats,
                buyer,
                unit_price,
            })
            .await;

        if context.is_disposed() {
            return Ok(PurchaseOutcome::Disabled(PurchaseDisabled::SessionClosed));
        }

        // 3. 結果を反映
        match result {
            Ok(invoice) => {
                context.state.lock().await.map.clear_selection();
                let confirmation = PurchaseConfirmation {
                    invoice,
                    seat_count,
                };
                tracing::info!(
                    "Purchase confirmed: {} seats, total {}",
                    seat_count,
                    confirmation.invoice.total
                );
                *context.confirmation.lock().await = Some(confirmation.clone());
                context.publish(SessionEvent::Purchased(confirmation.clone()));
                context.trigger.request(SyncReason::PurchaseSettled);
                self.schedule_redirect();
                Ok(PurchaseOutcome::Purchased(confirmation))
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Purchase failed: {}", message);
                context.publish(SessionEvent::PurchaseFailed(message.clone()));
                context.trigger.request(SyncReason::PurchaseSettled);
                Err(PurchaseError::Rejected(message))
            }
        }
    }

    fn disable(&self, reason: PurchaseDisabled) -> PurchaseOutcome {
        tracing::info!("Purchase unavailable: {}", reason);
        PurchaseOutcome::Disabled(reason)
    }

    /// Ask the view to move to the purchase history after the redirect delay.
    fn schedule_redirect(&self) {
        let context = Arc::clone(&self.context);
        let deadline = tokio::time::Instant::now() + context.config.redirect_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = context.token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    context.publish(SessionEvent::Navigate(Route::PurchaseHistory));
                }
            }
        });
    }
}
