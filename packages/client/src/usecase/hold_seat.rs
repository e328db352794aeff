//! UseCase: 座席の保留（HOLD）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - HoldSeatUseCase::execute() メソッド
//! - 事前条件（AVAILABLE のみ・同一座席の二重リクエスト禁止）
//!
//! ### なぜこのテストが必要か
//! - 保留成功時に座席が選択に入り、サーバーの期限を取り直す同期が要求されることを保証
//! - 失敗時に座席が選択に入らず、座席単位のエラーが残ることを確認
//! - ローカル状態の反映が終わるまで in-flight が解除されないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：AVAILABLE の座席を保留
//! - 異常系：サーバーが保留を拒否
//! - エッジケース：保留中・販売済みの座席、リクエスト中の再要求

use std::{fmt, sync::Arc};

use crate::{
    domain::{ApiError, SeatNumber, SeatState},
    session::{SessionContext, SessionEvent},
    sync::trigger::SyncReason,
};

use super::error::HoldError;

/// Why a hold request was not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldIgnored {
    UnknownSeat,
    NotAvailable(SeatState),
    InFlight,
    SessionClosed,
}

impl fmt::Display for HoldIgnored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSeat => f.write_str("seat is not part of this event"),
            Self::NotAvailable(state) => write!(f, "seat is {}", state),
            Self::InFlight => f.write_str("a hold request for this seat is already running"),
            Self::SessionClosed => f.write_str("session closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldOutcome {
    Held(SeatNumber),
    Ignored(HoldIgnored),
}

/// 座席保留のユースケース
pub struct HoldSeatUseCase {
    context: Arc<SessionContext>,
}

impl HoldSeatUseCase {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self { context }
    }

    /// 座席の保留を実行
    ///
    /// # Returns
    ///
    /// * `Ok(HoldOutcome::Held)` - 保留成功（座席は HOLD・選択済み、期限は次の同期で取得）
    /// * `Ok(HoldOutcome::Ignored)` - 事前条件を満たさずリクエストしなかった
    /// * `Err(HoldError)` - サービスが保留を拒否した
    pub async fn execute(&self, number: SeatNumber) -> Result<HoldOutcome, HoldError> {
        let context = &self.context;
        if context.is_disposed() {
            return Ok(HoldOutcome::Ignored(HoldIgnored::SessionClosed));
        }

        // 1. 事前条件チェック
        {
            let state = context.state.lock().await;
            let Some(seat) = state.map.get(number) else {
                return Ok(self.ignore(number, HoldIgnored::UnknownSeat));
            };
            if !seat.state.is_available() {
                return Ok(self.ignore(number, HoldIgnored::NotAvailable(seat.state.clone())));
            }
        }
        if !context.holds_in_flight.lock().await.insert(number) {
            return Ok(self.ignore(number, HoldIgnored::InFlight));
        }
        context.hold_errors.lock().await.remove(&number);

        // 2. サービスに保留をリクエスト
        tracing::info!("Requesting hold on seat {}", number);
        let result = context
            .api
            .hold_seats(context.event_id, vec![number])
            .await;

        // 3. 結果をローカル状態に反映してから in-flight を解除
        let outcome = if context.is_disposed() {
            Ok(HoldOutcome::Ignored(HoldIgnored::SessionClosed))
        } else {
            self.apply_result(number, result).await
        };
        context.holds_in_flight.lock().await.remove(&number);
        outcome
    }

    async fn apply_result(
        &self,
        number: SeatNumber,
        result: Result<(), ApiError>,
    ) -> Result<HoldOutcome, HoldError> {
        let context = &self.context;
        match result {
            Ok(()) => {
                context.confirm_hold(number).await;
                context.trigger.request(SyncReason::HoldConfirmed(number));
                Ok(HoldOutcome::Held(number))
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Hold on seat {} failed: {}", number, message);

                // 選択への追加は成功時のみなので、巻き戻すローカル状態はない
                context
                    .hold_errors
                    .lock()
                    .await
                    .insert(number, message.clone());
                context.publish(SessionEvent::HoldFailed {
                    seat: number,
                    message: message.clone(),
                });
                context.trigger.request(SyncReason::HoldFailed(number));
                Err(HoldError::Rejected {
                    seat: number,
                    message,
                })
            }
        }
    }

    fn ignore(&self, number: SeatNumber, reason: HoldIgnored) -> HoldOutcome {
        tracing::info!("Ignoring hold on seat {}: {}", number, reason);
        HoldOutcome::Ignored(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SyncConfig,
        domain::{
            ApiError, Buyer, EventId, EventSummary, Invoice, MockTicketApi, PurchaseRecord,
            PurchaseRequest, Seat, TicketApi,
        },
        session::{
            SessionDeps,
            test_support::{NOW, context_with},
        },
    };
    use encuentro_shared::time::MonotonicClock;
    use tokio::sync::Notify;

    /// 保留リクエストをゲートが開くまで止めるフェイク
    struct GatedHoldApi {
        gate: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl TicketApi for GatedHoldApi {
        async fn fetch_seats(&self, _event_id: EventId) -> Result<Vec<Seat>, ApiError> {
            unimplemented!()
        }

        async fn hold_seats(
            &self,
            _event_id: EventId,
            _seats: Vec<SeatNumber>,
        ) -> Result<(), ApiError> {
            self.gate.notified().await;
            Ok(())
        }

        async fn purchase(&self, _request: PurchaseRequest) -> Result<Invoice, ApiError> {
            unimplemented!()
        }

        async fn fetch_event(&self, _event_id: EventId) -> Result<EventSummary, ApiError> {
            unimplemented!()
        }

        async fn purchase_history(
            &self,
            _buyer: &Buyer,
        ) -> Result<Vec<PurchaseRecord>, ApiError> {
            unimplemented!()
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn seat(n: u32) -> SeatNumber {
        SeatNumber::new(n).unwrap()
    }

    async fn seed(context: &SessionContext, seats: Vec<Seat>) {
        let epoch = context.epoch().await;
        assert!(context.apply_snapshot(seats, epoch).await);
    }

    #[tokio::test]
    async fn test_hold_available_seat_success() {
        // テスト項目: AVAILABLE の座席が保留され、選択に追加され同期が要求される
        // given (前提条件):
        let mut api = MockTicketApi::new();
        api.expect_hold_seats()
            .withf(|event_id, seats| *event_id == EventId::new(3) && seats == &vec![seat(4)])
            .times(1)
            .returning(|_, _| Ok(()));
        let (context, mut rx) = context_with(api);
        seed(&context, vec![Seat::new(seat(4), SeatState::Available, None)]).await;
        let usecase = HoldSeatUseCase::new(context.clone());

        // when (操作):
        let result = usecase.execute(seat(4)).await;

        // then (期待する結果):
        assert_eq!(result, Ok(HoldOutcome::Held(seat(4))));
        let state = context.state.lock().await;
        assert!(state.map.is_selected(seat(4)));
        assert_eq!(state.map.get(seat(4)).unwrap().state, SeatState::Hold);
        assert_eq!(state.map.get(seat(4)).unwrap().hold_expires_at, None);
        assert_eq!(rx.try_recv().unwrap(), SyncReason::HoldConfirmed(seat(4)));
    }

    #[tokio::test]
    async fn test_hold_rejected_by_server() {
        // テスト項目: サーバーが拒否した場合、選択に入らず座席単位のエラーが残る
        // given (前提条件):
        let mut api = MockTicketApi::new();
        api.expect_hold_seats().times(1).returning(|_, _| {
            Err(ApiError::Status {
                status: 409,
                message: "Asiento 4 no disponible".to_string(),
            })
        });
        let (context, mut rx) = context_with(api);
        seed(&context, vec![Seat::new(seat(4), SeatState::Available, None)]).await;
        let usecase = HoldSeatUseCase::new(context.clone());

        // when (操作):
        let result = usecase.execute(seat(4)).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(HoldError::Rejected {
                seat: seat(4),
                message: "Asiento 4 no disponible".to_string()
            })
        );
        assert!(!context.state.lock().await.map.is_selected(seat(4)));
        assert_eq!(
            context.hold_errors.lock().await.get(&seat(4)).map(String::as_str),
            Some("Asiento 4 no disponible")
        );
        assert_eq!(rx.try_recv().unwrap(), SyncReason::HoldFailed(seat(4)));
        assert!(!context.holds_in_flight.lock().await.contains(&seat(4)));
    }

    #[tokio::test]
    async fn test_hold_sold_seat_is_ignored() {
        // テスト項目: 販売済みの座席はリクエストせずに無視される
        // given (前提条件):
        let mut api = MockTicketApi::new();
        api.expect_hold_seats().never();
        let (context, _rx) = context_with(api);
        seed(&context, vec![Seat::new(seat(2), SeatState::Sold, None)]).await;
        let usecase = HoldSeatUseCase::new(context);

        // when (操作):
        let result = usecase.execute(seat(2)).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(HoldOutcome::Ignored(HoldIgnored::NotAvailable(SeatState::Sold)))
        );
    }

    #[tokio::test]
    async fn test_hold_unknown_seat_is_ignored() {
        // テスト項目: マップにない座席は無視される
        // given (前提条件):
        let mut api = MockTicketApi::new();
        api.expect_hold_seats().never();
        let (context, _rx) = context_with(api);
        let usecase = HoldSeatUseCase::new(context);

        // when (操作):
        let result = usecase.execute(seat(40)).await;

        // then (期待する結果):
        assert_eq!(result, Ok(HoldOutcome::Ignored(HoldIgnored::UnknownSeat)));
    }

    #[tokio::test]
    async fn test_hold_in_flight_is_ignored() {
        // テスト項目: 同じ座席のリクエスト中は二重にリクエストしない
        // given (前提条件):
        let mut api = MockTicketApi::new();
        api.expect_hold_seats().never();
        let (context, _rx) = context_with(api);
        seed(&context, vec![Seat::new(seat(6), SeatState::Available, None)]).await;
        context.holds_in_flight.lock().await.insert(seat(6));
        let usecase = HoldSeatUseCase::new(context);

        // when (操作):
        let result = usecase.execute(seat(6)).await;

        // then (期待する結果):
        assert_eq!(result, Ok(HoldOutcome::Ignored(HoldIgnored::InFlight)));
    }

    #[tokio::test]
    async fn test_in_flight_kept_until_local_state_updated() {
        // テスト項目: 応答後もローカル状態に反映し終わるまで in-flight が残り、その後に解除される
        // given (前提条件):
        let gate = Arc::new(Notify::new());
        let (context, _rx) = SessionContext::new(SessionDeps {
            event_id: EventId::new(3),
            api: Arc::new(GatedHoldApi { gate: gate.clone() }),
            clock: Arc::new(MonotonicClock::starting_at(NOW)),
            config: SyncConfig::default(),
        });
        seed(&context, vec![Seat::new(seat(4), SeatState::Available, None)]).await;
        let task = tokio::spawn({
            let context = context.clone();
            async move { HoldSeatUseCase::new(context).execute(seat(4)).await }
        });
        settle().await;

        // when (操作):
        let state = context.state.lock().await;
        gate.notify_one();
        settle().await;
        let in_flight_while_updating = context.holds_in_flight.lock().await.contains(&seat(4));
        drop(state);
        let result = task.await.unwrap();

        // then (期待する結果):
        assert!(in_flight_while_updating);
        assert_eq!(result, Ok(HoldOutcome::Held(seat(4))));
        assert!(context.state.lock().await.map.is_selected(seat(4)));
        assert!(!context.holds_in_flight.lock().await.contains(&seat(4)));
    }
}
