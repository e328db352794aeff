//! reqwest を使った TicketApi 実装
//!
//! ## 責務
//!
//! - REST エンドポイントの呼び出し（Bearer トークンの付与を含む）
//! - レスポンスのエンベロープ展開と DTO → ドメイン変換
//! - エラーレスポンスからのサーバーメッセージ抽出

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::{
    config::Endpoints,
    domain::{
        ApiError, Buyer, EventId, EventSummary, Invoice, PurchaseRecord, PurchaseRequest, Seat,
        SeatNumber, TicketApi,
    },
    infrastructure::dto::{
        conversion::event_summary_from_dto,
        envelope::{decode_payload, normalize_seat_snapshot},
        rest::{
            ErrorBodyDto, EventDto, HoldSeatsRequestDto, InvoiceDto, PurchaseRecordDto,
            PurchaseRequestDto,
        },
    },
};

/// HTTP client for the ticket service and the events API
#[derive(Debug, Clone)]
pub struct HttpTicketApi {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpTicketApi {
    pub fn new(endpoints: Endpoints) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { client, endpoints })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.endpoints.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        self.send(builder)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Turn a failed response into an `ApiError`, keeping the server's message
/// verbatim when the body carries one.
pub fn error_from_response(status: StatusCode, body: &str) -> ApiError {
    let from_json = serde_json::from_str::<ErrorBodyDto>(body)
        .ok()
        .and_then(ErrorBodyDto::into_message);

    let trimmed = body.trim();
    let from_text = (!trimmed.is_empty() && !trimmed.starts_with(['{', '[', '<']))
        .then(|| trimmed.to_string());

    let message = from_json
        .or(from_text)
        .unwrap_or_else(|| format!("HTTP {}", status));

    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl TicketApi for HttpTicketApi {
    async fn fetch_seats(&self, event_id: EventId) -> Result<Vec<Seat>, ApiError> {
        let url = self.endpoints.seats_url(event_id);
        tracing::debug!("Fetching seat snapshot from {}", url);

        let body = self.send_json(self.request(Method::GET, &url)).await?;
        normalize_seat_snapshot(body)?
            .into_iter()
            .map(|dto| Seat::try_from(dto).map_err(|e| ApiError::Decode(e.to_string())))
            .collect()
    }

    async fn hold_seats(&self, event_id: EventId, seats: Vec<SeatNumber>) -> Result<(), ApiError> {
        let body = HoldSeatsRequestDto {
            id_evento: event_id.value(),
            asientos: seats.iter().map(SeatNumber::value).collect(),
        };
        tracing::debug!("Requesting hold on seats {:?} of event {}", body.asientos, event_id);

        self.send(
            self.request(Method::POST, &self.endpoints.holds_url())
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn purchase(&self, request: PurchaseRequest) -> Result<Invoice, ApiError> {
        let body = PurchaseRequestDto::from(&request);
        tracing::debug!(
            "Submitting purchase of seats {:?} for event {}",
            body.asientos,
            body.id_evento
        );

        let response = self
            .send_json(
                self.request(Method::POST, &self.endpoints.purchases_url())
                    .json(&body),
            )
            .await?;
        decode_payload::<InvoiceDto>(response, "invoice")?.try_into()
    }

    async fn fetch_event(&self, event_id: EventId) -> Result<EventSummary, ApiError> {
        let url = self.endpoints.event_url(event_id);
        let body = self.send_json(self.request(Method::GET, &url)).await?;
        event_summary_from_dto(decode_payload::<EventDto>(body, "event")?, event_id)
    }

    async fn purchase_history(&self, buyer: &Buyer) -> Result<Vec<PurchaseRecord>, ApiError> {
        let url = self.endpoints.history_url(buyer.national_id.as_str());
        let body = self.send_json(self.request(Method::GET, &url)).await?;
        decode_payload::<Vec<PurchaseRecordDto>>(body, "purchase history")?
            .into_iter()
            .map(PurchaseRecord::try_from)
            .collect()
    }
}
