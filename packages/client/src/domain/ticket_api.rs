//! TicketApi trait 定義
//!
//! 同期クライアントが必要とするリモートサービスへのインターフェースを定義します。
//! 具体的な実装（reqwest による HTTP クライアント）は Infrastructure 層が提供します。
//!
//! ## 依存性の逆転（DIP）
//!
//! - Sync / UseCase 層はこの trait にのみ依存する
//! - テストでは mockall の自動モックや手書きのフェイクに差し替える

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::{
    buyer::Buyer,
    seat::Seat,
    value_object::{EventId, Money, SeatNumber, Timestamp},
};

/// Errors from the REST collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Request never produced an HTTP response
    #[error("Network error: {0}")]
    Transport(String),

    /// Non-success status; `message` is the server's message when it sent one
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Event details needed to price a purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub id: EventId,
    pub name: String,
    pub unit_price: Money,
    pub venue: Option<String>,
    pub date: Option<String>,
}

/// Body of a purchase request.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRequest {
    pub event_id: EventId,
    pub seats: Vec<SeatNumber>,
    pub buyer: Buyer,
    pub unit_price: Money,
}

/// Receipt returned by a successful purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: Option<Uuid>,
    pub event_id: EventId,
    pub seats: Vec<SeatNumber>,
    pub unit_price: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub created_at: Option<Timestamp>,
}

/// One ticket line of a past purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketLine {
    pub ticket_id: Option<Uuid>,
    pub seat: SeatNumber,
    pub unit_price: Money,
}

/// Entry of a buyer's purchase history.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub invoice_id: Option<Uuid>,
    pub event_id: EventId,
    pub tickets: Vec<TicketLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub purchased_at: Option<Timestamp>,
}

/// Ticket service and events API, as seen by the purchase view.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketApi: Send + Sync {
    /// Full seat snapshot of an event
    async fn fetch_seats(&self, event_id: EventId) -> Result<Vec<Seat>, ApiError>;

    /// Request a hold on the given seats for the current user
    async fn hold_seats(&self, event_id: EventId, seats: Vec<SeatNumber>) -> Result<(), ApiError>;

    /// Convert held seats into a purchase
    async fn purchase(&self, request: PurchaseRequest) -> Result<Invoice, ApiError>;

    /// Event details (name and unit price)
    async fn fetch_event(&self, event_id: EventId) -> Result<EventSummary, ApiError>;

    /// Past purchases of a buyer
    async fn purchase_history(&self, buyer: &Buyer) -> Result<Vec<PurchaseRecord>, ApiError>;
}
