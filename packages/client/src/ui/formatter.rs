//! Text rendering of the purchase view.

use encuentro_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{EventSummary, PricingTotals, PurchaseRecord, Seat, SeatState, Timestamp},
    session::{PurchaseConfirmation, Route, SessionEvent},
    sync::format_remaining,
};

const RULE: &str = "============================================================";

/// Everything the view shows for one seat.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatLine {
    pub seat: Seat,
    pub selected: bool,
    pub remaining_secs: Option<u64>,
    pub hold_pending: bool,
    pub error: Option<String>,
}

pub struct SeatFormatter;

impl SeatFormatter {
    /// Format the seat map, one seat per line
    pub fn format_seat_map(lines: &[SeatLine]) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\nSeats:\n", RULE));

        if lines.is_empty() {
            output.push_str("(No seats loaded yet)\n");
        }
        for line in lines {
            let marker = if line.selected { "*" } else { " " };
            let state = match &line.seat.state {
                SeatState::Unknown(raw) => format!("? {}", raw),
                other => other.to_string(),
            };
            output.push_str(&format!("{} {:>4}  {:<10}", marker, line.seat.number.value(), state));

            if line.hold_pending {
                output.push_str(" holding...");
            }
            if let Some(secs) = line.remaining_secs {
                output.push_str(&format!(" {}", format_remaining(secs)));
            } else if line.seat.state.is_hold() && line.selected {
                output.push_str(" --:--");
            }
            if let Some(error) = &line.error {
                output.push_str(&format!(" ! {}", error));
            }
            output.push('\n');
        }

        output.push_str(&format!("{}\n", RULE));
        output
    }

    pub fn format_totals(totals: Option<&PricingTotals>) -> String {
        match totals {
            Some(totals) => format!(
                "{} x {} seat(s)\nSubtotal: {}\nIVA 12%:  {}\nTotal:    {}\n",
                totals.unit_price, totals.quantity, totals.subtotal, totals.tax, totals.total
            ),
            None => "Unit price unknown\n".to_string(),
        }
    }

    pub fn format_event(event: &EventSummary) -> String {
        let mut output = format!("\n{} (event {})\n", event.name, event.id);
        if let Some(venue) = &event.venue {
            output.push_str(&format!("Venue: {}\n", venue));
        }
        if let Some(date) = &event.date {
            output.push_str(&format!("Date:  {}\n", date));
        }
        output.push_str(&format!("Price: {} per seat\n", event.unit_price));
        output
    }

    pub fn format_confirmation(confirmation: &PurchaseConfirmation) -> String {
        let invoice = &confirmation.invoice;
        let seats = invoice
            .seats
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mut output = format!(
            "\n{}\nPurchase confirmed: {} seat(s)\n",
            RULE, confirmation.seat_count
        );
        if let Some(id) = invoice.id {
            output.push_str(&format!("Invoice: {}\n", id));
        }
        output.push_str(&format!(
            "Seats: {}\nSubtotal: {}\nIVA:      {}\nTotal:    {}\n{}\n",
            seats, invoice.subtotal, invoice.tax, invoice.total, RULE
        ));
        output
    }

    pub fn format_history(records: &[PurchaseRecord]) -> String {
        let mut output = format!("\n{}\nMy purchases:\n", RULE);
        if records.is_empty() {
            output.push_str("(No purchases)\n");
        }
        for record in records {
            let seats = record
                .tickets
                .iter()
                .map(|ticket| ticket.seat.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            output.push_str(&format!(
                "Event {} - seats [{}] - total {} - {}\n",
                record.event_id,
                seats,
                record.total,
                format_date(record.purchased_at)
            ));
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Notification line for a session event, if the view shows one.
    pub fn format_session_event(event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::SeatsChanged { dropped } if !dropped.is_empty() => {
                let seats = dropped
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("\n- Hold released on seat(s) {}\n", seats))
            }
            SessionEvent::SeatsChanged { .. } => None,
            SessionEvent::RealtimeConnected => Some("\n~ Live updates connected\n".to_string()),
            SessionEvent::RealtimeDegraded(reason) => {
                Some(format!("\n~ Live updates unavailable ({}), polling\n", reason))
            }
            SessionEvent::SyncFailed(reason) => {
                Some(format!("\n~ Could not refresh seats: {}\n", reason))
            }
            SessionEvent::HoldFailed { seat, message } => {
                Some(format!("\n! Seat {}: {}\n", seat, message))
            }
            SessionEvent::Purchased(confirmation) => Some(Self::format_confirmation(confirmation)),
            SessionEvent::PurchaseFailed(message) => {
                Some(format!("\n! Purchase failed: {}\n", message))
            }
            SessionEvent::Navigate(Route::PurchaseHistory) => None,
        }
    }

    pub fn format_help() -> String {
        "Commands: seats | hold <n> | buy | totals | history | help | quit\n".to_string()
    }
}

fn format_date(timestamp: Option<Timestamp>) -> String {
    timestamp
        .and_then(|ts| timestamp_to_rfc3339(ts.value()))
        .unwrap_or_else(|| "unknown date".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, Invoice, Money, SeatNumber, TicketLine};

    fn seat(n: u32) -> SeatNumber {
        SeatNumber::new(n).unwrap()
    }

    #[test]
    fn test_format_seat_map_marks_selection_and_countdown() {
        // テスト項目: 選択中の座席に印と残り時間が表示される
        // given (前提条件):
        let lines = vec![
            SeatLine {
                seat: Seat::new(seat(1), SeatState::Available, None),
                selected: false,
                remaining_secs: None,
                hold_pending: false,
                error: None,
            },
            SeatLine {
                seat: Seat::new(seat(2), SeatState::Hold, Some(Timestamp::new(0))),
                selected: true,
                remaining_secs: Some(65),
                hold_pending: false,
                error: None,
            },
        ];

        // when (操作):
        let result = SeatFormatter::format_seat_map(&lines);

        // then (期待する結果):
        assert!(result.contains("     1  AVAILABLE"));
        assert!(result.contains("*    2  HOLD       01:05"));
    }

    #[test]
    fn test_format_seat_map_empty() {
        // テスト項目: 座席がない場合は読み込み待ちと表示される
        // given (前提条件):
        let lines = vec![];

        // when (操作):
        let result = SeatFormatter::format_seat_map(&lines);

        // then (期待する結果):
        assert!(result.contains("(No seats loaded yet)"));
    }

    #[test]
    fn test_format_seat_map_shows_hold_error() {
        // テスト項目: 座席単位のエラーが行に表示される
        // given (前提条件):
        let lines = vec![SeatLine {
            seat: Seat::new(seat(7), SeatState::Available, None),
            selected: false,
            remaining_secs: None,
            hold_pending: false,
            error: Some("Asiento 7 no disponible".to_string()),
        }];

        // when (操作):
        let result = SeatFormatter::format_seat_map(&lines);

        // then (期待する結果):
        assert!(result.contains("! Asiento 7 no disponible"));
    }

    #[test]
    fn test_format_totals() {
        // テスト項目: 合計が小計・IVA・総額の形式で表示される
        // given (前提条件):
        let totals = PricingTotals::compute(Money::from_cents(5_000), 3);

        // when (操作):
        let result = SeatFormatter::format_totals(Some(&totals));

        // then (期待する結果):
        assert!(result.contains("Subtotal: $150.00"));
        assert!(result.contains("IVA 12%:  $18.00"));
        assert!(result.contains("Total:    $168.00"));
    }

    #[test]
    fn test_format_confirmation() {
        // テスト項目: 購入確認に席数と総額が表示される
        // given (前提条件):
        let confirmation = PurchaseConfirmation {
            invoice: Invoice {
                id: None,
                event_id: EventId::new(3),
                seats: vec![seat(2), seat(5)],
                unit_price: Money::from_cents(5_000),
                subtotal: Money::from_cents(10_000),
                tax: Money::from_cents(1_200),
                total: Money::from_cents(11_200),
                created_at: None,
            },
            seat_count: 2,
        };

        // when (操作):
        let result = SeatFormatter::format_confirmation(&confirmation);

        // then (期待する結果):
        assert!(result.contains("Purchase confirmed: 2 seat(s)"));
        assert!(result.contains("Seats: 2, 5"));
        assert!(result.contains("Total:    $112.00"));
    }

    #[test]
    fn test_format_history() {
        // テスト項目: 購入履歴にイベント・座席・日付が表示される
        // given (前提条件):
        let records = vec![PurchaseRecord {
            invoice_id: None,
            event_id: EventId::new(3),
            tickets: vec![TicketLine {
                ticket_id: None,
                seat: seat(4),
                unit_price: Money::from_cents(5_000),
            }],
            subtotal: Money::from_cents(5_000),
            tax: Money::from_cents(600),
            total: Money::from_cents(5_600),
            purchased_at: Some(Timestamp::new(1_735_725_600_000)),
        }];

        // when (操作):
        let result = SeatFormatter::format_history(&records);

        // then (期待する結果):
        assert!(result.contains("Event 3 - seats [4] - total $56.00 - 2025-01-01T10:00:00Z"));
    }

    #[test]
    fn test_format_session_event_skips_plain_map_change() {
        // テスト項目: 選択に影響しないマップ更新は通知されない
        // given (前提条件):
        let event = SessionEvent::SeatsChanged { dropped: vec![] };

        // when (操作):
        let result = SeatFormatter::format_session_event(&event);

        // then (期待する結果):
        assert_eq!(result, None);
    }
}
