//! Seat map store: the authoritative-as-known seat collection and the
//! current user's selection.
//!
//! Every mutation is a synchronous in-memory update. Callers hold a single
//! lock around each call so snapshot/patch application and selection pruning
//! happen as one step.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    seat::{Seat, SeatPatch, SeatState},
    value_object::{SeatNumber, Timestamp},
};

/// Result of merging authoritative data into the map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Selected seats that are no longer held and were dropped from the selection
    pub dropped: Vec<SeatNumber>,
}

#[derive(Debug, Default)]
pub struct SeatMap {
    seats: BTreeMap<SeatNumber, Seat>,
    selection: BTreeSet<SeatNumber>,
    /// Bumped by local optimistic mutations; snapshots fetched before the
    /// latest bump are stale.
    epoch: u64,
}

impl SeatMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the whole map with a snapshot and prune the selection.
    pub fn apply_snapshot(&mut self, seats: Vec<Seat>) -> Reconciliation {
        self.seats = seats.into_iter().map(|seat| (seat.number, seat)).collect();
        Reconciliation {
            dropped: self.prune_selection(),
        }
    }

    /// Apply a snapshot whose fetch started at `fetched_at_epoch`.
    ///
    /// Returns `None` without touching the map when a local mutation happened
    /// after the fetch started.
    pub fn apply_snapshot_from(
        &mut self,
        seats: Vec<Seat>,
        fetched_at_epoch: u64,
    ) -> Option<Reconciliation> {
        if fetched_at_epoch != self.epoch {
            return None;
        }
        Some(self.apply_snapshot(seats))
    }

    /// Upsert one seat from a realtime patch.
    ///
    /// Never adds to the selection: a `HOLD` patch may belong to another buyer.
    pub fn apply_patch(&mut self, patch: SeatPatch) -> Reconciliation {
        let hold_expires_at = if patch.state.is_hold() {
            patch.hold_expires_at
        } else {
            None
        };

        self.seats
            .entry(patch.number)
            .and_modify(|seat| {
                seat.state = patch.state.clone();
                seat.hold_expires_at = hold_expires_at;
            })
            .or_insert_with(|| Seat::new(patch.number, patch.state.clone(), hold_expires_at));

        let mut dropped = Vec::new();
        if !patch.state.is_hold() && self.selection.remove(&patch.number) {
            dropped.push(patch.number);
        }
        Reconciliation { dropped }
    }

    /// Record a hold the server just granted to this user.
    ///
    /// The seat becomes `HOLD` with an unknown expiry until the next snapshot
    /// or patch supplies the server's value.
    pub fn confirm_hold(&mut self, number: SeatNumber) {
        self.seats
            .entry(number)
            .and_modify(|seat| {
                if !seat.state.is_hold() {
                    seat.state = SeatState::Hold;
                    seat.hold_expires_at = None;
                }
            })
            .or_insert_with(|| Seat::new(number, SeatState::Hold, None));
        self.selection.insert(number);
        self.epoch += 1;
    }

    /// Empty the selection, returning what was selected.
    pub fn clear_selection(&mut self) -> Vec<SeatNumber> {
        std::mem::take(&mut self.selection).into_iter().collect()
    }

    pub fn get(&self, number: SeatNumber) -> Option<&Seat> {
        self.seats.get(&number)
    }

    /// Seats ordered by number
    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn is_selected(&self, number: SeatNumber) -> bool {
        self.selection.contains(&number)
    }

    /// Selected seat numbers in ascending order
    pub fn selected(&self) -> Vec<SeatNumber> {
        self.selection.iter().copied().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    /// Soonest hold expiry later than `after` across all held seats.
    pub fn next_expiry(&self, after: Timestamp) -> Option<Timestamp> {
        self.seats
            .values()
            .filter_map(Seat::trusted_expiry)
            .filter(|expiry| *expiry > after)
            .min()
    }

    /// Held seats with a known expiry, for countdown timers.
    pub fn held_expiries(&self) -> Vec<(SeatNumber, Timestamp)> {
        self.seats
            .values()
            .filter_map(|seat| seat.trusted_expiry().map(|expiry| (seat.number, expiry)))
            .collect()
    }

    fn prune_selection(&mut self) -> Vec<SeatNumber> {
        let seats = &self.seats;
        let mut dropped = Vec::new();
        self.selection.retain(|number| {
            let still_held = seats
                .get(number)
                .is_some_and(|seat| seat.state.is_hold());
            if !still_held {
                dropped.push(*number);
            }
            still_held
        });
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat_no(n: u32) -> SeatNumber {
        SeatNumber::new(n).unwrap()
    }

    fn seat(n: u32, state: SeatState, expiry: Option<i64>) -> Seat {
        Seat::new(seat_no(n), state, expiry.map(Timestamp::new))
    }

    fn patch(n: u32, state: SeatState, expiry: Option<i64>) -> SeatPatch {
        SeatPatch {
            number: seat_no(n),
            state,
            hold_expires_at: expiry.map(Timestamp::new),
        }
    }

    fn sample_snapshot() -> Vec<Seat> {
        vec![
            seat(1, SeatState::Available, None),
            seat(2, SeatState::Hold, Some(20_000)),
            seat(3, SeatState::Sold, None),
            seat(4, SeatState::Hold, Some(10_000)),
        ]
    }

    #[test]
    fn test_apply_snapshot_is_idempotent() {
        // テスト項目: 同じスナップショットを 2 回適用しても結果が変わらない
        // given (前提条件):
        let mut once = SeatMap::new();
        let mut twice = SeatMap::new();
        once.confirm_hold(seat_no(2));
        twice.confirm_hold(seat_no(2));

        // when (操作):
        once.apply_snapshot(sample_snapshot());
        twice.apply_snapshot(sample_snapshot());
        let second = twice.apply_snapshot(sample_snapshot());

        // then (期待する結果):
        assert_eq!(
            once.seats().cloned().collect::<Vec<_>>(),
            twice.seats().cloned().collect::<Vec<_>>()
        );
        assert_eq!(once.selected(), twice.selected());
        assert_eq!(twice.selected(), vec![seat_no(2)]);
        assert!(second.dropped.is_empty());
    }

    #[test]
    fn test_apply_snapshot_prunes_seats_no_longer_held() {
        // テスト項目: HOLD でなくなった席・存在しない席は選択から外れる
        // given (前提条件):
        let mut map = SeatMap::new();
        map.confirm_hold(seat_no(1));
        map.confirm_hold(seat_no(4));
        map.confirm_hold(seat_no(9));

        // when (操作):
        let reconciliation = map.apply_snapshot(sample_snapshot());

        // then (期待する結果):
        assert_eq!(reconciliation.dropped, vec![seat_no(1), seat_no(9)]);
        assert_eq!(map.selected(), vec![seat_no(4)]);
        for number in map.selected() {
            assert!(map.get(number).unwrap().state.is_hold());
        }
    }

    #[test]
    fn test_foreign_hold_patch_does_not_select_seat() {
        // テスト項目: 他ユーザーの HOLD パッチで自分の選択に席が追加されない
        // given (前提条件):
        let mut map = SeatMap::new();
        map.apply_snapshot(vec![seat(7, SeatState::Available, None)]);

        // when (操作):
        map.apply_patch(patch(7, SeatState::Hold, Some(60_000)));

        // then (期待する結果):
        assert_eq!(map.get(seat_no(7)).unwrap().state, SeatState::Hold);
        assert!(!map.is_selected(seat_no(7)));
        assert_eq!(map.selected_count(), 0);
    }

    #[test]
    fn test_patch_leaving_hold_drops_selection_and_expiry() {
        // テスト項目: HOLD 以外へのパッチで選択と期限が解除される
        // given (前提条件):
        let mut map = SeatMap::new();
        map.apply_snapshot(sample_snapshot());
        map.confirm_hold(seat_no(4));

        // when (操作):
        let reconciliation = map.apply_patch(patch(4, SeatState::Available, Some(10_000)));

        // then (期待する結果):
        assert_eq!(reconciliation.dropped, vec![seat_no(4)]);
        assert!(!map.is_selected(seat_no(4)));
        assert_eq!(map.get(seat_no(4)).unwrap().hold_expires_at, None);
    }

    #[test]
    fn test_patch_inserts_unknown_seat() {
        // テスト項目: マップに存在しない席へのパッチは新規に追加される
        // given (前提条件):
        let mut map = SeatMap::new();

        // when (操作):
        map.apply_patch(patch(12, SeatState::Sold, None));

        // then (期待する結果):
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(seat_no(12)).unwrap().state, SeatState::Sold);
    }

    #[test]
    fn test_stale_snapshot_is_rejected_after_local_hold() {
        // テスト項目: ローカルでの HOLD 確定前に取得したスナップショットは破棄される
        // given (前提条件):
        let mut map = SeatMap::new();
        map.apply_snapshot(vec![seat(5, SeatState::Available, None)]);
        let fetched_at = map.epoch();
        map.confirm_hold(seat_no(5));

        // when (操作):
        let result = map.apply_snapshot_from(vec![seat(5, SeatState::Available, None)], fetched_at);

        // then (期待する結果):
        assert_eq!(result, None);
        assert!(map.is_selected(seat_no(5)));
        assert_eq!(map.get(seat_no(5)).unwrap().state, SeatState::Hold);
    }

    #[test]
    fn test_next_expiry_picks_soonest_future_hold() {
        // テスト項目: 未来の最も早い HOLD 期限が選ばれる
        // given (前提条件):
        let mut map = SeatMap::new();
        map.apply_snapshot(vec![
            seat(1, SeatState::Hold, Some(5_000)),
            seat(2, SeatState::Hold, Some(20_000)),
            seat(3, SeatState::Hold, Some(12_000)),
            seat(4, SeatState::Sold, Some(11_000)),
            seat(5, SeatState::Hold, None),
        ]);

        // when (操作):
        let next = map.next_expiry(Timestamp::new(6_000));

        // then (期待する結果):
        assert_eq!(next, Some(Timestamp::new(12_000)));
    }

    #[test]
    fn test_next_expiry_none_without_future_holds() {
        // テスト項目: 未来の HOLD 期限がなければタイマーは不要
        // given (前提条件):
        let mut map = SeatMap::new();
        map.apply_snapshot(vec![
            seat(1, SeatState::Hold, Some(5_000)),
            seat(2, SeatState::Available, None),
        ]);

        // when (操作):
        let next = map.next_expiry(Timestamp::new(5_000));

        // then (期待する結果):
        assert_eq!(next, None);
    }

    #[test]
    fn test_clear_selection_returns_previous_selection() {
        // テスト項目: 選択のクリアでそれまでの選択席が返される
        // given (前提条件):
        let mut map = SeatMap::new();
        map.confirm_hold(seat_no(2));
        map.confirm_hold(seat_no(5));

        // when (操作):
        let cleared = map.clear_selection();

        // then (期待する結果):
        assert_eq!(cleared, vec![seat_no(2), seat_no(5)]);
        assert_eq!(map.selected_count(), 0);
    }
}
