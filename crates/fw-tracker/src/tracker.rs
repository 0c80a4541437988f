//! The `Tracker` — authoritative state of every vehicle and the snapshot diff.
//!
//! # Cycle
//!
//! [`Tracker::apply_snapshot`] runs the rules in a fixed order:
//!
//! 1. resolve ambiguous removals flagged by an earlier cycle,
//! 2. station diff (all departures first, then all arrivals),
//! 3. free-floating diff (`booked` 0→1 rental, 1→0 return),
//! 4. drop ambiguous removals older than the grace window,
//! 5. close trips in transit longer than the lost-trip timeout.
//!
//! A vehicle that becomes `InTransit` during a cycle is remembered in
//! `rented_now` and cannot be classified as a return in the same cycle.

use fw_core::{GeoPoint, PlaceUid, StationKind, Timestamp, TrackerConfig, VehicleNumber, ZoneLookup};
use fw_feed::{FleetTotals, FreeSlot, Snapshot, Station};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    CompletedTrip, CycleReport, PendingReturn, Removal, Resolution, Ticket, TrackerStats, Tracked,
    TripEnd, TripStart, VehicleState,
};

// ── Policy ────────────────────────────────────────────────────────────────────

/// The heuristic windows, in seconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TrackerPolicy {
    pub confirmation_delay_secs: i64,
    pub removal_grace_secs:      i64,
    pub lost_trip_timeout_secs:  i64,
}

impl From<&TrackerConfig> for TrackerPolicy {
    fn from(config: &TrackerConfig) -> Self {
        let secs = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
        Self {
            confirmation_delay_secs: secs(config.confirmation_delay_secs),
            removal_grace_secs:      secs(config.removal_grace_secs),
            lost_trip_timeout_secs:  secs(config.lost_trip_timeout_secs),
        }
    }
}

impl Default for TrackerPolicy {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

// ── Occupancy memory ──────────────────────────────────────────────────────────

/// Last-seen state of a station.
pub(crate) struct StationMemo {
    pub(crate) name:      String,
    pub(crate) kind:      StationKind,
    pub(crate) position:  Option<GeoPoint>,
    pub(crate) vehicles:  FxHashSet<VehicleNumber>,
    pub(crate) last_seen: Timestamp,
}

impl StationMemo {
    fn new(station: &Station, vehicles: FxHashSet<VehicleNumber>, now: Timestamp) -> Self {
        Self {
            name: station.name.clone(),
            kind: station.kind,
            position: station.position,
            vehicles,
            last_seen: now,
        }
    }

    fn refresh(&mut self, station: &Station, vehicles: FxHashSet<VehicleNumber>, now: Timestamp) {
        *self = Self::new(station, vehicles, now);
    }
}

/// Last-seen state of a free-floating slot.
pub(crate) struct SlotMemo {
    pub(crate) occupant:  VehicleNumber,
    pub(crate) booked:    u32,
    pub(crate) position:  Option<GeoPoint>,
    pub(crate) last_seen: Timestamp,
}

impl SlotMemo {
    fn new(slot: &FreeSlot, occupant: VehicleNumber, now: Timestamp) -> Self {
        Self { occupant, booked: slot.booked, position: slot.position, last_seen: now }
    }
}

// ── Tracker ───────────────────────────────────────────────────────────────────

/// Effect of [`Tracker::apply_resolution`].
#[derive(Clone, Debug, PartialEq)]
pub enum Applied {
    /// The vehicle is back in transit with its original rental.
    Reopened,
    Completed(CompletedTrip),
    /// The ticket no longer matches: the return was superseded or drained.
    Stale,
}

/// Owns every vehicle's state.  Mutated only through `apply_snapshot`,
/// `apply_resolution`, and `drain_pending`.
pub struct Tracker {
    policy: TrackerPolicy,
    pub(crate) stations: FxHashMap<PlaceUid, StationMemo>,
    pub(crate) slots:    FxHashMap<PlaceUid, SlotMemo>,
    pub(crate) tracked:  FxHashMap<VehicleNumber, Tracked>,
    pub(crate) last_snapshot: Option<Timestamp>,
    pub(crate) totals: FleetTotals,
    next_ticket: u64,
    pub(crate) stats: TrackerStats,
}

impl Tracker {
    pub fn new(policy: TrackerPolicy) -> Self {
        Self {
            policy,
            stations: FxHashMap::default(),
            slots: FxHashMap::default(),
            tracked: FxHashMap::default(),
            last_snapshot: None,
            totals: FleetTotals::default(),
            next_ticket: 0,
            stats: TrackerStats::default(),
        }
    }

    pub fn policy(&self) -> TrackerPolicy {
        self.policy
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    pub fn last_snapshot(&self) -> Option<Timestamp> {
        self.last_snapshot
    }

    pub fn tracked(&self, vehicle: &VehicleNumber) -> Option<&Tracked> {
        self.tracked.get(vehicle)
    }

    pub fn in_transit_count(&self) -> usize {
        self.count(|t| matches!(t, Tracked::InTransit(_)))
    }

    pub fn pending_count(&self) -> usize {
        self.count(|t| matches!(t, Tracked::PendingReturn(_)))
    }

    pub fn ambiguous_count(&self) -> usize {
        self.count(|t| matches!(t, Tracked::AmbiguousRemoval(_)))
    }

    fn count(&self, pred: impl Fn(&Tracked) -> bool) -> usize {
        self.tracked.values().filter(|t| pred(t)).count()
    }

    /// Derived state of `vehicle`: the tracked map first, then the last-seen
    /// occupancy of stations and slots.
    pub fn state_of(&self, vehicle: &VehicleNumber) -> VehicleState {
        match self.tracked.get(vehicle) {
            Some(Tracked::InTransit(_))        => return VehicleState::InTransit,
            Some(Tracked::PendingReturn(_))    => return VehicleState::PendingReturn,
            Some(Tracked::AmbiguousRemoval(_)) => return VehicleState::AmbiguousRemoval,
            None => {}
        }
        if let Some((uid, _)) = self.stations.iter().find(|(_, m)| m.vehicles.contains(vehicle)) {
            return VehicleState::AtStation(*uid);
        }
        if let Some((uid, _)) = self.slots.iter().find(|(_, m)| &m.occupant == vehicle) {
            return VehicleState::FreeFloating(*uid);
        }
        VehicleState::Unknown
    }

    // ── Snapshot diff ─────────────────────────────────────────────────────

    /// Diff `snapshot` against the previous cycle and advance every vehicle.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, zones: &dyn ZoneLookup) -> CycleReport {
        let now = snapshot.taken_at;
        let mut report = CycleReport::new(now);
        self.stats.cycles += 1;
        self.totals = snapshot.totals;

        if self.last_snapshot.is_none() {
            self.record_baseline(snapshot);
            self.last_snapshot = Some(now);
            report.baseline = true;
            tracing::debug!(
                stations = self.stations.len(),
                slots = self.slots.len(),
                "baseline recorded"
            );
            return report;
        }

        let mut rented_now: FxHashSet<VehicleNumber> = FxHashSet::default();
        self.resolve_removals(snapshot, zones, &mut rented_now, &mut report);
        self.diff_stations(snapshot, &rented_now, &mut report);
        self.diff_slots(snapshot, zones, &mut rented_now, &mut report);
        self.sweep_removals(now, &mut report);
        self.sweep_lost(now, &mut report);
        self.forget_stale_slots(now);
        self.last_snapshot = Some(now);

        tracing::debug!(
            at = %now,
            departures = report.counters.departures,
            rentals = report.counters.rentals,
            returns = report.counters.returns,
            in_transit = self.in_transit_count(),
            pending = self.pending_count(),
            ambiguous = self.ambiguous_count(),
            "cycle applied"
        );
        report
    }

    fn record_baseline(&mut self, snapshot: &Snapshot) {
        let now = snapshot.taken_at;
        for station in &snapshot.stations {
            let vehicles = station.vehicle_numbers().cloned().collect();
            self.stations.insert(station.uid, StationMemo::new(station, vehicles, now));
        }
        for slot in &snapshot.slots {
            if let Some(occupant) = slot.occupant() {
                self.slots.insert(slot.uid, SlotMemo::new(slot, occupant.clone(), now));
            }
        }
    }

    /// Step 1: a vehicle that left a station in an earlier cycle shows up as
    /// the only vehicle of a free-floating slot.
    fn resolve_removals(
        &mut self,
        snapshot:   &Snapshot,
        zones:      &dyn ZoneLookup,
        rented_now: &mut FxHashSet<VehicleNumber>,
        report:     &mut CycleReport,
    ) {
        let mut flagged: Vec<VehicleNumber> = self
            .tracked
            .iter()
            .filter(|(_, t)| matches!(t, Tracked::AmbiguousRemoval(_)))
            .map(|(v, _)| v.clone())
            .collect();
        if flagged.is_empty() {
            return;
        }
        flagged.sort();

        let by_occupant: FxHashMap<&VehicleNumber, &FreeSlot> = snapshot
            .slots
            .iter()
            .filter_map(|slot| slot.sole_occupant().map(|v| (v, slot)))
            .collect();
        let now = snapshot.taken_at;

        for vehicle in flagged {
            let Some(slot) = by_occupant.get(&vehicle).copied() else { continue };
            let Some(Tracked::AmbiguousRemoval(removal)) = self.tracked.get(&vehicle) else {
                continue;
            };
            let start = removal.trip_start();

            match slot.booked {
                1 => {
                    tracing::info!(
                        vehicle = %vehicle,
                        station = %start.location,
                        "station rental: removed vehicle reappeared booked"
                    );
                    self.tracked.insert(vehicle.clone(), Tracked::InTransit(start));
                    rented_now.insert(vehicle);
                    report.counters.rentals += 1;
                    self.stats.rentals += 1;
                }
                0 => {
                    let end = TripEnd::free_floating(slot, zones, now);
                    tracing::info!(
                        vehicle = %vehicle,
                        station = %start.location,
                        zone = %end.location,
                        "removed vehicle reappeared unbooked, awaiting confirmation"
                    );
                    self.open_return(vehicle, start, end, report);
                }
                other => {
                    tracing::debug!(vehicle = %vehicle, booked = other, "removal stays ambiguous");
                }
            }
        }
    }

    /// Step 2.  Arrivals of vehicles rented this cycle are ignored.
    fn diff_stations(
        &mut self,
        snapshot:   &Snapshot,
        rented_now: &FxHashSet<VehicleNumber>,
        report:     &mut CycleReport,
    ) {
        let now = snapshot.taken_at;
        let mut arrivals: Vec<(&Station, Vec<VehicleNumber>)> = Vec::new();

        for station in &snapshot.stations {
            let current: FxHashSet<VehicleNumber> = station.vehicle_numbers().cloned().collect();
            let (mut departed, arrived, prev_seen) = match self.stations.get_mut(&station.uid) {
                Some(memo) => {
                    let departed: Vec<VehicleNumber> =
                        memo.vehicles.difference(&current).cloned().collect();
                    let arrived: Vec<VehicleNumber> =
                        current.difference(&memo.vehicles).cloned().collect();
                    let prev_seen = memo.last_seen;
                    memo.refresh(station, current, now);
                    (departed, arrived, prev_seen)
                }
                None => {
                    tracing::debug!(station = %station.name, uid = %station.uid, "new station");
                    self.stations.insert(station.uid, StationMemo::new(station, current, now));
                    continue;
                }
            };

            departed.sort();
            for vehicle in departed {
                self.depart(vehicle, station, prev_seen, now, report);
            }
            if !arrived.is_empty() {
                arrivals.push((station, arrived));
            }
        }

        for (station, mut vehicles) in arrivals {
            vehicles.sort();
            for vehicle in vehicles {
                if !rented_now.contains(&vehicle) {
                    self.arrive(vehicle, station, now, report);
                }
            }
        }
    }

    /// `prev_seen` is when the station last listed the vehicle.
    fn depart(
        &mut self,
        vehicle:   VehicleNumber,
        station:   &Station,
        prev_seen: Timestamp,
        now:       Timestamp,
        report:    &mut CycleReport,
    ) {
        match self.tracked.remove(&vehicle) {
            Some(Tracked::PendingReturn(pending)) => self.supersede(pending, report),
            Some(Tracked::InTransit(start)) => {
                // Reopened after a station return; the vehicle was docked here
                // all along, so the open trip ends at this station.
                tracing::warn!(
                    vehicle = %vehicle,
                    station = %station.name,
                    since = %start.time,
                    "vehicle in transit left a station; trip closed as returned there"
                );
                let trip = CompletedTrip::new(
                    vehicle.clone(),
                    start,
                    TripEnd::at_station(station, prev_seen),
                );
                report.counters.closed_at_departure += 1;
                self.stats.closed_at_departure += 1;
                self.stats.trips_completed += 1;
                report.completed.push(trip);
            }
            Some(Tracked::AmbiguousRemoval(_)) | None => {}
        }

        tracing::debug!(vehicle = %vehicle, station = %station.name, "vehicle left station");
        self.tracked.insert(
            vehicle,
            Tracked::AmbiguousRemoval(Removal {
                station:  station.uid,
                name:     station.name.clone(),
                kind:     station.kind,
                position: station.position,
                at:       now,
            }),
        );
        report.counters.departures += 1;
    }

    fn arrive(
        &mut self,
        vehicle: VehicleNumber,
        station: &Station,
        now:     Timestamp,
        report:  &mut CycleReport,
    ) {
        match self.tracked.get(&vehicle) {
            Some(Tracked::InTransit(_)) => {
                let Some(Tracked::InTransit(start)) = self.tracked.remove(&vehicle) else {
                    return;
                };
                let end = TripEnd::at_station(station, now);
                tracing::info!(
                    vehicle = %vehicle,
                    station = %station.name,
                    rented_at = %start.time,
                    "station return detected, awaiting confirmation"
                );
                self.open_return(vehicle, start, end, report);
            }
            Some(Tracked::AmbiguousRemoval(removal)) => {
                tracing::debug!(
                    vehicle = %vehicle,
                    from = %removal.name,
                    to = %station.name,
                    "removed vehicle redocked, no trip"
                );
                self.tracked.remove(&vehicle);
                report.counters.redocked += 1;
                self.stats.redocked += 1;
            }
            Some(Tracked::PendingReturn(_)) | None => {}
        }
    }

    /// Step 3.
    fn diff_slots(
        &mut self,
        snapshot:   &Snapshot,
        zones:      &dyn ZoneLookup,
        rented_now: &mut FxHashSet<VehicleNumber>,
        report:     &mut CycleReport,
    ) {
        let now = snapshot.taken_at;
        for slot in &snapshot.slots {
            let Some(occupant) = slot.occupant() else { continue };
            let prev_booked = match self.slots.get_mut(&slot.uid) {
                Some(memo) => {
                    let prev = memo.booked;
                    *memo = SlotMemo::new(slot, occupant.clone(), now);
                    prev
                }
                None => {
                    self.slots.insert(slot.uid, SlotMemo::new(slot, occupant.clone(), now));
                    continue;
                }
            };
            if rented_now.contains(occupant) {
                continue;
            }

            match (prev_booked, slot.booked) {
                (0, 1) => {
                    if let Some(Tracked::PendingReturn(pending)) = self.tracked.get(occupant) {
                        // The confirmation decides between a reopened trip and
                        // a return followed by a new rental.
                        tracing::debug!(
                            vehicle = %occupant,
                            ticket = %pending.ticket,
                            "booked again while awaiting confirmation"
                        );
                        continue;
                    }
                    match self.tracked.remove(occupant) {
                        Some(Tracked::InTransit(old)) => {
                            tracing::warn!(
                                vehicle = %occupant,
                                since = %old.time,
                                "rental seen while already in transit; return was missed"
                            );
                        }
                        Some(Tracked::PendingReturn(_) | Tracked::AmbiguousRemoval(_)) | None => {}
                    }
                    let start = TripStart::free_floating(slot, zones, now);
                    tracing::info!(
                        vehicle = %occupant,
                        zone = %start.location,
                        "free-floating rental"
                    );
                    self.tracked.insert(occupant.clone(), Tracked::InTransit(start));
                    rented_now.insert(occupant.clone());
                    report.counters.rentals += 1;
                    self.stats.rentals += 1;
                }
                (1, 0) => {
                    if !matches!(self.tracked.get(occupant), Some(Tracked::InTransit(_))) {
                        tracing::debug!(vehicle = %occupant, "slot unbooked for untracked vehicle");
                        continue;
                    }
                    let Some(Tracked::InTransit(start)) = self.tracked.remove(occupant) else {
                        continue;
                    };
                    let end = TripEnd::free_floating(slot, zones, now);
                    tracing::info!(
                        vehicle = %occupant,
                        zone = %end.location,
                        rented_at = %start.time,
                        "free-floating return detected, awaiting confirmation"
                    );
                    self.open_return(occupant.clone(), start, end, report);
                }
                _ => {}
            }
        }
    }

    /// Step 4: unresolved removals past the grace window.
    fn sweep_removals(&mut self, now: Timestamp, report: &mut CycleReport) {
        let grace = self.policy.removal_grace_secs;
        let mut expired: Vec<VehicleNumber> = self
            .tracked
            .iter()
            .filter_map(|(v, t)| match t {
                Tracked::AmbiguousRemoval(r) if now - r.at > grace => Some(v.clone()),
                _ => None,
            })
            .collect();
        expired.sort();

        for vehicle in expired {
            self.tracked.remove(&vehicle);
            tracing::info!(vehicle = %vehicle, "removal unresolved after grace window, dropped");
            report.counters.dropped += 1;
            self.stats.dropped += 1;
            report.dropped.push(vehicle);
        }
    }

    /// Step 5: trips open longer than the lost-trip timeout.
    fn sweep_lost(&mut self, now: Timestamp, report: &mut CycleReport) {
        let timeout = self.policy.lost_trip_timeout_secs;
        let mut lost: Vec<VehicleNumber> = self
            .tracked
            .iter()
            .filter_map(|(v, t)| match t {
                Tracked::InTransit(start) if now - start.time > timeout => Some(v.clone()),
                _ => None,
            })
            .collect();
        lost.sort();

        for vehicle in lost {
            let Some(Tracked::InTransit(start)) = self.tracked.remove(&vehicle) else { continue };
            tracing::info!(vehicle = %vehicle, rented_at = %start.time, "trip lost after timeout");
            let trip = CompletedTrip::new(vehicle, start, TripEnd::lost(now));
            report.counters.lost += 1;
            self.stats.lost += 1;
            self.stats.trips_completed += 1;
            report.completed.push(trip);
        }
    }

    fn forget_stale_slots(&mut self, now: Timestamp) {
        let timeout = self.policy.lost_trip_timeout_secs;
        self.slots.retain(|_, memo| now - memo.last_seen <= timeout);
    }

    fn open_return(
        &mut self,
        vehicle: VehicleNumber,
        start:   TripStart,
        end:     TripEnd,
        report:  &mut CycleReport,
    ) {
        self.next_ticket += 1;
        let pending = PendingReturn {
            confirm_at: end.time.offset_secs(self.policy.confirmation_delay_secs),
            vehicle: vehicle.clone(),
            start,
            end,
            ticket: Ticket(self.next_ticket),
        };
        report.to_confirm.push(pending.clone());
        report.counters.returns += 1;
        self.stats.returns += 1;
        self.tracked.insert(vehicle, Tracked::PendingReturn(pending));
    }

    /// A pending vehicle left a station before its confirmation: close the
    /// pending trip as detected.
    fn supersede(&mut self, pending: PendingReturn, report: &mut CycleReport) {
        tracing::info!(
            vehicle = %pending.vehicle,
            ticket = %pending.ticket,
            "pending return superseded, finalized as detected"
        );
        report.counters.superseded += 1;
        self.stats.superseded += 1;
        self.stats.trips_completed += 1;
        report.completed.push(pending.finalize_tentative());
    }

    // ── Confirmation ──────────────────────────────────────────────────────

    /// Apply a confirmation outcome for `vehicle`, provided its pending
    /// return still carries `ticket`.
    pub fn apply_resolution(
        &mut self,
        vehicle:    &VehicleNumber,
        ticket:     Ticket,
        resolution: Resolution,
    ) -> Applied {
        match self.tracked.get(vehicle) {
            Some(Tracked::PendingReturn(p)) if p.ticket == ticket => {}
            _ => return Applied::Stale,
        }
        let Some(Tracked::PendingReturn(pending)) = self.tracked.remove(vehicle) else {
            return Applied::Stale;
        };

        match resolution {
            Resolution::Reopen => {
                tracing::info!(vehicle = %vehicle, "still booked, trip reopened");
                self.tracked.insert(vehicle.clone(), Tracked::InTransit(pending.start));
                self.stats.reopened += 1;
                Applied::Reopened
            }
            Resolution::Finalize(end) => {
                let trip = CompletedTrip::new(pending.vehicle, pending.start, end);
                self.stats.trips_completed += 1;
                Applied::Completed(trip)
            }
        }
    }

    /// Close every pending return with its tentative fields.  Used at
    /// shutdown so no detected trip is lost.
    pub fn drain_pending(&mut self) -> Vec<CompletedTrip> {
        let mut vehicles: Vec<VehicleNumber> = self
            .tracked
            .iter()
            .filter(|(_, t)| matches!(t, Tracked::PendingReturn(_)))
            .map(|(v, _)| v.clone())
            .collect();
        vehicles.sort();

        let mut trips = Vec::with_capacity(vehicles.len());
        for vehicle in vehicles {
            if let Some(Tracked::PendingReturn(pending)) = self.tracked.remove(&vehicle) {
                self.stats.trips_completed += 1;
                trips.push(pending.finalize_tentative());
            }
        }
        trips
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerPolicy::default())
    }
}
