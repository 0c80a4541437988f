//! Normalized, single-city view of one feed fetch.

use fw_core::{CityUid, GeoPoint, PlaceUid, StationKind, Timestamp, VehicleNumber};
use serde::Serialize;

use crate::raw::{RawFeed, RawPlace};
use crate::{FeedError, FeedResult};

// ── Places ────────────────────────────────────────────────────────────────────

/// One vehicle listed at a place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VehicleEntry {
    pub number: VehicleNumber,
    /// The feed's `active` flag; `None` when the place only listed numbers.
    pub active: Option<bool>,
}

impl VehicleEntry {
    pub fn new(number: impl Into<VehicleNumber>) -> Self {
        Self { number: number.into(), active: None }
    }
}

/// Capacity counters reported for a station.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RackCounts {
    pub bikes:             u32,
    pub available_to_rent: u32,
    pub bike_racks:        u32,
    pub free_racks:        u32,
    pub special_racks:     u32,
}

/// A docking station (physical or virtual terminal).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Station {
    pub uid:      PlaceUid,
    pub name:     String,
    pub kind:     StationKind,
    pub position: Option<GeoPoint>,
    /// Vehicles currently docked.  Order carries no meaning.
    pub vehicles: Vec<VehicleEntry>,
    /// The station-level booking counter.
    pub booked:   u32,
    pub racks:    RackCounts,
}

impl Station {
    pub fn new(
        uid:      PlaceUid,
        name:     impl Into<String>,
        kind:     StationKind,
        position: GeoPoint,
        vehicles: &[&str],
    ) -> Self {
        Self {
            uid,
            name: name.into(),
            kind,
            position: Some(position),
            vehicles: vehicles.iter().map(|&v| VehicleEntry::new(v)).collect(),
            booked: 0,
            racks: RackCounts { bikes: vehicles.len() as u32, ..RackCounts::default() },
        }
    }

    pub fn vehicle_numbers(&self) -> impl Iterator<Item = &VehicleNumber> {
        self.vehicles.iter().map(|v| &v.number)
    }
}

/// A free-floating position holding zero or more vehicles.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FreeSlot {
    pub uid:      PlaceUid,
    pub position: Option<GeoPoint>,
    pub vehicles: Vec<VehicleEntry>,
    pub booked:   u32,
}

impl FreeSlot {
    pub fn new(uid: PlaceUid, position: GeoPoint, vehicle: &str, booked: u32) -> Self {
        Self {
            uid,
            position: Some(position),
            vehicles: vec![VehicleEntry::new(vehicle)],
            booked,
        }
    }

    /// The vehicle this slot stands for.  The feed lists one vehicle per
    /// free-floating place; if it ever lists more, the first one wins.
    pub fn occupant(&self) -> Option<&VehicleNumber> {
        self.vehicles.first().map(|v| &v.number)
    }

    /// The occupant, only if it is the one vehicle listed here.
    pub fn sole_occupant(&self) -> Option<&VehicleNumber> {
        match self.vehicles.as_slice() {
            [only] => Some(&only.number),
            _ => None,
        }
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Fleet-wide counters reported at country level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FleetTotals {
    pub booked:    u32,
    pub set_point: u32,
    pub available: u32,
}

/// Every station and free-floating slot of one city at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub taken_at: Timestamp,
    pub stations: Vec<Station>,
    pub slots:    Vec<FreeSlot>,
    /// Summed over the countries that contain the city.
    pub totals:   FleetTotals,
}

/// Where a vehicle was found in a snapshot.
#[derive(Copy, Clone, Debug)]
pub enum Whereabouts<'a> {
    Station(&'a Station),
    Slot(&'a FreeSlot),
}

/// A vehicle located in a snapshot together with its place.
#[derive(Copy, Clone, Debug)]
pub struct Sighting<'a> {
    pub place:   Whereabouts<'a>,
    pub vehicle: &'a VehicleEntry,
}

impl Sighting<'_> {
    /// The place still counts a booking and the vehicle itself is flagged
    /// inactive: the rental has not really ended yet.  A vehicle without an
    /// `active` flag counts as active.
    pub fn still_booked(&self) -> bool {
        let booked = match self.place {
            Whereabouts::Station(s) => s.booked,
            Whereabouts::Slot(s)    => s.booked,
        };
        booked > 0 && self.vehicle.active == Some(false)
    }

    pub fn position(&self) -> Option<GeoPoint> {
        match self.place {
            Whereabouts::Station(s) => s.position,
            Whereabouts::Slot(s)    => s.position,
        }
    }
}

impl Snapshot {
    pub fn empty(taken_at: Timestamp) -> Self {
        Self::new(taken_at, Vec::new(), Vec::new())
    }

    /// A snapshot without fleet totals.
    pub fn new(taken_at: Timestamp, stations: Vec<Station>, slots: Vec<FreeSlot>) -> Self {
        Self { taken_at, stations, slots, totals: FleetTotals::default() }
    }

    /// Decode a raw payload and keep only the places of `city`.
    pub fn parse_json(bytes: &[u8], city: CityUid, taken_at: Timestamp) -> FeedResult<Self> {
        let feed: RawFeed =
            serde_json::from_slice(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;
        Ok(Self::from_feed(feed, city, taken_at))
    }

    /// Normalize an already-decoded feed.
    ///
    /// A place is a station iff `spot` is set, a free-floating slot iff
    /// `bike` is set and `spot` is not; anything else is ignored.  Slots
    /// without any vehicle number are dropped.
    pub fn from_feed(feed: RawFeed, city: CityUid, taken_at: Timestamp) -> Self {
        let mut snapshot = Snapshot::empty(taken_at);
        let city_uid = u64::from(city.0);

        let mut places = Vec::new();
        for country in feed.countries {
            let mut cities = country.cities.into_iter().filter(|c| c.uid == city_uid).peekable();
            if cities.peek().is_none() {
                continue;
            }
            let totals = &mut snapshot.totals;
            totals.booked = totals.booked.saturating_add(clamp_u32(country.booked_bikes));
            totals.set_point = totals.set_point.saturating_add(clamp_u32(country.set_point_bikes));
            totals.available = totals.available.saturating_add(clamp_u32(country.available_bikes));
            places.extend(cities.flat_map(|c| c.places));
        }

        for place in places {
            let is_station = place.spot.unwrap_or(false);
            let is_bike = place.bike.unwrap_or(false);
            if is_station {
                snapshot.stations.push(station_from_raw(place));
            } else if is_bike {
                let slot = slot_from_raw(place);
                if slot.occupant().is_some() {
                    snapshot.slots.push(slot);
                }
            }
        }
        snapshot
    }

    /// Find `vehicle` at any station or slot.  Stations are searched first.
    pub fn locate(&self, vehicle: &VehicleNumber) -> Option<Sighting<'_>> {
        for station in &self.stations {
            if let Some(entry) = station.vehicles.iter().find(|v| &v.number == vehicle) {
                return Some(Sighting { place: Whereabouts::Station(station), vehicle: entry });
            }
        }
        for slot in &self.slots {
            if let Some(entry) = slot.vehicles.iter().find(|v| &v.number == vehicle) {
                return Some(Sighting { place: Whereabouts::Slot(slot), vehicle: entry });
            }
        }
        None
    }

    /// Total vehicles listed at stations and slots.
    pub fn vehicle_count(&self) -> usize {
        self.stations.iter().map(|s| s.vehicles.len()).sum::<usize>()
            + self.slots.iter().map(|s| s.vehicles.len()).sum::<usize>()
    }
}

// ── Raw → normalized ──────────────────────────────────────────────────────────

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn position(place: &RawPlace) -> Option<GeoPoint> {
    match (place.lat, place.lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)).filter(|p| p.is_valid()),
        _ => None,
    }
}

/// Prefer `bike_list` (carries `active`); fall back to bare `bike_numbers`.
fn vehicles(place: &mut RawPlace) -> Vec<VehicleEntry> {
    let listed: Vec<VehicleEntry> = place
        .bike_list
        .drain(..)
        .filter_map(|b| {
            b.number.map(|n| VehicleEntry { number: VehicleNumber::from(n), active: b.active })
        })
        .collect();
    if !listed.is_empty() {
        return listed;
    }
    place.bike_numbers.drain(..).map(VehicleEntry::new).collect()
}

fn station_from_raw(mut place: RawPlace) -> Station {
    Station {
        uid:      PlaceUid(place.uid),
        name:     place.name.take().unwrap_or_else(|| "Unnamed station".to_owned()),
        kind:     StationKind::from_terminal_type(place.terminal_type.as_deref().unwrap_or("")),
        position: position(&place),
        vehicles: vehicles(&mut place),
        booked:   clamp_u32(place.booked_bikes),
        racks:    RackCounts {
            bikes:             clamp_u32(place.bikes),
            available_to_rent: clamp_u32(place.bikes_available_to_rent),
            bike_racks:        clamp_u32(place.bike_racks),
            free_racks:        clamp_u32(place.free_racks),
            special_racks:     clamp_u32(place.special_racks),
        },
    }
}

fn slot_from_raw(mut place: RawPlace) -> FreeSlot {
    FreeSlot {
        uid:      PlaceUid(place.uid),
        position: position(&place),
        vehicles: vehicles(&mut place),
        booked:   clamp_u32(place.booked_bikes),
    }
}
