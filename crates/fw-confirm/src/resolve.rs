use fw_core::ZoneLookup;
use fw_feed::{FeedResult, Snapshot, Whereabouts};
use fw_tracker::{PendingReturn, Resolution, TripEnd};

/// Decide a pending return from the confirmation fetch.
///
/// The return time always stays the detection time; only the place is
/// refreshed.  A failed fetch or a vehicle that is nowhere to be found keeps
/// the tentative return as detected.
pub fn resolve(
    pending: &PendingReturn,
    fetched: &FeedResult<Snapshot>,
    zones:   &dyn ZoneLookup,
) -> Resolution {
    let snapshot = match fetched {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(
                vehicle = %pending.vehicle,
                error = %e,
                "confirmation fetch failed, keeping detected return"
            );
            return Resolution::Finalize(pending.end.clone());
        }
    };

    let Some(sighting) = snapshot.locate(&pending.vehicle) else {
        tracing::debug!(vehicle = %pending.vehicle, "not in confirmation snapshot");
        return Resolution::Finalize(pending.end.clone());
    };

    if sighting.still_booked() {
        return Resolution::Reopen;
    }

    let time = pending.end.time;
    let end = match sighting.place {
        Whereabouts::Station(station) => TripEnd::at_station(station, time),
        Whereabouts::Slot(slot)       => TripEnd::free_floating(slot, zones, time),
    };
    Resolution::Finalize(end)
}
