//! Integration tests for fw-output.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use fw_core::{
    GeoPoint, RentalKind, ReturnKind, StationKind, Timestamp, VehicleNumber, Zone,
};
use fw_tracker::{CompletedTrip, ReservationEvent, ReservationKind, TripEnd, TripStart};
use tempfile::TempDir;

use crate::{TRIP_HEADER, TripRow};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn tmp() -> TempDir {
    tempfile::tempdir().expect("create temp dir")
}

fn at(secs: i64) -> Timestamp {
    Timestamp::parse("2025-06-01 08:00:00").unwrap().offset_secs(secs)
}

/// Station rental at A, free-floating return outside the flex zone.
fn trip(vehicle: &str, duration_secs: i64) -> CompletedTrip {
    let start = TripStart::at_station("A", StationKind::Physical, Some(GeoPoint::new(52.5, 13.4)), at(0));
    let end = TripEnd {
        time:     at(duration_secs),
        kind:     ReturnKind::FreeFloating,
        location: "outside Flexzone".to_owned(),
        position: Some(GeoPoint::new(52.51, 13.5)),
        zone:     Some(Zone::OutsideFlexzone),
    };
    CompletedTrip::new(VehicleNumber::from(vehicle), start, end)
}

fn lost_trip(vehicle: &str) -> CompletedTrip {
    let start = TripStart {
        time:     at(0),
        kind:     RentalKind::FreeFloating,
        location: "Flexzone".to_owned(),
        position: Some(GeoPoint::new(52.5, 12.9)),
        zone:     Some(Zone::Flexzone),
    };
    CompletedTrip::new(VehicleNumber::from(vehicle), start, TripEnd::lost(at(90_000)))
}

fn reservation(kind: ReservationKind, vehicles: &[&str]) -> ReservationEvent {
    ReservationEvent {
        timestamp:         at(60),
        station:           "B".to_owned(),
        station_kind:      StationKind::Virtual,
        kind,
        duration_secs:     60,
        booked_entry:      1,
        booked_exit:       0,
        bikes_before:      2,
        bikes_after:       1,
        available_to_rent: 1,
        bike_racks:        10,
        free_racks:        9,
        special_racks:     0,
        vehicles:          vehicles.iter().map(|v| VehicleNumber::from(*v)).collect(),
    }
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_owned).collect()
}

fn header_line() -> String {
    TRIP_HEADER.join(",")
}

/// In-memory file whose writes fail while `down` is set.
#[derive(Default)]
struct FlakyFile {
    down:  bool,
    bytes: Vec<u8>,
}

impl FlakyFile {
    fn failing() -> Self {
        Self { down: true, ..Self::default() }
    }

    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.bytes).lines().map(str::to_owned).collect()
    }
}

impl Write for FlakyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.down {
            return Err(io::Error::other("disk full"));
        }
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Rows ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod rows {
    use super::*;

    #[test]
    fn trip_row_columns() {
        let row = TripRow::from_trip(&trip("184203", 605));
        assert_eq!(
            row.fields(),
            [
                "184203",
                "2025-06-01 08:00:00",
                "Station (physical)",
                "A",
                "52.5",
                "13.4",
                "2025-06-01 08:10:05",
                "Free-floating",
                "outside Flexzone",
                "52.51",
                "13.5",
                "10.1",
                "Station:NoFlexzone",
            ]
        );
    }

    #[test]
    fn lost_trip_has_empty_return_coordinates() {
        let row = TripRow::from_trip(&lost_trip("7"));
        assert_eq!(row.return_type, "Unknown (lost)");
        assert_eq!(row.return_location, "Unknown");
        assert_eq!(row.return_lat, "");
        assert_eq!(row.return_lng, "");
        assert_eq!(row.movement, "Unknown");
        assert_eq!(row.duration_minutes, "1500.0");
    }

    #[test]
    fn reservation_fields_join_vehicles() {
        let fields = crate::row::reservation_fields(&reservation(ReservationKind::BookedTaken, &["1", "2"]));
        assert_eq!(fields[0], "2025-06-01 08:01:00");
        assert_eq!(fields[2], "virtual");
        assert_eq!(fields[3], "booked:bike_taken");
        assert_eq!(fields[13], "1 2");
    }
}

// ── CSV trip log ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod csv_tests {
    use super::*;
    use crate::{CsvTripLog, RetryingSink, TripSink};

    #[test]
    fn new_file_gets_header() {
        let dir = tmp();
        let path = dir.path().join("trips.csv");
        let mut log = CsvTripLog::open(&path).unwrap();
        log.finish().unwrap();
        assert_eq!(lines(&path), vec![header_line()]);
    }

    #[test]
    fn rows_append_after_header() {
        let dir = tmp();
        let path = dir.path().join("trips.csv");
        let mut log = CsvTripLog::open(&path).unwrap();
        log.write_trips(&[TripRow::from_trip(&trip("1", 60)), TripRow::from_trip(&trip("2", 120))])
            .unwrap();
        log.finish().unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<_> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(headers, TRIP_HEADER);
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "1");
        assert_eq!(&rows[1][11], "2.0");
    }

    #[test]
    fn reopen_does_not_duplicate_header() {
        let dir = tmp();
        let path = dir.path().join("trips.csv");
        {
            let mut log = CsvTripLog::open(&path).unwrap();
            log.write_trips(&[TripRow::from_trip(&trip("1", 60))]).unwrap();
        }
        let mut log = CsvTripLog::open(&path).unwrap();
        log.write_trips(&[TripRow::from_trip(&trip("2", 60))]).unwrap();
        log.finish().unwrap();

        let all = lines(&path);
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().filter(|l| **l == header_line()).count(), 1);
    }

    #[test]
    fn headerless_file_repaired() {
        let dir = tmp();
        let path = dir.path().join("trips.csv");
        fs::write(&path, "1,a\n2,b\n").unwrap();

        let log = CsvTripLog::open(&path).unwrap();
        drop(log);

        assert_eq!(lines(&path), vec![header_line(), "1,a".to_owned(), "2,b".to_owned()]);
        assert!(!dir.path().join("trips.csv.tmp").exists());
    }

    #[test]
    fn empty_file_gets_header() {
        let dir = tmp();
        let path = dir.path().join("trips.csv");
        fs::write(&path, "").unwrap();
        CsvTripLog::open(&path).unwrap();
        assert_eq!(lines(&path), vec![header_line()]);
    }

    #[test]
    fn failed_batch_is_not_repeated_on_retry() {
        let log = CsvTripLog::from_writer(Path::new("trips.csv"), FlakyFile::failing());
        let mut sink = RetryingSink::new(log);
        let batch = vec![TripRow::from_trip(&trip("1", 60)), TripRow::from_trip(&trip("2", 60))];
        assert!(sink.write(batch).is_err());
        assert!(sink.inner().get_ref().bytes.is_empty());

        sink.inner_mut().get_mut().down = false;
        sink.write([TripRow::from_trip(&trip("3", 60))]).unwrap();

        let vehicles: Vec<String> = sink
            .inner()
            .get_ref()
            .lines()
            .iter()
            .map(|l| l.split(',').next().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(vehicles, ["1", "2", "3"]);
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = tmp();
        let mut log = CsvTripLog::open(&dir.path().join("trips.csv")).unwrap();
        log.finish().unwrap();
        log.finish().unwrap();
    }
}

// ── Retrying sink ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod retry_tests {
    use super::*;
    use crate::{OutputError, OutputResult, RetryingSink, TripSink};

    /// Accepts rows only while `up` is set.
    #[derive(Default)]
    struct Flaky {
        up:       bool,
        written:  Vec<String>,
        finished: bool,
    }

    impl TripSink for Flaky {
        fn write_trips(&mut self, rows: &[TripRow]) -> OutputResult<()> {
            if !self.up {
                return Err(OutputError::Io(std::io::Error::other("disk full")));
            }
            self.written.extend(rows.iter().map(|r| r.vehicle.clone()));
            Ok(())
        }

        fn finish(&mut self) -> OutputResult<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn rows(vehicles: &[&str]) -> Vec<TripRow> {
        vehicles.iter().map(|v| TripRow::from_trip(&trip(v, 60))).collect()
    }

    #[test]
    fn failed_rows_are_kept() {
        let mut sink = RetryingSink::new(Flaky::default());
        assert!(sink.write(rows(&["1"])).is_err());
        assert!(sink.write(rows(&["2"])).is_err());
        assert_eq!(sink.backlog_len(), 2);
        assert!(sink.inner().written.is_empty());
    }

    #[test]
    fn recovered_sink_writes_backlog_in_order() {
        let mut sink = RetryingSink::new(Flaky::default());
        let _ = sink.write(rows(&["1", "2"]));
        sink.inner_mut().up = true;
        sink.write(rows(&["3"])).unwrap();
        assert_eq!(sink.inner().written, ["1", "2", "3"]);
        assert_eq!(sink.backlog_len(), 0);
    }

    #[test]
    fn finish_flushes_backlog() {
        let mut sink = RetryingSink::new(Flaky::default());
        let _ = sink.write(rows(&["1"]));
        sink.inner_mut().up = true;
        sink.finish().unwrap();
        assert_eq!(sink.inner().written, ["1"]);
        assert!(sink.inner().finished);
    }

    #[test]
    fn finish_reports_unwritable_backlog() {
        let mut sink = RetryingSink::new(Flaky::default());
        let _ = sink.write(rows(&["1"]));
        assert!(sink.finish().is_err());
        assert!(sink.inner().finished);
        assert_eq!(sink.backlog_len(), 1);
    }
}

// ── State dump ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod state_tests {
    use super::*;
    use crate::JsonStateStore;
    use fw_tracker::Tracker;

    #[test]
    fn dump_overwritten_atomically() {
        let dir = tmp();
        let path = dir.path().join("state.json");
        let store = JsonStateStore::new(&path);
        let dump = Tracker::default().dump();

        store.write(&dump).unwrap();
        store.write(&dump).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "timestamp", "stations", "free_floating", "in_transit", "pending_return",
            "ambiguous_removal", "counts", "totals", "stats",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(!dir.path().join("state.json.tmp").exists());
    }
}

// ── Reservation log ───────────────────────────────────────────────────────────

#[cfg(test)]
mod reservation_tests {
    use super::*;
    use crate::{RESERVATION_HEADER, ReservationLog};

    #[test]
    fn header_once_across_reopen() {
        let dir = tmp();
        let path = dir.path().join("res.csv");
        ReservationLog::open(&path)
            .unwrap()
            .write(&reservation(ReservationKind::BookedNotTaken, &[]))
            .unwrap();
        ReservationLog::open(&path)
            .unwrap()
            .write(&reservation(ReservationKind::NotBookedTaken, &["4"]))
            .unwrap();

        let all = lines(&path);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], RESERVATION_HEADER.join(","));
        assert!(all[1].contains("booked:not_taken"));
        assert!(all[2].ends_with(",4"));
    }

    #[test]
    fn failed_event_kept_and_written_once() {
        let mut log = ReservationLog::from_writer(FlakyFile::failing());
        assert!(log.write(&reservation(ReservationKind::BookedNotTaken, &[])).is_err());
        assert_eq!(log.backlog_len(), 1);

        log.get_mut().down = false;
        log.write(&reservation(ReservationKind::NotBookedTaken, &["4"])).unwrap();
        assert_eq!(log.backlog_len(), 0);

        let all = log.get_ref().lines();
        assert_eq!(all.len(), 2);
        assert!(all[0].contains("booked:not_taken"));
        assert!(all[1].ends_with(",4"));

        log.flush().unwrap();
        assert_eq!(log.get_ref().lines().len(), 2);
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use super::*;
    use crate::{CsvTripLog, JsonStateStore, OutputObserver, ReservationLog};
    use fw_core::{TrackerConfig, TripLogBackend};
    use fw_monitor::MonitorObserver;
    use fw_tracker::{Tracker, TrackerStats};

    #[test]
    fn trips_state_and_reservations_written() {
        let dir = tmp();
        let trips = dir.path().join("trips.csv");
        let state = dir.path().join("state.json");
        let res = dir.path().join("res.csv");
        let mut obs = OutputObserver::new(CsvTripLog::open(&trips).unwrap())
            .with_state(JsonStateStore::new(&state))
            .with_reservations(ReservationLog::open(&res).unwrap());

        obs.on_trip(&trip("1", 60));
        obs.on_reservation(&reservation(ReservationKind::BookedTaken, &["9"]));
        obs.on_state(&Tracker::default().dump());
        obs.on_shutdown(&TrackerStats::default());

        assert!(obs.take_error().is_none());
        assert_eq!(obs.trips_seen(), 1);
        assert_eq!(lines(&trips).len(), 2);
        assert_eq!(lines(&res).len(), 2);
        assert!(state.exists());
    }

    #[test]
    fn from_config_creates_output_dir() {
        let dir = tmp();
        let out = dir.path().join("results_trips");
        let config = TrackerConfig { output_dir: out.clone(), track_reservations: false, ..TrackerConfig::default() };

        let mut obs = OutputObserver::from_config(&config).unwrap();
        obs.on_trip(&trip("1", 60));
        obs.on_state(&Tracker::default().dump());

        assert!(out.join("nextbike_trips.csv").exists());
        assert!(out.join("vehicle_states.json").exists());
        assert!(!out.join("station_reservations.csv").exists());
    }

    #[cfg(not(feature = "sqlite"))]
    #[test]
    fn sqlite_backend_needs_feature() {
        let dir = tmp();
        let result = crate::open_trip_sink(TripLogBackend::Sqlite, dir.path());
        assert!(matches!(result, Err(crate::OutputError::Backend(_))));
    }

    #[test]
    fn csv_backend_opens() {
        let dir = tmp();
        assert!(crate::open_trip_sink(TripLogBackend::Csv, dir.path()).is_ok());
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::{SqliteTripLog, TripSink};

    #[test]
    fn trips_inserted() {
        let dir = tmp();
        let path = dir.path().join("trips.db");
        let mut log = SqliteTripLog::open(&path).unwrap();
        log.write_trips(&[TripRow::from_trip(&trip("1", 605)), TripRow::from_trip(&lost_trip("2"))])
            .unwrap();
        log.finish().unwrap();

        let conn = rusqlite::Connection::open(&path).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM trips", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);

        let (movement, minutes): (String, f64) = conn
            .query_row(
                "SELECT movement_type, duration_minutes FROM trips WHERE vehicle_number = '1'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(movement, "Station:NoFlexzone");
        assert!((minutes - 10.1).abs() < 1e-9);

        let lat: Option<f64> = conn
            .query_row("SELECT return_lat FROM trips WHERE vehicle_number = '2'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(lat, None);
    }

    #[test]
    fn schema_survives_reopen() {
        let dir = tmp();
        let path = dir.path().join("trips.db");
        SqliteTripLog::open(&path).unwrap().write_trips(&[TripRow::from_trip(&trip("1", 60))]).unwrap();
        let mut log = SqliteTripLog::open(&path).unwrap();
        log.write_trips(&[TripRow::from_trip(&trip("2", 60))]).unwrap();
        log.finish().unwrap();

        let conn = rusqlite::Connection::open(&path).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM trips", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }
}
