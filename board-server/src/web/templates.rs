//! Askama templates for the web frontend.

use askama::Template;

use crate::coordinator::Snapshot;
use crate::domain::{Departure, StopId, StopRecord};

/// Departure boards page.
#[derive(Template)]
#[template(path = "board.html")]
pub struct BoardTemplate {
    pub boards: Vec<BoardView>,
}

/// Board setup page.
#[derive(Template)]
#[template(path = "setup.html")]
pub struct SetupTemplate {
    /// Validation error from the previous submission, if any.
    pub error: Option<String>,
    /// Confirmation message after a successful submission.
    pub notice: Option<String>,
}

/// One board on the page.
#[derive(Debug, Clone)]
pub struct BoardView {
    pub stops: Vec<StopView>,
    /// Timestamp of the displayed snapshot; absent before the first
    /// successful cycle.
    pub as_of: Option<String>,
    pub last_error: Option<String>,
}

impl BoardView {
    pub fn from_snapshot(
        stop_ids: &[StopId],
        snapshot: Option<&Snapshot>,
        last_error: Option<String>,
    ) -> Self {
        let stops = stop_ids
            .iter()
            .map(|id| match snapshot {
                Some(snap) => StopView::new(
                    id,
                    snap.stops.get(id),
                    snap.departures.get(id).map(Vec::as_slice).unwrap_or(&[]),
                ),
                None => StopView::new(id, None, &[]),
            })
            .collect();

        Self {
            stops,
            as_of: snapshot.map(|s| s.as_of.clone()),
            last_error,
        }
    }
}

/// One stop section on a board.
#[derive(Debug, Clone)]
pub struct StopView {
    pub id: String,
    pub name: String,
    pub departures: Vec<DepartureView>,
}

impl StopView {
    fn new(id: &StopId, record: Option<&StopRecord>, departures: &[Departure]) -> Self {
        Self {
            id: id.to_string(),
            name: record
                .map(|r| r.name.clone())
                .unwrap_or_else(|| format!("Stop {id}")),
            departures: departures.iter().map(DepartureView::from_departure).collect(),
        }
    }

    /// Minutes until the next departure, for the stop header. Negative
    /// values (already-due departures and the unknown-time sentinel) are
    /// clamped to zero.
    pub fn next_minutes(&self) -> Option<i64> {
        self.departures.first().map(|d| d.minutes.max(0))
    }
}

/// One departure row.
#[derive(Debug, Clone)]
pub struct DepartureView {
    pub route: String,
    pub headsign: String,
    pub time: String,
    pub minutes: i64,
    pub is_realtime: bool,
    pub icons: String,
    pub summary: String,
}

impl DepartureView {
    pub fn from_departure(departure: &Departure) -> Self {
        Self {
            route: departure.route.clone(),
            headsign: departure.headsign.clone(),
            time: departure.time.clone(),
            minutes: departure.minutes,
            is_realtime: departure.is_realtime,
            icons: departure.icons.clone(),
            summary: departure.summary.clone(),
        }
    }

    /// Display form of the countdown; the unknown-time sentinel renders
    /// as "?".
    pub fn minutes_display(&self) -> String {
        if self.minutes < 0 {
            "?".to_string()
        } else {
            self.minutes.to_string()
        }
    }
}
