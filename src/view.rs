//! Seams to the map and list views, plus the marker side table.

use crate::types::{Coordinates, Workout, WorkoutDetails, WorkoutForm, WorkoutId};
use std::collections::HashMap;

/// Opaque handle to a marker living in a map view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

pub trait MapView {
    /// Asks for a position fix. The answer arrives later through
    /// `SessionController::on_location_fix`.
    fn request_location(&mut self);
    fn init_view(&mut self, center: Coordinates, zoom: u8);
    fn place_marker(&mut self, at: Coordinates, popup: &str, style_class: &str) -> MarkerHandle;
    fn remove_marker(&mut self, marker: MarkerHandle);
    fn pan_to(&mut self, at: Coordinates);
}

pub trait ListView {
    fn read_form_inputs(&mut self) -> WorkoutForm;
    fn show_form(&mut self);
    fn hide_form(&mut self);
    fn clear_form(&mut self);
    fn render_entry(&mut self, workout: &Workout);
    fn remove_entry(&mut self, id: WorkoutId);
}

/// Which marker shows which workout. Lives beside the store, never in it.
#[derive(Debug, Default)]
pub struct MarkerTable {
    markers: HashMap<WorkoutId, MarkerHandle>,
}

impl MarkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a marker, returning the one it replaces.
    pub fn insert(&mut self, id: WorkoutId, marker: MarkerHandle) -> Option<MarkerHandle> {
        self.markers.insert(id, marker)
    }

    pub fn get(&self, id: WorkoutId) -> Option<MarkerHandle> {
        self.markers.get(&id).copied()
    }

    pub fn take(&mut self, id: WorkoutId) -> Option<MarkerHandle> {
        self.markers.remove(&id)
    }

    pub fn drain(&mut self) -> impl Iterator<Item = MarkerHandle> + '_ {
        self.markers.drain().map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

pub fn popup_text(workout: &Workout) -> String {
    format!("{} {}", workout.kind().icon(), workout.description())
}

pub fn popup_class(workout: &Workout) -> String {
    format!("{}-popup", workout.kind())
}

/// Entry line with metrics rounded to one decimal place.
pub fn entry_summary(workout: &Workout) -> String {
    let head = format!(
        "{} {} | {} km | {} min",
        workout.kind().icon(),
        workout.description(),
        fmt1(workout.distance_km()),
        fmt1(workout.duration_min())
    );
    match *workout.details() {
        WorkoutDetails::Running {
            cadence_spm,
            pace_min_per_km,
        } => format!(
            "{head} | ⚡️ {} min/km | 🦶🏼 {} spm",
            fmt1(pace_min_per_km),
            fmt1(cadence_spm)
        ),
        WorkoutDetails::Cycling {
            elevation_gain_m,
            speed_km_per_h,
        } => format!(
            "{head} | ⚡️ {} km/h | ⛰ {} m",
            fmt1(speed_km_per_h),
            fmt1(elevation_gain_m)
        ),
    }
}

fn fmt1(v: f64) -> String {
    format!("{v:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WorkoutStore;
    use crate::types::KindInput;

    fn ride() -> Workout {
        WorkoutStore::new()
            .create(
                Coordinates::new(1.0, 2.0),
                &WorkoutForm {
                    distance_km: 27.0,
                    duration_min: 95.0,
                    input: KindInput::Cycling {
                        elevation_gain_m: 120.0,
                    },
                },
            )
            .unwrap()
    }

    #[test]
    fn test_entry_summary_rounds_to_one_decimal() {
        let s = entry_summary(&ride());
        assert!(s.contains("27.0 km"), "{s}");
        assert!(s.contains("95.0 min"), "{s}");
        // 27 / (95/60) = 17.052...
        assert!(s.contains("17.1 km/h"), "{s}");
        assert!(s.contains("120.0 m"), "{s}");
    }

    #[test]
    fn test_popup_style_follows_kind() {
        let w = ride();
        assert_eq!(popup_class(&w), "cycling-popup");
        assert!(popup_text(&w).ends_with(w.description()));
    }

    #[test]
    fn test_marker_table() {
        let mut t = MarkerTable::new();
        assert_eq!(t.insert(WorkoutId(1), MarkerHandle(10)), None);
        assert_eq!(t.insert(WorkoutId(1), MarkerHandle(11)), Some(MarkerHandle(10)));
        assert_eq!(t.get(WorkoutId(1)), Some(MarkerHandle(11)));
        assert_eq!(t.take(WorkoutId(1)), Some(MarkerHandle(11)));
        assert!(t.is_empty());
    }
}
