//! Text-mode map and list views used by the command line.

use crate::dlog;
use crate::error::LocationError;
use crate::types::{Coordinates, KindInput, Workout, WorkoutForm, WorkoutId};
use crate::view::{ListView, MapView, MarkerHandle, entry_summary};
use std::collections::BTreeMap;

/// A "map" that only tracks markers and reports what it would draw.
#[derive(Debug, Default)]
pub struct TerminalMap {
    position: Option<Coordinates>,
    center: Option<Coordinates>,
    markers: BTreeMap<MarkerHandle, Coordinates>,
    next_marker: u64,
}

impl TerminalMap {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// The fix the terminal can offer: whatever position the user passed.
    pub fn locate(&self) -> Result<Coordinates, LocationError> {
        self.position
            .ok_or_else(|| LocationError::Unavailable("no position given".to_string()))
    }

    pub const fn center(&self) -> Option<Coordinates> {
        self.center
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

impl MapView for TerminalMap {
    fn request_location(&mut self) {
        dlog!("location requested have_position={}", self.position.is_some());
    }

    fn init_view(&mut self, center: Coordinates, zoom: u8) {
        self.center = Some(center);
        dlog!("map view center={center} zoom={zoom}");
    }

    fn place_marker(&mut self, at: Coordinates, popup: &str, style_class: &str) -> MarkerHandle {
        self.next_marker += 1;
        let marker = MarkerHandle(self.next_marker);
        self.markers.insert(marker, at);
        dlog!("marker placed id={} at={at} class={style_class} popup={popup}", marker.0);
        marker
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        if self.markers.remove(&marker).is_none() {
            tracing::warn!(marker = marker.0, "removing unknown marker");
        }
    }

    fn pan_to(&mut self, at: Coordinates) {
        self.center = Some(at);
        dlog!("map panned to={at}");
    }
}

/// Collects rendered entries as text lines, in display order.
#[derive(Debug, Default)]
pub struct TerminalList {
    entries: Vec<(WorkoutId, String)>,
    form: Option<WorkoutForm>,
    form_visible: bool,
}

impl TerminalList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the form as if the user had typed the values.
    pub fn fill_form(&mut self, form: WorkoutForm) {
        self.form = Some(form);
    }

    pub const fn form_visible(&self) -> bool {
        self.form_visible
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, line)| line.as_str())
    }

    pub fn line(&self, id: WorkoutId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(e, _)| *e == id)
            .map(|(_, line)| line.as_str())
    }
}

impl ListView for TerminalList {
    /// An unfilled form reads as blanks, which never validate.
    fn read_form_inputs(&mut self) -> WorkoutForm {
        self.form.unwrap_or(WorkoutForm {
            distance_km: f64::NAN,
            duration_min: f64::NAN,
            input: KindInput::Running {
                cadence_spm: f64::NAN,
            },
        })
    }

    fn show_form(&mut self) {
        self.form_visible = true;
    }

    fn hide_form(&mut self) {
        self.form_visible = false;
    }

    fn clear_form(&mut self) {
        self.form = None;
    }

    fn render_entry(&mut self, workout: &Workout) {
        let line = format!("{}\t{}", workout.id(), entry_summary(workout));
        self.entries.push((workout.id(), line));
    }

    fn remove_entry(&mut self, id: WorkoutId) {
        self.entries.retain(|(e, _)| *e != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionConfig, SessionController};
    use crate::storage::MemoryBlobStore;

    const HERE: Coordinates = Coordinates::new(48.85, 2.35);

    #[test]
    fn test_terminal_session_add_and_delete() {
        let map = TerminalMap::new(Some(HERE));
        let mut session = SessionController::new(
            SessionConfig::default(),
            MemoryBlobStore::new(),
            map,
            TerminalList::new(),
        );
        session.start().unwrap();
        let fix = session.map().locate();
        session.on_location_fix(fix).unwrap();
        assert_eq!(session.map().center(), Some(HERE));

        session.on_map_click(HERE).unwrap();
        assert!(session.list().form_visible());
        session.list_mut().fill_form(WorkoutForm {
            distance_km: 10.0,
            duration_min: 50.0,
            input: KindInput::Running { cadence_spm: 172.0 },
        });
        let id = session.on_form_submit().unwrap().value;

        let line = session.list().line(id).unwrap();
        assert!(line.starts_with(&id.to_string()), "{line}");
        assert!(line.contains("5.0 min/km"), "{line}");
        assert_eq!(session.map().marker_count(), 1);

        session.delete_workout(id).unwrap().persisted.unwrap();
        assert_eq!(session.list().lines().count(), 0);
        assert_eq!(session.map().marker_count(), 0);
    }

    #[test]
    fn test_blank_form_does_not_validate() {
        let mut session = SessionController::new(
            SessionConfig::default(),
            MemoryBlobStore::new(),
            TerminalMap::new(Some(HERE)),
            TerminalList::new(),
        );
        session.start().unwrap();
        session.on_location_fix(Ok(HERE)).unwrap();
        session.on_map_click(HERE).unwrap();
        assert!(session.on_form_submit().is_err());
        assert!(session.workouts().is_empty());
    }

    #[test]
    fn test_locate_without_position_fails() {
        assert!(matches!(
            TerminalMap::new(None).locate(),
            Err(LocationError::Unavailable(_))
        ));
    }
}
