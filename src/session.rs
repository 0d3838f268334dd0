//! Session controller: keeps the store, the map markers, the list entries and
//! the persisted blob in step as events arrive.
//!
//! Events are expected one at a time from the host event loop. The only
//! asynchronous step is the location fix, which is requested in
//! [`SessionController::start`] and answered through
//! [`SessionController::on_location_fix`] (or expired by
//! [`SessionController::check_location_timeout`]).

use crate::codec;
use crate::dlog;
use crate::error::{LocationError, NotFound, PersistenceError, SessionError};
use crate::storage::BlobStore;
use crate::store::WorkoutStore;
use crate::types::{Coordinates, Workout, WorkoutForm, WorkoutId};
use crate::view::{ListView, MapView, MarkerTable, popup_class, popup_text};
use std::time::{Duration, Instant};

pub const DEFAULT_STORAGE_KEY: &str = "workouts";
pub const DEFAULT_MAP_ZOOM: u8 = 13;
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the blob holding the workouts.
    pub storage_key: String,
    pub map_zoom: u8,
    /// How long to wait for a position fix before disabling map features.
    pub location_timeout: Duration,
}

impl SessionConfig {
    /// Where an unreadable blob is copied before it can be overwritten.
    pub fn backup_key(&self) -> String {
        format!("{}.unreadable", self.storage_key)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            map_zoom: DEFAULT_MAP_ZOOM,
            location_timeout: DEFAULT_LOCATION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    AwaitingLocation { requested_at: Instant },
    Ready { origin: Coordinates },
    /// No position fix; the list still works, the map does not.
    LocationUnavailable(LocationError),
}

/// Outcome of a mutation together with the result of saving afterwards.
///
/// A failed save does not undo the mutation.
#[must_use]
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub persisted: Result<(), PersistenceError>,
}

pub struct SessionController<B, M, L> {
    config: SessionConfig,
    state: SessionState,
    store: WorkoutStore,
    markers: MarkerTable,
    /// Map position picked for the workout currently in the form.
    pending: Option<Coordinates>,
    /// The last save failed, so the blob is older than the store.
    unsaved: bool,
    /// An unreadable blob could not be backed up; saving would destroy it.
    overwrite_blocked: bool,
    blobs: B,
    map: M,
    list: L,
}

impl<B: BlobStore, M: MapView, L: ListView> SessionController<B, M, L> {
    pub fn new(config: SessionConfig, blobs: B, map: M, list: L) -> Self {
        Self {
            config,
            state: SessionState::Uninitialized,
            store: WorkoutStore::new(),
            markers: MarkerTable::new(),
            pending: None,
            unsaved: false,
            overwrite_blocked: false,
            blobs,
            map,
            list,
        }
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn workouts(&self) -> &[Workout] {
        self.store.all()
    }

    pub const fn markers(&self) -> &MarkerTable {
        &self.markers
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub const fn map(&self) -> &M {
        &self.map
    }

    pub const fn list(&self) -> &L {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut L {
        &mut self.list
    }

    pub const fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn into_parts(self) -> (B, M, L) {
        (self.blobs, self.map, self.list)
    }

    /// Restores saved workouts and asks the map for a position.
    ///
    /// An unreadable blob is returned as an error but does not stop the
    /// session; it continues with an empty store.
    pub fn start(&mut self) -> Result<usize, PersistenceError> {
        self.start_at(Instant::now())
    }

    pub fn start_at(&mut self, now: Instant) -> Result<usize, PersistenceError> {
        let hydrated = self.hydrate();
        self.state = SessionState::AwaitingLocation { requested_at: now };
        self.map.request_location();
        tracing::info!(
            workouts = self.store.len(),
            timeout = ?self.config.location_timeout,
            "session started; awaiting location"
        );
        hydrated
    }

    /// Reloads the store from the saved blob and re-renders it.
    ///
    /// Entries and markers of the previous contents are removed first, so
    /// repeated calls leave the views in the same state. While the last save
    /// has failed the blob is stale, and the store is re-rendered as it is.
    pub fn hydrate(&mut self) -> Result<usize, PersistenceError> {
        self.detach_views();

        let result = if self.unsaved {
            tracing::warn!(
                workouts = self.store.len(),
                "unsaved workouts in memory; not reloading the older saved copy"
            );
            Ok(self.store.len())
        } else {
            self.load_store()
        };

        let map_ready = matches!(self.state, SessionState::Ready { .. });
        for w in self.store.all() {
            self.list.render_entry(w);
            if map_ready {
                place_marker(&mut self.map, &mut self.markers, w);
            }
        }
        dlog!("hydrated workouts={} markers={}", self.store.len(), self.markers.len());
        result
    }

    fn load_store(&mut self) -> Result<usize, PersistenceError> {
        let key = self.config.storage_key.as_str();
        let blob = match self.blobs.load(key) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(err = %e, key, "saved workouts could not be read");
                self.store.clear();
                return Err(e);
            }
        };

        match codec::deserialize(key, blob.as_deref()) {
            Ok(workouts) => {
                self.store.replace_all(workouts);
                Ok(self.store.len())
            }
            Err(e) => {
                tracing::warn!(err = %e, key, "saved workouts could not be restored");
                self.store.clear();
                if let Some(blob) = blob {
                    self.back_up_unreadable(&blob);
                }
                Err(e)
            }
        }
    }

    /// Keeps a copy of a blob that failed to parse, so the next save does
    /// not erase the only copy.
    fn back_up_unreadable(&mut self, blob: &str) {
        let backup_key = self.config.backup_key();
        match self.blobs.save(&backup_key, blob) {
            Ok(()) => {
                tracing::warn!(backup_key = %backup_key, "unreadable workouts copied aside");
            }
            Err(e) => {
                tracing::warn!(err = %e, backup_key = %backup_key, "could not copy unreadable workouts; saving disabled");
                self.overwrite_blocked = true;
            }
        }
    }

    /// Handles the answer to the position request.
    ///
    /// A fix readies the map and places a marker per workout, in order. A
    /// failure is reported and leaves map features disabled.
    pub fn on_location_fix(
        &mut self,
        fix: Result<Coordinates, LocationError>,
    ) -> Result<usize, SessionError> {
        match self.state {
            SessionState::Uninitialized => return Err(SessionError::NotStarted),
            SessionState::Ready { .. } => {
                dlog!("location fix ignored; map already ready");
                return Ok(0);
            }
            SessionState::AwaitingLocation { .. } | SessionState::LocationUnavailable(_) => {}
        }

        match fix {
            Ok(origin) => {
                self.map.init_view(origin, self.config.map_zoom);
                for w in self.store.all() {
                    place_marker(&mut self.map, &mut self.markers, w);
                }
                self.state = SessionState::Ready { origin };
                tracing::info!(%origin, markers = self.markers.len(), "map ready");
                Ok(self.markers.len())
            }
            Err(e) => {
                tracing::warn!(err = %e, "could not get your position; map features disabled");
                self.state = SessionState::LocationUnavailable(e.clone());
                Err(SessionError::LocationUnavailable(e))
            }
        }
    }

    /// Gives up on a position request older than the configured timeout.
    pub fn check_location_timeout(&mut self, now: Instant) -> Result<(), SessionError> {
        let SessionState::AwaitingLocation { requested_at } = self.state else {
            return Ok(());
        };
        let timeout = self.config.location_timeout;
        if now.saturating_duration_since(requested_at) < timeout {
            return Ok(());
        }
        self.on_location_fix(Err(LocationError::TimedOut(timeout)))
            .map(|_| ())
    }

    /// A click on the map picks the position and opens the form.
    pub fn on_map_click(&mut self, at: Coordinates) -> Result<(), SessionError> {
        self.require_ready()?;
        self.pending = Some(at);
        self.list.show_form();
        Ok(())
    }

    /// Builds a workout from the form at the clicked position.
    ///
    /// On a validation error the form stays open and nothing changes.
    pub fn on_form_submit(&mut self) -> Result<Committed<WorkoutId>, SessionError> {
        self.require_ready()?;
        let at = self.pending.ok_or(SessionError::NoPendingPosition)?;
        let form = self.list.read_form_inputs();

        let committed = self.add_workout(at, &form)?;
        self.pending = None;
        self.list.clear_form();
        self.list.hide_form();
        Ok(committed)
    }

    pub fn add_workout(
        &mut self,
        at: Coordinates,
        form: &WorkoutForm,
    ) -> Result<Committed<WorkoutId>, SessionError> {
        self.require_ready()?;
        let workout = self.store.create(at, form).inspect_err(|e| {
            tracing::warn!(err = %e, "workout rejected");
        })?;
        let id = workout.id();

        self.store.append(workout);
        if let Some(w) = self.store.all().last() {
            place_marker(&mut self.map, &mut self.markers, w);
            self.list.render_entry(w);
        }
        tracing::info!(%id, workouts = self.store.len(), "workout added");

        Ok(Committed {
            value: id,
            persisted: self.save(),
        })
    }

    /// Removes a workout from the store, the map and the list, then saves.
    ///
    /// Works without a position fix, since the list is usable on its own.
    pub fn delete_workout(&mut self, id: WorkoutId) -> Result<Committed<Workout>, SessionError> {
        if self.state == SessionState::Uninitialized {
            return Err(SessionError::NotStarted);
        }
        let removed = self.store.remove_by_id(id).inspect_err(|e| {
            tracing::warn!(err = %e, "delete ignored");
        })?;
        if let Some(marker) = self.markers.take(id) {
            self.map.remove_marker(marker);
        }
        self.list.remove_entry(id);
        tracing::info!(%id, workouts = self.store.len(), "workout deleted");

        Ok(Committed {
            value: removed,
            persisted: self.save(),
        })
    }

    /// Pans the map to a workout picked from the list.
    pub fn select_workout(&mut self, id: WorkoutId) -> Result<Coordinates, SessionError> {
        self.require_ready()?;
        let at = self.store.find_by_id(id).ok_or(NotFound(id))?.coords();
        self.map.pan_to(at);
        Ok(at)
    }

    /// Drops every workout, in memory and in storage.
    ///
    /// The controller goes back to `Uninitialized`; the host has to start a
    /// fresh session afterwards.
    pub fn reset_all(&mut self) -> Result<(), PersistenceError> {
        self.detach_views();
        self.store.clear();
        self.pending = None;
        self.state = SessionState::Uninitialized;
        self.overwrite_blocked = false;
        tracing::warn!(key = %self.config.storage_key, "all workouts reset");
        let result = self.blobs.remove(&self.config.storage_key);
        // A blob that survived the reset must not come back on restart.
        self.unsaved = result.is_err();
        result
    }

    /// Writes the store to the blob. Failures are logged and returned; the
    /// in-memory store stays authoritative.
    pub fn save(&mut self) -> Result<(), PersistenceError> {
        let key = self.config.storage_key.as_str();
        let result = if self.overwrite_blocked {
            Err(PersistenceError::Storage(format!(
                "unreadable workouts under {key:?} were not backed up; refusing to overwrite them"
            )))
        } else {
            codec::serialize(&self.store).and_then(|blob| self.blobs.save(key, &blob))
        };
        if let Err(e) = &result {
            tracing::warn!(err = %e, key, "saving workouts failed");
        }
        self.unsaved = result.is_err();
        result
    }

    fn require_ready(&self) -> Result<Coordinates, SessionError> {
        match &self.state {
            SessionState::Ready { origin } => Ok(*origin),
            SessionState::Uninitialized => Err(SessionError::NotStarted),
            SessionState::AwaitingLocation { .. } => Err(SessionError::AwaitingLocation),
            SessionState::LocationUnavailable(e) => {
                Err(SessionError::LocationUnavailable(e.clone()))
            }
        }
    }

    fn detach_views(&mut self) {
        for w in self.store.all() {
            self.list.remove_entry(w.id());
        }
        for marker in self.markers.drain() {
            self.map.remove_marker(marker);
        }
    }
}

fn place_marker<M: MapView>(map: &mut M, markers: &mut MarkerTable, w: &Workout) {
    let marker = map.place_marker(w.coords(), &popup_text(w), &popup_class(w));
    if let Some(stale) = markers.insert(w.id(), marker) {
        map.remove_marker(stale);
    }
}
