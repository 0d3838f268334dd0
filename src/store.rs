use crate::description::format_description;
use crate::dlog;
use crate::error::{FieldRule, InvalidField, NotFound, ValidationError};
use crate::metrics::{calc_pace, calc_speed};
use crate::types::{Coordinates, KindInput, Workout, WorkoutDetails, WorkoutForm, WorkoutId};
use chrono::{DateTime, Local, Utc};

/// Ordered, in-memory collection of workouts. Insertion order is display order.
#[derive(Debug, Default)]
pub struct WorkoutStore {
    workouts: Vec<Workout>,
    /// Highest id ever issued or adopted; survives `clear`.
    last_id: Option<WorkoutId>,
}

impl WorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `form` and builds a new workout stamped with the current time.
    ///
    /// The workout is not added; call [`append`](Self::append) for that.
    pub fn create(
        &mut self,
        coords: Coordinates,
        form: &WorkoutForm,
    ) -> Result<Workout, ValidationError> {
        self.create_at(coords, form, Utc::now())
    }

    pub fn create_at(
        &mut self,
        coords: Coordinates,
        form: &WorkoutForm,
        created_at: DateTime<Utc>,
    ) -> Result<Workout, ValidationError> {
        validate(coords, form)?;

        let WorkoutForm {
            distance_km,
            duration_min,
            input,
        } = *form;
        let details = match input {
            KindInput::Running { cadence_spm } => WorkoutDetails::Running {
                cadence_spm,
                pace_min_per_km: calc_pace(distance_km, duration_min),
            },
            KindInput::Cycling { elevation_gain_m } => WorkoutDetails::Cycling {
                elevation_gain_m,
                speed_km_per_h: calc_speed(distance_km, duration_min),
            },
        };
        check_derived(distance_km, duration_min, &details)?;
        let description = format_description(input.kind(), &created_at.with_timezone(&Local));
        let id = self.allocate_id(created_at);
        dlog!("created workout id={id} kind={}", input.kind());

        Ok(Workout::from_parts(
            id,
            created_at,
            coords,
            distance_km,
            duration_min,
            description,
            details,
        ))
    }

    pub fn append(&mut self, workout: Workout) {
        self.adopt_id(workout.id());
        self.workouts.push(workout);
    }

    pub fn find_by_id(&self, id: WorkoutId) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id() == id)
    }

    pub fn remove_by_id(&mut self, id: WorkoutId) -> Result<Workout, NotFound> {
        let idx = self
            .workouts
            .iter()
            .position(|w| w.id() == id)
            .ok_or(NotFound(id))?;
        Ok(self.workouts.remove(idx))
    }

    pub fn all(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }

    /// Replaces the contents with restored workouts, keeping their order.
    pub fn replace_all(&mut self, workouts: Vec<Workout>) {
        for w in &workouts {
            self.adopt_id(w.id());
        }
        self.workouts = workouts;
    }

    pub fn clear(&mut self) {
        self.workouts.clear();
    }

    /// Ids follow the creation time in milliseconds, bumped past anything
    /// already issued so two workouts created in the same millisecond differ.
    fn allocate_id(&mut self, created_at: DateTime<Utc>) -> WorkoutId {
        let millis = u64::try_from(created_at.timestamp_millis()).unwrap_or(0);
        let id = match self.last_id {
            Some(WorkoutId(last)) if millis <= last => WorkoutId(last.saturating_add(1)),
            _ => WorkoutId(millis),
        };
        self.last_id = Some(id);
        id
    }

    fn adopt_id(&mut self, id: WorkoutId) {
        if self.last_id.is_none_or(|last| id > last) {
            self.last_id = Some(id);
        }
    }
}

fn validate(coords: Coordinates, form: &WorkoutForm) -> Result<(), ValidationError> {
    let mut fields = Vec::new();

    for (field, value) in [("latitude", coords.lat), ("longitude", coords.lng)] {
        check(&mut fields, field, value, FieldRule::Finite);
    }
    check(&mut fields, "distance_km", form.distance_km, FieldRule::Positive);
    check(&mut fields, "duration_min", form.duration_min, FieldRule::Positive);
    match form.input {
        KindInput::Running { cadence_spm } => {
            check(&mut fields, "cadence_spm", cadence_spm, FieldRule::Positive);
        }
        // Elevation may be zero or negative; it only has to be a number.
        KindInput::Cycling { elevation_gain_m } => {
            check(&mut fields, "elevation_gain_m", elevation_gain_m, FieldRule::Finite);
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { fields })
    }
}

/// Valid inputs can still overflow, e.g. a distance of `1e-310` km gives an
/// infinite pace. Such a workout could never be saved.
fn check_derived(
    distance_km: f64,
    duration_min: f64,
    details: &WorkoutDetails,
) -> Result<(), ValidationError> {
    let derived = match *details {
        WorkoutDetails::Running {
            pace_min_per_km, ..
        } => pace_min_per_km,
        WorkoutDetails::Cycling { speed_km_per_h, .. } => speed_km_per_h,
    };
    if derived.is_finite() {
        return Ok(());
    }
    let rule = FieldRule::FiniteRatio;
    Err(ValidationError {
        fields: vec![
            InvalidField {
                field: "distance_km",
                value: distance_km,
                rule,
            },
            InvalidField {
                field: "duration_min",
                value: duration_min,
                rule,
            },
        ],
    })
}

fn check(out: &mut Vec<InvalidField>, field: &'static str, value: f64, rule: FieldRule) {
    let rule = if value.is_finite() {
        match rule {
            FieldRule::Positive if value <= 0.0 => FieldRule::Positive,
            _ => return,
        }
    } else {
        FieldRule::Finite
    };
    out.push(InvalidField { field, value, rule });
}
