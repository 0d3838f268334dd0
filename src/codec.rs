//! Flat JSON representation of the workout store.
//!
//! Each workout becomes one object tagged with `"type"`. Derived values are
//! written as computed and read back verbatim. Marker handles never appear
//! here; they belong to the map view.

use crate::error::PersistenceError;
use crate::store::WorkoutStore;
use crate::types::{Coordinates, Workout, WorkoutDetails, WorkoutId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StoredWorkout {
    Running {
        #[serde(flatten)]
        common: StoredCommon,
        cadence_spm: f64,
        pace_min_per_km: f64,
    },
    Cycling {
        #[serde(flatten)]
        common: StoredCommon,
        elevation_gain_m: f64,
        speed_km_per_h: f64,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCommon {
    id: u64,
    created_at: DateTime<Utc>,
    coords: [f64; 2],
    distance_km: f64,
    duration_min: f64,
    description: String,
}

impl From<&Workout> for StoredWorkout {
    fn from(w: &Workout) -> Self {
        let c = w.coords();
        let common = StoredCommon {
            id: w.id().0,
            created_at: w.created_at(),
            coords: [c.lat, c.lng],
            distance_km: w.distance_km(),
            duration_min: w.duration_min(),
            description: w.description().to_string(),
        };
        match *w.details() {
            WorkoutDetails::Running {
                cadence_spm,
                pace_min_per_km,
            } => Self::Running {
                common,
                cadence_spm,
                pace_min_per_km,
            },
            WorkoutDetails::Cycling {
                elevation_gain_m,
                speed_km_per_h,
            } => Self::Cycling {
                common,
                elevation_gain_m,
                speed_km_per_h,
            },
        }
    }
}

impl From<StoredWorkout> for Workout {
    fn from(s: StoredWorkout) -> Self {
        let (common, details) = match s {
            StoredWorkout::Running {
                common,
                cadence_spm,
                pace_min_per_km,
            } => (
                common,
                WorkoutDetails::Running {
                    cadence_spm,
                    pace_min_per_km,
                },
            ),
            StoredWorkout::Cycling {
                common,
                elevation_gain_m,
                speed_km_per_h,
            } => (
                common,
                WorkoutDetails::Cycling {
                    elevation_gain_m,
                    speed_km_per_h,
                },
            ),
        };
        let [lat, lng] = common.coords;
        Self::from_parts(
            WorkoutId(common.id),
            common.created_at,
            Coordinates::new(lat, lng),
            common.distance_km,
            common.duration_min,
            common.description,
            details,
        )
    }
}

/// Serializes every workout in insertion order.
///
/// JSON has no encoding for NaN or infinities, and `serde_json` would quietly
/// write them as `null`; such values fail here instead.
pub fn serialize(store: &WorkoutStore) -> Result<String, PersistenceError> {
    for w in store.all() {
        ensure_representable(w)?;
    }
    let stored: Vec<StoredWorkout> = store.all().iter().map(StoredWorkout::from).collect();
    serde_json::to_string(&stored).map_err(|e| PersistenceError::Storage(e.to_string()))
}

/// Restores workouts from a blob read under `key`.
///
/// A missing or blank blob means there is no history yet.
pub fn deserialize(key: &str, blob: Option<&str>) -> Result<Vec<Workout>, PersistenceError> {
    let Some(blob) = blob.filter(|b| !b.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    let format_err = |message: String| PersistenceError::Format {
        key: key.to_string(),
        message,
    };

    let stored: Vec<StoredWorkout> =
        serde_json::from_str(blob).map_err(|e| format_err(e.to_string()))?;

    let mut seen = HashSet::with_capacity(stored.len());
    let mut out = Vec::with_capacity(stored.len());
    for s in stored {
        let w = Workout::from(s);
        if !seen.insert(w.id()) {
            return Err(format_err(format!("duplicate workout id {}", w.id())));
        }
        out.push(w);
    }
    Ok(out)
}

fn ensure_representable(w: &Workout) -> Result<(), PersistenceError> {
    let c = w.coords();
    let mut fields = vec![
        ("latitude", c.lat),
        ("longitude", c.lng),
        ("distance_km", w.distance_km()),
        ("duration_min", w.duration_min()),
    ];
    match *w.details() {
        WorkoutDetails::Running {
            cadence_spm,
            pace_min_per_km,
        } => {
            fields.push(("cadence_spm", cadence_spm));
            fields.push(("pace_min_per_km", pace_min_per_km));
        }
        WorkoutDetails::Cycling {
            elevation_gain_m,
            speed_km_per_h,
        } => {
            fields.push(("elevation_gain_m", elevation_gain_m));
            fields.push(("speed_km_per_h", speed_km_per_h));
        }
    }

    match fields.into_iter().find(|(_, v)| !v.is_finite()) {
        Some((field, value)) => Err(PersistenceError::Serialization {
            id: w.id(),
            field,
            value,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KindInput, WorkoutForm};
    use chrono::TimeZone;

    fn sample_store() -> WorkoutStore {
        let mut store = WorkoutStore::new();
        let t = Utc.with_ymd_and_hms(2024, 3, 3, 7, 15, 0).unwrap();
        let run = store
            .create_at(
                Coordinates::new(38.7223, -9.1393),
                &WorkoutForm {
                    distance_km: 5.2,
                    duration_min: 24.0,
                    input: KindInput::Running { cadence_spm: 178.0 },
                },
                t,
            )
            .unwrap();
        let ride = store
            .create_at(
                Coordinates::new(38.70, -9.20),
                &WorkoutForm {
                    distance_km: 27.0,
                    duration_min: 95.0,
                    input: KindInput::Cycling {
                        elevation_gain_m: -12.0,
                    },
                },
                t,
            )
            .unwrap();
        store.append(run);
        store.append(ride);
        store
    }

    #[test]
    fn test_round_trip_preserves_order_and_variants() {
        let store = sample_store();
        let blob = serialize(&store).unwrap();
        let restored = deserialize("workouts", Some(&blob)).unwrap();
        assert_eq!(restored.as_slice(), store.all());
        assert!(matches!(
            restored[0].details(),
            WorkoutDetails::Running {
                cadence_spm,
                ..
            } if *cadence_spm == 178.0
        ));
        assert!(matches!(
            restored[1].details(),
            WorkoutDetails::Cycling {
                elevation_gain_m,
                ..
            } if *elevation_gain_m == -12.0
        ));
    }

    #[test]
    fn test_blob_is_flat_and_tagged() {
        let blob = serialize(&sample_store()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&blob).unwrap();
        let first = &v[0];
        assert_eq!(first["type"], "running");
        assert_eq!(first["cadence_spm"], 178.0);
        assert!(first.get("pace_min_per_km").is_some());
        assert!(first.get("common").is_none());
        assert_eq!(v[1]["type"], "cycling");
    }

    #[test]
    fn test_derived_values_are_not_recomputed() {
        let blob = r#"[{"type":"running","id":1,"created_at":"2024-03-03T07:15:00Z",
            "coords":[1.0,2.0],"distance_km":5.0,"duration_min":25.0,
            "description":"Running on March 3","cadence_spm":170.0,"pace_min_per_km":4.2}]"#;
        let restored = deserialize("workouts", Some(blob)).unwrap();
        assert_eq!(
            *restored[0].details(),
            WorkoutDetails::Running {
                cadence_spm: 170.0,
                pace_min_per_km: 4.2
            }
        );
        assert_eq!(restored[0].description(), "Running on March 3");
    }

    #[test]
    fn test_missing_or_blank_blob_is_empty() {
        assert!(deserialize("workouts", None).unwrap().is_empty());
        assert!(deserialize("workouts", Some("  ")).unwrap().is_empty());
        assert!(deserialize("workouts", Some("[]")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_blob_is_format_error() {
        for blob in [
            "{not json",
            r#"{"type":"running"}"#,
            r#"[{"type":"swimming","id":1}]"#,
        ] {
            let err = deserialize("workouts", Some(blob)).unwrap_err();
            assert!(
                matches!(err, PersistenceError::Format { ref key, .. } if key == "workouts"),
                "{blob}: {err}"
            );
        }
    }

    #[test]
    fn test_duplicate_ids_are_format_error() {
        let store = sample_store();
        let mut v: serde_json::Value = serde_json::from_str(&serialize(&store).unwrap()).unwrap();
        v[1]["id"] = v[0]["id"].clone();
        let err = deserialize("workouts", Some(&v.to_string())).unwrap_err();
        assert!(err.to_string().contains("duplicate workout id"));
    }

    #[test]
    fn test_non_finite_value_fails_serialization() {
        let mut store = WorkoutStore::new();
        let w = Workout::from_parts(
            WorkoutId(9),
            Utc::now(),
            Coordinates::new(0.0, 0.0),
            1.0,
            1.0,
            "Running on May 1".to_string(),
            WorkoutDetails::Running {
                cadence_spm: 160.0,
                pace_min_per_km: f64::INFINITY,
            },
        );
        store.append(w);
        let err = serialize(&store).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Serialization {
                id: WorkoutId(9),
                field: "pace_min_per_km",
                ..
            }
        ));
    }
}
