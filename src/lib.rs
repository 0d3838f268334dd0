pub mod cli;
pub mod codec;
pub mod description;
pub mod error;
pub mod gpx;
pub mod metrics;
pub mod session;
pub mod storage;
pub mod store;
pub mod terminal;
pub mod types;
pub mod utils;
pub mod view;

pub use error::{LocationError, NotFound, PersistenceError, SessionError, ValidationError};
pub use session::{Committed, SessionConfig, SessionController, SessionState};
pub use store::WorkoutStore;
pub use types::{Coordinates, KindInput, Workout, WorkoutDetails, WorkoutForm, WorkoutId, WorkoutKind};
