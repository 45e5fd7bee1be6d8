//! Application state and the handlers bound to user actions.
//!
//! [`TrainingState`] owns every collection the window shows together with
//! the durable store. Each handler performs one user action, re-serializes
//! whatever collection it changed and reports what happened as an
//! [`Outcome`] or an [`AppError`].

use chrono::{DateTime, Utc};

use crate::exercises::{ExerciseError, ExerciseRegistry};
use crate::session::{ExerciseSelection, SessionError, SessionTable};
use crate::storage::{Persistence, StorageError};
use crate::workouts::{WorkoutError, WorkoutLog};

#[derive(Debug)]
pub enum AppError {
    Exercise(ExerciseError),
    Workout(WorkoutError),
    Session(SessionError),
    UnknownExercise(String),
    UnknownWorkout(DateTime<Utc>),
    UnknownRow(u64),
}

impl AppError {
    /// `true` when the action simply had nothing to act on.
    pub fn is_no_op(&self) -> bool {
        matches!(
            self,
            AppError::Exercise(ExerciseError::EmptyName)
                | AppError::Session(_)
                | AppError::UnknownExercise(_)
                | AppError::UnknownWorkout(_)
                | AppError::UnknownRow(_)
        )
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Exercise(e) => write!(f, "{e}"),
            AppError::Workout(e) => write!(f, "{e}"),
            AppError::Session(e) => write!(f, "{e}"),
            AppError::UnknownExercise(name) => write!(f, "No exercise named '{name}'"),
            AppError::UnknownWorkout(date) => {
                write!(f, "No workout dated {}", date.to_rfc3339())
            }
            AppError::UnknownRow(id) => write!(f, "No session row {id}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Exercise(e) => Some(e),
            AppError::Workout(e) => Some(e),
            AppError::Session(e) => Some(e),
            AppError::UnknownExercise(_)
            | AppError::UnknownWorkout(_)
            | AppError::UnknownRow(_) => None,
        }
    }
}

impl From<ExerciseError> for AppError {
    fn from(e: ExerciseError) -> Self {
        AppError::Exercise(e)
    }
}

impl From<WorkoutError> for AppError {
    fn from(e: WorkoutError) -> Self {
        AppError::Workout(e)
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    ExerciseAdded(String),
    ExerciseRemoved(String),
    RowAdded(String),
    RowRemoved,
    WorkoutSaved(DateTime<Utc>),
    WorkoutDeleted(DateTime<Utc>),
}

/// Result of a successful action.
///
/// The in-memory change always happened. `persisted` tells whether it also
/// reached the durable store, and `write_error` holds the reason when a
/// write was attempted and failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub change: Change,
    pub persisted: bool,
    pub write_error: Option<String>,
}

impl Outcome {
    fn memory_only(change: Change) -> Self {
        Self {
            change,
            persisted: false,
            write_error: None,
        }
    }

    /// Pair `change` with the result of writing it to the store.
    ///
    /// Missing storage is not an error; the change stays in memory.
    fn written(change: Change, result: Result<(), StorageError>) -> Self {
        match result {
            Ok(()) => Self {
                change,
                persisted: true,
                write_error: None,
            },
            Err(StorageError::Unavailable) => {
                log::debug!("Storage unavailable, keeping change in memory only");
                Self::memory_only(change)
            }
            Err(e) => {
                log::error!("Failed to persist change: {e}");
                Self {
                    write_error: Some(e.to_string()),
                    ..Self::memory_only(change)
                }
            }
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.change {
            Change::ExerciseAdded(name) => write!(f, "Added exercise '{name}'")?,
            Change::ExerciseRemoved(name) => write!(f, "Removed exercise '{name}'")?,
            Change::RowAdded(name) => write!(f, "Added '{name}' to the session")?,
            Change::RowRemoved => write!(f, "Removed exercise from the session")?,
            Change::WorkoutSaved(_) => write!(f, "Workout saved")?,
            Change::WorkoutDeleted(_) => write!(f, "Workout deleted")?,
        }
        if let Some(e) = &self.write_error {
            write!(f, " but could not be stored: {e}")?;
        } else if !self.persisted
            && !matches!(self.change, Change::RowAdded(_) | Change::RowRemoved)
        {
            write!(f, " (not stored)")?;
        }
        Ok(())
    }
}

/// Options applied while restoring stored state.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub prefill_from_last_workout: bool,
    pub date_format: String,
}

pub struct TrainingState {
    pub exercises: ExerciseRegistry,
    pub workouts: WorkoutLog,
    pub session: SessionTable,
    pub selection: ExerciseSelection,
    pub new_exercise_name: String,
    /// Messages the user has to acknowledge, produced while restoring.
    pub notices: Vec<String>,
    store: Persistence,
}

impl TrainingState {
    /// Restore both collections from `store` and pre-fill the session table.
    pub fn restore(store: Persistence, options: &RestoreOptions) -> Self {
        let mut notices = Vec::new();
        if !store.is_available() {
            notices.push(
                "Storage is not supported. Your training can't be stored on this machine."
                    .to_string(),
            );
        }

        let exercises = ExerciseRegistry::restore(&store).unwrap_or_else(|e| {
            log::error!("Failed to restore exercises: {e}");
            notices.push(format!("Saved exercises could not be loaded: {e}"));
            ExerciseRegistry::default()
        });
        let workouts = WorkoutLog::restore(&store, &options.date_format).unwrap_or_else(|e| {
            log::error!("Failed to restore workouts: {e}");
            notices.push(format!("Saved workouts could not be loaded: {e}"));
            WorkoutLog::new(&options.date_format)
        });

        let mut session = SessionTable::default();
        if options.prefill_from_last_workout {
            if let Some(rows) = workouts.load_exercise_from_last_workout(&mut session) {
                log::info!("Pre-filled {rows} exercises from the last workout");
            }
        }

        Self {
            exercises,
            workouts,
            session,
            selection: None,
            new_exercise_name: String::new(),
            notices,
            store,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &Persistence {
        &self.store
    }

    /// Add the selected exercise to the session as a blank row.
    pub fn add_to_session(&mut self) -> Result<Outcome, AppError> {
        let name = self.selection.clone();
        self.session.add_selected_exercise(&mut self.selection)?;
        Ok(Outcome::memory_only(Change::RowAdded(
            name.unwrap_or_default(),
        )))
    }

    pub fn remove_session_row(&mut self, id: u64) -> Result<Outcome, AppError> {
        if self.session.remove_row(id) {
            Ok(Outcome::memory_only(Change::RowRemoved))
        } else {
            Err(AppError::UnknownRow(id))
        }
    }

    /// Register the name typed into the new-exercise input and persist the list.
    pub fn add_named_exercise(&mut self) -> Result<Outcome, AppError> {
        let name = self.new_exercise_name.trim().to_string();
        if name.is_empty() {
            return Err(ExerciseError::EmptyName.into());
        }
        self.exercises.add_named_exercise(&name)?;
        self.new_exercise_name.clear();
        let written = self.exercises.sync_named_exercises(&mut self.store);
        Ok(Outcome::written(Change::ExerciseAdded(name), written))
    }

    pub fn remove_named_exercise(&mut self, name: &str) -> Result<Outcome, AppError> {
        if !self.exercises.remove_named_exercise(name) {
            return Err(AppError::UnknownExercise(name.to_string()));
        }
        if self.selection.as_deref() == Some(name) {
            self.selection = None;
        }
        let written = self.exercises.sync_named_exercises(&mut self.store);
        Ok(Outcome::written(
            Change::ExerciseRemoved(name.to_string()),
            written,
        ))
    }

    /// Turn the session table into a workout dated `now` and persist the log.
    ///
    /// An empty table leaves the log and the store untouched. The table is
    /// cleared only once the workout has been accepted by the log. A failed
    /// write still keeps the workout in the log and is reported through
    /// [`Outcome::write_error`].
    pub fn finish_workout(&mut self, now: DateTime<Utc>) -> Result<Outcome, AppError> {
        let workout = self.session.to_workout(now)?;
        let date = workout.date;
        self.workouts.add_workout(workout)?;
        self.session.clear();
        log::info!("Finished workout {}", date.to_rfc3339());
        let written = self.workouts.store_workouts(&mut self.store);
        Ok(Outcome::written(Change::WorkoutSaved(date), written))
    }

    pub fn delete_workout(&mut self, date: DateTime<Utc>) -> Result<Outcome, AppError> {
        if self.workouts.remove_workout(&date).is_none() {
            return Err(AppError::UnknownWorkout(date));
        }
        let written = self.workouts.store_workouts(&mut self.store);
        Ok(Outcome::written(Change::WorkoutDeleted(date), written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{EXERCISES_STORAGE_KEY, KeyValueStore, MemoryStore, WORKOUTS_STORAGE_KEY};
    use crate::workouts::{DEFAULT_DATE_FORMAT, ExerciseEntry, Workout};
    use chrono::TimeZone;

    fn options() -> RestoreOptions {
        RestoreOptions {
            prefill_from_last_workout: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    fn fresh() -> TrainingState {
        TrainingState::restore(Persistence::memory(), &options())
    }

    /// Reads nothing and fails every write.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get_string(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set_string(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn add_named_exercise_persists_immediately() {
        let mut state = fresh();
        state.new_exercise_name = "Squat".into();
        let outcome = state.add_named_exercise().unwrap();
        assert_eq!(outcome.change, Change::ExerciseAdded("Squat".into()));
        assert!(outcome.persisted);
        assert!(state.new_exercise_name.is_empty());
        assert_eq!(state.exercises.options().len(), 1);
        assert_eq!(state.exercises.options()[0].name, "Squat");
        assert_eq!(
            state.store().raw(EXERCISES_STORAGE_KEY).unwrap().as_deref(),
            Some(r#"["Squat"]"#)
        );
    }

    #[test]
    fn blank_exercise_name_is_a_no_op() {
        let mut state = fresh();
        state.new_exercise_name = "  ".into();
        let err = state.add_named_exercise().unwrap_err();
        assert!(err.is_no_op());
        assert_eq!(state.new_exercise_name, "  ");
        assert!(state.store().raw(EXERCISES_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn duplicate_exercise_is_an_error() {
        let mut state = fresh();
        state.new_exercise_name = "Squat".into();
        state.add_named_exercise().unwrap();
        state.new_exercise_name = "Squat".into();
        let err = state.add_named_exercise().unwrap_err();
        assert!(!err.is_no_op());
        assert_eq!(state.exercises.len(), 1);
        assert_eq!(state.new_exercise_name, "Squat");
    }

    #[test]
    fn removing_exercise_resyncs_and_clears_selection() {
        let mut state = fresh();
        for name in ["Squat", "Bench"] {
            state.new_exercise_name = name.into();
            state.add_named_exercise().unwrap();
        }
        state.selection = Some("Squat".into());
        state.remove_named_exercise("Squat").unwrap();
        assert!(state.selection.is_none());
        let stored: Vec<String> = state.store().load(EXERCISES_STORAGE_KEY).unwrap().unwrap();
        assert_eq!(stored, vec!["Bench"]);

        let err = state.remove_named_exercise("Squat").unwrap_err();
        assert!(matches!(err, AppError::UnknownExercise(_)));
    }

    #[test]
    fn squat_session_end_to_end() {
        let mut state = fresh();
        state.new_exercise_name = "Squat".into();
        state.add_named_exercise().unwrap();

        state.selection = Some("Squat".into());
        state.add_to_session().unwrap();
        assert!(state.selection.is_none());
        assert_eq!(state.session.len(), 1);
        assert_eq!(state.session.rows()[0].name(), "Squat");

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let outcome = state.finish_workout(now).unwrap();
        assert_eq!(outcome.change, Change::WorkoutSaved(now));
        assert!(state.session.is_empty());

        let expected = ExerciseEntry {
            name: "Squat".into(),
            ..Default::default()
        };
        assert_eq!(state.workouts.len(), 1);
        assert_eq!(state.workouts.most_recent().unwrap().exercises, vec![expected]);
        assert_eq!(
            state.store().raw(WORKOUTS_STORAGE_KEY).unwrap().as_deref(),
            Some(
                r#"[{"date":"2024-06-01T18:00:00Z","exercises":[{"name":"Squat","weigth":"","reps":"","break":"","comments":""}]}]"#
            )
        );
    }

    #[test]
    fn add_to_session_without_selection() {
        let mut state = fresh();
        let err = state.add_to_session().unwrap_err();
        assert!(matches!(err, AppError::Session(SessionError::NothingSelected)));
        assert!(state.session.is_empty());
    }

    #[test]
    fn finishing_empty_session_writes_nothing() {
        let mut state = fresh();
        let err = state.finish_workout(Utc::now()).unwrap_err();
        assert!(err.is_no_op());
        assert!(state.workouts.is_empty());
        assert!(state.store().raw(WORKOUTS_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn same_instant_finish_keeps_session_rows() {
        let mut state = fresh();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        state.session.push_row("Squat", None);
        state.finish_workout(now).unwrap();
        state.session.push_row("Bench", None);
        let err = state.finish_workout(now).unwrap_err();
        assert!(matches!(err, AppError::Workout(WorkoutError::DuplicateDate(_))));
        assert_eq!(state.session.len(), 1);
        assert_eq!(state.workouts.len(), 1);
    }

    #[test]
    fn delete_workout_resyncs_log() {
        let mut state = fresh();
        let d1 = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2024, 6, 3, 18, 0, 0).unwrap();
        for d in [d1, d2] {
            state.session.push_row("Squat", None);
            state.finish_workout(d).unwrap();
        }
        state.delete_workout(d1).unwrap();
        let stored: Vec<Workout> = state.store().load(WORKOUTS_STORAGE_KEY).unwrap().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].date, d2);
        assert!(matches!(
            state.delete_workout(d1),
            Err(AppError::UnknownWorkout(_))
        ));
    }

    #[test]
    fn restore_prefills_from_latest_workout() {
        let mut mem = MemoryStore::default();
        mem.set_string(EXERCISES_STORAGE_KEY, r#"["Squat","Bench"]"#)
            .unwrap();
        mem.set_string(
            WORKOUTS_STORAGE_KEY,
            r#"[{"date":"2024-06-03T18:00:00.000Z","exercises":[{"name":"Bench","weigth":"80","reps":"8","break":"60","comments":""}]},
               {"date":"2024-06-01T18:00:00.000Z","exercises":[{"name":"Squat","weigth":"100","reps":"5","break":"90","comments":""}]}]"#,
        )
        .unwrap();
        let state = TrainingState::restore(Persistence::Available(Box::new(mem)), &options());
        assert!(state.notices.is_empty());
        assert_eq!(state.exercises.len(), 2);
        assert_eq!(state.workouts.len(), 2);
        assert_eq!(state.session.len(), 1);
        assert_eq!(state.session.rows()[0].name(), "Bench");
        assert_eq!(state.session.rows()[0].weight, "80");
    }

    #[test]
    fn restore_without_prefill_leaves_session_empty() {
        let mut state = fresh();
        state.session.push_row("Squat", None);
        state.finish_workout(Utc::now()).unwrap();

        let mut opts = options();
        opts.prefill_from_last_workout = false;
        let mut mem = MemoryStore::default();
        let raw = state.store().raw(WORKOUTS_STORAGE_KEY).unwrap().unwrap();
        mem.set_string(WORKOUTS_STORAGE_KEY, &raw).unwrap();
        let restored = TrainingState::restore(Persistence::Available(Box::new(mem)), &opts);
        assert_eq!(restored.workouts.len(), 1);
        assert!(restored.session.is_empty());
    }

    #[test]
    fn corrupt_store_starts_empty_with_notice() {
        let mut mem = MemoryStore::default();
        mem.set_string(WORKOUTS_STORAGE_KEY, "not json").unwrap();
        let state = TrainingState::restore(Persistence::Available(Box::new(mem)), &options());
        assert!(state.workouts.is_empty());
        assert_eq!(state.notices.len(), 1);
    }

    #[test]
    fn unavailable_storage_runs_session_only() {
        let mut state = TrainingState::restore(Persistence::Unavailable, &options());
        assert_eq!(state.notices.len(), 1);

        state.new_exercise_name = "Squat".into();
        let outcome = state.add_named_exercise().unwrap();
        assert!(!outcome.persisted);
        assert!(outcome.write_error.is_none());
        assert!(outcome.to_string().ends_with("(not stored)"));

        state.selection = Some("Squat".into());
        state.add_to_session().unwrap();
        let outcome = state.finish_workout(Utc::now()).unwrap();
        assert!(!outcome.persisted);
        assert_eq!(state.workouts.len(), 1);
    }

    #[test]
    fn failed_write_keeps_changes_in_memory() {
        let store = Persistence::Available(Box::new(ReadOnlyStore));
        let mut state = TrainingState::restore(store, &options());
        assert!(state.notices.is_empty());

        state.new_exercise_name = "Squat".into();
        let outcome = state.add_named_exercise().unwrap();
        assert!(!outcome.persisted);
        assert!(outcome.write_error.is_some());
        assert!(state.exercises.contains("Squat"));
        assert!(state.new_exercise_name.is_empty());

        state.session.push_row("Squat", None);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let outcome = state.finish_workout(now).unwrap();
        assert_eq!(outcome.change, Change::WorkoutSaved(now));
        assert!(!outcome.persisted);
        assert!(outcome.to_string().contains("could not be stored"));
        assert_eq!(state.workouts.len(), 1);
        assert!(state.session.is_empty());
    }

    #[test]
    fn unreadable_stored_workout_does_not_wipe_history() {
        let mut mem = MemoryStore::default();
        mem.set_string(
            WORKOUTS_STORAGE_KEY,
            r#"[{"date":"2024-06-01T18:00:00.000Z","exercises":[{"name":"Squat","weigth":"100","reps":"5","break":"90","comments":""}]},
               {"date":null,"exercises":[]},
               {"date":"2024-06-03T18:00:00.000Z","exercises":[{"name":"Bench","weigth":"80","reps":"8","break":"60","comments":""}]}]"#,
        )
        .unwrap();
        let mut state = TrainingState::restore(Persistence::Available(Box::new(mem)), &options());
        assert!(state.notices.is_empty());
        assert_eq!(state.workouts.len(), 2);

        state.session.clear();
        state.session.push_row("Bench", None);
        let now = Utc.with_ymd_and_hms(2024, 6, 5, 18, 0, 0).unwrap();
        state.finish_workout(now).unwrap();

        let stored: Vec<Workout> = state.store().load(WORKOUTS_STORAGE_KEY).unwrap().unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2].date, now);
    }
}
