// Finished workouts keyed by their completion date
use chrono::{DateTime, Local, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::session::SessionTable;
use crate::storage::{Persistence, StorageError, WORKOUTS_STORAGE_KEY};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One exercise as recorded in a session. All metrics are free text.
///
/// `weight` is stored under the historical key `weigth` so existing logs
/// stay readable; `weight` is accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub name: String,
    #[serde(rename = "weigth", alias = "weight", default)]
    pub weight: String,
    #[serde(default)]
    pub reps: String,
    #[serde(rename = "break", default)]
    pub rest: String,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workout {
    pub date: DateTime<Utc>,
    pub exercises: Vec<ExerciseEntry>,
}

impl Workout {
    /// A workout completed at `date`, kept at the millisecond precision the
    /// log stores.
    pub fn completed_at(date: DateTime<Utc>, exercises: Vec<ExerciseEntry>) -> Self {
        Self {
            date: date.trunc_subsecs(3),
            exercises,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkoutError {
    DuplicateDate(DateTime<Utc>),
}

impl std::fmt::Display for WorkoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkoutError::DuplicateDate(d) => {
                write!(f, "A workout dated {} already exists", d.to_rfc3339())
            }
        }
    }
}

impl std::error::Error for WorkoutError {}

/// What the previous workout list shows for one workout.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSummary {
    pub title: String,
    /// Serialized form of the workout.
    pub body: String,
    pub id: egui::Id,
}

impl WorkoutSummary {
    fn new(workout: &Workout, date_format: &str) -> Self {
        let local = workout.date.with_timezone(&Local);
        let mut title = String::new();
        if write!(title, "{}", local.format(date_format)).is_err() {
            title.clear();
            let _ = write!(title, "{}", local.format(DEFAULT_DATE_FORMAT));
        }
        Self {
            title,
            body: serde_json::to_string(workout).unwrap_or_default(),
            id: egui::Id::new(("workout_summary", workout.date)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggedWorkout {
    pub workout: Workout,
    pub summary: WorkoutSummary,
}

/// All finished workouts, ordered by date.
#[derive(Debug)]
pub struct WorkoutLog {
    entries: BTreeMap<DateTime<Utc>, LoggedWorkout>,
    date_format: String,
}

impl Default for WorkoutLog {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT)
    }
}

impl WorkoutLog {
    pub fn new(date_format: &str) -> Self {
        Self {
            entries: BTreeMap::new(),
            date_format: date_format.to_string(),
        }
    }

    /// Rebuild the log from the stored workout list.
    ///
    /// Entries that cannot be read, or whose date collides with an earlier
    /// one, are skipped so the rest of the history survives.
    pub fn restore(store: &Persistence, date_format: &str) -> Result<Self, StorageError> {
        let mut restored = Self::new(date_format);
        let stored: Vec<serde_json::Value> =
            store.load(WORKOUTS_STORAGE_KEY)?.unwrap_or_default();
        for (index, value) in stored.into_iter().enumerate() {
            let workout = match serde_json::from_value::<Workout>(value) {
                Ok(w) => w,
                Err(e) => {
                    log::warn!("Skipping unreadable stored workout #{index}: {e}");
                    continue;
                }
            };
            if let Err(e) = restored.add_workout(workout) {
                log::warn!("Skipping stored workout: {e}");
            }
        }
        log::info!("Restored {} workouts", restored.len());
        Ok(restored)
    }

    pub fn add_workout(&mut self, workout: Workout) -> Result<(), WorkoutError> {
        if self.entries.contains_key(&workout.date) {
            return Err(WorkoutError::DuplicateDate(workout.date));
        }
        let summary = WorkoutSummary::new(&workout, &self.date_format);
        self.entries
            .insert(workout.date, LoggedWorkout { workout, summary });
        Ok(())
    }

    pub fn remove_workout(&mut self, date: &DateTime<Utc>) -> Option<Workout> {
        self.entries.remove(date).map(|e| e.workout)
    }

    /// Persist every workout payload in date order.
    pub fn store_workouts(&self, store: &mut Persistence) -> Result<(), StorageError> {
        let workouts: Vec<&Workout> = self.entries.values().map(|e| &e.workout).collect();
        store.store(WORKOUTS_STORAGE_KEY, &workouts)
    }

    pub fn most_recent(&self) -> Option<&Workout> {
        self.entries.values().next_back().map(|e| &e.workout)
    }

    /// Fill `table` with the exercises of the most recent workout.
    ///
    /// Returns the number of rows added, or `None` if the log is empty.
    pub fn load_exercise_from_last_workout(&self, table: &mut SessionTable) -> Option<usize> {
        let workout = self.most_recent()?;
        for exercise in &workout.exercises {
            table.push_row(&exercise.name, Some(exercise));
        }
        Some(workout.exercises.len())
    }

    #[cfg(test)]
    pub fn get(&self, date: &DateTime<Utc>) -> Option<&LoggedWorkout> {
        self.entries.get(date)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LoggedWorkout> + '_ {
        self.entries.values()
    }

    #[cfg(test)]
    pub fn dates(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
