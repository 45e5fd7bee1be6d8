// The editable table for the session currently being built
use crate::workouts::{ExerciseEntry, Workout};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The selector shows the "none selected" entry.
    NothingSelected,
    /// The table has no exercise rows.
    EmptySession,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NothingSelected => write!(f, "No exercise selected"),
            SessionError::EmptySession => write!(f, "The session has no exercises"),
        }
    }
}

impl std::error::Error for SessionError {}

/// One row of the session table.
///
/// The exercise name is fixed when the row is created; the metric fields are
/// edited in place by the table widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    id: u64,
    name: String,
    pub weight: String,
    pub reps: String,
    pub rest: String,
    pub comments: String,
}

impl SessionRow {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Exercise chosen in the selector. `None` is the "none selected" entry.
pub type ExerciseSelection = Option<String>;

#[derive(Debug, Default)]
pub struct SessionTable {
    rows: Vec<SessionRow>,
    next_id: u64,
}

impl SessionTable {
    /// Build a row for `name`, copying metrics from `defaults` when given.
    pub fn create_exercise_table_row(
        &mut self,
        name: &str,
        defaults: Option<&ExerciseEntry>,
    ) -> SessionRow {
        let id = self.next_id;
        self.next_id += 1;
        let (weight, reps, rest, comments) = match defaults {
            Some(d) => (
                d.weight.clone(),
                d.reps.clone(),
                d.rest.clone(),
                d.comments.clone(),
            ),
            None => Default::default(),
        };
        SessionRow {
            id,
            name: name.to_string(),
            weight,
            reps,
            rest,
            comments,
        }
    }

    /// Append a new row and return its id.
    pub fn push_row(&mut self, name: &str, defaults: Option<&ExerciseEntry>) -> u64 {
        let row = self.create_exercise_table_row(name, defaults);
        let id = row.id;
        self.rows.push(row);
        id
    }

    pub fn extract_data_from_table_row(row: &SessionRow) -> ExerciseEntry {
        ExerciseEntry {
            name: row.name.clone(),
            weight: row.weight.clone(),
            reps: row.reps.clone(),
            rest: row.rest.clone(),
            comments: row.comments.clone(),
        }
    }

    /// Remove the row with `id`. Returns `false` if no such row exists.
    pub fn remove_row(&mut self, id: u64) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.id != id);
        self.rows.len() != before
    }

    /// Append a blank row for the selected exercise and reset the selection.
    pub fn add_selected_exercise(
        &mut self,
        selection: &mut ExerciseSelection,
    ) -> Result<u64, SessionError> {
        let name = selection.take().ok_or(SessionError::NothingSelected)?;
        Ok(self.push_row(&name, None))
    }

    /// Collect every row into a workout dated `date`.
    ///
    /// The table is left untouched so the caller can clear it once the
    /// workout has been accepted.
    pub fn to_workout(&self, date: DateTime<Utc>) -> Result<Workout, SessionError> {
        if self.rows.is_empty() {
            return Err(SessionError::EmptySession);
        }
        let exercises = self
            .rows
            .iter()
            .map(Self::extract_data_from_table_row)
            .collect();
        Ok(Workout::completed_at(date, exercises))
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[SessionRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [SessionRow] {
        &mut self.rows
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
