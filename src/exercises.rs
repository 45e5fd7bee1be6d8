use crate::storage::{EXERCISES_STORAGE_KEY, Persistence, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExerciseError {
    EmptyName,
    Duplicate(String),
}

impl std::fmt::Display for ExerciseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExerciseError::EmptyName => write!(f, "Exercise name is empty"),
            ExerciseError::Duplicate(name) => write!(f, "Exercise '{name}' already exists"),
        }
    }
}

impl std::error::Error for ExerciseError {}

/// Entry shown in the exercise selector for one named exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorOption {
    pub name: String,
    pub id: egui::Id,
}

impl SelectorOption {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: egui::Id::new(("exercise_option", name)),
        }
    }
}

/// The set of named exercises in the order they were added.
///
/// Each name owns exactly one [`SelectorOption`].
#[derive(Debug, Default)]
pub struct ExerciseRegistry {
    options: Vec<SelectorOption>,
}

impl ExerciseRegistry {
    /// Rebuild the registry from the stored exercise list.
    ///
    /// Blank, repeated or non-text entries in stored data are skipped.
    pub fn restore(store: &Persistence) -> Result<Self, StorageError> {
        let mut registry = Self::default();
        let stored: Vec<serde_json::Value> =
            store.load(EXERCISES_STORAGE_KEY)?.unwrap_or_default();
        for value in stored {
            let Some(name) = value.as_str() else {
                log::warn!("Skipping stored exercise that is not a name: {value}");
                continue;
            };
            if let Err(e) = registry.add_named_exercise(name) {
                log::warn!("Skipping stored exercise: {e}");
            }
        }
        log::info!("Restored {} named exercises", registry.len());
        Ok(registry)
    }

    pub fn add_named_exercise(&mut self, name: &str) -> Result<(), ExerciseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ExerciseError::EmptyName);
        }
        if self.contains(name) {
            return Err(ExerciseError::Duplicate(name.to_string()));
        }
        self.options.push(SelectorOption::new(name));
        Ok(())
    }

    /// Remove `name` and its selector entry. Returns `false` if it was absent.
    pub fn remove_named_exercise(&mut self, name: &str) -> bool {
        let Some(pos) = self.options.iter().position(|o| o.name == name) else {
            return false;
        };
        self.options.remove(pos);
        true
    }

    /// Persist the full list of names.
    pub fn sync_named_exercises(&self, store: &mut Persistence) -> Result<(), StorageError> {
        let names: Vec<&str> = self.names().collect();
        store.store(EXERCISES_STORAGE_KEY, &names)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.options.iter().map(|o| o.name.as_str())
    }

    pub fn options(&self) -> &[SelectorOption] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
