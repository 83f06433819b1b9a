//! Saved filter/sort/view presets.

use uuid::Uuid;

use crate::storage::{keys, Binding, LocalStorage};
use crate::types::errors::PresetError;
use crate::types::preset::{SortPreset, ViewSettings};

/// Trait defining sort-preset operations.
pub trait PresetManagerTrait {
    fn save_preset(&mut self, name: &str, settings: ViewSettings) -> Result<SortPreset, PresetError>;
    fn rename_preset(&mut self, id: &str, name: &str) -> Result<(), PresetError>;
    fn delete_preset(&mut self, id: &str) -> Result<(), PresetError>;
}

pub struct PresetManager {
    presets: Binding<Vec<SortPreset>>,
}

impl PresetManager {
    pub fn new(storage: &LocalStorage) -> Self {
        Self {
            presets: Binding::bind(storage, keys::SORT_PRESETS, Vec::new()),
        }
    }

    pub fn presets(&self) -> &[SortPreset] {
        self.presets.get()
    }

    pub fn get(&self, id: &str) -> Option<&SortPreset> {
        self.presets().iter().find(|p| p.id == id)
    }

    pub fn replace_all(&mut self, presets: Vec<SortPreset>) -> Result<(), PresetError> {
        self.presets.set(presets)?;
        Ok(())
    }

    pub fn sync(&mut self) -> bool {
        self.presets.sync()
    }

    pub fn reload(&mut self) {
        self.presets.reload();
    }
}

impl PresetManagerTrait for PresetManager {
    fn save_preset(&mut self, name: &str, settings: ViewSettings) -> Result<SortPreset, PresetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::EmptyName);
        }
        let preset = SortPreset {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            settings,
        };
        let mut list = self.presets().to_vec();
        list.push(preset.clone());
        self.presets.set(list)?;
        Ok(preset)
    }

    fn rename_preset(&mut self, id: &str, name: &str) -> Result<(), PresetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PresetError::EmptyName);
        }
        let mut list = self.presets().to_vec();
        let preset = list
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PresetError::NotFound(id.to_string()))?;
        preset.name = name.to_string();
        self.presets.set(list)?;
        Ok(())
    }

    fn delete_preset(&mut self, id: &str) -> Result<(), PresetError> {
        if self.get(id).is_none() {
            return Err(PresetError::NotFound(id.to_string()));
        }
        let remaining: Vec<SortPreset> = self.presets().iter().filter(|p| p.id != id).cloned().collect();
        self.presets.set(remaining)?;
        Ok(())
    }
}
