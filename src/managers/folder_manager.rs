//! Folders: flat, manual groupings of bookmarks.

use tracing::info;
use uuid::Uuid;

use crate::storage::{keys, Binding, LocalStorage};
use crate::types::bookmark::Folder;
use crate::types::errors::FolderError;

/// Trait defining folder operations.
pub trait FolderManagerTrait {
    fn add_folder(&mut self, name: &str) -> Result<Folder, FolderError>;
    fn rename_folder(&mut self, id: &str, name: &str) -> Result<(), FolderError>;
    /// Removes the folder definition only; members are unassigned by the caller.
    fn delete_folder(&mut self, id: &str) -> Result<Folder, FolderError>;
}

pub struct FolderManager {
    folders: Binding<Vec<Folder>>,
}

impl FolderManager {
    pub fn new(storage: &LocalStorage) -> Self {
        Self {
            folders: Binding::bind(storage, keys::FOLDERS, Vec::new()),
        }
    }

    pub fn folders(&self) -> &[Folder] {
        self.folders.get()
    }

    pub fn get(&self, id: &str) -> Option<&Folder> {
        self.folders().iter().find(|f| f.id == id)
    }

    pub fn replace_all(&mut self, folders: Vec<Folder>) -> Result<(), FolderError> {
        self.folders.set(folders)?;
        Ok(())
    }

    pub fn sync(&mut self) -> bool {
        self.folders.sync()
    }

    pub fn reload(&mut self) {
        self.folders.reload();
    }
}

impl FolderManagerTrait for FolderManager {
    fn add_folder(&mut self, name: &str) -> Result<Folder, FolderError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FolderError::EmptyName);
        }
        let folder = Folder {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        let mut list = self.folders().to_vec();
        list.push(folder.clone());
        self.folders.set(list)?;
        info!(id = %folder.id, "folder created");
        Ok(folder)
    }

    fn rename_folder(&mut self, id: &str, name: &str) -> Result<(), FolderError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FolderError::EmptyName);
        }
        let mut list = self.folders().to_vec();
        let folder = list
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FolderError::NotFound(id.to_string()))?;
        folder.name = name.to_string();
        self.folders.set(list)?;
        Ok(())
    }

    fn delete_folder(&mut self, id: &str) -> Result<Folder, FolderError> {
        let folder = self
            .get(id)
            .cloned()
            .ok_or_else(|| FolderError::NotFound(id.to_string()))?;
        let remaining: Vec<Folder> = self.folders().iter().filter(|f| f.id != id).cloned().collect();
        self.folders.set(remaining)?;
        info!(%id, "folder deleted");
        Ok(folder)
    }
}
