//! Lookup of controllers by logical port name, for the diagnostic entry points.
//!
//! The registry is an explicit object: create one at startup and hand it to whatever
//! needs the lookup (the protocol path never uses it).

use std::collections::HashMap;

use log::debug;
use parking_lot::RwLock;

use crate::errors::{Error, RegistryError};
use crate::io::IoController;

/// Maps logical port names to controllers.
#[derive(Debug, Default)]
pub struct Registry {
    controllers: RwLock<HashMap<String, Box<dyn IoController>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `controller` under its own name.
    ///
    /// # Errors
    /// * `DuplicatePort`: a controller with the same name already exists (it is kept).
    pub fn register<C: IoController + 'static>(&self, controller: C) -> Result<(), Error> {
        let name = controller.get_name().to_string();
        let mut controllers = self.controllers.write();
        if controllers.contains_key(&name) {
            return Err(RegistryError::DuplicatePort { name }.into());
        }
        debug!("Registry: add controller '{}'", name);
        controllers.insert(name, Box::new(controller));
        Ok(())
    }

    /// Retrieves a handle to the controller registered as `name`.
    pub fn find(&self, name: &str) -> Option<Box<dyn IoController>> {
        self.controllers.read().get(name).cloned()
    }

    /// Same as [`Registry::find`] but fails for an unknown name.
    pub fn get(&self, name: &str) -> Result<Box<dyn IoController>, Error> {
        self.find(name).ok_or_else(|| {
            RegistryError::UnknownPort {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Removes the controller registered as `name`.
    pub fn remove(&self, name: &str) -> Option<Box<dyn IoController>> {
        let removed = self.controllers.write().remove(name);
        if removed.is_some() {
            debug!("Registry: remove controller '{}'", name);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controllers.read().contains_key(name)
    }

    /// Lists the registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.controllers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.controllers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.read().is_empty()
    }
}
