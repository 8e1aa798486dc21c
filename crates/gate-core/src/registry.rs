//! Registered vehicles, used by [`Pairing::Registered`](crate::policy::Pairing).

use std::collections::HashMap;

/// Plate → owning subject identifier.
#[derive(Debug, Clone, Default)]
pub struct VehicleRegistry {
  owners: HashMap<String, String>,
}

impl VehicleRegistry {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, plate: impl Into<String>, owner: impl Into<String>) {
    self.owners.insert(plate.into(), owner.into());
  }

  pub fn owner_of(&self, plate: &str) -> Option<&str> {
    self.owners.get(plate).map(String::as_str)
  }

  /// Whether `plate` is registered to `subject_id`.
  pub fn is_owner(&self, plate: &str, subject_id: &str) -> bool {
    self.owner_of(plate) == Some(subject_id)
  }

  pub fn len(&self) -> usize { self.owners.len() }

  pub fn is_empty(&self) -> bool { self.owners.is_empty() }
}

impl<P, S> FromIterator<(P, S)> for VehicleRegistry
where
  P: Into<String>,
  S: Into<String>,
{
  fn from_iter<I: IntoIterator<Item = (P, S)>>(iter: I) -> Self {
    let mut registry = Self::new();
    for (plate, owner) in iter {
      registry.insert(plate, owner);
    }
    registry
  }
}
