// mini_oms/src/models/actor.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  User,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::User => "user",
    }
  }
}

/// Identity resolved by the external auth collaborator. The core only
/// authorizes against it, it never authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub id: Uuid,
  pub role: Role,
}

impl Actor {
  pub fn new(id: Uuid, role: Role) -> Self {
    Self { id, role }
  }

  pub fn admin(id: Uuid) -> Self {
    Self::new(id, Role::Admin)
  }

  pub fn user(id: Uuid) -> Self {
    Self::new(id, Role::User)
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  /// Owner-or-admin rule shared by every order-scoped operation.
  pub fn may_act_on(&self, owner_id: Uuid) -> bool {
    self.is_admin() || self.id == owner_id
  }
}
