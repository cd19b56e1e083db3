use crate::actor_framework::Entity;
use crate::domain::{UserPatch, UserProfile};

impl Entity for UserProfile {
    type Id = String;
    /// Profiles are keyed by the identity uid, so they are normally stored
    /// with `upsert`; `create` assigns a generated id to a full profile.
    type CreateParams = UserProfile;
    type Patch = UserPatch;
    type Action = ();
    type ActionResult = ();

    fn id(&self) -> &String {
        &self.id
    }

    fn from_create_params(id: String, params: UserProfile) -> Result<Self, String> {
        Ok(UserProfile { id, ..params })
    }

    /// # Fields Updated
    /// - `name`: display name
    /// - `role`: only changed by operators, never by the storefront itself
    fn on_update(&mut self, patch: UserPatch) -> Result<(), String> {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), String> {
        Ok(())
    }
}
