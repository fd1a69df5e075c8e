//! Route actions: the entry points a navigation layer posts forms to.
//!
//! Actions never fail. Every outcome, including invalid input and
//! service errors, comes back as an [`ActionResult`].

use almanac_core::{Activity, ActivityId, AlmanacError};
use serde::{Deserialize, Serialize};

use crate::cache::EntityCache;
use crate::form::ActivityForm;
use crate::mutation::MutationCoordinator;

/// `{ success: true, activity }` or `{ success: false, error }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(activity: Activity) -> Self {
        Self {
            success: true,
            activity: Some(activity),
            error: None,
        }
    }

    pub fn failed(error: &AlmanacError) -> Self {
        Self {
            success: false,
            activity: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<almanac_core::Result<Activity>> for ActionResult {
    fn from(result: almanac_core::Result<Activity>) -> Self {
        match result {
            Ok(activity) => Self::ok(activity),
            Err(err) => Self::failed(&err),
        }
    }
}

/// Handle a submitted edit form for the activity named by route segment `id`.
///
/// Invalid input is answered immediately: no state change, no projection,
/// no service call.
pub async fn update_activity_action<C: EntityCache<Activity>>(
    coordinator: &MutationCoordinator<C>,
    id: &str,
    form: &ActivityForm,
) -> ActionResult {
    let id = match ActivityId::from_route(id) {
        Ok(id) => id,
        Err(err) => return ActionResult::failed(&err),
    };
    let patch = match form.to_patch() {
        Ok(patch) => patch,
        Err(err) => return ActionResult::failed(&err),
    };
    coordinator.update(id, patch).await.into()
}

/// Handle a submitted create form.
pub async fn create_activity_action<C: EntityCache<Activity>>(
    coordinator: &MutationCoordinator<C>,
    form: &ActivityForm,
) -> ActionResult {
    match form.to_new_activity() {
        Ok(fields) => coordinator.create(fields).await.into(),
        Err(err) => ActionResult::failed(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_shape() {
        let result = ActionResult::failed(&AlmanacError::validation("End time must be after start time"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "error": "End time must be after start time" })
        );
    }
}
