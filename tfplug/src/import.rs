//! Import helpers for simplifying resource import implementations

use crate::request::{ImportStateRequest, ImportStateResponse};
use crate::types::{Diagnostics, Dynamic, State};

/// Sets the import ID to a specific attribute in state
///
/// Example: ID "0a1b2c" -> state.id = "0a1b2c". The following read fills
/// in the remaining attributes.
pub fn import_state_passthrough_id(
    attribute: &str,
    request: &ImportStateRequest,
) -> ImportStateResponse {
    let mut diagnostics = Diagnostics::new();

    if request.id.trim().is_empty() {
        diagnostics.add_error(
            "Invalid import identifier",
            Some(format!(
                "Expected a non-empty identifier to import {}",
                request.type_name
            )),
        );
        return ImportStateResponse {
            state: None,
            diagnostics,
        };
    }

    let mut state = State::new();
    state.set(attribute, Dynamic::String(request.id.clone()));

    ImportStateResponse {
        state: Some(state),
        diagnostics,
    }
}
