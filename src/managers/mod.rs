// Bookmark sync state managers
// The view-state reducer and the controller that runs it against the collaborators.

pub mod view_state;
pub mod view_state_controller;
