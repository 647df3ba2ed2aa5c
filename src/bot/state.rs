use serde::{Deserialize, Serialize};

/// Per-conversation dialogue state.
///
/// `AwaitingRemoveBgImage` gates whether the next image upload is treated as
/// a background-removal request; it is cleared after exactly one use.
#[derive(Clone, Serialize, Deserialize, Default, Debug, PartialEq, Eq)]
pub enum State {
    /// No pending interaction
    #[default]
    Idle,
    /// `/removebg` was issued; the next image upload triggers removal
    AwaitingRemoveBgImage,
}
