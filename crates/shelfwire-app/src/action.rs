//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use shelfwire_core::UserId;

use crate::Toast;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Show a transient alert. Failure to show it is not an error.
    ShowToast(Toast),

    /// Open a session for this user.
    Connect {
        /// Logged-in user.
        user_id: UserId,
    },

    /// Tear down the session.
    Disconnect,
}
