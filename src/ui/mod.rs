//! Dashboard widgets. All state lives in [`crate::state::AppState`]; these
//! functions only draw it and forward user actions.

pub mod panels;
pub mod plot;
