pub mod permission;

pub use permission::{CurrentUser, PanelUser, AUTH_COOKIE};
