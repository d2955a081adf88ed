//! Domain types for index membership data

pub mod membership;
pub mod window;

pub use membership::MembershipEvent;
pub use window::ObservationWindow;

/// Entity key type alias (a Compustat `gvkey`).
pub type EntityId = String;
