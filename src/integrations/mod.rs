//! Side-effecting collaborators invoked when a prospect shows interest.

pub mod booker;
pub mod notifier;

pub use booker::{Booker, Meeting, SimulatedBooker};
pub use notifier::{LogNotifier, NoopNotifier, Notifier};
