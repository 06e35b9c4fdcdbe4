pub mod encoding;
pub mod flow;
pub mod handlers;
pub mod normalize;
pub mod rate_limit;
pub mod roster;

pub use flow::{vote_url, FlowError, FlowState, SelectionFlow};
pub use handlers::{router, AppState};
pub use roster::{Record, Roster, RosterError};
