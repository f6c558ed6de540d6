pub mod path;
pub mod schema;
pub mod store;

pub use path::SlotPath;
pub use schema::{RegexpSlot, SlotSchema};
pub use store::SlotStore;
