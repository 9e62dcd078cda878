mod analysis;
mod fetch;
mod period;
mod route_types;
mod table;

pub use analysis::*;
pub use fetch::*;
pub use period::*;
pub use route_types::*;
pub use table::*;
