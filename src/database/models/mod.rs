pub mod attachment;
pub mod display_name;
pub mod group;

pub use attachment::*;
pub use display_name::*;
pub use group::*;
