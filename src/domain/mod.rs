pub mod book;
pub mod borrowing;
pub mod commands;
pub mod errors;
pub mod events;
pub mod fine;
pub mod member;
pub mod reservation;
pub mod snapshots;
pub mod staff;
pub mod value_objects;

pub use book::*;
pub use borrowing::*;
pub use commands::*;
pub use errors::*;
pub use events::*;
pub use fine::*;
pub use member::*;
pub use reservation::*;
pub use snapshots::*;
pub use staff::*;
pub use value_objects::*;
