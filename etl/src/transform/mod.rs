pub mod calendar;
pub mod catalog;
pub mod songplays;
pub mod users;

pub use calendar::CalendarTransformer;
pub use catalog::{CatalogTables, CatalogTransformer};
pub use songplays::{FactAssembler, SongplaySequence};
pub use users::UserTransformer;
