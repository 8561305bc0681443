pub mod aggregates;
pub mod cons_string;
pub mod flags;
pub mod roots;
pub mod statistics;

pub use aggregates::{ClassAggregate, aggregate_by_class};
pub use flags::NodeFlags;
pub use statistics::Statistics;
