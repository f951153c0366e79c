pub mod bulk;
pub mod completion;
pub mod dates;
pub mod day_view;
pub mod db;
pub mod error;
pub mod grouping;
pub mod models;
pub mod planner;
pub mod store;
