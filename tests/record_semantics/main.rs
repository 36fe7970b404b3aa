mod common;

mod dirty_propagation;
mod lazy_load;
mod merge;
mod paths;
mod properties;
mod round_trip;
mod schema_binding;
mod undo;
mod validation;
