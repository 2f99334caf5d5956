//! Statement builders.
//!
//! Every function here is pure: it reads a table descriptor, a record and
//! an optional filter tree and returns a [`Statement`] ready for the
//! gateway. Absent or empty filters mean "no predicate".

#[macro_use]
mod serializer;

mod build;
pub use build::{
    call::proc,
    delete::delete,
    insert::insert,
    lock::{lock, refresh},
    select::{describe, finish, select},
    sub_query::subquery,
    update::update,
};

mod table;
pub use table::Table;

pub use formwork_core::Statement;
