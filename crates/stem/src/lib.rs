mod aggregate;
pub use aggregate::{Aggregate, AggregateKind, AggregateState, Running};

pub mod collection;
pub use collection::Collection;

pub mod cursor;
pub use cursor::Cursor;

pub mod db;
pub use db::Db;

pub mod filter;
pub use filter::Filter;

mod model;
pub use model::Model;

pub mod repository;
pub use repository::Repository;

pub use stem_core::{
    bail, err,
    schema::{self, Column, ColumnType, ModelSchema, Schema},
    stmt::{self, Row, Value},
    Error, Result,
};
