//! Surfaces facing the outside: the route table and CSV batch IO.

pub mod csv;
pub mod router;
