//! License workflow: reference data, directory access, selection and mutation.

pub mod apply;
pub mod graph;
pub mod reference;
pub mod selection;
pub mod session;
pub mod sku;
pub mod targets;
