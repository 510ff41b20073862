pub mod consts;
pub mod error;
