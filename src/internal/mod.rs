pub(crate) mod arena;
pub mod id;
