//! # postpad
//!
//! The rich-text engine behind post bodies, comments and project
//! descriptions: a typed document tree, its JSON snapshot codec, the
//! `@` / `:` / `/` suggestion menu, the attachment pipeline and the
//! extraction helpers that read stored snapshots.
pub mod collab;
pub mod command;
pub mod config;
pub mod editor;
pub mod extract;
pub mod model;
pub mod session;
pub mod snapshot;
pub mod tree;
pub mod trigger;
pub mod upload;
pub(crate) mod util;
