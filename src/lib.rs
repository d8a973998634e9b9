//! Doxy - static API-compatibility verifier
//!
//! A fast, local-first lint tool that checks every imported symbol and call
//! site in a project against a curated, version-indexed catalog of API
//! specifications. It reports symbols that are deprecated in, removed from,
//! not yet introduced in, or called incompatibly with the exact dependency
//! versions the project has locked - without executing any user code.

pub mod analyzer;
pub mod ast;
pub mod authority;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod incremental;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod reporters;
pub mod resolver;
pub mod suppress;
pub mod version;
