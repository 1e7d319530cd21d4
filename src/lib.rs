#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![allow(clippy::module_name_repetitions)]

//! The main library to support building flowtag.
//!
//! A run loads a lookup table of `(dstport, protocol, tag)` rows into a
//! [`TagIndex`], classifies every record of a flow log against it and writes a
//! [`report::Report`] of tag and port/protocol counts.

#[macro_use]
extern crate tracing;

#[macro_use]
pub mod internal_events;

pub mod app;
pub mod cli;
pub mod config;
pub mod flow_log;
pub mod lookup_table;
pub mod protocols;
pub mod report;
pub mod tag_index;
pub mod trace;

pub use tag_index::{Combination, TagIndex, TagIndexBuilder};
