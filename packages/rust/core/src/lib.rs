//! Pipeline orchestration for rosterscrape.
//!
//! This crate ties the browser session, the harvester and the artifact
//! writers into the end-to-end `scrape` workflow, plus offline inspection
//! of saved snapshots.

pub mod inspect;
pub mod pipeline;
