//! Migrate a MoinMoin `pages/` export into plain files and an Org-mode outline.

pub mod config;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod rename;
pub mod revision;
pub mod runtime;
pub mod translate;
