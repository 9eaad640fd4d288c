// src/lib.rs

//! skitter: a paginated crawl engine with an observable lifecycle.
//!
//! A [`engine::CrawlEngine`] walks a paginated HTTP resource: it renders an
//! address from a [`template::AddressTemplate`], fetches it through a
//! [`transport::Transport`], hands the body to an [`extract::Extractor`],
//! and either advances the paging cursor or terminates. Observers follow the
//! crawl through [`events::LifecycleEvent`] streams and drive recovery from
//! `blocked` signals themselves.

pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod models;
pub mod template;
pub mod transport;
pub mod utils;
