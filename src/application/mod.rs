//! Application services: visibility, filtering, mutes and timeline assembly.

pub mod context;
pub mod error;
pub mod feed;
pub mod mutes;
pub mod pagination;
pub mod prepare;
pub mod repos;
pub mod status_filter;
pub mod timeline;
pub mod visibility;
