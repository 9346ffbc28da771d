//! Inputs fetched from the site: the translation catalog and page fragments.

pub mod catalog;
pub mod page;
