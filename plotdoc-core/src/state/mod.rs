//! # State
//!
//! The document model that commands operate on: a tree of widgets carrying settings, named
//! datasets, and custom definitions for expressions.

pub mod custom;
pub mod dataset;
pub mod document;
pub mod path;
pub mod setting;
pub mod tree;
