#![allow(clippy::enum_variant_names)]

//! Folder and file tree kept in memory, with every change mirrored to a
//! pluggable persistence adapter.

pub mod application;
pub mod cli;
pub mod filesystem;
pub mod persistence;
pub mod script;

mod ext;
