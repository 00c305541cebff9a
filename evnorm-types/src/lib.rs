//! # evnorm types
//!
//! This crate provides the fundamental type definitions shared between the
//! `evnorm` normalization core and anything that feeds it raw samples or
//! consumes its notifications.
//!
//! ## Modules
//!
//! - [`axis`] - Relative and absolute axis identifiers of the raw sample stream
//! - [`button`] - Button codes and their well-known values
//! - [`geometry`] - Points and rectangles in device coordinates
//! - [`tool`] - Tablet tool kinds and identities
//!
//! All types are plain data: they derive `serde` traits and postcard's
//! `MaxSize` so an embedding can ship them over a wire unchanged, and
//! `defmt::Format` behind the `defmt` feature.

#![no_std]

pub mod axis;
pub mod button;
pub mod geometry;
pub mod tool;
