//! # UI Module
//!
//! This module contains all UI components for the guitar tuner application.

pub mod gauge;
pub mod main_display;
