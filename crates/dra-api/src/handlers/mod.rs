//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod guide;
pub mod health;
pub mod process;
