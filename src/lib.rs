//! snapeda-importer: imports SnapEDA parts into a Fusion 360 electronics library
//!
//! When the user picks a part in the SnapEDA catalog client, the host opens a
//! URL carrying the location of a downloaded EAGLE library. This crate turns
//! that notification into an import session:
//!
//! - **Target resolution**: reuse the team's library document, remembered by
//!   its data-store identifier, or create it once
//! - **Definition import**: copy the deviceset (or package) into the library
//!   with the host's electronics commands
//! - **3D model**: when a STEP file ships alongside, build a 3D package and
//!   orient the model
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Configuration error types
//! - [`host`]: Capabilities the host application offers
//! - [`import`]: Import sessions and their steps
//! - [`bridge`]: JSON-RPC link to the host-side shim
//! - [`process`]: Catalog client processes

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod import;
pub mod process;
