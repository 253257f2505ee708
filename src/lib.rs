//! ==============================================================================
//! dial-kiosk - rotary-dial selection controller
//! ==============================================================================
//!
//! purpose:
//!     turns a noisy potentiometer read over serial into exactly one
//!     playing item on a fullscreen media player, driven through the
//!     player's HTTP remote-control interface.
//!
//! pipeline:
//!
//!     serial frames          conditioned value        selection index
//!     ┌───────────┐  ─────>  ┌──────────────┐  ────>  ┌────────────┐
//!     │ sensor.rs │          │conditioner.rs│         │  mapper.rs │
//!     └───────────┘          └──────────────┘         └─────┬──────┘
//!                                                           │
//!                             ┌───────────────┐      ┌──────┴──────┐
//!                             │  backend.rs   │ <─── │controller.rs│
//!                             │ (player HTTP) │      │ (idempotent)│
//!                             └───────────────┘      └─────────────┘
//!
//!     runloop.rs owns the tick cycle that moves data left to right;
//!     main.rs wires configuration, the library scan and shutdown.
//!
//! ==============================================================================

pub mod backend;
pub mod conditioner;
pub mod config;
pub mod controller;
pub mod error;
pub mod library;
pub mod mapper;
pub mod runloop;
pub mod sensor;
