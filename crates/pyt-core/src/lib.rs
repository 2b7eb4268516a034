//! # Perpetual Yield Core
//!
//! Shared building blocks for the Perpetual Yield reward & stake accounting engine.
//!
//! This crate provides:
//! - `AccountId` / `AssetId` - 32-byte identities
//! - `PytError` - the single error type every operation returns
//! - `math` - checked fixed-point arithmetic (no floating point anywhere)
//! - `TimeSource` - monotonic time abstraction
//!
//! ## Rounding
//!
//! ```text
//!   income ──► floor(income × 10¹² / total_staked) ──► acc_reward_per_share
//!                                                        │
//!   position ◄── floor(principal × Δacc / 10¹²) ◄────────┘
//!
//!   Σ floor(..) ≤ floor(Σ ..)  ⇒  dust stays in the pool
//! ```

pub mod clock;
pub mod error;
pub mod math;
pub mod types;

pub use clock::*;
pub use error::*;
pub use types::*;

