//! Quorum resolution
//!
//! A plugin never asks for a raw observation count. It names a symbolic
//! threshold ([`Quorum`]) and the engine resolves it against the instance's
//! `(n, f)`:
//!
//! ```text
//! ┌───────────────┬────────────────────┬──────────────────────────────────────┐
//! │ Kind          │ Count              │ Guarantee                            │
//! ├───────────────┼────────────────────┼──────────────────────────────────────┤
//! │ FPlusOne      │ f + 1              │ at least one honest observation      │
//! │ TwoFPlusOne   │ 2f + 1             │ honest majority                      │
//! │ ByzQuorum     │ ⌈(n + f + 1) / 2⌉  │ any two quorums share an honest node │
//! │ NMinusF       │ n − f              │ max count reliably available         │
//! └───────────────┴────────────────────┴──────────────────────────────────────┘
//! ```

pub mod rule;

pub use rule::{Quorum, resolve};
