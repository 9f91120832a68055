//! Key-value records.
//!
//! A [`Record`] is used in two places of the collection core:
//!
//! * Keyword options passed to [`Forward::forward`](crate::Forward::forward), for example
//!   the exploration rate of an epsilon-greedy policy.
//! * Summaries of collected episodes, see
//!   [`summarize_episodes`](crate::collector::summarize_episodes).
//!
//! ```rust
//! use rollout_core::record::{Record, RecordValue};
//!
//! let mut kwargs = Record::empty();
//! kwargs.insert("eps", RecordValue::Scalar(0.1));
//! kwargs.insert("mode", RecordValue::String("collect".to_string()));
//! assert_eq!(kwargs.get_scalar("eps").unwrap(), 0.1);
//! ```
mod base;

pub use base::{Record, RecordValue};
