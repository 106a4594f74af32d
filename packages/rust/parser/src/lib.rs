//! Model response parsing for Outreach.
//!
//! Both parsers are total: any input, including empty or garbled text,
//! produces a record. How much was recovered is reported alongside it so
//! callers can log degraded parses.

mod cleanup;
pub mod email;
pub mod research;

pub use email::{BodySource, ParsedEmail, default_subject, parse_email};
pub use research::{ParsedResearch, ResponseShape, parse_research};
