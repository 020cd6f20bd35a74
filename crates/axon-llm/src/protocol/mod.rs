//! Wire format types for the invoke-model API
//!
//! Pure serde types and key names matching what the service and the
//! providers behind it put on the wire. They are only used at the decoding
//! boundary.

pub mod bedrock;
pub mod messages;
