//! SCIM 2.0 Protocol Implementation
//!
//! This module provides the protocol side of user provisioning: resource types,
//! the filter language, pagination and the mapping between stored users and
//! SCIM resources.
//!
//! ## RFC References
//!
//! - RFC 7643: SCIM Core Schema
//! - RFC 7644: SCIM Protocol
//!
//! ## Module Structure
//!
//! - [`types`]: SCIM User resource and protocol types
//! - [`error`]: SCIM-specific error responses per RFC 7644
//! - [`filter`]: SCIM filter expression parser and evaluator
//! - [`mapping`]: Stored user to SCIM resource and back
//! - [`pager`]: `startIndex`/`count` window computation

pub mod error;
pub mod filter;
pub mod mapping;
pub mod pager;
pub mod types;

pub use error::*;
pub use filter::{
    AttrPath, Attribute, CompareOp, Filter, FilterParseError, FilterValue, Filterable,
    matches_filter, parse_filter,
};
pub use mapping::{UserAttributes, from_payload, to_scim_user};
pub use pager::{Window, window};
pub use types::*;

/// Media type of every SCIM response body, per RFC 7644 Section 3.1.
pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";
