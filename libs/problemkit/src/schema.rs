//! OpenAPI schema model for the Problem response.
//!
//! Hosts that publish OpenAPI documents can register this schema so routes
//! may reference the Problem body shape under the
//! `application/problem+json` content type. Only the RFC-defined members
//! are part of the published schema; extension members are open by design.

use serde::Serialize;
use utoipa::ToSchema;

/// Model of the RFC 7807 Problem response schema.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(title = "Problem", description = "RFC 7807 Problem Details for HTTP APIs")]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    #[schema(example = "about:blank")]
    pub r#type: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// The HTTP status code for this occurrence of the problem.
    #[schema(value_type = u16, example = 500)]
    pub status: Option<u16>,
    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A URI reference that identifies this specific occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}
