//! Data models for the gateway.
//!
//! This module contains the ServiceDesk Plus wire types (request envelope,
//! response status, ticket and technician objects), the Zoho token response,
//! and the caller-facing ticket shapes.

mod common;
mod request;
mod technician;
mod ticket;
mod token;

pub use common::*;
pub use request::*;
pub use technician::*;
pub use ticket::*;
pub use token::*;
