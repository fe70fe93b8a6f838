//! Adapters for the domain ports. Only in-memory implementations live here;
//! the hosted backend is an external collaborator reached through the same
//! traits.

pub mod clock;
pub mod in_memory;
