//! Entities, value objects and pure business rules for the contribution club,
//! plus the store ports the application layer talks to.

pub mod enrollment;
pub mod money;
pub mod payment;
pub mod plan;
pub mod ports;
pub mod rules;
pub mod settings;
pub mod user;
