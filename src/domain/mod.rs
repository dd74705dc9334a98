//! Maintenance domain: identities, cluster views, reconciliation and the
//! writes that apply it.

pub mod fetch;
pub mod identity;
pub mod maintenance_service;
pub mod mutator;
pub mod reconciler;
pub mod types;
pub mod wire;
