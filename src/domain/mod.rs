//! Domain layer: the payment entity, its value objects, the tenant context
//! guard, and the storage ports the application layer is wired against.

pub mod payment;
pub mod ports;
pub mod tenant;
