//! Domain models shared by the auth components and their store collaborators.

pub mod auth;
