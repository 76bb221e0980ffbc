//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on request decoding, auth plumbing and status
//! mapping. Workout reads go through `feed` so visibility and hydration are
//! defined in one place.

pub mod comment;
pub mod email_auth;
pub mod exercise;
pub mod feed;
pub mod follow;
pub mod like;
pub mod profile;
pub mod session;
pub mod storage;
pub mod workout;
