//! # Platform Adapters
//!
//! Backends implementing the identity, profile store, QR store and
//! directory ports.
//!
//! | Adapter             | Backend                               |
//! |---------------------|---------------------------------------|
//! | `InMemoryPlatform`  | process memory, configurable trigger  |
//! | `SupabasePlatform`  | GoTrue + PostgREST over HTTP          |

pub mod memory;
pub mod supabase;

pub use memory::{InMemoryPlatform, MemoryPlatformConfig, ProfileTrigger};
pub use supabase::{SupabaseError, SupabasePlatform};
