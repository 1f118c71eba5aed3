//! # Chimera Common
//!
//! Common types, utilities, and shared abstractions for the Chimera combat
//! simulation.
//!
//! This crate provides foundational types used across all Chimera crates:
//! - Entity IDs and a deterministic allocator
//! - 2D math helpers over `glam`
//! - Version information for schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod math;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::math::Vec2;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        // v2 can read v1 data (newer version reading older data)
        assert!(v2.is_compatible_with(&v1));
        // Different major versions are incompatible
        assert!(!v1.is_compatible_with(&v3));
        assert!(v1.ensure_can_read(v3).is_err());
    }

    #[test]
    fn test_magic_strip() {
        let mut bytes = b"CHSN".to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        let rest = MagicBytes::SNAPSHOT.strip(&bytes).expect("magic should match");
        assert_eq!(rest, &[1, 2, 3]);

        let err = MagicBytes::SNAPSHOT.strip(b"GNSV1234");
        assert!(matches!(err, Err(ChimeraError::BadMagic { .. })));
        assert!(MagicBytes::SNAPSHOT.strip(b"CH").is_err());
    }
}
