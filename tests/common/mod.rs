#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

pub use ratscan::DetectionError;

/// True when any error in the chain is `NoRegionFound`
pub fn is_no_region_found(err: &anyhow::Error) -> bool {
    err.chain().any(|e| {
        matches!(
            e.downcast_ref::<DetectionError>(),
            Some(DetectionError::NoRegionFound { .. })
        )
    })
}
