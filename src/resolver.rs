//! Candidate selection
//!
//! Given every descriptor assignable to a requested type and an optional
//! qualifier name, pick exactly one:
//!
//! 1. A qualifier matching exactly one candidate wins outright.
//! 2. Otherwise the qualifier is ignored: no candidates is an error, a single
//!    candidate wins.
//! 3. Several candidates are narrowed to the primary ones: exactly one wins,
//!    none or several is an error.

use crate::descriptor::BeanDescriptor;
use crate::error::{DiError, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Pick the descriptor to instantiate for a request of `type_name`.
pub(crate) fn select(
    type_name: &'static str,
    qualifier: Option<&str>,
    candidates: &[Arc<BeanDescriptor>],
) -> Result<Arc<BeanDescriptor>> {
    if let Some(qualifier) = qualifier {
        let mut named = candidates.iter().filter(|d| d.key().same_name(qualifier));
        if let (Some(only), None) = (named.next(), named.next()) {
            return Ok(Arc::clone(only));
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "bean_context",
            requested = type_name,
            qualifier,
            "Qualifier did not single out a bean, falling back to all candidates"
        );
    }

    match candidates {
        [] => Err(DiError::NoBeanFound {
            type_name,
            qualifier: qualifier.map(str::to_owned),
        }),
        [only] => Ok(Arc::clone(only)),
        _ => {
            let primaries: Vec<_> = candidates.iter().filter(|d| d.is_primary()).collect();
            match primaries.as_slice() {
                [only] => Ok(Arc::clone(only)),
                [] => Err(DiError::AmbiguousBean {
                    type_name,
                    candidates: names(candidates.iter()),
                }),
                several => Err(DiError::AmbiguousPrimary {
                    type_name,
                    candidates: names(several.iter().copied()),
                }),
            }
        }
    }
}

fn names<'a>(descriptors: impl Iterator<Item = &'a Arc<BeanDescriptor>>) -> Vec<String> {
    descriptors.map(|d| d.key().name().to_owned()).collect()
}
