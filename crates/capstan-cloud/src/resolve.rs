use crate::error::{CloudError, Result};
use tracing::info;

/// Pick the single pool name containing `hint` as a substring.
///
/// Zero matches and multiple matches are both fatal: an ambiguous scaling
/// target must surface to the operator, never fall back to a default.
/// Shared by every provider implementation's `resolve`.
pub fn select_unique_pool(provider: &str, hint: &str, pool_names: &[String]) -> Result<String> {
    let matches: Vec<&String> = pool_names.iter().filter(|n| n.contains(hint)).collect();

    match matches.as_slice() {
        [] => Err(CloudError::context_not_found(provider, hint)),
        [only] => {
            info!(provider, pool = %only, "Found managed pool for resizing");
            Ok((*only).clone())
        }
        many => Err(CloudError::ambiguous_context(
            provider,
            hint,
            many.iter().map(|n| (*n).clone()).collect(),
        )),
    }
}

/// Growth precondition shared by providers that only support grow-by-count.
///
/// Checked against the current size read from the provider, before the
/// mutating call is issued.
pub fn check_growth(pool: &str, current: u64, requested: u64) -> Result<()> {
    if requested < current {
        return Err(CloudError::ShrinkViaResize {
            pool: pool.to_string(),
            current,
            requested,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unique_substring_match_resolves() {
        let pools = names(&["prod-west", "staging-east"]);
        assert_eq!(
            select_unique_pool("gce", "prod", &pools).unwrap(),
            "prod-west"
        );
    }

    #[test]
    fn multiple_matches_are_ambiguous() {
        let pools = names(&["prod-west", "prod-east"]);
        let err = select_unique_pool("gce", "prod", &pools).unwrap_err();
        assert!(matches!(
            err,
            CloudError::AmbiguousContext { ref matches, .. }
                if matches == &["prod-west".to_string(), "prod-east".to_string()]
        ));
    }

    #[test]
    fn zero_matches_is_not_found() {
        let pools = names(&["staging-east"]);
        let err = select_unique_pool("azure", "prod", &pools).unwrap_err();
        assert!(matches!(err, CloudError::ContextNotFound { .. }));
    }

    #[test]
    fn exact_name_among_overlapping_names_still_ambiguous() {
        // "prod" is itself a pool, but it is also a substring of "prod-2".
        let pools = names(&["prod", "prod-2"]);
        let err = select_unique_pool("gce", "prod", &pools).unwrap_err();
        assert!(matches!(err, CloudError::AmbiguousContext { .. }));
    }

    #[test]
    fn growth_check_rejects_shrink() {
        let err = check_growth("prod-west", 5, 2).unwrap_err();
        assert!(matches!(
            err,
            CloudError::ShrinkViaResize {
                current: 5,
                requested: 2,
                ..
            }
        ));
    }

    #[test]
    fn growth_check_allows_equal_and_larger() {
        assert!(check_growth("prod-west", 5, 5).is_ok());
        assert!(check_growth("prod-west", 5, 8).is_ok());
    }
}
