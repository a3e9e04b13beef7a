//! User name resolution for socket owners.

use std::collections::HashMap;

/// Caches uid to user name lookups.
///
/// Unknown uids are cached too, so a missing passwd entry is only looked up
/// once.
#[derive(Debug, Default)]
pub struct UserNames {
    cache: HashMap<u32, Option<String>>,
}

impl UserNames {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the user name for `uid`, or the numeric uid if none is known.
    pub fn name(&mut self, uid: u32) -> String {
        self.cache
            .entry(uid)
            .or_insert_with(|| lookup(uid))
            .clone()
            .unwrap_or_else(|| uid.to_string())
    }
}

#[cfg(unix)]
fn lookup(uid: u32) -> Option<String> {
    match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
        Ok(user) => user.map(|u| u.name),
        Err(e) => {
            tracing::debug!(uid, error = %e, "user lookup failed");
            None
        }
    }
}

#[cfg(not(unix))]
const fn lookup(_uid: u32) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_resolves_or_falls_back_to_number() {
        let mut names = UserNames::new();
        let name = names.name(0);
        assert!(name == "root" || name == "0");
    }

    #[test]
    fn unknown_uid_falls_back_to_number() {
        let mut names = UserNames::new();
        assert_eq!(names.name(4_000_000_000), "4000000000");
        assert_eq!(names.cache.len(), 1);
    }
}
