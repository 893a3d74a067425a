/// Cache key scheme
///
/// Fixed-format segments come first and free text last, so every key parses
/// unambiguously left to right and distinct queries never share a key.

use uuid::Uuid;

use crate::domain::{Pagination, UserFilter};

pub const USER_LIST_PREFIX: &str = "users:list:";
pub const USER_COUNT_PREFIX: &str = "users:count:";

pub fn single_user(id: Uuid) -> String {
    format!("user:{}", id)
}

pub fn user_list(pagination: Pagination, filter: &UserFilter) -> String {
    format!(
        "{}page:{}:limit:{}:{}",
        USER_LIST_PREFIX,
        pagination.page,
        pagination.limit,
        filter_segment(filter)
    )
}

pub fn user_count(filter: &UserFilter) -> String {
    format!("{}{}", USER_COUNT_PREFIX, filter_segment(filter))
}

fn filter_segment(filter: &UserFilter) -> String {
    let role = filter.role.map(|r| r.as_str()).unwrap_or("all");
    // "q=" keeps a literal search for "none" apart from no search at all
    match &filter.search {
        Some(search) => format!("role:{}:search:q={}", role, search),
        None => format!("role:{}:search:none", role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use std::collections::HashSet;

    fn filter(search: Option<&str>, role: Option<Role>) -> UserFilter {
        UserFilter {
            search: search.map(str::to_string),
            role,
        }
    }

    #[test]
    fn test_identical_queries_share_a_key() {
        let page = Pagination { page: 2, limit: 20 };
        let a = user_list(page, &filter(Some("ada"), Some(Role::Admin)));
        let b = user_list(page, &filter(Some("ada"), Some(Role::Admin)));

        assert_eq!(a, b);
        assert_eq!(a, "users:list:page:2:limit:20:role:ADMIN:search:q=ada");
    }

    #[test]
    fn test_distinct_queries_never_collide() {
        let filters = [
            filter(None, None),
            filter(Some("none"), None),
            filter(Some(""), None),
            filter(None, Some(Role::User)),
            filter(Some("x:role:ADMIN"), None),
            filter(Some("x"), Some(Role::Admin)),
            filter(Some("all"), None),
        ];
        let pages = [
            Pagination { page: 1, limit: 10 },
            Pagination { page: 1, limit: 11 },
            Pagination { page: 11, limit: 1 },
        ];

        let mut seen = HashSet::new();
        for f in &filters {
            assert!(seen.insert(user_count(f)));
            for p in pages {
                assert!(seen.insert(user_list(p, f)));
            }
        }
    }

    #[test]
    fn test_prefixes() {
        let f = filter(None, None);
        assert!(user_list(Pagination::default(), &f).starts_with(USER_LIST_PREFIX));
        assert!(user_count(&f).starts_with(USER_COUNT_PREFIX));
        assert!(!single_user(Uuid::new_v4()).starts_with("users:"));
    }
}
