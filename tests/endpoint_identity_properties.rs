//! Property-based tests for endpoint identity
//!
//! Accept strings are matched verbatim against live command lines and
//! drive profile directory names, so they must be stable and distinct.

use std::collections::HashSet;
use std::path::Path;

use officeworker_process::{EndpointDescriptor, ProcessQuery, ProfileDirectory};
use officeworker_process::testing::worker_entry;
use proptest::prelude::*;

/// Strategy for endpoint descriptors a deployment would hand out
fn arb_endpoint() -> impl Strategy<Value = EndpointDescriptor> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,15}".prop_map(EndpointDescriptor::pipe),
        ("(localhost|127\\.0\\.0\\.1|10\\.0\\.[0-9]{1,3}\\.[0-9]{1,3})", 1024u16..65535u16)
            .prop_map(|(host, port)| EndpointDescriptor::socket(host, port)),
    ]
}

proptest! {
    /// Rendering is a pure function of the descriptor
    #[test]
    fn prop_accept_string_is_pure(endpoint in arb_endpoint()) {
        let copy = endpoint.clone();
        prop_assert_eq!(endpoint.accept_string(), endpoint.accept_string());
        prop_assert_eq!(endpoint.accept_string(), copy.accept_string());
        prop_assert!(endpoint.accept_string().ends_with(";urp;"));
    }

    /// Distinct descriptors never share a profile directory
    #[test]
    fn prop_profile_paths_distinct(endpoints in prop::collection::vec(arb_endpoint(), 1..20)) {
        let unique: HashSet<EndpointDescriptor> = endpoints.into_iter().collect();
        let paths: HashSet<_> = unique
            .iter()
            .map(|endpoint| ProfileDirectory::derive_path(endpoint, Path::new("/tmp"), "product"))
            .collect();
        prop_assert_eq!(paths.len(), unique.len());
    }

    /// Profile directory names carry no `,` or `=`
    #[test]
    fn prop_profile_name_sanitized(endpoint in arb_endpoint()) {
        let path = ProfileDirectory::derive_path(&endpoint, Path::new("/tmp"), "product");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        prop_assert!(name.starts_with(".product_"));
        prop_assert!(!name.contains(','));
        prop_assert!(!name.contains('='));
    }

    /// A worker launched for an endpoint is found by that endpoint's query
    #[test]
    fn prop_query_matches_own_worker(endpoint in arb_endpoint()) {
        let accept = endpoint.accept_string();
        let query = ProcessQuery::new("soffice.*", 1, &accept).unwrap();
        prop_assert!(query.matches(&worker_entry(1, &accept)));
    }

    /// Pipe names that merely share a prefix do not match each other
    #[test]
    fn prop_query_rejects_other_pipes(name in "[a-z]{1,10}", extra in "[a-z0-9]{1,4}") {
        let own = EndpointDescriptor::pipe(name.clone()).accept_string();
        let other = EndpointDescriptor::pipe(format!("{}{}", name, extra)).accept_string();
        let query = ProcessQuery::new("soffice.*", 1, &own).unwrap();
        prop_assert!(!query.matches(&worker_entry(1, &other)));
    }
}

#[test]
fn test_pipe_end_to_end_naming() {
    let endpoint = EndpointDescriptor::pipe("office1");
    assert_eq!(endpoint.accept_string(), "pipe,name=office1;urp;");

    let path = ProfileDirectory::derive_path(&endpoint, Path::new("/tmp"), "product");
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        ".product_pipe_name-office1;urp;"
    );
}
