//! Tests for provider module

use super::*;
use crate::error::Error;
use crate::types::{JsonValue, Partition, Record};
use serde_json::json;

const FIXTURE: &str = r"
base_dn: DC=example,DC=com
entries:
  - distinguishedName: CN=Alice,OU=Staff,DC=example,DC=com
    objectClass: [top, person, user]
    cn: Alice
    mail: alice@example.com
  - distinguishedName: CN=Bob,OU=Staff,DC=example,DC=com
    objectClass: [top, person, user]
    cn: Bob
  - distinguishedName: CN=Carol,OU=Contractors,DC=example,DC=com
    objectClass: [top, person, user]
    cn: Carol
  - distinguishedName: CN=WS-01,OU=Workstations,DC=example,DC=com
    objectClass: [top, computer]
    cn: WS-01
";

fn directory() -> MemoryDirectory {
    MemoryDirectory::from_yaml_str(FIXTURE).unwrap()
}

fn request<'a>(
    partition: &'a Partition,
    filter: &'a str,
    attributes: &'a [String],
    page_size: u32,
    token: Option<&'a ContinuationToken>,
) -> SearchRequest<'a> {
    SearchRequest {
        partition,
        filter,
        attributes,
        page_size,
        token,
    }
}

fn names(entries: &[Record]) -> Vec<&str> {
    entries
        .iter()
        .map(|e| e.get("cn").and_then(JsonValue::as_str).unwrap_or(""))
        .collect()
}

// ============================================================================
// Type Tests
// ============================================================================

#[test]
fn test_token_debug_hides_bytes() {
    let token = ContinuationToken::new(b"secret-cookie".to_vec());
    assert_eq!(format!("{token:?}"), "ContinuationToken(13 bytes)");
}

#[test]
fn test_search_page_continuation() {
    let (_, token) = SearchPage::more(vec![], ContinuationToken::new(vec![1])).into_continuation();
    assert!(token.is_some());

    // A token without has_more does not keep the partition alive
    let page = SearchPage {
        entries: vec![],
        next_token: Some(ContinuationToken::new(vec![1])),
        has_more: false,
    };
    assert!(page.into_continuation().1.is_none());
}

#[test]
fn test_count_estimate_combine() {
    let total = CountEstimate::exact(10).combine(CountEstimate::exact(5));
    assert_eq!(total, CountEstimate::exact(15));

    let total = total.combine(CountEstimate::approximate(1000));
    assert_eq!(total.count, 1015);
    assert!(!total.is_exact);
}

// ============================================================================
// MemoryDirectory Tests
// ============================================================================

#[test]
fn test_fixture_requires_dn() {
    let err = MemoryDirectory::new("DC=example,DC=com", vec![Record::new().with("cn", "x")])
        .unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_search_pages_through_partition() {
    let dir = directory();
    let root = Partition::Default;
    let filter = "(objectClass=user)";

    let first = dir
        .search(request(&root, filter, &[], 2, None))
        .await
        .unwrap();
    assert_eq!(names(&first.entries), vec!["Alice", "Bob"]);
    assert!(first.has_more);

    let token = first.next_token.unwrap();
    let second = dir
        .search(request(&root, filter, &[], 2, Some(&token)))
        .await
        .unwrap();
    assert_eq!(names(&second.entries), vec!["Carol"]);
    assert!(!second.has_more);
    assert!(second.next_token.is_none());

    assert_eq!(dir.search_calls(), 2);
}

#[tokio::test]
async fn test_search_named_partition_is_subtree() {
    let dir = directory();
    let staff = Partition::named("OU=Staff,DC=example,DC=com");

    let page = dir
        .search(request(&staff, "(cn=*)", &[], 10, None))
        .await
        .unwrap();
    assert_eq!(names(&page.entries), vec!["Alice", "Bob"]);
}

#[tokio::test]
async fn test_search_outside_base_fails() {
    let dir = directory();
    let other = Partition::named("OU=Staff,DC=other,DC=org");

    let err = dir
        .search(request(&other, "(cn=*)", &[], 10, None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
    assert!(err.to_string().contains("no such object"));
}

#[tokio::test]
async fn test_token_from_other_partition_rejected() {
    let dir = directory();
    let root = Partition::Default;
    let staff = Partition::named("OU=Staff,DC=example,DC=com");

    let page = dir
        .search(request(&root, "(cn=*)", &[], 1, None))
        .await
        .unwrap();
    let token = page.next_token.unwrap();

    let err = dir
        .search(request(&staff, "(cn=*)", &[], 1, Some(&token)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid continuation token"));
}

#[tokio::test]
async fn test_search_projects_attributes() {
    let dir = directory();
    let root = Partition::Default;
    let attributes = vec!["cn".to_string(), "mail".to_string()];

    let page = dir
        .search(request(&root, "(objectClass=user)", &attributes, 2, None))
        .await
        .unwrap();

    let alice = &page.entries[0];
    let keys: Vec<&str> = alice.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["distinguishedName", "cn", "mail"]);
    assert_eq!(alice.get("mail"), Some(&json!("alice@example.com")));

    // Missing attributes are present as null
    assert_eq!(page.entries[1].get("mail"), Some(&JsonValue::Null));
}

#[tokio::test]
async fn test_search_invalid_filter_is_provider_error() {
    let dir = directory();
    let err = dir
        .search(request(&Partition::Default, "(cn=", &[], 10, None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { ref operation, .. } if operation == "search"));
}

#[tokio::test]
async fn test_estimate_count() {
    let dir = directory();

    let estimate = dir
        .estimate_count(&Partition::Default, "(objectClass=user)")
        .await
        .unwrap();
    assert_eq!(estimate, CountEstimate::exact(3));

    let dir = directory().with_count_limit(2);
    let estimate = dir
        .estimate_count(&Partition::Default, "(objectClass=user)")
        .await
        .unwrap();
    assert_eq!(estimate, CountEstimate::approximate(2));
}

#[tokio::test]
async fn test_fixture_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), FIXTURE).unwrap();

    let dir = MemoryDirectory::from_file(file.path()).unwrap();
    assert_eq!(dir.len(), 4);
    assert_eq!(dir.base_dn(), "DC=example,DC=com");

    let err = MemoryDirectory::from_file("/nonexistent/directory.yaml").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}
