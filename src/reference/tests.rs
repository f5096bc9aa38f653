use super::*;

#[test]
fn reference_from_parts() {
    assert_eq!(
        Reference::from_parts(None, "busybox", None, None)
            .unwrap()
            .to_string(),
        "busybox"
    );
    assert!(Reference::from_parts(None, "localhost", None, None).is_ok());
    assert!(Reference::from_parts(None, "localpost/busybox", None, None).is_ok());
    assert!(Reference::from_parts(None, "localhost/busybox", None, None).is_err());
    assert!(Reference::from_parts(None, "library/busybox", None, None).is_ok());
    assert!(Reference::from_parts(None, "library:42/busybox", None, None).is_err());
    assert!(Reference::from_parts(Some("library:42"), "busybox", None, None).is_ok());
}

#[test]
fn parse_reference() {
    assert!(Reference::parse("busybox").is_ok());
    assert!(Reference::parse("busybox/").is_err());
    assert!(Reference::parse("some/path").is_ok());
    assert!(Reference::parse("some/longer/path").is_ok());
    assert!(Reference::parse("-busybox").is_err());
    assert!(Reference::parse("b--box").is_ok());
    assert!(Reference::parse("").is_err());
    assert!(Reference::parse(" busybox").is_err());
    assert!(Reference::parse("busybox ").is_err());
    assert!(Reference::parse("/busybox").is_err());
    assert!(Reference::parse("reg.io/some//path").is_err());
    assert!(Reference::parse("busybox:").is_err());
    assert!(Reference::parse("busybox:?").is_err());
    assert!(Reference::parse("busybox:1.25").is_ok());
    assert!(Reference::parse("reg.io:/busybox").is_err());
    assert!(Reference::parse("reg.io:5000/busybox").is_ok());
    assert!(Reference::parse("busybox:1.25@").is_err());
    assert!(Reference::parse("busybox@sha256:abcd").is_err());

    let p = Reference::parse("busybox").unwrap();
    assert_eq!(p.registry(), None);
    assert_eq!(p.repository().as_str(), "busybox");
    assert_eq!(p.tag(), None);
    assert_eq!(p.digest(), None);
    assert!(p.is_name_only());
    assert!(!p.is_tagged());
    assert!(!p.is_canonical_digested());

    // localhost with no path is a repository, localhost with a path is a registry
    let p = Reference::parse("localhost").unwrap();
    assert_eq!(p.registry(), None);
    assert_eq!(p.repository().as_str(), "localhost");
    let p = Reference::parse("localhost:5000/busybox").unwrap();
    assert_eq!(p.registry().unwrap().as_str(), "localhost:5000");
    assert_eq!(p.repository().as_str(), "busybox");
    assert!(!p.registry().unwrap().is_https());

    let p = Reference::parse("reg.io/ns/busybox:1.25").unwrap();
    assert_eq!(p.registry().unwrap().as_str(), "reg.io");
    assert_eq!(p.repository().as_str(), "ns/busybox");
    assert_eq!(p.tag().unwrap().as_str(), "1.25");
    assert!(p.is_tagged());
    assert!(p.registry().unwrap().is_https());

    let digest = "sha256:29f5d56d12684887bdfa50dcd29fc31eea4aaf4ad3bec43daf19026a7ce69912";
    let p = Reference::parse(&format!("busybox:1.25@{}", digest)).unwrap();
    assert_eq!(p.repository().as_str(), "busybox");
    assert_eq!(p.tag().unwrap().as_str(), "1.25");
    assert_eq!(p.digest().unwrap().as_str(), digest);
    assert!(p.is_canonical_digested());
    assert!(!p.is_tagged());

    // a bare ID parses as a name-only reference
    let p = Reference::parse("29f5d56d1268").unwrap();
    assert!(p.is_name_only());
}

#[test]
fn image_id_forms() {
    assert!(Reference::parse("29f5d56d1268").unwrap().may_be_image_id());
    assert!(Reference::parse("busybox").unwrap().may_be_image_id());

    // a full digest string parses as repository "sha256" plus a hex tag,
    // but still qualifies as an ID form
    let digest = "sha256:29f5d56d12684887bdfa50dcd29fc31eea4aaf4ad3bec43daf19026a7ce69912";
    let p = Reference::parse(digest).unwrap();
    assert!(p.is_tagged());
    assert!(p.may_be_image_id());

    assert!(!Reference::parse("busybox:1.25").unwrap().may_be_image_id());
    assert!(!Reference::parse("sha256:abcd").unwrap().may_be_image_id());
    assert!(!Reference::parse("reg.io/busybox").unwrap().may_be_image_id());
    assert!(!Reference::parse(&format!("busybox@{}", digest))
        .unwrap()
        .may_be_image_id());
}

#[test]
fn parse_content_digest() {
    assert!(ContentDigest::parse("29f5d56d1268").is_err());
    assert!(ContentDigest::parse("sha256:0123456789abcdef0123456789abcdef").is_ok());
    assert!(ContentDigest::parse(":0123456789abcdef0123456789abcdef").is_err());
    assert!(ContentDigest::parse("sha256:0123456789abcdef0123456789abcde").is_err());
    assert!(ContentDigest::parse("sha256:0123456789ABCDEF0123456789ABCDEF").is_err());
    assert!(ContentDigest::parse(" sha256:0123456789abcdef0123456789abcdef").is_err());
    assert!(ContentDigest::parse("sha256:0123456789abcdef0123456789abcdef ").is_err());
    assert!(ContentDigest::parse("9:0123456789abcdef0123456789abcdef").is_err());

    let d = ContentDigest::parse("sha256:0123456789abcdef0123456789abcdef").unwrap();
    assert_eq!(d.format_str(), "sha256");
    assert_eq!(d.hex_str(), "0123456789abcdef0123456789abcdef");
    assert!(d.matches_id("0123"));
    assert!(d.matches_id("0123456789abcdef0123456789abcdef"));
    assert!(d.matches_id("sha256:0123"));
    assert!(d.matches_id("sha256:0123456789abcdef0123456789abcdef"));
    assert!(!d.matches_id(""));
    assert!(!d.matches_id("123"));
    assert!(!d.matches_id("md5:0123"));
}

#[test]
fn parse_repository() {
    assert!(Repository::parse("").is_err());
    assert!(Repository::parse("/").is_err());
    assert!(Repository::parse("busybox").is_ok());
    assert!(Repository::parse("busy.box").is_ok());
    assert!(Repository::parse("busy..box").is_err());
    assert!(Repository::parse(".box").is_err());
    assert!(Repository::parse("ns/busy.box").is_ok());
    assert!(Repository::parse("ns//busybox").is_err());
    assert!(Repository::parse("a").is_ok());

    let r = Repository::parse("busybox").unwrap();
    assert!(r.is_single_component());
    let joined = Repository::parse("library").unwrap().join(&r);
    assert_eq!(joined.as_str(), "library/busybox");
    assert!(!joined.is_single_component());
    let parts: Vec<&str> = joined.iter().collect();
    assert_eq!(parts, vec!["library", "busybox"]);
}

#[test]
fn default_tag() {
    let p = Reference::parse("busybox").unwrap().with_default_tag_if_missing();
    assert_eq!(p.to_string(), "busybox:latest");
    assert!(p.tag().unwrap().is_latest());

    let p = Reference::parse("busybox:1.25").unwrap().with_default_tag_if_missing();
    assert_eq!(p.to_string(), "busybox:1.25");

    let digest = "sha256:29f5d56d12684887bdfa50dcd29fc31eea4aaf4ad3bec43daf19026a7ce69912";
    let p = Reference::parse(&format!("busybox@{}", digest))
        .unwrap()
        .with_default_tag_if_missing();
    assert_eq!(p.tag(), None);
}

#[test]
fn digest_wins_over_tag() {
    let digest = "sha256:29f5d56d12684887bdfa50dcd29fc31eea4aaf4ad3bec43daf19026a7ce69912";
    let p = Reference::parse(&format!("busybox:1.25@{}", digest))
        .unwrap()
        .trim_tag_for_digest();
    assert_eq!(p.to_string(), format!("busybox@{}", digest));

    let p = Reference::parse("busybox:1.25").unwrap().trim_tag_for_digest();
    assert_eq!(p.to_string(), "busybox:1.25");
}

#[test]
fn digest_alias_form() {
    let digest: ContentDigest =
        "sha256:29f5d56d12684887bdfa50dcd29fc31eea4aaf4ad3bec43daf19026a7ce69912"
            .parse()
            .unwrap();
    let p = Reference::parse("reg.io/busybox:1.25").unwrap().with_digest(&digest);
    assert_eq!(p.to_string(), format!("reg.io/busybox@{}", digest));
    assert!(p.is_canonical_digested());
}

#[test]
fn locator_grouping() {
    let digest = "sha256:29f5d56d12684887bdfa50dcd29fc31eea4aaf4ad3bec43daf19026a7ce69912";
    let a = Reference::parse("busybox:1.25").unwrap();
    let b = Reference::parse(&format!("busybox@{}", digest)).unwrap();
    let c = Reference::parse("localhost:5000/busybox:latest").unwrap();
    assert_eq!(a.locator(), b.locator());
    assert_ne!(a.locator(), c.locator());
    assert_eq!(a.locator().to_string(), "busybox");
    assert_eq!(c.locator().to_string(), "localhost:5000/busybox");
}

#[test]
fn default_locator_injection() {
    let registry: Registry = "reg.io".parse().unwrap();
    let namespace: Repository = "library".parse().unwrap();

    let p = Reference::parse("busybox:1.25").unwrap();
    let q = p.with_default_locator(Some(&registry), Some(&namespace)).unwrap();
    assert_eq!(q.to_string(), "reg.io/library/busybox:1.25");

    // multi-component paths keep their namespace
    let p = Reference::parse("ns/busybox").unwrap();
    let q = p.with_default_locator(Some(&registry), Some(&namespace)).unwrap();
    assert_eq!(q.to_string(), "reg.io/ns/busybox");

    // already qualified, or nothing configured: no second candidate
    let p = Reference::parse("other.io/busybox").unwrap();
    assert!(p.with_default_locator(Some(&registry), Some(&namespace)).is_none());
    let p = Reference::parse("busybox").unwrap();
    assert!(p.with_default_locator(None, Some(&namespace)).is_none());

    // no namespace configured: only the registry is injected
    let p = Reference::parse("busybox").unwrap();
    let q = p.with_default_locator(Some(&registry), None).unwrap();
    assert_eq!(q.to_string(), "reg.io/busybox");
}
