use serde_json::{json, Value};

use hakushin_harvester::engine::resolver::AssetResolver;

const BASE: &str = "https://api.hakush.in/ww/";

fn resolver() -> AssetResolver {
    AssetResolver::new(BASE)
}

#[test]
fn test_resolve_engine_path() {
    let url = resolver()
        .resolve("/Game/Aki/UI/UIResources/Common/Image/IconA/T_IconA_hsb_UI.T_IconA_hsb_UI")
        .unwrap();
    assert_eq!(
        url,
        "https://api.hakush.in/ww/UI/UIResources/Common/Image/IconA/T_IconA_hsb_UI.webp"
    );
}

#[test]
fn test_extension_always_webp() {
    let r = resolver();
    let from_asset = r.resolve("/Game/Aki/UI/Icon/T_Foo.T_Foo").unwrap();
    let from_png = r.resolve("/Game/Aki/UI/Icon/T_Foo.png").unwrap();
    let from_jpg = r.resolve("/UI/Icon/T_Foo.jpg").unwrap();

    assert!(from_asset.ends_with("/UI/Icon/T_Foo.webp"));
    assert!(from_png.ends_with("/UI/Icon/T_Foo.webp"));
    assert!(from_jpg.ends_with("/UI/Icon/T_Foo.webp"));
}

#[test]
fn test_rejects_non_paths() {
    let r = resolver();
    assert_eq!(r.resolve(""), None);
    assert_eq!(r.resolve("noSlashHere"), None);
    assert_eq!(r.resolve_value(&Value::Null), None);
    assert_eq!(r.resolve_value(&json!(42)), None);
    assert_eq!(r.resolve_value(&json!(["/Game/Aki/UI/A.A"])), None);
}

#[test]
fn test_resolution_is_deterministic() {
    let r = resolver();
    for input in ["/Game/Aki/UI/Icon/T_A.T_A", "/UI/B.png", "x", "", "a/b/c"] {
        assert_eq!(r.resolve(input), r.resolve(input));
    }
}

#[test]
fn test_dot_segments_are_rejected() {
    let r = resolver();
    assert_eq!(r.resolve("/Game/Aki/../../etc/passwd"), None);
    assert_eq!(r.resolve("/Game/Aki/UI/../../secret.x"), None);
    assert_eq!(r.resolve("/Game/Aki/UI/./T_A.T_A"), None);
    assert_eq!(r.resolve("/Game/Aki/UI/%2e%2E/T_A.T_A"), None);
    assert_eq!(r.resolve("/Game/Aki/UI\\..\\T_A.T_A"), None);
    assert!(r.resolve("/Game/Aki/UI/..Icon/T_A.T_A").is_some());
}

#[test]
fn test_scheme_like_path_stays_under_base() {
    let hijack = resolver().resolve("https://evil.example/UI/x.png").unwrap();
    assert!(hijack.starts_with(BASE));
}

#[test]
fn test_resolve_value_accepts_strings() {
    assert_eq!(
        resolver().resolve_value(&json!("/Game/Aki/UI/A.A")).as_deref(),
        Some("https://api.hakush.in/ww/UI/A.webp")
    );
}
