use artwork_slideshow::config::Configuration;
use artwork_slideshow::render::fade::FadeMode;
use artwork_slideshow::slideshow::IdleResume;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.manifest, PathBuf::from("artwork.json"));
    assert_eq!(cfg.dwell, Duration::from_millis(3000));
    assert_eq!(cfg.idle_window, Duration::from_millis(5000));
    assert_eq!(cfg.fade, Duration::from_millis(1000));
    assert_eq!(cfg.fade_mode, FadeMode::Cross);
    assert_eq!(cfg.idle_resume, IdleResume::Restart);
    assert!(cfg.fullscreen);
    assert_eq!(cfg.background, [0, 0, 0]);
    assert!(cfg.asset_root.is_none());
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
manifest: "/srv/gallery/artwork.json"
asset-root: "/srv/gallery/public"
dwell: 10s
idle-window: 2500ms
fade: 750ms
fade-mode: sequential
idle-resume: overlap
fullscreen: false
background: [16, 18, 22]
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.manifest, PathBuf::from("/srv/gallery/artwork.json"));
    assert_eq!(cfg.asset_root, Some(PathBuf::from("/srv/gallery/public")));
    assert_eq!(cfg.dwell, Duration::from_secs(10));
    assert_eq!(cfg.idle_window, Duration::from_millis(2500));
    assert_eq!(cfg.fade, Duration::from_millis(750));
    assert_eq!(cfg.fade_mode, FadeMode::Sequential);
    assert_eq!(cfg.idle_resume, IdleResume::Overlap);
    assert!(!cfg.fullscreen);
    assert_eq!(cfg.background, [16, 18, 22]);

    let settings = cfg.slideshow_settings();
    assert_eq!(settings.dwell, Duration::from_secs(10));
    assert_eq!(settings.idle_window, Duration::from_millis(2500));
    assert_eq!(settings.idle_resume, IdleResume::Overlap);
}

#[test]
fn unknown_idle_policy_is_rejected() {
    let err = serde_yaml::from_str::<Configuration>("idle-resume: sometimes").unwrap_err();
    assert!(err.to_string().contains("unknown variant"), "{err}");
}

#[test]
fn zero_durations_fail_validation() {
    for key in ["dwell", "idle-window", "fade"] {
        let yaml = format!("{key}: 0s");
        let cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
        let err = cfg.validated().unwrap_err();
        assert!(err.to_string().contains(key), "{key}: {err}");
    }
}

#[test]
fn defaults_validate() {
    assert!(Configuration::default().validated().is_ok());
}

#[test]
fn relative_manifest_resolves_against_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slideshow.yaml");
    fs::write(&path, "manifest: art/artwork.json\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.manifest, dir.path().join("art/artwork.json"));
}

#[test]
fn absolute_manifest_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slideshow.yaml");
    fs::write(&path, "manifest: /opt/art/artwork.json\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.manifest, PathBuf::from("/opt/art/artwork.json"));
}

#[test]
fn missing_file_reports_path() {
    let err = Configuration::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}
