use super::*;
use crate::config::CalibDbConfig;
use crate::error::CalibError;

#[test]
fn test_default_constraints() {
    let constraints = CaptureConstraints::default();

    assert_eq!((constraints.width, constraints.height), (1280, 720));
    assert_eq!(constraints.facing_mode, FacingMode::Environment);
    assert!(!constraints.audio);
}

#[test]
fn test_constraints_builder() {
    let constraints = CaptureConstraints::with_resolution(640, 480).facing_mode(FacingMode::User);

    assert_eq!((constraints.width, constraints.height), (640, 480));
    assert_eq!(constraints.facing_mode, FacingMode::User);
}

#[test]
fn test_nearest_mode_prefers_exact_match() {
    let modes = [(640, 480), (1280, 720), (1920, 1080)];
    assert_eq!(nearest_mode(&modes, (1280, 720)), Some((1280, 720)));
}

#[test]
fn test_nearest_mode_without_exact_match() {
    let modes = [(640, 480), (1280, 960), (1920, 1080)];
    // 1280x960 is 240 away, 1920x1080 is 1000 away
    assert_eq!(nearest_mode(&modes, (1280, 720)), Some((1280, 960)));
}

#[test]
fn test_nearest_mode_tie_keeps_first() {
    let modes = [(1180, 720), (1380, 720)];
    assert_eq!(nearest_mode(&modes, (1280, 720)), Some((1180, 720)));
    assert_eq!(nearest_mode(&[], (1280, 720)), None);
}

#[test]
fn test_facing_mode_location_matching() {
    assert!(FacingMode::Environment.matches_location("back"));
    assert!(FacingMode::Environment.matches_location("Back"));
    assert!(!FacingMode::Environment.matches_location("front"));
    assert!(FacingMode::User.matches_location("front"));
    assert!(FacingMode::Any.matches_location("external"));
}

#[test]
fn test_descriptor_imsize_order() {
    let descriptor = CameraDescriptor::new("HD Webcam", 1280, 720);

    assert_eq!(descriptor.imsize(), [1280, 720]);
    assert_eq!(descriptor.to_string(), "HD Webcam (1280x720)");
}

#[tokio::test]
async fn test_static_resolver_ignores_constraints() {
    let resolver = StaticCameraResolver::new(CameraDescriptor::new("Pi Camera", 1640, 1232));

    let descriptor = resolver
        .resolve(&CaptureConstraints::default())
        .await
        .unwrap();
    assert_eq!(descriptor, CameraDescriptor::new("Pi Camera", 1640, 1232));
}

#[tokio::test]
async fn test_mock_resolver_records_calls() {
    let resolver = MockCameraResolver::with_camera("Mock Camera", 1280, 720);
    let constraints = CaptureConstraints::with_resolution(800, 600);

    let descriptor = resolver.resolve(&constraints).await.unwrap();

    assert_eq!(descriptor.label, "Mock Camera");
    assert_eq!(resolver.call_count(), 1);
    assert_eq!(resolver.last_constraints(), Some(constraints));
}

#[tokio::test]
async fn test_mock_resolver_errors() {
    let resolver = MockCameraResolver::new(MockOutcome::PermissionDenied);
    let result = resolver.resolve(&CaptureConstraints::default()).await;
    assert!(matches!(result, Err(CalibError::PermissionDenied)));

    let resolver = MockCameraResolver::new(MockOutcome::NotFound);
    let result = resolver.resolve(&CaptureConstraints::default()).await;
    assert!(matches!(result, Err(CalibError::DeviceNotFound)));

    let resolver = MockCameraResolver::new(MockOutcome::Unknown("device busy".to_string()));
    match resolver.resolve(&CaptureConstraints::default()).await {
        Err(CalibError::UnknownDevice { message }) => assert_eq!(message, "device busy"),
        other => panic!("Expected unknown device error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resolver_from_config_uses_label() {
    let mut config = CalibDbConfig::default().camera;
    config.label = Some("HD Pro Webcam C920".to_string());
    config.resolution = (1920, 1080);

    let resolver = resolver_from_config(&config).unwrap();
    let descriptor = resolver
        .resolve(&CaptureConstraints::default())
        .await
        .unwrap();

    assert_eq!(descriptor, CameraDescriptor::new("HD Pro Webcam C920", 1920, 1080));
}
