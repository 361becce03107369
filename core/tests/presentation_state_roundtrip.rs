use dicom_core::VR;
use dicom_object::InMemDicomObject;
use softcopy_core::dicom::tags::{
    COLUMNS, PHOTOMETRIC_INTERPRETATION, ROWS, SERIES_INSTANCE_UID, SOP_CLASS_UID,
    SOP_INSTANCE_UID, STUDY_INSTANCE_UID, WINDOW_CENTER, WINDOW_WIDTH,
};
use softcopy_core::dicom::{put_ds, put_str, put_us};
use softcopy_core::geometry::DicomOrientation;
use softcopy_core::graphics::{GeometricShutter, GeometricShuttersGraphic, OverlayRole};
use softcopy_core::overlay::codec::encode_mask;
use softcopy_core::overlay::OverlayPlaneAttributes;
use softcopy_core::{
    OverlayPlaneGraphic, PresentationImage, PresentationStateFactory, PresentationStateSopClass,
    PresentationStateSummary, Rect, ShutterRef, SoftcopyPresentationState, VoiLut,
};
use tempfile::TempDir;

const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

fn header(sop: &str) -> InMemDicomObject {
    let mut dcm = InMemDicomObject::new_empty();
    put_str(&mut dcm, SOP_CLASS_UID, VR::UI, CT_IMAGE_STORAGE);
    put_str(&mut dcm, SOP_INSTANCE_UID, VR::UI, sop);
    put_str(&mut dcm, SERIES_INSTANCE_UID, VR::UI, "1.2.826.0.1.1");
    put_str(&mut dcm, STUDY_INSTANCE_UID, VR::UI, "1.2.826.0.1");
    put_us(&mut dcm, ROWS, &[64]);
    put_us(&mut dcm, COLUMNS, &[64]);
    put_str(&mut dcm, PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
    dcm
}

fn image(sop: &str) -> PresentationImage {
    PresentationImage::from_dicom(header(sop), 1).unwrap()
}

fn with_window(sop: &str, center: f64, width: f64) -> PresentationImage {
    let mut dcm = header(sop);
    put_ds(&mut dcm, WINDOW_CENTER, &[center]);
    put_ds(&mut dcm, WINDOW_WIDTH, &[width]);
    PresentationImage::from_dicom(dcm, 1).unwrap()
}

fn with_header_overlay(sop: &str, n: u8) -> PresentationImage {
    let mut dcm = header(sop);
    let mut mask = vec![0u8; 64 * 64];
    mask[65] = 255;
    let data = encode_mask(64, 64, false, &mask).unwrap();
    OverlayPlaneAttributes::new(n, 64, 64, data).write(&mut dcm);
    PresentationImage::from_dicom(dcm, 1).unwrap()
}

fn add_rectangular_shutter(image: &mut PresentationImage, rect: Rect) {
    let mut graphic = GeometricShuttersGraphic::new(64, 64);
    graphic.add_custom_shutter(GeometricShutter::Rectangular(rect));
    let index = image.graphics.add_geometric_shutter(graphic);
    image
        .graphics
        .activate_shutter(Some(ShutterRef::Geometric(index)))
        .unwrap();
}

#[test]
fn window_and_shutter_survive_round_trip() {
    let mut source = image("1.1");
    source.voi_lut = VoiLut::Linear {
        center: 40.0,
        width: 400.0,
        explanation: None,
    };
    add_rectangular_shutter(&mut source, Rect::from_ltrb(5, 6, 50, 60));

    let state = PresentationStateFactory::create(&source).unwrap();

    let mut targets = vec![with_window("1.1", 1000.0, 2000.0)];
    let report = state.deserialize(&mut targets).unwrap();
    assert_eq!(report.images, 1);
    assert!(report.warnings.is_empty());

    let target = &targets[0];
    match &target.voi_lut {
        VoiLut::Linear { center, width, .. } => {
            assert_eq!(*center, 40.0);
            assert_eq!(*width, 400.0);
        }
        other => panic!("expected a window, got {:?}", other),
    }
    let shutter = target.graphics.active_geometric_shutter().unwrap();
    let shutters: Vec<&GeometricShutter> = shutter.all_shutters().collect();
    assert_eq!(
        shutters,
        vec![&GeometricShutter::Rectangular(Rect::from_ltrb(5, 6, 50, 60))]
    );
}

#[test]
fn overlays_beyond_sixteen_groups_are_dropped() {
    let mut source = image("1.1");
    for i in 0..17 {
        let mut overlay = OverlayPlaneGraphic::new_user(64, 64).unwrap();
        overlay.set_pixel(i, i, true);
        let handle = source.graphics.add_user_overlay(overlay);
        source.graphics.activate_as_layer(handle, "marks").unwrap();
    }

    let mut state = SoftcopyPresentationState::new(PresentationStateSopClass::Grayscale);
    let report = state.serialize(std::slice::from_ref(&source)).unwrap();
    assert_eq!(report.overlays_written, 16);
    assert_eq!(report.overlays_dropped, 1);
    assert_eq!(report.warnings.len(), 1);

    let mut targets = vec![image("1.1")];
    state.deserialize(&mut targets).unwrap();
    let plane = &targets[0].graphics;
    for n in 0..16 {
        let handle = plane.presentation_overlay(n).unwrap();
        assert_eq!(plane.role(handle).unwrap(), &OverlayRole::Layer("MARKS".to_string()));
        assert!(plane.is_overlay_visible(handle));
    }
}

#[test]
fn unchanged_header_overlay_stays_on_default_layer() {
    let source = with_header_overlay("1.1", 4);
    let state = PresentationStateFactory::create(&source).unwrap();
    let summary = PresentationStateSummary::from_state(&state).unwrap();
    assert!(summary.overlay_groups.is_empty());

    let mut targets = vec![with_header_overlay("1.1", 4)];
    state.deserialize(&mut targets).unwrap();
    let plane = &targets[0].graphics;
    let handle = plane.image_overlay(4).unwrap();
    assert_eq!(plane.role(handle).unwrap(), &OverlayRole::Layer("OVERLAY".to_string()));
    assert!(plane.presentation_overlay(4).is_none());
}

#[test]
fn first_image_orientation_applies_to_all_images() {
    let mut first = image("1.1");
    first.spatial_transform.rotation = 90;
    let mut second = image("1.2");
    second.spatial_transform.rotation = 270;
    second.spatial_transform.flip_x = true;

    let mut state = SoftcopyPresentationState::new(PresentationStateSopClass::Grayscale);
    state.serialize(&[first, second]).unwrap();

    let mut targets = vec![image("1.1"), image("1.2")];
    state.deserialize(&mut targets).unwrap();
    for target in &targets {
        assert_eq!(
            target.spatial_transform.dicom_orientation(),
            DicomOrientation {
                rotation: 90,
                horizontal_flip: false
            }
        );
    }
}

#[test]
fn mixed_invert_is_not_applied() {
    let mut inverted = image("1.1");
    inverted.invert = true;

    let mut state = SoftcopyPresentationState::new(PresentationStateSopClass::Grayscale);
    state.serialize(&[inverted, image("1.2")]).unwrap();

    let mut targets = vec![image("1.1"), image("1.2")];
    targets[0].invert = true;
    state.deserialize(&mut targets).unwrap();
    assert!(targets.iter().all(|t| !t.invert));
}

#[test]
fn part10_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.dcm");

    let mut source = image("1.1");
    source.voi_lut = VoiLut::Linear {
        center: 50.0,
        width: 350.0,
        explanation: Some("SOFT TISSUE".to_string()),
    };
    let state = PresentationStateFactory::create(&source).unwrap();
    state.save(&path).unwrap();

    let loaded = PresentationStateFactory::load_file(&path).unwrap();
    assert!(loaded.is_sealed());
    assert_eq!(loaded.sop_class(), PresentationStateSopClass::Grayscale);
    assert_eq!(loaded.sop_instance_uid(), state.sop_instance_uid());
    assert_eq!(loaded.content_label(), "FOR_PRESENTATION");

    let mut targets = vec![image("1.1"), image("9.9")];
    let report = loaded.deserialize(&mut targets).unwrap();
    assert_eq!(report.images, 1);
    assert_eq!(report.skipped_images, 1);
    assert_eq!(
        targets[0].voi_lut,
        VoiLut::Linear {
            center: 50.0,
            width: 350.0,
            explanation: Some("SOFT TISSUE".to_string()),
        }
    );
}

#[test]
fn clear_restores_header_presentation() {
    let mut source = image("1.1");
    source.invert = true;
    add_rectangular_shutter(&mut source, Rect::from_ltrb(1, 1, 10, 10));
    let state = PresentationStateFactory::create(&source).unwrap();

    let mut targets = vec![image("1.1")];
    state.deserialize(&mut targets).unwrap();
    assert!(targets[0].invert);
    assert!(targets[0].graphics.active_shutter().is_some());

    assert_eq!(state.clear(&mut targets).unwrap(), 1);
    assert!(!targets[0].invert);
    assert!(targets[0].graphics.active_shutter().is_none());
}
