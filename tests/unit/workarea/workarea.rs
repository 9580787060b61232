use super::*;

#[test]
fn paths_are_inside_and_tracked() {
    let wa = WorkArea::create(None).unwrap();
    let img = wa.slide_image_path(3).unwrap();
    let nar = wa.narration_path(3, "wav").unwrap();
    let bed = wa.audio_bed_path().unwrap();
    assert!(img.starts_with(wa.path()));
    assert!(img.ends_with("slide_0003.png"));
    assert!(nar.ends_with("narration_0003.wav"));
    assert!(bed.ends_with("narration_bed.f32le"));
    assert_eq!(wa.tracked().len(), 3);
}

#[test]
fn drop_removes_everything() {
    let base = tempfile::tempdir().unwrap();
    let root;
    {
        let wa = WorkArea::create(Some(base.path())).unwrap();
        root = wa.path().to_path_buf();
        let staged = wa.stage_upload("deck.pptx", b"bytes").unwrap();
        std::fs::write(wa.slide_image_path(0).unwrap(), b"png").unwrap();
        assert!(staged.is_file());
        assert!(root.is_dir());
    }
    assert!(!root.exists());
    assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
}

#[test]
fn drop_during_error_path_still_cleans_up() {
    fn failing(base: &Path) -> SlidecastResult<PathBuf> {
        let wa = WorkArea::create(Some(base))?;
        std::fs::write(wa.narration_path(0, "wav")?, b"riff").unwrap();
        Err(SlidecastError::synthesis(0, format!("{}", wa.path().display())))
    }
    let base = tempfile::tempdir().unwrap();
    let err = failing(base.path()).unwrap_err();
    let SlidecastError::Synthesis { msg, .. } = err else {
        panic!("unexpected error");
    };
    assert!(!Path::new(&msg).exists());
}

#[test]
fn close_reports_success_and_removes_directory() {
    let wa = WorkArea::create(None).unwrap();
    let root = wa.path().to_path_buf();
    std::fs::write(wa.audio_bed_path().unwrap(), [0u8; 8]).unwrap();
    wa.close().unwrap();
    assert!(!root.exists());
}

#[test]
fn concurrent_work_areas_are_distinct() {
    let a = WorkArea::create(None).unwrap();
    let b = WorkArea::create(None).unwrap();
    assert_ne!(a.path(), b.path());
}

#[test]
fn upload_name_cannot_escape() {
    let wa = WorkArea::create(None).unwrap();
    let p = wa.stage_upload("../../etc/passwd", b"x").unwrap();
    assert_eq!(p.parent().unwrap(), wa.path());
    let p = wa.stage_upload("", b"x").unwrap();
    assert!(p.ends_with("upload-upload.bin"));
}

#[test]
fn tracking_outside_is_rejected() {
    let wa = WorkArea::create(None).unwrap();
    assert!(wa.track("/definitely/elsewhere.mp4").is_err());
}
