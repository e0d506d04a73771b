use barlapse::{
    AnimationConfig, ConsumptionRecord, Dataset, Fps, render_to_mp4_with_stats,
};

#[test]
fn render_to_mp4_writes_a_playable_file() {
    if !barlapse::is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }

    let dataset = Dataset::from_records(vec![
        ConsumptionRecord::new("A", 10.0),
        ConsumptionRecord::new("B", 30.0),
        ConsumptionRecord::new("C", 20.0),
    ])
    .unwrap();

    let mut cfg = AnimationConfig::default();
    cfg.duration_secs = 1.0;
    cfg.hold_secs = 0.4;
    cfg.fps = Fps { num: 5, den: 1 };
    cfg.fig_scale = 1;

    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("anim.mp4");

    let (out, stats) = render_to_mp4_with_stats(&dataset, &cfg, out_path.clone()).unwrap();
    assert_eq!(out, out_path);
    assert_eq!(stats.growth_frames, 5);
    assert_eq!(stats.hold_frames, 2);
    assert_eq!(stats.frames_total, 7);

    let meta = std::fs::metadata(&out_path).unwrap();
    assert!(meta.len() > 0, "mp4 output is empty");
}
