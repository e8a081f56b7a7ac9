use lyrivid::{
    Adjustments, Clip, Crop, Project, SubtitleSegment, TimelineClock, TransitionKind,
};

fn clip(id: &str, duration_sec: f64) -> Clip {
    Clip {
        id: id.to_string(),
        source: format!("img-{id}"),
        duration_sec,
        crop: Crop::default(),
        adjustments: Adjustments::default(),
        overlays: Vec::new(),
    }
}

#[test]
fn scenario_a_two_clips_one_second_fade() {
    let mut p = Project::default();
    p.clips = vec![clip("a", 4.0), clip("b", 6.0)];
    p.settings.transition = TransitionKind::Fade;
    p.settings.transition_duration_sec = 1.0;

    assert_eq!(p.total_duration(), 10.0);

    let late = TimelineClock::resolve(&p, 9.5).active.unwrap();
    assert_eq!(late.index, 1);
    assert!(late.transition.is_none());

    let mid = TimelineClock::resolve(&p, 3.6).active.unwrap();
    assert_eq!(mid.index, 0);
    let tr = mid.transition.unwrap();
    assert!((tr.progress - 0.4).abs() < 1e-9);
}

#[test]
fn scenario_b_subtitle_end_is_exclusive() {
    let mut p = Project::default();
    p.subtitles = vec![SubtitleSegment {
        id: "s0".to_string(),
        start_sec: 2.0,
        end_sec: 4.0,
        text: "Hello".to_string(),
    }];

    assert!(p.active_subtitle(3.0).is_some());
    assert!(p.active_subtitle(4.0).is_none());
}

#[test]
fn clock_round_trip_over_random_durations() {
    // A deterministic spread of uneven durations; the round-trip
    // t == cumulative_start + local_time must hold everywhere.
    let durations = [0.25, 3.0, 1.5, 7.75, 0.5];
    let mut p = Project::default();
    p.clips = durations
        .iter()
        .enumerate()
        .map(|(i, &d)| clip(&format!("c{i}"), d))
        .collect();

    let total: f64 = durations.iter().sum();
    assert_eq!(p.total_duration(), total);

    let steps = 523;
    for i in 0..=steps {
        let t = total * (i as f64) / (steps as f64);
        let state = TimelineClock::resolve(&p, t);
        let active = state.active.unwrap();
        let start = TimelineClock::cumulative_start(&p, active.index);
        assert!((state.global_time - (start + active.local_time)).abs() < 1e-9);
        assert!(
            (active.local_time + active.time_remaining - p.clips[active.index].duration_sec)
                .abs()
                < 1e-9
        );
    }
}

#[test]
fn total_duration_floor_applies_only_when_empty() {
    let p = Project::default();
    assert_eq!(p.total_duration(), 10.0);

    let mut p = Project::default();
    p.clips = vec![clip("a", 2.0)];
    assert_eq!(p.total_duration(), 2.0, "a non-empty timeline is not floored");
}
