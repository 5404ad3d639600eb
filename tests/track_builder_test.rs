mod common;

use approx::assert_relative_eq;
use common::crt_hit;
use crtmatch::crt_hit::CrtHit;
use crtmatch::match_params::CrtMatchParams;
use crtmatch::track_builder::{
    apa_t0s_from_hits, create_tracks, create_tracks_from_tzeros, create_tzeros,
};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn build(hits: &[CrtHit], params: &CrtMatchParams) -> Vec<crtmatch::crt_hit::CrtTrack> {
    create_tracks(
        hits,
        params.time_limit,
        params.average_hit_dist,
        params.use_top_plane,
        params.distance_limit,
    )
}

#[test]
fn test_top_bottom_pair_within_limits() {
    let params = CrtMatchParams::builder()
        .time_limit(0.1)
        .distance_limit(700.0)
        .use_top_plane(true)
        .build()
        .unwrap();

    let hits = vec![
        crt_hit(Point3::new(10.0, 300.0, 100.0), 12.0, "volTaggerTopHigh_0"),
        crt_hit(Point3::new(-20.0, -300.0, 140.0), 12.06, "volTaggerBot_0"),
    ];
    let tracks = build(&hits, &params);
    assert_eq!(tracks.len(), 1);
    assert_relative_eq!(tracks[0].time, 12.03, epsilon = 1e-12);
    assert_eq!(tracks[0].top_down().0, hits[0].position);

    // same hits pushed apart beyond the distance limit
    let far = vec![
        hits[0].clone(),
        crt_hit(Point3::new(-20.0, -500.0, 140.0), 12.06, "volTaggerBot_0"),
    ];
    assert!(build(&far, &params).is_empty());
}

#[test]
fn test_side_pairs_follow_top_plane_flag() {
    let hits = vec![
        crt_hit(Point3::new(0.0, 300.0, 100.0), 5.0, "volTaggerTopHigh_0"),
        crt_hit(Point3::new(0.0, 0.0, -100.0), 5.02, "volTaggerSouth_0"),
        crt_hit(Point3::new(0.0, -300.0, 100.0), 5.04, "volTaggerBot_0"),
    ];
    let with_top = CrtMatchParams::builder()
        .distance_limit(1000.0)
        .build()
        .unwrap();
    let without_top = CrtMatchParams::builder()
        .distance_limit(1000.0)
        .use_top_plane(false)
        .build()
        .unwrap();

    // Bot/South never pairs, Top/Bot always does, Top/South only with the flag
    assert_eq!(build(&hits, &with_top).len(), 2);
    let tracks = build(&hits, &without_top);
    assert_eq!(tracks.len(), 1);
    assert_eq!(
        tracks[0].taggers,
        ("volTaggerBot_0".to_string(), "volTaggerTopHigh_0".to_string())
    );
}

#[test]
fn test_one_d_hits_of_a_tagger_are_merged() {
    let mut a = crt_hit(Point3::new(0.0, 300.0, 100.0), 1.0, "volTaggerTopHigh_0");
    a.error = Vector3::new(150.0, 1.0, 2.0);
    let mut b = crt_hit(Point3::new(0.0, 300.0, 110.0), 1.01, "volTaggerTopHigh_0");
    b.error = Vector3::new(150.0, 1.0, 2.0);
    let bottom = crt_hit(Point3::new(0.0, -300.0, 105.0), 1.02, "volTaggerBot_0");

    let tzeros = create_tzeros(&[a, b, bottom], 0.1);
    assert_eq!(tzeros.len(), 1);
    let tracks = create_tracks_from_tzeros(&tzeros, 20.0, true, 1000.0);
    assert_eq!(tracks.len(), 1);

    let track = &tracks[0];
    assert_eq!(track.end, Point3::new(0.0, 300.0, 105.0));
    assert_relative_eq!(track.end_error, Vector3::new(150.0, 1.0, 7.0), epsilon = 1e-12);
    assert_relative_eq!(track.end_time, 1.005, epsilon = 1e-12);
}

#[test]
fn test_tzeros_do_not_depend_on_input_order() {
    let mut rng = StdRng::seed_from_u64(2024_u64);
    let mut hits: Vec<CrtHit> = (0..200)
        .map(|i| {
            // five bunches of hits, 50 us apart
            let time = (i % 5) as f64 * 50.0 + rng.random_range(0.0..0.05);
            crt_hit(Point3::origin(), time, &format!("tagger_{i}"))
        })
        .collect();

    let groups = create_tzeros(&hits, 0.1);
    assert_eq!(groups.len(), 5);
    assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), 200);
    for group in &groups {
        for pair in group.windows(2) {
            assert!(pair[1].time - pair[0].time < 0.1);
            assert!(pair[0].time <= pair[1].time);
        }
    }

    hits.shuffle(&mut rng);
    let shuffled = create_tzeros(&hits, 0.1);
    assert_eq!(
        shuffled.iter().map(Vec::len).collect::<Vec<_>>(),
        groups.iter().map(Vec::len).collect::<Vec<_>>()
    );

    let t0s = apa_t0s_from_hits(&hits, 0.1);
    for (k, t0) in t0s.iter().enumerate() {
        assert!((t0 - k as f64 * 50.0).abs() < 0.05);
    }
}
