use super::*;
use crate::error::MelifError;
use proptest::prelude::*;
use std::f64::consts::FRAC_PI_2;

const SPHERE_EPS: f64 = 1e-8;

fn sp(coords: &[i64], delta: i64) -> SpacePoint {
    SpacePoint::new(coords.to_vec(), delta).unwrap()
}

fn assert_coords(expected: &[f64], actual: &Point) {
    assert_eq!(expected.len(), actual.dim());
    for (e, a) in expected.iter().zip(actual.coords()) {
        assert!((e - a).abs() < SPHERE_EPS, "expected {expected:?}, got {actual}");
    }
}

#[test]
fn normalize_divides_by_sum() {
    let p = Point::normalize(&[1.0, 1.0, 2.0]).unwrap();
    assert_coords(&[0.25, 0.25, 0.5], &p);
    assert!((p.coords().iter().sum::<f64>() - 1.0).abs() < 1e-12);
}

#[test]
fn normalize_rejects_degenerate_input() {
    assert!(matches!(
        Point::normalize(&[0.0, 0.0]),
        Err(MelifError::InvalidPoint(_))
    ));
    assert!(matches!(
        Point::normalize(&[1.0, -0.5]),
        Err(MelifError::InvalidPoint(_))
    ));
    assert!(matches!(
        Point::normalize(&[]),
        Err(MelifError::InvalidPoint(_))
    ));
}

#[test]
fn ordering_uses_tolerance() {
    let a = Point::normalize(&[0.5, 0.5]).unwrap();
    let b = Point::normalize(&[0.500001, 0.499999]).unwrap();
    let c = Point::normalize(&[0.6, 0.4]).unwrap();
    assert_eq!(a, b);
    assert!(a < c);
    assert!(c > b);
}

#[test]
fn neighbours_skip_last_coordinate_and_leave_no_negative() {
    let p = Point::normalize(&[1.0, 0.0, 1.0]).unwrap();
    let ns = p.neighbours(0.1);
    // coord 0: +/-; coord 1: only + (minus would go negative)
    assert_eq!(ns.len(), 3);
    for n in &ns {
        assert!(n.coords().iter().all(|c| *c >= 0.0));
        assert_eq!(n.generation(), 1);
        assert_ne!(n, &p);
    }
}

#[test]
fn sphere_canonical_points() {
    assert_coords(&[0.0, 0.0, 1.0], &spherical_to_cartesian(&[0.0, 0.0]).unwrap());
    assert_coords(
        &[1.0, 0.0, 0.0],
        &spherical_to_cartesian(&[0.0, FRAC_PI_2]).unwrap(),
    );
    assert_coords(
        &[0.0, 0.0, 1.0],
        &spherical_to_cartesian(&[FRAC_PI_2, 0.0]).unwrap(),
    );
    assert_coords(
        &[0.0, 1.0, 0.0],
        &spherical_to_cartesian(&[FRAC_PI_2, FRAC_PI_2]).unwrap(),
    );
    assert_coords(&[1.0, 0.0], &spherical_to_cartesian(&[0.0]).unwrap());
    assert_coords(&[0.0, 1.0], &spherical_to_cartesian(&[FRAC_PI_2]).unwrap());
}

#[test]
fn sphere_rejects_higher_dimensions() {
    assert!(matches!(
        spherical_to_cartesian(&[0.1, 0.2, 0.3]),
        Err(MelifError::InvalidConfiguration(_))
    ));
    assert!(spherical_to_cartesian(&[]).is_err());
}

#[test]
fn angle_grid_endpoints() {
    assert!((angle_at(100, 0) - MIN_ANGLE).abs() < 1e-15);
    assert!((angle_at(100, 100) - MAX_ANGLE).abs() < 1e-12);
    let half = sp(&[1, 1], 2).angles();
    assert!((half[0] - FRAC_PI_2 / 2.0).abs() < 1e-12);
}

#[test]
fn coord_is_reduced_and_ordered() {
    let a = Coord::new(2, 4).unwrap();
    assert_eq!((a.num(), a.den()), (1, 2));
    assert_eq!(a, Coord::new(-3, -6).unwrap());
    assert!(Coord::new(1, 3).unwrap() < a);
    assert!(Coord::new(0, 7).unwrap() < Coord::new(1, 1_000_000).unwrap());
    assert!(Coord::new(1, 0).is_err());
}

#[test]
fn space_point_equality_is_structural() {
    assert_ne!(sp(&[1], 2), sp(&[2], 4));
    assert_ne!(sp(&[1], 2).cmp(&sp(&[2], 4)), std::cmp::Ordering::Equal);
    assert!(sp(&[0, 1], 2) < sp(&[1, 0], 2));
    assert!(SpacePoint::new(vec![1], 0).is_err());
}

#[test]
fn midpoint_known_cases() {
    let cases = [
        ((&[0, 1][..], 2), (&[0, 1][..], 1), (&[0, 3][..], 4)),
        ((&[1, 0][..], 2), (&[1, 0][..], 1), (&[3, 0][..], 4)),
        ((&[0, 1][..], 2), (&[0, 0][..], 1), (&[0, 1][..], 4)),
        ((&[1, 0][..], 2), (&[0, 0][..], 1), (&[1, 0][..], 4)),
        ((&[2, 2][..], 4), (&[0, 4][..], 4), (&[1, 3][..], 4)),
        ((&[2, 2][..], 4), (&[0, 8][..], 8), (&[1, 3][..], 4)),
        ((&[2, 2][..], 4), (&[8, 0][..], 8), (&[3, 1][..], 4)),
    ];
    for ((a, da), (b, db), (m, dm)) in cases {
        assert_eq!(midpoint(&sp(a, da), &sp(b, db)).unwrap(), sp(m, dm));
    }
}

#[test]
fn midpoint_rejects_mismatched_dims_and_overflow() {
    assert!(matches!(
        midpoint(&sp(&[1], 2), &sp(&[1, 1], 2)),
        Err(MelifError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        midpoint(&sp(&[1], i64::MAX), &sp(&[1], i64::MAX - 1)),
        Err(MelifError::ArithmeticOverflow(_))
    ));
}

fn space_point_pair() -> impl Strategy<Value = (SpacePoint, SpacePoint)> {
    (1u32..12, 1u32..12, 1usize..4).prop_flat_map(|(ea, eb, dim)| {
        let da = 1i64 << ea;
        let db = 1i64 << eb;
        (
            proptest::collection::vec(0..=da, dim),
            proptest::collection::vec(0..=db, dim),
        )
            .prop_map(move |(a, b)| (sp(&a, da), sp(&b, db)))
    })
}

proptest! {
    #[test]
    fn midpoint_is_symmetric_and_between((a, b) in space_point_pair()) {
        let m = midpoint(&a, &b).unwrap();
        prop_assert_eq!(&m, &midpoint(&b, &a).unwrap());
        for i in 0..a.dim() {
            let (ca, cb, cm) = (a.coord(i), b.coord(i), m.coord(i));
            let (lo, hi) = if ca <= cb { (ca, cb) } else { (cb, ca) };
            if lo == hi {
                prop_assert_eq!(cm, lo);
            } else {
                prop_assert!(lo < cm && cm < hi);
            }
        }
    }

    #[test]
    fn normalized_points_sum_to_one(raw in proptest::collection::vec(0.0f64..10.0, 1..6)) {
        prop_assume!(raw.iter().sum::<f64>() > 1e-9);
        let p = Point::normalize(&raw).unwrap();
        prop_assert!((p.coords().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
