use proptest::prelude::*;
use relief_geom::Vec3;

fn finite_vec3() -> impl Strategy<Value = Vec3> {
    let c = -1.0e3f32..1.0e3f32;
    (c.clone(), c.clone(), c).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #[test]
    fn add_commutes(a in finite_vec3(), b in finite_vec3()) {
        let s1 = a + b;
        let s2 = b + a;
        prop_assert!((s1.x - s2.x).abs() <= 1e-4);
        prop_assert!((s1.y - s2.y).abs() <= 1e-4);
        prop_assert!((s1.z - s2.z).abs() <= 1e-4);
    }

    #[test]
    fn distance_is_symmetric_and_nonnegative(a in finite_vec3(), b in finite_vec3()) {
        let d1 = a.distance(b);
        let d2 = b.distance(a);
        prop_assert!(d1 >= 0.0);
        prop_assert!((d1 - d2).abs() <= 1e-2);
    }

    #[test]
    fn normalized_is_unit_or_zero(v in finite_vec3()) {
        let n = v.normalized();
        let len = n.length();
        if v.length() > 1e-3 {
            prop_assert!((len - 1.0).abs() <= 1e-3);
        } else {
            prop_assert!(len.is_finite());
        }
    }

    #[test]
    fn angle_to_in_range(a in finite_vec3(), b in finite_vec3()) {
        let ang = a.angle_to(b);
        prop_assert!(ang.is_finite());
        prop_assert!((-1e-6..=std::f32::consts::PI + 1e-6).contains(&ang));
    }

    #[test]
    fn cross_is_orthogonal(a in finite_vec3(), b in finite_vec3()) {
        let c = a.cross(b);
        // Orthogonality within tolerance scaled by magnitudes.
        let scale = (a.length() * b.length()).max(1.0);
        prop_assert!(c.dot(a).abs() <= scale * 1e-2);
        prop_assert!(c.dot(b).abs() <= scale * 1e-2);
    }
}
