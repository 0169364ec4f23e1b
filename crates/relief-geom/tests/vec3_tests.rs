use relief_geom::Vec3;

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn vec3_approx_eq(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps) && approx_eq(a.z, b.z, eps)
}

#[test]
fn vec3_add_sub() {
    let a = Vec3::new(1.0, 2.0, 3.0);
    let b = Vec3::new(-4.0, 5.0, -6.0);
    let c = a + b;
    assert!(vec3_approx_eq(c, Vec3::new(-3.0, 7.0, -3.0), 1e-6));

    let d = c - a;
    assert!(vec3_approx_eq(d, b, 1e-6));
}

#[test]
fn vec3_scalar_mul_div() {
    let v = Vec3::new(1.5, -2.0, 4.0);
    let m = v * 2.0;
    assert!(vec3_approx_eq(m, Vec3::new(3.0, -4.0, 8.0), 1e-6));

    let d = m / 2.0;
    assert!(vec3_approx_eq(d, v, 1e-6));
}

#[test]
fn vec3_dot_length_normalized() {
    let v = Vec3::new(3.0, 4.0, 0.0);
    assert!(approx_eq(v.dot(v), 25.0, 1e-6));
    assert!(approx_eq(v.length(), 5.0, 1e-6));

    let n = v.normalized();
    assert!(approx_eq(n.length(), 1.0, 1e-6));
    assert!(vec3_approx_eq(n, Vec3::new(0.6, 0.8, 0.0), 1e-6));

    // Zero vector normalization is a no-op, not NaN.
    let zn = Vec3::ZERO.normalized();
    assert!(vec3_approx_eq(zn, Vec3::ZERO, 1e-6));
}

#[test]
fn vec3_distance() {
    let a = Vec3::new(1.0, 0.0, 0.0);
    let b = Vec3::new(4.0, 4.0, 0.0);
    assert!(approx_eq(a.distance(b), 5.0, 1e-6));
    assert!(approx_eq(b.distance(a), 5.0, 1e-6));
    assert!(approx_eq(a.distance(a), 0.0, 1e-6));
}

#[test]
fn vec3_angle_to() {
    let x = Vec3::new(1.0, 0.0, 0.0);
    let y = Vec3::new(0.0, 2.0, 0.0);
    assert!(approx_eq(x.angle_to(y), std::f32::consts::FRAC_PI_2, 1e-5));
    assert!(approx_eq(x.angle_to(x), 0.0, 1e-4));
    assert!(approx_eq(
        x.angle_to(Vec3::new(-3.0, 0.0, 0.0)),
        std::f32::consts::PI,
        1e-5
    ));
    // Degenerate input stays finite.
    assert!(approx_eq(x.angle_to(Vec3::ZERO), 0.0, 1e-6));
}
