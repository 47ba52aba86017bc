use super::*;

#[test]
fn fnv_seeded_hash_is_stable() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"storyreel");
    let mut b = Fnv1a64::new(Fnv1a64::OFFSET_BASIS);
    b.write_u8(b's');
    b.write_bytes(b"toryreel");
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn fnv_treats_signed_zero_alike() {
    let mut a = Fnv1a64::new_default();
    a.write_f64(0.0);
    let mut b = Fnv1a64::new_default();
    b.write_f64(-0.0);
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn lerp_hits_endpoints_exactly() {
    assert_eq!(lerp(0.8, 1.0, 0.0), 0.8);
    assert_eq!(lerp(0.8, 1.0, 1.0), 1.0);
    assert_eq!(lerp(1.12, 1.0, 1.0), 1.0);
}

#[test]
fn interpolate_clamps_and_hits_control_points() {
    let xs = [0.0, 0.5, 1.0];
    let ys = [1.0, 1.12, 1.0];
    assert_eq!(interpolate(-1.0, &xs, &ys), 1.0);
    assert_eq!(interpolate(0.0, &xs, &ys), 1.0);
    assert_eq!(interpolate(0.5, &xs, &ys), 1.12);
    assert_eq!(interpolate(1.0, &xs, &ys), 1.0);
    assert_eq!(interpolate(2.0, &xs, &ys), 1.0);
    assert!((interpolate(0.25, &xs, &ys) - 1.06).abs() < 1e-12);
}
