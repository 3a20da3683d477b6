use super::*;

#[test]
fn fnv_hash_is_order_sensitive_and_stable() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"reel");
    let mut b = Fnv1a64::new_default();
    b.write_bytes(b"re");
    b.write_bytes(b"el");
    assert_eq!(a.finish(), b.finish());

    let mut c = Fnv1a64::new_default();
    c.write_bytes(b"leer");
    assert_ne!(a.finish(), c.finish());
}

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(255, 0), 0);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u16(255, 128), 128);
}
