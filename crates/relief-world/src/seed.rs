//! String seed to integer conversion.

/// Polynomial rolling hash mapping an arbitrary seed string to an integer.
/// Base 103 sits near the size of the printable-character alphabet; the
/// modulus is the usual large prime 1e9 + 9.
pub fn hash_seed(seed: &str) -> i32 {
    const P: i64 = 103;
    const M: i64 = 1_000_000_009;
    let mut result: i64 = 0;
    let mut p_pow: i64 = 1;
    for ch in seed.chars() {
        let code = (ch as i64) - 31;
        result = (result + code * p_pow) % M;
        p_pow = (p_pow * P) % M;
    }
    result as i32
}
