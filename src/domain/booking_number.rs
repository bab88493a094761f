use chrono::{DateTime, Utc};
use rand::Rng;

const PREFIX: &str = "BK";
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 5;

/// Human-facing booking reference, e.g. `BK-M5X2K1QZ-7QH3D`.
///
/// Uniqueness is enforced by the `bookings_booking_number_key` constraint;
/// callers regenerate on a violation.
pub fn generate() -> String {
    generate_at(Utc::now(), &mut rand::thread_rng())
}

pub fn generate_at<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{PREFIX}-{}-{suffix}", to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn has_prefix_time_and_random_suffix() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let number = generate_at(now, &mut StdRng::seed_from_u64(7));
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "BK");
        assert_eq!(parts[1], to_base36(1_700_000_000_000));
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn same_instant_differs_by_suffix() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let a = generate_at(now, &mut rng);
        let b = generate_at(now, &mut rng);
        assert_ne!(a, b);
    }
}
