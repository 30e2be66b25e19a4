use rand::Rng;

pub const PASSCODE_LEN: usize = 7;
pub const PASSCODE_TTL_MINUTES: i64 = 10;

/// Base-36 alphabet, upper case only so codes are easy to read out and type.
const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn generate_passcode() -> String {
    let mut rng = rand::thread_rng();
    (0..PASSCODE_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn codes_are_seven_base36_chars() {
        for _ in 0..200 {
            let code = generate_passcode();
            assert_eq!(code.len(), PASSCODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn codes_vary() {
        let seen: HashSet<String> = (0..50).map(|_| generate_passcode()).collect();
        assert!(seen.len() > 45);
    }

    #[test]
    fn alphabet_is_36_symbols() {
        let unique: HashSet<u8> = CHARSET.iter().copied().collect();
        assert_eq!(unique.len(), 36);
    }
}
