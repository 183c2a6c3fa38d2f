pub const MAX_USERNAME_CHARS: usize = 64;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 512;

pub const MIN_CODE_DIGITS: usize = 6;
pub const MAX_CODE_DIGITS: usize = 8;

pub const USERNAME_REQUIREMENTS: &str =
    "Username must be 1 to 64 characters with no leading or trailing spaces";
pub const PASSWORD_REQUIREMENTS: &str =
    "Password must be between 8 and 512 characters";

/// checks that the given string has no control characters, no leading or
/// trailing whitespace, and is at most max_chars long
fn check_control_leading_trailing<G>(given: G, max_chars: usize) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();
    let mut iter = given_ref.chars();
    let mut char_count = 0;

    if let Some(ch) = iter.next() {
        char_count += 1;

        if ch.is_control() || ch.is_whitespace() {
            return false;
        }
    }

    if let Some(ch) = iter.next_back() {
        char_count += 1;

        if ch.is_control() || ch.is_whitespace() {
            return false;
        }
    }

    for ch in iter {
        if ch.is_control() {
            return false;
        }

        char_count += 1;

        if char_count > max_chars {
            return false;
        }
    }

    true
}

pub fn username_valid<G>(given: G) -> bool
where
    G: AsRef<str>
{
    !given.as_ref().is_empty() &&
        check_control_leading_trailing(given, MAX_USERNAME_CHARS)
}

pub fn password_valid<G>(given: G) -> bool
where
    G: AsRef<str>
{
    let mut char_count = 0;

    for ch in given.as_ref().chars() {
        if ch.is_control() {
            return false;
        }

        char_count += 1;

        if char_count > MAX_PASSWORD_CHARS {
            return false;
        }
    }

    char_count >= MIN_PASSWORD_CHARS
}

pub fn totp_code_valid<G>(given: G) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();

    given_ref.len() >= MIN_CODE_DIGITS &&
        given_ref.len() <= MAX_CODE_DIGITS &&
        given_ref.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod test {
    use super::*;

    fn string_to_len(len: usize) -> String {
        let mut rtn = String::with_capacity(len);

        for _ in 0..len {
            rtn.push('a');
        }

        rtn
    }

    #[test]
    fn username_validation() {
        let valid = vec![
            String::from("gandalf"),
            String::from("bag end dweller"),
            String::from("Trogdor_the_Burninator"),
        ];

        for test in valid {
            assert!(username_valid(&test), "valid string failed {:?}", test);
        }

        let invalid = vec![
            String::new(),
            String::from(" leading"),
            String::from("trailing "),
            String::from("has\u{0000}control"),
            string_to_len(MAX_USERNAME_CHARS + 1),
        ];

        for test in invalid {
            assert!(!username_valid(&test), "invalid string failed {:?}", test);
        }
    }

    #[test]
    fn password_validation() {
        let valid = vec![
            String::from("Sharper Snowboard Equinox Faucet Monoxide0"),
            string_to_len(MIN_PASSWORD_CHARS),
            string_to_len(MAX_PASSWORD_CHARS),
        ];

        for test in valid {
            assert!(password_valid(&test), "valid string failed {:?}", test);
        }

        let invalid = vec![
            String::new(),
            String::from("   test  \u{0000} other stuff"),
            string_to_len(MIN_PASSWORD_CHARS - 1),
            string_to_len(MAX_PASSWORD_CHARS + 1),
        ];

        for test in invalid {
            assert!(!password_valid(&test), "invalid string failed {:?}", test);
        }
    }

    #[test]
    fn totp_code_validation() {
        let valid = vec![
            String::from("000000"),
            String::from("287082"),
            String::from("94287082"),
        ];

        for test in valid {
            assert!(totp_code_valid(&test), "valid string failed {:?}", test);
        }

        let invalid = vec![
            String::new(),
            String::from("12345"),
            String::from("123456789"),
            String::from("28708a"),
            String::from("２８７０８２"),
        ];

        for test in invalid {
            assert!(!totp_code_valid(&test), "invalid string failed {:?}", test);
        }
    }
}
