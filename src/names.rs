//! Name-grammar predicates for object paths, interfaces, members, errors and
//! bus names (`spec.md` §1: "consumed as black-box predicates; their
//! implementations are not specified here"). Grounded in the teacher's
//! sibling `names.rs`, which validated interface/bus/member/error names
//! the same way (per-element character classes, `FromStr`); this module
//! keeps that structure but exposes plain `bool` predicates, since that is
//! the shape the rest of the codec actually consumes them in (`spec.md`
//! §4.5's field table calls them "validate object path", "validate
//! interface name", etc., not "parse into a newtype").

use crate::limits::MAX_NAME_LENGTH;

/// A name used to refer to an object instance, e.g. `/org/freedesktop/DBus`.
pub fn is_valid_object_path(s: &str) -> bool {
    if s.is_empty() || !s.starts_with('/') {
        return false;
    }
    if s.len() > 1 && s.ends_with('/') {
        return false;
    }
    if s == "/" {
        return true;
    }
    for element in s[1..].split('/') {
        if element.is_empty() {
            return false;
        }
        if !element
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return false;
        }
    }
    true
}

fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Interface names and error names share this grammar: one or more
/// period-separated elements, each starting with a letter or underscore,
/// each containing only `[A-Za-z0-9_-]`.
pub fn is_valid_interface_name(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_NAME_LENGTH || s.starts_with('.') || s.ends_with('.') {
        return false;
    }
    let elements: Vec<&str> = s.split('.').collect();
    if elements.len() < 2 {
        return false;
    }
    elements.iter().all(|element| {
        !element.is_empty()
            && !element.as_bytes()[0].is_ascii_digit()
            && element.chars().all(is_valid_name_char)
    })
}

/// Error names follow the same grammar as interface names.
pub fn is_valid_error_name(s: &str) -> bool {
    is_valid_interface_name(s)
}

/// Bus names are either unique connection names (`:1.42`, elements may
/// start with a digit) or well-known names (same grammar as interface
/// names).
pub fn is_valid_bus_name(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_NAME_LENGTH {
        return false;
    }
    if let Some(rest) = s.strip_prefix(':') {
        let elements: Vec<&str> = rest.split('.').collect();
        return elements.len() >= 2
            && elements.iter().all(|element| {
                !element.is_empty() && element.chars().all(is_valid_name_char)
            });
    }
    is_valid_interface_name(s)
}

/// Member names (method or signal names): no periods, must not start with a
/// digit, `[A-Za-z0-9_]` only, at least one character.
pub fn is_valid_member_name(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_NAME_LENGTH {
        return false;
    }
    if s.as_bytes()[0].is_ascii_digit() {
        return false;
    }
    s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_paths() {
        assert!(is_valid_object_path("/"));
        assert!(is_valid_object_path("/foo"));
        assert!(is_valid_object_path("/foo/bar_2"));
        assert!(!is_valid_object_path(""));
        assert!(!is_valid_object_path("foo"));
        assert!(!is_valid_object_path("/foo/"));
        assert!(!is_valid_object_path("/foo//bar"));
        assert!(!is_valid_object_path("/foo.bar"));
    }

    #[test]
    fn interface_names() {
        assert!(is_valid_interface_name("com.example"));
        assert!(is_valid_interface_name("com.example.MusicPlayer1"));
        assert!(!is_valid_interface_name("MissingPeriod"));
        assert!(!is_valid_interface_name(".leading.period"));
        assert!(!is_valid_interface_name("trailing.period."));
        assert!(!is_valid_interface_name("com.9example"));
        assert!(!is_valid_interface_name("com.ex|ample"));
    }

    #[test]
    fn bus_names() {
        assert!(is_valid_bus_name("org.freedesktop.DBus"));
        assert!(is_valid_bus_name(":1.42"));
        assert!(!is_valid_bus_name(":"));
        assert!(!is_valid_bus_name("no-period"));
    }

    #[test]
    fn member_names() {
        assert!(is_valid_member_name("Hello"));
        assert!(is_valid_member_name("_leading_underscore"));
        assert!(!is_valid_member_name("1Hello"));
        assert!(!is_valid_member_name("Has.Period"));
        assert!(!is_valid_member_name(""));
    }
}
