//! Built-in validators (spec §3 `Validator`, §4.6).
//!
//! A validator runs only on `Load`, after the refiner pipeline, and returns
//! `Some(message)` to record a failure against the field's path. Modeled as
//! `Fn(&T, bool) -> Option<String>` rather than a dedicated trait object
//! family with one impl per built-in: the spec's built-ins are all simple
//! predicates closed over a couple of parameters (a range, a size), which a
//! closure expresses directly without a trait to implement per type.

/// A single validation rule over `&T`, given whether the field was loaded.
///
/// `was_loaded = false` means the key was absent (or read failed under a
/// `Skip` policy); every built-in except [`Required`] treats that as an
/// automatic pass, per the original library's convention that `Required`
/// alone is responsible for flagging an absent field.
pub trait Validator<T: ?Sized> {
    /// Returns an error message if `value` fails this rule.
    fn validate(&self, value: &T, was_loaded: bool) -> Option<String>;
}

impl<T: ?Sized, F> Validator<T> for F
where
    F: Fn(&T, bool) -> Option<String>,
{
    fn validate(&self, value: &T, was_loaded: bool) -> Option<String> {
        self(value, was_loaded)
    }
}

/// Fails if the field was not loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl<T: ?Sized> Validator<T> for Required {
    fn validate(&self, _value: &T, was_loaded: bool) -> Option<String> {
        if was_loaded {
            None
        } else {
            Some("This field is required".to_string())
        }
    }
}

/// Fails if the loaded value is outside `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct Range<T> {
    min: T,
    max: T,
}

impl<T> Range<T> {
    /// Builds an inclusive `[min, max]` range validator.
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd + std::fmt::Display> Validator<T> for Range<T> {
    fn validate(&self, value: &T, was_loaded: bool) -> Option<String> {
        if !was_loaded {
            return None;
        }
        if *value < self.min || *value > self.max {
            Some(format!("Value must be between {} and {}", self.min, self.max))
        } else {
            None
        }
    }
}

/// Fails if a sized field (string or container) has fewer than `min` elements.
#[derive(Debug, Clone, Copy)]
pub struct MinSize {
    min: usize,
}

impl MinSize {
    /// Builds a minimum-size validator.
    pub fn new(min: usize) -> Self {
        Self { min }
    }
}

impl<T: ?Sized> Validator<T> for MinSize
where
    T: HasLen,
{
    fn validate(&self, value: &T, was_loaded: bool) -> Option<String> {
        if !was_loaded {
            return None;
        }
        if value.len_for_validation() >= self.min {
            None
        } else {
            Some(format!("The minimum size of this field should be {}", self.min))
        }
    }
}

/// Fails if a sized field (string or container) has more than `max` elements.
#[derive(Debug, Clone, Copy)]
pub struct MaxSize {
    max: usize,
}

impl MaxSize {
    /// Builds a maximum-size validator.
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl<T: ?Sized> Validator<T> for MaxSize
where
    T: HasLen,
{
    fn validate(&self, value: &T, was_loaded: bool) -> Option<String> {
        if !was_loaded {
            return None;
        }
        if value.len_for_validation() <= self.max {
            None
        } else {
            Some(format!("The maximum size of this field should be not greater than {}", self.max))
        }
    }
}

/// Sealed-ish capability used by [`MinSize`]/[`MaxSize`]: anything with a
/// `len()`, mirroring the original's `has_size_v<T>` compile-time check.
pub trait HasLen {
    /// The field's element/character count.
    fn len_for_validation(&self) -> usize;
}

impl HasLen for String {
    fn len_for_validation(&self) -> usize {
        self.chars().count()
    }
}

impl HasLen for str {
    fn len_for_validation(&self) -> usize {
        self.chars().count()
    }
}

impl<T> HasLen for Vec<T> {
    fn len_for_validation(&self) -> usize {
        self.len()
    }
}

impl<T> HasLen for std::collections::VecDeque<T> {
    fn len_for_validation(&self) -> usize {
        self.len()
    }
}

impl<K, V, S: std::hash::BuildHasher> HasLen for std::collections::HashMap<K, V, S> {
    fn len_for_validation(&self) -> usize {
        self.len()
    }
}

impl<K, V> HasLen for std::collections::BTreeMap<K, V> {
    fn len_for_validation(&self) -> usize {
        self.len()
    }
}

impl<T, S: std::hash::BuildHasher> HasLen for std::collections::HashSet<T, S> {
    fn len_for_validation(&self) -> usize {
        self.len()
    }
}

impl<T> HasLen for std::collections::BTreeSet<T> {
    fn len_for_validation(&self) -> usize {
        self.len()
    }
}

/// Fails if the loaded string is not a plausible email address.
///
/// Like the original's `Email` validator, this is a pragmatic shape check
/// (one `@`, something on both sides, a `.` in the domain part) rather than
/// a full RFC 5322 parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl Validator<String> for Email {
    fn validate(&self, value: &String, was_loaded: bool) -> Option<String> {
        if !was_loaded {
            return None;
        }
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
            }
            None => false,
        };
        if valid {
            None
        } else {
            Some("Value is not a valid email address".to_string())
        }
    }
}

/// Fails if the loaded string does not look like a phone number: an optional
/// leading `+` followed only by digits, spaces, and `-`/`(`/`)` separators,
/// with at least 7 digits total.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneNumber;

impl Validator<String> for PhoneNumber {
    fn validate(&self, value: &String, was_loaded: bool) -> Option<String> {
        if !was_loaded {
            return None;
        }
        let body = value.strip_prefix('+').unwrap_or(value);
        let digit_count = body.chars().filter(|c| c.is_ascii_digit()).count();
        let only_allowed = body.chars().all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
        if only_allowed && digit_count >= 7 {
            None
        } else {
            Some("Value is not a valid phone number".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_flags_absent_field() {
        assert_eq!(Required.validate(&0i32, false), Some("This field is required".to_string()));
        assert_eq!(Required.validate(&0i32, true), None);
    }

    #[test]
    fn range_checks_inclusive_bounds() {
        let r = Range::new(1, 10);
        assert_eq!(r.validate(&0, true), Some("Value must be between 1 and 10".to_string()));
        assert_eq!(r.validate(&1, true), None);
        assert_eq!(r.validate(&10, true), None);
        assert!(r.validate(&11, true).is_some());
        assert_eq!(r.validate(&999, false), None);
    }

    #[test]
    fn min_max_size_on_string() {
        let s = "hello".to_string();
        assert_eq!(MinSize::new(3).validate(&s, true), None);
        assert!(MinSize::new(10).validate(&s, true).is_some());
        assert_eq!(MaxSize::new(10).validate(&s, true), None);
        assert!(MaxSize::new(2).validate(&s, true).is_some());
    }

    #[test]
    fn email_accepts_plausible_addresses_only() {
        assert_eq!(Email.validate(&"a@b.com".to_string(), true), None);
        assert!(Email.validate(&"not-an-email".to_string(), true).is_some());
        assert!(Email.validate(&"@b.com".to_string(), true).is_some());
    }

    #[test]
    fn phone_number_requires_enough_digits() {
        assert_eq!(PhoneNumber.validate(&"+1 (415) 555-0100".to_string(), true), None);
        assert!(PhoneNumber.validate(&"12".to_string(), true).is_some());
        assert!(PhoneNumber.validate(&"call me".to_string(), true).is_some());
    }
}
