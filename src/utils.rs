use std::time::Duration;

#[macro_export]
macro_rules! default_struct {
    (
        $(#[$struct_meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $type:ty $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$struct_meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $type
            ),*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field: $crate::default_struct!(@default $($default)?)
                    ),*
                }
            }
        }
    };
    (@default) => {
        Default::default()
    };
    (@default $expr:expr) => {
        $expr
    };
}

const SECOND: u128 = 1_000;
const MINUTE: u128 = SECOND * 60;
const HOUR: u128 = MINUTE * 60;
const DAY: u128 = HOUR * 24;

const UNITS: [(u128, &str, &str); 4] = [
    (DAY, "d", "day"),
    (HOUR, "h", "hour"),
    (MINUTE, "m", "minute"),
    (SECOND, "s", "second"),
];

/// Humanizes a duration to its largest whole unit, e.g. `3h` or `3 hours`.
pub fn format_duration(duration: Duration, long: bool) -> String {
    let ms = duration.as_millis();

    for (unit, short, name) in UNITS {
        if ms >= unit {
            let count = (ms + unit / 2) / unit;
            return if long {
                let plural = if ms * 2 >= unit * 3 { "s" } else { "" };
                format!("{} {}{}", count, name, plural)
            } else {
                format!("{}{}", count, short)
            };
        }
    }

    if long {
        format!("{} ms", ms)
    } else {
        format!("{}ms", ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_rounds_to_largest_unit() {
        assert_eq!(format_duration(Duration::from_millis(250), false), "250ms");
        assert_eq!(format_duration(Duration::from_secs(12), false), "12s");
        assert_eq!(format_duration(Duration::from_secs(90), false), "2m");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 600), false), "3h");
        assert_eq!(format_duration(Duration::from_secs(36 * 3600), false), "2d");
    }

    #[test]
    fn long_form_pluralizes_past_one_and_a_half() {
        assert_eq!(format_duration(Duration::from_secs(60), true), "1 minute");
        assert_eq!(format_duration(Duration::from_secs(80), true), "1 minute");
        assert_eq!(format_duration(Duration::from_secs(5 * 60), true), "5 minutes");
        assert_eq!(format_duration(Duration::from_secs(86_400), true), "1 day");
        assert_eq!(format_duration(Duration::ZERO, true), "0 ms");
    }
}
