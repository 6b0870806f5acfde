use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// The fixed set of integer settings shared by the watch face and the
/// settings page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Preference {
    InstalledVersion,
    CurrentVersion,
    HourVibrate,
    HourVibrateStart,
    HourVibrateEnd,
    BluetoothVibrate,
    Clock24Hour,
}

const VERSION: RangeInclusive<i32> = 0..=i32::MAX;
const FLAG: RangeInclusive<i32> = 0..=1;
const HOUR: RangeInclusive<i32> = 0..=23;

impl Preference {
    pub const ALL: [Preference; 7] = [
        Preference::InstalledVersion,
        Preference::CurrentVersion,
        Preference::HourVibrate,
        Preference::HourVibrateStart,
        Preference::HourVibrateEnd,
        Preference::BluetoothVibrate,
        Preference::Clock24Hour,
    ];

    /// Storage key, also used as the settings page parameter name.
    pub fn key(&self) -> &'static str {
        match self {
            Preference::InstalledVersion => "installedVersion",
            Preference::CurrentVersion => "currentVersion",
            Preference::HourVibrate => "hourVibrate",
            Preference::HourVibrateStart => "hourVibrateStart",
            Preference::HourVibrateEnd => "hourVibrateEnd",
            Preference::BluetoothVibrate => "bluetoothVibrate",
            Preference::Clock24Hour => "clock24Hour",
        }
    }

    pub fn default_value(&self) -> i32 {
        match self {
            Preference::InstalledVersion => 0,
            Preference::CurrentVersion => 0,
            Preference::HourVibrate => 0,
            Preference::HourVibrateStart => 9,
            Preference::HourVibrateEnd => 18,
            Preference::BluetoothVibrate => 1,
            Preference::Clock24Hour => 0,
        }
    }

    pub fn domain(&self) -> RangeInclusive<i32> {
        match self {
            Preference::InstalledVersion | Preference::CurrentVersion => VERSION,
            Preference::HourVibrate | Preference::BluetoothVibrate | Preference::Clock24Hour => {
                FLAG
            }
            Preference::HourVibrateStart | Preference::HourVibrateEnd => HOUR,
        }
    }

    pub fn accepts(&self, value: i32) -> bool {
        self.domain().contains(&value)
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Preference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preference::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Preference::ALL.iter().map(|p| p.key()).collect();
                format!("Unknown preference '{}'. Valid keys: {}", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_defaults() {
        assert_eq!(Preference::InstalledVersion.default_value(), 0);
        assert_eq!(Preference::HourVibrate.default_value(), 0);
        assert_eq!(Preference::HourVibrateStart.default_value(), 9);
        assert_eq!(Preference::HourVibrateEnd.default_value(), 18);
        assert_eq!(Preference::BluetoothVibrate.default_value(), 1);
        assert_eq!(Preference::Clock24Hour.default_value(), 0);
    }

    #[test]
    fn test_parse_key_case_insensitive() {
        assert_eq!(
            "hourVibrateEnd".parse::<Preference>().unwrap(),
            Preference::HourVibrateEnd
        );
        assert_eq!(
            "CLOCK24HOUR".parse::<Preference>().unwrap(),
            Preference::Clock24Hour
        );
        assert!("volume".parse::<Preference>().is_err());
    }

    #[test]
    fn test_domains() {
        assert!(Preference::HourVibrateStart.accepts(23));
        assert!(!Preference::HourVibrateStart.accepts(24));
        assert!(!Preference::BluetoothVibrate.accepts(2));
        assert!(Preference::CurrentVersion.accepts(12));
        assert!(!Preference::CurrentVersion.accepts(-1));
    }
}
